use sandbox_jvm::class_finder::{FileSystemClassPath, JarFileClassPath};
use sandbox_jvm::configuration::VmConfiguration;
use sandbox_jvm::jvm_values::Value;
use sandbox_jvm::virtual_machine::VirtualMachine;

//用法: sandbox_jvm <classpath> <main-class>
//classpath按':'分隔，.jar的条目按jar打开
fn main() {
    let mut args = std::env::args().skip(1);
    let class_path = args.next().expect("usage: sandbox_jvm <classpath> <main-class>");
    let main_class = args.next().expect("usage: sandbox_jvm <classpath> <main-class>");

    let mut configuration = VmConfiguration::default();
    for entry in class_path.split(':') {
        if entry.ends_with(".jar") {
            configuration = configuration
                .with_class_path(Box::new(JarFileClassPath::new(entry).unwrap()));
        } else {
            configuration = configuration
                .with_class_path(Box::new(FileSystemClassPath::new(entry).unwrap()));
        }
    }

    let mut vm = VirtualMachine::new(configuration);
    vm.boot().unwrap();
    let call_stack = vm.allocate_call_stack();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, &main_class.replace('.', "/"))
        .unwrap();
    let result = vm.invoke_static(
        call_stack,
        class_ref,
        "main",
        "([Ljava/lang/String;)V",
        Vec::new(),
        vec![Value::Null],
    );
    if let Err(error) = result {
        eprintln!("main raised: {error:?}");
        std::process::exit(1);
    }
}
