//测试用的类装配件：直接拼ClassFile结构(代码属性是原始字节)，
//不需要宿主JDK或rt.jar。引导类集合是裁剪过的最小闭包。
#![allow(dead_code)]

use class_file_reader::attribute_info::{AttributeInfo, AttributeType};
use class_file_reader::class_file::{ClassAccessFlags, ClassFile};
use class_file_reader::class_file_version::ClassFileVersion;
use class_file_reader::constant_pool::{ConstantPool, ConstantPoolEntry};
use class_file_reader::field_info::{FieldAccessFlags, FieldInfo};
use class_file_reader::instruction::opcode;
use class_file_reader::method_info::{MethodAccessFlags, MethodInfo};
use sandbox_jvm::configuration::VmConfiguration;
use sandbox_jvm::jvm_values::Value;
use sandbox_jvm::method_area::MethodArea;
use sandbox_jvm::virtual_machine::VirtualMachine;

pub struct ClassFileBuilder {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    access_flags: ClassAccessFlags,
    version: ClassFileVersion,
    pub cp: ConstantPool,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
    attributes: Vec<AttributeInfo>,
}

impl ClassFileBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> ClassFileBuilder {
        ClassFileBuilder {
            name: name.to_string(),
            super_name: super_name.map(str::to_string),
            interfaces: Vec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            version: ClassFileVersion::Jdk8,
            cp: ConstantPool::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn interface(mut self) -> Self {
        self.access_flags = ClassAccessFlags::PUBLIC
            | ClassAccessFlags::INTERFACE
            | ClassAccessFlags::ABSTRACT;
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    // ---- constant pool helpers, return 1-based indices for use in code ----

    pub fn utf8(&mut self, text: &str) -> u16 {
        self.cp.add(ConstantPoolEntry::Utf8(text.to_string()))
    }

    pub fn class_const(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.cp.add(ConstantPoolEntry::ClassReference(name_index))
    }

    pub fn string_const(&mut self, text: &str) -> u16 {
        let utf8_index = self.utf8(text);
        self.cp.add(ConstantPoolEntry::StringReference(utf8_index))
    }

    pub fn int_const(&mut self, value: i32) -> u16 {
        self.cp.add(ConstantPoolEntry::Integer(value))
    }

    pub fn long_const(&mut self, value: i64) -> u16 {
        self.cp.add(ConstantPoolEntry::Long(value))
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.cp
            .add(ConstantPoolEntry::NameAndTypeDescriptor(name_index, descriptor_index))
    }

    pub fn method_const(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_const(class_name);
        let name_and_type = self.name_and_type(name, descriptor);
        self.cp
            .add(ConstantPoolEntry::MethodReference(class_index, name_and_type))
    }

    pub fn interface_method_const(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_const(class_name);
        let name_and_type = self.name_and_type(name, descriptor);
        self.cp.add(ConstantPoolEntry::InterfaceMethodReference(
            class_index,
            name_and_type,
        ))
    }

    pub fn field_const(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_const(class_name);
        let name_and_type = self.name_and_type(name, descriptor);
        self.cp
            .add(ConstantPoolEntry::FieldReference(class_index, name_and_type))
    }

    pub fn method_handle_invoke_static(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let method_ref = self.method_const(class_name, name, descriptor);
        self.cp.add(ConstantPoolEntry::MethodHandle(6, method_ref))
    }

    pub fn invoke_dynamic_const(&mut self, bsm_index: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type = self.name_and_type(name, descriptor);
        self.cp
            .add(ConstantPoolEntry::InvokeDynamic(bsm_index, name_and_type))
    }

    // ----------------------------------------------------------- members

    pub fn field(mut self, name: &str, descriptor: &str, flags: FieldAccessFlags) -> Self {
        self.fields.push(FieldInfo {
            access_flags: flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: Vec::new(),
        });
        self
    }

    /// 带ConstantValue的静态字段
    pub fn constant_field(
        mut self,
        name: &str,
        descriptor: &str,
        constant_index: u16,
    ) -> Self {
        self.fields.push(FieldInfo {
            access_flags: FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: vec![AttributeInfo {
                name: AttributeType::ConstantValue,
                info: constant_index.to_be_bytes().to_vec(),
            }],
        });
        self
    }

    pub fn method(
        mut self,
        name: &str,
        descriptor: &str,
        flags: MethodAccessFlags,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) -> Self {
        self.method_with_exceptions(name, descriptor, flags, max_stack, max_locals, code, &[])
    }

    /// exceptions: (start_pc, end_pc, handler_pc, catch_type cp index或0)
    pub fn method_with_exceptions(
        mut self,
        name: &str,
        descriptor: &str,
        flags: MethodAccessFlags,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
        exceptions: &[(u16, u16, u16, u16)],
    ) -> Self {
        let mut info: Vec<u8> = Vec::new();
        info.extend_from_slice(&max_stack.to_be_bytes());
        info.extend_from_slice(&max_locals.to_be_bytes());
        info.extend_from_slice(&(code.len() as u32).to_be_bytes());
        info.extend_from_slice(code);
        info.extend_from_slice(&(exceptions.len() as u16).to_be_bytes());
        for (start_pc, end_pc, handler_pc, catch_type) in exceptions {
            info.extend_from_slice(&start_pc.to_be_bytes());
            info.extend_from_slice(&end_pc.to_be_bytes());
            info.extend_from_slice(&handler_pc.to_be_bytes());
            info.extend_from_slice(&catch_type.to_be_bytes());
        }
        info.extend_from_slice(&0u16.to_be_bytes());
        self.methods.push(MethodInfo {
            access_flags: flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: vec![AttributeInfo {
                name: AttributeType::Code,
                info,
            }],
        });
        self
    }

    /// 没有code的方法(native/abstract)
    pub fn bare_method(mut self, name: &str, descriptor: &str, flags: MethodAccessFlags) -> Self {
        self.methods.push(MethodInfo {
            access_flags: flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: Vec::new(),
        });
        self
    }

    /// 类级BootstrapMethods属性。entries是(MethodHandle cp索引, 参数cp索引)
    pub fn bootstrap_methods(mut self, entries: &[(u16, Vec<u16>)]) -> Self {
        let mut info: Vec<u8> = Vec::new();
        info.extend_from_slice(&(entries.len() as u16).to_be_bytes());
        for (handle_index, arguments) in entries {
            info.extend_from_slice(&handle_index.to_be_bytes());
            info.extend_from_slice(&(arguments.len() as u16).to_be_bytes());
            for argument in arguments {
                info.extend_from_slice(&argument.to_be_bytes());
            }
        }
        self.attributes.push(AttributeInfo {
            name: AttributeType::BootstrapMethods,
            info,
        });
        self
    }

    pub fn build(self) -> ClassFile {
        ClassFile {
            version: self.version,
            constant_pool: self.cp,
            access_flags: self.access_flags,
            this_class_name: self.name,
            super_class_name: self.super_name,
            interface_names: self.interfaces,
            field_info: self.fields,
            method_info: self.methods,
            attribute_info: self.attributes,
        }
    }
}

// -------------------------------------------------------------- boot classes

/// <init>()V只调父类构造器
fn trivial_init(builder: &mut ClassFileBuilder, super_name: &str) -> Vec<u8> {
    let super_init = builder.method_const(super_name, "<init>", "()V");
    vec![
        opcode::ALOAD_0,
        opcode::INVOKESPECIAL,
        (super_init >> 8) as u8,
        super_init as u8,
        opcode::RETURN,
    ]
}

fn plain_class(method_area: &MethodArea, name: &str, super_name: &str) {
    let mut builder = ClassFileBuilder::new(name, Some(super_name));
    let code = trivial_init(&mut builder, super_name);
    let class_file = builder
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &code)
        .build();
    method_area
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
}

/// 裁剪过的引导类闭包。string_value_desc控制String.value是[C还是[B。
pub fn install_boot_classes(method_area: &MethodArea, string_value_desc: &str) {
    //java/lang/Object: <init>直接return，hashCode/getClass是native
    let object = ClassFileBuilder::new("java/lang/Object", None)
        .method(
            "<init>",
            "()V",
            MethodAccessFlags::PUBLIC,
            1,
            1,
            &[opcode::RETURN],
        )
        .bare_method(
            "hashCode",
            "()I",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE,
        )
        .bare_method(
            "getClass",
            "()Ljava/lang/Class;",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE,
        )
        .build();
    method_area
        .define_from_class_file(Value::Null, object)
        .unwrap();

    //java/lang/Class: 镜像对象的形状
    let mut builder = ClassFileBuilder::new("java/lang/Class", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let class_class = builder
        .field("name", "Ljava/lang/String;", FieldAccessFlags::PRIVATE)
        .field(
            "classLoader",
            "Ljava/lang/ClassLoader;",
            FieldAccessFlags::PRIVATE,
        )
        .field(
            "protectionDomain",
            "Ljava/security/ProtectionDomain;",
            FieldAccessFlags::PRIVATE,
        )
        .field(
            "componentType",
            "Ljava/lang/Class;",
            FieldAccessFlags::PRIVATE,
        )
        .method("<init>", "()V", MethodAccessFlags::PRIVATE, 2, 1, &init_code)
        .build();
    method_area
        .define_from_class_file(Value::Null, class_class)
        .unwrap();

    install_string_class(method_area, string_value_desc);

    //ClassLoader带classes向量，defineClass往里加
    let mut builder = ClassFileBuilder::new("java/lang/ClassLoader", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let class_loader = builder
        .field("classes", "Ljava/util/Vector;", FieldAccessFlags::PRIVATE)
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .build();
    method_area
        .define_from_class_file(Value::Null, class_loader)
        .unwrap();

    //Thread镜像的字段是screen_vm_thread要写的
    let mut builder = ClassFileBuilder::new("java/lang/Thread", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let thread = builder
        .field("name", "Ljava/lang/String;", FieldAccessFlags::PRIVATE)
        .field("priority", "I", FieldAccessFlags::PRIVATE)
        .field("daemon", "Z", FieldAccessFlags::PRIVATE)
        .field("threadStatus", "I", FieldAccessFlags::PRIVATE)
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .build();
    method_area
        .define_from_class_file(Value::Null, thread)
        .unwrap();

    plain_class(method_area, "java/lang/ThreadGroup", "java/lang/Object");
    plain_class(method_area, "java/lang/System", "java/lang/Object");

    //Throwable带detailMessage/cause，异常构造走<init>()V加直写字段
    let mut builder = ClassFileBuilder::new("java/lang/Throwable", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let throwable = builder
        .field(
            "detailMessage",
            "Ljava/lang/String;",
            FieldAccessFlags::PRIVATE,
        )
        .field("cause", "Ljava/lang/Throwable;", FieldAccessFlags::PRIVATE)
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .build();
    method_area
        .define_from_class_file(Value::Null, throwable)
        .unwrap();

    plain_class(method_area, "java/lang/Error", "java/lang/Throwable");
    plain_class(method_area, "java/lang/Exception", "java/lang/Throwable");
    for error in [
        "java/lang/NoSuchFieldError",
        "java/lang/NoSuchMethodError",
        "java/lang/ExceptionInInitializerError",
        "java/lang/UnsatisfiedLinkError",
        "java/lang/InternalError",
        "java/lang/NoClassDefFoundError",
        "java/lang/OutOfMemoryError",
        "java/lang/AbstractMethodError",
        "java/lang/BootstrapMethodError",
    ] {
        plain_class(method_area, error, "java/lang/Error");
    }
    for exception in [
        "java/lang/NullPointerException",
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/ClassCastException",
        "java/lang/ClassNotFoundException",
        "java/lang/NegativeArraySizeException",
        "java/lang/IllegalArgumentException",
        "java/lang/IllegalStateException",
        "java/lang/ArithmeticException",
        "java/lang/InterruptedException",
    ] {
        plain_class(method_area, exception, "java/lang/Exception");
    }

    //Vector.add永远成功
    let mut builder = ClassFileBuilder::new("java/util/Vector", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let vector = builder
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .method(
            "add",
            "(Ljava/lang/Object;)Z",
            MethodAccessFlags::PUBLIC,
            1,
            2,
            &[opcode::ICONST_1, opcode::IRETURN],
        )
        .build();
    method_area
        .define_from_class_file(Value::Null, vector)
        .unwrap();

    install_invoke_classes(method_area);
}

fn install_string_class(method_area: &MethodArea, string_value_desc: &str) {
    let mut builder = ClassFileBuilder::new("java/lang/String", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    if string_value_desc == "[C" {
        //JDK8形状: <init>([C)V直接接管入参数组; toCharArray返回value
        let value_field = builder.field_const("java/lang/String", "value", "[C");
        //<init>([C)V: aload_0; invokespecial Object.<init>; aload_0; aload_1; putfield value; return
        let object_init = builder.method_const("java/lang/Object", "<init>", "()V");
        let ctor_code = vec![
            opcode::ALOAD_0,
            opcode::INVOKESPECIAL,
            (object_init >> 8) as u8,
            object_init as u8,
            opcode::ALOAD_0,
            opcode::ALOAD_1,
            opcode::PUTFIELD,
            (value_field >> 8) as u8,
            value_field as u8,
            opcode::RETURN,
        ];
        let to_char_array_code = vec![
            opcode::ALOAD_0,
            opcode::GETFIELD,
            (value_field >> 8) as u8,
            value_field as u8,
            opcode::ARETURN,
        ];
        let string = builder
            .field("value", "[C", FieldAccessFlags::PRIVATE | FieldAccessFlags::FINAL)
            .field("hash", "I", FieldAccessFlags::PRIVATE)
            .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
            .method("<init>", "([C)V", MethodAccessFlags::PUBLIC, 2, 2, &ctor_code)
            .method(
                "toCharArray",
                "()[C",
                MethodAccessFlags::PUBLIC,
                1,
                1,
                &to_char_array_code,
            )
            .build();
        method_area
            .define_from_class_file(Value::Null, string)
            .unwrap();
    } else {
        //JDK9+形状: value是[B。测试只覆盖空串路径，
        //toCharArray对空值返回零长char数组。
        let to_char_array_code = vec![
            opcode::ICONST_0,
            opcode::NEWARRAY,
            5, //T_CHAR
            opcode::ARETURN,
        ];
        let string = builder
            .field("value", "[B", FieldAccessFlags::PRIVATE | FieldAccessFlags::FINAL)
            .field("coder", "B", FieldAccessFlags::PRIVATE)
            .field("hash", "I", FieldAccessFlags::PRIVATE)
            .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
            .method(
                "toCharArray",
                "()[C",
                MethodAccessFlags::PUBLIC,
                1,
                1,
                &to_char_array_code,
            )
            .build();
        method_area
            .define_from_class_file(Value::Null, string)
            .unwrap();
    }
}

/// java.lang.invoke的最小桩：linkCallSite把linker塞进appendix，
/// linkMethodHandleConstant/fromMethodDescriptorString返回新实例。
fn install_invoke_classes(method_area: &MethodArea) {
    //MethodHandle桩：invokeExact(I)I返回参数+1，给invokedynamic测试当目标
    let mut builder =
        ClassFileBuilder::new("java/lang/invoke/MethodHandle", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let method_handle = builder
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .method(
            "invokeExact",
            "(I)I",
            MethodAccessFlags::PUBLIC,
            2,
            2,
            &[opcode::ILOAD_1, opcode::ICONST_1, opcode::IADD, opcode::IRETURN],
        )
        .build();
    method_area
        .define_from_class_file(Value::Null, method_handle)
        .unwrap();
    plain_class(method_area, "java/lang/invoke/CallSite", "java/lang/Object");

    //MethodType.fromMethodDescriptorString -> new MethodType
    let mut builder =
        ClassFileBuilder::new("java/lang/invoke/MethodType", Some("java/lang/Object"));
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let self_class = builder.class_const("java/lang/invoke/MethodType");
    let self_init = builder.method_const("java/lang/invoke/MethodType", "<init>", "()V");
    let from_descriptor_code = vec![
        opcode::NEW,
        (self_class >> 8) as u8,
        self_class as u8,
        opcode::DUP,
        opcode::INVOKESPECIAL,
        (self_init >> 8) as u8,
        self_init as u8,
        opcode::ARETURN,
    ];
    let method_type = builder
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .method(
            "fromMethodDescriptorString",
            "(Ljava/lang/String;Ljava/lang/ClassLoader;)Ljava/lang/invoke/MethodType;",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            2,
            2,
            &from_descriptor_code,
        )
        .build();
    method_area
        .define_from_class_file(Value::Null, method_type)
        .unwrap();

    let mut builder = ClassFileBuilder::new(
        "java/lang/invoke/MethodHandleNatives",
        Some("java/lang/Object"),
    );
    let init_code = trivial_init(&mut builder, "java/lang/Object");
    let handle_class = builder.class_const("java/lang/invoke/MethodHandle");
    let handle_init = builder.method_const("java/lang/invoke/MethodHandle", "<init>", "()V");
    //linkMethodHandleConstant -> new MethodHandle
    let link_constant_code = vec![
        opcode::NEW,
        (handle_class >> 8) as u8,
        handle_class as u8,
        opcode::DUP,
        opcode::INVOKESPECIAL,
        (handle_init >> 8) as u8,
        handle_init as u8,
        opcode::ARETURN,
    ];
    //linkCallSite(caller, bsm, name, type, args, appendix):
    //appendix[0] = bsm; return null
    let link_call_site_code = vec![
        opcode::ALOAD,
        5,
        opcode::ICONST_0,
        opcode::ALOAD_1,
        opcode::AASTORE,
        opcode::ACONST_NULL,
        opcode::ARETURN,
    ];
    let natives = builder
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init_code)
        .method(
            "linkMethodHandleConstant",
            "(Ljava/lang/Class;ILjava/lang/Class;Ljava/lang/String;Ljava/lang/Object;)Ljava/lang/invoke/MethodHandle;",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            2,
            5,
            &link_constant_code,
        )
        .method(
            "linkCallSite",
            "(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/invoke/MemberName;",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            3,
            6,
            &link_call_site_code,
        )
        .build();
    method_area
        .define_from_class_file(Value::Null, natives)
        .unwrap();
}

/// 装好引导类并boot完的VM。JDK8形状的String。
pub fn booted_vm<'a>() -> VirtualMachine<'a> {
    booted_vm_with_string_shape("[C")
}

pub fn booted_vm_with_string_shape<'a>(string_value_desc: &str) -> VirtualMachine<'a> {
    let mut vm = VirtualMachine::new(VmConfiguration::default());
    install_boot_classes(vm.method_area(), string_value_desc);
    vm.boot().unwrap();
    vm
}

/// defineClass测试用的最小class文件二进制
pub fn minimal_class_bytes(internal_name: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = Vec::new();
    bytes.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&52u16.to_be_bytes());

    bytes.extend_from_slice(&5u16.to_be_bytes()); // cp count = entries + 1
    let utf8 = |bytes: &mut Vec<u8>, text: &str| {
        bytes.push(1);
        bytes.extend_from_slice(&(text.len() as u16).to_be_bytes());
        bytes.extend_from_slice(text.as_bytes());
    };
    utf8(&mut bytes, internal_name); // #1
    bytes.push(7); // #2 = Class #1
    bytes.extend_from_slice(&1u16.to_be_bytes());
    utf8(&mut bytes, "java/lang/Object"); // #3
    bytes.push(7); // #4 = Class #3
    bytes.extend_from_slice(&3u16.to_be_bytes());

    bytes.extend_from_slice(&0x0021u16.to_be_bytes());
    bytes.extend_from_slice(&2u16.to_be_bytes()); // this
    bytes.extend_from_slice(&4u16.to_be_bytes()); // super
    bytes.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    bytes.extend_from_slice(&0u16.to_be_bytes()); // fields
    bytes.extend_from_slice(&0u16.to_be_bytes()); // methods
    bytes.extend_from_slice(&0u16.to_be_bytes()); // attributes
    bytes
}

/// u16大端拆成两个code字节
pub fn hi_lo(index: u16) -> (u8, u8) {
    ((index >> 8) as u8, index as u8)
}
