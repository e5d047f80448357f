use crate::call_stack::CallStack;
use crate::class_finder::ClassPath;
use crate::configuration::VmConfiguration;
use crate::dispatch::DispatchTable;
use crate::file_manager::FileManager;
use crate::java_exception::{InvokeMethodResult, InvokeResult, MethodCallError};
use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{PrimitiveKind, ReferenceValue, Value};
use crate::loaded_class::{
    ArrayClassRef, ClassRef, InitState, JavaClass, MethodRef, PrimitiveClassRef,
};
use crate::method_area::MethodArea;
use crate::monitor::Monitor;
use crate::native_method_area::NativeMethodArea;
use crate::object_heap::ObjectHeap;
use crate::reference_value::{ArrayReference, ObjectReference};
use crate::vm_symbols::VmSymbols;
use log::debug;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use typed_arena::Arena;

/// 虚拟机实例。总入口。
///
/// 一个宿主线程一个解释器(CallStack)，没有全局解释器锁；
/// 类加载、初始化、monitor各自按§5的纪律加锁。
/// 符号表在boot()时一次性解析，之后只读。
///
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.3
pub struct VirtualMachine<'a> {
    method_area: MethodArea<'a>,
    object_heap: ObjectHeap<'a>,
    vm_stacks: Arena<CallStack<'a>>,
    native_method_area: NativeMethodArea<'a>,
    pub(crate) string_pool: HashMap<String, ObjectReference<'a>>,
    dispatch: DispatchTable<'a>,
    symbols: OnceCell<VmSymbols<'a>>,
    file_manager: Box<dyn FileManager>,
    max_call_depth: usize,
}

impl<'a> VirtualMachine<'a> {
    pub fn new(configuration: VmConfiguration) -> VirtualMachine<'a> {
        let method_area = MethodArea::new();
        for class_path in configuration.class_paths {
            method_area.add_class_path(class_path);
        }
        VirtualMachine {
            method_area,
            object_heap: ObjectHeap::new(configuration.heap_size),
            vm_stacks: Arena::new(),
            native_method_area: NativeMethodArea::new_with_default_native(),
            string_pool: HashMap::new(),
            //处理器表在构造时填好，之后分发无分支
            dispatch: DispatchTable::new(),
            symbols: OnceCell::new(),
            file_manager: configuration.file_manager,
            max_call_depth: configuration.max_call_depth,
        }
    }

    pub fn add_class_path(&mut self, class_path: Box<dyn ClassPath>) {
        self.method_area.add_class_path(class_path);
    }

    pub fn dispatch_table(&self) -> DispatchTable<'a> {
        self.dispatch
    }

    pub fn file_manager(&self) -> &dyn FileManager {
        self.file_manager.as_ref()
    }

    pub fn method_area(&self) -> &MethodArea<'a> {
        &self.method_area
    }

    pub fn allocate_call_stack(&mut self) -> &'a mut CallStack<'a> {
        let stack = self.vm_stacks.alloc(CallStack::new(self.max_call_depth));
        unsafe {
            let stack_ptr: *mut CallStack<'a> = stack;
            &mut *stack_ptr
        }
    }

    /// 启动：加载引导闭包，补齐镜像对象，解析符号表。
    /// 必须在执行任何字节码之前调用一次。
    pub fn boot(&mut self) -> VmExecResult<()> {
        for name in VmSymbols::REQUIRED_CLASSES {
            self.method_area.load_boot_class(name)?;
        }
        self.ensure_mirrors()?;
        let method_area = &self.method_area;
        let symbols = VmSymbols::resolve(|name| method_area.load_boot_class(name))?;
        self.symbols
            .set(symbols)
            .map_err(|_| VmError::Panic("boot() called twice".to_string()))?;
        debug!("vm booted, {} bytes of heap in use", self.object_heap.used_bytes());
        Ok(())
    }

    pub fn symbols(&self) -> VmExecResult<&VmSymbols<'a>> {
        self.symbols
            .get()
            .ok_or_else(|| VmError::Panic("symbols requested before boot()".to_string()))
    }

    pub(crate) fn booted(&self) -> bool {
        self.symbols.get().is_some()
    }

    /// 为所有还没有镜像的类/原始类型分配java.lang.Class实例。
    /// 引导早期(Object/Class自举)之后统一补齐。
    pub(crate) fn ensure_mirrors(&mut self) -> VmExecResult<()> {
        let class_class = self.method_area.load_boot_class("java/lang/Class")?;
        for kind in [
            PrimitiveKind::Byte,
            PrimitiveKind::Char,
            PrimitiveKind::Double,
            PrimitiveKind::Float,
            PrimitiveKind::Int,
            PrimitiveKind::Long,
            PrimitiveKind::Short,
            PrimitiveKind::Boolean,
        ] {
            self.method_area.primitive(kind);
        }
        for class_ref in self.method_area.defined_classes() {
            if class_ref.mirror().is_none() {
                let (oop, static_base) = self
                    .object_heap
                    .allocate_mirror(class_class, class_ref.static_layout.size())?;
                class_ref.set_mirror(oop, static_base);
            }
        }
        for primitive in self.method_area.primitives_snapshot() {
            if primitive.mirror().is_none() {
                let (oop, _) = self.object_heap.allocate_mirror(class_class, 0)?;
                primitive.set_mirror(oop);
            }
        }
        for array_class in self.method_area.array_classes_snapshot() {
            if array_class.mirror().is_none() {
                let (oop, _) = self.object_heap.allocate_mirror(class_class, 0)?;
                array_class.set_mirror(oop);
            }
        }
        Ok(())
    }

    pub(crate) fn primitive_class(&self, kind: PrimitiveKind) -> PrimitiveClassRef<'a> {
        self.method_area.primitive(kind)
    }

    /// 加载但不初始化
    pub fn get_or_load_class(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_name: &str,
    ) -> InvokeResult<'a, ClassRef<'a>> {
        let newly = !self.method_area.is_class_loaded(class_name);
        let class_ref = match self.method_area.load_boot_class(class_name) {
            Ok(class_ref) => class_ref,
            Err(VmError::ClassNotFoundException(name)) => {
                return Err(self.raise_no_class_def_found(call_stack, &name));
            }
            Err(e) => return Err(MethodCallError::InternalError(e)),
        };
        //新加载的类(连带它隐式拉起的父类)需要补镜像
        if newly || class_ref.mirror().is_none() {
            self.ensure_mirrors()?;
        }
        Ok(class_ref)
    }

    /// 加载并完成初始化。数组类型回落到java/lang/Object(方法解析用)。
    pub fn lookup_class_and_initialize(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_name: &str,
    ) -> InvokeResult<'a, ClassRef<'a>> {
        let class_name = if class_name.starts_with('[') {
            "java/lang/Object"
        } else {
            class_name
        };
        let class_ref = self.get_or_load_class(call_stack, class_name)?;
        self.initialize_class(call_stack, class_ref)?;
        Ok(class_ref)
    }

    /// 类初始化状态机。幂等；发起线程可重入；其他线程阻塞直到
    /// Initialized或Errored；Errored之后每次请求都抛
    /// ExceptionInInitializerError(同一个cause)。
    pub fn initialize_class(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
    ) -> InvokeResult<'a, ()> {
        let current = std::thread::current().id();
        loop {
            let mut state = class_ref.init.lock();
            match *state {
                InitState::Initialized => return Ok(()),
                InitState::Errored(cause) => {
                    drop(state);
                    return Err(self.raise_initializer_error(call_stack, cause));
                }
                InitState::Initializing(owner) if owner == current => return Ok(()),
                InitState::Initializing(_) => {
                    //其他线程正在初始化，等它到达终态
                    class_ref.init_cond.wait(&mut state);
                }
                InitState::Loaded => {
                    *state = InitState::Initializing(current);
                    break;
                }
            }
        }

        let result = self.run_initializer(call_stack, class_ref);
        match result {
            Ok(()) => {
                *class_ref.init.lock() = InitState::Initialized;
                class_ref.init_cond.notify_all();
                Ok(())
            }
            Err(MethodCallError::ExceptionThrown(cause)) => {
                *class_ref.init.lock() = InitState::Errored(cause);
                class_ref.init_cond.notify_all();
                Err(self.raise_initializer_error(call_stack, cause))
            }
            Err(internal) => {
                //宿主错误不记入状态机，下次还能重试
                *class_ref.init.lock() = InitState::Loaded;
                class_ref.init_cond.notify_all();
                Err(internal)
            }
        }
    }

    fn run_initializer(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
    ) -> InvokeResult<'a, ()> {
        //先保证父类初始化完成
        if let Some(super_class) = class_ref.super_class {
            self.initialize_class(call_stack, super_class)?;
        }
        self.initialize_static_fields(call_stack, class_ref)?;
        if let Some(clinit) = class_ref.find_declared_method("<clinit>", "()V") {
            self.invoke_method(call_stack, class_ref, clinit, None, Vec::new())?;
        }
        Ok(())
    }

    /// cause是Error时按JVMS原样重抛，否则包一层ExceptionInInitializerError
    fn raise_initializer_error(
        &mut self,
        call_stack: &mut CallStack<'a>,
        cause: ObjectReference<'a>,
    ) -> MethodCallError<'a> {
        if cause.get_class().is_subclass_of("java/lang/Error") {
            return MethodCallError::ExceptionThrown(cause);
        }
        let error_class = match self.symbols() {
            Ok(symbols) => symbols.java_lang_exception_in_initializer_error,
            Err(e) => return MethodCallError::InternalError(e),
        };
        self.raise(
            call_stack,
            error_class,
            None,
            Some(Value::ObjectRef(cause)),
        )
    }

    pub fn new_object(&mut self, class_ref: ClassRef<'a>) -> InvokeResult<'a, ObjectReference<'a>> {
        self.object_heap
            .allocate_object(class_ref)
            .map_err(MethodCallError::InternalError)
    }

    pub fn new_primitive_array(
        &mut self,
        kind: PrimitiveKind,
        length: usize,
    ) -> InvokeResult<'a, ArrayReference<'a>> {
        let component = JavaClass::Primitive(self.method_area.primitive(kind));
        let array_class = self.method_area.new_array_class(component);
        self.object_heap
            .allocate_array(array_class, length)
            .map_err(MethodCallError::InternalError)
    }

    pub fn new_reference_array(
        &mut self,
        component: JavaClass<'a>,
        length: usize,
    ) -> InvokeResult<'a, ArrayReference<'a>> {
        let array_class = self.method_area.new_array_class(component);
        self.object_heap
            .allocate_array(array_class, length)
            .map_err(MethodCallError::InternalError)
    }

    /// multianewarray：逐层分配并回填元素
    pub fn new_multi_array(
        &mut self,
        array_class: ArrayClassRef<'a>,
        counts: &[i32],
    ) -> InvokeResult<'a, ArrayReference<'a>> {
        let length = counts[0] as usize;
        let array_ref = self
            .object_heap
            .allocate_array(array_class, length)
            .map_err(MethodCallError::InternalError)?;
        if counts.len() > 1 {
            if let JavaClass::Array(inner) = &array_class.component {
                for index in 0..length {
                    let element = self.new_multi_array(inner, &counts[1..])?;
                    array_ref
                        .set_element(index, &Value::ArrayRef(element))
                        .map_err(MethodCallError::InternalError)?;
                }
            }
        }
        Ok(array_ref)
    }

    /// 数组类按名字创建(描述符去层解析，见§4.1的ldc类解析)
    pub fn new_array_class(&mut self, component: JavaClass<'a>) -> ArrayClassRef<'a> {
        self.method_area.new_array_class(component)
    }

    /// 方法调用总入口。receiver为None表示static。
    /// synchronized方法在这里成对加解锁，异常路径也释放。
    pub fn invoke_method(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
        receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        if method_ref.is_native() {
            return self.invoke_native_method(call_stack, class_ref, method_ref, receiver, args);
        }
        if method_ref.is_abstract() {
            return Err(self.raise_abstract_method(call_stack, class_ref, method_ref));
        }

        let monitor: Option<&'a Monitor> = if method_ref.is_synchronized() {
            Some(self.monitor_for_invoke(class_ref, &receiver)?)
        } else {
            None
        };
        if let Some(monitor) = monitor {
            monitor.enter();
        }

        let locals: Vec<Value<'a>> = receiver.into_iter().chain(args).collect();
        let result = (|| {
            let mut frame =
                call_stack.new_frame(class_ref, method_ref, Vec::new(), locals)?;
            let result = frame.as_mut().execute(self, call_stack);
            call_stack.pop_frame();
            result
        })();

        if let Some(monitor) = monitor {
            monitor.exit().map_err(MethodCallError::InternalError)?;
        }
        result
    }

    fn monitor_for_invoke(
        &mut self,
        class_ref: ClassRef<'a>,
        receiver: &Option<Value<'a>>,
    ) -> InvokeResult<'a, &'a Monitor> {
        match receiver {
            Some(Value::ObjectRef(object_ref)) => Ok(object_ref.monitor()),
            Some(Value::ArrayRef(array_ref)) => Ok(array_ref.monitor()),
            None => {
                let mirror = class_ref
                    .require_mirror()
                    .map_err(MethodCallError::InternalError)?;
                Ok(mirror.monitor())
            }
            _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
    }

    pub fn invoke_native_method(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
        receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        debug!(
            "=> invoke_native_method {}:{}{}",
            class_ref.name, method_ref.name, method_ref.descriptor
        );
        let native_method = self.native_method_area.get_method(
            &class_ref.name,
            &method_ref.name,
            &method_ref.descriptor,
        );
        match native_method {
            Some(native_method) => native_method(self, call_stack, receiver, args),
            None => Err(self.raise_unsatisfied_link(call_stack, class_ref, method_ref)),
        }
    }

    /// 按接收者做动态分派。数组接收者的方法解析落在java/lang/Object。
    pub fn invoke_virtual_with_receiver(
        &mut self,
        call_stack: &mut CallStack<'a>,
        name: &str,
        descriptor: &str,
        receiver: Value<'a>,
        args: Vec<Value<'a>>,
        interface_semantics: bool,
    ) -> InvokeMethodResult<'a> {
        let receiver_class = match &receiver {
            Value::ObjectRef(object_ref) => object_ref.get_class(),
            Value::ArrayRef(_) => {
                self.symbols()
                    .map_err(MethodCallError::InternalError)?
                    .java_lang_object
            }
            Value::Null => return Err(self.raise_npe(call_stack)),
            _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        };
        self.initialize_class(call_stack, receiver_class)?;
        let resolved = if interface_semantics {
            receiver_class.resolve_interface_method(name, descriptor)
        } else {
            receiver_class.find_virtual_method(name, descriptor)
        };
        let (declaring, method_ref) = match resolved {
            Some(found) => found,
            None => {
                let owner = format!("{}.{}", receiver_class.name, name);
                return Err(self.raise_no_such_method(call_stack, &owner, descriptor));
            }
        };
        if method_ref.is_static() {
            return Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
                format!("method {}.{} is static", declaring.name, name),
            )));
        }
        if method_ref.is_abstract() {
            return Err(self.raise_abstract_method(call_stack, declaring, method_ref));
        }
        self.invoke_method(call_stack, declaring, method_ref, Some(receiver), args)
    }

    /// 未内联进处理器表的帧构造路径：按§4.4契约预置栈和局部变量表。
    pub(crate) fn execute_with_frame(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        if method_ref.is_native() {
            let receiver_count = if method_ref.is_static() { 0 } else { 1 };
            let mut locals = locals;
            let args = locals.split_off(receiver_count);
            let receiver = locals.into_iter().next();
            return self.invoke_native_method(call_stack, class_ref, method_ref, receiver, args);
        }
        let mut frame = call_stack.new_frame(class_ref, method_ref, stack_values, locals)?;
        let result = frame.as_mut().execute(self, call_stack);
        call_stack.pop_frame();
        result
    }

    pub(crate) fn raise_unsatisfied_link(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
    ) -> MethodCallError<'a> {
        let message = format!(
            "{}.{}{}",
            class_ref.name, method_ref.name, method_ref.descriptor
        );
        match self.symbols() {
            Ok(symbols) => {
                let error_class = symbols.java_lang_unsatisfied_link_error;
                self.raise(call_stack, error_class, Some(&message), None)
            }
            Err(e) => MethodCallError::InternalError(e),
        }
    }

    pub(crate) fn raise_abstract_method(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
    ) -> MethodCallError<'a> {
        let message = format!("{}.{}", class_ref.name, method_ref.name);
        match self.symbols() {
            Ok(symbols) => {
                let error_class = symbols.java_lang_abstract_method_error;
                self.raise(call_stack, error_class, Some(&message), None)
            }
            Err(e) => MethodCallError::InternalError(e),
        }
    }

}

mod tests {

    #[test]
    fn boot_fails_without_class_path() {
        use crate::configuration::VmConfiguration;
        use crate::virtual_machine::VirtualMachine;
        let mut vm = VirtualMachine::new(VmConfiguration::default());
        //没有引导类路径，boot应该报ClassNotFound
        assert!(vm.boot().is_err());
    }
}
