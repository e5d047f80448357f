use crate::field_layout::FieldLayout;
use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{PrimitiveKind, Value};
use crate::reference_value::ObjectReference;
use crate::runtime_attribute_info::{BootstrapMethodEntry, ConstantValueAttribute};
use crate::runtime_constant_pool::RuntimeConstantPool;
use crate::runtime_field_info::RuntimeFieldInfo;
use crate::runtime_method_info::RuntimeMethodInfo;
use class_file_reader::class_file::ClassAccessFlags;
use class_file_reader::class_file_version::ClassFileVersion;
use class_file_reader::method_info::MethodAccessFlags;
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::thread::ThreadId;

pub type ClassRef<'a> = &'a Class<'a>;
pub type MethodRef<'a> = &'a RuntimeMethodInfo<'a>;
pub type ArrayClassRef<'a> = &'a ArrayClass<'a>;
pub type PrimitiveClassRef<'a> = &'a PrimitiveClass<'a>;

/// 类初始化状态机。
/// Loaded -> Initializing(发起线程) -> Initialized | Errored(记录的cause)
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.5
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitState<'a> {
    Loaded,
    Initializing(ThreadId),
    Initialized,
    Errored(ObjectReference<'a>),
}

/// 实例类的VM内表示。由定义方创建后挂进所属loader的数据，
/// loader持有类(arena)，类对loader只保留非持有引用，避免所有权环。
#[derive(Debug)]
pub struct Class<'a> {
    pub name: String,
    pub version: ClassFileVersion,
    pub access_flags: ClassAccessFlags,
    //定义类加载器。引导类加载器为Null
    pub loader: Value<'a>,
    pub super_class: Option<ClassRef<'a>>,
    pub interfaces: Vec<ClassRef<'a>>,
    pub constant_pool: RuntimeConstantPool,
    pub fields: Vec<RuntimeFieldInfo>,
    pub methods: Vec<RuntimeMethodInfo<'a>>,
    //实例字段布局：父类在前，偏移对子类稳定
    pub virtual_layout: FieldLayout,
    //静态字段布局：相对static base的偏移
    pub static_layout: FieldLayout,
    pub bootstrap_methods: Vec<BootstrapMethodEntry>,
    pub source_file: Option<String>,
    pub(crate) mirror: OnceCell<ObjectReference<'a>>,
    pub(crate) static_base: OnceCell<usize>,
    pub(crate) init: Mutex<InitState<'a>>,
    pub(crate) init_cond: Condvar,
}

impl<'a> Class<'a> {
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.init.lock(), InitState::Initialized)
    }

    pub fn init_state(&self) -> InitState<'a> {
        *self.init.lock()
    }

    /// 类的镜像对象(java.lang.Class实例)。引导早期可能还没有分配。
    pub fn mirror(&self) -> Option<ObjectReference<'a>> {
        self.mirror.get().copied()
    }

    pub fn require_mirror(&self) -> VmExecResult<ObjectReference<'a>> {
        self.mirror()
            .ok_or_else(|| VmError::Panic(format!("class {} has no mirror yet", self.name)))
    }

    pub(crate) fn set_mirror(&self, oop: ObjectReference<'a>, static_base: usize) {
        self.mirror.set(oop).ok();
        self.static_base.set(static_base).ok();
    }

    /// 静态字段区在镜像对象内的起始偏移
    pub fn static_base(&self) -> VmExecResult<usize> {
        self.static_base
            .get()
            .copied()
            .ok_or_else(|| VmError::Panic(format!("class {} has no static base yet", self.name)))
    }

    pub fn find_declared_method(&'a self, name: &str, descriptor: &str) -> Option<MethodRef<'a>> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn get_method(&'a self, name: &str, descriptor: &str) -> VmExecResult<MethodRef<'a>> {
        self.find_declared_method(name, descriptor).ok_or_else(|| {
            VmError::MethodNotFoundException(
                format!("{}.{}", self.name, name),
                descriptor.to_string(),
            )
        })
    }

    /// 虚方法查找：从具体类出发沿父类链逐层找精确的(name, desc)。
    /// 找不到由调用方决定抛NoSuchMethodError还是宿主错误。
    pub fn find_virtual_method(
        &'a self,
        name: &str,
        descriptor: &str,
    ) -> Option<(ClassRef<'a>, MethodRef<'a>)> {
        let mut current: Option<ClassRef<'a>> = Some(self);
        while let Some(class_ref) = current {
            if let Some(method_ref) = class_ref.find_declared_method(name, descriptor) {
                return Some((class_ref, method_ref));
            }
            current = class_ref.super_class;
        }
        None
    }

    /// 接口方法解析：先查接收者的类链，再宽度优先查所有超接口。
    /// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.4.3.4
    pub fn resolve_interface_method(
        &'a self,
        name: &str,
        descriptor: &str,
    ) -> Option<(ClassRef<'a>, MethodRef<'a>)> {
        if let Some(found) = self.find_virtual_method(name, descriptor) {
            return Some(found);
        }
        let mut queue: VecDeque<ClassRef<'a>> = VecDeque::new();
        let mut current: Option<ClassRef<'a>> = Some(self);
        while let Some(class_ref) = current {
            queue.extend(class_ref.interfaces.iter().copied());
            current = class_ref.super_class;
        }
        //宽度优先。抽象声明先记着，继续找默认实现
        let mut abstract_fallback: Option<(ClassRef<'a>, MethodRef<'a>)> = None;
        while let Some(interface) = queue.pop_front() {
            if let Some(method_ref) = interface.find_declared_method(name, descriptor) {
                if !method_ref.is_abstract() {
                    return Some((interface, method_ref));
                }
                abstract_fallback.get_or_insert((interface, method_ref));
            }
            queue.extend(interface.interfaces.iter().copied());
        }
        abstract_fallback
    }

    /// 静态方法解析，最终方法必须带static标志
    pub fn resolve_static_method(
        &'a self,
        name: &str,
        descriptor: &str,
    ) -> VmExecResult<(ClassRef<'a>, MethodRef<'a>)> {
        let (class_ref, method_ref) =
            self.find_virtual_method(name, descriptor)
                .ok_or_else(|| {
                    VmError::MethodNotFoundException(
                        format!("{}.{}", self.name, name),
                        descriptor.to_string(),
                    )
                })?;
        if !method_ref.access_flags.contains(MethodAccessFlags::STATIC) {
            return Err(VmError::ExecuteCodeError(format!(
                "method {}.{} is not static",
                self.name, name
            )));
        }
        Ok((class_ref, method_ref))
    }

    /// 名字意义上的子类型检查(athrow断言等使用)
    pub fn is_subclass_of(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        if self.interfaces.iter().any(|i| i.is_subclass_of(name)) {
            return true;
        }
        match self.super_class {
            Some(super_class) => super_class.is_subclass_of(name),
            None => false,
        }
    }

    /// self是否是other的超类型(类或接口)
    pub fn is_assignable_from(&self, other: ClassRef<'a>) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if other
            .interfaces
            .iter()
            .any(|&interface| self.is_assignable_from(interface))
        {
            return true;
        }
        match other.super_class {
            Some(super_class) => self.is_assignable_from(super_class),
            None => false,
        }
    }

    /// 实例字段偏移。虚表布局已含继承字段，直接查即可。
    pub fn instance_field_offset(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.virtual_layout.offset_of(name, descriptor)
    }

    /// 静态字段解析：本类 -> 接口 -> 父类
    /// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.4.3.2
    pub fn resolve_static_field(
        &'a self,
        name: &str,
        descriptor: &str,
    ) -> Option<(ClassRef<'a>, usize)> {
        if let Some(offset) = self.static_layout.offset_of(name, descriptor) {
            return Some((self, offset));
        }
        for interface in &self.interfaces {
            if let Some(found) = interface.resolve_static_field(name, descriptor) {
                return Some(found);
            }
        }
        self.super_class
            .and_then(|super_class| super_class.resolve_static_field(name, descriptor))
    }

    pub fn declared_field(&self, name: &str, descriptor: &str) -> Option<&RuntimeFieldInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }

    pub fn declared_constant(
        &self,
        name: &str,
        descriptor: &str,
    ) -> Option<&ConstantValueAttribute> {
        self.declared_field(name, descriptor)
            .and_then(|f| f.constant_value.as_ref())
    }

    /// 字段是否volatile，引擎据此补内存序栅栏
    pub fn field_is_volatile(&self, name: &str, descriptor: &str) -> bool {
        let mut current: Option<&Class<'a>> = Some(self);
        while let Some(class_ref) = current {
            if let Some(field) = class_ref.declared_field(name, descriptor) {
                return field.is_volatile();
            }
            current = class_ref.super_class;
        }
        false
    }
}

/// 数组类。没有外部二进制表示，由VM按需创建并以名字缓存。
pub struct ArrayClass<'a> {
    //描述符形式的名字，比如"[I"、"[Ljava/lang/String;"
    pub name: String,
    pub component: JavaClass<'a>,
    pub dimensions: usize,
    pub(crate) mirror: OnceCell<ObjectReference<'a>>,
}

impl<'a> ArrayClass<'a> {
    pub fn mirror(&self) -> Option<ObjectReference<'a>> {
        self.mirror.get().copied()
    }

    pub(crate) fn set_mirror(&self, oop: ObjectReference<'a>) {
        self.mirror.set(oop).ok();
    }

    /// 元素宽度(字节)。引用元素按指针宽度。
    pub fn index_scale(&self) -> usize {
        match &self.component {
            JavaClass::Primitive(primitive) => primitive.kind.index_scale(),
            _ => 8,
        }
    }

    /// 数组协变：引用元素按元素类型协变，原始元素要求完全一致
    pub fn is_assignable_from(&self, other: ArrayClassRef<'a>) -> bool {
        match (&self.component, &other.component) {
            (JavaClass::Primitive(mine), JavaClass::Primitive(theirs)) => mine.kind == theirs.kind,
            (mine, theirs) => mine.is_assignable_from(theirs),
        }
    }
}

/// 原始类型的类。一个tag一个，作为数组元素锚点和ldc的类型结果。
pub struct PrimitiveClass<'a> {
    pub kind: PrimitiveKind,
    //javac风格名字: int/long/...
    pub name: &'static str,
    pub(crate) mirror: OnceCell<ObjectReference<'a>>,
}

impl<'a> PrimitiveClass<'a> {
    pub fn mirror(&self) -> Option<ObjectReference<'a>> {
        self.mirror.get().copied()
    }

    pub(crate) fn set_mirror(&self, oop: ObjectReference<'a>) {
        self.mirror.set(oop).ok();
    }
}

/// 三种类镜像的统一视图
#[derive(Clone, Copy)]
pub enum JavaClass<'a> {
    Instance(ClassRef<'a>),
    Array(ArrayClassRef<'a>),
    Primitive(PrimitiveClassRef<'a>),
}

impl<'a> JavaClass<'a> {
    pub fn name(&self) -> &str {
        match self {
            JavaClass::Instance(class_ref) => &class_ref.name,
            JavaClass::Array(array_ref) => &array_ref.name,
            JavaClass::Primitive(primitive_ref) => primitive_ref.name,
        }
    }

    /// 作为字段/数组元素出现时的描述符
    pub fn descriptor(&self) -> String {
        match self {
            JavaClass::Instance(class_ref) => format!("L{};", class_ref.name),
            JavaClass::Array(array_ref) => array_ref.name.clone(),
            JavaClass::Primitive(primitive_ref) => primitive_ref.kind.descriptor().to_string(),
        }
    }

    pub fn mirror(&self) -> Option<ObjectReference<'a>> {
        match self {
            JavaClass::Instance(class_ref) => class_ref.mirror(),
            JavaClass::Array(array_ref) => array_ref.mirror(),
            JavaClass::Primitive(primitive_ref) => primitive_ref.mirror(),
        }
    }

    pub fn ptr_eq(&self, other: &JavaClass<'a>) -> bool {
        match (self, other) {
            (JavaClass::Instance(a), JavaClass::Instance(b)) => {
                std::ptr::eq(*a as *const Class, *b as *const Class)
            }
            (JavaClass::Array(a), JavaClass::Array(b)) => {
                std::ptr::eq(*a as *const ArrayClass, *b as *const ArrayClass)
            }
            (JavaClass::Primitive(a), JavaClass::Primitive(b)) => {
                std::ptr::eq(*a as *const PrimitiveClass, *b as *const PrimitiveClass)
            }
            _ => false,
        }
    }

    /// checkcast/instanceof语义的可赋值检查
    /// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5.checkcast
    pub fn is_assignable_from(&self, other: &JavaClass<'a>) -> bool {
        match (self, other) {
            (JavaClass::Primitive(mine), JavaClass::Primitive(theirs)) => {
                mine.kind == theirs.kind
            }
            (JavaClass::Instance(mine), JavaClass::Instance(theirs)) => {
                mine.is_assignable_from(*theirs)
            }
            //数组可以赋给Object以及数组实现的标记接口
            (JavaClass::Instance(mine), JavaClass::Array(_)) => {
                mine.name == "java/lang/Object"
                    || mine.name == "java/lang/Cloneable"
                    || mine.name == "java/io/Serializable"
            }
            (JavaClass::Array(mine), JavaClass::Array(theirs)) => mine.is_assignable_from(*theirs),
            _ => false,
        }
    }
}
