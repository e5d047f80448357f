use crate::class_finder::{ClassFinder, ClassPath};
use crate::class_loader_data::ClassLoaderData;
use crate::field_layout::FieldLayout;
use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{PrimitiveKind, ReferenceValue, Value};
use crate::loaded_class::{
    ArrayClass, ArrayClassRef, Class, ClassRef, InitState, JavaClass, PrimitiveClass,
    PrimitiveClassRef,
};
use crate::runtime_attribute_info::{get_attr_as_bootstrap_methods, get_attr_as_source_file};
use crate::runtime_constant_pool::RuntimeConstantPool;
use crate::runtime_field_info::RuntimeFieldInfo;
use crate::runtime_method_info::RuntimeMethodInfo;
use class_file_reader::attribute_info::AttributeType;
use class_file_reader::class_file::ClassFile;
use class_file_reader::class_file_reader::read_buffer;
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::collections::HashMap;
use typed_arena::Arena;

/// 方法区：类镜像的创建与登记。
/// 类由这里的arena持有，loader数据只存非持有引用；镜像对象的分配
/// 在VirtualMachine层补做(需要堆)。
///
/// 类加载委托的简化：非空loader查自己的数据，未命中回落到引导类路径。
/// 完整的loadClass委托(进入Java代码)不在范围内。
pub struct MethodArea<'a> {
    classes: Arena<Class<'a>>,
    array_classes: Arena<ArrayClass<'a>>,
    primitive_classes: Arena<PrimitiveClass<'a>>,
    loader_data_arena: Arena<ClassLoaderData<'a>>,
    class_finder: RefCell<ClassFinder>,
    boot_loader_data: ClassLoaderData<'a>,
    //key是loader对象的地址
    loader_data: RefCell<HashMap<u64, &'a ClassLoaderData<'a>>>,
    array_class_cache: RefCell<HashMap<String, ArrayClassRef<'a>>>,
    primitive_cache: RefCell<HashMap<PrimitiveKind, PrimitiveClassRef<'a>>>,
    //镜像补齐用的全量登记
    defined: RefCell<Vec<ClassRef<'a>>>,
}

impl<'a> Default for MethodArea<'a> {
    fn default() -> Self {
        MethodArea::new()
    }
}

impl<'a> MethodArea<'a> {
    pub fn new() -> MethodArea<'a> {
        MethodArea {
            classes: Arena::new(),
            array_classes: Arena::new(),
            primitive_classes: Arena::new(),
            loader_data_arena: Arena::new(),
            class_finder: RefCell::new(ClassFinder::new()),
            boot_loader_data: ClassLoaderData::new(),
            loader_data: RefCell::new(HashMap::new()),
            array_class_cache: RefCell::new(HashMap::new()),
            primitive_cache: RefCell::new(HashMap::new()),
            defined: RefCell::new(Vec::new()),
        }
    }

    /// 从命令行读取class_path，然后添加
    pub fn add_class_path(&self, class_path: Box<dyn ClassPath>) {
        self.class_finder.borrow_mut().class_paths.push(class_path);
    }

    pub fn loader_data(&self, loader: &Value<'a>) -> VmExecResult<&ClassLoaderData<'a>> {
        match loader {
            Value::Null => Ok(&self.boot_loader_data),
            Value::ObjectRef(object_ref) => {
                let key = object_ref.address();
                if let Some(data) = self.loader_data.borrow().get(&key).copied() {
                    return Ok(data);
                }
                let data = self.loader_data_arena.alloc(ClassLoaderData::new());
                //arena分配的数据活得比&self长，放宽到'a
                let data = unsafe {
                    let ptr: *const ClassLoaderData<'a> = data;
                    &*ptr
                };
                self.loader_data.borrow_mut().insert(key, data);
                Ok(data)
            }
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn find_loaded(&self, loader: &Value<'a>, name: &str) -> Option<ClassRef<'a>> {
        match self.loader_data(loader) {
            Ok(data) => data.find(name).or_else(|| {
                if loader.is_null() {
                    None
                } else {
                    self.boot_loader_data.find(name)
                }
            }),
            Err(_) => None,
        }
    }

    pub fn is_class_loaded(&self, name: &str) -> bool {
        self.boot_loader_data.contains(name)
    }

    /// 引导类加载：查已加载 -> 类路径找字节 -> 解析定义。
    /// 父类/接口在定义前递归加载。
    pub fn load_boot_class(&self, name: &str) -> VmExecResult<ClassRef<'a>> {
        if let Some(class_ref) = self.boot_loader_data.find(name) {
            return Ok(class_ref);
        }
        let bytes = self.class_finder.borrow().find_class(name)?;
        let class_file = read_buffer(&bytes)?;
        if class_file.this_class_name != name {
            return Err(VmError::NoClassDefFoundError(format!(
                "expected {name} but class file declares {}",
                class_file.this_class_name
            )));
        }
        self.define_from_class_file(Value::Null, class_file)
    }

    /// 按loader语义查找类(先自己的数据，再回落引导)
    pub fn load_class(&self, loader: &Value<'a>, name: &str) -> VmExecResult<ClassRef<'a>> {
        if let Some(class_ref) = self.find_loaded(loader, name) {
            return Ok(class_ref);
        }
        self.load_boot_class(name)
    }

    /// 类定义事务：解析好父类/接口后构建类镜像并挂进loader数据。
    /// 同名重复定义返回ClassNotFoundException，与defineClass契约一致。
    pub fn define_from_class_file(
        &self,
        loader: Value<'a>,
        class_file: ClassFile,
    ) -> VmExecResult<ClassRef<'a>> {
        //解析super_class
        let super_class = if let Some(super_class_name) = &class_file.super_class_name {
            Some(self.load_class(&loader, super_class_name)?)
        } else {
            None
        };
        //解析加载接口
        let mut interfaces = Vec::new();
        for interface_name in &class_file.interface_names {
            interfaces.push(self.load_class(&loader, interface_name)?);
        }

        let constant_pool = RuntimeConstantPool::from(&class_file.constant_pool)?;
        let fields = class_file
            .field_info
            .into_iter()
            .map(|f| RuntimeFieldInfo::from(f, &constant_pool))
            .collect::<VmExecResult<Vec<_>>>()?;
        let methods = class_file
            .method_info
            .into_iter()
            .map(|m| RuntimeMethodInfo::from(m, &constant_pool))
            .collect::<VmExecResult<Vec<_>>>()?;

        let virtual_layout =
            FieldLayout::build_virtual(super_class.map(|c| &c.virtual_layout), &fields);
        let static_layout = FieldLayout::build_static(&fields);

        let mut bootstrap_methods = Vec::new();
        let mut source_file = None;
        for attr in &class_file.attribute_info {
            match attr.name {
                AttributeType::BootstrapMethods => {
                    bootstrap_methods = get_attr_as_bootstrap_methods(&attr.info, &constant_pool)?
                }
                AttributeType::SourceFile => {
                    source_file = Some(get_attr_as_source_file(&attr.info, &constant_pool)?)
                }
                _ => {}
            }
        }

        let class = Class {
            name: class_file.this_class_name,
            version: class_file.version,
            access_flags: class_file.access_flags,
            loader,
            super_class,
            interfaces,
            constant_pool,
            fields,
            methods,
            virtual_layout,
            static_layout,
            bootstrap_methods,
            source_file,
            mirror: OnceCell::new(),
            static_base: OnceCell::new(),
            init: Mutex::new(InitState::Loaded),
            init_cond: Condvar::new(),
        };

        let class_ref = self.classes.alloc(class);
        //self的生命周期要大于ClassRef<'a>,使用unsafe使得编译器能够编译
        let class_ref: ClassRef<'a> = unsafe {
            let class_ptr: *const Class<'a> = class_ref;
            &*class_ptr
        };

        let data = self.loader_data(&class_ref.loader)?;
        data.define_with(|classes| {
            if classes.contains_key(&class_ref.name) {
                return Err(VmError::ClassNotFoundException(format!(
                    "Class already exists: {}",
                    class_ref.name
                )));
            }
            classes.insert(class_ref.name.clone(), class_ref);
            Ok(())
        })?;
        self.defined.borrow_mut().push(class_ref);
        Ok(class_ref)
    }

    /// 数组类按名字全VM缓存，元素类型一致则复用
    pub fn new_array_class(&self, component: JavaClass<'a>) -> ArrayClassRef<'a> {
        let name = format!("[{}", component.descriptor());
        if let Some(array_class) = self.array_class_cache.borrow().get(&name).copied() {
            return array_class;
        }
        let dimensions = match &component {
            JavaClass::Array(inner) => inner.dimensions + 1,
            _ => 1,
        };
        let array_class = self.array_classes.alloc(ArrayClass {
            name: name.clone(),
            component,
            dimensions,
            mirror: OnceCell::new(),
        });
        let array_class: ArrayClassRef<'a> = unsafe {
            let ptr: *const ArrayClass<'a> = array_class;
            &*ptr
        };
        self.array_class_cache.borrow_mut().insert(name, array_class);
        array_class
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> PrimitiveClassRef<'a> {
        if let Some(primitive) = self.primitive_cache.borrow().get(&kind).copied() {
            return primitive;
        }
        let primitive = self.primitive_classes.alloc(PrimitiveClass {
            kind,
            name: kind.primitive_name(),
            mirror: OnceCell::new(),
        });
        let primitive: PrimitiveClassRef<'a> = unsafe {
            let ptr: *const PrimitiveClass<'a> = primitive;
            &*ptr
        };
        self.primitive_cache.borrow_mut().insert(kind, primitive);
        primitive
    }

    /// 已定义类的快照，镜像补齐用
    pub fn defined_classes(&self) -> Vec<ClassRef<'a>> {
        self.defined.borrow().clone()
    }

    pub fn array_classes_snapshot(&self) -> Vec<ArrayClassRef<'a>> {
        self.array_class_cache.borrow().values().copied().collect()
    }

    pub fn primitives_snapshot(&self) -> Vec<PrimitiveClassRef<'a>> {
        self.primitive_cache.borrow().values().copied().collect()
    }
}
