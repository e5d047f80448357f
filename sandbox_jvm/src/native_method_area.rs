use crate::call_stack::CallStack;
use crate::java_exception::{InvokeMethodResult, MethodCallError};
use crate::jvm_error::VmError;
use crate::jvm_values::{PrimitiveKind, ReferenceValue, Value};
use crate::loaded_class::JavaClass;
use crate::virtual_machine::VirtualMachine;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub type NativeMethod<'a> = fn(
    &mut VirtualMachine<'a>,
    &mut CallStack<'a>,
    Option<Value<'a>>,
    Vec<Value<'a>>,
) -> InvokeMethodResult<'a>;

/// native方法登记表，key是class:name+descriptor。
/// 引导需要的最小集合预注册；文件系统相关的native统一打到
/// 配置进来的FileManager上(Unix和WinNT两套类名都接)。
pub struct NativeMethodArea<'a> {
    native_methods: HashMap<String, NativeMethod<'a>>,
}

impl<'a> NativeMethodArea<'a> {
    pub fn new_with_default_native() -> NativeMethodArea<'a> {
        let mut area = NativeMethodArea {
            native_methods: HashMap::new(),
        };
        for class_name in [
            "java/lang/Object",
            "java/lang/Class",
            "java/lang/ClassLoader",
            "java/lang/System",
            "java/lang/Thread",
            "sun/misc/Unsafe",
            "java/lang/invoke/MethodHandleNatives",
        ] {
            area.registry_native_method(class_name, "registerNatives", "()V", Self::nop);
        }

        area.registry_native_method(
            "java/lang/Class",
            "getPrimitiveClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            Self::java_lang_class_get_primitive_class,
        );
        area.registry_native_method(
            "java/lang/Class",
            "desiredAssertionStatus0",
            "(Ljava/lang/Class;)Z",
            Self::java_lang_class_desired_assertion_status0,
        );
        area.registry_native_method(
            "java/lang/Object",
            "hashCode",
            "()I",
            Self::java_lang_object_hash_code,
        );
        area.registry_native_method(
            "java/lang/Object",
            "getClass",
            "()Ljava/lang/Class;",
            Self::java_lang_object_get_class,
        );
        area.registry_native_method(
            "java/lang/Object",
            "notifyAll",
            "()V",
            Self::java_lang_object_notify_all,
        );
        area.registry_native_method(
            "java/lang/Object",
            "notify",
            "()V",
            Self::java_lang_object_notify,
        );
        area.registry_native_method(
            "java/lang/Object",
            "wait",
            "(J)V",
            Self::java_lang_object_wait,
        );
        area.registry_native_method(
            "java/lang/System",
            "arraycopy",
            "(Ljava/lang/Object;ILjava/lang/Object;II)V",
            Self::java_lang_system_arraycopy,
        );
        area.registry_native_method(
            "java/lang/System",
            "identityHashCode",
            "(Ljava/lang/Object;)I",
            Self::java_lang_system_identity_hash_code,
        );
        area.registry_native_method(
            "java/lang/System",
            "currentTimeMillis",
            "()J",
            Self::java_lang_system_current_time_millis,
        );
        area.registry_native_method(
            "java/lang/System",
            "nanoTime",
            "()J",
            Self::java_lang_system_nano_time,
        );
        area.registry_native_method(
            "java/lang/Float",
            "floatToRawIntBits",
            "(F)I",
            Self::java_lang_float_to_raw_int_bits,
        );
        area.registry_native_method(
            "java/lang/Float",
            "intBitsToFloat",
            "(I)F",
            Self::java_lang_float_int_bits_to_float,
        );
        area.registry_native_method(
            "java/lang/Double",
            "doubleToRawLongBits",
            "(D)J",
            Self::java_lang_double_to_raw_long_bits,
        );
        area.registry_native_method(
            "java/lang/Double",
            "longBitsToDouble",
            "(J)D",
            Self::java_lang_double_long_bits_to_double,
        );

        //java.io的文件系统native。Unix和NT的dispatch相同，都走FileManager
        for file_system in ["java/io/UnixFileSystem", "java/io/WinNTFileSystem"] {
            area.registry_native_method(file_system, "initIDs", "()V", Self::nop);
            area.registry_native_method(
                file_system,
                "getBooleanAttributes0",
                "(Ljava/io/File;)I",
                Self::file_system_get_boolean_attributes,
            );
            area.registry_native_method(
                file_system,
                "canonicalize0",
                "(Ljava/lang/String;)Ljava/lang/String;",
                Self::file_system_canonicalize,
            );
            area.registry_native_method(
                file_system,
                "delete0",
                "(Ljava/io/File;)Z",
                Self::file_system_delete,
            );
            area.registry_native_method(
                file_system,
                "rename0",
                "(Ljava/io/File;Ljava/io/File;)Z",
                Self::file_system_rename,
            );
            area.registry_native_method(
                file_system,
                "list",
                "(Ljava/io/File;)[Ljava/lang/String;",
                Self::file_system_list,
            );
            area.registry_native_method(
                file_system,
                "createFileExclusively",
                "(Ljava/lang/String;)Z",
                Self::file_system_create_file_exclusively,
            );
            area.registry_native_method(
                file_system,
                "checkAccess",
                "(Ljava/io/File;I)Z",
                Self::file_system_check_access,
            );
            area.registry_native_method(
                file_system,
                "getLastModifiedTime",
                "(Ljava/io/File;)J",
                Self::file_system_get_last_modified_time,
            );
            area.registry_native_method(
                file_system,
                "getLength",
                "(Ljava/io/File;)J",
                Self::file_system_get_length,
            );
            area.registry_native_method(
                file_system,
                "getSpace",
                "(Ljava/io/File;I)J",
                Self::file_system_get_space,
            );
            area.registry_native_method(
                file_system,
                "setReadOnly",
                "(Ljava/io/File;)Z",
                Self::file_system_set_read_only,
            );
            area.registry_native_method(
                file_system,
                "setLastModifiedTime",
                "(Ljava/io/File;J)Z",
                Self::file_system_set_last_modified_time,
            );
        }
        area
    }

    pub fn registry_native_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        method_descriptor: &str,
        method: NativeMethod<'a>,
    ) {
        let key = format!("{}:{}{}", class_name, method_name, method_descriptor);
        self.native_methods.insert(key, method);
    }

    pub fn get_method(
        &self,
        class_name: &str,
        method_name: &str,
        method_descriptor: &str,
    ) -> Option<NativeMethod<'a>> {
        let key = format!("{}:{}{}", class_name, method_name, method_descriptor);
        self.native_methods.get(&key).copied()
    }

    pub fn nop(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Ok(None)
    }

    fn java_lang_class_get_primitive_class(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let name = vm
            .read_utf8(call_stack, &args[0])?
            .ok_or(MethodCallError::InternalError(VmError::ValueTypeMismatch))?;
        let kind = match name.as_str() {
            "byte" => PrimitiveKind::Byte,
            "char" => PrimitiveKind::Char,
            "double" => PrimitiveKind::Double,
            "float" => PrimitiveKind::Float,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "short" => PrimitiveKind::Short,
            "boolean" => PrimitiveKind::Boolean,
            other => {
                return Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
                    format!("unknown primitive {other}"),
                )))
            }
        };
        let primitive = vm.primitive_class(kind);
        let mirror = vm.mirror_of(JavaClass::Primitive(primitive))?;
        Ok(Some(Value::ObjectRef(mirror)))
    }

    fn java_lang_class_desired_assertion_status0(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Ok(Some(Value::Int(0)))
    }

    fn java_lang_object_hash_code(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let hash = match receiver {
            Some(Value::ObjectRef(object_ref)) => object_ref.hash_code(),
            Some(Value::ArrayRef(array_ref)) => array_ref.hash_code(),
            _ => 0,
        };
        Ok(Some(Value::Int(hash)))
    }

    fn java_lang_object_get_class(
        vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let java_class = match receiver {
            Some(Value::ObjectRef(object_ref)) => JavaClass::Instance(object_ref.get_class()),
            Some(Value::ArrayRef(array_ref)) => JavaClass::Array(array_ref.get_class()),
            _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        };
        let mirror = vm.mirror_of(java_class)?;
        Ok(Some(Value::ObjectRef(mirror)))
    }

    fn monitor_of(
        receiver: &Option<Value<'a>>,
    ) -> Result<&'a crate::monitor::Monitor, MethodCallError<'a>> {
        match receiver {
            Some(Value::ObjectRef(object_ref)) => Ok(object_ref.monitor()),
            Some(Value::ArrayRef(array_ref)) => Ok(array_ref.monitor()),
            _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
    }

    fn java_lang_object_notify(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Self::monitor_of(&receiver)?.notify_one()?;
        Ok(None)
    }

    fn java_lang_object_notify_all(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Self::monitor_of(&receiver)?.notify_all()?;
        Ok(None)
    }

    fn java_lang_object_wait(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let timeout = args[0].get_long()?;
        Self::monitor_of(&receiver)?.wait(timeout, 0)?;
        Ok(None)
    }

    fn java_lang_system_arraycopy(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let from_array = args[0].get_array()?;
        let from_start = args[1].get_int()?;
        let to_array = args[2].get_array()?;
        let to_start = args[3].get_int()?;
        let length = args[4].get_int()?;
        for offset in 0..length {
            let value = from_array.get_element((offset + from_start) as usize)?;
            to_array.set_element((offset + to_start) as usize, &value)?;
        }
        Ok(None)
    }

    fn java_lang_system_identity_hash_code(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let hash = match args.first() {
            Some(Value::ObjectRef(object_ref)) => object_ref.hash_code(),
            Some(Value::ArrayRef(array_ref)) => array_ref.hash_code(),
            _ => 0,
        };
        Ok(Some(Value::Int(hash)))
    }

    fn java_lang_system_current_time_millis(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(Some(Value::Long(millis)))
    }

    fn java_lang_system_nano_time(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        _args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        Ok(Some(Value::Long(nanos)))
    }

    fn java_lang_float_to_raw_int_bits(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Ok(Some(Value::Int(args[0].get_float()?.to_bits() as i32)))
    }

    fn java_lang_float_int_bits_to_float(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Ok(Some(Value::Float(f32::from_bits(args[0].get_int()? as u32))))
    }

    fn java_lang_double_to_raw_long_bits(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Ok(Some(Value::Long(args[0].get_double()?.to_bits() as i64)))
    }

    fn java_lang_double_long_bits_to_double(
        _vm: &mut VirtualMachine<'a>,
        _call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        Ok(Some(Value::Double(f64::from_bits(
            args[0].get_long()? as u64
        ))))
    }

    // ---------------------------------------------------------- file system

    /// java.io.File实例 -> 宿主路径。path字段是String。
    fn file_path(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        file: &Value<'a>,
    ) -> Result<String, MethodCallError<'a>> {
        let file_ref = file.get_object()?;
        let path = file_ref.get_field_by_name("path")?;
        vm.read_utf8(call_stack, &path)?
            .ok_or(MethodCallError::InternalError(VmError::ValueTypeMismatch))
    }

    fn file_system_get_boolean_attributes(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let attributes = vm.file_manager().get_attributes(&path).unwrap_or(0);
        Ok(Some(Value::Int(attributes)))
    }

    fn file_system_canonicalize(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = vm
            .read_utf8(call_stack, &args[0])?
            .ok_or(MethodCallError::InternalError(VmError::ValueTypeMismatch))?;
        let canonical = vm
            .file_manager()
            .canonicalize(&path)
            .unwrap_or(path);
        let result = vm.new_utf8(call_stack, &canonical)?;
        Ok(Some(Value::ObjectRef(result)))
    }

    fn file_system_delete(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let deleted = vm.file_manager().delete(&path).unwrap_or(false);
        Ok(Some(Value::Int(deleted as i32)))
    }

    fn file_system_rename(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let from = Self::file_path(vm, call_stack, &args[0])?;
        let to = Self::file_path(vm, call_stack, &args[1])?;
        let renamed = vm.file_manager().rename(&from, &to).unwrap_or(false);
        Ok(Some(Value::Int(renamed as i32)))
    }

    fn file_system_list(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let names = match vm.file_manager().list(&path) {
            Ok(names) => names,
            Err(_) => return Ok(Some(Value::Null)),
        };
        let string_class = vm
            .symbols()
            .map_err(MethodCallError::InternalError)?
            .java_lang_string;
        let array = vm.new_reference_array(JavaClass::Instance(string_class), names.len())?;
        for (index, name) in names.iter().enumerate() {
            let vm_name = vm.new_utf8(call_stack, name)?;
            array.set_element(index, &Value::ObjectRef(vm_name))?;
        }
        Ok(Some(Value::ArrayRef(array)))
    }

    fn file_system_create_file_exclusively(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = vm
            .read_utf8(call_stack, &args[0])?
            .ok_or(MethodCallError::InternalError(VmError::ValueTypeMismatch))?;
        let created = vm
            .file_manager()
            .create_file_exclusively(&path)
            .unwrap_or(false);
        Ok(Some(Value::Int(created as i32)))
    }

    fn file_system_check_access(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let access = args[1].get_int()?;
        let allowed = vm.file_manager().check_access(&path, access).unwrap_or(false);
        Ok(Some(Value::Int(allowed as i32)))
    }

    fn file_system_get_last_modified_time(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let millis = vm
            .file_manager()
            .get_last_modified_time(&path)
            .unwrap_or(0);
        Ok(Some(Value::Long(millis)))
    }

    fn file_system_get_length(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let length = vm.file_manager().get_length(&path).unwrap_or(0);
        Ok(Some(Value::Long(length)))
    }

    fn file_system_get_space(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let kind = args[1].get_int()?;
        let space = vm.file_manager().get_space(&path, kind).unwrap_or(0);
        Ok(Some(Value::Long(space)))
    }

    fn file_system_set_read_only(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let changed = vm.file_manager().set_read_only(&path).unwrap_or(false);
        Ok(Some(Value::Int(changed as i32)))
    }

    fn file_system_set_last_modified_time(
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        _receiver: Option<Value<'a>>,
        args: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let path = Self::file_path(vm, call_stack, &args[0])?;
        let millis = args[1].get_long()?;
        let changed = vm
            .file_manager()
            .set_last_modified_time(&path, millis)
            .unwrap_or(false);
        Ok(Some(Value::Int(changed as i32)))
    }
}
