use crate::call_stack::CallStack;
use crate::java_exception::{InvokeMethodResult, InvokeResult, MethodCallError};
use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{default_value_of, PrimitiveKind, Value};
use crate::loaded_class::{ClassRef, JavaClass};
use crate::reference_value::{ArrayReference, ObjectReference};
use crate::runtime_attribute_info::ConstantValueAttribute;
use crate::runtime_constant_pool::RuntimeConstantPoolEntry;
use crate::virtual_machine::VirtualMachine;
use crate::vm_thread::{VmThread, THREAD_STATUS_RUNNABLE};
use class_file_reader::class_file_reader::read_buffer;
use log::debug;

/// 辅助操作层：值搬运、字符串、异常构造、defineClass等。
/// VM其余部分(解释器、natives、链接器)都通过这里触达堆和类。
impl<'a> VirtualMachine<'a> {
    // ---------------------------------------------------------------- invoke

    /// 静态调用：先保证类初始化，方法必须是static。
    /// stack/locals按帧契约预置，宽值占两个局部槽。
    pub fn invoke_static(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        name: &str,
        descriptor: &str,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        self.initialize_class(call_stack, class_ref)?;
        let method_ref = class_ref.get_method(name, descriptor)?;
        if !method_ref.is_static() {
            return Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
                format!("method {}.{} is not static", class_ref.name, name),
            )));
        }
        self.execute_with_frame(call_stack, class_ref, method_ref, stack_values, locals)
    }

    /// 虚调用：locals[0]是接收者，解析从接收者的具体类开始，
    /// 数组接收者用java/lang/Object。
    pub fn invoke_virtual(
        &mut self,
        call_stack: &mut CallStack<'a>,
        name: &str,
        descriptor: &str,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        self.invoke_with_receiver_resolution(
            call_stack,
            name,
            descriptor,
            stack_values,
            locals,
            false,
        )
    }

    /// 接口调用：接收者类链之后还要宽度优先搜超接口
    pub fn invoke_interface(
        &mut self,
        call_stack: &mut CallStack<'a>,
        name: &str,
        descriptor: &str,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        self.invoke_with_receiver_resolution(
            call_stack,
            name,
            descriptor,
            stack_values,
            locals,
            true,
        )
    }

    fn invoke_with_receiver_resolution(
        &mut self,
        call_stack: &mut CallStack<'a>,
        name: &str,
        descriptor: &str,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
        interface_semantics: bool,
    ) -> InvokeMethodResult<'a> {
        let receiver = locals
            .first()
            .copied()
            .ok_or(MethodCallError::InternalError(VmError::ExecuteCodeError(
                "virtual invoke needs a receiver in locals[0]".to_string(),
            )))?;
        let receiver_class = match receiver {
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
        self.execute_with_frame(call_stack, declaring, method_ref, stack_values, locals)
    }

    /// 精确调用：不做解析，方法必须是声明在class上的非static方法
    pub fn invoke_exact(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        name: &str,
        descriptor: &str,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> InvokeMethodResult<'a> {
        let method_ref = class_ref.get_method(name, descriptor)?;
        if method_ref.is_static() {
            return Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
                format!("method {}.{} is static", class_ref.name, name),
            )));
        }
        self.execute_with_frame(call_stack, class_ref, method_ref, stack_values, locals)
    }

    // ---------------------------------------------------------------- string

    /// 分配VM字符串。空串直接写空数组(JDK8是[C，JDK9+是[B，
    /// 按String.value的描述符探测)；非空走<init>([C)V。
    pub fn new_utf8(
        &mut self,
        call_stack: &mut CallStack<'a>,
        text: &str,
    ) -> InvokeResult<'a, ObjectReference<'a>> {
        let string_class = self
            .symbols()
            .map_err(MethodCallError::InternalError)?
            .java_lang_string;
        self.initialize_class(call_stack, string_class)?;
        let wrapper = self.new_object(string_class)?;
        if text.is_empty() {
            if let Some(offset) = string_class.instance_field_offset("value", "[C") {
                let empty = self.to_vm_chars(&[])?;
                wrapper
                    .write_typed(offset, "[C", &Value::ArrayRef(empty))
                    .map_err(MethodCallError::InternalError)?;
            } else if let Some(offset) = string_class.instance_field_offset("value", "[B") {
                let empty = self.to_vm_bytes(&[])?;
                wrapper
                    .write_typed(offset, "[B", &Value::ArrayRef(empty))
                    .map_err(MethodCallError::InternalError)?;
            } else {
                return Err(MethodCallError::InternalError(VmError::Panic(
                    "java/lang/String has no value field".to_string(),
                )));
            }
        } else {
            let code_units: Vec<u16> = text.encode_utf16().collect();
            let char_array = self.to_vm_chars(&code_units)?;
            self.invoke_exact(
                call_stack,
                string_class,
                "<init>",
                "([C)V",
                Vec::new(),
                vec![Value::ObjectRef(wrapper), Value::ArrayRef(char_array)],
            )?;
        }
        Ok(wrapper)
    }

    /// VM字符串转宿主字符串。null返回None。
    pub fn read_utf8(
        &mut self,
        call_stack: &mut CallStack<'a>,
        value: &Value<'a>,
    ) -> InvokeResult<'a, Option<String>> {
        if value.is_null() {
            return Ok(None);
        }
        let object_ref = value.get_object().map_err(MethodCallError::InternalError)?;
        let string_class = self
            .symbols()
            .map_err(MethodCallError::InternalError)?
            .java_lang_string;
        if !std::ptr::eq(object_ref.get_class(), string_class) {
            return Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
                format!("not a string: {}", object_ref.get_class().name),
            )));
        }
        let chars = self.invoke_exact(
            call_stack,
            string_class,
            "toCharArray",
            "()[C",
            Vec::new(),
            vec![Value::ObjectRef(object_ref)],
        )?;
        let array = match chars {
            Some(Value::ArrayRef(array_ref)) => array_ref,
            _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        };
        let code_units = self
            .to_java_chars(array)
            .map_err(MethodCallError::InternalError)?;
        Ok(Some(String::from_utf16_lossy(&code_units)))
    }

    /// ldc的字符串走驻留池，同一个字面量全VM一个实例
    pub fn intern_string(
        &mut self,
        call_stack: &mut CallStack<'a>,
        text: &str,
    ) -> InvokeResult<'a, ObjectReference<'a>> {
        if let Some(interned) = self.string_pool.get(text) {
            return Ok(*interned);
        }
        let object_ref = self.new_utf8(call_stack, text)?;
        self.string_pool.insert(text.to_string(), object_ref);
        Ok(object_ref)
    }

    // ------------------------------------------------------- array transfer

    pub fn to_java_ints(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<i32>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_int())
            .collect()
    }

    pub fn to_java_longs(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<i64>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_long())
            .collect()
    }

    pub fn to_java_floats(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<f32>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_float())
            .collect()
    }

    pub fn to_java_doubles(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<f64>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_double())
            .collect()
    }

    pub fn to_java_chars(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<u16>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_int().map(|v| v as u16))
            .collect()
    }

    pub fn to_java_shorts(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<i16>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_int().map(|v| v as i16))
            .collect()
    }

    pub fn to_java_bytes(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<i8>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_int().map(|v| v as i8))
            .collect()
    }

    pub fn to_java_booleans(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<bool>> {
        (0..array.length())
            .map(|i| array.get_element(i)?.get_int().map(|v| v != 0))
            .collect()
    }

    pub fn to_java_values(&self, array: ArrayReference<'a>) -> VmExecResult<Vec<Value<'a>>> {
        (0..array.length()).map(|i| array.get_element(i)).collect()
    }

    fn to_vm_primitive<T: Copy>(
        &mut self,
        kind: PrimitiveKind,
        values: &[T],
        convert: impl Fn(T) -> Value<'a>,
    ) -> InvokeResult<'a, ArrayReference<'a>> {
        let array_ref = self.new_primitive_array(kind, values.len())?;
        for (index, value) in values.iter().enumerate() {
            array_ref
                .set_element(index, &convert(*value))
                .map_err(MethodCallError::InternalError)?;
        }
        Ok(array_ref)
    }

    //区间搬运用切片表达：to_vm_ints(&host[start..end])
    pub fn to_vm_ints(&mut self, values: &[i32]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Int, values, Value::Int)
    }

    pub fn to_vm_longs(&mut self, values: &[i64]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Long, values, Value::Long)
    }

    pub fn to_vm_floats(&mut self, values: &[f32]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Float, values, Value::Float)
    }

    pub fn to_vm_doubles(&mut self, values: &[f64]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Double, values, Value::Double)
    }

    pub fn to_vm_chars(&mut self, values: &[u16]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Char, values, |v| Value::Int(v as i32))
    }

    pub fn to_vm_shorts(&mut self, values: &[i16]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Short, values, |v| Value::Int(v as i32))
    }

    pub fn to_vm_bytes(&mut self, values: &[i8]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Byte, values, |v| Value::Int(v as i32))
    }

    pub fn to_vm_booleans(&mut self, values: &[bool]) -> InvokeResult<'a, ArrayReference<'a>> {
        self.to_vm_primitive(PrimitiveKind::Boolean, values, |v| Value::Int(v as i32))
    }

    pub fn to_vm_values(&mut self, values: &[Value<'a>]) -> InvokeResult<'a, ArrayReference<'a>> {
        let object_class = self
            .symbols()
            .map_err(MethodCallError::InternalError)?
            .java_lang_object;
        let array_ref = self.new_reference_array(JavaClass::Instance(object_class), values.len())?;
        for (index, value) in values.iter().enumerate() {
            array_ref
                .set_element(index, value)
                .map_err(MethodCallError::InternalError)?;
        }
        Ok(array_ref)
    }

    // ------------------------------------------------------------ exceptions

    /// 延迟物化异常实例：<init>()V之后直接写detailMessage/cause字段
    /// (字段存在时)。
    pub fn new_exception(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        message: Option<&str>,
        cause: Option<Value<'a>>,
    ) -> InvokeResult<'a, ObjectReference<'a>> {
        self.initialize_class(call_stack, class_ref)?;
        let instance = self.new_object(class_ref)?;
        self.invoke_exact(
            call_stack,
            class_ref,
            "<init>",
            "()V",
            Vec::new(),
            vec![Value::ObjectRef(instance)],
        )?;
        if let Some(message) = message {
            if let Some(offset) =
                class_ref.instance_field_offset("detailMessage", "Ljava/lang/String;")
            {
                let message_ref = self.new_utf8(call_stack, message)?;
                instance
                    .write_typed(offset, "Ljava/lang/String;", &Value::ObjectRef(message_ref))
                    .map_err(MethodCallError::InternalError)?;
            }
        }
        if let Some(cause) = cause {
            if let Some(offset) =
                class_ref.instance_field_offset("cause", "Ljava/lang/Throwable;")
            {
                instance
                    .write_typed(offset, "Ljava/lang/Throwable;", &cause)
                    .map_err(MethodCallError::InternalError)?;
            }
        }
        Ok(instance)
    }

    /// 构造异常并作为VMException通道的错误返回。
    /// 调用方直接`return Err(vm.raise(...))`。
    pub fn raise(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
        message: Option<&str>,
        cause: Option<Value<'a>>,
    ) -> MethodCallError<'a> {
        match self.new_exception(call_stack, class_ref, message, cause) {
            Ok(instance) => MethodCallError::ExceptionThrown(instance),
            Err(error) => error,
        }
    }

    fn raise_symbol(
        &mut self,
        call_stack: &mut CallStack<'a>,
        pick: fn(&crate::vm_symbols::VmSymbols<'a>) -> ClassRef<'a>,
        message: Option<&str>,
    ) -> MethodCallError<'a> {
        let class_ref = match self.symbols() {
            Ok(symbols) => pick(symbols),
            Err(e) => return MethodCallError::InternalError(e),
        };
        self.raise(call_stack, class_ref, message, None)
    }

    pub fn raise_npe(&mut self, call_stack: &mut CallStack<'a>) -> MethodCallError<'a> {
        self.raise_symbol(call_stack, |s| s.java_lang_null_pointer_exception, None)
    }

    pub fn raise_arithmetic(
        &mut self,
        call_stack: &mut CallStack<'a>,
        message: &str,
    ) -> MethodCallError<'a> {
        self.raise_symbol(call_stack, |s| s.java_lang_arithmetic_exception, Some(message))
    }

    pub fn raise_array_index(
        &mut self,
        call_stack: &mut CallStack<'a>,
        index: i32,
    ) -> MethodCallError<'a> {
        let message = index.to_string();
        self.raise_symbol(
            call_stack,
            |s| s.java_lang_array_index_out_of_bounds_exception,
            Some(&message),
        )
    }

    pub fn raise_negative_array_size(
        &mut self,
        call_stack: &mut CallStack<'a>,
        length: i32,
    ) -> MethodCallError<'a> {
        let message = length.to_string();
        self.raise_symbol(
            call_stack,
            |s| s.java_lang_negative_array_size_exception,
            Some(&message),
        )
    }

    pub fn raise_class_cast(
        &mut self,
        call_stack: &mut CallStack<'a>,
        from: &str,
        to: &str,
    ) -> MethodCallError<'a> {
        let message = format!("{} cannot be cast to {}", from, to);
        self.raise_symbol(call_stack, |s| s.java_lang_class_cast_exception, Some(&message))
    }

    pub fn raise_no_such_method(
        &mut self,
        call_stack: &mut CallStack<'a>,
        owner_and_name: &str,
        descriptor: &str,
    ) -> MethodCallError<'a> {
        let message = format!("{}{}", owner_and_name, descriptor);
        self.raise_symbol(call_stack, |s| s.java_lang_no_such_method_error, Some(&message))
    }

    pub fn raise_no_such_field(
        &mut self,
        call_stack: &mut CallStack<'a>,
        owner: &str,
        field: &str,
    ) -> MethodCallError<'a> {
        let message = format!("{}.{}", owner, field);
        self.raise_symbol(call_stack, |s| s.java_lang_no_such_field_error, Some(&message))
    }

    pub fn raise_no_class_def_found(
        &mut self,
        call_stack: &mut CallStack<'a>,
        name: &str,
    ) -> MethodCallError<'a> {
        if !self.booted() {
            //引导期构造不出异常对象，走宿主通道
            return MethodCallError::InternalError(VmError::ClassNotFoundException(
                name.to_string(),
            ));
        }
        self.raise_symbol(call_stack, |s| s.java_lang_no_class_def_found_error, Some(name))
    }

    pub fn raise_illegal_state(
        &mut self,
        call_stack: &mut CallStack<'a>,
        message: &str,
    ) -> MethodCallError<'a> {
        self.raise_symbol(call_stack, |s| s.java_lang_illegal_state_exception, Some(message))
    }

    // ------------------------------------------------------------- checks

    pub fn range_check(
        &mut self,
        call_stack: &mut CallStack<'a>,
        array: ArrayReference<'a>,
        index: i32,
    ) -> InvokeResult<'a, ()> {
        if index < 0 || index as usize >= array.length() {
            return Err(self.raise_array_index(call_stack, index));
        }
        Ok(())
    }

    pub fn check_array_length(
        &mut self,
        call_stack: &mut CallStack<'a>,
        length: i32,
    ) -> InvokeResult<'a, ()> {
        if length < 0 {
            return Err(self.raise_negative_array_size(call_stack, length));
        }
        Ok(())
    }

    pub fn check_not_null(
        &mut self,
        call_stack: &mut CallStack<'a>,
        value: &Value<'a>,
    ) -> InvokeResult<'a, ()> {
        if value.is_null() {
            return Err(self.raise_npe(call_stack));
        }
        Ok(())
    }

    pub fn check_array(
        &mut self,
        call_stack: &mut CallStack<'a>,
        value: &Value<'a>,
    ) -> InvokeResult<'a, ()> {
        if !matches!(value, Value::ArrayRef(_)) {
            return Err(self.raise_symbol(
                call_stack,
                |s| s.java_lang_illegal_argument_exception,
                None,
            ));
        }
        Ok(())
    }

    // ----------------------------------------------------------- statics

    /// 按静态布局写声明常量或默认值。
    /// 布局里有但字段表里没有的键意味着布局损坏，直接panic通道。
    pub fn initialize_static_fields(
        &mut self,
        call_stack: &mut CallStack<'a>,
        class_ref: ClassRef<'a>,
    ) -> InvokeResult<'a, ()> {
        let mirror = class_ref
            .require_mirror()
            .map_err(MethodCallError::InternalError)?;
        let static_base = class_ref
            .static_base()
            .map_err(MethodCallError::InternalError)?;
        for (key, offset) in class_ref.static_layout.iter() {
            let (name, desc) = (&key.name, &key.desc);
            if class_ref.declared_field(name, desc).is_none() {
                return Err(MethodCallError::InternalError(VmError::Panic(
                    "static layout is broken".to_string(),
                )));
            }
            let target = static_base + offset;
            let value = match class_ref.declared_constant(name, desc) {
                Some(ConstantValueAttribute::Int(v)) => Value::Int(*v),
                Some(ConstantValueAttribute::Float(v)) => Value::Float(*v),
                Some(ConstantValueAttribute::Long(v)) => Value::Long(*v),
                Some(ConstantValueAttribute::Double(v)) => Value::Double(*v),
                Some(ConstantValueAttribute::String(v)) => {
                    let text = v.clone();
                    Value::ObjectRef(self.intern_string(call_stack, &text)?)
                }
                None => default_value_of(desc),
            };
            mirror
                .write_typed(target, desc, &value)
                .map_err(MethodCallError::InternalError)?;
        }
        Ok(())
    }

    /// 读静态字段(名字找第一个匹配)。测试和natives用。
    pub fn get_static(&self, class_ref: ClassRef<'a>, field_name: &str) -> Option<Value<'a>> {
        let (key, offset) = class_ref.static_layout.find_by_name(field_name)?;
        let mirror = class_ref.mirror()?;
        let static_base = class_ref.static_base().ok()?;
        Some(mirror.read_typed(static_base + offset, &key.desc))
    }

    pub fn set_static(
        &self,
        class_ref: ClassRef<'a>,
        field_name: &str,
        value: Value<'a>,
    ) -> VmExecResult<()> {
        let (key, offset) = class_ref
            .static_layout
            .find_by_name(field_name)
            .ok_or_else(|| {
                VmError::FieldNotFoundException(class_ref.name.clone(), field_name.to_string())
            })?;
        let mirror = class_ref.require_mirror()?;
        let static_base = class_ref.static_base()?;
        mirror.write_typed(static_base + offset, &key.desc, &value)
    }

    /// 实例字段按虚表布局清零。declared_by限定时只清某个祖先声明的字段。
    pub fn initialize_default_values(
        &self,
        object_ref: ObjectReference<'a>,
        declared_by: Option<ClassRef<'a>>,
    ) -> VmExecResult<()> {
        let class_ref = object_ref.get_class();
        for (key, offset) in class_ref.virtual_layout.iter() {
            if let Some(declaring) = declared_by {
                if declaring.declared_field(&key.name, &key.desc).is_none() {
                    continue;
                }
            }
            object_ref.write_typed(offset, &key.desc, &default_value_of(&key.desc))?;
        }
        Ok(())
    }

    // --------------------------------------------------------------- classes

    /// §4.1的ldc常量转换
    pub fn value_from_ldc(
        &mut self,
        call_stack: &mut CallStack<'a>,
        loader: &Value<'a>,
        entry: &RuntimeConstantPoolEntry,
    ) -> InvokeResult<'a, Value<'a>> {
        match entry {
            RuntimeConstantPoolEntry::Integer(v) => Ok(Value::Int(*v)),
            RuntimeConstantPoolEntry::Float(v) => Ok(Value::Float(*v)),
            RuntimeConstantPoolEntry::Long(v) => Ok(Value::Long(*v)),
            RuntimeConstantPoolEntry::Double(v) => Ok(Value::Double(*v)),
            RuntimeConstantPoolEntry::StringReference(text) => {
                let text = text.clone();
                Ok(Value::ObjectRef(self.intern_string(call_stack, &text)?))
            }
            RuntimeConstantPoolEntry::ClassReference(name) => {
                let name = name.clone();
                let java_class = self.resolve_java_class(call_stack, loader, &name)?;
                let mirror = self.mirror_of(java_class)?;
                Ok(Value::ObjectRef(mirror))
            }
            //MethodType/MethodHandle常量只在invokedynamic路径支持
            _ => Err(MethodCallError::InternalError(VmError::NotImplemented)),
        }
    }

    /// 类名或数组描述符到类镜像：
    /// 前导[逐维剥掉，剩下的要么是原始tag，要么是L...;，要么是裸类名。
    pub fn resolve_java_class(
        &mut self,
        call_stack: &mut CallStack<'a>,
        loader: &Value<'a>,
        name: &str,
    ) -> InvokeResult<'a, JavaClass<'a>> {
        if let Some(component_name) = name.strip_prefix('[') {
            let component = self.resolve_component(call_stack, loader, component_name)?;
            let array_class = self.new_array_class(component);
            return Ok(JavaClass::Array(array_class));
        }
        let class_ref = self.get_or_load_class(call_stack, name)?;
        Ok(JavaClass::Instance(class_ref))
    }

    fn resolve_component(
        &mut self,
        call_stack: &mut CallStack<'a>,
        loader: &Value<'a>,
        descriptor: &str,
    ) -> InvokeResult<'a, JavaClass<'a>> {
        if descriptor.starts_with('[') {
            return self.resolve_java_class(call_stack, loader, descriptor);
        }
        if descriptor.len() == 1 {
            if let Some(kind) = PrimitiveKind::from_descriptor(descriptor.as_bytes()[0] as char) {
                return Ok(JavaClass::Primitive(self.primitive_class(kind)));
            }
        }
        let class_name = descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(descriptor);
        let class_ref = self.get_or_load_class(call_stack, class_name)?;
        Ok(JavaClass::Instance(class_ref))
    }

    /// 镜像对象，数组类/原始类型的镜像按需补分配
    pub fn mirror_of(&mut self, java_class: JavaClass<'a>) -> InvokeResult<'a, ObjectReference<'a>> {
        if let Some(mirror) = java_class.mirror() {
            return Ok(mirror);
        }
        self.ensure_mirrors()
            .map_err(MethodCallError::InternalError)?;
        java_class
            .mirror()
            .ok_or_else(|| MethodCallError::InternalError(VmError::Panic(
                format!("mirror allocation failed for {}", java_class.name()),
            )))
    }

    /// java.lang.ClassLoader#defineClass的VM侧。
    /// 边界检查、解析、名字校验、loader数据加锁链接、镜像装配。
    #[allow(clippy::too_many_arguments)]
    pub fn define_class(
        &mut self,
        call_stack: &mut CallStack<'a>,
        loader: Value<'a>,
        name: Option<&str>,
        bytes: &[u8],
        offset: i32,
        length: i32,
        protection_domain: Value<'a>,
        source: &str,
    ) -> InvokeResult<'a, ClassRef<'a>> {
        //一次性的符号位检查，四个量任意为负都算越界。按32位回绕语义算
        let end = offset.wrapping_add(length);
        if (offset | length | end | (bytes.len() as i32).wrapping_sub(end)) < 0 {
            return Err(self.raise_symbol(
                call_stack,
                |s| s.java_lang_array_index_out_of_bounds_exception,
                None,
            ));
        }
        let parsed = match read_buffer(&bytes[offset as usize..(offset + length) as usize]) {
            Ok(class_file) => class_file,
            Err(_) => {
                return Err(self.raise_symbol(
                    call_stack,
                    |s| s.java_lang_no_class_def_found_error,
                    None,
                ))
            }
        };
        let actual_name = parsed.this_class_name.clone();
        if let Some(requested) = name {
            if actual_name != requested.replace('.', "/") {
                let message = format!(
                    "Expected class name: {} but received: {}",
                    actual_name.replace('/', "."),
                    requested
                );
                return Err(self.raise_symbol(
                    call_stack,
                    |s| s.java_lang_class_not_found_exception,
                    Some(&message),
                ));
            }
        }
        debug!("defineClass {} from {}", actual_name, source);

        //查重和链接在loader数据的锁内完成
        let class_ref = match self.method_area().define_from_class_file(loader, parsed) {
            Ok(class_ref) => class_ref,
            Err(VmError::ClassNotFoundException(message)) => {
                return Err(self.raise_symbol(
                    call_stack,
                    |s| s.java_lang_class_not_found_exception,
                    Some(&message),
                ));
            }
            Err(e) => return Err(MethodCallError::InternalError(e)),
        };
        self.ensure_mirrors()
            .map_err(MethodCallError::InternalError)?;
        let mirror = class_ref
            .require_mirror()
            .map_err(MethodCallError::InternalError)?;
        //镜像字段按普通JVM的样子补上
        self.initialize_default_values(mirror, None)
            .map_err(MethodCallError::InternalError)?;
        //镜像上有这俩字段时才写(引导类集可能是裁剪过的)
        mirror.set_field_by_name("classLoader", &loader).ok();
        mirror
            .set_field_by_name("protectionDomain", &protection_domain)
            .ok();
        if !loader.is_null() {
            //自定义loader要把镜像挂进它的classes向量
            if let Value::ObjectRef(loader_ref) = loader {
                if let Ok(classes) = loader_ref.get_field_by_name("classes") {
                    if !classes.is_null() {
                        self.invoke_virtual(
                            call_stack,
                            "add",
                            "(Ljava/lang/Object;)Z",
                            Vec::new(),
                            vec![classes, Value::ObjectRef(mirror)],
                        )?;
                    }
                }
            }
        }
        Ok(class_ref)
    }

    // --------------------------------------------------------------- threads

    /// 把宿主线程的元数据拷到VM线程镜像上
    pub fn screen_vm_thread(
        &mut self,
        call_stack: &mut CallStack<'a>,
        vm_thread: &VmThread<'a>,
    ) -> InvokeResult<'a, ()> {
        let oop = vm_thread
            .oop()
            .ok_or(MethodCallError::InternalError(VmError::ExecuteCodeError(
                "thread has no oop".to_string(),
            )))?;
        let name = self.new_utf8(call_stack, &vm_thread.name)?;
        if let Some(offset) = oop
            .get_class()
            .instance_field_offset("name", "Ljava/lang/String;")
        {
            oop.write_typed(offset, "Ljava/lang/String;", &Value::ObjectRef(name))
                .map_err(MethodCallError::InternalError)?;
        }
        oop.set_field_by_name("priority", &Value::Int(vm_thread.priority))
            .map_err(MethodCallError::InternalError)?;
        oop.set_field_by_name("daemon", &Value::Int(vm_thread.daemon as i32))
            .map_err(MethodCallError::InternalError)?;
        oop.set_field_by_name("threadStatus", &Value::Int(THREAD_STATUS_RUNNABLE))
            .map_err(MethodCallError::InternalError)?;
        Ok(())
    }
}
