use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{PrimitiveKind, ReferenceValue, Value};
use crate::loaded_class::{ArrayClassRef, ClassRef, JavaClass};
use crate::memory_chunk::align_to_8_bytes;
use crate::monitor::Monitor;
use bitfield_struct::bitfield;
use std::marker::PhantomData;
use std::mem::size_of;

///https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-2.html#jvms-2.7
///
/// 堆对象的内存形状：
/// ```text
/// | AllocateHeader | ObjectHeader/ArrayHeader | data... |
/// ```
/// 引用在字段/数组元素里存成分配区的起始地址(u64)，0表示null；
/// 读回时用AllocateHeader的kind位区分对象和数组。
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct AllocateHeader {
    #[bits(1)]
    pub(crate) kind: ReferenceValueType,
    #[bits(32)]
    pub(crate) size: usize,
    #[bits(31)]
    pub(crate) _no_use: i32,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u64)]
pub enum ReferenceValueType {
    Object,
    Array,
}

impl ReferenceValueType {
    // This has to be a const fn
    const fn into_bits(self) -> u64 {
        self as _
    }

    const fn from_bits(value: u64) -> Self {
        match value {
            1 => Self::Array,
            _ => Self::Object,
        }
    }
}

struct ObjectHeader<'a> {
    class_ref: ClassRef<'a>,
    monitor: *const Monitor,
}

struct ArrayHeader<'a> {
    class_ref: ArrayClassRef<'a>,
    monitor: *const Monitor,
    length: usize,
}

pub(crate) const ALLOC_HEADER_SIZE: usize = align_to_8_bytes(size_of::<AllocateHeader>());
pub(crate) const OBJECT_HEADER_SIZE: usize = align_to_8_bytes(size_of::<ObjectHeader>());
pub(crate) const ARRAY_HEADER_SIZE: usize = align_to_8_bytes(size_of::<ArrayHeader>());

unsafe fn write_allocate_header(ptr: *const u8, header: AllocateHeader) -> *mut u8 {
    let next_ptr = ptr as *mut AllocateHeader;
    std::ptr::write(next_ptr, header);
    next_ptr.add(1) as *mut u8
}

unsafe fn read_allocate_header(ptr: *const u8) -> AllocateHeader {
    std::ptr::read(ptr as *const AllocateHeader)
}

/// 从存储的地址还原引用。依靠kind位区分对象/数组。
pub(crate) fn value_from_address<'a>(address: u64) -> Value<'a> {
    if address == 0 {
        return Value::Null;
    }
    let ptr = address as *mut u8;
    let header = unsafe { read_allocate_header(ptr) };
    match header.kind() {
        ReferenceValueType::Object => Value::ObjectRef(ObjectReference {
            data: ptr,
            _marker: PhantomData,
        }),
        ReferenceValueType::Array => Value::ArrayRef(ArrayReference {
            data: ptr,
            _marker: PhantomData,
        }),
    }
}

fn address_of(value: &Value<'_>) -> VmExecResult<u64> {
    match value {
        Value::Null => Ok(0),
        Value::ObjectRef(object_ref) => Ok(object_ref.address()),
        Value::ArrayRef(array_ref) => Ok(array_ref.address()),
        _ => Err(VmError::ValueTypeMismatch),
    }
}

macro_rules! generate_typed_access {
    ($read_name:ident, $write_name:ident, $type:ty) => {
        pub fn $read_name(&self, offset: usize) -> $type {
            unsafe { std::ptr::read_unaligned(self.data_ptr(offset) as *const $type) }
        }

        pub fn $write_name(&self, offset: usize, value: $type) {
            unsafe { std::ptr::write_unaligned(self.data_ptr(offset) as *mut $type, value) }
        }
    };
}

/// 对象和数组共享的按字节偏移的读写。偏移越界是未定义行为，
/// 引擎必须使用布局表算出的偏移(见内存管理契约)。
macro_rules! generate_reference_accessors {
    () => {
        generate_typed_access!(read_byte, write_byte, i8);
        generate_typed_access!(read_short, write_short, i16);
        generate_typed_access!(read_char, write_char, u16);
        generate_typed_access!(read_int, write_int, i32);
        generate_typed_access!(read_long, write_long, i64);
        generate_typed_access!(read_float, write_float, f32);
        generate_typed_access!(read_double, write_double, f64);

        pub fn read_bool(&self, offset: usize) -> bool {
            self.read_byte(offset) != 0
        }

        pub fn write_bool(&self, offset: usize, value: bool) {
            self.write_byte(offset, value as i8)
        }

        pub fn read_reference(&self, offset: usize) -> Value<'a> {
            let address = unsafe { std::ptr::read_unaligned(self.data_ptr(offset) as *const u64) };
            value_from_address(address)
        }

        pub fn write_reference(&self, offset: usize, value: &Value<'a>) -> VmExecResult<()> {
            let address = address_of(value)?;
            unsafe { std::ptr::write_unaligned(self.data_ptr(offset) as *mut u64, address) };
            Ok(())
        }

        /// 按字段描述符读取，char/short/byte/boolean拓宽为Int
        pub fn read_typed(&self, offset: usize, descriptor: &str) -> Value<'a> {
            match descriptor.as_bytes()[0] {
                b'B' => Value::Int(self.read_byte(offset) as i32),
                b'Z' => Value::Int(self.read_bool(offset) as i32),
                b'C' => Value::Int(self.read_char(offset) as i32),
                b'S' => Value::Int(self.read_short(offset) as i32),
                b'I' => Value::Int(self.read_int(offset)),
                b'J' => Value::Long(self.read_long(offset)),
                b'F' => Value::Float(self.read_float(offset)),
                b'D' => Value::Double(self.read_double(offset)),
                _ => self.read_reference(offset),
            }
        }

        /// 按字段描述符写入，栈上的Int按描述符收窄
        pub fn write_typed(
            &self,
            offset: usize,
            descriptor: &str,
            value: &Value<'a>,
        ) -> VmExecResult<()> {
            match descriptor.as_bytes()[0] {
                b'B' => self.write_byte(offset, value.get_int()? as i8),
                b'Z' => self.write_bool(offset, value.get_int()? != 0),
                b'C' => self.write_char(offset, value.get_int()? as u16),
                b'S' => self.write_short(offset, value.get_int()? as i16),
                b'I' => self.write_int(offset, value.get_int()?),
                b'J' => self.write_long(offset, value.get_long()?),
                b'F' => self.write_float(offset, value.get_float()?),
                b'D' => self.write_double(offset, value.get_double()?),
                _ => self.write_reference(offset, value)?,
            }
            Ok(())
        }
    };
}

/// 对象引用。只是分配区起始地址的包装，Copy语义，生命周期跟随堆。
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ObjectReference<'a> {
    data: *mut u8,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> ObjectReference<'a> {
    pub(crate) fn new_object(
        class_ref: ClassRef<'a>,
        monitor: *const Monitor,
        start_ptr: *const u8,
        size: usize,
    ) -> ObjectReference<'a> {
        unsafe {
            let next_ptr = write_allocate_header(
                start_ptr,
                AllocateHeader::new()
                    .with_kind(ReferenceValueType::Object)
                    .with_size(size),
            );
            std::ptr::write(
                next_ptr as *mut ObjectHeader,
                ObjectHeader { class_ref, monitor },
            );
        }
        ObjectReference {
            data: start_ptr as *mut u8,
            _marker: PhantomData,
        }
    }

    fn header(&self) -> ObjectHeader<'a> {
        unsafe {
            let header_ptr = self.data.add(ALLOC_HEADER_SIZE);
            std::ptr::read(header_ptr as *const ObjectHeader)
        }
    }

    pub fn get_class(&self) -> ClassRef<'a> {
        self.header().class_ref
    }

    fn data_ptr(&self, offset: usize) -> *mut u8 {
        unsafe { self.data.add(ALLOC_HEADER_SIZE + OBJECT_HEADER_SIZE + offset) }
    }

    generate_reference_accessors!();

    pub fn is_instance_of(&self, class_ref: ClassRef<'a>) -> bool {
        class_ref.is_assignable_from(self.get_class())
    }

    /// 按名字找实例字段并读取。描述符取布局表里的
    pub fn get_field_by_name(&self, name: &str) -> VmExecResult<Value<'a>> {
        let class = self.get_class();
        let (key, offset) = class
            .virtual_layout
            .find_by_name(name)
            .ok_or_else(|| VmError::FieldNotFoundException(class.name.clone(), name.to_string()))?;
        Ok(self.read_typed(offset, &key.desc))
    }

    pub fn set_field_by_name(&self, name: &str, value: &Value<'a>) -> VmExecResult<()> {
        let class = self.get_class();
        let (key, offset) = class
            .virtual_layout
            .find_by_name(name)
            .ok_or_else(|| VmError::FieldNotFoundException(class.name.clone(), name.to_string()))?;
        self.write_typed(offset, &key.desc, value)
    }
}

impl<'a> ReferenceValue<'a> for ObjectReference<'a> {
    fn as_value(&self) -> Value<'a> {
        Value::ObjectRef(*self)
    }

    fn monitor(&self) -> &'a Monitor {
        unsafe { &*self.header().monitor }
    }

    fn address(&self) -> u64 {
        self.data as u64
    }
}

/// 数组引用。头里带长度和数组类。
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ArrayReference<'a> {
    data: *mut u8,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> ArrayReference<'a> {
    pub(crate) fn new_array(
        class_ref: ArrayClassRef<'a>,
        length: usize,
        monitor: *const Monitor,
        start_ptr: *const u8,
        size: usize,
    ) -> ArrayReference<'a> {
        unsafe {
            let next_ptr = write_allocate_header(
                start_ptr,
                AllocateHeader::new()
                    .with_kind(ReferenceValueType::Array)
                    .with_size(size),
            );
            std::ptr::write(
                next_ptr as *mut ArrayHeader,
                ArrayHeader {
                    class_ref,
                    monitor,
                    length,
                },
            );
        }
        ArrayReference {
            data: start_ptr as *mut u8,
            _marker: PhantomData,
        }
    }

    fn header(&self) -> ArrayHeader<'a> {
        unsafe {
            let header_ptr = self.data.add(ALLOC_HEADER_SIZE);
            std::ptr::read(header_ptr as *const ArrayHeader)
        }
    }

    pub fn get_class(&self) -> ArrayClassRef<'a> {
        self.header().class_ref
    }

    pub fn length(&self) -> usize {
        self.header().length
    }

    fn data_ptr(&self, offset: usize) -> *mut u8 {
        unsafe { self.data.add(ALLOC_HEADER_SIZE + ARRAY_HEADER_SIZE + offset) }
    }

    generate_reference_accessors!();

    fn check_index(&self, index: usize) -> VmExecResult<usize> {
        if index >= self.length() {
            return Err(VmError::IndexOutOfBounds);
        }
        Ok(index * self.get_class().index_scale())
    }

    /// 按元素类型读取。原始小类型拓宽为Int。
    pub fn get_element(&self, index: usize) -> VmExecResult<Value<'a>> {
        let offset = self.check_index(index)?;
        let value = match &self.get_class().component {
            JavaClass::Primitive(primitive) => match primitive.kind {
                PrimitiveKind::Byte => Value::Int(self.read_byte(offset) as i32),
                PrimitiveKind::Boolean => Value::Int(self.read_bool(offset) as i32),
                PrimitiveKind::Char => Value::Int(self.read_char(offset) as i32),
                PrimitiveKind::Short => Value::Int(self.read_short(offset) as i32),
                PrimitiveKind::Int => Value::Int(self.read_int(offset)),
                PrimitiveKind::Long => Value::Long(self.read_long(offset)),
                PrimitiveKind::Float => Value::Float(self.read_float(offset)),
                PrimitiveKind::Double => Value::Double(self.read_double(offset)),
            },
            _ => self.read_reference(offset),
        };
        Ok(value)
    }

    pub fn set_element(&self, index: usize, value: &Value<'a>) -> VmExecResult<()> {
        let offset = self.check_index(index)?;
        match &self.get_class().component {
            JavaClass::Primitive(primitive) => match primitive.kind {
                PrimitiveKind::Byte => self.write_byte(offset, value.get_int()? as i8),
                PrimitiveKind::Boolean => self.write_bool(offset, value.get_int()? != 0),
                PrimitiveKind::Char => self.write_char(offset, value.get_int()? as u16),
                PrimitiveKind::Short => self.write_short(offset, value.get_int()? as i16),
                PrimitiveKind::Int => self.write_int(offset, value.get_int()?),
                PrimitiveKind::Long => self.write_long(offset, value.get_long()?),
                PrimitiveKind::Float => self.write_float(offset, value.get_float()?),
                PrimitiveKind::Double => self.write_double(offset, value.get_double()?),
            },
            _ => self.write_reference(offset, value)?,
        }
        Ok(())
    }
}

impl<'a> ReferenceValue<'a> for ArrayReference<'a> {
    fn as_value(&self) -> Value<'a> {
        Value::ArrayRef(*self)
    }

    fn monitor(&self) -> &'a Monitor {
        unsafe { &*self.header().monitor }
    }

    fn address(&self) -> u64 {
        self.data as u64
    }
}
