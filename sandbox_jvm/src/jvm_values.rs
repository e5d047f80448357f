use crate::jvm_error::{VmError, VmExecResult};
use crate::monitor::Monitor;

pub use crate::reference_value::{ArrayReference, ObjectReference};

///https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-2.html#jvms-2.2
///
/// 操作数栈和局部变量表里的数据。
/// char/short/byte/boolean在栈上统一表示为Int，只在写入带类型的字段/数组元素时收窄。
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    #[default]
    Uninitialized,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ReturnAddress(u32),
    ObjectRef(ObjectReference<'a>),
    ArrayRef(ArrayReference<'a>),
    Null,
}

impl<'a> Value<'a> {
    /// long/double占两个槽位
    pub fn is_wide(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::ObjectRef(_) | Value::ArrayRef(_) | Value::Null)
    }

    pub fn get_int(&self) -> VmExecResult<i32> {
        match self {
            Value::Int(v) => Ok(*v),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn get_long(&self) -> VmExecResult<i64> {
        match self {
            Value::Long(v) => Ok(*v),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn get_float(&self) -> VmExecResult<f32> {
        match self {
            Value::Float(v) => Ok(*v),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn get_double(&self) -> VmExecResult<f64> {
        match self {
            Value::Double(v) => Ok(*v),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn get_boolean(&self) -> VmExecResult<bool> {
        self.get_int().map(|v| v != 0)
    }

    pub fn get_object(&self) -> VmExecResult<ObjectReference<'a>> {
        match self {
            Value::ObjectRef(v) => Ok(*v),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn get_array(&self) -> VmExecResult<ArrayReference<'a>> {
        match self {
            Value::ArrayRef(v) => Ok(*v),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }
}

/// Possible primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl PrimitiveKind {
    pub fn from_descriptor(tag: char) -> Option<PrimitiveKind> {
        match tag {
            'B' => Some(PrimitiveKind::Byte),
            'C' => Some(PrimitiveKind::Char),
            'D' => Some(PrimitiveKind::Double),
            'F' => Some(PrimitiveKind::Float),
            'I' => Some(PrimitiveKind::Int),
            'J' => Some(PrimitiveKind::Long),
            'S' => Some(PrimitiveKind::Short),
            'Z' => Some(PrimitiveKind::Boolean),
            _ => None,
        }
    }

    //newarray指令的atype编码
    //https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5.newarray
    pub fn from_newarray_code(code: u8) -> VmExecResult<PrimitiveKind> {
        match code {
            4 => Ok(PrimitiveKind::Boolean),
            5 => Ok(PrimitiveKind::Char),
            6 => Ok(PrimitiveKind::Float),
            7 => Ok(PrimitiveKind::Double),
            8 => Ok(PrimitiveKind::Byte),
            9 => Ok(PrimitiveKind::Short),
            10 => Ok(PrimitiveKind::Int),
            11 => Ok(PrimitiveKind::Long),
            _ => Err(VmError::ValueTypeMismatch),
        }
    }

    pub fn descriptor(&self) -> char {
        match self {
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Boolean => 'Z',
        }
    }

    /// javac意义上的名字，java.lang.Class#getName对原始类型返回这个
    pub fn primitive_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Boolean => "boolean",
        }
    }

    /// 数组元素宽度(字节)
    pub fn index_scale(&self) -> usize {
        match self {
            PrimitiveKind::Byte | PrimitiveKind::Boolean => 1,
            PrimitiveKind::Char | PrimitiveKind::Short => 2,
            PrimitiveKind::Int | PrimitiveKind::Float => 4,
            PrimitiveKind::Long | PrimitiveKind::Double => 8,
        }
    }
}

/// 描述符对应的零值。非原始类型默认为Null。
pub fn default_value_of<'a>(descriptor: &str) -> Value<'a> {
    match descriptor {
        "J" => Value::Long(0),
        "D" => Value::Double(0.0),
        "F" => Value::Float(0.0),
        "I" | "S" | "B" | "Z" | "C" => Value::Int(0),
        _ => Value::Null,
    }
}

/// 堆引用的公共操作，对象和数组都实现
pub trait ReferenceValue<'a> {
    fn as_value(&self) -> Value<'a>;
    fn monitor(&self) -> &'a Monitor;
    fn address(&self) -> u64;
    fn hash_code(&self) -> i32 {
        let address = self.address();
        (address ^ (address >> 32)) as i32
    }
}
