use crate::cesu8_byte_buffer::ByteBuffer;
use crate::class_file_error::{ClassFileError, Result};
use std::fmt::{Display, Formatter};

pub type ConstantPoolIndex = u16;

//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4
#[derive(Debug, PartialEq, Clone)]
pub enum ConstantPoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    ClassReference(ConstantPoolIndex),
    StringReference(ConstantPoolIndex),
    FieldReference(ConstantPoolIndex, ConstantPoolIndex),
    MethodReference(ConstantPoolIndex, ConstantPoolIndex),
    InterfaceMethodReference(ConstantPoolIndex, ConstantPoolIndex),
    NameAndTypeDescriptor(ConstantPoolIndex, ConstantPoolIndex),
    MethodHandle(u8, ConstantPoolIndex),
    MethodType(ConstantPoolIndex),
    Dynamic(u16, ConstantPoolIndex),
    InvokeDynamic(u16, ConstantPoolIndex),
    Module(ConstantPoolIndex),
    Package(ConstantPoolIndex),
}

/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4
/// ```c
/// cp_info {
///     u1 tag;
///     u1 info[];
/// }
/// ```
/// tag 确定了字段类型，依据类型读取后续的信息。后续信息是个不定长的信息。
impl ConstantPoolEntry {
    pub fn read_from_bytes(buffer: &mut ByteBuffer) -> Result<ConstantPoolEntry> {
        let flag = buffer.read_u8()?;
        match flag {
            1 => ConstantPoolEntry::read_utf8(buffer),
            3 => buffer.read_i32().map(ConstantPoolEntry::Integer),
            4 => buffer.read_f32().map(ConstantPoolEntry::Float),
            5 => buffer.read_i64().map(ConstantPoolEntry::Long),
            6 => buffer.read_f64().map(ConstantPoolEntry::Double),
            7 => buffer.read_u16().map(ConstantPoolEntry::ClassReference),
            8 => buffer.read_u16().map(ConstantPoolEntry::StringReference),
            9 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::FieldReference(f1, f2)),
            10 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::MethodReference(f1, f2)),
            11 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::InterfaceMethodReference(f1, f2)),
            12 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::NameAndTypeDescriptor(f1, f2)),
            15 => buffer
                .read_u8_u16()
                .map(|(f1, f2)| ConstantPoolEntry::MethodHandle(f1, f2)),
            16 => buffer.read_u16().map(ConstantPoolEntry::MethodType),
            17 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::Dynamic(f1, f2)),
            18 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::InvokeDynamic(f1, f2)),
            19 => buffer.read_u16().map(ConstantPoolEntry::Module),
            20 => buffer.read_u16().map(ConstantPoolEntry::Package),
            t => Err(ClassFileError::ConstantPoolTagNotSupport(t)),
        }
    }

    fn read_utf8(buffer: &mut ByteBuffer) -> Result<ConstantPoolEntry> {
        let length = buffer.read_u16()?;
        buffer
            .read_utf8(length as usize)
            .map(ConstantPoolEntry::Utf8)
    }
}

//面向32位计算机设计的。所以double和long会占用两个槽位，使用空占位符占位
#[derive(Debug)]
pub enum ConstantPoolPhysicalEntry {
    Entry(ConstantPoolEntry),
    PlaceHolder,
}

/// Implementation of the constant pool of a java class.
/// Note that constants are 1-based in java.
#[derive(Debug, Default)]
pub struct ConstantPool {
    pub entries: Vec<ConstantPoolPhysicalEntry>,
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        ConstantPool::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, entry: ConstantPoolEntry) -> ConstantPoolIndex {
        let index = (self.entries.len() + 1) as u16;
        let take_two_words = matches!(
            &entry,
            ConstantPoolEntry::Long(_) | ConstantPoolEntry::Double(_)
        );
        self.entries.push(ConstantPoolPhysicalEntry::Entry(entry));
        if take_two_words {
            self.entries.push(ConstantPoolPhysicalEntry::PlaceHolder)
        }
        index
    }

    pub fn get(&self, offset: ConstantPoolIndex) -> Result<&ConstantPoolEntry> {
        if offset == 0 {
            return Err(ClassFileError::InvalidConstantPoolIndexError(offset));
        }
        match self.entries.get((offset - 1) as usize) {
            Some(ConstantPoolPhysicalEntry::Entry(e)) => Ok(e),
            _ => Err(ClassFileError::InvalidConstantPoolIndexError(offset)),
        }
    }

    pub fn try_get(&self, offset: ConstantPoolIndex) -> Option<&ConstantPoolEntry> {
        if offset == 0 {
            return None;
        }
        match self.entries.get((offset - 1) as usize) {
            Some(ConstantPoolPhysicalEntry::Entry(e)) => Some(e),
            _ => None,
        }
    }

    pub fn get_string(&self, offset: ConstantPoolIndex) -> Result<String> {
        if let ConstantPoolEntry::Utf8(value) = self.get(offset)? {
            Ok(value.clone())
        } else {
            Err(ClassFileError::InvalidClassData(format!(
                "should be utf8 string at {offset}"
            )))
        }
    }

    pub fn try_get_string(&self, offset: ConstantPoolIndex) -> Option<String> {
        if let Some(ConstantPoolEntry::Utf8(value)) = self.try_get(offset) {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn get_class_name(&self, offset: ConstantPoolIndex) -> Result<String> {
        if let ConstantPoolEntry::ClassReference(value) = self.get(offset)? {
            self.get_string(*value)
        } else {
            Err(ClassFileError::InvalidClassData(format!(
                "should be class reference at {offset}"
            )))
        }
    }

    pub fn try_get_class_name(&self, offset: ConstantPoolIndex) -> Option<String> {
        if let Some(ConstantPoolEntry::ClassReference(value)) = self.try_get(offset) {
            self.try_get_string(*value)
        } else {
            None
        }
    }
}

impl Display for ConstantPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Constant pool: (size: {})", self.entries.len())?;
        for (raw_idx, entry) in self.entries.iter().enumerate() {
            let index = raw_idx + 1;
            match entry {
                ConstantPoolPhysicalEntry::Entry(e) => writeln!(f, "    #{index} = {e:?}")?,
                ConstantPoolPhysicalEntry::PlaceHolder => {
                    writeln!(f, "    #{index} = place_holder")?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::class_file_error::ClassFileError;
    use crate::constant_pool::{ConstantPool, ConstantPoolEntry};

    #[test]
    fn constant_pool_works() {
        let mut cp = ConstantPool::new();
        assert_eq!(1, cp.add(ConstantPoolEntry::Utf8("hey".to_string())));
        assert_eq!(2, cp.add(ConstantPoolEntry::Integer(1)));
        assert_eq!(3, cp.add(ConstantPoolEntry::Long(123)));
        // the long takes two physical slots
        assert_eq!(5, cp.add(ConstantPoolEntry::ClassReference(1)));

        assert_eq!(
            ConstantPoolEntry::Utf8("hey".to_string()),
            *cp.get(1).unwrap()
        );
        assert_eq!(ConstantPoolEntry::Integer(1), *cp.get(2).unwrap());
        assert_eq!(ConstantPoolEntry::Long(123), *cp.get(3).unwrap());
        assert_eq!(
            Err(ClassFileError::InvalidConstantPoolIndexError(4)),
            cp.get(4).cloned()
        );
        assert_eq!("hey", cp.get_class_name(5).unwrap());
        assert_eq!(
            Err(ClassFileError::InvalidConstantPoolIndexError(0)),
            cp.get(0).cloned()
        );
    }
}
