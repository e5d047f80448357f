use crate::jvm_error::{VmError, VmExecResult};
use class_file_reader::constant_pool::{ConstantPool, ConstantPoolEntry, ConstantPoolPhysicalEntry};
use std::fmt::{Display, Formatter};

//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.4.3.5
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MethodHandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl MethodHandleKind {
    pub fn new(kind: u8) -> VmExecResult<MethodHandleKind> {
        match kind {
            1 => Ok(MethodHandleKind::GetField),
            2 => Ok(MethodHandleKind::GetStatic),
            3 => Ok(MethodHandleKind::PutField),
            4 => Ok(MethodHandleKind::PutStatic),
            5 => Ok(MethodHandleKind::InvokeVirtual),
            6 => Ok(MethodHandleKind::InvokeStatic),
            7 => Ok(MethodHandleKind::InvokeSpecial),
            8 => Ok(MethodHandleKind::NewInvokeSpecial),
            9 => Ok(MethodHandleKind::InvokeInterface),
            _ => Err(VmError::ReadClassBytesError(format!(
                "invalid method handle kind {kind}"
            ))),
        }
    }

    /// MethodHandleNatives使用的REF_*编码，和常量池里的tag一致
    pub fn reference_kind(&self) -> i32 {
        match self {
            MethodHandleKind::GetField => 1,
            MethodHandleKind::GetStatic => 2,
            MethodHandleKind::PutField => 3,
            MethodHandleKind::PutStatic => 4,
            MethodHandleKind::InvokeVirtual => 5,
            MethodHandleKind::InvokeStatic => 6,
            MethodHandleKind::InvokeSpecial => 7,
            MethodHandleKind::NewInvokeSpecial => 8,
            MethodHandleKind::InvokeInterface => 9,
        }
    }
}

/// 解析后的运行时常量池条目。类/字段/方法引用已经展开成名字。
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeConstantPoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    //解析ClassReference得到的是类名
    ClassReference(String),
    StringReference(String),
    // class_name,field_name,field_descriptor
    FieldReference(String, String, String),
    // class_name,method_name,method_descriptor
    MethodReference(String, String, String),
    // interface_name,method_name,method_descriptor
    InterfaceMethodReference(String, String, String),
    //name,descriptor
    NameAndTypeDescriptor(String, String),
    //kind, class_name, member_name, member_descriptor
    MethodHandle(MethodHandleKind, String, String, String),
    //descriptor
    MethodType(String),
    //bootstrap_method_attr_index, name, descriptor
    Dynamic(u16, String, String),
    //bootstrap_method_attr_index, name, descriptor
    InvokeDynamic(u16, String, String),
    Module(String),
    Package(String),
}

impl RuntimeConstantPoolEntry {
    fn get_utf8_string(cp: &ConstantPool, offset: u16) -> VmExecResult<String> {
        cp.get_string(offset)
            .map_err(|e| VmError::ReadClassBytesError(e.to_string()))
    }

    fn get_class_name_string(cp: &ConstantPool, offset: u16) -> VmExecResult<String> {
        cp.get_class_name(offset)
            .map_err(|e| VmError::ReadClassBytesError(e.to_string()))
    }

    fn get_name_and_type_string(cp: &ConstantPool, offset: u16) -> VmExecResult<(String, String)> {
        let result = cp
            .get(offset)
            .map_err(|e| VmError::ReadClassBytesError(e.to_string()))?;
        if let ConstantPoolEntry::NameAndTypeDescriptor(name_idx, type_idx) = result {
            Ok((
                Self::get_utf8_string(cp, *name_idx)?,
                Self::get_utf8_string(cp, *type_idx)?,
            ))
        } else {
            Err(VmError::ReadClassBytesError(
                "not NameAndType constant".to_string(),
            ))
        }
    }

    fn get_member_info_string(
        cp: &ConstantPool,
        offset: u16,
    ) -> VmExecResult<(String, String, String)> {
        let result = cp
            .get(offset)
            .map_err(|e| VmError::ReadClassBytesError(e.to_string()))?;
        match result {
            ConstantPoolEntry::MethodReference(class_index, name_and_type_index)
            | ConstantPoolEntry::FieldReference(class_index, name_and_type_index)
            | ConstantPoolEntry::InterfaceMethodReference(class_index, name_and_type_index) => {
                let class_name = Self::get_class_name_string(cp, *class_index)?;
                let (name, descriptor) = Self::get_name_and_type_string(cp, *name_and_type_index)?;
                Ok((class_name, name, descriptor))
            }
            _ => Err(VmError::ReadClassBytesError(
                "not a member reference constant".to_string(),
            )),
        }
    }

    fn from(cp: &ConstantPool, entry: &ConstantPoolEntry) -> VmExecResult<RuntimeConstantPoolEntry> {
        let value = match entry {
            ConstantPoolEntry::Utf8(v) => RuntimeConstantPoolEntry::Utf8(String::from(v)),
            ConstantPoolEntry::Integer(v) => RuntimeConstantPoolEntry::Integer(*v),
            ConstantPoolEntry::Float(v) => RuntimeConstantPoolEntry::Float(*v),
            ConstantPoolEntry::Long(v) => RuntimeConstantPoolEntry::Long(*v),
            ConstantPoolEntry::Double(v) => RuntimeConstantPoolEntry::Double(*v),
            ConstantPoolEntry::ClassReference(offset) => {
                RuntimeConstantPoolEntry::ClassReference(Self::get_utf8_string(cp, *offset)?)
            }
            ConstantPoolEntry::StringReference(offset) => {
                RuntimeConstantPoolEntry::StringReference(Self::get_utf8_string(cp, *offset)?)
            }
            ConstantPoolEntry::FieldReference(class_name_idx, name_type_index) => {
                let class_name = Self::get_class_name_string(cp, *class_name_idx)?;
                let (field_name, field_descriptor) =
                    Self::get_name_and_type_string(cp, *name_type_index)?;
                RuntimeConstantPoolEntry::FieldReference(class_name, field_name, field_descriptor)
            }
            ConstantPoolEntry::MethodReference(class_name_idx, name_type_index) => {
                let class_name = Self::get_class_name_string(cp, *class_name_idx)?;
                let (method_name, method_descriptor) =
                    Self::get_name_and_type_string(cp, *name_type_index)?;
                RuntimeConstantPoolEntry::MethodReference(
                    class_name,
                    method_name,
                    method_descriptor,
                )
            }
            ConstantPoolEntry::InterfaceMethodReference(interface_name_idx, name_type_index) => {
                let interface_name = Self::get_class_name_string(cp, *interface_name_idx)?;
                let (method_name, method_descriptor) =
                    Self::get_name_and_type_string(cp, *name_type_index)?;
                RuntimeConstantPoolEntry::InterfaceMethodReference(
                    interface_name,
                    method_name,
                    method_descriptor,
                )
            }
            ConstantPoolEntry::NameAndTypeDescriptor(name_index, descriptor_index) => {
                let name = Self::get_utf8_string(cp, *name_index)?;
                let descriptor = Self::get_utf8_string(cp, *descriptor_index)?;
                RuntimeConstantPoolEntry::NameAndTypeDescriptor(name, descriptor)
            }
            ConstantPoolEntry::MethodHandle(reference_kind, reference_index) => {
                let kind = MethodHandleKind::new(*reference_kind)?;
                let (class_name, member_name, member_descriptor) =
                    Self::get_member_info_string(cp, *reference_index)?;
                RuntimeConstantPoolEntry::MethodHandle(
                    kind,
                    class_name,
                    member_name,
                    member_descriptor,
                )
            }
            ConstantPoolEntry::MethodType(descriptor_index) => {
                RuntimeConstantPoolEntry::MethodType(Self::get_utf8_string(cp, *descriptor_index)?)
            }
            ConstantPoolEntry::Dynamic(bootstrap_method_attr_index, name_and_type_index) => {
                let (name, descriptor) = Self::get_name_and_type_string(cp, *name_and_type_index)?;
                RuntimeConstantPoolEntry::Dynamic(*bootstrap_method_attr_index, name, descriptor)
            }
            ConstantPoolEntry::InvokeDynamic(bootstrap_method_attr_index, name_and_type_index) => {
                let (name, descriptor) = Self::get_name_and_type_string(cp, *name_and_type_index)?;
                RuntimeConstantPoolEntry::InvokeDynamic(
                    *bootstrap_method_attr_index,
                    name,
                    descriptor,
                )
            }
            ConstantPoolEntry::Module(name_index) => {
                RuntimeConstantPoolEntry::Module(Self::get_utf8_string(cp, *name_index)?)
            }
            ConstantPoolEntry::Package(name_index) => {
                RuntimeConstantPoolEntry::Package(Self::get_utf8_string(cp, *name_index)?)
            }
        };
        Ok(value)
    }
}

#[derive(Debug)]
pub enum RuntimeConstantPoolPhysicalEntry {
    Entry(RuntimeConstantPoolEntry),
    PlaceHolder,
}

/// 运行时常量池
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.1
/// 将类常量池转换成运行时常量池。解析掉所有的索引间接，方便查找和使用。
#[derive(Debug)]
pub struct RuntimeConstantPool {
    entries: Vec<RuntimeConstantPoolPhysicalEntry>,
}

impl RuntimeConstantPool {
    fn new() -> RuntimeConstantPool {
        RuntimeConstantPool {
            entries: Vec::new(),
        }
    }

    pub fn from(cp: &ConstantPool) -> VmExecResult<RuntimeConstantPool> {
        let mut runtime_cp = Self::new();
        for entry in &cp.entries {
            let runtime_entry = match entry {
                ConstantPoolPhysicalEntry::Entry(e) => {
                    RuntimeConstantPoolPhysicalEntry::Entry(RuntimeConstantPoolEntry::from(cp, e)?)
                }
                ConstantPoolPhysicalEntry::PlaceHolder => {
                    RuntimeConstantPoolPhysicalEntry::PlaceHolder
                }
            };
            runtime_cp.entries.push(runtime_entry);
        }
        Ok(runtime_cp)
    }

    pub(crate) fn get(&self, index: u16) -> VmExecResult<&RuntimeConstantPoolEntry> {
        if index > 0 {
            if let Some(RuntimeConstantPoolPhysicalEntry::Entry(entry)) =
                self.entries.get((index - 1) as usize)
            {
                return Ok(entry);
            }
        }
        Err(VmError::ReadClassBytesError(format!(
            "invalid const pool index {index}"
        )))
    }

    pub fn get_utf8_string(&self, index: u16) -> VmExecResult<&str> {
        if let RuntimeConstantPoolEntry::Utf8(value) = self.get(index)? {
            Ok(value)
        } else {
            Err(VmError::ReadClassBytesError("should be utf8".to_string()))
        }
    }

    pub fn get_class_name(&self, index: u16) -> VmExecResult<&str> {
        if let RuntimeConstantPoolEntry::ClassReference(class_name) = self.get(index)? {
            Ok(class_name)
        } else {
            Err(VmError::ReadClassBytesError(
                "should be class reference".to_string(),
            ))
        }
    }

    pub fn get_field_reference(&self, index: u16) -> VmExecResult<(&str, &str, &str)> {
        if let RuntimeConstantPoolEntry::FieldReference(class_name, field_name, field_descriptor) =
            self.get(index)?
        {
            Ok((class_name, field_name, field_descriptor))
        } else {
            Err(VmError::ReadClassBytesError(
                "should be field reference".to_string(),
            ))
        }
    }

    /// invokevirtual/invokespecial/invokestatic允许Methodref或InterfaceMethodref
    pub fn get_method_reference(&self, index: u16) -> VmExecResult<(&str, &str, &str)> {
        match self.get(index)? {
            RuntimeConstantPoolEntry::MethodReference(class_name, method_name, descriptor)
            | RuntimeConstantPoolEntry::InterfaceMethodReference(
                class_name,
                method_name,
                descriptor,
            ) => Ok((class_name, method_name, descriptor)),
            _ => Err(VmError::ReadClassBytesError(
                "should be method reference".to_string(),
            )),
        }
    }

    pub fn get_invoke_dynamic(&self, index: u16) -> VmExecResult<(u16, &str, &str)> {
        if let RuntimeConstantPoolEntry::InvokeDynamic(bsm_index, name, descriptor) =
            self.get(index)?
        {
            Ok((*bsm_index, name, descriptor))
        } else {
            Err(VmError::ReadClassBytesError(
                "should be invoke dynamic".to_string(),
            ))
        }
    }
}

impl Display for RuntimeConstantPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            match entry {
                RuntimeConstantPoolPhysicalEntry::Entry(e) => {
                    writeln!(f, "#{} = {:?}", index + 1, e)?;
                }
                RuntimeConstantPoolPhysicalEntry::PlaceHolder => {
                    writeln!(f, "#{} = place_holder", index + 1)?;
                }
            }
        }
        Ok(())
    }
}
