use crate::insn::Insn;
use crate::jvm_error::{VmError, VmExecResult};
use crate::runtime_constant_pool::{
    MethodHandleKind, RuntimeConstantPool, RuntimeConstantPoolEntry,
};
use class_file_reader::cesu8_byte_buffer::ByteBuffer;
use class_file_reader::instruction::{opcode, read_one_instruction};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

///https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.2
#[derive(Debug)]
pub enum ConstantValueAttribute {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
}

impl Display for ConstantValueAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstantValueAttribute::Int(v) => write!(f, "ConstantValue=>Int:{v}"),
            ConstantValueAttribute::Float(v) => write!(f, "ConstantValue=>Float:{v}"),
            ConstantValueAttribute::Long(v) => write!(f, "ConstantValue=>Long:{v}"),
            ConstantValueAttribute::Double(v) => write!(f, "ConstantValue=>Double:{v}"),
            ConstantValueAttribute::String(v) => write!(f, "ConstantValue=>String:{v}"),
        }
    }
}

pub(crate) fn get_attr_as_constant_value(
    value: &[u8],
    cp: &RuntimeConstantPool,
) -> VmExecResult<ConstantValueAttribute> {
    if value.len() != 2 {
        return Err(VmError::ReadClassBytesError(
            "broken ConstantValue attribute".to_string(),
        ));
    }
    let const_pool_index = u16::from_be_bytes(value.try_into().unwrap());
    match cp.get(const_pool_index)? {
        RuntimeConstantPoolEntry::Integer(v) => Ok(ConstantValueAttribute::Int(*v)),
        RuntimeConstantPoolEntry::Float(v) => Ok(ConstantValueAttribute::Float(*v)),
        RuntimeConstantPoolEntry::Long(v) => Ok(ConstantValueAttribute::Long(*v)),
        RuntimeConstantPoolEntry::Double(v) => Ok(ConstantValueAttribute::Double(*v)),
        RuntimeConstantPoolEntry::StringReference(v) => {
            Ok(ConstantValueAttribute::String(v.clone()))
        }
        _ => Err(VmError::ReadClassBytesError(
            "unsupported ConstantValue entry".to_string(),
        )),
    }
}

#[derive(Debug)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: Option<String>,
}

impl ExceptionTableEntry {
    /// [start_pc, end_pc)覆盖该指令
    pub fn covers(&self, bci: u16) -> bool {
        self.start_pc <= bci && bci < self.end_pc
    }
}

///
/// ```c
/// Code_attribute {
///     u2 attribute_name_index;
///     u4 attribute_length;
///
///     u2 max_stack;
///     u2 max_locals;
///     u4 code_length;
///     u1 code[code_length];
///     u2 exception_table_length;
///     {   u2 start_pc;
///         u2 end_pc;
///         u2 handler_pc;
///         u2 catch_type;
///     } exception_table[exception_table_length];
///     u2 attributes_count;
///     attribute_info attributes[attributes_count];
/// }
/// ```
///
/// 方法链接时原始code字节流被解码成指令节点列表，
/// 跳转目标仍是bci，通过index_of_bci换算回下标。
#[derive(Debug)]
pub struct CodeAttribute<'a> {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Insn<'a>>,
    index_of_bci: HashMap<u16, usize>,
    pub exception_table: Vec<ExceptionTableEntry>,
    //start_pc -> line number
    pub line_number_table: IndexMap<u16, u16>,
}

impl<'a> CodeAttribute<'a> {
    pub fn index_of(&self, bci: u16) -> VmExecResult<usize> {
        self.index_of_bci
            .get(&bci)
            .copied()
            .ok_or(VmError::ExecuteCodeError(format!(
                "jump target {bci} is not an instruction boundary"
            )))
    }

    pub fn line_number_at(&self, bci: u16) -> u16 {
        let mut current_line_number: u16 = 0;
        for (start, line_number) in self.line_number_table.iter() {
            if *start <= bci {
                current_line_number = *line_number
            } else {
                break;
            }
        }
        current_line_number
    }
}

pub(crate) fn get_attr_as_code<'a>(
    value: &[u8],
    cp: &RuntimeConstantPool,
) -> VmExecResult<CodeAttribute<'a>> {
    let mut buffer = ByteBuffer::new(value);
    let max_stack = buffer.read_u16()?;
    let max_locals = buffer.read_u16()?;
    let code_length = buffer.read_u32()?;
    let code = buffer.read_bytes(code_length as usize)?;

    //解码整个指令流。tableswitch/lookupswitch的对齐以code起始为基准，
    //所以必须用覆盖整个code数组的buffer。
    let mut instructions = Vec::new();
    let mut index_of_bci = HashMap::new();
    let mut code_buffer = ByteBuffer::new(code);
    while code_buffer.has_more_data() {
        let bci = code_buffer.position as u16;
        let mut effective_opcode = code[code_buffer.position];
        if effective_opcode == opcode::WIDE {
            effective_opcode = code[code_buffer.position + 1];
        }
        let op = read_one_instruction(&mut code_buffer)?;
        index_of_bci.insert(bci, instructions.len());
        instructions.push(Insn::new(effective_opcode, bci, op));
    }

    let exception_table_length = buffer.read_u16()?;
    let mut exception_table = Vec::with_capacity(exception_table_length as usize);
    for _ in 0..exception_table_length {
        let start_pc = buffer.read_u16()?;
        let end_pc = buffer.read_u16()?;
        let handler_pc = buffer.read_u16()?;
        let catch_type_index = buffer.read_u16()?;
        let catch_type = if catch_type_index == 0 {
            None
        } else {
            Some(cp.get_class_name(catch_type_index)?.to_string())
        };
        exception_table.push(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }

    let attributes_count = buffer.read_u16()?;
    let mut line_number_table = IndexMap::new();
    for _ in 0..attributes_count {
        let attribute_name_index = buffer.read_u16()?;
        let attribute_length = buffer.read_u32()?;
        let attribute_bytes = buffer.read_bytes(attribute_length as usize)?;
        let attribute_name = cp.get_utf8_string(attribute_name_index)?;
        if attribute_name == "LineNumberTable" {
            let mut line_number_reader = ByteBuffer::new(attribute_bytes);
            let line_number_table_length = line_number_reader.read_u16()?;
            for _ in 0..line_number_table_length {
                let start_pc = line_number_reader.read_u16()?;
                let line_number = line_number_reader.read_u16()?;
                line_number_table.insert(start_pc, line_number);
            }
        }
        //LocalVariableTable等调试属性引擎用不到，跳过
    }

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        instructions,
        index_of_bci,
        exception_table,
        line_number_table,
    })
}

pub(crate) fn get_attr_as_exception(
    bytes: &[u8],
    cp: &RuntimeConstantPool,
) -> VmExecResult<Vec<String>> {
    let mut buffer = ByteBuffer::new(bytes);
    let number_of_exceptions = buffer.read_u16()?;
    let mut result = Vec::with_capacity(number_of_exceptions as usize);
    for _ in 0..number_of_exceptions {
        let exception_index = buffer.read_u16()?;
        result.push(cp.get_class_name(exception_index)?.to_string());
    }
    Ok(result)
}

/// invokedynamic站点引用的引导方法
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.23
#[derive(Debug)]
pub struct BootstrapMethodEntry {
    pub kind: MethodHandleKind,
    pub class_name: String,
    pub method_name: String,
    pub method_descriptor: String,
    //静态引导参数的常量池下标
    pub arguments: Vec<u16>,
}

pub(crate) fn get_attr_as_bootstrap_methods(
    bytes: &[u8],
    cp: &RuntimeConstantPool,
) -> VmExecResult<Vec<BootstrapMethodEntry>> {
    let mut buffer = ByteBuffer::new(bytes);
    let count = buffer.read_u16()?;
    let mut result = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let method_ref_index = buffer.read_u16()?;
        let (kind, class_name, method_name, method_descriptor) =
            if let RuntimeConstantPoolEntry::MethodHandle(kind, class_name, name, descriptor) =
                cp.get(method_ref_index)?
            {
                (*kind, class_name.clone(), name.clone(), descriptor.clone())
            } else {
                return Err(VmError::ReadClassBytesError(
                    "bootstrap method should be a MethodHandle".to_string(),
                ));
            };
        let argument_count = buffer.read_u16()?;
        let mut arguments = Vec::with_capacity(argument_count as usize);
        for _ in 0..argument_count {
            arguments.push(buffer.read_u16()?);
        }
        result.push(BootstrapMethodEntry {
            kind,
            class_name,
            method_name,
            method_descriptor,
            arguments,
        });
    }
    Ok(result)
}

pub(crate) fn get_attr_as_source_file(
    bytes: &[u8],
    cp: &RuntimeConstantPool,
) -> VmExecResult<String> {
    let mut buffer = ByteBuffer::new(bytes);
    let index = buffer.read_u16()?;
    Ok(cp.get_utf8_string(index)?.to_string())
}
