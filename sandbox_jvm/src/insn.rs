use crate::loaded_class::ClassRef;
use crate::reference_value::ObjectReference;
use class_file_reader::instruction::Instruction;
use once_cell::sync::OnceCell;

/// 字段访问指令第一次执行时解析出的结果，缓存在指令节点上。
/// 静态字段的offset是镜像对象内的绝对偏移(static base已加上)。
#[derive(Debug)]
pub struct FieldAccess<'a> {
    pub owner: ClassRef<'a>,
    pub offset: usize,
    pub desc: String,
    pub is_volatile: bool,
}

/// 降级后的指令节点。方法链接时从原始code字节流解码得到，
/// 保留原始bci用于跳转和异常表匹配。
/// opcode是有效操作码(wide前缀在解码时展开，这里记录被加宽的指令)。
#[derive(Debug)]
pub struct Insn<'a> {
    pub opcode: u8,
    pub bci: u16,
    pub op: Instruction,
    pub(crate) field: OnceCell<FieldAccess<'a>>,
    //invokedynamic站点的链接结果，整个站点生命周期内只物化一次
    pub(crate) call_site: OnceCell<ObjectReference<'a>>,
}

impl<'a> Insn<'a> {
    pub(crate) fn new(opcode: u8, bci: u16, op: Instruction) -> Insn<'a> {
        Insn {
            opcode,
            bci,
            op,
            field: OnceCell::new(),
            call_site: OnceCell::new(),
        }
    }
}
