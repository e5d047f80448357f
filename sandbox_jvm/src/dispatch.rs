use crate::call_stack::CallStack;
use crate::insn::Insn;
use crate::java_exception::{InvokeResult, MethodCallError};
use crate::jvm_error::VmError;
use crate::jvm_values::Value::{Double, Float, Int, Long, Null};
use crate::stack_frame::InstructionResult::ContinueMethodExecution;
use crate::stack_frame::{InstructionResult, StackFrame};
use crate::virtual_machine::VirtualMachine;
use class_file_reader::instruction::{opcode, Instruction};

/// 单个操作码的处理器。
/// 约定：进入处理器时frame.pc已经指向下一条指令，跳转类处理器
/// 以frame.cur_bci为基准改写pc。
pub type InsnProcessor<'a> = fn(
    &mut StackFrame<'a>,
    &'a Insn<'a>,
    &mut VirtualMachine<'a>,
    &mut CallStack<'a>,
) -> InvokeResult<'a, InstructionResult<'a>>;

/// 操作码下标的处理器表，VM构造时填充一次。
/// 分发是一次数组下标加间接调用，没有继承层次。
#[derive(Clone, Copy)]
pub struct DispatchTable<'a> {
    processors: [InsnProcessor<'a>; opcode::TABLE_SIZE],
}

fn unsupported<'a>(
    frame: &mut StackFrame<'a>,
    insn: &'a Insn<'a>,
    _vm: &mut VirtualMachine<'a>,
    _call_stack: &mut CallStack<'a>,
) -> InvokeResult<'a, InstructionResult<'a>> {
    Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
        format!(
            "no processor for opcode {:#x} at {}.{}:{}",
            insn.opcode, frame.class_ref.name, frame.method_ref.name, insn.bci
        ),
    )))
}

fn wrong_operand<'a, T>() -> InvokeResult<'a, T> {
    Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
        "instruction operand shape mismatch".to_string(),
    )))
}

impl<'a> Default for DispatchTable<'a> {
    fn default() -> Self {
        DispatchTable::new()
    }
}

impl<'a> DispatchTable<'a> {
    pub fn processor(&self, op: u8) -> InsnProcessor<'a> {
        self.processors[op as usize]
    }

    pub fn new() -> DispatchTable<'a> {
        let mut t: [InsnProcessor<'a>; opcode::TABLE_SIZE] = [unsupported; opcode::TABLE_SIZE];

        t[opcode::NOP as usize] = |_, _, _, _| Ok(ContinueMethodExecution);

        //常量
        t[opcode::ACONST_NULL as usize] = |f, _, _, _| f.push_continue(Null);
        t[opcode::ICONST_M1 as usize] = |f, _, _, _| f.push_continue(Int(-1));
        t[opcode::ICONST_0 as usize] = |f, _, _, _| f.push_continue(Int(0));
        t[opcode::ICONST_1 as usize] = |f, _, _, _| f.push_continue(Int(1));
        t[opcode::ICONST_2 as usize] = |f, _, _, _| f.push_continue(Int(2));
        t[opcode::ICONST_3 as usize] = |f, _, _, _| f.push_continue(Int(3));
        t[opcode::ICONST_4 as usize] = |f, _, _, _| f.push_continue(Int(4));
        t[opcode::ICONST_5 as usize] = |f, _, _, _| f.push_continue(Int(5));
        t[opcode::LCONST_0 as usize] = |f, _, _, _| f.push_continue(Long(0));
        t[opcode::LCONST_1 as usize] = |f, _, _, _| f.push_continue(Long(1));
        t[opcode::FCONST_0 as usize] = |f, _, _, _| f.push_continue(Float(0.0));
        t[opcode::FCONST_1 as usize] = |f, _, _, _| f.push_continue(Float(1.0));
        t[opcode::FCONST_2 as usize] = |f, _, _, _| f.push_continue(Float(2.0));
        t[opcode::DCONST_0 as usize] = |f, _, _, _| f.push_continue(Double(0.0));
        t[opcode::DCONST_1 as usize] = |f, _, _, _| f.push_continue(Double(1.0));
        t[opcode::BIPUSH as usize] = |f, i, _, _| match i.op {
            Instruction::Bipush(v) => f.push_continue(Int(v as i32)),
            _ => wrong_operand(),
        };
        t[opcode::SIPUSH as usize] = |f, i, _, _| match i.op {
            Instruction::Sipush(v) => f.push_continue(Int(v as i32)),
            _ => wrong_operand(),
        };
        t[opcode::LDC as usize] = |f, i, vm, s| match i.op {
            Instruction::Ldc(index) => f.exec_ldc(vm, s, index as u16),
            _ => wrong_operand(),
        };
        t[opcode::LDC_W as usize] = |f, i, vm, s| match i.op {
            Instruction::Ldc_w(index) => f.exec_ldc(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::LDC2_W as usize] = |f, i, _, _| match i.op {
            Instruction::Ldc2_w(index) => f.exec_ldc2(index),
            _ => wrong_operand(),
        };

        //局部变量读
        t[opcode::ILOAD as usize] = |f, i, _, _| match i.op {
            Instruction::Iload(n) => f.exec_iload(n),
            _ => wrong_operand(),
        };
        t[opcode::LLOAD as usize] = |f, i, _, _| match i.op {
            Instruction::Lload(n) => f.exec_lload(n),
            _ => wrong_operand(),
        };
        t[opcode::FLOAD as usize] = |f, i, _, _| match i.op {
            Instruction::Fload(n) => f.exec_fload(n),
            _ => wrong_operand(),
        };
        t[opcode::DLOAD as usize] = |f, i, _, _| match i.op {
            Instruction::Dload(n) => f.exec_dload(n),
            _ => wrong_operand(),
        };
        t[opcode::ALOAD as usize] = |f, i, _, _| match i.op {
            Instruction::Aload(n) => f.exec_aload(n),
            _ => wrong_operand(),
        };
        t[opcode::ILOAD_0 as usize] = |f, _, _, _| f.exec_iload(0);
        t[opcode::ILOAD_1 as usize] = |f, _, _, _| f.exec_iload(1);
        t[opcode::ILOAD_2 as usize] = |f, _, _, _| f.exec_iload(2);
        t[opcode::ILOAD_3 as usize] = |f, _, _, _| f.exec_iload(3);
        t[opcode::LLOAD_0 as usize] = |f, _, _, _| f.exec_lload(0);
        t[opcode::LLOAD_1 as usize] = |f, _, _, _| f.exec_lload(1);
        t[opcode::LLOAD_2 as usize] = |f, _, _, _| f.exec_lload(2);
        t[opcode::LLOAD_3 as usize] = |f, _, _, _| f.exec_lload(3);
        t[opcode::FLOAD_0 as usize] = |f, _, _, _| f.exec_fload(0);
        t[opcode::FLOAD_1 as usize] = |f, _, _, _| f.exec_fload(1);
        t[opcode::FLOAD_2 as usize] = |f, _, _, _| f.exec_fload(2);
        t[opcode::FLOAD_3 as usize] = |f, _, _, _| f.exec_fload(3);
        t[opcode::DLOAD_0 as usize] = |f, _, _, _| f.exec_dload(0);
        t[opcode::DLOAD_1 as usize] = |f, _, _, _| f.exec_dload(1);
        t[opcode::DLOAD_2 as usize] = |f, _, _, _| f.exec_dload(2);
        t[opcode::DLOAD_3 as usize] = |f, _, _, _| f.exec_dload(3);
        t[opcode::ALOAD_0 as usize] = |f, _, _, _| f.exec_aload(0);
        t[opcode::ALOAD_1 as usize] = |f, _, _, _| f.exec_aload(1);
        t[opcode::ALOAD_2 as usize] = |f, _, _, _| f.exec_aload(2);
        t[opcode::ALOAD_3 as usize] = |f, _, _, _| f.exec_aload(3);

        //数组读写。元素类型由数组类决定，8个load共用一个处理器
        for op in [
            opcode::IALOAD,
            opcode::LALOAD,
            opcode::FALOAD,
            opcode::DALOAD,
            opcode::AALOAD,
            opcode::BALOAD,
            opcode::CALOAD,
            opcode::SALOAD,
        ] {
            t[op as usize] = |f, _, vm, s| f.exec_array_load(vm, s);
        }
        for op in [
            opcode::IASTORE,
            opcode::LASTORE,
            opcode::FASTORE,
            opcode::DASTORE,
            opcode::AASTORE,
            opcode::BASTORE,
            opcode::CASTORE,
            opcode::SASTORE,
        ] {
            t[op as usize] = |f, _, vm, s| f.exec_array_store(vm, s);
        }

        //局部变量写
        t[opcode::ISTORE as usize] = |f, i, _, _| match i.op {
            Instruction::Istore(n) => f.exec_istore(n),
            _ => wrong_operand(),
        };
        t[opcode::LSTORE as usize] = |f, i, _, _| match i.op {
            Instruction::Lstore(n) => f.exec_lstore(n),
            _ => wrong_operand(),
        };
        t[opcode::FSTORE as usize] = |f, i, _, _| match i.op {
            Instruction::Fstore(n) => f.exec_fstore(n),
            _ => wrong_operand(),
        };
        t[opcode::DSTORE as usize] = |f, i, _, _| match i.op {
            Instruction::Dstore(n) => f.exec_dstore(n),
            _ => wrong_operand(),
        };
        t[opcode::ASTORE as usize] = |f, i, _, _| match i.op {
            Instruction::Astore(n) => f.exec_astore(n),
            _ => wrong_operand(),
        };
        t[opcode::ISTORE_0 as usize] = |f, _, _, _| f.exec_istore(0);
        t[opcode::ISTORE_1 as usize] = |f, _, _, _| f.exec_istore(1);
        t[opcode::ISTORE_2 as usize] = |f, _, _, _| f.exec_istore(2);
        t[opcode::ISTORE_3 as usize] = |f, _, _, _| f.exec_istore(3);
        t[opcode::LSTORE_0 as usize] = |f, _, _, _| f.exec_lstore(0);
        t[opcode::LSTORE_1 as usize] = |f, _, _, _| f.exec_lstore(1);
        t[opcode::LSTORE_2 as usize] = |f, _, _, _| f.exec_lstore(2);
        t[opcode::LSTORE_3 as usize] = |f, _, _, _| f.exec_lstore(3);
        t[opcode::FSTORE_0 as usize] = |f, _, _, _| f.exec_fstore(0);
        t[opcode::FSTORE_1 as usize] = |f, _, _, _| f.exec_fstore(1);
        t[opcode::FSTORE_2 as usize] = |f, _, _, _| f.exec_fstore(2);
        t[opcode::FSTORE_3 as usize] = |f, _, _, _| f.exec_fstore(3);
        t[opcode::DSTORE_0 as usize] = |f, _, _, _| f.exec_dstore(0);
        t[opcode::DSTORE_1 as usize] = |f, _, _, _| f.exec_dstore(1);
        t[opcode::DSTORE_2 as usize] = |f, _, _, _| f.exec_dstore(2);
        t[opcode::DSTORE_3 as usize] = |f, _, _, _| f.exec_dstore(3);
        t[opcode::ASTORE_0 as usize] = |f, _, _, _| f.exec_astore(0);
        t[opcode::ASTORE_1 as usize] = |f, _, _, _| f.exec_astore(1);
        t[opcode::ASTORE_2 as usize] = |f, _, _, _| f.exec_astore(2);
        t[opcode::ASTORE_3 as usize] = |f, _, _, _| f.exec_astore(3);

        //栈操作
        t[opcode::POP as usize] = |f, _, _, _| {
            f.op_stack.drop_one()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::POP2 as usize] = |f, _, _, _| {
            f.op_stack.drop_two()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::DUP as usize] = |f, _, _, _| {
            f.op_stack.dup()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::DUP_X1 as usize] = |f, _, _, _| {
            f.op_stack.dup_x1()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::DUP_X2 as usize] = |f, _, _, _| {
            f.op_stack.dup_x2()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::DUP2 as usize] = |f, _, _, _| {
            f.op_stack.dup2()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::DUP2_X1 as usize] = |f, _, _, _| {
            f.op_stack.dup2_x1()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::DUP2_X2 as usize] = |f, _, _, _| {
            f.op_stack.dup2_x2()?;
            Ok(ContinueMethodExecution)
        };
        t[opcode::SWAP as usize] = |f, _, _, _| {
            f.op_stack.swap()?;
            Ok(ContinueMethodExecution)
        };

        //算术。整数回绕，浮点IEEE-754
        t[opcode::IADD as usize] = |f, _, _, _| f.exec_int_math(|a, b| Ok(a.wrapping_add(b)));
        t[opcode::LADD as usize] = |f, _, _, _| f.exec_long_math(|a, b| Ok(a.wrapping_add(b)));
        t[opcode::FADD as usize] = |f, _, _, _| f.exec_float_math(|a, b| Ok(a + b));
        t[opcode::DADD as usize] = |f, _, _, _| f.exec_double_math(|a, b| Ok(a + b));
        t[opcode::ISUB as usize] = |f, _, _, _| f.exec_int_math(|a, b| Ok(a.wrapping_sub(b)));
        t[opcode::LSUB as usize] = |f, _, _, _| f.exec_long_math(|a, b| Ok(a.wrapping_sub(b)));
        t[opcode::FSUB as usize] = |f, _, _, _| f.exec_float_math(|a, b| Ok(a - b));
        t[opcode::DSUB as usize] = |f, _, _, _| f.exec_double_math(|a, b| Ok(a - b));
        t[opcode::IMUL as usize] = |f, _, _, _| f.exec_int_math(|a, b| Ok(a.wrapping_mul(b)));
        t[opcode::LMUL as usize] = |f, _, _, _| f.exec_long_math(|a, b| Ok(a.wrapping_mul(b)));
        t[opcode::FMUL as usize] = |f, _, _, _| f.exec_float_math(|a, b| Ok(a * b));
        t[opcode::DMUL as usize] = |f, _, _, _| f.exec_double_math(|a, b| Ok(a * b));
        t[opcode::IDIV as usize] = |f, _, vm, s| f.exec_int_div(vm, s, false);
        t[opcode::LDIV as usize] = |f, _, vm, s| f.exec_long_div(vm, s, false);
        t[opcode::FDIV as usize] = |f, _, _, _| f.exec_float_math(|a, b| Ok(a / b));
        t[opcode::DDIV as usize] = |f, _, _, _| f.exec_double_math(|a, b| Ok(a / b));
        t[opcode::IREM as usize] = |f, _, vm, s| f.exec_int_div(vm, s, true);
        t[opcode::LREM as usize] = |f, _, vm, s| f.exec_long_div(vm, s, true);
        t[opcode::FREM as usize] = |f, _, _, _| f.exec_float_math(|a, b| Ok(a % b));
        t[opcode::DREM as usize] = |f, _, _, _| f.exec_double_math(|a, b| Ok(a % b));
        t[opcode::INEG as usize] = |f, _, _, _| f.exec_ineg();
        t[opcode::LNEG as usize] = |f, _, _, _| f.exec_lneg();
        t[opcode::FNEG as usize] = |f, _, _, _| f.exec_fneg();
        t[opcode::DNEG as usize] = |f, _, _, _| f.exec_dneg();

        //移位和位运算。移位量int按&0x1f，long按&0x3f
        t[opcode::ISHL as usize] = |f, _, _, _| f.exec_int_shift(|a, b| a.wrapping_shl(b as u32 & 0x1f));
        t[opcode::LSHL as usize] =
            |f, _, _, _| f.exec_long_shift(|a, b| a.wrapping_shl(b as u32 & 0x3f));
        t[opcode::ISHR as usize] = |f, _, _, _| f.exec_int_shift(|a, b| a.wrapping_shr(b as u32 & 0x1f));
        t[opcode::LSHR as usize] =
            |f, _, _, _| f.exec_long_shift(|a, b| a.wrapping_shr(b as u32 & 0x3f));
        t[opcode::IUSHR as usize] =
            |f, _, _, _| f.exec_int_shift(|a, b| ((a as u32) >> (b as u32 & 0x1f)) as i32);
        t[opcode::LUSHR as usize] =
            |f, _, _, _| f.exec_long_shift(|a, b| ((a as u64) >> (b as u32 & 0x3f) as u64) as i64);
        t[opcode::IAND as usize] = |f, _, _, _| f.exec_int_math(|a, b| Ok(a & b));
        t[opcode::LAND as usize] = |f, _, _, _| f.exec_long_math(|a, b| Ok(a & b));
        t[opcode::IOR as usize] = |f, _, _, _| f.exec_int_math(|a, b| Ok(a | b));
        t[opcode::LOR as usize] = |f, _, _, _| f.exec_long_math(|a, b| Ok(a | b));
        t[opcode::IXOR as usize] = |f, _, _, _| f.exec_int_math(|a, b| Ok(a ^ b));
        t[opcode::LXOR as usize] = |f, _, _, _| f.exec_long_math(|a, b| Ok(a ^ b));

        t[opcode::IINC as usize] = |f, i, _, _| match i.op {
            Instruction::Iinc(index, delta) => f.exec_iinc(index, delta),
            _ => wrong_operand(),
        };

        //类型转换
        t[opcode::I2L as usize] = |f, _, _, _| f.exec_i2l();
        t[opcode::I2F as usize] = |f, _, _, _| f.exec_i2f();
        t[opcode::I2D as usize] = |f, _, _, _| f.exec_i2d();
        t[opcode::L2I as usize] = |f, _, _, _| f.exec_l2i();
        t[opcode::L2F as usize] = |f, _, _, _| f.exec_l2f();
        t[opcode::L2D as usize] = |f, _, _, _| f.exec_l2d();
        t[opcode::F2I as usize] = |f, _, _, _| f.exec_f2i();
        t[opcode::F2L as usize] = |f, _, _, _| f.exec_f2l();
        t[opcode::F2D as usize] = |f, _, _, _| f.exec_f2d();
        t[opcode::D2I as usize] = |f, _, _, _| f.exec_d2i();
        t[opcode::D2L as usize] = |f, _, _, _| f.exec_d2l();
        t[opcode::D2F as usize] = |f, _, _, _| f.exec_d2f();
        t[opcode::I2B as usize] = |f, _, _, _| f.exec_i2b();
        t[opcode::I2C as usize] = |f, _, _, _| f.exec_i2c();
        t[opcode::I2S as usize] = |f, _, _, _| f.exec_i2s();

        //比较。NaN时fcmpg/dcmpg给+1，fcmpl/dcmpl给-1
        t[opcode::LCMP as usize] = |f, _, _, _| f.exec_lcmp();
        t[opcode::FCMPL as usize] = |f, _, _, _| f.exec_fcmp(-1);
        t[opcode::FCMPG as usize] = |f, _, _, _| f.exec_fcmp(1);
        t[opcode::DCMPL as usize] = |f, _, _, _| f.exec_dcmp(-1);
        t[opcode::DCMPG as usize] = |f, _, _, _| f.exec_dcmp(1);

        //条件跳转
        t[opcode::IFEQ as usize] = |f, i, _, _| match i.op {
            Instruction::Ifeq(branch) => f.exec_if(branch, |v| v == 0),
            _ => wrong_operand(),
        };
        t[opcode::IFNE as usize] = |f, i, _, _| match i.op {
            Instruction::Ifne(branch) => f.exec_if(branch, |v| v != 0),
            _ => wrong_operand(),
        };
        t[opcode::IFLT as usize] = |f, i, _, _| match i.op {
            Instruction::Iflt(branch) => f.exec_if(branch, |v| v < 0),
            _ => wrong_operand(),
        };
        t[opcode::IFGE as usize] = |f, i, _, _| match i.op {
            Instruction::Ifge(branch) => f.exec_if(branch, |v| v >= 0),
            _ => wrong_operand(),
        };
        t[opcode::IFGT as usize] = |f, i, _, _| match i.op {
            Instruction::Ifgt(branch) => f.exec_if(branch, |v| v > 0),
            _ => wrong_operand(),
        };
        t[opcode::IFLE as usize] = |f, i, _, _| match i.op {
            Instruction::Ifle(branch) => f.exec_if(branch, |v| v <= 0),
            _ => wrong_operand(),
        };
        t[opcode::IF_ICMPEQ as usize] = |f, i, _, _| match i.op {
            Instruction::If_icmpeq(branch) => f.exec_if_icmp(branch, |a, b| a == b),
            _ => wrong_operand(),
        };
        t[opcode::IF_ICMPNE as usize] = |f, i, _, _| match i.op {
            Instruction::If_icmpne(branch) => f.exec_if_icmp(branch, |a, b| a != b),
            _ => wrong_operand(),
        };
        t[opcode::IF_ICMPLT as usize] = |f, i, _, _| match i.op {
            Instruction::If_icmplt(branch) => f.exec_if_icmp(branch, |a, b| a < b),
            _ => wrong_operand(),
        };
        t[opcode::IF_ICMPGE as usize] = |f, i, _, _| match i.op {
            Instruction::If_icmpge(branch) => f.exec_if_icmp(branch, |a, b| a >= b),
            _ => wrong_operand(),
        };
        t[opcode::IF_ICMPGT as usize] = |f, i, _, _| match i.op {
            Instruction::If_icmpgt(branch) => f.exec_if_icmp(branch, |a, b| a > b),
            _ => wrong_operand(),
        };
        t[opcode::IF_ICMPLE as usize] = |f, i, _, _| match i.op {
            Instruction::If_icmple(branch) => f.exec_if_icmp(branch, |a, b| a <= b),
            _ => wrong_operand(),
        };
        t[opcode::IF_ACMPEQ as usize] = |f, i, _, _| match i.op {
            Instruction::If_acmpeq(branch) => f.exec_if_acmp(branch, true),
            _ => wrong_operand(),
        };
        t[opcode::IF_ACMPNE as usize] = |f, i, _, _| match i.op {
            Instruction::If_acmpne(branch) => f.exec_if_acmp(branch, false),
            _ => wrong_operand(),
        };
        t[opcode::IFNULL as usize] = |f, i, _, _| match i.op {
            Instruction::Ifnull(branch) => f.exec_ifnull(branch, true),
            _ => wrong_operand(),
        };
        t[opcode::IFNONNULL as usize] = |f, i, _, _| match i.op {
            Instruction::Ifnonnull(branch) => f.exec_ifnull(branch, false),
            _ => wrong_operand(),
        };

        //无条件跳转和子过程
        t[opcode::GOTO as usize] = |f, i, _, _| match i.op {
            Instruction::Goto(offset) => f.exec_goto(offset as i32),
            _ => wrong_operand(),
        };
        t[opcode::GOTO_W as usize] = |f, i, _, _| match i.op {
            Instruction::Goto_w(offset) => f.exec_goto(offset),
            _ => wrong_operand(),
        };
        t[opcode::JSR as usize] = |f, i, _, _| match i.op {
            Instruction::Jsr(offset) => f.exec_jsr(offset as i32),
            _ => wrong_operand(),
        };
        t[opcode::JSR_W as usize] = |f, i, _, _| match i.op {
            Instruction::Jsr_w(offset) => f.exec_jsr(offset),
            _ => wrong_operand(),
        };
        t[opcode::RET as usize] = |f, i, _, _| match i.op {
            Instruction::Ret(index) => f.exec_ret(index),
            _ => wrong_operand(),
        };
        t[opcode::TABLESWITCH as usize] = |f, i, _, _| match &i.op {
            Instruction::Tableswitch {
                default_offset,
                low,
                high,
                jump_offsets,
            } => f.exec_tableswitch(*default_offset, *low, *high, jump_offsets),
            _ => wrong_operand(),
        };
        t[opcode::LOOKUPSWITCH as usize] = |f, i, _, _| match &i.op {
            Instruction::Lookupswitch {
                default_offset,
                pairs,
            } => f.exec_lookupswitch(*default_offset, pairs),
            _ => wrong_operand(),
        };

        //返回
        t[opcode::IRETURN as usize] = |f, _, _, _| f.exec_ireturn();
        t[opcode::LRETURN as usize] = |f, _, _, _| f.exec_lreturn();
        t[opcode::FRETURN as usize] = |f, _, _, _| f.exec_freturn();
        t[opcode::DRETURN as usize] = |f, _, _, _| f.exec_dreturn();
        t[opcode::ARETURN as usize] = |f, _, _, _| f.exec_areturn();
        t[opcode::RETURN as usize] =
            |_, _, _, _| Ok(InstructionResult::ReturnFromMethod(None));

        //字段访问，解析结果缓存在指令节点
        t[opcode::GETSTATIC as usize] = |f, i, vm, s| match i.op {
            Instruction::Getstatic(index) => f.exec_get_static(vm, s, i, index),
            _ => wrong_operand(),
        };
        t[opcode::PUTSTATIC as usize] = |f, i, vm, s| match i.op {
            Instruction::Putstatic(index) => f.exec_put_static(vm, s, i, index),
            _ => wrong_operand(),
        };
        t[opcode::GETFIELD as usize] = |f, i, vm, s| match i.op {
            Instruction::Getfield(index) => f.exec_get_field(vm, s, i, index),
            _ => wrong_operand(),
        };
        t[opcode::PUTFIELD as usize] = |f, i, vm, s| match i.op {
            Instruction::Putfield(index) => f.exec_put_field(vm, s, i, index),
            _ => wrong_operand(),
        };

        //调用
        t[opcode::INVOKEVIRTUAL as usize] = |f, i, vm, s| match i.op {
            Instruction::Invokevirtual(index) => f.exec_invoke_virtual(vm, s, index, false),
            _ => wrong_operand(),
        };
        t[opcode::INVOKESPECIAL as usize] = |f, i, vm, s| match i.op {
            Instruction::Invokespecial(index) => f.exec_invoke_special(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::INVOKESTATIC as usize] = |f, i, vm, s| match i.op {
            Instruction::Invokestatic(index) => f.exec_invoke_static(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::INVOKEINTERFACE as usize] = |f, i, vm, s| match i.op {
            Instruction::Invokeinterface(index, _) => f.exec_invoke_virtual(vm, s, index, true),
            _ => wrong_operand(),
        };
        t[opcode::INVOKEDYNAMIC as usize] = |f, i, vm, s| match i.op {
            Instruction::Invokedynamic(index) => f.exec_invoke_dynamic(vm, s, i, index),
            _ => wrong_operand(),
        };

        //分配
        t[opcode::NEW as usize] = |f, i, vm, s| match i.op {
            Instruction::New(index) => f.exec_new_object(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::NEWARRAY as usize] = |f, i, vm, s| match i.op {
            Instruction::NewArray(atype) => f.exec_new_array(vm, s, atype),
            _ => wrong_operand(),
        };
        t[opcode::ANEWARRAY as usize] = |f, i, vm, s| match i.op {
            Instruction::Anewarray(index) => f.exec_anewarray(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::MULTIANEWARRAY as usize] = |f, i, vm, s| match i.op {
            Instruction::Multianewarray(index, dimensions) => {
                f.exec_multianewarray(vm, s, index, dimensions)
            }
            _ => wrong_operand(),
        };
        t[opcode::ARRAYLENGTH as usize] = |f, _, vm, s| f.exec_arraylength(vm, s);

        //类型检查与异常
        t[opcode::CHECKCAST as usize] = |f, i, vm, s| match i.op {
            Instruction::Checkcast(index) => f.exec_checkcast(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::INSTANCEOF as usize] = |f, i, vm, s| match i.op {
            Instruction::Instanceof(index) => f.exec_instanceof(vm, s, index),
            _ => wrong_operand(),
        };
        t[opcode::ATHROW as usize] = |f, _, vm, s| f.exec_athrow(vm, s);

        //monitor
        t[opcode::MONITORENTER as usize] = |f, _, vm, s| f.exec_monitor_enter(vm, s);
        t[opcode::MONITOREXIT as usize] = |f, _, vm, s| f.exec_monitor_exit(vm, s);

        DispatchTable { processors: t }
    }
}
