use crate::cesu8_byte_buffer::ByteBuffer;
use crate::class_file_error::{ClassFileError, Result};

//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5

/// 指令对应的操作码。解释器的分发表以操作码为下标。
#[allow(dead_code)]
pub mod opcode {
    pub const NOP: u8 = 0x00;
    pub const ACONST_NULL: u8 = 0x01;
    pub const ICONST_M1: u8 = 0x02;
    pub const ICONST_0: u8 = 0x03;
    pub const ICONST_1: u8 = 0x04;
    pub const ICONST_2: u8 = 0x05;
    pub const ICONST_3: u8 = 0x06;
    pub const ICONST_4: u8 = 0x07;
    pub const ICONST_5: u8 = 0x08;
    pub const LCONST_0: u8 = 0x09;
    pub const LCONST_1: u8 = 0x0a;
    pub const FCONST_0: u8 = 0x0b;
    pub const FCONST_1: u8 = 0x0c;
    pub const FCONST_2: u8 = 0x0d;
    pub const DCONST_0: u8 = 0x0e;
    pub const DCONST_1: u8 = 0x0f;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD: u8 = 0x15;
    pub const LLOAD: u8 = 0x16;
    pub const FLOAD: u8 = 0x17;
    pub const DLOAD: u8 = 0x18;
    pub const ALOAD: u8 = 0x19;
    pub const ILOAD_0: u8 = 0x1a;
    pub const ILOAD_1: u8 = 0x1b;
    pub const ILOAD_2: u8 = 0x1c;
    pub const ILOAD_3: u8 = 0x1d;
    pub const LLOAD_0: u8 = 0x1e;
    pub const LLOAD_1: u8 = 0x1f;
    pub const LLOAD_2: u8 = 0x20;
    pub const LLOAD_3: u8 = 0x21;
    pub const FLOAD_0: u8 = 0x22;
    pub const FLOAD_1: u8 = 0x23;
    pub const FLOAD_2: u8 = 0x24;
    pub const FLOAD_3: u8 = 0x25;
    pub const DLOAD_0: u8 = 0x26;
    pub const DLOAD_1: u8 = 0x27;
    pub const DLOAD_2: u8 = 0x28;
    pub const DLOAD_3: u8 = 0x29;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ALOAD_1: u8 = 0x2b;
    pub const ALOAD_2: u8 = 0x2c;
    pub const ALOAD_3: u8 = 0x2d;
    pub const IALOAD: u8 = 0x2e;
    pub const LALOAD: u8 = 0x2f;
    pub const FALOAD: u8 = 0x30;
    pub const DALOAD: u8 = 0x31;
    pub const AALOAD: u8 = 0x32;
    pub const BALOAD: u8 = 0x33;
    pub const CALOAD: u8 = 0x34;
    pub const SALOAD: u8 = 0x35;
    pub const ISTORE: u8 = 0x36;
    pub const LSTORE: u8 = 0x37;
    pub const FSTORE: u8 = 0x38;
    pub const DSTORE: u8 = 0x39;
    pub const ASTORE: u8 = 0x3a;
    pub const ISTORE_0: u8 = 0x3b;
    pub const ISTORE_1: u8 = 0x3c;
    pub const ISTORE_2: u8 = 0x3d;
    pub const ISTORE_3: u8 = 0x3e;
    pub const LSTORE_0: u8 = 0x3f;
    pub const LSTORE_1: u8 = 0x40;
    pub const LSTORE_2: u8 = 0x41;
    pub const LSTORE_3: u8 = 0x42;
    pub const FSTORE_0: u8 = 0x43;
    pub const FSTORE_1: u8 = 0x44;
    pub const FSTORE_2: u8 = 0x45;
    pub const FSTORE_3: u8 = 0x46;
    pub const DSTORE_0: u8 = 0x47;
    pub const DSTORE_1: u8 = 0x48;
    pub const DSTORE_2: u8 = 0x49;
    pub const DSTORE_3: u8 = 0x4a;
    pub const ASTORE_0: u8 = 0x4b;
    pub const ASTORE_1: u8 = 0x4c;
    pub const ASTORE_2: u8 = 0x4d;
    pub const ASTORE_3: u8 = 0x4e;
    pub const IASTORE: u8 = 0x4f;
    pub const LASTORE: u8 = 0x50;
    pub const FASTORE: u8 = 0x51;
    pub const DASTORE: u8 = 0x52;
    pub const AASTORE: u8 = 0x53;
    pub const BASTORE: u8 = 0x54;
    pub const CASTORE: u8 = 0x55;
    pub const SASTORE: u8 = 0x56;
    pub const POP: u8 = 0x57;
    pub const POP2: u8 = 0x58;
    pub const DUP: u8 = 0x59;
    pub const DUP_X1: u8 = 0x5a;
    pub const DUP_X2: u8 = 0x5b;
    pub const DUP2: u8 = 0x5c;
    pub const DUP2_X1: u8 = 0x5d;
    pub const DUP2_X2: u8 = 0x5e;
    pub const SWAP: u8 = 0x5f;
    pub const IADD: u8 = 0x60;
    pub const LADD: u8 = 0x61;
    pub const FADD: u8 = 0x62;
    pub const DADD: u8 = 0x63;
    pub const ISUB: u8 = 0x64;
    pub const LSUB: u8 = 0x65;
    pub const FSUB: u8 = 0x66;
    pub const DSUB: u8 = 0x67;
    pub const IMUL: u8 = 0x68;
    pub const LMUL: u8 = 0x69;
    pub const FMUL: u8 = 0x6a;
    pub const DMUL: u8 = 0x6b;
    pub const IDIV: u8 = 0x6c;
    pub const LDIV: u8 = 0x6d;
    pub const FDIV: u8 = 0x6e;
    pub const DDIV: u8 = 0x6f;
    pub const IREM: u8 = 0x70;
    pub const LREM: u8 = 0x71;
    pub const FREM: u8 = 0x72;
    pub const DREM: u8 = 0x73;
    pub const INEG: u8 = 0x74;
    pub const LNEG: u8 = 0x75;
    pub const FNEG: u8 = 0x76;
    pub const DNEG: u8 = 0x77;
    pub const ISHL: u8 = 0x78;
    pub const LSHL: u8 = 0x79;
    pub const ISHR: u8 = 0x7a;
    pub const LSHR: u8 = 0x7b;
    pub const IUSHR: u8 = 0x7c;
    pub const LUSHR: u8 = 0x7d;
    pub const IAND: u8 = 0x7e;
    pub const LAND: u8 = 0x7f;
    pub const IOR: u8 = 0x80;
    pub const LOR: u8 = 0x81;
    pub const IXOR: u8 = 0x82;
    pub const LXOR: u8 = 0x83;
    pub const IINC: u8 = 0x84;
    pub const I2L: u8 = 0x85;
    pub const I2F: u8 = 0x86;
    pub const I2D: u8 = 0x87;
    pub const L2I: u8 = 0x88;
    pub const L2F: u8 = 0x89;
    pub const L2D: u8 = 0x8a;
    pub const F2I: u8 = 0x8b;
    pub const F2L: u8 = 0x8c;
    pub const F2D: u8 = 0x8d;
    pub const D2I: u8 = 0x8e;
    pub const D2L: u8 = 0x8f;
    pub const D2F: u8 = 0x90;
    pub const I2B: u8 = 0x91;
    pub const I2C: u8 = 0x92;
    pub const I2S: u8 = 0x93;
    pub const LCMP: u8 = 0x94;
    pub const FCMPL: u8 = 0x95;
    pub const FCMPG: u8 = 0x96;
    pub const DCMPL: u8 = 0x97;
    pub const DCMPG: u8 = 0x98;
    pub const IFEQ: u8 = 0x99;
    pub const IFNE: u8 = 0x9a;
    pub const IFLT: u8 = 0x9b;
    pub const IFGE: u8 = 0x9c;
    pub const IFGT: u8 = 0x9d;
    pub const IFLE: u8 = 0x9e;
    pub const IF_ICMPEQ: u8 = 0x9f;
    pub const IF_ICMPNE: u8 = 0xa0;
    pub const IF_ICMPLT: u8 = 0xa1;
    pub const IF_ICMPGE: u8 = 0xa2;
    pub const IF_ICMPGT: u8 = 0xa3;
    pub const IF_ICMPLE: u8 = 0xa4;
    pub const IF_ACMPEQ: u8 = 0xa5;
    pub const IF_ACMPNE: u8 = 0xa6;
    pub const GOTO: u8 = 0xa7;
    pub const JSR: u8 = 0xa8;
    pub const RET: u8 = 0xa9;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const IRETURN: u8 = 0xac;
    pub const LRETURN: u8 = 0xad;
    pub const FRETURN: u8 = 0xae;
    pub const DRETURN: u8 = 0xaf;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const NEWARRAY: u8 = 0xbc;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const ARRAYLENGTH: u8 = 0xbe;
    pub const ATHROW: u8 = 0xbf;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const MONITORENTER: u8 = 0xc2;
    pub const MONITOREXIT: u8 = 0xc3;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
    pub const IFNULL: u8 = 0xc6;
    pub const IFNONNULL: u8 = 0xc7;
    pub const GOTO_W: u8 = 0xc8;
    pub const JSR_W: u8 = 0xc9;

    /// 分发表的槽位个数（0x00..=0xc9，wide在解码时被消化）
    pub const TABLE_SIZE: usize = 0xca;
}

/// 解码后的指令。局部变量下标统一为u16：wide前缀在解码时展开到同一个变体。
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Aaload,
    Aastore,
    Aconst_null,
    Aload(u16),
    Aload_0,
    Aload_1,
    Aload_2,
    Aload_3,
    Anewarray(u16),
    Areturn,
    Arraylength,
    Astore(u16),
    Astore_0,
    Astore_1,
    Astore_2,
    Astore_3,
    Athrow,
    Baload,
    Bastore,
    Bipush(i8),
    Caload,
    Castore,
    Checkcast(u16),
    D2f,
    D2i,
    D2l,
    Dadd,
    Daload,
    Dastore,
    Dcmpg,
    Dcmpl,
    Dconst_0,
    Dconst_1,
    Ddiv,
    Dload(u16),
    Dload_0,
    Dload_1,
    Dload_2,
    Dload_3,
    Dmul,
    Dneg,
    Drem,
    Dreturn,
    Dstore(u16),
    Dstore_0,
    Dstore_1,
    Dstore_2,
    Dstore_3,
    Dsub,
    Dup,
    Dup_x1,
    Dup_x2,
    Dup2,
    Dup2_x1,
    Dup2_x2,
    F2d,
    F2i,
    F2l,
    Fadd,
    Faload,
    Fastore,
    Fcmpg,
    Fcmpl,
    Fconst_0,
    Fconst_1,
    Fconst_2,
    Fdiv,
    Fload(u16),
    Fload_0,
    Fload_1,
    Fload_2,
    Fload_3,
    Fmul,
    Fneg,
    Frem,
    Freturn,
    Fstore(u16),
    Fstore_0,
    Fstore_1,
    Fstore_2,
    Fstore_3,
    Fsub,
    Getfield(u16),
    Getstatic(u16),
    Goto(i16),
    Goto_w(i32),
    I2b,
    I2c,
    I2d,
    I2f,
    I2l,
    I2s,
    Iadd,
    Iaload,
    Iand,
    Iastore,
    Iconst_m1,
    Iconst_0,
    Iconst_1,
    Iconst_2,
    Iconst_3,
    Iconst_4,
    Iconst_5,
    Idiv,
    If_acmpeq(i16),
    If_acmpne(i16),
    If_icmpeq(i16),
    If_icmpne(i16),
    If_icmplt(i16),
    If_icmpge(i16),
    If_icmpgt(i16),
    If_icmple(i16),
    Ifeq(i16),
    Ifne(i16),
    Iflt(i16),
    Ifge(i16),
    Ifgt(i16),
    Ifle(i16),
    Ifnonnull(i16),
    Ifnull(i16),
    Iinc(u16, i16),
    Iload(u16),
    Iload_0,
    Iload_1,
    Iload_2,
    Iload_3,
    Imul,
    Ineg,
    Instanceof(u16),
    Invokedynamic(u16),
    Invokeinterface(u16, u8),
    Invokespecial(u16),
    Invokestatic(u16),
    Invokevirtual(u16),
    Ior,
    Irem,
    Ireturn,
    Ishl,
    Ishr,
    Istore(u16),
    Istore_0,
    Istore_1,
    Istore_2,
    Istore_3,
    Isub,
    Iushr,
    Ixor,
    Jsr(i16),
    Jsr_w(i32),
    L2d,
    L2f,
    L2i,
    Ladd,
    Laload,
    Land,
    Lastore,
    Lcmp,
    Lconst_0,
    Lconst_1,
    Ldc(u8),
    Ldc_w(u16),
    Ldc2_w(u16),
    Ldiv,
    Lload(u16),
    Lload_0,
    Lload_1,
    Lload_2,
    Lload_3,
    Lmul,
    Lneg,
    Lookupswitch {
        default_offset: i32,
        pairs: Vec<(i32, i32)>,
    },
    Lor,
    Lrem,
    Lreturn,
    Lshl,
    Lshr,
    Lstore(u16),
    Lstore_0,
    Lstore_1,
    Lstore_2,
    Lstore_3,
    Lsub,
    Lushr,
    Lxor,
    Monitorenter,
    Monitorexit,
    Multianewarray(u16, u8),
    New(u16),
    NewArray(u8),
    Nop,
    Pop,
    Pop2,
    Putfield(u16),
    Putstatic(u16),
    Ret(u16),
    Return,
    Saload,
    Sastore,
    Sipush(i16),
    Swap,
    Tableswitch {
        default_offset: i32,
        low: i32,
        high: i32,
        jump_offsets: Vec<i32>,
    },
}

/// 从buffer的当前位置读取一条指令。
/// buffer必须以code数组起始(tableswitch/lookupswitch的对齐以code起始为基准)。
pub fn read_one_instruction(buffer: &mut ByteBuffer) -> Result<Instruction> {
    use Instruction::*;
    let op_code = buffer.read_u8()?;
    let instruction = match op_code {
        opcode::NOP => Nop,
        opcode::ACONST_NULL => Aconst_null,
        opcode::ICONST_M1 => Iconst_m1,
        opcode::ICONST_0 => Iconst_0,
        opcode::ICONST_1 => Iconst_1,
        opcode::ICONST_2 => Iconst_2,
        opcode::ICONST_3 => Iconst_3,
        opcode::ICONST_4 => Iconst_4,
        opcode::ICONST_5 => Iconst_5,
        opcode::LCONST_0 => Lconst_0,
        opcode::LCONST_1 => Lconst_1,
        opcode::FCONST_0 => Fconst_0,
        opcode::FCONST_1 => Fconst_1,
        opcode::FCONST_2 => Fconst_2,
        opcode::DCONST_0 => Dconst_0,
        opcode::DCONST_1 => Dconst_1,
        opcode::BIPUSH => Bipush(buffer.read_i8()?),
        opcode::SIPUSH => Sipush(buffer.read_i16()?),
        opcode::LDC => Ldc(buffer.read_u8()?),
        opcode::LDC_W => Ldc_w(buffer.read_u16()?),
        opcode::LDC2_W => Ldc2_w(buffer.read_u16()?),
        opcode::ILOAD => Iload(buffer.read_u8()? as u16),
        opcode::LLOAD => Lload(buffer.read_u8()? as u16),
        opcode::FLOAD => Fload(buffer.read_u8()? as u16),
        opcode::DLOAD => Dload(buffer.read_u8()? as u16),
        opcode::ALOAD => Aload(buffer.read_u8()? as u16),
        opcode::ILOAD_0 => Iload_0,
        opcode::ILOAD_1 => Iload_1,
        opcode::ILOAD_2 => Iload_2,
        opcode::ILOAD_3 => Iload_3,
        opcode::LLOAD_0 => Lload_0,
        opcode::LLOAD_1 => Lload_1,
        opcode::LLOAD_2 => Lload_2,
        opcode::LLOAD_3 => Lload_3,
        opcode::FLOAD_0 => Fload_0,
        opcode::FLOAD_1 => Fload_1,
        opcode::FLOAD_2 => Fload_2,
        opcode::FLOAD_3 => Fload_3,
        opcode::DLOAD_0 => Dload_0,
        opcode::DLOAD_1 => Dload_1,
        opcode::DLOAD_2 => Dload_2,
        opcode::DLOAD_3 => Dload_3,
        opcode::ALOAD_0 => Aload_0,
        opcode::ALOAD_1 => Aload_1,
        opcode::ALOAD_2 => Aload_2,
        opcode::ALOAD_3 => Aload_3,
        opcode::IALOAD => Iaload,
        opcode::LALOAD => Laload,
        opcode::FALOAD => Faload,
        opcode::DALOAD => Daload,
        opcode::AALOAD => Aaload,
        opcode::BALOAD => Baload,
        opcode::CALOAD => Caload,
        opcode::SALOAD => Saload,
        opcode::ISTORE => Istore(buffer.read_u8()? as u16),
        opcode::LSTORE => Lstore(buffer.read_u8()? as u16),
        opcode::FSTORE => Fstore(buffer.read_u8()? as u16),
        opcode::DSTORE => Dstore(buffer.read_u8()? as u16),
        opcode::ASTORE => Astore(buffer.read_u8()? as u16),
        opcode::ISTORE_0 => Istore_0,
        opcode::ISTORE_1 => Istore_1,
        opcode::ISTORE_2 => Istore_2,
        opcode::ISTORE_3 => Istore_3,
        opcode::LSTORE_0 => Lstore_0,
        opcode::LSTORE_1 => Lstore_1,
        opcode::LSTORE_2 => Lstore_2,
        opcode::LSTORE_3 => Lstore_3,
        opcode::FSTORE_0 => Fstore_0,
        opcode::FSTORE_1 => Fstore_1,
        opcode::FSTORE_2 => Fstore_2,
        opcode::FSTORE_3 => Fstore_3,
        opcode::DSTORE_0 => Dstore_0,
        opcode::DSTORE_1 => Dstore_1,
        opcode::DSTORE_2 => Dstore_2,
        opcode::DSTORE_3 => Dstore_3,
        opcode::ASTORE_0 => Astore_0,
        opcode::ASTORE_1 => Astore_1,
        opcode::ASTORE_2 => Astore_2,
        opcode::ASTORE_3 => Astore_3,
        opcode::IASTORE => Iastore,
        opcode::LASTORE => Lastore,
        opcode::FASTORE => Fastore,
        opcode::DASTORE => Dastore,
        opcode::AASTORE => Aastore,
        opcode::BASTORE => Bastore,
        opcode::CASTORE => Castore,
        opcode::SASTORE => Sastore,
        opcode::POP => Pop,
        opcode::POP2 => Pop2,
        opcode::DUP => Dup,
        opcode::DUP_X1 => Dup_x1,
        opcode::DUP_X2 => Dup_x2,
        opcode::DUP2 => Dup2,
        opcode::DUP2_X1 => Dup2_x1,
        opcode::DUP2_X2 => Dup2_x2,
        opcode::SWAP => Swap,
        opcode::IADD => Iadd,
        opcode::LADD => Ladd,
        opcode::FADD => Fadd,
        opcode::DADD => Dadd,
        opcode::ISUB => Isub,
        opcode::LSUB => Lsub,
        opcode::FSUB => Fsub,
        opcode::DSUB => Dsub,
        opcode::IMUL => Imul,
        opcode::LMUL => Lmul,
        opcode::FMUL => Fmul,
        opcode::DMUL => Dmul,
        opcode::IDIV => Idiv,
        opcode::LDIV => Ldiv,
        opcode::FDIV => Fdiv,
        opcode::DDIV => Ddiv,
        opcode::IREM => Irem,
        opcode::LREM => Lrem,
        opcode::FREM => Frem,
        opcode::DREM => Drem,
        opcode::INEG => Ineg,
        opcode::LNEG => Lneg,
        opcode::FNEG => Fneg,
        opcode::DNEG => Dneg,
        opcode::ISHL => Ishl,
        opcode::LSHL => Lshl,
        opcode::ISHR => Ishr,
        opcode::LSHR => Lshr,
        opcode::IUSHR => Iushr,
        opcode::LUSHR => Lushr,
        opcode::IAND => Iand,
        opcode::LAND => Land,
        opcode::IOR => Ior,
        opcode::LOR => Lor,
        opcode::IXOR => Ixor,
        opcode::LXOR => Lxor,
        opcode::IINC => {
            let index = buffer.read_u8()? as u16;
            let delta = buffer.read_i8()? as i16;
            Iinc(index, delta)
        }
        opcode::I2L => I2l,
        opcode::I2F => I2f,
        opcode::I2D => I2d,
        opcode::L2I => L2i,
        opcode::L2F => L2f,
        opcode::L2D => L2d,
        opcode::F2I => F2i,
        opcode::F2L => F2l,
        opcode::F2D => F2d,
        opcode::D2I => D2i,
        opcode::D2L => D2l,
        opcode::D2F => D2f,
        opcode::I2B => I2b,
        opcode::I2C => I2c,
        opcode::I2S => I2s,
        opcode::LCMP => Lcmp,
        opcode::FCMPL => Fcmpl,
        opcode::FCMPG => Fcmpg,
        opcode::DCMPL => Dcmpl,
        opcode::DCMPG => Dcmpg,
        opcode::IFEQ => Ifeq(buffer.read_i16()?),
        opcode::IFNE => Ifne(buffer.read_i16()?),
        opcode::IFLT => Iflt(buffer.read_i16()?),
        opcode::IFGE => Ifge(buffer.read_i16()?),
        opcode::IFGT => Ifgt(buffer.read_i16()?),
        opcode::IFLE => Ifle(buffer.read_i16()?),
        opcode::IF_ICMPEQ => If_icmpeq(buffer.read_i16()?),
        opcode::IF_ICMPNE => If_icmpne(buffer.read_i16()?),
        opcode::IF_ICMPLT => If_icmplt(buffer.read_i16()?),
        opcode::IF_ICMPGE => If_icmpge(buffer.read_i16()?),
        opcode::IF_ICMPGT => If_icmpgt(buffer.read_i16()?),
        opcode::IF_ICMPLE => If_icmple(buffer.read_i16()?),
        opcode::IF_ACMPEQ => If_acmpeq(buffer.read_i16()?),
        opcode::IF_ACMPNE => If_acmpne(buffer.read_i16()?),
        opcode::GOTO => Goto(buffer.read_i16()?),
        opcode::JSR => Jsr(buffer.read_i16()?),
        opcode::RET => Ret(buffer.read_u8()? as u16),
        opcode::TABLESWITCH => read_table_switch(buffer)?,
        opcode::LOOKUPSWITCH => read_lookup_switch(buffer)?,
        opcode::IRETURN => Ireturn,
        opcode::LRETURN => Lreturn,
        opcode::FRETURN => Freturn,
        opcode::DRETURN => Dreturn,
        opcode::ARETURN => Areturn,
        opcode::RETURN => Return,
        opcode::GETSTATIC => Getstatic(buffer.read_u16()?),
        opcode::PUTSTATIC => Putstatic(buffer.read_u16()?),
        opcode::GETFIELD => Getfield(buffer.read_u16()?),
        opcode::PUTFIELD => Putfield(buffer.read_u16()?),
        opcode::INVOKEVIRTUAL => Invokevirtual(buffer.read_u16()?),
        opcode::INVOKESPECIAL => Invokespecial(buffer.read_u16()?),
        opcode::INVOKESTATIC => Invokestatic(buffer.read_u16()?),
        opcode::INVOKEINTERFACE => {
            let index = buffer.read_u16()?;
            let count = buffer.read_u8()?;
            // 第四个字节恒为0
            buffer.read_u8()?;
            Invokeinterface(index, count)
        }
        opcode::INVOKEDYNAMIC => {
            let index = buffer.read_u16()?;
            buffer.read_u16()?;
            Invokedynamic(index)
        }
        opcode::NEW => New(buffer.read_u16()?),
        opcode::NEWARRAY => NewArray(buffer.read_u8()?),
        opcode::ANEWARRAY => Anewarray(buffer.read_u16()?),
        opcode::ARRAYLENGTH => Arraylength,
        opcode::ATHROW => Athrow,
        opcode::CHECKCAST => Checkcast(buffer.read_u16()?),
        opcode::INSTANCEOF => Instanceof(buffer.read_u16()?),
        opcode::MONITORENTER => Monitorenter,
        opcode::MONITOREXIT => Monitorexit,
        opcode::WIDE => read_wide(buffer)?,
        opcode::MULTIANEWARRAY => {
            let index = buffer.read_u16()?;
            let dimensions = buffer.read_u8()?;
            Multianewarray(index, dimensions)
        }
        opcode::IFNULL => Ifnull(buffer.read_i16()?),
        opcode::IFNONNULL => Ifnonnull(buffer.read_i16()?),
        opcode::GOTO_W => Goto_w(buffer.read_i32()?),
        opcode::JSR_W => Jsr_w(buffer.read_i32()?),
        op_code => {
            return Err(ClassFileError::InvalidCode(format!(
                "invalid op code {op_code:#x}"
            )));
        }
    };
    Ok(instruction)
}

//wide前缀：iload/lload/fload/dload/aload/istore/.../ret使用u16下标，iinc使用u16+i16
fn read_wide(buffer: &mut ByteBuffer) -> Result<Instruction> {
    use Instruction::*;
    let widened = buffer.read_u8()?;
    let instruction = match widened {
        opcode::ILOAD => Iload(buffer.read_u16()?),
        opcode::LLOAD => Lload(buffer.read_u16()?),
        opcode::FLOAD => Fload(buffer.read_u16()?),
        opcode::DLOAD => Dload(buffer.read_u16()?),
        opcode::ALOAD => Aload(buffer.read_u16()?),
        opcode::ISTORE => Istore(buffer.read_u16()?),
        opcode::LSTORE => Lstore(buffer.read_u16()?),
        opcode::FSTORE => Fstore(buffer.read_u16()?),
        opcode::DSTORE => Dstore(buffer.read_u16()?),
        opcode::ASTORE => Astore(buffer.read_u16()?),
        opcode::RET => Ret(buffer.read_u16()?),
        opcode::IINC => {
            let index = buffer.read_u16()?;
            let delta = buffer.read_i16()?;
            Iinc(index, delta)
        }
        other => {
            return Err(ClassFileError::InvalidCode(format!(
                "invalid wide op code {other:#x}"
            )));
        }
    };
    Ok(instruction)
}

fn skip_switch_padding(buffer: &mut ByteBuffer) -> Result<()> {
    while buffer.position % 4 != 0 {
        buffer.read_u8()?;
    }
    Ok(())
}

fn read_table_switch(buffer: &mut ByteBuffer) -> Result<Instruction> {
    skip_switch_padding(buffer)?;
    let default_offset = buffer.read_i32()?;
    let low = buffer.read_i32()?;
    let high = buffer.read_i32()?;
    if high < low {
        return Err(ClassFileError::InvalidCode(format!(
            "tableswitch high {high} < low {low}"
        )));
    }
    let count = (high - low + 1) as usize;
    let mut jump_offsets = Vec::with_capacity(count);
    for _ in 0..count {
        jump_offsets.push(buffer.read_i32()?);
    }
    Ok(Instruction::Tableswitch {
        default_offset,
        low,
        high,
        jump_offsets,
    })
}

fn read_lookup_switch(buffer: &mut ByteBuffer) -> Result<Instruction> {
    skip_switch_padding(buffer)?;
    let default_offset = buffer.read_i32()?;
    let npairs = buffer.read_i32()?;
    if npairs < 0 {
        return Err(ClassFileError::InvalidCode(format!(
            "lookupswitch npairs {npairs} < 0"
        )));
    }
    let mut pairs = Vec::with_capacity(npairs as usize);
    for _ in 0..npairs {
        let key = buffer.read_i32()?;
        let offset = buffer.read_i32()?;
        pairs.push((key, offset));
    }
    Ok(Instruction::Lookupswitch {
        default_offset,
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use crate::cesu8_byte_buffer::ByteBuffer;
    use crate::instruction::{opcode, read_one_instruction, Instruction};

    #[test]
    fn decodes_simple_instructions() {
        let code = [
            opcode::ILOAD_0,
            opcode::ILOAD_1,
            opcode::IADD,
            opcode::IRETURN,
        ];
        let mut buffer = ByteBuffer::new(&code);
        assert_eq!(Instruction::Iload_0, read_one_instruction(&mut buffer).unwrap());
        assert_eq!(Instruction::Iload_1, read_one_instruction(&mut buffer).unwrap());
        assert_eq!(Instruction::Iadd, read_one_instruction(&mut buffer).unwrap());
        assert_eq!(Instruction::Ireturn, read_one_instruction(&mut buffer).unwrap());
        assert!(!buffer.has_more_data());
    }

    #[test]
    fn decodes_signed_operands() {
        let code = [opcode::BIPUSH, 0xfe, opcode::SIPUSH, 0xff, 0x00];
        let mut buffer = ByteBuffer::new(&code);
        assert_eq!(Instruction::Bipush(-2), read_one_instruction(&mut buffer).unwrap());
        assert_eq!(
            Instruction::Sipush(-256),
            read_one_instruction(&mut buffer).unwrap()
        );
    }

    #[test]
    fn decodes_wide_forms() {
        let code = [opcode::WIDE, opcode::ILOAD, 0x01, 0x00];
        let mut buffer = ByteBuffer::new(&code);
        assert_eq!(
            Instruction::Iload(256),
            read_one_instruction(&mut buffer).unwrap()
        );

        let code = [opcode::WIDE, opcode::IINC, 0x01, 0x00, 0xff, 0xff];
        let mut buffer = ByteBuffer::new(&code);
        assert_eq!(
            Instruction::Iinc(256, -1),
            read_one_instruction(&mut buffer).unwrap()
        );
    }

    #[test]
    fn decodes_tableswitch_with_padding() {
        // tableswitch at bci 0: opcode + 3 padding bytes, default, low=1, high=2, two offsets
        let mut code = vec![opcode::TABLESWITCH, 0, 0, 0];
        code.extend_from_slice(&20i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&2i32.to_be_bytes());
        code.extend_from_slice(&8i32.to_be_bytes());
        code.extend_from_slice(&12i32.to_be_bytes());
        let mut buffer = ByteBuffer::new(&code);
        assert_eq!(
            Instruction::Tableswitch {
                default_offset: 20,
                low: 1,
                high: 2,
                jump_offsets: vec![8, 12],
            },
            read_one_instruction(&mut buffer).unwrap()
        );
    }

    #[test]
    fn decodes_lookupswitch() {
        // lookupswitch at bci 1: one padding byte required after the opcode at position 2
        let mut code = vec![opcode::NOP, opcode::LOOKUPSWITCH, 0, 0];
        code.extend_from_slice(&16i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&42i32.to_be_bytes());
        code.extend_from_slice(&8i32.to_be_bytes());
        let mut buffer = ByteBuffer::new(&code);
        assert_eq!(Instruction::Nop, read_one_instruction(&mut buffer).unwrap());
        assert_eq!(
            Instruction::Lookupswitch {
                default_offset: 16,
                pairs: vec![(42, 8)],
            },
            read_one_instruction(&mut buffer).unwrap()
        );
    }

    #[test]
    fn rejects_unknown_opcode() {
        let code = [0xcb];
        let mut buffer = ByteBuffer::new(&code);
        assert!(read_one_instruction(&mut buffer).is_err());
    }
}
