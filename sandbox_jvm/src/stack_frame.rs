use crate::call_stack::CallStack;
use crate::insn::{FieldAccess, Insn};
use crate::java_exception::{InvokeMethodResult, InvokeResult, MethodCallError};
use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::Value::{
    ArrayRef, Double, Float, Int, Long, Null, ObjectRef, ReturnAddress, Uninitialized,
};
use crate::jvm_values::{ArrayReference, ObjectReference, ReferenceValue, Value};
use crate::loaded_class::{ClassRef, JavaClass, MethodRef};
use crate::operand_stack::OperandStack;
use crate::runtime_attribute_info::CodeAttribute;
use crate::runtime_constant_pool::RuntimeConstantPoolEntry;
use crate::runtime_method_info::MethodDescriptor;
use crate::stack_frame::InstructionResult::{ContinueMethodExecution, ReturnFromMethod};
use crate::stack_trace_element::StackTraceElement;
use crate::virtual_machine::VirtualMachine;
use log::{debug, log_enabled, trace, Level};
use std::cmp::Ordering;
use std::sync::atomic::{fence, Ordering as MemoryOrdering};

#[derive(Debug)]
pub enum InstructionResult<'a> {
    ReturnFromMethod(Option<Value<'a>>),
    ContinueMethodExecution,
}

#[derive(Debug)]
pub enum LocalValue<'a> {
    Entry(Value<'a>),
    PlaceHolder,
}

/// 一次方法调用的执行帧。调用线程独占，绝不逃逸。
pub struct StackFrame<'a> {
    pub(crate) class_ref: ClassRef<'a>,
    pub(crate) method_ref: MethodRef<'a>,
    pub(crate) code: &'a CodeAttribute<'a>,
    //下一条待取指令的下标
    pub(crate) pc: usize,
    //当前指令的bci，跳转偏移和异常表匹配都以它为基准
    pub(crate) cur_bci: u16,
    pub(crate) local_var_table: Vec<LocalValue<'a>>,
    pub(crate) op_stack: OperandStack<'a>,
}

macro_rules! generate_pop {
    ($name:ident, $variant:ident, $type:ty) => {
        fn $name(&mut self) -> InvokeResult<'a, $type> {
            match self.pop()? {
                $variant(value) => Ok(value),
                _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
            }
        }
    };
}

macro_rules! generate_load {
    ($name:ident, $($variant:ident),+) => {
        pub(crate) fn $name(&mut self, index: u16) -> InvokeResult<'a, InstructionResult<'a>> {
            let local = self.get_local(index as usize)?;
            match local {
                $($variant { .. } => {
                    self.push(local)?;
                    Ok(ContinueMethodExecution)
                }),+
                _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
            }
        }
    };
}

macro_rules! generate_store {
    ($name:ident, $($variant:ident),+) => {
        pub(crate) fn $name(&mut self, index: u16) -> InvokeResult<'a, InstructionResult<'a>> {
            let value = self.pop()?;
            match value {
                $($variant { .. } => {
                    self.set_local(index as usize, value)?;
                    Ok(ContinueMethodExecution)
                }),+
                _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
            }
        }
    };
}

macro_rules! generate_math {
    ($name:ident, $variant:ident, $type:ty) => {
        pub(crate) fn $name<T>(&mut self, evaluator: T) -> InvokeResult<'a, InstructionResult<'a>>
        where
            T: FnOnce($type, $type) -> InvokeResult<'a, $type>,
        {
            let val2 = match self.pop()? {
                $variant(v) => v,
                _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
            };
            let val1 = match self.pop()? {
                $variant(v) => v,
                _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
            };
            let result = evaluator(val1, val2)?;
            self.push($variant(result))?;
            Ok(ContinueMethodExecution)
        }
    };
}

macro_rules! generate_convert {
    ($name:ident, $variant:ident, $target:ident, $type:ty) => {
        pub(crate) fn $name(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
            let value = self.pop()?;
            if let $variant(v) = value {
                //Rust的as对float->int是饱和转换，NaN归零，正好是JVMS语义
                self.push($target(v as $type))?;
                Ok(ContinueMethodExecution)
            } else {
                Err(MethodCallError::InternalError(VmError::ValueTypeMismatch))
            }
        }
    };
}

macro_rules! generate_int_convert {
    ($name:ident, $type:ty) => {
        pub(crate) fn $name(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
            let value = self.pop_int()?;
            self.push(Int((value as $type) as i32))?;
            Ok(ContinueMethodExecution)
        }
    };
}

macro_rules! generate_float_cmp {
    ($name:ident, $pop:ident) => {
        /// NaN参与比较时压入处理器配置的nan结果(fcmpg/dcmpg为+1，l为-1)
        pub(crate) fn $name(&mut self, nan: i32) -> InvokeResult<'a, InstructionResult<'a>> {
            let val2 = self.$pop()?;
            let val1 = self.$pop()?;
            let result = match val1.partial_cmp(&val2) {
                Some(Ordering::Less) => -1,
                Some(Ordering::Equal) => 0,
                Some(Ordering::Greater) => 1,
                None => nan,
            };
            self.push(Int(result))?;
            Ok(ContinueMethodExecution)
        }
    };
}

macro_rules! generate_return {
    ($name:ident, $($variant:ident),+) => {
        pub(crate) fn $name(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
            let value = self.pop()?;
            match value {
                $($variant { .. } => Ok(ReturnFromMethod(Some(value)))),+,
                _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
            }
        }
    };
}

impl<'a> StackFrame<'a> {
    pub fn new(
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> VmExecResult<StackFrame<'a>> {
        let code = method_ref.code.as_ref().ok_or_else(|| {
            VmError::ExecuteCodeError(format!(
                "method {}.{} has no code",
                class_ref.name, method_ref.name
            ))
        })?;

        let mut frame = StackFrame {
            class_ref,
            method_ref,
            code,
            pc: 0,
            cur_bci: 0,
            local_var_table: Vec::with_capacity(code.max_locals as usize),
            op_stack: OperandStack::new(code.max_stack as usize),
        };
        for value in locals {
            frame.push_local(value);
        }
        while frame.local_var_table.len() < code.max_locals as usize {
            frame.local_var_table.push(LocalValue::Entry(Uninitialized));
        }
        for value in stack_values {
            frame.op_stack.push(value)?;
        }
        Ok(frame)
    }

    fn push_local(&mut self, value: Value<'a>) {
        let wide = value.is_wide();
        self.local_var_table.push(LocalValue::Entry(value));
        if wide {
            self.local_var_table.push(LocalValue::PlaceHolder);
        }
    }

    fn get_local(&self, offset: usize) -> InvokeResult<'a, Value<'a>> {
        if offset >= self.local_var_table.len() {
            return Err(MethodCallError::InternalError(VmError::IndexOutOfBounds));
        }
        match &self.local_var_table[offset] {
            LocalValue::Entry(e) => Ok(*e),
            LocalValue::PlaceHolder => Err(MethodCallError::InternalError(
                VmError::InvalidLocalSlot(offset),
            )),
        }
    }

    fn set_local(&mut self, offset: usize, value: Value<'a>) -> InvokeResult<'a, ()> {
        if offset >= self.local_var_table.len() {
            return Err(MethodCallError::InternalError(VmError::IndexOutOfBounds));
        }
        let wide = value.is_wide();
        self.local_var_table[offset] = LocalValue::Entry(value);
        if wide && offset + 1 < self.local_var_table.len() {
            self.local_var_table[offset + 1] = LocalValue::PlaceHolder;
        }
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> InvokeResult<'a, Value<'a>> {
        self.op_stack.pop().map_err(MethodCallError::from)
    }

    pub(crate) fn push(&mut self, value: Value<'a>) -> InvokeResult<'a, ()> {
        self.op_stack.push(value).map_err(MethodCallError::from)
    }

    pub(crate) fn push_continue(
        &mut self,
        value: Value<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        self.push(value)?;
        Ok(ContinueMethodExecution)
    }

    fn pop_n(&mut self, n: usize) -> InvokeResult<'a, Vec<Value<'a>>> {
        self.op_stack.pop_n(n).map_err(MethodCallError::from)
    }

    generate_pop!(pop_int, Int, i32);
    generate_pop!(pop_long, Long, i64);
    generate_pop!(pop_float, Float, f32);
    generate_pop!(pop_double, Double, f64);

    fn pop_array(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, ArrayReference<'a>> {
        match self.pop()? {
            ArrayRef(array_ref) => Ok(array_ref),
            Null => Err(vm.raise_npe(call_stack)),
            _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
    }

    fn pop_object(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, ObjectReference<'a>> {
        match self.pop()? {
            ObjectRef(object_ref) => Ok(object_ref),
            Null => Err(vm.raise_npe(call_stack)),
            _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
    }

    fn pop_reference_or_null(&mut self) -> InvokeResult<'a, Value<'a>> {
        let value = self.pop()?;
        if value.is_reference() {
            Ok(value)
        } else {
            Err(MethodCallError::InternalError(VmError::ValueTypeMismatch))
        }
    }

    generate_load!(exec_iload, Int);
    generate_load!(exec_lload, Long);
    generate_load!(exec_fload, Float);
    generate_load!(exec_dload, Double);
    generate_load!(exec_aload, ObjectRef, ArrayRef, Null);

    generate_store!(exec_istore, Int);
    generate_store!(exec_lstore, Long);
    generate_store!(exec_fstore, Float);
    generate_store!(exec_dstore, Double);
    generate_store!(exec_astore, ObjectRef, ArrayRef, Null, ReturnAddress);

    generate_math!(exec_int_math, Int, i32);
    generate_math!(exec_long_math, Long, i64);
    generate_math!(exec_float_math, Float, f32);
    generate_math!(exec_double_math, Double, f64);

    generate_convert!(exec_i2l, Int, Long, i64);
    generate_convert!(exec_i2f, Int, Float, f32);
    generate_convert!(exec_i2d, Int, Double, f64);
    generate_convert!(exec_l2i, Long, Int, i32);
    generate_convert!(exec_l2f, Long, Float, f32);
    generate_convert!(exec_l2d, Long, Double, f64);
    generate_convert!(exec_f2i, Float, Int, i32);
    generate_convert!(exec_f2l, Float, Long, i64);
    generate_convert!(exec_f2d, Float, Double, f64);
    generate_convert!(exec_d2i, Double, Int, i32);
    generate_convert!(exec_d2l, Double, Long, i64);
    generate_convert!(exec_d2f, Double, Float, f32);

    generate_int_convert!(exec_i2b, i8);
    generate_int_convert!(exec_i2c, u16);
    generate_int_convert!(exec_i2s, i16);

    generate_float_cmp!(exec_fcmp, pop_float);
    generate_float_cmp!(exec_dcmp, pop_double);

    generate_return!(exec_ireturn, Int);
    generate_return!(exec_lreturn, Long);
    generate_return!(exec_freturn, Float);
    generate_return!(exec_dreturn, Double);
    generate_return!(exec_areturn, ObjectRef, ArrayRef, Null);

    pub(crate) fn exec_lcmp(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
        let val2 = self.pop_long()?;
        let val1 = self.pop_long()?;
        let result = match val1.cmp(&val2) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        self.push_continue(Int(result))
    }

    pub(crate) fn exec_if<T>(
        &mut self,
        branch: i16,
        evaluator: T,
    ) -> InvokeResult<'a, InstructionResult<'a>>
    where
        T: FnOnce(i32) -> bool,
    {
        let value = self.pop_int()?;
        if evaluator(value) {
            self.branch(branch as i32)?;
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_if_icmp<T>(
        &mut self,
        branch: i16,
        evaluator: T,
    ) -> InvokeResult<'a, InstructionResult<'a>>
    where
        T: FnOnce(i32, i32) -> bool,
    {
        let val2 = self.pop_int()?;
        let val1 = self.pop_int()?;
        if evaluator(val1, val2) {
            self.branch(branch as i32)?;
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_if_acmp(
        &mut self,
        branch: i16,
        want_equal: bool,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let val2 = self.pop_reference_or_null()?;
        let val1 = self.pop_reference_or_null()?;
        //引用相等按标识比较
        if (val1 == val2) == want_equal {
            self.branch(branch as i32)?;
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_ifnull(
        &mut self,
        branch: i16,
        want_null: bool,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop_reference_or_null()?;
        if value.is_null() == want_null {
            self.branch(branch as i32)?;
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_iinc(
        &mut self,
        index: u16,
        delta: i16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let local = self.get_local(index as usize)?.get_int()?;
        self.set_local(index as usize, Int(local.wrapping_add(delta as i32)))?;
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_int_shift<T>(
        &mut self,
        evaluator: T,
    ) -> InvokeResult<'a, InstructionResult<'a>>
    where
        T: FnOnce(i32, i32) -> i32,
    {
        let val2 = self.pop_int()?;
        let val1 = self.pop_int()?;
        self.push_continue(Int(evaluator(val1, val2)))
    }

    pub(crate) fn exec_long_shift<T>(
        &mut self,
        evaluator: T,
    ) -> InvokeResult<'a, InstructionResult<'a>>
    where
        T: FnOnce(i64, i32) -> i64,
    {
        let val2 = self.pop_int()?;
        let val1 = self.pop_long()?;
        self.push_continue(Long(evaluator(val1, val2)))
    }

    pub(crate) fn exec_int_div(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        remainder: bool,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let val2 = self.pop_int()?;
        let val1 = self.pop_int()?;
        if val2 == 0 {
            return Err(vm.raise_arithmetic(call_stack, "/ by zero"));
        }
        //Integer.MIN_VALUE / -1 按JVMS回绕
        let result = if remainder {
            val1.wrapping_rem(val2)
        } else {
            val1.wrapping_div(val2)
        };
        self.push_continue(Int(result))
    }

    pub(crate) fn exec_long_div(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        remainder: bool,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let val2 = self.pop_long()?;
        let val1 = self.pop_long()?;
        if val2 == 0 {
            return Err(vm.raise_arithmetic(call_stack, "/ by zero"));
        }
        let result = if remainder {
            val1.wrapping_rem(val2)
        } else {
            val1.wrapping_div(val2)
        };
        self.push_continue(Long(result))
    }

    //跳转都以当前指令bci为基准
    fn branch(&mut self, offset: i32) -> InvokeResult<'a, ()> {
        let target = (self.cur_bci as i32 + offset) as u16;
        self.goto_bci(target)
    }

    fn goto_bci(&mut self, bci: u16) -> InvokeResult<'a, ()> {
        self.pc = self.code.index_of(bci)?;
        Ok(())
    }

    pub(crate) fn exec_goto(&mut self, offset: i32) -> InvokeResult<'a, InstructionResult<'a>> {
        self.branch(offset)?;
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_jsr(&mut self, offset: i32) -> InvokeResult<'a, InstructionResult<'a>> {
        //返回地址是jsr的下一条指令
        let next_bci = self
            .code
            .instructions
            .get(self.pc)
            .map(|insn| insn.bci)
            .ok_or(MethodCallError::InternalError(VmError::IndexOutOfBounds))?;
        self.push(ReturnAddress(next_bci as u32))?;
        self.branch(offset)?;
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_ret(&mut self, index: u16) -> InvokeResult<'a, InstructionResult<'a>> {
        if let ReturnAddress(address) = self.get_local(index as usize)? {
            self.goto_bci(address as u16)?;
            Ok(ContinueMethodExecution)
        } else {
            Err(MethodCallError::InternalError(VmError::ValueTypeMismatch))
        }
    }

    pub(crate) fn exec_tableswitch(
        &mut self,
        default_offset: i32,
        low: i32,
        high: i32,
        jump_offsets: &[i32],
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let index = self.pop_int()?;
        let offset = if index < low || index > high {
            default_offset
        } else {
            jump_offsets[(index - low) as usize]
        };
        self.branch(offset)?;
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_lookupswitch(
        &mut self,
        default_offset: i32,
        pairs: &[(i32, i32)],
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let key = self.pop_int()?;
        let offset = pairs
            .iter()
            .find(|(match_key, _)| *match_key == key)
            .map(|(_, offset)| *offset)
            .unwrap_or(default_offset);
        self.branch(offset)?;
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_array_load(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let index = self.pop_int()?;
        let array = self.pop_array(vm, call_stack)?;
        if index < 0 || index as usize >= array.length() {
            return Err(vm.raise_array_index(call_stack, index));
        }
        let value = array.get_element(index as usize)?;
        self.push_continue(value)
    }

    pub(crate) fn exec_array_store(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop()?;
        let index = self.pop_int()?;
        let array = self.pop_array(vm, call_stack)?;
        if index < 0 || index as usize >= array.length() {
            return Err(vm.raise_array_index(call_stack, index));
        }
        array.set_element(index as usize, &value)?;
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_arraylength(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let array = self.pop_array(vm, call_stack)?;
        self.push_continue(Int(array.length() as i32))
    }

    pub(crate) fn exec_athrow(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let exception = self.pop_object(vm, call_stack)?;
        debug_assert!(exception.get_class().is_subclass_of("java/lang/Throwable"));
        Err(MethodCallError::ExceptionThrown(exception))
    }

    pub(crate) fn exec_monitor_enter(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        match self.pop()? {
            ObjectRef(object_ref) => object_ref.monitor().enter(),
            ArrayRef(array_ref) => array_ref.monitor().enter(),
            Null => return Err(vm.raise_npe(call_stack)),
            _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_monitor_exit(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        match self.pop()? {
            ObjectRef(object_ref) => object_ref.monitor().exit()?,
            ArrayRef(array_ref) => array_ref.monitor().exit()?,
            Null => return Err(vm.raise_npe(call_stack)),
            _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_ldc(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let class_ref = self.class_ref;
        let entry = class_ref.constant_pool.get(index)?;
        let value = vm.value_from_ldc(call_stack, &class_ref.loader, entry)?;
        self.push_continue(value)
    }

    pub(crate) fn exec_ldc2(&mut self, index: u16) -> InvokeResult<'a, InstructionResult<'a>> {
        match self.class_ref.constant_pool.get(index)? {
            RuntimeConstantPoolEntry::Long(v) => {
                let v = *v;
                self.push_continue(Long(v))
            }
            RuntimeConstantPoolEntry::Double(v) => {
                let v = *v;
                self.push_continue(Double(v))
            }
            _ => Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        }
    }

    pub(crate) fn exec_new_object(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let class_name = self
            .class_ref
            .constant_pool
            .get_class_name(pool_index)?
            .to_string();
        let class_ref = vm.lookup_class_and_initialize(call_stack, &class_name)?;
        let object_reference = vm.new_object(class_ref)?;
        self.push_continue(ObjectRef(object_reference))
    }

    pub(crate) fn exec_new_array(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        atype: u8,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let count = self.pop_int()?;
        if count < 0 {
            return Err(vm.raise_negative_array_size(call_stack, count));
        }
        let kind = crate::jvm_values::PrimitiveKind::from_newarray_code(atype)?;
        let array_ref = vm.new_primitive_array(kind, count as usize)?;
        self.push_continue(ArrayRef(array_ref))
    }

    pub(crate) fn exec_anewarray(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let count = self.pop_int()?;
        if count < 0 {
            return Err(vm.raise_negative_array_size(call_stack, count));
        }
        let class_ref = self.class_ref;
        let class_name = class_ref.constant_pool.get_class_name(pool_index)?;
        let component = vm.resolve_java_class(call_stack, &class_ref.loader, class_name)?;
        let array_ref = vm.new_reference_array(component, count as usize)?;
        self.push_continue(ArrayRef(array_ref))
    }

    pub(crate) fn exec_multianewarray(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
        dimensions: u8,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let mut counts = Vec::with_capacity(dimensions as usize);
        for _ in 0..dimensions {
            counts.push(self.pop_int()?);
        }
        counts.reverse();
        for count in &counts {
            if *count < 0 {
                return Err(vm.raise_negative_array_size(call_stack, *count));
            }
        }
        let class_ref = self.class_ref;
        let class_name = class_ref.constant_pool.get_class_name(pool_index)?;
        let array_class = vm.resolve_java_class(call_stack, &class_ref.loader, class_name)?;
        let array_ref = match array_class {
            JavaClass::Array(array_class_ref) => {
                vm.new_multi_array(array_class_ref, &counts)?
            }
            _ => return Err(MethodCallError::InternalError(VmError::ValueTypeMismatch)),
        };
        self.push_continue(ArrayRef(array_ref))
    }

    fn java_class_of_value(&self, value: &Value<'a>) -> Option<JavaClass<'a>> {
        match value {
            ObjectRef(object_ref) => Some(JavaClass::Instance(object_ref.get_class())),
            ArrayRef(array_ref) => Some(JavaClass::Array(array_ref.get_class())),
            _ => None,
        }
    }

    pub(crate) fn exec_checkcast(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop()?;
        if value.is_null() {
            //null可以cast到任何引用类型
            return self.push_continue(value);
        }
        let class_ref = self.class_ref;
        let class_name = class_ref.constant_pool.get_class_name(pool_index)?;
        let target = vm.resolve_java_class(call_stack, &class_ref.loader, class_name)?;
        let actual = self
            .java_class_of_value(&value)
            .ok_or(MethodCallError::InternalError(VmError::ValueTypeMismatch))?;
        if target.is_assignable_from(&actual) {
            self.push_continue(value)
        } else {
            Err(vm.raise_class_cast(call_stack, actual.name(), target.name()))
        }
    }

    pub(crate) fn exec_instanceof(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop()?;
        if value.is_null() {
            return self.push_continue(Int(0));
        }
        let class_ref = self.class_ref;
        let class_name = class_ref.constant_pool.get_class_name(pool_index)?;
        let target = vm.resolve_java_class(call_stack, &class_ref.loader, class_name)?;
        let actual = self
            .java_class_of_value(&value)
            .ok_or(MethodCallError::InternalError(VmError::ValueTypeMismatch))?;
        let result = target.is_assignable_from(&actual);
        self.push_continue(Int(result as i32))
    }

    /// 字段访问的解析结果缓存在指令节点上，一个调用点只解析一次。
    fn resolve_field_access(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        insn: &'a Insn<'a>,
        pool_index: u16,
        is_static: bool,
    ) -> InvokeResult<'a, &'a FieldAccess<'a>> {
        let class_ref = self.class_ref;
        insn.field.get_or_try_init(|| {
            let (class_name, field_name, descriptor) =
                class_ref.constant_pool.get_field_reference(pool_index)?;
            let (class_name, field_name, descriptor) = (
                class_name.to_string(),
                field_name.to_string(),
                descriptor.to_string(),
            );
            if is_static {
                let holder = vm.lookup_class_and_initialize(call_stack, &class_name)?;
                let (owner, offset) = holder
                    .resolve_static_field(&field_name, &descriptor)
                    .ok_or_else(|| {
                        vm.raise_no_such_field(call_stack, &class_name, &field_name)
                    })?;
                //真正持有字段的类也要完成初始化
                vm.initialize_class(call_stack, owner)?;
                Ok(FieldAccess {
                    owner,
                    offset: owner.static_base()? + offset,
                    is_volatile: owner.field_is_volatile(&field_name, &descriptor),
                    desc: descriptor,
                })
            } else {
                let holder = vm.get_or_load_class(call_stack, &class_name)?;
                let offset = holder
                    .instance_field_offset(&field_name, &descriptor)
                    .ok_or_else(|| {
                        vm.raise_no_such_field(call_stack, &class_name, &field_name)
                    })?;
                Ok(FieldAccess {
                    owner: holder,
                    offset,
                    is_volatile: holder.field_is_volatile(&field_name, &descriptor),
                    desc: descriptor,
                })
            }
        })
    }

    pub(crate) fn exec_get_static(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        insn: &'a Insn<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let access = self.resolve_field_access(vm, call_stack, insn, pool_index, true)?;
        let mirror = access.owner.require_mirror()?;
        if access.is_volatile {
            fence(MemoryOrdering::SeqCst);
        }
        let value = mirror.read_typed(access.offset, &access.desc);
        self.push_continue(value)
    }

    pub(crate) fn exec_put_static(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        insn: &'a Insn<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let access = self.resolve_field_access(vm, call_stack, insn, pool_index, true)?;
        let value = self.pop()?;
        let mirror = access.owner.require_mirror()?;
        mirror.write_typed(access.offset, &access.desc, &value)?;
        if access.is_volatile {
            fence(MemoryOrdering::SeqCst);
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_get_field(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        insn: &'a Insn<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let access = self.resolve_field_access(vm, call_stack, insn, pool_index, false)?;
        let object_ref = self.pop_object(vm, call_stack)?;
        if access.is_volatile {
            fence(MemoryOrdering::SeqCst);
        }
        let value = object_ref.read_typed(access.offset, &access.desc);
        self.push_continue(value)
    }

    pub(crate) fn exec_put_field(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        insn: &'a Insn<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let access = self.resolve_field_access(vm, call_stack, insn, pool_index, false)?;
        let value = self.pop()?;
        let object_ref = self.pop_object(vm, call_stack)?;
        object_ref.write_typed(access.offset, &access.desc, &value)?;
        if access.is_volatile {
            fence(MemoryOrdering::SeqCst);
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_invoke_static(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let (class_name, method_name, descriptor) = {
            let (c, m, d) = self.class_ref.constant_pool.get_method_reference(pool_index)?;
            (c.to_string(), m.to_string(), d.to_string())
        };
        let class_ref = vm.lookup_class_and_initialize(call_stack, &class_name)?;
        let (declaring, method_ref) = match class_ref.resolve_static_method(&method_name, &descriptor)
        {
            Ok(found) => found,
            Err(VmError::MethodNotFoundException(owner, desc)) => {
                return Err(vm.raise_no_such_method(call_stack, &owner, &desc));
            }
            Err(e) => return Err(MethodCallError::InternalError(e)),
        };
        let args = self.pop_n(method_ref.signature.args.len())?;
        let result = vm.invoke_method(call_stack, declaring, method_ref, None, args)?;
        if let Some(value) = result {
            self.push(value)?;
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_invoke_virtual(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
        interface_semantics: bool,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let (_, method_name, descriptor) = {
            let (c, m, d) = self.class_ref.constant_pool.get_method_reference(pool_index)?;
            (c.to_string(), m.to_string(), d.to_string())
        };
        let arg_count = MethodDescriptor::parse(&descriptor)?.args.len();
        let args = self.pop_n(arg_count)?;
        let receiver = self.pop_reference_or_null()?;
        if receiver.is_null() {
            return Err(vm.raise_npe(call_stack));
        }
        let result = vm.invoke_virtual_with_receiver(
            call_stack,
            &method_name,
            &descriptor,
            receiver,
            args,
            interface_semantics,
        )?;
        if let Some(value) = result {
            self.push(value)?;
        }
        Ok(ContinueMethodExecution)
    }

    /// invokespecial：不做接收者动态分派，按符号引用指到的类解析。
    /// 构造器、private方法和super调用走这里。
    pub(crate) fn exec_invoke_special(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let (class_name, method_name, descriptor) = {
            let (c, m, d) = self.class_ref.constant_pool.get_method_reference(pool_index)?;
            (c.to_string(), m.to_string(), d.to_string())
        };
        let class_ref = vm.lookup_class_and_initialize(call_stack, &class_name)?;
        let (declaring, method_ref) = class_ref
            .find_virtual_method(&method_name, &descriptor)
            .ok_or_else(|| {
                vm.raise_no_such_method(
                    call_stack,
                    &format!("{class_name}.{method_name}"),
                    &descriptor,
                )
            })?;
        let args = self.pop_n(method_ref.signature.args.len())?;
        let receiver = self.pop_reference_or_null()?;
        if receiver.is_null() {
            return Err(vm.raise_npe(call_stack));
        }
        let result =
            vm.invoke_method(call_stack, declaring, method_ref, Some(receiver), args)?;
        if let Some(value) = result {
            self.push(value)?;
        }
        Ok(ContinueMethodExecution)
    }

    pub(crate) fn exec_invoke_dynamic(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        insn: &'a Insn<'a>,
        pool_index: u16,
    ) -> InvokeResult<'a, InstructionResult<'a>> {
        let descriptor = {
            let (_, _, d) = self.class_ref.constant_pool.get_invoke_dynamic(pool_index)?;
            d.to_string()
        };
        let class_ref = self.class_ref;
        //站点只链接一次，之后走缓存的call site
        let handle = *insn.call_site.get_or_try_init(|| {
            crate::invoke_dynamic::link_call_site(vm, call_stack, class_ref, pool_index)
        })?;
        let signature = MethodDescriptor::parse(&descriptor)?;
        let args = self.pop_n(signature.args.len())?;
        //槽位0预留给call site目标，免一次拷贝
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Uninitialized);
        call_args.extend(args);
        let result = crate::invoke_dynamic::dynamic_call(
            vm,
            call_stack,
            call_args,
            &descriptor,
            handle,
        )?;
        if signature.ret.is_some() {
            if let Some(value) = result {
                self.push(value)?;
            }
        }
        Ok(ContinueMethodExecution)
    }

    pub fn to_stack_trace(&self) -> StackTraceElement {
        StackTraceElement {
            declaring_class: self.class_ref.name.clone(),
            method_name: self.method_ref.name.clone(),
            file_name: self.class_ref.source_file.clone(),
            line_number: self.code.line_number_at(self.cur_bci),
        }
    }

    /// 异常投递：按当前bci匹配处理器区间，catch_type用可赋值性判断。
    /// 命中则返回handler的bci，由执行循环清栈跳转。
    fn find_exception_handler(
        &self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
        exception: ObjectReference<'a>,
    ) -> InvokeResult<'a, Option<u16>> {
        for entry in &self.code.exception_table {
            if !entry.covers(self.cur_bci) {
                continue;
            }
            let matched = match &entry.catch_type {
                None => true,
                Some(catch_type) => {
                    let catch_class = vm.get_or_load_class(call_stack, catch_type)?;
                    catch_class.is_assignable_from(exception.get_class())
                }
            };
            if matched {
                return Ok(Some(entry.handler_pc));
            }
        }
        Ok(None)
    }

    /// 取指-译码-执行循环。处理器表按操作码分发。
    pub fn execute(
        &mut self,
        vm: &mut VirtualMachine<'a>,
        call_stack: &mut CallStack<'a>,
    ) -> InvokeMethodResult<'a> {
        if log_enabled!(Level::Debug) {
            let depth = "\t".repeat(call_stack.depth().saturating_sub(1));
            debug!(
                "{}=> invoke_method {}:{}{}",
                depth, self.class_ref.name, self.method_ref.name, self.method_ref.descriptor
            );
        }
        let table = vm.dispatch_table();
        loop {
            let code = self.code;
            let insn = match code.instructions.get(self.pc) {
                Some(insn) => insn,
                None => {
                    return Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
                        "execution fell off the end of the code".to_string(),
                    )))
                }
            };
            self.cur_bci = insn.bci;
            self.pc += 1;
            if log_enabled!(Level::Trace) {
                let depth = "\t".repeat(call_stack.depth());
                trace!("{}exec {:?}", depth, insn.op);
            }
            let result = table.processor(insn.opcode)(self, insn, vm, call_stack);
            match result {
                Ok(ContinueMethodExecution) => {}
                Ok(ReturnFromMethod(return_value)) => return Ok(return_value),
                Err(MethodCallError::ExceptionThrown(exception)) => {
                    match self.find_exception_handler(vm, call_stack, exception)? {
                        Some(handler_bci) => {
                            //清空操作数栈，压入异常对象，转到handler
                            self.op_stack = OperandStack::new(code.max_stack as usize);
                            self.push(ObjectRef(exception))?;
                            self.goto_bci(handler_bci)?;
                        }
                        None => return Err(MethodCallError::ExceptionThrown(exception)),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub(crate) fn exec_ineg(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop_int()?;
        self.push_continue(Int(value.wrapping_neg()))
    }

    pub(crate) fn exec_lneg(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop_long()?;
        self.push_continue(Long(value.wrapping_neg()))
    }

    pub(crate) fn exec_fneg(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop_float()?;
        self.push_continue(Float(-value))
    }

    pub(crate) fn exec_dneg(&mut self) -> InvokeResult<'a, InstructionResult<'a>> {
        let value = self.pop_double()?;
        self.push_continue(Double(-value))
    }
}
