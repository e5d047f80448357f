use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::Value;

/// 操作数栈。按JVMS的槽位语义实现：long/double占两个槽，
/// 第二个槽写入占位值并且永远不会作为数据读出。
/// 深度上限是方法的max_stack(按槽位计)。
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-2.html#jvms-2.6.2
#[derive(Debug)]
pub struct OperandStack<'a> {
    stack: Vec<Value<'a>>,
    max_size: usize,
}

impl<'a> OperandStack<'a> {
    pub(crate) fn new(max_size: usize) -> OperandStack<'a> {
        OperandStack {
            stack: Vec::with_capacity(max_size),
            max_size,
        }
    }

    fn push_raw(&mut self, value: Value<'a>) -> VmExecResult<()> {
        if self.stack.len() >= self.max_size {
            return Err(VmError::StackOverFlow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop_raw(&mut self) -> VmExecResult<Value<'a>> {
        self.stack.pop().ok_or(VmError::PopFromEmptyStack)
    }

    /// 按值语义压栈，宽值自动补占位槽
    pub(crate) fn push(&mut self, value: Value<'a>) -> VmExecResult<()> {
        let wide = value.is_wide();
        self.push_raw(value)?;
        if wide {
            self.push_raw(Value::Uninitialized)?;
        }
        Ok(())
    }

    /// 按值语义弹栈，占位槽连同宽值一起弹出
    pub(crate) fn pop(&mut self) -> VmExecResult<Value<'a>> {
        let value = self.pop_raw()?;
        if let Value::Uninitialized = value {
            let wide = self.pop_raw()?;
            if wide.is_wide() {
                return Ok(wide);
            }
            return Err(VmError::ValueTypeMismatch);
        }
        if value.is_wide() {
            //宽值上面必须有占位槽
            return Err(VmError::ValueTypeMismatch);
        }
        Ok(value)
    }

    /// 弹出n个逻辑值，保持原有顺序
    pub(crate) fn pop_n(&mut self, n: usize) -> VmExecResult<Vec<Value<'a>>> {
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(self.pop()?);
        }
        values.reverse();
        Ok(values)
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    //pop/pop2按原始槽位操作
    pub fn drop_one(&mut self) -> VmExecResult<()> {
        let value = self.pop_raw()?;
        if value.is_wide() {
            return Err(VmError::ValueTypeMismatch);
        }
        Ok(())
    }

    pub fn drop_two(&mut self) -> VmExecResult<()> {
        self.pop_raw()?;
        self.pop_raw()?;
        Ok(())
    }

    pub fn dup(&mut self) -> VmExecResult<()> {
        match self.stack.last() {
            None => Err(VmError::PopFromEmptyStack),
            Some(Value::Uninitialized) => Err(VmError::ValueTypeMismatch),
            Some(head) => {
                let head = *head;
                self.push_raw(head)
            }
        }
    }

    pub fn dup_x1(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_raw()?;
        let value2 = self.pop_raw()?;
        self.push_raw(value1)?;
        self.push_raw(value2)?;
        self.push_raw(value1)
    }

    pub fn dup_x2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_raw()?;
        let value2 = self.pop_raw()?;
        let value3 = self.pop_raw()?;
        self.push_raw(value1)?;
        self.push_raw(value3)?;
        self.push_raw(value2)?;
        self.push_raw(value1)
    }

    pub fn dup2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_raw()?;
        let value2 = self.pop_raw()?;
        self.push_raw(value2)?;
        self.push_raw(value1)?;
        self.push_raw(value2)?;
        self.push_raw(value1)
    }

    pub fn dup2_x1(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_raw()?;
        let value2 = self.pop_raw()?;
        let value3 = self.pop_raw()?;
        self.push_raw(value2)?;
        self.push_raw(value1)?;
        self.push_raw(value3)?;
        self.push_raw(value2)?;
        self.push_raw(value1)
    }

    pub fn dup2_x2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_raw()?;
        let value2 = self.pop_raw()?;
        let value3 = self.pop_raw()?;
        let value4 = self.pop_raw()?;
        self.push_raw(value2)?;
        self.push_raw(value1)?;
        self.push_raw(value4)?;
        self.push_raw(value3)?;
        self.push_raw(value2)?;
        self.push_raw(value1)
    }

    pub fn swap(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_raw()?;
        let value2 = self.pop_raw()?;
        self.push_raw(value1)?;
        self.push_raw(value2)
    }
}

#[cfg(test)]
mod tests {
    use crate::jvm_error::VmError;
    use crate::jvm_values::Value;
    use crate::operand_stack::OperandStack;

    #[test]
    fn wide_values_occupy_two_slots() {
        let mut stack = OperandStack::new(2);
        stack.push(Value::Long(7)).unwrap();
        assert_eq!(2, stack.depth());
        //再压一个就超出max_stack
        assert_eq!(Err(VmError::StackOverFlow), stack.push(Value::Int(1)));
        assert_eq!(Value::Long(7), stack.pop().unwrap());
        assert_eq!(0, stack.depth());
    }

    #[test]
    fn pop_from_empty_fails() {
        let mut stack: OperandStack = OperandStack::new(1);
        assert_eq!(Err(VmError::PopFromEmptyStack), stack.pop());
    }

    #[test]
    fn dup2_duplicates_one_wide_value() {
        let mut stack = OperandStack::new(4);
        stack.push(Value::Double(1.5)).unwrap();
        stack.dup2().unwrap();
        assert_eq!(Value::Double(1.5), stack.pop().unwrap());
        assert_eq!(Value::Double(1.5), stack.pop().unwrap());
    }

    #[test]
    fn dup2_duplicates_two_narrow_values() {
        let mut stack = OperandStack::new(4);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        stack.dup2().unwrap();
        assert_eq!(Value::Int(2), stack.pop().unwrap());
        assert_eq!(Value::Int(1), stack.pop().unwrap());
        assert_eq!(Value::Int(2), stack.pop().unwrap());
        assert_eq!(Value::Int(1), stack.pop().unwrap());
    }

    #[test]
    fn pop_n_preserves_argument_order() {
        let mut stack = OperandStack::new(4);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Long(2)).unwrap();
        stack.push(Value::Int(3)).unwrap();
        let values = stack.pop_n(3).unwrap();
        assert_eq!(vec![Value::Int(1), Value::Long(2), Value::Int(3)], values);
    }

    #[test]
    fn swap_exchanges_top_two() {
        let mut stack = OperandStack::new(2);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        stack.swap().unwrap();
        assert_eq!(Value::Int(1), stack.pop().unwrap());
        assert_eq!(Value::Int(2), stack.pop().unwrap());
    }
}
