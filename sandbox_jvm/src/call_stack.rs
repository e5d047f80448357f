use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::Value;
use crate::loaded_class::{ClassRef, MethodRef};
use crate::stack_frame::StackFrame;
use crate::stack_trace_element::StackTraceElement;
use typed_arena::Arena;

//需要包装一个裸指针，用来保持mutable的引用
#[derive(Debug, Clone)]
pub struct StackFrameRef<'a>(pub *mut StackFrame<'a>);

impl<'a> AsRef<StackFrame<'a>> for StackFrameRef<'a> {
    fn as_ref(&self) -> &StackFrame<'a> {
        unsafe { self.0.as_ref() }.unwrap()
    }
}

impl<'a> AsMut<StackFrame<'a>> for StackFrameRef<'a> {
    fn as_mut(&mut self) -> &mut StackFrame<'a> {
        unsafe { self.0.as_mut() }.unwrap()
    }
}

/// 一个解释器线程的帧栈。帧由arena持有，调用期间不会迁移。
pub struct CallStack<'a> {
    frames: Vec<StackFrameRef<'a>>,
    arena: Arena<StackFrame<'a>>,
    max_depth: usize,
}

impl<'a> Default for CallStack<'a> {
    fn default() -> Self {
        CallStack::new(2048)
    }
}

impl<'a> CallStack<'a> {
    pub(crate) fn new(max_depth: usize) -> CallStack<'a> {
        CallStack {
            frames: Vec::new(),
            arena: Arena::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 新帧：局部变量表先放receiver/参数(宽值占两个槽)，
    /// 操作数栈按给定内容预置。
    pub(crate) fn new_frame(
        &mut self,
        class_ref: ClassRef<'a>,
        method_ref: MethodRef<'a>,
        stack_values: Vec<Value<'a>>,
        locals: Vec<Value<'a>>,
    ) -> VmExecResult<StackFrameRef<'a>> {
        if self.frames.len() >= self.max_depth {
            return Err(VmError::StackOverFlow);
        }
        let new_frame = self
            .arena
            .alloc(StackFrame::new(class_ref, method_ref, stack_values, locals)?);
        let frame = StackFrameRef(new_frame);
        self.frames.push(frame.clone());
        Ok(frame)
    }

    pub(crate) fn pop_frame(&mut self) -> Option<StackFrameRef<'a>> {
        self.frames.pop()
    }

    /// 异常回溯，最内层帧在前
    pub fn backtrace(&self) -> Vec<StackTraceElement> {
        self.frames
            .iter()
            .rev()
            .map(|frame| frame.as_ref().to_stack_trace())
            .collect()
    }
}
