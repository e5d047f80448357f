use crate::jvm_error::VmError;
use crate::jvm_values::{ObjectReference, Value};

/// 方法调用的失败结果。
/// ExceptionThrown携带的是VM堆里的throwable实例，会参与异常表匹配并跨帧传播；
/// InternalError是宿主错误，字节码不可见。
#[derive(Debug)]
pub enum MethodCallError<'a> {
    InternalError(VmError),
    ExceptionThrown(ObjectReference<'a>),
}

impl<'a> From<VmError> for MethodCallError<'a> {
    fn from(value: VmError) -> Self {
        Self::InternalError(value)
    }
}

pub type InvokeMethodResult<'a> = Result<Option<Value<'a>>, MethodCallError<'a>>;

pub type InvokeResult<'a, T> = Result<T, MethodCallError<'a>>;
