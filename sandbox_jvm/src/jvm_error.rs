use class_file_reader::class_file_error::ClassFileError;
use thiserror::Error;

/// 宿主侧错误。与VM内的异常(Java对象)是两个通道：
/// 这里的错误永远不会被字节码的异常表捕获，直接上抛给嵌入方。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    #[error("ClassFormatError {0}")]
    ClassFormatError(String),
    #[error("ClassNotFoundException {0}")]
    ClassNotFoundException(String),
    #[error("NoClassDefFoundError {0}")]
    NoClassDefFoundError(String),
    #[error("MethodNotFoundException {0}{1}")]
    MethodNotFoundException(String, String),
    #[error("FieldNotFoundException {0}:{1}")]
    FieldNotFoundException(String, String),
    #[error("ClassPathNotExist {0}")]
    ClassPathNotExist(String),
    #[error("JarFileNotExist {0}")]
    JarFileNotExist(String),
    #[error("ReadClassBytesError {0}")]
    ReadClassBytesError(String),
    #[error("ExecuteCodeError {0}")]
    ExecuteCodeError(String),
    #[error("value type mismatch")]
    ValueTypeMismatch,
    #[error("index out of bounds")]
    IndexOutOfBounds,
    #[error("invalid local slot {0}")]
    InvalidLocalSlot(usize),
    #[error("can't pop from empty stack")]
    PopFromEmptyStack,
    #[error("stack over flow")]
    StackOverFlow,
    #[error("heap space exhausted")]
    OutOfMemory,
    #[error("NotImplemented")]
    NotImplemented,
    // 不可能状态，布局损坏之类。不参与任何恢复路径
    #[error("vm panic: {0}")]
    Panic(String),
}

pub type VmExecResult<T> = Result<T, VmError>;

impl From<ClassFileError> for VmError {
    fn from(value: ClassFileError) -> Self {
        VmError::ReadClassBytesError(value.to_string())
    }
}
