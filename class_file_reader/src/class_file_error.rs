use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Models the possible errors returned when reading a .class file
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ClassFileError {
    UnexpectedEndOfData,
    InvalidCesu8String,
    UnsupportedVersion(u16, u16),
    InvalidConstantPoolIndexError(u16),
    ConstantPoolTagNotSupport(u8),
    InvalidClassData(String),
    InvalidCode(String),
}

impl Display for ClassFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassFileError::UnexpectedEndOfData => {
                write!(f, "unexpected end of class data")
            }
            ClassFileError::InvalidCesu8String => {
                write!(f, "invalid cesu-8 string")
            }
            ClassFileError::UnsupportedVersion(major, minor) => {
                write!(f, "unsupported class file version {major}.{minor}")
            }
            ClassFileError::InvalidConstantPoolIndexError(index) => {
                write!(f, "invalid const pool index {index}")
            }
            ClassFileError::ConstantPoolTagNotSupport(tag) => {
                write!(f, "constant pool tag not support {tag}")
            }
            ClassFileError::InvalidClassData(message) => {
                write!(f, "invalid class data: {message}")
            }
            ClassFileError::InvalidCode(message) => {
                write!(f, "invalid code: {message}")
            }
        }
    }
}

impl Error for ClassFileError {}

pub type Result<T> = std::result::Result<T, ClassFileError>;
