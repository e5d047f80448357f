use crate::jvm_error::{VmError, VmExecResult};
use crate::runtime_attribute_info::{get_attr_as_code, get_attr_as_exception, CodeAttribute};
use crate::runtime_constant_pool::RuntimeConstantPool;
use class_file_reader::attribute_info::AttributeType;
use class_file_reader::method_info::{MethodAccessFlags, MethodInfo};

/// 解析后的方法描述符。args按声明顺序保存各参数的字段描述符。
#[derive(Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub args: Vec<String>,
    pub ret: Option<String>,
}

impl MethodDescriptor {
    //https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.3.3
    pub fn parse(descriptor: &str) -> VmExecResult<MethodDescriptor> {
        let bytes = descriptor.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(VmError::ClassFormatError(format!(
                "broken method descriptor {descriptor}"
            )));
        }
        let mut args = Vec::new();
        let mut pos = 1;
        while pos < bytes.len() && bytes[pos] != b')' {
            let start = pos;
            while bytes[pos] == b'[' {
                pos += 1;
            }
            match bytes[pos] {
                b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => pos += 1,
                b'L' => {
                    while pos < bytes.len() && bytes[pos] != b';' {
                        pos += 1;
                    }
                    pos += 1;
                }
                _ => {
                    return Err(VmError::ClassFormatError(format!(
                        "broken method descriptor {descriptor}"
                    )))
                }
            }
            if pos > bytes.len() {
                return Err(VmError::ClassFormatError(format!(
                    "broken method descriptor {descriptor}"
                )));
            }
            args.push(descriptor[start..pos].to_string());
        }
        if pos >= bytes.len() || bytes[pos] != b')' {
            return Err(VmError::ClassFormatError(format!(
                "broken method descriptor {descriptor}"
            )));
        }
        let ret = &descriptor[pos + 1..];
        if ret.is_empty() {
            return Err(VmError::ClassFormatError(format!(
                "broken method descriptor {descriptor}"
            )));
        }
        let ret = if ret == "V" {
            None
        } else {
            Some(ret.to_string())
        };
        Ok(MethodDescriptor { args, ret })
    }

    /// 局部变量表里的参数槽位数，long/double占两个
    pub fn arg_slots(&self) -> usize {
        self.args
            .iter()
            .map(|desc| match desc.as_str() {
                "J" | "D" => 2,
                _ => 1,
            })
            .sum()
    }
}

#[derive(Debug)]
pub struct RuntimeMethodInfo<'a> {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub signature: MethodDescriptor,
    //除了native/abstract方法都应该有code属性
    pub code: Option<CodeAttribute<'a>>,
    pub exceptions: Vec<String>,
}

impl<'a> RuntimeMethodInfo<'a> {
    pub fn from(
        method_info: MethodInfo,
        cp: &RuntimeConstantPool,
    ) -> VmExecResult<RuntimeMethodInfo<'a>> {
        let mut code = None;
        let mut exceptions = Vec::new();
        for attr in &method_info.attributes {
            match attr.name {
                AttributeType::Code => code = Some(get_attr_as_code(&attr.info, cp)?),
                AttributeType::Exceptions => exceptions = get_attr_as_exception(&attr.info, cp)?,
                _ => {}
            }
        }
        let signature = MethodDescriptor::parse(&method_info.descriptor)?;
        Ok(RuntimeMethodInfo {
            access_flags: method_info.access_flags,
            name: method_info.name,
            descriptor: method_info.descriptor,
            signature,
            code,
            exceptions,
        })
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_native(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::NATIVE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::ABSTRACT)
    }

    pub fn is_synchronized(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::SYNCHRONIZED)
    }

    pub fn is_init_method(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_class_init_method(&self) -> bool {
        self.name == "<clinit>"
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime_method_info::MethodDescriptor;

    #[test]
    fn parses_empty_descriptor() {
        let descriptor = MethodDescriptor::parse("()V").unwrap();
        assert!(descriptor.args.is_empty());
        assert_eq!(None, descriptor.ret);
    }

    #[test]
    fn parses_mixed_arguments() {
        let descriptor =
            MethodDescriptor::parse("(IJLjava/lang/String;[[BD)Ljava/lang/Object;").unwrap();
        assert_eq!(
            vec!["I", "J", "Ljava/lang/String;", "[[B", "D"],
            descriptor.args
        );
        assert_eq!(Some("Ljava/lang/Object;".to_string()), descriptor.ret);
        // I=1, J=2, ref=1, array=1, D=2
        assert_eq!(7, descriptor.arg_slots());
    }

    #[test]
    fn rejects_broken_descriptors() {
        assert!(MethodDescriptor::parse("I)V").is_err());
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(Q)V").is_err());
        assert!(MethodDescriptor::parse("(I)").is_err());
    }
}
