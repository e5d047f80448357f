/// ## 属性信息
/// 属性可以出现在字段、方法，类中，是重要的扩展机制
/// [jvms-4.7](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7)
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AttributeType {
    ConstantValue,
    Code,
    Exceptions,
    SourceFile,
    LineNumberTable,
    LocalVariableTable,
    LocalVariableTypeTable,
    StackMapTable,
    BootstrapMethods,
    InnerClasses,
    EnclosingMethod,
    NestHost,
    NestMembers,
    Signature,
    Synthetic,
    Deprecated,
    Other(String),
}

impl AttributeType {
    pub fn by_name(name: &str) -> AttributeType {
        match name {
            "ConstantValue" => AttributeType::ConstantValue,
            "Code" => AttributeType::Code,
            "Exceptions" => AttributeType::Exceptions,
            "SourceFile" => AttributeType::SourceFile,
            "LineNumberTable" => AttributeType::LineNumberTable,
            "LocalVariableTable" => AttributeType::LocalVariableTable,
            "LocalVariableTypeTable" => AttributeType::LocalVariableTypeTable,
            "StackMapTable" => AttributeType::StackMapTable,
            "BootstrapMethods" => AttributeType::BootstrapMethods,
            "InnerClasses" => AttributeType::InnerClasses,
            "EnclosingMethod" => AttributeType::EnclosingMethod,
            "NestHost" => AttributeType::NestHost,
            "NestMembers" => AttributeType::NestMembers,
            "Signature" => AttributeType::Signature,
            "Synthetic" => AttributeType::Synthetic,
            "Deprecated" => AttributeType::Deprecated,
            other => AttributeType::Other(other.to_string()),
        }
    }
}

/// 未解析的属性。具体的解析由使用方按需进行(Code/ConstantValue等)。
#[derive(Debug, PartialEq, Clone)]
pub struct AttributeInfo {
    pub name: AttributeType,
    pub info: Vec<u8>,
}
