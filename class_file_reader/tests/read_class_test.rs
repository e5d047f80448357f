use class_file_reader::attribute_info::AttributeType;
use class_file_reader::class_file_reader::read_buffer;
use class_file_reader::class_file_version::ClassFileVersion;
use class_file_reader::method_info::MethodAccessFlags;

//手工拼一个最小的class文件: public class Add { public static int add(int, int); }
fn minimal_class_bytes() -> Vec<u8> {
    let mut bytes: Vec<u8> = Vec::new();
    bytes.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes()); // minor
    bytes.extend_from_slice(&52u16.to_be_bytes()); // major, JDK 8

    // constant pool, 7 entries
    bytes.extend_from_slice(&8u16.to_be_bytes());
    let utf8 = |bytes: &mut Vec<u8>, text: &str| {
        bytes.push(1);
        bytes.extend_from_slice(&(text.len() as u16).to_be_bytes());
        bytes.extend_from_slice(text.as_bytes());
    };
    utf8(&mut bytes, "Add"); // #1
    bytes.push(7); // #2 Class #1
    bytes.extend_from_slice(&1u16.to_be_bytes());
    utf8(&mut bytes, "java/lang/Object"); // #3
    bytes.push(7); // #4 Class #3
    bytes.extend_from_slice(&3u16.to_be_bytes());
    utf8(&mut bytes, "add"); // #5
    utf8(&mut bytes, "(II)I"); // #6
    utf8(&mut bytes, "Code"); // #7

    bytes.extend_from_slice(&0x0021u16.to_be_bytes()); // ACC_PUBLIC | ACC_SUPER
    bytes.extend_from_slice(&2u16.to_be_bytes()); // this
    bytes.extend_from_slice(&4u16.to_be_bytes()); // super
    bytes.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    bytes.extend_from_slice(&0u16.to_be_bytes()); // fields

    bytes.extend_from_slice(&1u16.to_be_bytes()); // methods
    bytes.extend_from_slice(&0x0009u16.to_be_bytes()); // ACC_PUBLIC | ACC_STATIC
    bytes.extend_from_slice(&5u16.to_be_bytes()); // name
    bytes.extend_from_slice(&6u16.to_be_bytes()); // descriptor
    bytes.extend_from_slice(&1u16.to_be_bytes()); // one attribute

    // Code attribute: iload_0, iload_1, iadd, ireturn
    let code = [0x1au8, 0x1b, 0x60, 0xac];
    let mut info: Vec<u8> = Vec::new();
    info.extend_from_slice(&2u16.to_be_bytes()); // max_stack
    info.extend_from_slice(&2u16.to_be_bytes()); // max_locals
    info.extend_from_slice(&(code.len() as u32).to_be_bytes());
    info.extend_from_slice(&code);
    info.extend_from_slice(&0u16.to_be_bytes()); // exception table
    info.extend_from_slice(&0u16.to_be_bytes()); // attributes
    bytes.extend_from_slice(&7u16.to_be_bytes());
    bytes.extend_from_slice(&(info.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&info);

    bytes.extend_from_slice(&0u16.to_be_bytes()); // class attributes
    bytes
}

#[test]
fn reads_minimal_class() {
    let bytes = minimal_class_bytes();
    let class_file = read_buffer(&bytes).unwrap();
    assert_eq!("Add", class_file.this_class_name);
    assert_eq!(
        Some("java/lang/Object".to_string()),
        class_file.super_class_name
    );
    assert_eq!(ClassFileVersion::Jdk8, class_file.version);
    assert!(class_file.interface_names.is_empty());
    assert!(class_file.field_info.is_empty());

    assert_eq!(1, class_file.method_info.len());
    let method = &class_file.method_info[0];
    assert_eq!("add", method.name);
    assert_eq!("(II)I", method.descriptor);
    assert!(method.access_flags.contains(MethodAccessFlags::STATIC));
    assert_eq!(1, method.attributes.len());
    assert_eq!(AttributeType::Code, method.attributes[0].name);
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = minimal_class_bytes();
    bytes[0] = 0;
    assert!(read_buffer(&bytes).is_err());
}
