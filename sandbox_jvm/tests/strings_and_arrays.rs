mod common;

use sandbox_jvm::jvm_values::{PrimitiveKind, Value};
use sandbox_jvm::loaded_class::JavaClass;
use sandbox_jvm::runtime_constant_pool::RuntimeConstantPoolEntry;

#[test]
fn utf8_round_trip_on_jdk8_string_shape() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    for text in ["", "hello", "héllo✓", "𝄞 clef", "中文"] {
        let string_ref = vm.new_utf8(call_stack, text).unwrap();
        let back = vm
            .read_utf8(call_stack, &Value::ObjectRef(string_ref))
            .unwrap();
        assert_eq!(Some(text.to_string()), back);
    }
    //null直接是None
    assert_eq!(None, vm.read_utf8(call_stack, &Value::Null).unwrap());
}

#[test]
fn empty_string_on_jdk9_shape_writes_byte_array() {
    let mut vm = common::booted_vm_with_string_shape("[B");
    let call_stack = vm.allocate_call_stack();
    let string_ref = vm.new_utf8(call_stack, "").unwrap();
    //value字段指向零长度byte数组
    let value = string_ref.get_field_by_name("value").unwrap();
    let array = value.get_array().unwrap();
    assert_eq!(0, array.length());
    assert_eq!("[B", array.get_class().name);
    let back = vm
        .read_utf8(call_stack, &Value::ObjectRef(string_ref))
        .unwrap();
    assert_eq!(Some(String::new()), back);
}

#[test]
fn interned_strings_are_shared() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let first = vm.intern_string(call_stack, "shared").unwrap();
    let second = vm.intern_string(call_stack, "shared").unwrap();
    assert_eq!(first, second);
    let other = vm.intern_string(call_stack, "different").unwrap();
    assert_ne!(first, other);
}

#[test]
fn primitive_array_round_trips() {
    let mut vm = common::booted_vm();

    let ints = [i32::MIN, -1, 0, 7, i32::MAX];
    let vm_ints = vm.to_vm_ints(&ints).unwrap();
    assert_eq!(ints.to_vec(), vm.to_java_ints(vm_ints).unwrap());

    let longs = [i64::MIN, 0, i64::MAX];
    let vm_longs = vm.to_vm_longs(&longs).unwrap();
    assert_eq!(longs.to_vec(), vm.to_java_longs(vm_longs).unwrap());

    let doubles = [0.0, -1.5, f64::MAX];
    let vm_doubles = vm.to_vm_doubles(&doubles).unwrap();
    assert_eq!(doubles.to_vec(), vm.to_java_doubles(vm_doubles).unwrap());

    let chars: Vec<u16> = "héllo".encode_utf16().collect();
    let vm_chars = vm.to_vm_chars(&chars).unwrap();
    assert_eq!(chars, vm.to_java_chars(vm_chars).unwrap());

    let bytes = [-128i8, -1, 0, 127];
    let vm_bytes = vm.to_vm_bytes(&bytes).unwrap();
    assert_eq!(bytes.to_vec(), vm.to_java_bytes(vm_bytes).unwrap());

    let booleans = [true, false, true];
    let vm_booleans = vm.to_vm_booleans(&booleans).unwrap();
    assert_eq!(booleans.to_vec(), vm.to_java_booleans(vm_booleans).unwrap());

    let shorts = [i16::MIN, 0, i16::MAX];
    let vm_shorts = vm.to_vm_shorts(&shorts).unwrap();
    assert_eq!(shorts.to_vec(), vm.to_java_shorts(vm_shorts).unwrap());

    let floats = [1.5f32, -0.25];
    let vm_floats = vm.to_vm_floats(&floats).unwrap();
    assert_eq!(floats.to_vec(), vm.to_java_floats(vm_floats).unwrap());
}

#[test]
fn reference_array_round_trip_keeps_identity_and_null() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let a = vm.new_utf8(call_stack, "a").unwrap();
    let b = vm.new_utf8(call_stack, "b").unwrap();
    let values = vec![Value::ObjectRef(a), Value::Null, Value::ObjectRef(b)];
    let vm_array = vm.to_vm_values(&values).unwrap();
    let back = vm.to_java_values(vm_array).unwrap();
    assert_eq!(values, back);
}

/// ldc一个[[I类常量：元素链是int[][] -> int[] -> int
#[test]
fn ldc_of_nested_array_class() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let entry = RuntimeConstantPoolEntry::ClassReference("[[I".to_string());
    let value = vm
        .value_from_ldc(call_stack, &Value::Null, &entry)
        .unwrap();
    let mirror = value.get_object().unwrap();

    let java_class = vm
        .resolve_java_class(call_stack, &Value::Null, "[[I")
        .unwrap();
    assert_eq!(Some(mirror), java_class.mirror());
    match java_class {
        JavaClass::Array(outer) => {
            assert_eq!("[[I", outer.name);
            assert_eq!(2, outer.dimensions);
            match &outer.component {
                JavaClass::Array(inner) => {
                    assert_eq!("[I", inner.name);
                    match &inner.component {
                        JavaClass::Primitive(primitive) => {
                            assert_eq!(PrimitiveKind::Int, primitive.kind);
                            assert_eq!("int", primitive.name);
                        }
                        _ => panic!("expected primitive component"),
                    }
                }
                _ => panic!("expected [I component"),
            }
        }
        _ => panic!("expected array class"),
    }

    //同名数组类复用同一个镜像
    let again = vm
        .resolve_java_class(call_stack, &Value::Null, "[[I")
        .unwrap();
    assert!(java_class.ptr_eq(&again));
}

#[test]
fn array_elements_narrow_on_write_and_widen_on_read() {
    let mut vm = common::booted_vm();
    let array = vm.new_primitive_array(PrimitiveKind::Byte, 2).unwrap();
    //栈上的Int按元素类型收窄
    array.set_element(0, &Value::Int(0x1ff)).unwrap();
    assert_eq!(Value::Int(-1), array.get_element(0).unwrap());
    array.set_element(1, &Value::Int(-2)).unwrap();
    assert_eq!(Value::Int(-2), array.get_element(1).unwrap());

    let chars = vm.new_primitive_array(PrimitiveKind::Char, 1).unwrap();
    chars.set_element(0, &Value::Int(-1)).unwrap();
    //char零扩展
    assert_eq!(Value::Int(0xffff), chars.get_element(0).unwrap());

    //越界是内存管理器的错误，VM层再翻译成AIOOBE
    assert!(array.get_element(2).is_err());
}

#[test]
fn multi_dimensional_array_allocation() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let java_class = vm
        .resolve_java_class(call_stack, &Value::Null, "[[I")
        .unwrap();
    let array_class = match java_class {
        JavaClass::Array(array_class) => array_class,
        _ => panic!("expected array class"),
    };
    let array = vm.new_multi_array(array_class, &[2, 3]).unwrap();
    assert_eq!(2, array.length());
    for index in 0..2 {
        let row = array.get_element(index).unwrap().get_array().unwrap();
        assert_eq!(3, row.length());
        assert_eq!(Value::Int(0), row.get_element(0).unwrap());
    }
}
