mod common;

use sandbox_jvm::java_exception::MethodCallError;
use sandbox_jvm::jvm_values::Value;

#[test]
fn define_class_links_and_mirrors() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let bytes = common::minimal_class_bytes("pkg/Defined");
    let class_ref = vm
        .define_class(
            call_stack,
            Value::Null,
            Some("pkg/Defined"),
            &bytes,
            0,
            bytes.len() as i32,
            Value::Null,
            "test-source",
        )
        .unwrap();
    assert_eq!("pkg/Defined", class_ref.name);
    assert!(class_ref.mirror().is_some());
    //链接进了引导loader数据
    let again = vm.get_or_load_class(call_stack, "pkg/Defined").unwrap();
    assert!(std::ptr::eq(class_ref, again));
}

/// 请求名和字节里解析出的名字不一致：ClassNotFoundException，
/// 消息同时带上两个名字(点号形式)。
#[test]
fn define_class_rejects_name_mismatch() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let bytes = common::minimal_class_bytes("other/C");
    let result = vm.define_class(
        call_stack,
        Value::Null,
        Some("pkg/C"),
        &bytes,
        0,
        bytes.len() as i32,
        Value::Null,
        "test-source",
    );
    match result {
        Err(MethodCallError::ExceptionThrown(error)) => {
            assert_eq!(
                "java/lang/ClassNotFoundException",
                error.get_class().name
            );
            let message = error.get_field_by_name("detailMessage").unwrap();
            let message = vm.read_utf8(call_stack, &message).unwrap().unwrap();
            assert!(message.contains("other.C"), "message: {message}");
            assert!(message.contains("pkg/C") || message.contains("pkg.C"), "message: {message}");
        }
        other => panic!("expected ClassNotFoundException, got {other:?}"),
    }
}

#[test]
fn define_class_rejects_duplicates() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let bytes = common::minimal_class_bytes("pkg/Twice");
    vm.define_class(
        call_stack,
        Value::Null,
        None,
        &bytes,
        0,
        bytes.len() as i32,
        Value::Null,
        "test-source",
    )
    .unwrap();
    let result = vm.define_class(
        call_stack,
        Value::Null,
        None,
        &bytes,
        0,
        bytes.len() as i32,
        Value::Null,
        "test-source",
    );
    match result {
        Err(MethodCallError::ExceptionThrown(error)) => {
            assert_eq!(
                "java/lang/ClassNotFoundException",
                error.get_class().name
            );
            let message = error.get_field_by_name("detailMessage").unwrap();
            let message = vm.read_utf8(call_stack, &message).unwrap().unwrap();
            assert!(message.contains("already exists"), "message: {message}");
        }
        other => panic!("expected ClassNotFoundException, got {other:?}"),
    }
}

#[test]
fn define_class_bounds_checks_offsets() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let bytes = common::minimal_class_bytes("pkg/Bounds");
    for (offset, length) in [(-1, 4), (0, -4), (4, i32::MAX), (0, bytes.len() as i32 + 1)] {
        let result = vm.define_class(
            call_stack,
            Value::Null,
            None,
            &bytes,
            offset,
            length,
            Value::Null,
            "test-source",
        );
        match result {
            Err(MethodCallError::ExceptionThrown(error)) => {
                assert_eq!(
                    "java/lang/ArrayIndexOutOfBoundsException",
                    error.get_class().name
                );
            }
            other => panic!("expected ArrayIndexOutOfBoundsException, got {other:?}"),
        }
    }
}

#[test]
fn broken_bytes_raise_no_class_def_found() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let bytes = vec![0u8; 16];
    let result = vm.define_class(
        call_stack,
        Value::Null,
        None,
        &bytes,
        0,
        bytes.len() as i32,
        Value::Null,
        "test-source",
    );
    match result {
        Err(MethodCallError::ExceptionThrown(error)) => {
            assert_eq!(
                "java/lang/NoClassDefFoundError",
                error.get_class().name
            );
        }
        other => panic!("expected NoClassDefFoundError, got {other:?}"),
    }
}
