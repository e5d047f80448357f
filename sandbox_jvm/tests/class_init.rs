mod common;

use class_file_reader::instruction::opcode;
use class_file_reader::method_info::MethodAccessFlags;
use common::{hi_lo, ClassFileBuilder};
use sandbox_jvm::java_exception::MethodCallError;
use sandbox_jvm::jvm_values::Value;

const PUBLIC_STATIC: MethodAccessFlags =
    MethodAccessFlags::from_bits_truncate(0x0001 | 0x0008);

/// <clinit>抛非Error异常：第一个触发者拿到包装成
/// ExceptionInInitializerError的异常，之后每次请求都拿到
/// 同一个cause的ExceptionInInitializerError。
#[test]
fn errored_initializer_is_memoized() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut builder = ClassFileBuilder::new("pkg/Broken", Some("java/lang/Object"));
    let exception_class = builder.class_const("java/lang/IllegalStateException");
    let exception_init =
        builder.method_const("java/lang/IllegalStateException", "<init>", "()V");
    let class_file = builder
        .method(
            "<clinit>",
            "()V",
            PUBLIC_STATIC,
            2,
            0,
            &[
                opcode::NEW,
                hi_lo(exception_class).0,
                hi_lo(exception_class).1,
                opcode::DUP,
                opcode::INVOKESPECIAL,
                hi_lo(exception_init).0,
                hi_lo(exception_init).1,
                opcode::ATHROW,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();

    let first = vm.lookup_class_and_initialize(call_stack, "pkg/Broken");
    let first_cause = match first {
        Err(MethodCallError::ExceptionThrown(error)) => {
            assert_eq!(
                "java/lang/ExceptionInInitializerError",
                error.get_class().name
            );
            let cause = error.get_field_by_name("cause").unwrap();
            assert_eq!(
                "java/lang/IllegalStateException",
                cause.get_object().unwrap().get_class().name
            );
            cause
        }
        other => panic!("expected ExceptionInInitializerError, got {other:?}"),
    };

    //第二次触发：同样的错误类，cause是同一个实例
    let second = vm.lookup_class_and_initialize(call_stack, "pkg/Broken");
    match second {
        Err(MethodCallError::ExceptionThrown(error)) => {
            assert_eq!(
                "java/lang/ExceptionInInitializerError",
                error.get_class().name
            );
            let cause = error.get_field_by_name("cause").unwrap();
            assert_eq!(first_cause, cause);
        }
        other => panic!("expected ExceptionInInitializerError, got {other:?}"),
    }
}

/// 发起线程在<clinit>里再次触发自己的初始化不能死锁
#[test]
fn initializer_thread_may_reenter() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut builder = ClassFileBuilder::new("pkg/Reentrant", Some("java/lang/Object"));
    let x_field = builder.field_const("pkg/Reentrant", "x", "I");
    let poke = builder.method_const("pkg/Reentrant", "poke", "()V");
    let class_file = builder
        .field(
            "x",
            "I",
            class_file_reader::field_info::FieldAccessFlags::STATIC,
        )
        .method(
            "<clinit>",
            "()V",
            PUBLIC_STATIC,
            1,
            0,
            &[
                //poke里面的getstatic会再次请求本类初始化
                opcode::INVOKESTATIC,
                hi_lo(poke).0,
                hi_lo(poke).1,
                opcode::ICONST_5,
                opcode::PUTSTATIC,
                hi_lo(x_field).0,
                hi_lo(x_field).1,
                opcode::RETURN,
            ],
        )
        .method(
            "poke",
            "()V",
            PUBLIC_STATIC,
            1,
            0,
            &[
                opcode::GETSTATIC,
                hi_lo(x_field).0,
                hi_lo(x_field).1,
                opcode::POP,
                opcode::RETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/Reentrant")
        .unwrap();
    assert!(class_ref.is_initialized());
    assert_eq!(Some(Value::Int(5)), vm.get_static(class_ref, "x"));
}

/// 父类初始化先于子类，初始化只发生一次
#[test]
fn super_class_initializes_first_and_once() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();

    let mut base = ClassFileBuilder::new("pkg/Base", Some("java/lang/Object"));
    let base_order = base.field_const("pkg/Base", "order", "I");
    let base_file = base
        .field(
            "order",
            "I",
            class_file_reader::field_info::FieldAccessFlags::STATIC,
        )
        .method(
            "<clinit>",
            "()V",
            PUBLIC_STATIC,
            1,
            0,
            &[
                opcode::ICONST_1,
                opcode::PUTSTATIC,
                hi_lo(base_order).0,
                hi_lo(base_order).1,
                opcode::RETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, base_file)
        .unwrap();

    let mut derived = ClassFileBuilder::new("pkg/Derived", Some("pkg/Base"));
    let base_order = derived.field_const("pkg/Base", "order", "I");
    let derived_file = derived
        .method(
            "<clinit>",
            "()V",
            PUBLIC_STATIC,
            2,
            0,
            &[
                //父类此时必须已经初始化：order从1翻倍成2
                opcode::GETSTATIC,
                hi_lo(base_order).0,
                hi_lo(base_order).1,
                opcode::ICONST_1,
                opcode::IADD,
                opcode::PUTSTATIC,
                hi_lo(base_order).0,
                hi_lo(base_order).1,
                opcode::RETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, derived_file)
        .unwrap();

    let derived_class = vm
        .lookup_class_and_initialize(call_stack, "pkg/Derived")
        .unwrap();
    assert!(derived_class.is_initialized());
    let base_class = vm.lookup_class_and_initialize(call_stack, "pkg/Base").unwrap();
    assert_eq!(Some(Value::Int(2)), vm.get_static(base_class, "order"));

    //再初始化一次是幂等的
    let again = vm
        .lookup_class_and_initialize(call_stack, "pkg/Derived")
        .unwrap();
    assert!(std::ptr::eq(derived_class, again));
    assert_eq!(Some(Value::Int(2)), vm.get_static(base_class, "order"));
}

/// 接口方法解析：先类链再超接口(默认方法)
#[test]
fn interface_resolution_searches_super_interfaces() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();

    //接口带默认实现
    let speaker = ClassFileBuilder::new("pkg/Speaker", Some("java/lang/Object"))
        .interface()
        .method(
            "pitch",
            "()I",
            MethodAccessFlags::PUBLIC,
            1,
            1,
            &[opcode::ICONST_3, opcode::IRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, speaker)
        .unwrap();

    let mut impl_builder = ClassFileBuilder::new("pkg/Radio", Some("java/lang/Object"));
    let init = {
        let super_init = impl_builder.method_const("java/lang/Object", "<init>", "()V");
        vec![
            opcode::ALOAD_0,
            opcode::INVOKESPECIAL,
            hi_lo(super_init).0,
            hi_lo(super_init).1,
            opcode::RETURN,
        ]
    };
    let radio = impl_builder
        .implements("pkg/Speaker")
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init)
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, radio)
        .unwrap();

    let radio_class = vm.lookup_class_and_initialize(call_stack, "pkg/Radio").unwrap();
    let radio_obj = vm.new_object(radio_class).unwrap();
    //类自身没有pitch，解析落到超接口的默认实现
    let result = vm
        .invoke_interface(
            call_stack,
            "pitch",
            "()I",
            Vec::new(),
            vec![Value::ObjectRef(radio_obj)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(3)), result);
}

/// 虚解析失败给NoSuchMethodError，消息是owner.name+desc
#[test]
fn missing_virtual_method_raises_no_such_method() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let object_class = vm
        .lookup_class_and_initialize(call_stack, "java/lang/Object")
        .unwrap();
    let object_ref = vm.new_object(object_class).unwrap();
    let result = vm.invoke_virtual(
        call_stack,
        "noSuchMethod",
        "()V",
        Vec::new(),
        vec![Value::ObjectRef(object_ref)],
    );
    match result {
        Err(MethodCallError::ExceptionThrown(error)) => {
            assert_eq!("java/lang/NoSuchMethodError", error.get_class().name);
            let message = error.get_field_by_name("detailMessage").unwrap();
            let message = vm.read_utf8(call_stack, &message).unwrap().unwrap();
            assert_eq!("java/lang/Object.noSuchMethod()V", message);
        }
        other => panic!("expected NoSuchMethodError, got {other:?}"),
    }
}
