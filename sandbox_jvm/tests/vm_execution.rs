mod common;

use class_file_reader::instruction::opcode;
use class_file_reader::method_info::MethodAccessFlags;
use common::{hi_lo, ClassFileBuilder};
use sandbox_jvm::field_layout::field_size;
use sandbox_jvm::java_exception::MethodCallError;
use sandbox_jvm::jvm_values::Value;

const PUBLIC_STATIC: MethodAccessFlags =
    MethodAccessFlags::from_bits_truncate(0x0001 | 0x0008);

#[test]
fn static_add_returns_seven() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let class_file = ClassFileBuilder::new("pkg/Calc", Some("java/lang/Object"))
        .method(
            "add",
            "(II)I",
            PUBLIC_STATIC,
            2,
            2,
            &[opcode::ILOAD_0, opcode::ILOAD_1, opcode::IADD, opcode::IRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm.lookup_class_and_initialize(call_stack, "pkg/Calc").unwrap();
    let result = vm
        .invoke_static(
            call_stack,
            class_ref,
            "add",
            "(II)I",
            Vec::new(),
            vec![Value::Int(3), Value::Int(4)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(7)), result);
}

#[test]
fn long_arithmetic_uses_two_slots() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let class_file = ClassFileBuilder::new("pkg/LongCalc", Some("java/lang/Object"))
        .method(
            "mul",
            "(JJ)J",
            PUBLIC_STATIC,
            4,
            4,
            &[opcode::LLOAD_0, opcode::LLOAD_2, opcode::LMUL, opcode::LRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/LongCalc")
        .unwrap();
    let result = vm
        .invoke_static(
            call_stack,
            class_ref,
            "mul",
            "(JJ)J",
            Vec::new(),
            vec![Value::Long(1 << 33), Value::Long(3)],
        )
        .unwrap();
    assert_eq!(Some(Value::Long(3 << 33)), result);
}

#[test]
fn double_compare_follows_jvms_nan_rules() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let class_file = ClassFileBuilder::new("pkg/Cmp", Some("java/lang/Object"))
        .method(
            "cmpg",
            "(DD)I",
            PUBLIC_STATIC,
            4,
            4,
            &[opcode::DLOAD_0, opcode::DLOAD_2, opcode::DCMPG, opcode::IRETURN],
        )
        .method(
            "cmpl",
            "(DD)I",
            PUBLIC_STATIC,
            4,
            4,
            &[opcode::DLOAD_0, opcode::DLOAD_2, opcode::DCMPL, opcode::IRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm.lookup_class_and_initialize(call_stack, "pkg/Cmp").unwrap();

    let mut run = |name: &str, a: f64, b: f64| {
        vm.invoke_static(
            call_stack,
            class_ref,
            name,
            "(DD)I",
            Vec::new(),
            vec![Value::Double(a), Value::Double(b)],
        )
        .unwrap()
        .unwrap()
        .get_int()
        .unwrap()
    };
    //NaN: dcmpl -> -1, dcmpg -> +1
    assert_eq!(-1, run("cmpl", f64::NAN, 1.0));
    assert_eq!(1, run("cmpg", f64::NAN, 1.0));
    //有序时两者一致
    assert_eq!(-1, run("cmpg", 1.0, 2.0));
    assert_eq!(0, run("cmpg", 2.0, 2.0));
    assert_eq!(1, run("cmpg", 3.0, 2.0));
    assert_eq!(-1, run("cmpl", 1.0, 2.0));
}

#[test]
fn division_by_zero_transfers_to_handler() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut builder = ClassFileBuilder::new("pkg/Div", Some("java/lang/Object"));
    let arithmetic = builder.class_const("java/lang/ArithmeticException");
    //0: iload_0, 1: iload_1, 2: idiv, 3: ireturn
    //4: pop(异常对象), 5: iconst_m1, 6: ireturn
    let class_file = builder
        .method_with_exceptions(
            "div",
            "(II)I",
            PUBLIC_STATIC,
            2,
            2,
            &[
                opcode::ILOAD_0,
                opcode::ILOAD_1,
                opcode::IDIV,
                opcode::IRETURN,
                opcode::POP,
                opcode::ICONST_M1,
                opcode::IRETURN,
            ],
            &[(0, 4, 4, arithmetic)],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm.lookup_class_and_initialize(call_stack, "pkg/Div").unwrap();
    let ok = vm
        .invoke_static(
            call_stack,
            class_ref,
            "div",
            "(II)I",
            Vec::new(),
            vec![Value::Int(6), Value::Int(3)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(2)), ok);
    let caught = vm
        .invoke_static(
            call_stack,
            class_ref,
            "div",
            "(II)I",
            Vec::new(),
            vec![Value::Int(6), Value::Int(0)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(-1)), caught);
}

#[test]
fn uncaught_exception_unwinds_to_the_caller() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let class_file = ClassFileBuilder::new("pkg/Thrower", Some("java/lang/Object"))
        .method(
            "div",
            "(II)I",
            PUBLIC_STATIC,
            2,
            2,
            &[opcode::ILOAD_0, opcode::ILOAD_1, opcode::IDIV, opcode::IRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/Thrower")
        .unwrap();
    let result = vm.invoke_static(
        call_stack,
        class_ref,
        "div",
        "(II)I",
        Vec::new(),
        vec![Value::Int(1), Value::Int(0)],
    );
    match result {
        Err(MethodCallError::ExceptionThrown(exception)) => {
            assert_eq!("java/lang/ArithmeticException", exception.get_class().name);
            let message = exception.get_field_by_name("detailMessage").unwrap();
            let message = vm.read_utf8(call_stack, &message).unwrap();
            assert_eq!(Some("/ by zero".to_string()), message);
        }
        other => panic!("expected ArithmeticException, got {other:?}"),
    }
}

#[test]
fn virtual_dispatch_picks_the_override() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut animal = ClassFileBuilder::new("pkg/Animal", Some("java/lang/Object"));
    let init = common_init(&mut animal);
    let animal = animal
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init)
        .method(
            "legs",
            "()I",
            MethodAccessFlags::PUBLIC,
            1,
            1,
            &[opcode::ICONST_0, opcode::IRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, animal)
        .unwrap();

    let mut dog = ClassFileBuilder::new("pkg/Dog", Some("pkg/Animal"));
    let init = dog_init(&mut dog);
    let dog = dog
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init)
        .method(
            "legs",
            "()I",
            MethodAccessFlags::PUBLIC,
            1,
            1,
            &[opcode::ICONST_4, opcode::IRETURN],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, dog)
        .unwrap();

    let animal_class = vm
        .lookup_class_and_initialize(call_stack, "pkg/Animal")
        .unwrap();
    let dog_class = vm.lookup_class_and_initialize(call_stack, "pkg/Dog").unwrap();

    let animal_obj = vm.new_object(animal_class).unwrap();
    let dog_obj = vm.new_object(dog_class).unwrap();
    let animal_legs = vm
        .invoke_virtual(
            call_stack,
            "legs",
            "()I",
            Vec::new(),
            vec![Value::ObjectRef(animal_obj)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(0)), animal_legs);
    let dog_legs = vm
        .invoke_virtual(
            call_stack,
            "legs",
            "()I",
            Vec::new(),
            vec![Value::ObjectRef(dog_obj)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(4)), dog_legs);

    //继承的方法从父类解析出来
    let inherited = vm
        .invoke_virtual(
            call_stack,
            "hashCode",
            "()I",
            Vec::new(),
            vec![Value::ObjectRef(dog_obj)],
        )
        .unwrap();
    assert!(matches!(inherited, Some(Value::Int(_))));
}

#[test]
fn array_receiver_resolves_against_object() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let array = vm
        .new_primitive_array(sandbox_jvm::jvm_values::PrimitiveKind::Int, 3)
        .unwrap();
    //数组接收者：解析到java.lang.Object.hashCode，不应该抛
    let result = vm
        .invoke_virtual(
            call_stack,
            "hashCode",
            "()I",
            Vec::new(),
            vec![Value::ArrayRef(array)],
        )
        .unwrap();
    assert!(matches!(result, Some(Value::Int(_))));
}

#[test]
fn instance_fields_read_and_write_through_layout() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut builder = ClassFileBuilder::new("pkg/Box", Some("java/lang/Object"));
    let init = common_init(&mut builder);
    let x_field = builder.field_const("pkg/Box", "x", "I");
    let j_field = builder.field_const("pkg/Box", "big", "J");
    let class_file = builder
        .field("x", "I", class_file_reader::field_info::FieldAccessFlags::PRIVATE)
        .field("big", "J", class_file_reader::field_info::FieldAccessFlags::PRIVATE)
        .method("<init>", "()V", MethodAccessFlags::PUBLIC, 2, 1, &init)
        .method(
            "fill",
            "()V",
            MethodAccessFlags::PUBLIC,
            3,
            1,
            &[
                opcode::ALOAD_0,
                opcode::BIPUSH,
                42,
                opcode::PUTFIELD,
                hi_lo(x_field).0,
                hi_lo(x_field).1,
                opcode::ALOAD_0,
                opcode::LCONST_1,
                opcode::PUTFIELD,
                hi_lo(j_field).0,
                hi_lo(j_field).1,
                opcode::RETURN,
            ],
        )
        .method(
            "getX",
            "()I",
            MethodAccessFlags::PUBLIC,
            1,
            1,
            &[
                opcode::ALOAD_0,
                opcode::GETFIELD,
                hi_lo(x_field).0,
                hi_lo(x_field).1,
                opcode::IRETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm.lookup_class_and_initialize(call_stack, "pkg/Box").unwrap();
    let object_ref = vm.new_object(class_ref).unwrap();
    vm.invoke_exact(
        call_stack,
        class_ref,
        "<init>",
        "()V",
        Vec::new(),
        vec![Value::ObjectRef(object_ref)],
    )
    .unwrap();
    vm.invoke_virtual(
        call_stack,
        "fill",
        "()V",
        Vec::new(),
        vec![Value::ObjectRef(object_ref)],
    )
    .unwrap();
    let x = vm
        .invoke_virtual(
            call_stack,
            "getX",
            "()I",
            Vec::new(),
            vec![Value::ObjectRef(object_ref)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(42)), x);
    //宿主侧直读
    assert_eq!(Value::Int(42), object_ref.get_field_by_name("x").unwrap());
    assert_eq!(Value::Long(1), object_ref.get_field_by_name("big").unwrap());
}

#[test]
fn static_fields_live_in_the_mirror() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut builder = ClassFileBuilder::new("pkg/Counter", Some("java/lang/Object"));
    let x_field = builder.field_const("pkg/Counter", "x", "I");
    let nine = builder.long_const(9);
    let class_file = builder
        .field(
            "x",
            "I",
            class_file_reader::field_info::FieldAccessFlags::STATIC,
        )
        .constant_field("NINE", "J", nine)
        .method(
            "<clinit>",
            "()V",
            PUBLIC_STATIC,
            1,
            0,
            &[
                opcode::ICONST_2,
                opcode::PUTSTATIC,
                hi_lo(x_field).0,
                hi_lo(x_field).1,
                opcode::RETURN,
            ],
        )
        .method(
            "get",
            "()I",
            PUBLIC_STATIC,
            1,
            0,
            &[
                opcode::GETSTATIC,
                hi_lo(x_field).0,
                hi_lo(x_field).1,
                opcode::IRETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/Counter")
        .unwrap();
    //<clinit>写的值
    assert_eq!(Some(Value::Int(2)), vm.get_static(class_ref, "x"));
    //ConstantValue写的值
    assert_eq!(Some(Value::Long(9)), vm.get_static(class_ref, "NINE"));
    let via_bytecode = vm
        .invoke_static(call_stack, class_ref, "get", "()I", Vec::new(), Vec::new())
        .unwrap();
    assert_eq!(Some(Value::Int(2)), via_bytecode);

    //布局稳定性：同一个键的偏移在类生命周期内不变
    let offset_before = class_ref.static_layout.offset_of("x", "I").unwrap();
    vm.set_static(class_ref, "x", Value::Int(7)).unwrap();
    assert_eq!(Some(Value::Int(7)), vm.get_static(class_ref, "x"));
    assert_eq!(
        offset_before,
        class_ref.static_layout.offset_of("x", "I").unwrap()
    );
}

#[test]
fn tableswitch_and_lookupswitch_jump_correctly() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();

    //bci0: iload_0; bci1: tableswitch(低1高2), 目标相对bci1
    let mut table_code = vec![opcode::ILOAD_0, opcode::TABLESWITCH, 0, 0];
    table_code.extend_from_slice(&27i32.to_be_bytes()); // default -> bci 28
    table_code.extend_from_slice(&1i32.to_be_bytes());
    table_code.extend_from_slice(&2i32.to_be_bytes());
    table_code.extend_from_slice(&23i32.to_be_bytes()); // case 1 -> bci 24
    table_code.extend_from_slice(&25i32.to_be_bytes()); // case 2 -> bci 26
    table_code.extend_from_slice(&[
        opcode::ICONST_1,
        opcode::IRETURN,
        opcode::ICONST_2,
        opcode::IRETURN,
        opcode::ICONST_M1,
        opcode::IRETURN,
    ]);

    //bci0: iload_0; bci1: lookupswitch{42 -> bci20}, default -> bci22
    let mut lookup_code = vec![opcode::ILOAD_0, opcode::LOOKUPSWITCH, 0, 0];
    lookup_code.extend_from_slice(&21i32.to_be_bytes());
    lookup_code.extend_from_slice(&1i32.to_be_bytes());
    lookup_code.extend_from_slice(&42i32.to_be_bytes());
    lookup_code.extend_from_slice(&19i32.to_be_bytes());
    lookup_code.extend_from_slice(&[
        opcode::ICONST_1,
        opcode::IRETURN,
        opcode::ICONST_0,
        opcode::IRETURN,
    ]);

    let class_file = ClassFileBuilder::new("pkg/Switches", Some("java/lang/Object"))
        .method("table", "(I)I", PUBLIC_STATIC, 1, 1, &table_code)
        .method("lookup", "(I)I", PUBLIC_STATIC, 1, 1, &lookup_code)
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/Switches")
        .unwrap();

    let mut run = |name: &str, arg: i32| {
        vm.invoke_static(
            call_stack,
            class_ref,
            name,
            "(I)I",
            Vec::new(),
            vec![Value::Int(arg)],
        )
        .unwrap()
        .unwrap()
        .get_int()
        .unwrap()
    };
    assert_eq!(1, run("table", 1));
    assert_eq!(2, run("table", 2));
    assert_eq!(-1, run("table", 9));
    assert_eq!(1, run("lookup", 42));
    assert_eq!(0, run("lookup", 7));
}

#[test]
fn instanceof_and_checkcast_follow_assignability() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let mut builder = ClassFileBuilder::new("pkg/Checker", Some("java/lang/Object"));
    let throwable = builder.class_const("java/lang/Throwable");
    let class_file = builder
        .method(
            "isThrowable",
            "(Ljava/lang/Object;)I",
            PUBLIC_STATIC,
            1,
            1,
            &[
                opcode::ALOAD_0,
                opcode::INSTANCEOF,
                hi_lo(throwable).0,
                hi_lo(throwable).1,
                opcode::IRETURN,
            ],
        )
        .method(
            "castToThrowable",
            "(Ljava/lang/Object;)Ljava/lang/Throwable;",
            PUBLIC_STATIC,
            1,
            1,
            &[
                opcode::ALOAD_0,
                opcode::CHECKCAST,
                hi_lo(throwable).0,
                hi_lo(throwable).1,
                opcode::ARETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/Checker")
        .unwrap();

    //Exception是Throwable的子类
    let exception_class = vm
        .lookup_class_and_initialize(call_stack, "java/lang/Exception")
        .unwrap();
    let exception_obj = vm.new_object(exception_class).unwrap();
    let yes = vm
        .invoke_static(
            call_stack,
            class_ref,
            "isThrowable",
            "(Ljava/lang/Object;)I",
            Vec::new(),
            vec![Value::ObjectRef(exception_obj)],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(1)), yes);

    //instanceof对null是0
    let null_case = vm
        .invoke_static(
            call_stack,
            class_ref,
            "isThrowable",
            "(Ljava/lang/Object;)I",
            Vec::new(),
            vec![Value::Null],
        )
        .unwrap();
    assert_eq!(Some(Value::Int(0)), null_case);

    //checkcast失败 -> ClassCastException
    let object_class = vm
        .lookup_class_and_initialize(call_stack, "java/lang/Object")
        .unwrap();
    let plain_obj = vm.new_object(object_class).unwrap();
    let result = vm.invoke_static(
        call_stack,
        class_ref,
        "castToThrowable",
        "(Ljava/lang/Object;)Ljava/lang/Throwable;",
        Vec::new(),
        vec![Value::ObjectRef(plain_obj)],
    );
    match result {
        Err(MethodCallError::ExceptionThrown(exception)) => {
            assert_eq!("java/lang/ClassCastException", exception.get_class().name);
        }
        other => panic!("expected ClassCastException, got {other:?}"),
    }
}

#[test]
fn monitorenter_and_exit_balance() {
    let mut vm = common::booted_vm();
    let call_stack = vm.allocate_call_stack();
    let class_file = ClassFileBuilder::new("pkg/Locker", Some("java/lang/Object"))
        .method(
            "touch",
            "(Ljava/lang/Object;)V",
            PUBLIC_STATIC,
            1,
            1,
            &[
                opcode::ALOAD_0,
                opcode::MONITORENTER,
                opcode::ALOAD_0,
                opcode::MONITOREXIT,
                opcode::RETURN,
            ],
        )
        .build();
    vm.method_area()
        .define_from_class_file(Value::Null, class_file)
        .unwrap();
    let class_ref = vm
        .lookup_class_and_initialize(call_stack, "pkg/Locker")
        .unwrap();
    let object_class = vm
        .lookup_class_and_initialize(call_stack, "java/lang/Object")
        .unwrap();
    let object_ref = vm.new_object(object_class).unwrap();
    vm.invoke_static(
        call_stack,
        class_ref,
        "touch",
        "(Ljava/lang/Object;)V",
        Vec::new(),
        vec![Value::ObjectRef(object_ref)],
    )
    .unwrap();
    //monitorenter对null是NPE
    let result = vm.invoke_static(
        call_stack,
        class_ref,
        "touch",
        "(Ljava/lang/Object;)V",
        Vec::new(),
        vec![Value::Null],
    );
    match result {
        Err(MethodCallError::ExceptionThrown(exception)) => {
            assert_eq!(
                "java/lang/NullPointerException",
                exception.get_class().name
            );
        }
        other => panic!("expected NullPointerException, got {other:?}"),
    }
}

#[test]
fn field_sizes_match_the_layout_contract() {
    //内存管理契约的index scale
    assert_eq!(1, field_size("Z"));
    assert_eq!(8, field_size("Ljava/lang/Object;"));
}

fn common_init(builder: &mut ClassFileBuilder) -> Vec<u8> {
    let super_init = builder.method_const("java/lang/Object", "<init>", "()V");
    vec![
        opcode::ALOAD_0,
        opcode::INVOKESPECIAL,
        hi_lo(super_init).0,
        hi_lo(super_init).1,
        opcode::RETURN,
    ]
}

fn dog_init(builder: &mut ClassFileBuilder) -> Vec<u8> {
    let super_init = builder.method_const("pkg/Animal", "<init>", "()V");
    vec![
        opcode::ALOAD_0,
        opcode::INVOKESPECIAL,
        hi_lo(super_init).0,
        hi_lo(super_init).1,
        opcode::RETURN,
    ]
}
