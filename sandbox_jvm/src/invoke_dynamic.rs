use crate::call_stack::CallStack;
use crate::java_exception::{InvokeMethodResult, InvokeResult, MethodCallError};
use crate::jvm_error::VmError;
use crate::jvm_values::Value;
use crate::loaded_class::ClassRef;
use crate::reference_value::ObjectReference;
use crate::runtime_attribute_info::BootstrapMethodEntry;
use crate::runtime_constant_pool::{MethodHandleKind, RuntimeConstantPoolEntry};
use crate::virtual_machine::VirtualMachine;

//MethodHandleNatives.linkCallSite的两个已发布签名。
//新版多了一个cpIndex参数(hotspot目前不用，传0)。
const LINK_CALL_SITE_DESC: &str = "(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/invoke/MemberName;";
const LINK_CALL_SITE_DESC_WITH_INDEX: &str = "(Ljava/lang/Object;ILjava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/invoke/MemberName;";

const LINK_MH_CONSTANT_DESC: &str =
    "(Ljava/lang/Class;ILjava/lang/Class;Ljava/lang/String;Ljava/lang/Object;)Ljava/lang/invoke/MethodHandle;";

/// invokedynamic站点链接。流程见JVMS §6.5.invokedynamic：
/// 引导方法必须是INVOKESTATIC句柄；静态参数逐个转成VM值；
/// 通过MethodHandleNatives.linkCallSite物化call site，
/// 结果从一格的appendix数组里取回。
/// 链接期间抛出的VM异常包成BootstrapMethodError。
pub(crate) fn link_call_site<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    caller: ClassRef<'a>,
    pool_index: u16,
) -> InvokeResult<'a, ObjectReference<'a>> {
    let (bsm_index, name, descriptor) = {
        let (bsm_index, name, descriptor) = caller.constant_pool.get_invoke_dynamic(pool_index)?;
        (bsm_index, name.to_string(), descriptor.to_string())
    };
    let entry = caller
        .bootstrap_methods
        .get(bsm_index as usize)
        .ok_or(MethodCallError::InternalError(VmError::ClassFormatError(
            format!("missing bootstrap method #{bsm_index}"),
        )))?;

    match link_call_site_inner(vm, call_stack, caller, entry, &name, &descriptor) {
        Ok(call_site) => Ok(call_site),
        Err(MethodCallError::ExceptionThrown(cause)) => {
            let error_class = vm
                .symbols()
                .map_err(MethodCallError::InternalError)?
                .java_lang_bootstrap_method_error;
            Err(vm.raise(
                call_stack,
                error_class,
                Some("CallSite initialization exception"),
                Some(Value::ObjectRef(cause)),
            ))
        }
        Err(internal) => Err(internal),
    }
}

fn link_call_site_inner<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    caller: ClassRef<'a>,
    entry: &'a BootstrapMethodEntry,
    name: &str,
    descriptor: &str,
) -> InvokeResult<'a, ObjectReference<'a>> {
    if entry.kind != MethodHandleKind::InvokeStatic {
        return Err(vm.raise_illegal_state(call_stack, "Bootstrap tag is not static"));
    }
    let linker = link_method_handle_constant(vm, call_stack, caller, entry)?;

    let mut bsm_args = Vec::with_capacity(entry.arguments.len());
    for argument_index in &entry.arguments {
        let argument = for_invoke_dynamic_call(vm, call_stack, caller, *argument_index)?;
        bsm_args.push(argument);
    }

    let symbols = vm.symbols().map_err(MethodCallError::InternalError)?;
    let natives = symbols.java_lang_invoke_method_handle_natives;
    let object_class = symbols.java_lang_object;

    //一格的appendix，linkCallSite把物化结果写进来
    let appendix = vm.new_reference_array(
        crate::loaded_class::JavaClass::Instance(object_class),
        1,
    )?;
    let args_array = vm.to_vm_values(&bsm_args)?;
    let interned_name = vm.intern_string(call_stack, name)?;
    let method_type = materialize_method_type(vm, call_stack, caller, descriptor)?;

    let caller_mirror = vm.mirror_of(crate::loaded_class::JavaClass::Instance(caller))?;

    //优先旧签名，没有再试带cpIndex的新签名
    let (link_desc, link_args): (&str, Vec<Value<'a>>) =
        if natives.find_declared_method("linkCallSite", LINK_CALL_SITE_DESC).is_some() {
            (
                LINK_CALL_SITE_DESC,
                vec![
                    Value::ObjectRef(caller_mirror),
                    linker,
                    Value::ObjectRef(interned_name),
                    method_type,
                    Value::ArrayRef(args_array),
                    Value::ArrayRef(appendix),
                ],
            )
        } else {
            (
                LINK_CALL_SITE_DESC_WITH_INDEX,
                vec![
                    Value::ObjectRef(caller_mirror),
                    //hotspot目前不使用cpIndex
                    Value::Int(0),
                    linker,
                    Value::ObjectRef(interned_name),
                    method_type,
                    Value::ArrayRef(args_array),
                    Value::ArrayRef(appendix),
                ],
            )
        };
    vm.invoke_static(
        call_stack,
        natives,
        "linkCallSite",
        link_desc,
        Vec::new(),
        link_args,
    )?;

    match appendix
        .get_element(0)
        .map_err(MethodCallError::InternalError)?
    {
        Value::ObjectRef(call_site) => Ok(call_site),
        _ => Err(MethodCallError::InternalError(VmError::ExecuteCodeError(
            "linkCallSite produced no call site".to_string(),
        ))),
    }
}

/// 引导方法句柄本身通过MethodHandleNatives.linkMethodHandleConstant物化
fn link_method_handle_constant<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    caller: ClassRef<'a>,
    entry: &BootstrapMethodEntry,
) -> InvokeResult<'a, Value<'a>> {
    let natives = vm
        .symbols()
        .map_err(MethodCallError::InternalError)?
        .java_lang_invoke_method_handle_natives;
    let defc = vm.lookup_class_and_initialize(call_stack, &entry.class_name)?;
    let defc_mirror = vm.mirror_of(crate::loaded_class::JavaClass::Instance(defc))?;
    let caller_mirror = vm.mirror_of(crate::loaded_class::JavaClass::Instance(caller))?;
    let name = vm.intern_string(call_stack, &entry.method_name)?;
    let type_value = materialize_method_type(vm, call_stack, caller, &entry.method_descriptor)?;
    let result = vm.invoke_static(
        call_stack,
        natives,
        "linkMethodHandleConstant",
        LINK_MH_CONSTANT_DESC,
        Vec::new(),
        vec![
            Value::ObjectRef(caller_mirror),
            Value::Int(entry.kind.reference_kind()),
            Value::ObjectRef(defc_mirror),
            Value::ObjectRef(name),
            type_value,
        ],
    )?;
    result.ok_or(MethodCallError::InternalError(VmError::ExecuteCodeError(
        "linkMethodHandleConstant returned void".to_string(),
    )))
}

fn materialize_method_type<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    caller: ClassRef<'a>,
    descriptor: &str,
) -> InvokeResult<'a, Value<'a>> {
    let method_type_class = vm
        .symbols()
        .map_err(MethodCallError::InternalError)?
        .java_lang_invoke_method_type;
    let descriptor_string = vm.intern_string(call_stack, descriptor)?;
    let result = vm.invoke_static(
        call_stack,
        method_type_class,
        "fromMethodDescriptorString",
        "(Ljava/lang/String;Ljava/lang/ClassLoader;)Ljava/lang/invoke/MethodType;",
        Vec::new(),
        vec![Value::ObjectRef(descriptor_string), caller.loader],
    )?;
    result.ok_or(MethodCallError::InternalError(VmError::ExecuteCodeError(
        "fromMethodDescriptorString returned void".to_string(),
    )))
}

/// 静态引导参数逐类转换：类、方法类型、方法句柄、原始值装箱、字符串驻留
fn for_invoke_dynamic_call<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    caller: ClassRef<'a>,
    pool_index: u16,
) -> InvokeResult<'a, Value<'a>> {
    let entry = caller.constant_pool.get(pool_index)?.clone();
    match entry {
        RuntimeConstantPoolEntry::Integer(v) => {
            box_primitive(vm, call_stack, "java/lang/Integer", "(I)Ljava/lang/Integer;", Value::Int(v))
        }
        RuntimeConstantPoolEntry::Long(v) => {
            box_primitive(vm, call_stack, "java/lang/Long", "(J)Ljava/lang/Long;", Value::Long(v))
        }
        RuntimeConstantPoolEntry::Float(v) => {
            box_primitive(vm, call_stack, "java/lang/Float", "(F)Ljava/lang/Float;", Value::Float(v))
        }
        RuntimeConstantPoolEntry::Double(v) => box_primitive(
            vm,
            call_stack,
            "java/lang/Double",
            "(D)Ljava/lang/Double;",
            Value::Double(v),
        ),
        RuntimeConstantPoolEntry::StringReference(text) => {
            Ok(Value::ObjectRef(vm.intern_string(call_stack, &text)?))
        }
        RuntimeConstantPoolEntry::ClassReference(name) => {
            let java_class = vm.resolve_java_class(call_stack, &caller.loader, &name)?;
            Ok(Value::ObjectRef(vm.mirror_of(java_class)?))
        }
        RuntimeConstantPoolEntry::MethodType(descriptor) => {
            materialize_method_type(vm, call_stack, caller, &descriptor)
        }
        RuntimeConstantPoolEntry::MethodHandle(kind, class_name, member_name, member_descriptor) => {
            let handle_entry = BootstrapMethodEntry {
                kind,
                class_name,
                method_name: member_name,
                method_descriptor: member_descriptor,
                arguments: Vec::new(),
            };
            link_method_handle_constant(vm, call_stack, caller, &handle_entry)
        }
        _ => Err(MethodCallError::InternalError(VmError::NotImplemented)),
    }
}

fn box_primitive<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    box_class: &str,
    value_of_descriptor: &str,
    value: Value<'a>,
) -> InvokeResult<'a, Value<'a>> {
    let class_ref = vm.lookup_class_and_initialize(call_stack, box_class)?;
    let result = vm.invoke_static(
        call_stack,
        class_ref,
        "valueOf",
        value_of_descriptor,
        Vec::new(),
        vec![value],
    )?;
    result.ok_or(MethodCallError::InternalError(VmError::ExecuteCodeError(
        "valueOf returned void".to_string(),
    )))
}

/// 已链接句柄的后续分发：CallSite先取getTarget(空目标是NPE)，
/// 句柄放进预留的槽位0，然后虚调用invokeExact(desc)。
pub(crate) fn dynamic_call<'a>(
    vm: &mut VirtualMachine<'a>,
    call_stack: &mut CallStack<'a>,
    mut args: Vec<Value<'a>>,
    descriptor: &str,
    handle: ObjectReference<'a>,
) -> InvokeMethodResult<'a> {
    let call_site_class = vm
        .symbols()
        .map_err(MethodCallError::InternalError)?
        .java_lang_invoke_call_site;
    let mut target = handle;
    if call_site_class.is_assignable_from(handle.get_class()) {
        let result = vm.invoke_virtual(
            call_stack,
            "getTarget",
            "()Ljava/lang/invoke/MethodHandle;",
            Vec::new(),
            vec![Value::ObjectRef(handle)],
        )?;
        match result {
            Some(Value::ObjectRef(resolved)) => target = resolved,
            _ => return Err(vm.raise_npe(call_stack)),
        }
    }
    //槽位0预留过就复用，否则在前面插一个
    if matches!(args.first(), Some(Value::Uninitialized)) {
        args[0] = Value::ObjectRef(target);
    } else {
        args.insert(0, Value::ObjectRef(target));
    }
    vm.invoke_virtual(call_stack, "invokeExact", descriptor, Vec::new(), args)
}
