use crate::jvm_error::VmExecResult;
use crate::loaded_class::ClassRef;

/// 启动期一次性解析好的常用引导类句柄。
/// VM实例的一个不可变字段，之后只读(没有全局态)。
pub struct VmSymbols<'a> {
    pub java_lang_object: ClassRef<'a>,
    pub java_lang_class: ClassRef<'a>,
    pub java_lang_string: ClassRef<'a>,
    pub java_lang_class_loader: ClassRef<'a>,
    pub java_lang_thread: ClassRef<'a>,
    pub java_lang_thread_group: ClassRef<'a>,
    pub java_lang_system: ClassRef<'a>,
    pub java_lang_throwable: ClassRef<'a>,
    pub java_lang_error: ClassRef<'a>,
    pub java_lang_exception: ClassRef<'a>,
    pub java_lang_null_pointer_exception: ClassRef<'a>,
    pub java_lang_no_such_field_error: ClassRef<'a>,
    pub java_lang_no_such_method_error: ClassRef<'a>,
    pub java_lang_array_index_out_of_bounds_exception: ClassRef<'a>,
    pub java_lang_exception_in_initializer_error: ClassRef<'a>,
    pub java_lang_unsatisfied_link_error: ClassRef<'a>,
    pub java_lang_internal_error: ClassRef<'a>,
    pub java_lang_class_cast_exception: ClassRef<'a>,
    pub java_lang_invoke_method_handle_natives: ClassRef<'a>,
    pub java_lang_no_class_def_found_error: ClassRef<'a>,
    pub java_lang_class_not_found_exception: ClassRef<'a>,
    pub java_util_vector: ClassRef<'a>,
    pub java_lang_out_of_memory_error: ClassRef<'a>,
    pub java_lang_negative_array_size_exception: ClassRef<'a>,
    pub java_lang_illegal_argument_exception: ClassRef<'a>,
    pub java_lang_abstract_method_error: ClassRef<'a>,
    pub java_lang_bootstrap_method_error: ClassRef<'a>,
    pub java_lang_illegal_state_exception: ClassRef<'a>,
    pub java_lang_arithmetic_exception: ClassRef<'a>,
    pub java_lang_interrupted_exception: ClassRef<'a>,
    pub java_lang_invoke_method_type: ClassRef<'a>,
    pub java_lang_invoke_call_site: ClassRef<'a>,
}

impl<'a> VmSymbols<'a> {
    /// lookup是引导类查找。启动时调用一次。
    pub fn resolve(
        mut lookup: impl FnMut(&str) -> VmExecResult<ClassRef<'a>>,
    ) -> VmExecResult<VmSymbols<'a>> {
        Ok(VmSymbols {
            java_lang_object: lookup("java/lang/Object")?,
            java_lang_class: lookup("java/lang/Class")?,
            java_lang_string: lookup("java/lang/String")?,
            java_lang_class_loader: lookup("java/lang/ClassLoader")?,
            java_lang_thread: lookup("java/lang/Thread")?,
            java_lang_thread_group: lookup("java/lang/ThreadGroup")?,
            java_lang_system: lookup("java/lang/System")?,
            java_lang_throwable: lookup("java/lang/Throwable")?,
            java_lang_error: lookup("java/lang/Error")?,
            java_lang_exception: lookup("java/lang/Exception")?,
            java_lang_null_pointer_exception: lookup("java/lang/NullPointerException")?,
            java_lang_no_such_field_error: lookup("java/lang/NoSuchFieldError")?,
            java_lang_no_such_method_error: lookup("java/lang/NoSuchMethodError")?,
            java_lang_array_index_out_of_bounds_exception: lookup(
                "java/lang/ArrayIndexOutOfBoundsException",
            )?,
            java_lang_exception_in_initializer_error: lookup(
                "java/lang/ExceptionInInitializerError",
            )?,
            java_lang_unsatisfied_link_error: lookup("java/lang/UnsatisfiedLinkError")?,
            java_lang_internal_error: lookup("java/lang/InternalError")?,
            java_lang_class_cast_exception: lookup("java/lang/ClassCastException")?,
            java_lang_invoke_method_handle_natives: lookup(
                "java/lang/invoke/MethodHandleNatives",
            )?,
            java_lang_no_class_def_found_error: lookup("java/lang/NoClassDefFoundError")?,
            java_lang_class_not_found_exception: lookup("java/lang/ClassNotFoundException")?,
            java_util_vector: lookup("java/util/Vector")?,
            java_lang_out_of_memory_error: lookup("java/lang/OutOfMemoryError")?,
            java_lang_negative_array_size_exception: lookup(
                "java/lang/NegativeArraySizeException",
            )?,
            java_lang_illegal_argument_exception: lookup("java/lang/IllegalArgumentException")?,
            java_lang_abstract_method_error: lookup("java/lang/AbstractMethodError")?,
            java_lang_bootstrap_method_error: lookup("java/lang/BootstrapMethodError")?,
            java_lang_illegal_state_exception: lookup("java/lang/IllegalStateException")?,
            java_lang_arithmetic_exception: lookup("java/lang/ArithmeticException")?,
            java_lang_interrupted_exception: lookup("java/lang/InterruptedException")?,
            java_lang_invoke_method_type: lookup("java/lang/invoke/MethodType")?,
            java_lang_invoke_call_site: lookup("java/lang/invoke/CallSite")?,
        })
    }

    /// 引导最小闭包需要的类名，嵌入方的boot class source必须都能提供
    pub const REQUIRED_CLASSES: &'static [&'static str] = &[
        "java/lang/Object",
        "java/lang/Class",
        "java/lang/String",
        "java/lang/ClassLoader",
        "java/lang/Thread",
        "java/lang/ThreadGroup",
        "java/lang/System",
        "java/lang/Throwable",
        "java/lang/Error",
        "java/lang/Exception",
        "java/lang/NullPointerException",
        "java/lang/NoSuchFieldError",
        "java/lang/NoSuchMethodError",
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/ExceptionInInitializerError",
        "java/lang/UnsatisfiedLinkError",
        "java/lang/InternalError",
        "java/lang/ClassCastException",
        "java/lang/invoke/MethodHandleNatives",
        "java/lang/NoClassDefFoundError",
        "java/lang/ClassNotFoundException",
        "java/util/Vector",
        "java/lang/OutOfMemoryError",
        "java/lang/NegativeArraySizeException",
        "java/lang/IllegalArgumentException",
        "java/lang/AbstractMethodError",
        "java/lang/BootstrapMethodError",
        "java/lang/IllegalStateException",
        "java/lang/ArithmeticException",
        "java/lang/InterruptedException",
        "java/lang/invoke/MethodType",
        "java/lang/invoke/CallSite",
    ];
}
