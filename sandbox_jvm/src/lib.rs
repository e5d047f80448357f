pub mod call_stack;
pub mod class_finder;
pub mod class_loader_data;
pub mod configuration;
pub mod dispatch;
pub mod field_layout;
pub mod file_manager;
pub mod insn;
pub mod invoke_dynamic;
pub mod java_exception;
pub mod jvm_error;
pub mod jvm_values;
pub mod loaded_class;
mod memory_chunk;
pub mod method_area;
pub mod monitor;
pub mod native_method_area;
pub mod object_heap;
pub mod operand_stack;
pub mod reference_value;
pub mod runtime_attribute_info;
pub mod runtime_constant_pool;
pub mod runtime_field_info;
pub mod runtime_method_info;
pub mod stack_frame;
pub mod stack_trace_element;
pub mod virtual_machine;
pub mod vm_helper;
pub mod vm_symbols;
pub mod vm_thread;
