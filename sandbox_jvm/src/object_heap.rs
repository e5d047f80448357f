use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{PrimitiveKind, Value};
use crate::loaded_class::{ArrayClassRef, ClassRef};
use crate::memory_chunk::MemoryChunk;
use crate::monitor::Monitor;
use crate::reference_value::{
    ArrayReference, ObjectReference, ALLOC_HEADER_SIZE, ARRAY_HEADER_SIZE, OBJECT_HEADER_SIZE,
};
use std::marker::PhantomData;
use typed_arena::Arena;

/// 内存管理器。对象/静态字段区都是平坦的字节区域，
/// 读写通过布局表算出的字节偏移进行。每个对象在分配时配一把monitor。
pub struct ObjectHeap<'a> {
    memory: MemoryChunk,
    monitors: Arena<Monitor>,
    _marker: PhantomData<&'a ObjectReference<'a>>,
}

impl<'a> ObjectHeap<'a> {
    pub(crate) fn new(size: usize) -> ObjectHeap<'a> {
        ObjectHeap {
            memory: MemoryChunk::new(size),
            monitors: Arena::new(),
            _marker: PhantomData,
        }
    }

    fn new_monitor(&self) -> *const Monitor {
        self.monitors.alloc(Monitor::new()) as *const Monitor
    }

    /// 按类的实例布局分配清零的对象
    pub fn allocate_object(&mut self, class: ClassRef<'a>) -> VmExecResult<ObjectReference<'a>> {
        let data_size = class.virtual_layout.size();
        let total = ALLOC_HEADER_SIZE + OBJECT_HEADER_SIZE + data_size;
        let monitor = self.new_monitor();
        let (ptr, size) = self.memory.alloc(total).ok_or(VmError::OutOfMemory)?;
        Ok(ObjectReference::new_object(class, monitor, ptr, size))
    }

    /// 分配镜像对象(java.lang.Class实例)，数据区后面跟着目标类的静态字段区。
    /// 返回(镜像, static base偏移)。
    pub fn allocate_mirror(
        &mut self,
        class_class: ClassRef<'a>,
        statics_size: usize,
    ) -> VmExecResult<(ObjectReference<'a>, usize)> {
        let static_base = class_class.virtual_layout.size();
        let total = ALLOC_HEADER_SIZE + OBJECT_HEADER_SIZE + static_base + statics_size;
        let monitor = self.new_monitor();
        let (ptr, size) = self.memory.alloc(total).ok_or(VmError::OutOfMemory)?;
        Ok((
            ObjectReference::new_object(class_class, monitor, ptr, size),
            static_base,
        ))
    }

    /// length * index_scale字节的数组，头里带长度
    pub fn allocate_array(
        &mut self,
        class: ArrayClassRef<'a>,
        length: usize,
    ) -> VmExecResult<ArrayReference<'a>> {
        let data_size = length * class.index_scale();
        let total = ALLOC_HEADER_SIZE + ARRAY_HEADER_SIZE + data_size;
        let monitor = self.new_monitor();
        let (ptr, size) = self.memory.alloc(total).ok_or(VmError::OutOfMemory)?;
        Ok(ArrayReference::new_array(class, length, monitor, ptr, size))
    }

    pub fn array_index_scale(kind: PrimitiveKind) -> usize {
        kind.index_scale()
    }

    /// 对象数据区在分配区内的起始偏移
    pub fn value_base_offset() -> usize {
        ALLOC_HEADER_SIZE + OBJECT_HEADER_SIZE
    }

    pub fn null_value() -> Value<'static> {
        Value::Null
    }

    pub fn used_bytes(&self) -> usize {
        self.memory.used()
    }
}
