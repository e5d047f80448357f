use crate::reference_value::ObjectReference;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};

//JVMTI_THREAD_STATE_RUNNABLE
pub const THREAD_STATUS_RUNNABLE: i32 = 0x0004;

/// 宿主线程到VM线程的映射。一个宿主线程一个解释器，
/// 帧栈(CallStack)由解释器持有，这里只带线程元数据和镜像。
pub struct VmThread<'a> {
    pub name: String,
    pub priority: i32,
    pub daemon: bool,
    pub(crate) oop: OnceCell<ObjectReference<'a>>,
    interrupted: AtomicBool,
}

impl<'a> VmThread<'a> {
    pub fn new(name: &str) -> VmThread<'a> {
        VmThread {
            name: name.to_string(),
            priority: 5,
            daemon: false,
            oop: OnceCell::new(),
            interrupted: AtomicBool::new(false),
        }
    }

    /// 当前宿主线程对应的VM线程视图
    pub fn attach_current() -> VmThread<'a> {
        let current = std::thread::current();
        VmThread::new(current.name().unwrap_or("main"))
    }

    pub fn oop(&self) -> Option<ObjectReference<'a>> {
        self.oop.get().copied()
    }

    pub fn set_oop(&self, oop: ObjectReference<'a>) {
        self.oop.set(oop).ok();
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// 读取并清除中断位，wait/sleep用
    pub fn consume_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
