use crate::jvm_error::{VmError, VmExecResult};
use parking_lot::{Condvar, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

#[derive(Default)]
struct MonitorState {
    owner: Option<ThreadId>,
    recursion: usize,
}

/// 每个堆对象一把可重入锁加一个条件变量。
/// monitorenter/monitorexit按线程id做重入计数；
/// wait必须持有锁，原子地释放并阻塞在条件变量上，被唤醒后重新获取。
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-2.html#jvms-2.11.10
pub struct Monitor {
    state: Mutex<MonitorState>,
    entry: Condvar,
    signal: Condvar,
}

impl Default for Monitor {
    fn default() -> Self {
        Monitor::new()
    }
}

impl Monitor {
    pub fn new() -> Monitor {
        Monitor {
            state: Mutex::new(MonitorState::default()),
            entry: Condvar::new(),
            signal: Condvar::new(),
        }
    }

    pub fn enter(&self) {
        let me = std::thread::current().id();
        let mut state = self.state.lock();
        if state.owner == Some(me) {
            state.recursion += 1;
            return;
        }
        while state.owner.is_some() {
            self.entry.wait(&mut state);
        }
        state.owner = Some(me);
        state.recursion = 1;
    }

    pub fn exit(&self) -> VmExecResult<()> {
        let me = std::thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(VmError::ExecuteCodeError(
                "monitor not owned by current thread".to_string(),
            ));
        }
        state.recursion -= 1;
        if state.recursion == 0 {
            state.owner = None;
            self.entry.notify_one();
        }
        Ok(())
    }

    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(std::thread::current().id())
    }

    /// timeout_millis为0表示无限等待。虚假唤醒是允许的，调用方需要容忍。
    pub fn wait(&self, timeout_millis: i64, nanos: i32) -> VmExecResult<()> {
        let me = std::thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(VmError::ExecuteCodeError(
                "wait without owning the monitor".to_string(),
            ));
        }
        //释放持有，放其他线程进入
        let recursion = state.recursion;
        state.owner = None;
        state.recursion = 0;
        self.entry.notify_one();

        if timeout_millis == 0 && nanos == 0 {
            self.signal.wait(&mut state);
        } else {
            let timeout =
                Duration::from_millis(timeout_millis as u64) + Duration::from_nanos(nanos as u64);
            self.signal.wait_for(&mut state, timeout);
        }

        //醒来后重新竞争锁
        while state.owner.is_some() {
            self.entry.wait(&mut state);
        }
        state.owner = Some(me);
        state.recursion = recursion;
        Ok(())
    }

    pub fn notify_one(&self) -> VmExecResult<()> {
        if !self.is_owned_by_current_thread() {
            return Err(VmError::ExecuteCodeError(
                "notify without owning the monitor".to_string(),
            ));
        }
        self.signal.notify_one();
        Ok(())
    }

    pub fn notify_all(&self) -> VmExecResult<()> {
        if !self.is_owned_by_current_thread() {
            return Err(VmError::ExecuteCodeError(
                "notifyAll without owning the monitor".to_string(),
            ));
        }
        self.signal.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::monitor::Monitor;

    #[test]
    fn monitor_is_reentrant() {
        let monitor = Monitor::new();
        monitor.enter();
        monitor.enter();
        assert!(monitor.is_owned_by_current_thread());
        monitor.exit().unwrap();
        assert!(monitor.is_owned_by_current_thread());
        monitor.exit().unwrap();
        assert!(!monitor.is_owned_by_current_thread());
    }

    #[test]
    fn exit_without_enter_fails() {
        let monitor = Monitor::new();
        assert!(monitor.exit().is_err());
        assert!(monitor.notify_one().is_err());
    }

    #[test]
    fn timed_wait_returns_and_reacquires() {
        let monitor = Monitor::new();
        monitor.enter();
        monitor.wait(5, 0).unwrap();
        //wait返回后必须重新持有
        assert!(monitor.is_owned_by_current_thread());
        monitor.exit().unwrap();
    }

    #[test]
    fn wait_requires_ownership() {
        let monitor = Monitor::new();
        assert!(monitor.wait(1, 0).is_err());
    }

    #[test]
    fn contended_enter_blocks_until_release() {
        use std::sync::Arc;
        let monitor = Arc::new(Monitor::new());
        monitor.enter();
        let other = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || {
                monitor.enter();
                monitor.exit().unwrap();
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(10));
        monitor.exit().unwrap();
        other.join().unwrap();
    }
}
