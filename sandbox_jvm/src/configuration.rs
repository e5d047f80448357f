use crate::class_finder::ClassPath;
use crate::file_manager::{FileManager, HostFileManager};

/// 嵌入方传入的启动配置。退出码和日志输出归嵌入方管。
pub struct VmConfiguration {
    pub heap_size: usize,
    pub max_call_depth: usize,
    //引导类路径，按顺序查找
    pub class_paths: Vec<Box<dyn ClassPath>>,
    pub file_manager: Box<dyn FileManager>,
}

impl Default for VmConfiguration {
    fn default() -> VmConfiguration {
        VmConfiguration {
            heap_size: 16 * 1024 * 1024,
            max_call_depth: 2048,
            class_paths: Vec::new(),
            file_manager: Box::new(HostFileManager),
        }
    }
}

impl VmConfiguration {
    pub fn with_class_path(mut self, class_path: Box<dyn ClassPath>) -> VmConfiguration {
        self.class_paths.push(class_path);
        self
    }
}
