use crate::jvm_error::{VmError, VmExecResult};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use zip::result::ZipError;
use zip::ZipArchive;

/// 引导类路径。按添加顺序逐个查找。
#[derive(Default)]
pub struct ClassFinder {
    pub class_paths: Vec<Box<dyn ClassPath>>,
}

impl ClassFinder {
    pub fn new() -> ClassFinder {
        ClassFinder::default()
    }

    //查找class,如果查找失败则返回ClassNotFoundException
    pub fn find_class(&self, name: &str) -> VmExecResult<Vec<u8>> {
        for class_path in &self.class_paths {
            if let Some(v) = class_path.find_class(name)? {
                return Ok(v);
            }
        }
        Err(VmError::ClassNotFoundException(String::from(name)))
    }
}

/// 定义一个能够查找类字节的结构
pub trait ClassPath {
    //根据名字查找class,可能查的到，也可能找不到
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>>;
}

//通过本地路径进行加载，支持绝对路径和相对路径
pub struct FileSystemClassPath {
    class_path_root: PathBuf,
}

impl FileSystemClassPath {
    pub fn new(path: &str) -> VmExecResult<FileSystemClassPath> {
        let class_path_root = if let Ok(abs_path) = fs::canonicalize(PathBuf::from(path)) {
            abs_path
        } else {
            return Err(VmError::ClassPathNotExist(path.to_string()));
        };

        if !class_path_root.exists() || !class_path_root.is_dir() {
            Err(VmError::ClassPathNotExist(
                class_path_root.to_string_lossy().to_string(),
            ))
        } else {
            Ok(Self { class_path_root })
        }
    }
}

impl ClassPath for FileSystemClassPath {
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>> {
        let mut full_path = self.class_path_root.clone();
        for part in class_name.split('/') {
            full_path.push(part);
        }
        full_path.set_extension("class");
        if full_path.exists() {
            fs::read(full_path)
                .map(Some)
                .map_err(|e| VmError::ReadClassBytesError(e.to_string()))
        } else {
            Ok(None)
        }
    }
}

//支持从jar包内加载，jar包本质上是个zip文件
pub struct JarFileClassPath {
    jar_file_path: String,
    zip: RefCell<ZipArchive<BufReader<File>>>,
}

impl Debug for JarFileClassPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "JarFileClassPath => {}", &self.jar_file_path)
    }
}

impl JarFileClassPath {
    pub fn new(path: &str) -> VmExecResult<JarFileClassPath> {
        let jar_file_path = if let Ok(abs_path) = fs::canonicalize(PathBuf::from(path)) {
            abs_path
        } else {
            return Err(VmError::JarFileNotExist(path.to_string()));
        };

        let file = File::open(&jar_file_path)
            .map_err(|e| VmError::ReadClassBytesError(e.to_string()))?;
        let buf_reader = BufReader::new(file);
        let zip =
            ZipArchive::new(buf_reader).map_err(|e| VmError::ReadClassBytesError(e.to_string()))?;
        Ok(Self {
            jar_file_path: jar_file_path.to_string_lossy().to_string(),
            zip: RefCell::new(zip),
        })
    }
}

impl ClassPath for JarFileClassPath {
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>> {
        let class_file_name = class_name.to_string() + ".class";
        match self.zip.borrow_mut().by_name(&class_file_name) {
            Ok(mut zip_file) => {
                let mut buffer: Vec<u8> = Vec::with_capacity(zip_file.size() as usize);
                zip_file
                    .read_to_end(&mut buffer)
                    .map_err(|e| VmError::ReadClassBytesError(e.to_string()))?;
                Ok(Some(buffer))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(VmError::ReadClassBytesError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::class_finder::{ClassFinder, ClassPath, FileSystemClassPath};
    use std::fs;

    #[test]
    fn finds_class_files_on_disk() {
        let dir = std::env::temp_dir().join("sandbox_jvm_classpath_test");
        fs::create_dir_all(dir.join("pkg")).unwrap();
        fs::write(dir.join("pkg").join("Probe.class"), [0xCA, 0xFE]).unwrap();

        let class_path = FileSystemClassPath::new(dir.to_str().unwrap()).unwrap();
        let found = class_path.find_class("pkg/Probe").unwrap();
        assert_eq!(Some(vec![0xCA, 0xFE]), found);
        assert_eq!(None, class_path.find_class("pkg/Missing").unwrap());

        let mut finder = ClassFinder::new();
        finder.class_paths.push(Box::new(class_path));
        assert!(finder.find_class("pkg/Probe").is_ok());
        assert!(finder.find_class("pkg/Missing").is_err());

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_class_path_is_an_error() {
        assert!(FileSystemClassPath::new("./definitely-not-a-real-dir").is_err());
    }
}
