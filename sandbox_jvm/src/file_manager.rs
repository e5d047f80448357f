use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

//java.io.FileSystem的属性位编码，按位或
pub const ATTR_EXISTS: i32 = 0x01;
pub const ATTR_REGULAR: i32 = 0x02;
pub const ATTR_DIRECTORY: i32 = 0x04;

pub const ACCESS_READ: i32 = 0x04;
pub const ACCESS_WRITE: i32 = 0x02;
pub const ACCESS_EXECUTE: i32 = 0x01;

pub const SPACE_TOTAL: i32 = 0;
pub const SPACE_FREE: i32 = 1;
pub const SPACE_USABLE: i32 = 2;

/// 文件系统桥。UnixFileSystem/WinNTFileSystem的native调用都打到这里，
/// 嵌入方可以换成虚拟文件系统实现来隔离被执行代码。
pub trait FileManager {
    fn canonicalize(&self, path: &str) -> io::Result<String>;
    fn list(&self, path: &str) -> io::Result<Vec<String>>;
    fn get_attributes(&self, path: &str) -> io::Result<i32>;
    fn rename(&self, from: &str, to: &str) -> io::Result<bool>;
    fn delete(&self, path: &str) -> io::Result<bool>;
    fn set_last_modified_time(&self, path: &str, millis: i64) -> io::Result<bool>;
    fn set_read_only(&self, path: &str) -> io::Result<bool>;
    fn create_file_exclusively(&self, path: &str) -> io::Result<bool>;
    fn set_permission(&self, path: &str, access: i32, enable: bool, owner_only: bool)
        -> io::Result<bool>;
    fn get_space(&self, path: &str, kind: i32) -> io::Result<i64>;
    fn check_access(&self, path: &str, access: i32) -> io::Result<bool>;
    fn get_last_modified_time(&self, path: &str) -> io::Result<i64>;
    fn get_length(&self, path: &str) -> io::Result<i64>;
}

/// 直通宿主文件系统的默认实现
#[derive(Default)]
pub struct HostFileManager;

impl FileManager for HostFileManager {
    fn canonicalize(&self, path: &str) -> io::Result<String> {
        let canonical = fs::canonicalize(PathBuf::from(path))?;
        Ok(canonical.to_string_lossy().to_string())
    }

    fn list(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    fn get_attributes(&self, path: &str) -> io::Result<i32> {
        match fs::metadata(path) {
            Ok(metadata) => {
                let mut attributes = ATTR_EXISTS;
                if metadata.is_file() {
                    attributes |= ATTR_REGULAR;
                }
                if metadata.is_dir() {
                    attributes |= ATTR_DIRECTORY;
                }
                Ok(attributes)
            }
            Err(_) => Ok(0),
        }
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<bool> {
        Ok(fs::rename(from, to).is_ok())
    }

    fn delete(&self, path: &str) -> io::Result<bool> {
        let target = Path::new(path);
        let removed = if target.is_dir() {
            fs::remove_dir(target).is_ok()
        } else {
            fs::remove_file(target).is_ok()
        };
        Ok(removed)
    }

    fn set_last_modified_time(&self, _path: &str, _millis: i64) -> io::Result<bool> {
        //std没有稳定的mtime写入口
        Ok(false)
    }

    fn set_read_only(&self, path: &str) -> io::Result<bool> {
        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_readonly(true);
        Ok(fs::set_permissions(path, permissions).is_ok())
    }

    fn create_file_exclusively(&self, path: &str) -> io::Result<bool> {
        match fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn set_permission(
        &self,
        path: &str,
        access: i32,
        enable: bool,
        _owner_only: bool,
    ) -> io::Result<bool> {
        if access == ACCESS_WRITE && !enable {
            return self.set_read_only(path);
        }
        Ok(false)
    }

    fn get_space(&self, _path: &str, _kind: i32) -> io::Result<i64> {
        Ok(0)
    }

    fn check_access(&self, path: &str, access: i32) -> io::Result<bool> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => return Ok(false),
        };
        if access == ACCESS_WRITE {
            return Ok(!metadata.permissions().readonly());
        }
        Ok(true)
    }

    fn get_last_modified_time(&self, path: &str) -> io::Result<i64> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(millis)
    }

    fn get_length(&self, path: &str) -> io::Result<i64> {
        Ok(fs::metadata(path).map(|m| m.len() as i64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::file_manager::{FileManager, HostFileManager, ATTR_DIRECTORY, ATTR_EXISTS, ATTR_REGULAR};
    use std::fs;

    #[test]
    fn attribute_bits_match_the_jdk_encoding() {
        let dir = std::env::temp_dir().join("sandbox_jvm_fm_test");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("probe.txt");
        fs::write(&file, b"x").unwrap();

        let manager = HostFileManager;
        let file_attributes = manager.get_attributes(file.to_str().unwrap()).unwrap();
        assert_eq!(ATTR_EXISTS | ATTR_REGULAR, file_attributes);
        let dir_attributes = manager.get_attributes(dir.to_str().unwrap()).unwrap();
        assert_eq!(ATTR_EXISTS | ATTR_DIRECTORY, dir_attributes);
        let missing = manager
            .get_attributes(dir.join("missing").to_str().unwrap())
            .unwrap();
        assert_eq!(0, missing);

        fs::remove_dir_all(dir).ok();
    }
}
