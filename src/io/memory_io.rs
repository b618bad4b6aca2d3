/// 内存 IO 实现
///
/// 同时实现读取与写入 trait，文件内容保存在内存中。
/// 可以为指定路径注入写入失败，用于验证部分写入的行为。
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{SettingsFileReader, SettingsFileWriter};
use crate::utils::{Result, SettingsError};

#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    failing_writes: Mutex<HashSet<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入一个文件（覆盖已有内容）
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.lock_files().insert(path.into(), bytes.into());
    }

    /// 读取当前内容
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock_files().get(path).cloned()
    }

    /// 以 UTF-8 读取当前内容（测试辅助）
    pub fn get_string(&self, path: &Path) -> Option<String> {
        self.get(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// 让之后对 `path` 的写入失败
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        self.failing_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into());
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsFileReader for MemoryFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.get(path).ok_or_else(|| SettingsError::FileNotFound { path: path.to_path_buf() })
    }

    fn list_directories(&self, path: &Path) -> Result<Vec<String>> {
        let files = self.lock_files();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter(|rest| rest.components().count() > 1)
            .filter_map(|rest| rest.components().next())
            .map(|first| first.as_os_str().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.dedup();

        if names.is_empty() && !files.keys().any(|file| file.starts_with(path)) {
            return Err(SettingsError::FileNotFound { path: path.to_path_buf() });
        }
        Ok(names)
    }
}

impl SettingsFileWriter for MemoryFs {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let failing = self
            .failing_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(path);
        if failing {
            return Err(SettingsError::read_write(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "write rejected"),
            ));
        }

        self.lock_files().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/game/a.ini"), b"x=1").unwrap();

        assert_eq!(fs.read(Path::new("/game/a.ini")).unwrap(), b"x=1");
        assert!(fs.read(Path::new("/game/b.ini")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_memory_list_directories() {
        let fs = MemoryFs::new();
        fs.insert("/mo/profiles/Default/Skyrim.ini", "");
        fs.insert("/mo/profiles/Modded/Skyrim.ini", "");
        fs.insert("/mo/profiles/Modded/SkyrimPrefs.ini", "");
        fs.insert("/mo/profiles/loose.txt", "");

        let names = fs.list_directories(Path::new("/mo/profiles")).unwrap();
        assert_eq!(names, vec!["Default".to_string(), "Modded".to_string()]);
        assert!(fs.list_directories(Path::new("/nowhere")).is_err());
    }

    #[test]
    fn test_injected_write_failure() {
        let fs = MemoryFs::new();
        fs.fail_writes_to("/game/locked.ini");

        assert!(fs.write(Path::new("/game/locked.ini"), b"").is_err());
        assert!(fs.write(Path::new("/game/open.ini"), b"").is_ok());
    }
}
