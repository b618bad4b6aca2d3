/// 设置文件 IO 实现
///
/// 提供基于文件系统的默认读写实现
use std::path::Path;
use super::traits::{SettingsFileReader, SettingsFileWriter};
use crate::utils::{Result, SettingsError};

/// 默认的设置文件读取器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct FsReader;

impl SettingsFileReader for FsReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| SettingsError::read_write(path, e))
    }

    fn list_directories(&self, path: &Path) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(path).map_err(|e| SettingsError::read_write(path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SettingsError::read_write(path, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| SettingsError::read_write(entry.path(), e))?
                .is_dir();
            if is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// 默认的设置文件写入器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct FsWriter;

impl SettingsFileWriter for FsWriter {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        // 确保父目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::read_write(parent, e))?;
        }

        std::fs::write(path, bytes).map_err(|e| SettingsError::read_write(path, e))
    }
}
