/// IO 抽象层 - trait 定义
///
/// 该模块定义了设置文件读写的抽象接口，支持依赖注入和测试 mock。
/// 读写的都是原始字节，编码与解析由格式适配器负责。

use std::path::Path;
use crate::utils::Result;

/// 设置文件读取 trait
///
/// # 职责
/// - 从存储中读取设置文件的原始字节
/// - 列出目录下的子目录（Mod Organizer 配置文件夹）
/// - 不负责解析，仅负责 IO
///
/// 实现需要是 `Sync`，因为批量读取会在多个线程上同时调用。
pub trait SettingsFileReader: Sync {
    /// 读取文件的原始数据
    ///
    /// # 参数
    /// * `path` - 文件的绝对路径
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// 列出目录下所有子目录的名称（按名称排序）
    fn list_directories(&self, path: &Path) -> Result<Vec<String>>;
}

/// 设置文件写入 trait
///
/// # 职责
/// - 将序列化后的数据写入存储
/// - 不负责序列化，仅负责 IO
pub trait SettingsFileWriter: Sync {
    /// 写入文件数据
    ///
    /// # 参数
    /// * `path` - 目标文件路径
    /// * `bytes` - 要写入的原始数据
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}
