/// IO 抽象层模块
///
/// 该模块提供设置文件读写的抽象接口，遵循依赖倒置原则。
/// 提取引擎与写回引擎只依赖这里的 trait，便于在测试中替换为内存实现。
///
/// # 架构设计
///
/// - **traits**: 定义 SettingsFileReader/SettingsFileWriter trait 接口
/// - **fs_io**: 基于 std::fs 的默认实现
/// - **memory_io**: 内存实现（测试与预览用）
///
/// # 使用示例
///
/// ```rust,ignore
/// use game_settings::io::{FsReader, SettingsFileReader};
///
/// let reader = FsReader;
/// let bytes = reader.read(Path::new("Skyrim.ini"))?;
/// ```
pub mod traits;
pub mod fs_io;
pub mod memory_io;

// === 导出 trait 定义 ===
pub use traits::{SettingsFileReader, SettingsFileWriter};

// === 导出默认实现 ===
pub use fs_io::{FsReader, FsWriter};
pub use memory_io::MemoryFs;
