//! 日志初始化（命令行工具）
//!
//! 日志写入数据目录下的 `game-settings/logs/game_settings.log`，每天滚动一次。
//! 级别由 `GAME_SETTINGS_LOG` 环境变量控制，例如：
//!
//! ```bash
//! GAME_SETTINGS_LOG=debug game_settings options
//! ```

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::utils::Result;

pub const LOG_ENV: &str = "GAME_SETTINGS_LOG";
const LOG_FILE: &str = "game_settings.log";

/// 初始化日志
pub fn init() -> Result<PathBuf> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE);

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("game_settings=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string())),
        )
        .init();

    tracing::info!("game_settings {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log directory: {}", log_dir.display());

    Ok(log_dir)
}

/// 日志目录
pub fn log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("game-settings").join("logs")
}
