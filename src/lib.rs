pub mod commit;
pub mod config;
pub mod encoding;
pub mod extract;
pub mod formats;
pub mod io;
pub mod messages;
pub mod mod_organizer;
pub mod options;
pub mod paths;
pub mod schema;
pub mod session;
pub mod utils;

#[cfg(feature = "cli")]
pub mod logging;

// 重新导出主要结构
pub use commit::{commit, CommitFailure, CommitReport};
pub use config::{LauncherConfig, ModOrganizerConfig};
pub use encoding::FileEncoding;
pub use extract::{extract, extract_where, Extraction, ExtractionError, ExtractionErrorKind, LoadedFile};
pub use formats::{FileView, ParsedFile, SettingsDocument};
pub use messages::{MessageKind, MessageLog, MessageSink, UserMessage};
pub use options::{ChangedOptions, FileOptions, GameOption, OptionMap, StepDirection};
pub use paths::PathVariables;
pub use schema::{GameSettingsConfig, GameSettingsFile, OptionType, Parameter, ParameterItem};
pub use session::{SessionState, SettingsSession};
pub use utils::{Result, SettingsError};

// 常量定义
pub const SETTINGS_FILE: &str = "settings.json";
pub const CONFIG_FILE: &str = "config.json";
