//! 游戏设置会话
//!
//! 启动时构造一次，持有 schema、路径变量、当前 profile、选项表、已解析的文件和消息出口。
//! 所有需要这些状态的操作都通过它进行。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::commit::{commit, CommitReport};
use crate::config::LauncherConfig;
use crate::extract::{extract, extract_where, ExtractionError, ExtractionErrorKind, LoadedFile};
use crate::io::{FsReader, FsWriter, SettingsFileReader, SettingsFileWriter};
use crate::messages::{MessageSink, UserMessage};
use crate::mod_organizer;
use crate::options::{ChangedOptions, FileOptions, OptionMap, StepDirection};
use crate::paths::{is_profile_path, PathVariables};
use crate::schema::{self, GameSettingsConfig, Parameter};
use crate::utils::{Result, SettingsError};

pub const MSG_NO_SETTINGS: &str = "No game settings available. Check settings.json and the game files.";
pub const MSG_PARTIAL: &str = "Some game settings are unavailable. See the log for details.";
pub const MSG_SAVED: &str = "Game settings saved.";

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ProfileSwitching,
}

pub struct SettingsSession {
    launcher: LauncherConfig,
    variables: PathVariables,
    reader: Arc<dyn SettingsFileReader + Send>,
    writer: Arc<dyn SettingsFileWriter + Send>,
    sink: Arc<dyn MessageSink>,

    /// `None` 表示 settings.json 无法使用，设置功能在本次会话中不可用
    schema: Option<GameSettingsConfig>,
    profile: String,
    profiles: Vec<String>,
    options: OptionMap,
    documents: BTreeMap<String, LoadedFile>,
    errors: Vec<ExtractionError>,
    state: SessionState,
    loaded: bool,
}

impl SettingsSession {
    pub fn new(
        launcher: LauncherConfig,
        variables: PathVariables,
        reader: Arc<dyn SettingsFileReader + Send>,
        writer: Arc<dyn SettingsFileWriter + Send>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        SettingsSession {
            launcher,
            variables,
            reader,
            writer,
            sink,
            schema: None,
            profile: String::new(),
            profiles: Vec::new(),
            options: OptionMap::new(),
            documents: BTreeMap::new(),
            errors: Vec::new(),
            state: SessionState::Idle,
            loaded: false,
        }
    }

    /// 使用真实文件系统的会话
    pub fn with_fs(launcher: LauncherConfig, variables: PathVariables, sink: Arc<dyn MessageSink>) -> Self {
        Self::new(launcher, variables, Arc::new(FsReader), Arc::new(FsWriter), sink)
    }

    pub fn launcher(&self) -> &LauncherConfig {
        &self.launcher
    }

    pub fn variables(&self) -> &PathVariables {
        &self.variables
    }

    pub fn schema(&self) -> Option<&GameSettingsConfig> {
        self.schema.as_ref()
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    /// 最近一次提取留下的错误
    pub fn errors(&self) -> &[ExtractionError] {
        &self.errors
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn active_profile(&self) -> Option<&str> {
        Some(self.profile.as_str()).filter(|p| !p.is_empty())
    }

    /// 读取 settings.json 并提取所有选项
    ///
    /// 只有 settings.json 无法读取或解析时返回错误，此时设置功能不可用；
    /// 其余问题都记录下来并以一条警告提示用户。
    pub fn load(&mut self, settings_path: &Path) -> Result<()> {
        self.loaded = false;

        let config = match self.read_schema(settings_path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load {}: {}", settings_path.display(), e);
                self.schema = None;
                self.sink.push(UserMessage::error(format!("Game settings are unavailable: {}", e)));
                return Err(e);
            }
        };

        let validated = schema::validate(&config);
        let schema_clean = validated.is_clean();

        if self.launcher.mod_organizer.is_used {
            self.load_profile();
        }

        let extraction = extract(&validated.config, self.active_profile(), &self.variables, self.reader.as_ref());
        self.options = extraction.options;
        self.documents = extraction.documents;
        self.errors = extraction.errors;
        self.schema = Some(validated.config);
        self.loaded = true;

        if self.options.is_empty() {
            self.sink.push(UserMessage::error(MSG_NO_SETTINGS));
        } else if !schema_clean || !self.errors.is_empty() {
            self.sink.push(UserMessage::warning(MSG_PARTIAL));
        }

        info!("Game settings loaded: {} options", self.options.len());
        Ok(())
    }

    fn read_schema(&self, settings_path: &Path) -> Result<GameSettingsConfig> {
        let bytes = self.reader.read(settings_path)?;
        let json = String::from_utf8(bytes).map_err(|e| SettingsError::Parse {
            path: settings_path.to_path_buf(),
            message: e.to_string(),
        })?;
        GameSettingsConfig::from_json(&json)
    }

    /// 读取 profile 列表和当前 profile，失败时清空 profile 并提示
    fn load_profile(&mut self) {
        let mo = &self.launcher.mod_organizer;
        let result = mod_organizer::list_profiles(&self.variables, self.reader.as_ref()).and_then(|profiles| {
            let current = mod_organizer::read_current_profile(mo, &self.variables, self.reader.as_ref())?;
            Ok((profiles, current))
        });

        match result {
            Ok((profiles, current)) => {
                info!("Mod Organizer profile: {}", current);
                self.profiles = profiles;
                self.profile = current;
            }
            Err(e) => {
                warn!("Can't get current Mod Organizer profile: {}", e);
                self.profiles.clear();
                self.profile.clear();
                self.sink
                    .push(UserMessage::warning(format!("Can't get current Mod Organizer profile: {}", e)));
            }
        }
    }

    fn require_schema(&self) -> Result<&GameSettingsConfig> {
        self.schema
            .as_ref()
            .ok_or_else(|| SettingsError::application("game settings are not loaded"))
    }

    fn find_parameter(&self, id: &str) -> Result<&Parameter> {
        self.require_schema()?
            .game_settings_options
            .iter()
            .find(|parameter| parameter.id == id)
            .ok_or_else(|| SettingsError::application(format!("unknown parameter \"{}\"", id)))
    }

    /// 当前分组下的参数（只包含成功提取出选项的参数）
    pub fn parameters_for_group(&self, group: Option<&str>) -> Vec<&Parameter> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        schema::parameters_for_group(&schema.game_settings_options, &schema.game_settings_groups, group)
            .into_iter()
            .filter(|parameter| {
                parameter
                    .items
                    .iter()
                    .all(|item| self.options.get(&parameter.file, &item.option_name()).is_some())
            })
            .collect()
    }

    /// 修改单个选项，按声明的区间限制数值
    pub fn set_option(&mut self, file: &str, name: &str, value: &str) -> Result<()> {
        let range = self.require_schema()?.parameters_for_file(file).find_map(|parameter| {
            parameter
                .items
                .iter()
                .find(|item| item.option_name() == name)
                .map(|item| parameter.range_for(item))
        });

        self.options = self.options.set_option_value(file, name, value, range.flatten())?;
        Ok(())
    }

    /// 按参数修改（GROUP / COMBINED 会分发到多个条目）
    pub fn set_parameter(&mut self, parameter_id: &str, target: Option<&str>, value: &str) -> Result<()> {
        let next = self.options.set_parameter_value(self.find_parameter(parameter_id)?, target, value)?;
        self.options = next;
        Ok(())
    }

    /// range 控件的 +/- 按钮
    pub fn step_option(&mut self, parameter_id: &str, target: Option<&str>, direction: StepDirection) -> Result<()> {
        let next = self.options.step_option_value(self.find_parameter(parameter_id)?, target, direction)?;
        self.options = next;
        Ok(())
    }

    pub fn changed_options(&self) -> ChangedOptions {
        self.options.changed_options()
    }

    /// 放弃所有未保存的修改
    pub fn reset(&mut self) {
        self.options = self.options.reset_to_defaults();
    }

    /// 写回所有修改
    ///
    /// 成功写入的文件立即成为新的基准，失败的文件保留修改，可以再次保存。
    pub fn save(&mut self) -> Result<CommitReport> {
        self.require_schema()?;

        let changes = self.options.changed_options();
        if changes.is_empty() {
            info!("No changed game settings to save");
            return Ok(CommitReport::default());
        }

        let report = commit(&changes, &mut self.documents, self.writer.as_ref());
        self.options = self.options.commit_defaults_for(&report.written);

        if report.is_success() {
            self.sink.push(UserMessage::success(MSG_SAVED));
        } else {
            let failed: Vec<String> = report
                .failures
                .iter()
                .map(|failure| match &failure.path {
                    Some(path) => path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| failure.file.clone()),
                    None => failure.file.clone(),
                })
                .collect();
            self.sink.push(UserMessage::error(format!(
                "Failed to save game settings to: {}. See the log for details.",
                failed.join(", ")
            )));
        }

        Ok(report)
    }

    /// 切换 Mod Organizer profile
    ///
    /// 写入 ModOrganizer.ini 后只重新读取 profile 目录下的文件，其余选项保持不变。
    /// 失败时 profile 清空、profile 目录下的选项被移除，并给出警告；
    /// 已经写入 ModOrganizer.ini 的修改不会回滚。
    pub fn switch_profile(&mut self, profile: &str) -> Result<()> {
        let schema = self.require_schema()?.clone();
        if !self.launcher.mod_organizer.is_used {
            return Err(SettingsError::application("Mod Organizer is not used"));
        }

        self.state = SessionState::ProfileSwitching;
        self.loaded = false;

        let result = mod_organizer::write_current_profile(
            &self.launcher.mod_organizer,
            &self.variables,
            self.reader.as_ref(),
            self.writer.as_ref(),
            profile,
        )
        .and_then(|()| {
            let extraction = extract_where(&schema, Some(profile), &self.variables, self.reader.as_ref(), |file| {
                is_profile_path(&file.path)
            });
            // profile 文件读不出来说明 profile 本身有问题
            match extraction.errors.iter().find(|e| e.kind == ExtractionErrorKind::FileLoad) {
                Some(e) => Err(SettingsError::application(e.to_string())),
                None => Ok(extraction),
            }
        });

        let profile_files: Vec<&str> = schema
            .game_settings_files
            .iter()
            .filter(|file| is_profile_path(&file.path))
            .map(|file| file.name.as_str())
            .collect();

        // profile 目录下的文件整体替换
        let mut options = self.options.clone();
        for file in &profile_files {
            options = options.replace_file(file, FileOptions::new());
            self.documents.remove(*file);
        }
        self.errors.retain(|e| !profile_files.contains(&e.file.as_str()));

        let outcome = match result {
            Ok(extraction) => {
                for (file, file_options) in extraction.options.files() {
                    options = options.replace_file(file, file_options.clone());
                }
                let has_errors = extraction.has_errors();
                self.documents.extend(extraction.documents);
                if has_errors {
                    self.sink.push(UserMessage::warning(MSG_PARTIAL));
                }
                self.errors.extend(extraction.errors);
                self.profile = profile.to_string();
                info!("Switched Mod Organizer profile to {}", profile);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to change current Mod Organizer profile: {}", e);
                self.profile.clear();
                self.sink.push(UserMessage::warning(format!(
                    "Failed to change current Mod Organizer profile. Reason: {}",
                    e
                )));
                Err(e)
            }
        };

        self.options = options;
        self.state = SessionState::Idle;
        self.loaded = true;
        outcome
    }
}
