//! 启动器配置（config.json）
//!
//! 只包含设置流水线需要的部分：游戏目录、文档目录、自定义路径变量和 Mod Organizer。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::paths::{self, PathVariables};
use crate::utils::{Result, SettingsError};

/// config.json 的顶层结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LauncherConfig {
    /// 游戏目录；相对路径以启动器所在目录为基准，不填即启动器所在目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_dir: Option<String>,
    /// 文档目录下游戏的文件夹（`%DOCS_GAME%`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_path: Option<String>,
    /// 自定义路径变量：`%NAME%` -> 游戏目录下的相对路径
    #[serde(default)]
    pub custom_paths: BTreeMap<String, String>,
    #[serde(default)]
    pub mod_organizer: ModOrganizerConfig,
}

/// Mod Organizer 相关配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModOrganizerConfig {
    #[serde(default)]
    pub is_used: bool,
    /// MO 的大版本：1 或 2，决定 profile 值的写法
    #[serde(default = "default_version")]
    pub version: u8,
    /// MO 目录（相对游戏目录）
    #[serde(default = "default_mo_path")]
    pub path: String,
    /// 以下三个路径留空时按 `path` 推导
    #[serde(default, rename = "pathToINI")]
    pub path_to_ini: String,
    #[serde(default)]
    pub path_to_profiles: String,
    #[serde(default)]
    pub path_to_mods: String,
    #[serde(default = "default_profile_section")]
    pub profile_section: String,
    #[serde(default = "default_profile_param")]
    pub profile_param: String,
    /// 从 profile 键值中提取 profile 名的正则，第 1 个捕获组为结果
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_param_value_reg_exp: Option<String>,
}

impl Default for ModOrganizerConfig {
    fn default() -> Self {
        Self {
            is_used: false,
            version: default_version(),
            path: default_mo_path(),
            path_to_ini: String::new(),
            path_to_profiles: String::new(),
            path_to_mods: String::new(),
            profile_section: default_profile_section(),
            profile_param: default_profile_param(),
            profile_param_value_reg_exp: None,
        }
    }
}

fn default_version() -> u8 {
    2
}

fn default_mo_path() -> String {
    "Mod Organizer".to_string()
}

fn default_profile_section() -> String {
    "General".to_string()
}

fn default_profile_param() -> String {
    "selected_profile".to_string()
}

impl ModOrganizerConfig {
    pub fn ini_path(&self) -> String {
        or_under(&self.path_to_ini, &self.path, "ModOrganizer.ini")
    }

    pub fn profiles_path(&self) -> String {
        or_under(&self.path_to_profiles, &self.path, "profiles")
    }

    pub fn mods_path(&self) -> String {
        or_under(&self.path_to_mods, &self.path, "mods")
    }

    /// 编译 profileParamValueRegExp
    pub fn profile_regex(&self) -> Result<Option<Regex>> {
        self.profile_param_value_reg_exp
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SettingsError::validation(format!("invalid profileParamValueRegExp \"{}\": {}", pattern, e))
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 && self.version != 2 {
            return Err(SettingsError::validation(format!(
                "unsupported Mod Organizer version {}, expected 1 or 2",
                self.version
            )));
        }
        if self.is_used && (self.profile_section.trim().is_empty() || self.profile_param.trim().is_empty()) {
            return Err(SettingsError::validation("Mod Organizer profileSection and profileParam must be set"));
        }
        self.profile_regex()?;
        Ok(())
    }
}

fn or_under(explicit: &str, base: &str, name: &str) -> String {
    if explicit.trim().is_empty() {
        format!("{}/{}", base.trim_end_matches(['/', '\\']), name)
    } else {
        explicit.to_string()
    }
}

/// 去掉配置中路径开头多余的 `%GAMEDIR%`，这些路径总是相对游戏目录
fn clear_path_variable(path: &str) -> &str {
    let trimmed = path.trim();
    let prefix = paths::GAME_DIR.len();
    let rest = match trimmed.get(..prefix) {
        Some(head) if head.eq_ignore_ascii_case(paths::GAME_DIR) => &trimmed[prefix..],
        _ => trimmed,
    };
    rest.trim_start_matches(['/', '\\'])
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in clear_path_variable(relative).split(['/', '\\']).filter(|s| !s.is_empty() && *s != ".") {
        path.push(segment);
    }
    path
}

impl LauncherConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LauncherConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 config.json
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| SettingsError::read_write(path, e))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        for name in self.custom_paths.keys() {
            if name.trim().trim_matches('%').is_empty() {
                return Err(SettingsError::validation("custom path with an empty name"));
            }
        }
        self.mod_organizer.validate()
    }

    /// 实际的游戏目录
    pub fn game_dir(&self, launcher_dir: &Path) -> PathBuf {
        match self.game_dir.as_deref().map(str::trim).filter(|dir| !dir.is_empty()) {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => join_relative(launcher_dir, dir),
            None => launcher_dir.to_path_buf(),
        }
    }

    /// 生成路径变量表
    ///
    /// # 参数
    /// * `launcher_dir` - 启动器所在目录
    /// * `documents_dir` - 用户文档目录，未知时不生成 `%DOCUMENTS%` 与 `%DOCS_GAME%`
    pub fn path_variables(&self, launcher_dir: &Path, documents_dir: Option<&Path>) -> PathVariables {
        let game_dir = self.game_dir(launcher_dir);
        let mut variables = PathVariables::new();

        variables.insert(paths::GAME_DIR, game_dir.clone());

        if let Some(documents) = documents_dir {
            variables.insert(paths::DOCUMENTS, documents);
            if let Some(docs_game) = self.documents_path.as_deref().filter(|p| !p.trim().is_empty()) {
                variables.insert(paths::DOCS_GAME, join_relative(documents, docs_game));
            }
        }

        let mo = &self.mod_organizer;
        if mo.is_used {
            variables.insert(paths::MO_DIR, join_relative(&game_dir, &mo.path));
            variables.insert(paths::MO_INI, join_relative(&game_dir, &mo.ini_path()));
            variables.insert(paths::MO_MODS, join_relative(&game_dir, &mo.mods_path()));
            variables.insert(paths::MO_PROFILE, join_relative(&game_dir, &mo.profiles_path()));
        }

        for (name, relative) in &self.custom_paths {
            variables.insert(name, join_relative(&game_dir, relative));
        }

        variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LauncherConfig::from_json("{}").unwrap();

        assert!(!config.mod_organizer.is_used);
        assert_eq!(config.mod_organizer.version, 2);
        assert_eq!(config.mod_organizer.ini_path(), "Mod Organizer/ModOrganizer.ini");
        assert_eq!(config.mod_organizer.profiles_path(), "Mod Organizer/profiles");
        assert_eq!(config.game_dir(Path::new("/launcher")), PathBuf::from("/launcher"));
    }

    #[test]
    fn test_mo_paths_follow_custom_path() {
        let config = LauncherConfig::from_json(
            r#"{ "modOrganizer": { "isUsed": true, "path": "MO2", "pathToMods": "D:/mods" } }"#,
        )
        .unwrap();

        let mo = &config.mod_organizer;
        assert_eq!(mo.ini_path(), "MO2/ModOrganizer.ini");
        assert_eq!(mo.profiles_path(), "MO2/profiles");
        assert_eq!(mo.mods_path(), "D:/mods");
    }

    #[test]
    fn test_invalid_version() {
        let err = LauncherConfig::from_json(r#"{ "modOrganizer": { "version": 3 } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Validation { .. }));
    }

    #[test]
    fn test_invalid_profile_regex() {
        let err = LauncherConfig::from_json(r#"{ "modOrganizer": { "profileParamValueRegExp": "(" } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Validation { .. }));
    }

    #[test]
    fn test_path_variables() {
        let config = LauncherConfig::from_json(
            r#"{
                "documentsPath": "My Games/Skyrim",
                "customPaths": { "%TOOLS%": "%GAMEDIR%/tools" },
                "modOrganizer": { "isUsed": true, "pathToINI": "MO/ModOrganizer.ini", "pathToProfiles": "MO/profiles" }
            }"#,
        )
        .unwrap();

        let vars = config.path_variables(Path::new("/game"), Some(Path::new("/home/user/Documents")));

        assert_eq!(vars.get("%GAMEDIR%"), Some(Path::new("/game")));
        assert_eq!(vars.get("%DOCUMENTS%"), Some(Path::new("/home/user/Documents")));
        assert_eq!(vars.get("%DOCS_GAME%"), Some(Path::new("/home/user/Documents/My Games/Skyrim")));
        assert_eq!(vars.get("%MO_INI%"), Some(Path::new("/game/MO/ModOrganizer.ini")));
        assert_eq!(vars.get("%MO_PROFILE%"), Some(Path::new("/game/MO/profiles")));
        assert_eq!(vars.get("%MO_DIR%"), Some(Path::new("/game/Mod Organizer")));
        assert_eq!(vars.get("%TOOLS%"), Some(Path::new("/game/tools")));
    }

    #[test]
    fn test_without_documents_or_mo() {
        let config = LauncherConfig::from_json(r#"{ "documentsPath": "My Games/Skyrim" }"#).unwrap();
        let vars = config.path_variables(Path::new("/game"), None);

        assert!(vars.get("%DOCS_GAME%").is_none());
        assert!(vars.get("%MO_PROFILE%").is_none());
    }

    #[test]
    fn test_relative_game_dir() {
        let config = LauncherConfig::from_json(r#"{ "gameDir": "../Skyrim" }"#).unwrap();
        assert_eq!(config.game_dir(Path::new("/launcher")), PathBuf::from("/launcher/../Skyrim"));
    }
}
