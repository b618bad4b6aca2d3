//! 路径变量
//!
//! settings.json 中的文件路径可以以 `%NAME%` 形式的变量开头，
//! 由启动器配置提供变量到目录的映射。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::utils::{Result, SettingsError};

pub const GAME_DIR: &str = "%GAMEDIR%";
pub const DOCUMENTS: &str = "%DOCUMENTS%";
pub const DOCS_GAME: &str = "%DOCS_GAME%";
pub const MO_DIR: &str = "%MO_DIR%";
pub const MO_INI: &str = "%MO_INI%";
pub const MO_MODS: &str = "%MO_MODS%";
/// Mod Organizer 的 profiles 目录；解析时追加当前 profile 名
pub const MO_PROFILE: &str = "%MO_PROFILE%";

/// 路径变量表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables {
    variables: BTreeMap<String, PathBuf>,
}

impl PathVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个变量，变量名带不带 `%` 都可以
    pub fn insert(&mut self, name: &str, path: impl Into<PathBuf>) {
        self.variables.insert(normalize_name(name), path.into());
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.variables.get(&normalize_name(name)).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.variables.iter().map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// 把 schema 中的路径解析为实际路径
    ///
    /// # 参数
    /// * `template` - 文件路径，可以以路径变量开头；不带变量的相对路径以游戏目录为基准
    /// * `profile` - 当前 Mod Organizer profile，只有 `%MO_PROFILE%` 路径需要
    pub fn resolve(&self, template: &str, profile: Option<&str>) -> Result<PathBuf> {
        let template = template.trim();

        let (mut base, rest) = match split_variable(template) {
            Some((name, rest)) => {
                let base = self
                    .get(name)
                    .ok_or_else(|| SettingsError::validation(format!("unknown path variable {}", name)))?
                    .to_path_buf();

                if name.eq_ignore_ascii_case(MO_PROFILE) {
                    let profile = profile.map(str::trim).filter(|p| !p.is_empty()).ok_or_else(|| {
                        SettingsError::application(format!("\"{}\" needs an active profile", template))
                    })?;
                    (base.join(profile), rest)
                } else {
                    (base, rest)
                }
            }
            None if Path::new(template).is_absolute() => (PathBuf::new(), template),
            None => {
                let game_dir = self
                    .get(GAME_DIR)
                    .ok_or_else(|| SettingsError::validation(format!("no game directory to resolve \"{}\"", template)))?;
                (game_dir.to_path_buf(), template)
            }
        };

        if base.as_os_str().is_empty() {
            return Ok(PathBuf::from(rest));
        }
        for segment in rest.split(['/', '\\']).filter(|s| !s.is_empty() && *s != ".") {
            base.push(segment);
        }
        Ok(base)
    }
}

/// 路径是否位于 profile 目录下（切换 profile 时需要重新读取）
pub fn is_profile_path(template: &str) -> bool {
    template.to_ascii_uppercase().contains(MO_PROFILE)
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim().trim_matches('%');
    format!("%{}%", trimmed.to_ascii_uppercase())
}

/// 拆出开头的 `%NAME%`
fn split_variable(template: &str) -> Option<(&str, &str)> {
    let inner = template.strip_prefix('%')?;
    let end = inner.find('%')?;
    let name = &template[..end + 2];
    Some((name, &template[end + 2..]))
}
