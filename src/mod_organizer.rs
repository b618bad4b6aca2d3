//! Mod Organizer profile
//!
//! MO 把当前 profile 记录在 ModOrganizer.ini 的某个键里，profile 文件夹位于
//! `%MO_PROFILE%` 目录下。ModOrganizer.ini 固定使用 win1251 编码。

use tracing::{debug, info};

use crate::config::ModOrganizerConfig;
use crate::encoding::FileEncoding;
use crate::formats::{IniDocument, SettingsDocument};
use crate::io::{SettingsFileReader, SettingsFileWriter};
use crate::paths::{self, PathVariables};
use crate::utils::{Result, SettingsError};

/// ModOrganizer.ini 的编码
pub const MO_INI_ENCODING: FileEncoding = FileEncoding::Win1251;

fn variable<'a>(variables: &'a PathVariables, name: &str) -> Result<&'a std::path::Path> {
    variables
        .get(name)
        .ok_or_else(|| SettingsError::validation(format!("path variable {} is not defined, is Mod Organizer enabled?", name)))
}

/// 列出所有 profile（profiles 目录下的子目录）
pub fn list_profiles(variables: &PathVariables, reader: &dyn SettingsFileReader) -> Result<Vec<String>> {
    let dir = variable(variables, paths::MO_PROFILE)?;
    let profiles = reader.list_directories(dir)?;

    if profiles.is_empty() {
        return Err(SettingsError::application(format!(
            "There are no profiles in the profiles folder. Path '{}'",
            dir.display()
        )));
    }

    debug!("Mod Organizer profiles: {:?}", profiles);
    Ok(profiles)
}

fn read_ini(variables: &PathVariables, reader: &dyn SettingsFileReader) -> Result<(std::path::PathBuf, IniDocument)> {
    let path = variable(variables, paths::MO_INI)?.to_path_buf();
    let bytes = reader.read(&path)?;
    let document = IniDocument::parse(&MO_INI_ENCODING.decode(&bytes));
    Ok((path, document))
}

/// 从 profile 键的原始值中取出 profile 名
///
/// 配置了 profileParamValueRegExp 时取第 1 个捕获组；
/// 否则 v1 原样使用，v2 去掉 `@ByteArray(...)` 包装。
pub fn parse_profile_value(config: &ModOrganizerConfig, raw: &str) -> Result<String> {
    let raw = raw.trim();

    if let Some(regex) = config.profile_regex()? {
        return regex
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| SettingsError::validation(format!("profileParamValueRegExp does not match \"{}\"", raw)));
    }

    if config.version == 1 {
        return Ok(raw.to_string());
    }

    Ok(raw
        .strip_prefix("@ByteArray(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(raw)
        .to_string())
}

/// profile 名写入 ini 时的形式
pub fn profile_ini_value(config: &ModOrganizerConfig, profile: &str) -> String {
    if config.version == 1 {
        profile.to_string()
    } else {
        format!("@ByteArray({})", profile)
    }
}

/// 读取当前 profile
pub fn read_current_profile(
    config: &ModOrganizerConfig,
    variables: &PathVariables,
    reader: &dyn SettingsFileReader,
) -> Result<String> {
    let (_, document) = read_ini(variables, reader)?;

    let section = document
        .get_section(&config.profile_section)
        .ok_or_else(|| SettingsError::SectionNotFound { section: config.profile_section.clone() })?;
    let raw = section
        .get_value(&config.profile_param)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SettingsError::KeyNotFound {
            section: config.profile_section.clone(),
            key: config.profile_param.clone(),
        })?;

    parse_profile_value(config, raw)
}

/// 把新的 profile 写入 ModOrganizer.ini，其余内容保持不变
pub fn write_current_profile(
    config: &ModOrganizerConfig,
    variables: &PathVariables,
    reader: &dyn SettingsFileReader,
    writer: &dyn SettingsFileWriter,
    profile: &str,
) -> Result<()> {
    if profile.trim().is_empty() {
        return Err(SettingsError::validation("profile name is empty"));
    }

    let (path, mut document) = read_ini(variables, reader)?;
    document.set_value(&config.profile_section, &config.profile_param, &profile_ini_value(config, profile))?;

    writer.write(&path, &MO_INI_ENCODING.encode(&document.serialize())?)?;
    info!("Mod Organizer profile set to {}", profile);
    Ok(())
}
