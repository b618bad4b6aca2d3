//! 选项提取
//!
//! 按 schema 并行读取所有被引用的设置文件，把每个参数解析为选项。
//! 单个文件或参数的失败只记录为 [`ExtractionError`]，不会中断整批处理。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::encoding::FileEncoding;
use crate::formats::{ParsedFile, SettingsDocument};
use crate::io::SettingsFileReader;
use crate::options::{GameOption, OptionMap};
use crate::paths::PathVariables;
use crate::schema::{GameSettingsConfig, GameSettingsFile, Parameter};
use crate::utils::{Result, SettingsError};

/// 提取错误的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExtractionErrorKind {
    /// 文件无法读取或解析
    FileLoad,
    SectionMissing,
    KeyMissing,
    LinePatternNotFound,
    TagMissing,
    AttributeMissing,
    /// 参数声明本身有问题
    Invalid,
}

impl ExtractionErrorKind {
    fn of(error: &SettingsError) -> Self {
        match error {
            SettingsError::SectionNotFound { .. } => ExtractionErrorKind::SectionMissing,
            SettingsError::KeyNotFound { .. } => ExtractionErrorKind::KeyMissing,
            SettingsError::LinePatternNotFound { .. } => ExtractionErrorKind::LinePatternNotFound,
            SettingsError::TagNotFound { .. } => ExtractionErrorKind::TagMissing,
            SettingsError::AttributeNotFound { .. } => ExtractionErrorKind::AttributeMissing,
            _ => ExtractionErrorKind::Invalid,
        }
    }
}

/// 一条提取错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionError {
    /// 文件名（schema 中的 name）
    pub file: String,
    /// 参数名；文件级错误为空
    pub parameter: String,
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameter.is_empty() {
            write!(f, "[{}] {}", self.file, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.file, self.parameter, self.message)
        }
    }
}

/// 已读取并解析的设置文件
///
/// 写回时直接修改这里的文档，不重新读取磁盘。
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub name: String,
    pub path: PathBuf,
    pub encoding: FileEncoding,
    pub document: ParsedFile,
}

/// 提取结果
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub options: OptionMap,
    /// 按文件名索引的已解析文件
    pub documents: BTreeMap<String, LoadedFile>,
    pub errors: Vec<ExtractionError>,
}

impl Extraction {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// 提取 schema 中的全部选项
pub fn extract(
    config: &GameSettingsConfig,
    profile: Option<&str>,
    variables: &PathVariables,
    reader: &dyn SettingsFileReader,
) -> Extraction {
    extract_where(config, profile, variables, reader, |_| true)
}

/// 只提取满足条件的文件中的选项（切换 profile 时只处理 profile 目录下的文件）
pub fn extract_where(
    config: &GameSettingsConfig,
    profile: Option<&str>,
    variables: &PathVariables,
    reader: &dyn SettingsFileReader,
    include: impl Fn(&GameSettingsFile) -> bool,
) -> Extraction {
    let referenced: BTreeSet<&str> = config
        .game_settings_options
        .iter()
        .map(|parameter| parameter.file.as_str())
        .collect();

    let files: Vec<&GameSettingsFile> = config
        .game_settings_files
        .iter()
        .filter(|file| referenced.contains(file.name.as_str()) && include(file))
        .collect();

    let mut extraction = Extraction::default();

    // 并行读取，之后再按顺序归并
    let loaded: Vec<(&GameSettingsFile, Result<LoadedFile>)> = files
        .par_iter()
        .map(|file| (*file, load_file(file, config.base_files_encoding, profile, variables, reader)))
        .collect();

    for (file, result) in loaded {
        match result {
            Ok(loaded) => {
                debug!("Loaded settings file {} from {}", file.name, loaded.path.display());
                extraction.documents.insert(file.name.clone(), loaded);
            }
            Err(e) => extraction.errors.push(ExtractionError {
                file: file.name.clone(),
                parameter: String::new(),
                kind: ExtractionErrorKind::FileLoad,
                message: e.to_string(),
            }),
        }
    }

    for parameter in &config.game_settings_options {
        let Some(loaded) = extraction.documents.get(&parameter.file) else {
            continue;
        };

        match resolve_parameter(parameter, &loaded.document) {
            Ok(values) => {
                for (name, value) in values {
                    extraction
                        .options
                        .insert(&parameter.file, &name, GameOption::new(parameter.file.clone(), value));
                }
            }
            Err(errors) => extraction.errors.extend(errors),
        }
    }

    for error in &extraction.errors {
        warn!("Settings extraction: {}", error);
    }
    info!(
        "Extracted {} options from {} files ({} errors)",
        extraction.options.len(),
        extraction.documents.len(),
        extraction.errors.len()
    );

    extraction
}

/// 解析路径、读取并解析一个设置文件
pub fn load_file(
    file: &GameSettingsFile,
    base_encoding: FileEncoding,
    profile: Option<&str>,
    variables: &PathVariables,
    reader: &dyn SettingsFileReader,
) -> Result<LoadedFile> {
    let path = variables.resolve(&file.path, profile)?;
    let encoding = file.encoding_or(base_encoding);
    let bytes = reader.read(&path)?;
    let document = ParsedFile::from_bytes(&bytes, file.view, encoding, &path)?;

    Ok(LoadedFile { name: file.name.clone(), path, encoding, document })
}

/// 解析参数的所有条目
///
/// 条目逐个独立解析，任何一个失败时整个参数都不产生选项，
/// 并返回全部失败条目的错误。
fn resolve_parameter(
    parameter: &Parameter,
    document: &ParsedFile,
) -> std::result::Result<Vec<(String, String)>, Vec<ExtractionError>> {
    let (values, errors): (Vec<_>, Vec<_>) = parameter
        .items
        .iter()
        .map(|item| {
            document
                .resolve(item)
                .map(|resolved| (item.option_name(), resolved.value))
                .map_err(|e| ExtractionError {
                    file: parameter.file.clone(),
                    parameter: parameter.display_name().to_string(),
                    kind: ExtractionErrorKind::of(&e),
                    message: e.to_string(),
                })
        })
        .partition(|result| result.is_ok());

    if errors.is_empty() {
        Ok(values.into_iter().filter_map(|r| r.ok()).collect())
    } else {
        Err(errors.into_iter().filter_map(|r| r.err()).collect())
    }
}
