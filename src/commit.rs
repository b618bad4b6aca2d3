//! 写回
//!
//! 把修改过的选项写进提取阶段保留的文档，再按文件编码并行写盘。
//! 每个文件独立成败，已写入的文件不会因为其他文件失败而回滚。

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{error, info};

use crate::extract::LoadedFile;
use crate::formats::{ParsedFile, SettingsDocument};
use crate::io::SettingsFileWriter;
use crate::options::{ChangedOptions, FileOptions};
use crate::utils::{Result, SettingsError};

/// 某个文件写回失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFailure {
    pub file: String,
    pub path: Option<PathBuf>,
    pub message: String,
}

/// 一次写回的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// 成功写入的文件名
    pub written: Vec<String>,
    pub failures: Vec<CommitFailure>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct PreparedFile {
    name: String,
    path: PathBuf,
    bytes: Vec<u8>,
    document: ParsedFile,
}

/// 把修改写回磁盘
///
/// # 参数
/// * `changes` - 按文件分组的修改（[`OptionMap::changed_options`](crate::options::OptionMap::changed_options)）
/// * `documents` - 提取阶段得到的文档；写入成功的文件会被替换为修改后的文档
/// * `writer` - 写入实现
pub fn commit(
    changes: &ChangedOptions,
    documents: &mut BTreeMap<String, LoadedFile>,
    writer: &dyn SettingsFileWriter,
) -> CommitReport {
    let mut report = CommitReport::default();
    let mut prepared = Vec::new();

    for (file, options) in changes {
        let Some(loaded) = documents.get(file) else {
            report.failures.push(CommitFailure {
                file: file.clone(),
                path: None,
                message: "file was not loaded".to_string(),
            });
            continue;
        };

        match prepare(loaded, options) {
            Ok(file) => prepared.push(file),
            Err(e) => report.failures.push(CommitFailure {
                file: file.clone(),
                path: Some(loaded.path.clone()),
                message: e.to_string(),
            }),
        }
    }

    let results: Vec<(PreparedFile, Result<()>)> = prepared
        .into_par_iter()
        .map(|file| {
            let result = writer.write(&file.path, &file.bytes);
            (file, result)
        })
        .collect();

    for (file, result) in results {
        match result {
            Ok(()) => {
                info!("Wrote settings file {}", file.path.display());
                if let Some(loaded) = documents.get_mut(&file.name) {
                    loaded.document = file.document;
                }
                report.written.push(file.name);
            }
            Err(e) => report.failures.push(CommitFailure {
                file: file.name,
                path: Some(file.path),
                message: e.to_string(),
            }),
        }
    }

    for failure in &report.failures {
        error!("Failed to write settings file {}: {}", failure.file, failure.message);
    }

    report
}

/// 在文档副本上应用修改并编码
fn prepare(loaded: &LoadedFile, options: &FileOptions) -> Result<PreparedFile> {
    let mut document = loaded.document.clone();
    for (name, option) in options {
        document.apply(name, &option.value).map_err(|e| match e {
            SettingsError::Application { .. } | SettingsError::Validation { .. } => e,
            other => SettingsError::application(format!("cannot locate option \"{}\": {}", name, other)),
        })?;
    }

    let bytes = document.to_bytes(loaded.encoding)?;
    Ok(PreparedFile { name: loaded.name.clone(), path: loaded.path.clone(), bytes, document })
}
