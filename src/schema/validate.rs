//! schema 校验
//!
//! 不合法的文件或参数会被剔除，每剔除一项记录一条校验错误，剩余部分照常使用。

use std::collections::HashSet;

use tracing::warn;

use super::{ControllerType, GameSettingsConfig, OptionType, Parameter};
use crate::formats::FileView;
use crate::utils::SettingsError;

/// 校验结果：过滤后的 schema 与被剔除项的原因
#[derive(Debug)]
pub struct ValidatedSchema {
    pub config: GameSettingsConfig,
    pub errors: Vec<SettingsError>,
}

impl ValidatedSchema {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 校验 schema，返回可以安全使用的部分
pub fn validate(config: &GameSettingsConfig) -> ValidatedSchema {
    let mut errors = Vec::new();

    let group_names: HashSet<&str> = config
        .game_settings_groups
        .iter()
        .map(|group| group.name.as_str())
        .collect();

    let mut seen_files = HashSet::new();
    let mut files = Vec::new();
    for file in &config.game_settings_files {
        if file.path.trim().is_empty() {
            errors.push(SettingsError::validation(format!("file \"{}\" has an empty path", file.name)));
            continue;
        }
        if !seen_files.insert(file.name.as_str()) {
            errors.push(SettingsError::validation(format!("duplicate file name \"{}\"", file.name)));
            continue;
        }
        files.push(file.clone());
    }

    let mut options = Vec::new();
    for parameter in &config.game_settings_options {
        let Some(file) = files.iter().find(|f| f.name == parameter.file) else {
            errors.push(SettingsError::validation(format!(
                "parameter \"{}\" references unknown file \"{}\"",
                parameter.display_name(),
                parameter.file
            )));
            continue;
        };

        match check_parameter(parameter, file.view, &group_names) {
            Ok(()) => options.push(parameter.clone()),
            Err(message) => errors.push(SettingsError::validation(format!(
                "parameter \"{}\": {}",
                parameter.display_name(),
                message
            ))),
        }
    }

    for error in &errors {
        warn!("Settings schema: {}", error);
    }

    ValidatedSchema {
        config: GameSettingsConfig {
            base_files_encoding: config.base_files_encoding,
            game_settings_groups: config.game_settings_groups.clone(),
            game_settings_files: files,
            game_settings_options: options,
        },
        errors,
    }
}

fn check_parameter(
    parameter: &Parameter,
    view: FileView,
    group_names: &HashSet<&str>,
) -> std::result::Result<(), String> {
    if let Some(group) = &parameter.setting_group {
        if !group_names.contains(group.as_str()) {
            return Err(format!("unknown setting group \"{}\"", group));
        }
    }

    match parameter.option_type {
        OptionType::Default if parameter.items.len() != 1 => {
            return Err(format!("default parameter must have exactly one item, found {}", parameter.items.len()));
        }
        t if t.is_composite() && parameter.items.is_empty() => {
            return Err("composite parameter has no items".to_string());
        }
        OptionType::Combined if parameter.separator().map(str::is_empty).unwrap_or(true) => {
            return Err("combined parameter has no separator".to_string());
        }
        _ => {}
    }

    for item in &parameter.items {
        if item.name.trim().is_empty() {
            return Err("item has an empty name".to_string());
        }

        let has_group = item.ini_group.is_some();
        let has_tag_fields = item.value_path.is_some() || item.value_name.is_some();
        match view {
            FileView::Sectional if item.ini_group.as_deref().map(str::is_empty).unwrap_or(true) => {
                return Err(format!("item \"{}\" needs iniGroup for a sectional file", item.name));
            }
            FileView::Tag if item.value_path.is_none() || item.value_name.is_none() => {
                return Err(format!("item \"{}\" needs valuePath and valueName for a tag file", item.name));
            }
            // 多余的定位字段会改变选项键，读写时再也找不到这个值
            FileView::Sectional | FileView::Line if has_tag_fields => {
                return Err(format!("item \"{}\" has valuePath/valueName outside a tag file", item.name));
            }
            FileView::Line | FileView::Tag if has_group => {
                return Err(format!("item \"{}\" has iniGroup outside a sectional file", item.name));
            }
            _ => {}
        }

        match parameter.controller_type_for(item) {
            Some(ControllerType::Range) => {
                let complete = parameter
                    .range_for(item)
                    .and_then(|range| range.step)
                    .map(|step| step > 0.0)
                    .unwrap_or(false);
                if !complete {
                    return Err(format!("range item \"{}\" needs min, max and a positive step", item.name));
                }
            }
            Some(ControllerType::Select) => {
                if parameter.select_options_for(item).map(|o| o.is_empty()).unwrap_or(true) {
                    return Err(format!("select item \"{}\" has no selectOptions", item.name));
                }
            }
            _ => {}
        }
    }

    Ok(())
}
