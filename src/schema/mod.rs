//! 游戏设置 schema（settings.json）
//!
//! 纯数据：描述有哪些设置文件、文件中哪些值可以由用户修改，以及 UI 控件提示。
//! 字段名与 settings.json 保持一致（camelCase）。

mod validate;

pub use validate::{validate, ValidatedSchema};

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoding::FileEncoding;
use crate::formats::FileView;
use crate::utils::{Result, SettingsError};

/// tag 视图中表示“标签内文本”的 valueName
pub use crate::formats::TEXT_CONTENT;

/// settings.json 的顶层结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameSettingsConfig {
    /// 未单独指定编码的文件使用的编码
    #[serde(default)]
    pub base_files_encoding: FileEncoding,
    #[serde(default)]
    pub game_settings_groups: Vec<SettingGroup>,
    #[serde(default)]
    pub game_settings_files: Vec<GameSettingsFile>,
    #[serde(default)]
    pub game_settings_options: Vec<Parameter>,
}

/// 设置分组（UI 中的一个页签）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingGroup {
    pub name: String,
    pub label: String,
}

/// 一个磁盘上的设置文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettingsFile {
    #[serde(default)]
    pub id: String,
    /// schema 内部使用的文件名（参数通过它引用文件）
    pub name: String,
    #[serde(default)]
    pub label: String,
    /// 文件路径，可以以路径变量开头（如 `%DOCS_GAME%/Skyrim.ini`）
    pub path: String,
    pub view: FileView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<FileEncoding>,
}

impl GameSettingsFile {
    /// 文件实际使用的编码
    pub fn encoding_or(&self, base: FileEncoding) -> FileEncoding {
        self.encoding.unwrap_or(base)
    }

    /// 路径中的文件名部分（用于提示信息）
    pub fn base_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }
}

/// 参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// 对应文件中的一个值
    Default,
    /// 一个控件同时驱动多个值
    Group,
    /// 共用标签的一组独立控件
    Related,
    /// 一个值由多个值用分隔符拼接而成
    Combined,
}

impl OptionType {
    pub fn is_composite(&self) -> bool {
        !matches!(self, OptionType::Default)
    }
}

/// UI 控件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerType {
    Checkbox,
    Range,
    Select,
}

/// 控件相关字段，参数和参数条目上都可以出现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ControllerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_type: Option<ControllerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_options: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

impl ControllerFields {
    /// 声明了 min 和 max 时返回数值区间
    pub fn range(&self) -> Option<ValueRange> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(ValueRange { min, max, step: self.step }),
            _ => None,
        }
    }
}

/// range 控件的取值区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub step: Option<f64>,
}

/// schema 中声明的一个参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default)]
    pub id: String,
    pub option_type: OptionType,
    /// 引用 [`GameSettingsFile::name`]
    pub file: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_group: Option<String>,
    #[serde(default)]
    pub items: Vec<ParameterItem>,
    #[serde(flatten)]
    pub controller: ControllerFields,
}

impl Parameter {
    /// 某个条目生效的数值区间：条目自己的优先，其次是参数上的
    pub fn range_for(&self, item: &ParameterItem) -> Option<ValueRange> {
        item.controller.range().or_else(|| self.controller.range())
    }

    /// 用于提示信息的参数名：id，其次 label，再其次第一个条目的名称
    pub fn display_name(&self) -> &str {
        if !self.id.is_empty() {
            &self.id
        } else if !self.label.is_empty() {
            &self.label
        } else {
            self.items.first().map(|item| item.name.as_str()).unwrap_or("")
        }
    }

    /// 条目生效的控件类型
    pub fn controller_type_for(&self, item: &ParameterItem) -> Option<ControllerType> {
        item.controller.controller_type.or(self.controller.controller_type)
    }

    /// 条目生效的 select 选项
    pub fn select_options_for<'a>(&'a self, item: &'a ParameterItem) -> Option<&'a BTreeMap<String, String>> {
        item.controller
            .select_options
            .as_ref()
            .or(self.controller.select_options.as_ref())
    }

    /// 所有条目的选项名
    pub fn option_names(&self) -> Vec<String> {
        self.items.iter().map(ParameterItem::option_name).collect()
    }

    /// 参数的分隔符（COMBINED 使用）
    pub fn separator(&self) -> Option<&str> {
        self.controller.separator.as_deref()
    }
}

/// 参数中的一个条目：文件中的一个具体位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterItem {
    #[serde(default)]
    pub id: String,
    /// sectional 视图中的键名、line 视图中的参数名、tag 视图中的标签名
    pub name: String,
    /// sectional 视图：节名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ini_group: Option<String>,
    /// tag 视图：属性名，或 [`TEXT_CONTENT`] 表示标签内文本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
    /// tag 视图：到标签的路径（`a/b/c`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_path: Option<String>,
    #[serde(flatten)]
    pub controller: ControllerFields,
}

impl ParameterItem {
    /// 条目对应选项的名称
    ///
    /// - tag：`valuePath/name/valueName`
    /// - sectional：`iniGroup/name`
    /// - line：`name`
    pub fn option_name(&self) -> String {
        if let (Some(path), Some(value_name)) = (&self.value_path, &self.value_name) {
            return format!("{}/{}/{}", path, self.name, value_name);
        }

        if let Some(group) = &self.ini_group {
            return format!("{}/{}", group, self.name);
        }

        self.name.trim().to_string()
    }
}

impl GameSettingsConfig {
    /// 从 JSON 文本解析
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 读取 settings.json
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| SettingsError::read_write(path, e))?;
        Self::from_json(&json)
    }

    /// 写回 settings.json（格式化输出）
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| SettingsError::read_write(path, e))
    }

    pub fn file(&self, name: &str) -> Option<&GameSettingsFile> {
        self.game_settings_files.iter().find(|file| file.name == name)
    }

    /// 某个文件的全部参数
    pub fn parameters_for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Parameter> + 'a {
        self.game_settings_options.iter().filter(move |p| p.file == file)
    }
}

/// 按设置分组筛选参数
///
/// 没有声明分组或未指定当前分组时返回全部参数。
pub fn parameters_for_group<'a>(
    parameters: &'a [Parameter],
    groups: &[SettingGroup],
    current_group: Option<&str>,
) -> Vec<&'a Parameter> {
    match current_group {
        Some(group) if !groups.is_empty() && !group.is_empty() => parameters
            .iter()
            .filter(|p| p.setting_group.as_deref() == Some(group))
            .collect(),
        _ => parameters.iter().collect(),
    }
}

/// select 控件的选项列表：(值, 显示文本)
pub fn select_options(controller: &ControllerFields) -> Vec<(String, String)> {
    controller
        .select_options
        .as_ref()
        .map(|options| {
            options
                .iter()
                .map(|(value, label)| (value.clone(), label.clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS_JSON: &str = r#"{
        "baseFilesEncoding": "win1251",
        "gameSettingsGroups": [{ "name": "video", "label": "Video" }],
        "gameSettingsFiles": [
            { "name": "display", "label": "Display", "path": "%DOCS_GAME%/display.ini", "view": "sectional" },
            { "name": "prefs", "label": "Prefs", "path": "prefs.xml", "view": "tag", "encoding": "utf-8" }
        ],
        "gameSettingsOptions": [
            {
                "id": "res",
                "optionType": "default",
                "file": "display",
                "label": "Resolution",
                "settingGroup": "video",
                "controllerType": "select",
                "selectOptions": { "1920x1080": "Full HD", "1280x720": "HD" },
                "items": [{ "id": "i1", "name": "Resolution", "iniGroup": "Display" }]
            },
            {
                "id": "gamma",
                "optionType": "default",
                "file": "prefs",
                "label": "Gamma",
                "controllerType": "range",
                "min": 0.5, "max": 2, "step": 0.1,
                "items": [{ "name": "Gamma", "valuePath": "Prefs/Video", "valueName": "value" }]
            }
        ]
    }"#;

    #[test]
    fn test_parse_settings_json() {
        let config = GameSettingsConfig::from_json(SETTINGS_JSON).unwrap();

        assert_eq!(config.base_files_encoding, FileEncoding::Win1251);
        assert_eq!(config.game_settings_files.len(), 2);
        assert_eq!(config.game_settings_files[0].view, FileView::Sectional);
        assert_eq!(config.game_settings_files[1].encoding, Some(FileEncoding::Utf8));

        let res = &config.game_settings_options[0];
        assert_eq!(res.option_type, OptionType::Default);
        assert_eq!(res.controller.controller_type, Some(ControllerType::Select));
        assert_eq!(res.items[0].ini_group.as_deref(), Some("Display"));

        let gamma = &config.game_settings_options[1];
        let range = gamma.range_for(&gamma.items[0]).unwrap();
        assert_eq!(range.min, 0.5);
        assert_eq!(range.max, 2.0);
        assert_eq!(range.step, Some(0.1));
    }

    #[test]
    fn test_option_names() {
        let config = GameSettingsConfig::from_json(SETTINGS_JSON).unwrap();

        assert_eq!(config.game_settings_options[0].items[0].option_name(), "Display/Resolution");
        assert_eq!(config.game_settings_options[1].items[0].option_name(), "Prefs/Video/Gamma/value");

        let line_item = ParameterItem {
            id: String::new(),
            name: " fGamma ".to_string(),
            ini_group: None,
            value_name: None,
            value_path: None,
            controller: ControllerFields::default(),
        };
        assert_eq!(line_item.option_name(), "fGamma");
    }

    #[test]
    fn test_file_helpers() {
        let config = GameSettingsConfig::from_json(SETTINGS_JSON).unwrap();
        let display = config.file("display").unwrap();

        assert_eq!(display.base_name(), "display.ini");
        assert_eq!(display.encoding_or(config.base_files_encoding), FileEncoding::Win1251);
        assert_eq!(config.parameters_for_file("prefs").count(), 1);
    }

    #[test]
    fn test_parameters_for_group() {
        let config = GameSettingsConfig::from_json(SETTINGS_JSON).unwrap();
        let params = &config.game_settings_options;

        let video = parameters_for_group(params, &config.game_settings_groups, Some("video"));
        assert_eq!(video.len(), 1);
        assert_eq!(video[0].id, "res");

        let all = parameters_for_group(params, &config.game_settings_groups, None);
        assert_eq!(all.len(), 2);

        let no_groups = parameters_for_group(params, &[], Some("video"));
        assert_eq!(no_groups.len(), 2);
    }

    #[test]
    fn test_select_options() {
        let config = GameSettingsConfig::from_json(SETTINGS_JSON).unwrap();
        let options = select_options(&config.game_settings_options[0].controller);

        assert_eq!(
            options,
            vec![
                ("1280x720".to_string(), "HD".to_string()),
                ("1920x1080".to_string(), "Full HD".to_string()),
            ]
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let config = GameSettingsConfig::from_json(SETTINGS_JSON).unwrap();
        config.save(&path).unwrap();

        assert_eq!(GameSettingsConfig::load(&path).unwrap(), config);
    }
}
