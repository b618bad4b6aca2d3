//! 运行时选项表与变更追踪
//!
//! 选项表按文件分组，每个选项同时保存 `default`（最近一次确认写入磁盘的值）
//! 和 `value`（当前编辑中的值），两者不同即表示存在未保存的修改。
//!
//! 所有修改操作都返回新的选项表，旧表保持不变。每个文件的选项放在 `Arc` 中，
//! 修改时只复制被改动的那个文件。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::schema::{OptionType, Parameter, ParameterItem, ValueRange};
use crate::utils::{clamp_to_range, decimal_places, format_number, parse_number, Result, SettingsError};

/// 一个选项的运行时状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameOption {
    pub default: String,
    pub value: String,
    /// 所属文件（schema 中的文件名）
    pub parent: String,
}

impl GameOption {
    /// 刚从文件中读出的选项，default 与 value 相同
    pub fn new(parent: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        GameOption { default: value.clone(), value, parent: parent.into() }
    }

    pub fn is_changed(&self) -> bool {
        self.value != self.default
    }
}

/// 一个文件内的选项，按选项名排序
pub type FileOptions = BTreeMap<String, GameOption>;

/// 按文件分组的修改
pub type ChangedOptions = BTreeMap<String, FileOptions>;

/// range 按钮的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Increase,
    Decrease,
}

/// 选项表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap {
    files: BTreeMap<String, Arc<FileOptions>>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: &str, name: &str, option: GameOption) {
        Arc::make_mut(self.files.entry(file.to_string()).or_default()).insert(name.to_string(), option);
    }

    pub fn get(&self, file: &str, name: &str) -> Option<&GameOption> {
        self.files.get(file).and_then(|options| options.get(name))
    }

    pub fn file(&self, file: &str) -> Option<&FileOptions> {
        self.files.get(file).map(|options| options.as_ref())
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileOptions)> {
        self.files.iter().map(|(file, options)| (file.as_str(), options.as_ref()))
    }

    /// 选项总数
    pub fn len(&self) -> usize {
        self.files.values().map(|options| options.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 整体替换某个文件的选项；空表表示移除该文件
    pub fn replace_file(&self, file: &str, options: FileOptions) -> OptionMap {
        let mut next = self.clone();
        if options.is_empty() {
            next.files.remove(file);
        } else {
            next.files.insert(file.to_string(), Arc::new(options));
        }
        next
    }

    /// 按文件输出为普通的嵌套映射（用于序列化）
    pub fn to_nested(&self) -> BTreeMap<&str, &FileOptions> {
        self.files().collect()
    }

    fn with_value(&self, file: &str, name: &str, value: String) -> Result<OptionMap> {
        let mut next = self.clone();
        let option = next
            .files
            .get_mut(file)
            .map(Arc::make_mut)
            .and_then(|options| options.get_mut(name))
            .ok_or_else(|| SettingsError::application(format!("unknown option \"{}\" in file \"{}\"", name, file)))?;
        option.value = value;
        Ok(next)
    }

    /// 修改选项的当前值，default 不变
    ///
    /// 声明了区间时，数值先限制到区间内，再按 default 的小数位数格式化，
    /// 整数参数不会出现小数部分。没有区间（select、checkbox、文本）时原样保存。
    ///
    /// # 参数
    /// * `file` - 文件名
    /// * `name` - 选项名
    /// * `new_value` - 新值
    /// * `range` - 控件的取值区间（range 控件）
    pub fn set_option_value(&self, file: &str, name: &str, new_value: &str, range: Option<ValueRange>) -> Result<OptionMap> {
        let option = self
            .get(file, name)
            .ok_or_else(|| SettingsError::application(format!("unknown option \"{}\" in file \"{}\"", name, file)))?;

        let value = normalize_value(&option.default, new_value, range)?;
        self.with_value(file, name, value)
    }

    /// 所有 value 与 default 不同的选项，按文件分组，没有修改的文件不出现
    pub fn changed_options(&self) -> ChangedOptions {
        self.files
            .iter()
            .filter_map(|(file, options)| {
                let changed: FileOptions = options
                    .iter()
                    .filter(|(_, option)| option.is_changed())
                    .map(|(name, option)| (name.clone(), option.clone()))
                    .collect();
                (!changed.is_empty()).then(|| (file.clone(), changed))
            })
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        self.files.values().any(|options| options.values().any(GameOption::is_changed))
    }

    /// 取消编辑：value := default
    pub fn reset_to_defaults(&self) -> OptionMap {
        self.map_changed(|_| true, |option| option.value = option.default.clone())
    }

    /// 保存成功后：default := value
    pub fn commit_defaults(&self) -> OptionMap {
        self.map_changed(|_| true, |option| option.default = option.value.clone())
    }

    /// 只对已写入的文件执行 default := value
    pub fn commit_defaults_for(&self, files: &[String]) -> OptionMap {
        self.map_changed(
            |file| files.iter().any(|f| f == file),
            |option| option.default = option.value.clone(),
        )
    }

    fn map_changed(&self, include_file: impl Fn(&str) -> bool, update: impl Fn(&mut GameOption)) -> OptionMap {
        let mut next = self.clone();
        for (file, options) in next.files.iter_mut() {
            if !include_file(file.as_str()) || !options.values().any(GameOption::is_changed) {
                continue;
            }
            for option in Arc::make_mut(options).values_mut() {
                update(option);
            }
        }
        next
    }

    /// 参数在 UI 上显示的值
    ///
    /// COMBINED 用分隔符拼接所有条目，其余类型取第一个条目。
    /// 任一需要的条目不存在时返回 `None`。
    pub fn parameter_value(&self, parameter: &Parameter) -> Option<String> {
        match parameter.option_type {
            OptionType::Combined => {
                let separator = parameter.separator().unwrap_or_default();
                let values = parameter
                    .items
                    .iter()
                    .map(|item| self.get(&parameter.file, &item.option_name()).map(|o| o.value.as_str()))
                    .collect::<Option<Vec<_>>>()?;
                Some(values.join(separator))
            }
            _ => {
                let item = parameter.items.first()?;
                self.get(&parameter.file, &item.option_name()).map(|o| o.value.clone())
            }
        }
    }

    /// 将 UI 上的一个值分发到参数的条目
    ///
    /// # 参数
    /// * `parameter` - 参数
    /// * `target` - RELATED 参数中被修改的条目的选项名；其余类型忽略
    /// * `value` - 新值
    ///
    /// # 返回
    /// - GROUP：所有条目设为同一个值
    /// - COMBINED：按分隔符拆分，逐个对应条目，份数不符时返回校验错误
    /// - DEFAULT / RELATED：只修改对应的一个条目
    pub fn set_parameter_value(&self, parameter: &Parameter, target: Option<&str>, value: &str) -> Result<OptionMap> {
        let file = parameter.file.as_str();

        match parameter.option_type {
            OptionType::Group => parameter.items.iter().try_fold(self.clone(), |map, item| {
                map.set_option_value(file, &item.option_name(), value, parameter.range_for(item))
            }),
            OptionType::Combined => {
                let separator = parameter
                    .separator()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| SettingsError::validation(format!("parameter \"{}\" has no separator", parameter.id)))?;
                let parts: Vec<&str> = value.split(separator).collect();
                if parts.len() != parameter.items.len() {
                    return Err(SettingsError::validation(format!(
                        "\"{}\" has {} parts, parameter \"{}\" expects {}",
                        value,
                        parts.len(),
                        parameter.id,
                        parameter.items.len()
                    )));
                }
                parameter
                    .items
                    .iter()
                    .zip(parts)
                    .try_fold(self.clone(), |map, (item, part)| {
                        map.set_option_value(file, &item.option_name(), part, parameter.range_for(item))
                    })
            }
            OptionType::Default | OptionType::Related => {
                let item = find_item(parameter, target)?;
                self.set_option_value(file, &item.option_name(), value, parameter.range_for(item))
            }
        }
    }

    /// range 控件的 +/- 按钮
    ///
    /// 按 step 增减后限制到区间内，按 default 的小数位数格式化；
    /// default 是整数时使用 step 的小数位数。
    pub fn step_option_value(&self, parameter: &Parameter, target: Option<&str>, direction: StepDirection) -> Result<OptionMap> {
        let item = find_item(parameter, target)?;
        let name = item.option_name();
        let range = parameter
            .range_for(item)
            .ok_or_else(|| SettingsError::validation(format!("option \"{}\" has no range", name)))?;
        let step = range
            .step
            .ok_or_else(|| SettingsError::validation(format!("option \"{}\" has no step", name)))?;

        let option = self
            .get(&parameter.file, &name)
            .ok_or_else(|| SettingsError::application(format!("unknown option \"{}\" in file \"{}\"", name, parameter.file)))?;
        let current = parse_number(&option.value)
            .ok_or_else(|| SettingsError::validation(format!("\"{}\" is not a number", option.value)))?;

        let next = match direction {
            StepDirection::Increase => current + step,
            StepDirection::Decrease => current - step,
        };
        let places = match decimal_places(&option.default) {
            0 => decimal_places(&step.to_string()),
            places => places,
        };

        let value = format_number(clamp_to_range(next, range.min, range.max), places);
        self.with_value(&parameter.file, &name, value)
    }
}

fn find_item<'a>(parameter: &'a Parameter, target: Option<&str>) -> Result<&'a ParameterItem> {
    match target {
        Some(name) => parameter
            .items
            .iter()
            .find(|item| item.option_name() == name)
            .ok_or_else(|| SettingsError::application(format!("parameter \"{}\" has no item \"{}\"", parameter.id, name))),
        None => parameter
            .items
            .first()
            .ok_or_else(|| SettingsError::application(format!("parameter \"{}\" has no items", parameter.id))),
    }
}

/// 只有 range 控件的值需要限制区间并保持数值格式，其余值原样保存
fn normalize_value(default: &str, new_value: &str, range: Option<ValueRange>) -> Result<String> {
    let Some(range) = range else {
        return Ok(new_value.to_string());
    };

    let number = parse_number(new_value)
        .ok_or_else(|| SettingsError::validation(format!("\"{}\" is not a number", new_value)))?;
    let number = clamp_to_range(number, range.min, range.max);

    if parse_number(default).is_none() {
        // default 不是数值时没有格式可参照
        return Ok(number.to_string());
    }

    Ok(format_number(number, decimal_places(default)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ControllerFields;

    fn map() -> OptionMap {
        let mut map = OptionMap::new();
        map.insert("display", "Display/fGamma", GameOption::new("display", "1.50"));
        map.insert("display", "Display/iFPS", GameOption::new("display", "2"));
        map.insert("display", "Display/Resolution", GameOption::new("display", "1920x1080"));
        map.insert("audio", "Audio/fVolume", GameOption::new("audio", "0.8"));
        map
    }

    fn item(group: &str, name: &str) -> ParameterItem {
        ParameterItem {
            id: String::new(),
            name: name.to_string(),
            ini_group: Some(group.to_string()),
            value_name: None,
            value_path: None,
            controller: ControllerFields::default(),
        }
    }

    fn parameter(option_type: OptionType, items: Vec<ParameterItem>) -> Parameter {
        Parameter {
            id: "p".to_string(),
            option_type,
            file: "display".to_string(),
            label: String::new(),
            description: String::new(),
            setting_group: None,
            items,
            controller: ControllerFields::default(),
        }
    }

    fn range(min: f64, max: f64, step: f64) -> Option<ValueRange> {
        Some(ValueRange { min, max, step: Some(step) })
    }

    #[test]
    fn test_fresh_map_has_no_changes() {
        let map = map();
        assert!(map.changed_options().is_empty());
        assert!(!map.has_changes());
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_set_option_value_keeps_default() {
        let map = map();
        let edited = map.set_option_value("display", "Display/Resolution", "1280x720", None).unwrap();

        let option = edited.get("display", "Display/Resolution").unwrap();
        assert_eq!(option.value, "1280x720");
        assert_eq!(option.default, "1920x1080");
        // 原表不受影响
        assert_eq!(map.get("display", "Display/Resolution").unwrap().value, "1920x1080");
    }

    #[test]
    fn test_decimal_places_preserved() {
        let map = map();

        let edited = map.set_option_value("display", "Display/fGamma", "2", range(0.0, 5.0, 0.1)).unwrap();
        assert_eq!(edited.get("display", "Display/fGamma").unwrap().value, "2.00");

        let edited = map.set_option_value("display", "Display/iFPS", "2.7", range(0.0, 10.0, 1.0)).unwrap();
        assert_eq!(edited.get("display", "Display/iFPS").unwrap().value, "3");
    }

    #[test]
    fn test_values_without_range_are_stored_verbatim() {
        let mut map = map();
        map.insert("display", "Display/iRefreshRate", GameOption::new("display", "60"));

        // select 选项中的数值不按 default 的格式改写
        let edited = map.set_option_value("display", "Display/iRefreshRate", "59.94", None).unwrap();
        assert_eq!(edited.get("display", "Display/iRefreshRate").unwrap().value, "59.94");

        let edited = map.set_option_value("display", "Display/iFPS", "0.5", None).unwrap();
        assert_eq!(edited.get("display", "Display/iFPS").unwrap().value, "0.5");

        let edited = map.set_option_value("display", "Display/fGamma", "2", None).unwrap();
        assert_eq!(edited.get("display", "Display/fGamma").unwrap().value, "2");
    }

    #[test]
    fn test_range_clamps() {
        let map = map();

        let edited = map.set_option_value("display", "Display/fGamma", "5", range(0.5, 2.0, 0.1)).unwrap();
        assert_eq!(edited.get("display", "Display/fGamma").unwrap().value, "2.00");

        let edited = map.set_option_value("display", "Display/iFPS", "-10", range(1.0, 144.0, 1.0)).unwrap();
        assert_eq!(edited.get("display", "Display/iFPS").unwrap().value, "1");

        let err = map.set_option_value("display", "Display/fGamma", "bright", range(0.5, 2.0, 0.1)).unwrap_err();
        assert!(matches!(err, SettingsError::Validation { .. }));
    }

    #[test]
    fn test_unknown_option() {
        let err = map().set_option_value("display", "Display/missing", "1", None).unwrap_err();
        assert!(matches!(err, SettingsError::Application { .. }));
    }

    #[test]
    fn test_changed_options_grouped_by_file() {
        let edited = map()
            .set_option_value("display", "Display/fGamma", "1.2", None)
            .unwrap();

        let changed = edited.changed_options();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed["display"].len(), 1);
        assert_eq!(changed["display"]["Display/fGamma"].value, "1.2");
    }

    #[test]
    fn test_reset_restores_map() {
        let map = map();
        for value in ["0", "abc", "1.99", ""] {
            let edited = map.set_option_value("display", "Display/Resolution", value, None).unwrap();
            assert_eq!(edited.reset_to_defaults(), map);
        }
    }

    #[test]
    fn test_commit_defaults() {
        let edited = map()
            .set_option_value("display", "Display/fGamma", "1.2", None)
            .unwrap()
            .set_option_value("audio", "Audio/fVolume", "0.5", None)
            .unwrap();

        let committed = edited.commit_defaults();
        assert!(!committed.has_changes());
        assert_eq!(committed.get("audio", "Audio/fVolume").unwrap().default, "0.5");

        let partial = edited.commit_defaults_for(&["audio".to_string()]);
        assert_eq!(partial.changed_options().keys().collect::<Vec<_>>(), vec!["display"]);
    }

    #[test]
    fn test_to_nested_serializes_by_file() {
        let map = map();
        let nested = map.to_nested();
        assert_eq!(nested.keys().copied().collect::<Vec<_>>(), vec!["audio", "display"]);

        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json["display"]["Display/Resolution"]["value"], "1920x1080");
        assert_eq!(json["audio"]["Audio/fVolume"]["default"], "0.8");
    }

    #[test]
    fn test_replace_file() {
        let map = map();

        let mut options = FileOptions::new();
        options.insert("Audio/fMusic".to_string(), GameOption::new("audio", "1.0"));
        let replaced = map.replace_file("audio", options);
        assert!(replaced.get("audio", "Audio/fVolume").is_none());
        assert!(replaced.get("audio", "Audio/fMusic").is_some());

        let removed = map.replace_file("audio", FileOptions::new());
        assert!(removed.file("audio").is_none());
    }

    #[test]
    fn test_group_parameter_sets_every_item() {
        let mut map = OptionMap::new();
        map.insert("display", "Display/iShadowW", GameOption::new("display", "1024"));
        map.insert("display", "Display/iShadowH", GameOption::new("display", "1024"));
        let param = parameter(OptionType::Group, vec![item("Display", "iShadowW"), item("Display", "iShadowH")]);

        let edited = map.set_parameter_value(&param, None, "2048").unwrap();
        assert_eq!(edited.get("display", "Display/iShadowW").unwrap().value, "2048");
        assert_eq!(edited.get("display", "Display/iShadowH").unwrap().value, "2048");
        assert_eq!(edited.parameter_value(&param).as_deref(), Some("2048"));
    }

    #[test]
    fn test_combined_parameter_splits_value() {
        let mut map = OptionMap::new();
        map.insert("display", "Display/iSize W", GameOption::new("display", "1920"));
        map.insert("display", "Display/iSize H", GameOption::new("display", "1080"));
        let mut param = parameter(OptionType::Combined, vec![item("Display", "iSize W"), item("Display", "iSize H")]);
        param.controller.separator = Some("x".to_string());

        assert_eq!(map.parameter_value(&param).as_deref(), Some("1920x1080"));

        let edited = map.set_parameter_value(&param, None, "1280x720").unwrap();
        assert_eq!(edited.get("display", "Display/iSize W").unwrap().value, "1280");
        assert_eq!(edited.get("display", "Display/iSize H").unwrap().value, "720");

        let err = map.set_parameter_value(&param, None, "1280").unwrap_err();
        assert!(matches!(err, SettingsError::Validation { .. }));
    }

    #[test]
    fn test_related_parameter_targets_one_item() {
        let mut map = OptionMap::new();
        map.insert("display", "Display/bShadows", GameOption::new("display", "0"));
        map.insert("display", "Display/bBloom", GameOption::new("display", "0"));
        let param = parameter(OptionType::Related, vec![item("Display", "bShadows"), item("Display", "bBloom")]);

        let edited = map.set_parameter_value(&param, Some("Display/bBloom"), "1").unwrap();
        assert_eq!(edited.get("display", "Display/bBloom").unwrap().value, "1");
        assert_eq!(edited.get("display", "Display/bShadows").unwrap().value, "0");

        assert!(map.set_parameter_value(&param, Some("Display/bFog"), "1").is_err());
    }

    #[test]
    fn test_step_option_value() {
        let mut param = parameter(OptionType::Default, vec![item("Display", "fGamma")]);
        param.controller.min = Some(0.5);
        param.controller.max = Some(1.6);
        param.controller.step = Some(0.1);

        let map = map();
        let up = map.step_option_value(&param, None, StepDirection::Increase).unwrap();
        assert_eq!(up.get("display", "Display/fGamma").unwrap().value, "1.60");

        let clamped = up.step_option_value(&param, None, StepDirection::Increase).unwrap();
        assert_eq!(clamped.get("display", "Display/fGamma").unwrap().value, "1.60");

        let down = map.step_option_value(&param, None, StepDirection::Decrease).unwrap();
        assert_eq!(down.get("display", "Display/fGamma").unwrap().value, "1.40");
    }

    #[test]
    fn test_step_integer_default_uses_step_places() {
        let mut param = parameter(OptionType::Default, vec![item("Display", "iFPS")]);
        param.controller.min = Some(0.0);
        param.controller.max = Some(10.0);
        param.controller.step = Some(0.5);

        let stepped = map().step_option_value(&param, None, StepDirection::Increase).unwrap();
        assert_eq!(stepped.get("display", "Display/iFPS").unwrap().value, "2.5");
    }
}
