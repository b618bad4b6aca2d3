//! 逐行配置适配器
//!
//! 文件是一组原始文本行，参数以 `set <name> to <value>` 语句出现。
//! 读取时用参数专属的正则取出值，写入时只替换值所在的子串，行内其余内容不变。

use regex::Regex;

use super::{push_lines, split_lines, ResolvedValue, SettingsDocument, TextLine};
use crate::schema::ParameterItem;
use crate::utils::{Result, SettingsError};

/// 逐行配置文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDocument {
    lines: Vec<TextLine>,
}

/// 构造匹配某个参数语句的正则，第 1 个捕获组是值
///
/// 值可以是带引号的字符串，或者直到空白/分号为止的记号。
pub fn line_pattern(name: &str) -> Result<Regex> {
    let pattern = format!(
        r#"(?i)\bset\s+{}\s+to\s+("[^"]*"|[^\s;]+)"#,
        regex::escape(name.trim())
    );
    Regex::new(&pattern).map_err(|e| SettingsError::application(format!("invalid line pattern: {}", e)))
}

fn is_comment(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with(';') || trimmed.starts_with('#')
}

impl LineDocument {
    pub fn parse(content: &str) -> Self {
        LineDocument { lines: split_lines(content) }
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// 第一条匹配语句所在行的下标与值的字节范围
    fn locate(&self, pattern: &Regex) -> Option<(usize, std::ops::Range<usize>)> {
        self.lines.iter().enumerate().find_map(|(index, line)| {
            if is_comment(&line.text) {
                return None;
            }
            pattern
                .captures(&line.text)
                .and_then(|caps| caps.get(1))
                .map(|value| (index, value.range()))
        })
    }

    /// 读取参数当前值
    pub fn get_value(&self, name: &str) -> Result<Option<&str>> {
        let pattern = line_pattern(name)?;
        Ok(self
            .locate(&pattern)
            .map(|(index, range)| &self.lines[index].text[range]))
    }

    /// 修改参数值，只替换值所在的子串
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let pattern = line_pattern(name)?;
        let (index, range) = self
            .locate(&pattern)
            .ok_or_else(|| SettingsError::LinePatternNotFound { name: name.trim().to_string() })?;

        self.lines[index].text.replace_range(range, value);
        Ok(())
    }
}

impl SettingsDocument for LineDocument {
    fn resolve(&self, item: &ParameterItem) -> Result<ResolvedValue> {
        let name = item.name.trim();
        match self.get_value(name)? {
            Some(value) if !value.is_empty() => Ok(ResolvedValue {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => Err(SettingsError::LinePatternNotFound { name: name.to_string() }),
        }
    }

    fn apply(&mut self, option_name: &str, value: &str) -> Result<()> {
        self.set_value(option_name, value)
    }

    fn serialize(&self) -> String {
        let mut out = String::new();
        push_lines(&mut out, &self.lines);
        out
    }
}
