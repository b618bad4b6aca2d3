//! 分节 INI 适配器
//!
//! 只在需要时拆分 `key = value`，其余内容（注释、空行、无法识别的行）原样保存。
//! 写入值时沿用原行 `=` 两侧的空白，只替换值本身。

use super::{push_lines, split_lines, ResolvedValue, SettingsDocument, TextLine};
use crate::schema::ParameterItem;
use crate::utils::{Result, SettingsError};

const BOM: char = '\u{FEFF}';

/// 分节 INI 文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniDocument {
    /// 第一个节之前的行
    pub globals: IniSection,
    sections: Vec<IniSection>,
}

/// INI 中的一个节（globals 没有节头）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    header: Option<TextLine>,
    lines: Vec<TextLine>,
}

/// `key = value` 行的各个组成部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry<'a> {
    leading: &'a str,
    key: &'a str,
    before_eq: &'a str,
    after_eq: &'a str,
    value: &'a str,
    trailing: &'a str,
}

impl<'a> Entry<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let content = text.trim_start_matches(BOM);
        let trimmed = content.trim_start();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            return None;
        }

        let eq = text.find('=')?;
        let (left, right) = (&text[..eq], &text[eq + 1..]);

        let key = left.trim().trim_start_matches(BOM).trim();
        if key.is_empty() {
            return None;
        }
        let key_start = left.find(key)?;
        let leading = &left[..key_start];
        let before_eq = &left[key_start + key.len()..];

        let value = right.trim();
        let (after_eq, trailing) = if value.is_empty() {
            (right, "")
        } else {
            let value_start = right.find(value)?;
            (&right[..value_start], &right[value_start + value.len()..])
        };

        Some(Entry { leading, key, before_eq, after_eq, value, trailing })
    }

    fn with_value(&self, value: &str) -> String {
        format!(
            "{}{}{}={}{}{}",
            self.leading, self.key, self.before_eq, self.after_eq, value, self.trailing
        )
    }
}

/// 识别节头 `[name]`
fn section_name(text: &str) -> Option<&str> {
    let trimmed = text.trim_start_matches(BOM).trim();
    let inner = trimmed.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

impl IniSection {
    fn new(name: &str, header: Option<TextLine>) -> Self {
        IniSection { name: name.to_string(), header, lines: Vec::new() }
    }

    /// 节名（按文件中的写法）
    pub fn name(&self) -> &str {
        &self.name
    }

    fn find_line(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        self.lines.iter().position(|line| {
            Entry::parse(&line.text)
                .map(|entry| entry.key.eq_ignore_ascii_case(key))
                .unwrap_or(false)
        })
    }

    /// 查找键所在的行（大小写不敏感）
    pub fn get_line(&self, key: &str) -> Option<&TextLine> {
        self.find_line(key).map(|index| &self.lines[index])
    }

    /// 查找键在文件中的实际写法
    pub fn get_key(&self, key: &str) -> Option<&str> {
        self.get_line(key).and_then(|line| Entry::parse(&line.text)).map(|entry| entry.key)
    }

    /// 读取键的值
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.get_line(key).and_then(|line| Entry::parse(&line.text)).map(|entry| entry.value)
    }

    /// 修改已有键的值，保留原行的空白
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let index = self.find_line(key).ok_or_else(|| SettingsError::KeyNotFound {
            section: self.name.clone(),
            key: key.to_string(),
        })?;

        let line = &mut self.lines[index];
        let new_text = match Entry::parse(&line.text) {
            Some(entry) => entry.with_value(value),
            None => return Err(SettingsError::application("matched line is not a key/value entry")),
        };
        line.text = new_text;
        Ok(())
    }

    /// 节内所有键（按出现顺序）
    pub fn keys(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| Entry::parse(&line.text))
            .map(|entry| entry.key)
            .collect()
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }
}

impl IniDocument {
    pub fn parse(content: &str) -> Self {
        let mut globals = IniSection::new("", None);
        let mut sections: Vec<IniSection> = Vec::new();

        for line in split_lines(content) {
            if let Some(name) = section_name(&line.text) {
                let name = name.to_string();
                sections.push(IniSection::new(&name, Some(line)));
                continue;
            }

            match sections.last_mut() {
                Some(section) => section.lines.push(line),
                None => globals.lines.push(line),
            }
        }

        IniDocument { globals, sections }
    }

    /// 按名称查找节（大小写不敏感，重名时取第一个）
    pub fn get_section(&self, name: &str) -> Option<&IniSection> {
        let name = name.trim();
        self.sections.iter().find(|section| section.name.eq_ignore_ascii_case(name))
    }

    pub fn get_section_mut(&mut self, name: &str) -> Option<&mut IniSection> {
        let name = name.trim();
        self.sections.iter_mut().find(|section| section.name.eq_ignore_ascii_case(name))
    }

    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }

    /// 在指定节内修改值
    pub fn set_value(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        self.get_section_mut(section)
            .ok_or_else(|| SettingsError::SectionNotFound { section: section.to_string() })?
            .set_value(key, value)
    }
}

impl SettingsDocument for IniDocument {
    fn resolve(&self, item: &ParameterItem) -> Result<ResolvedValue> {
        let group = item.ini_group.as_deref().ok_or_else(|| {
            SettingsError::validation(format!("parameter \"{}\" has no iniGroup", item.name))
        })?;

        let section = self
            .get_section(group)
            .ok_or_else(|| SettingsError::SectionNotFound { section: group.to_string() })?;

        let line = section.get_line(&item.name).ok_or_else(|| SettingsError::KeyNotFound {
            section: group.to_string(),
            key: item.name.clone(),
        })?;
        let entry = Entry::parse(&line.text)
            .ok_or_else(|| SettingsError::application("matched line is not a key/value entry"))?;

        Ok(ResolvedValue {
            name: format!("{}/{}", section.name, entry.key),
            value: entry.value.to_string(),
        })
    }

    /// 选项名格式为 `section/key`
    fn apply(&mut self, option_name: &str, value: &str) -> Result<()> {
        let (section, key) = option_name.split_once('/').ok_or_else(|| {
            SettingsError::application(format!("\"{}\" is not a section/key option name", option_name))
        })?;
        self.set_value(section, key, value)
    }

    fn serialize(&self) -> String {
        let mut out = String::new();
        push_lines(&mut out, &self.globals.lines);
        for section in &self.sections {
            if let Some(header) = &section.header {
                out.push_str(&header.text);
                out.push_str(&header.eol);
            }
            push_lines(&mut out, &section.lines);
        }
        out
    }
}
