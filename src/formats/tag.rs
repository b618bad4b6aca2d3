//! 标签/属性树适配器（XML）
//!
//! 用 roxmltree 解析后转换为自有的 [`Element`] 树。属性、子标签和文本分别存放，
//! 不依赖字符串前缀区分。每个属性值和文本节点都记住它在原文中的字节范围，
//! 序列化时只把改动过的值拼接回原文，其余内容逐字节保持不变。

use std::ops::Range;
use std::path::Path;

use super::{ResolvedValue, SettingsDocument};
use crate::schema::ParameterItem;
use crate::utils::{Result, SettingsError};

/// 表示“标签内文本”而非属性的 valueName
pub const TEXT_CONTENT: &str = "#text";

const BOM: char = '\u{FEFF}';

/// 一个可修改的值及其在原文中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    value: String,
    original: String,
    range: Range<usize>,
}

impl Span {
    fn new(value: &str, range: Range<usize>) -> Self {
        Span { value: value.to_string(), original: value.to_string(), range }
    }

    fn is_changed(&self) -> bool {
        self.value != self.original
    }
}

/// 标签节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, Span)>,
    children: Vec<Element>,
    text: Option<Span>,
}

impl Element {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|attr| (attr.name().to_string(), Span::new(attr.value(), attr.range_value())))
            .collect();

        let children = node
            .children()
            .filter(|child| child.is_element())
            .map(Element::from_node)
            .collect();

        Element {
            name: node.tag_name().name().to_string(),
            attributes,
            children,
            text: Self::text_span(node),
        }
    }

    /// 标签的文本：优先取第一个非空白文本节点；没有子标签时也接受纯空白文本
    fn text_span(node: roxmltree::Node<'_, '_>) -> Option<Span> {
        let texts: Vec<_> = node.children().filter(|child| child.is_text()).collect();
        let has_elements = node.children().any(|child| child.is_element());

        texts
            .iter()
            .find(|child| child.text().map(|t| !t.trim().is_empty()).unwrap_or(false))
            .or_else(|| if has_elements { None } else { texts.first() })
            .and_then(|child| child.text().map(|text| Span::new(text, child.range())))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 第一个同名子标签
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, span)| span.value.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_ref().map(|span| span.value.as_str())
    }

    /// 读取属性，或在 `value_name` 为 [`TEXT_CONTENT`] 时读取文本
    pub fn value(&self, value_name: &str) -> Option<&str> {
        if value_name == TEXT_CONTENT {
            self.text()
        } else {
            self.attribute(value_name)
        }
    }

    fn value_mut(&mut self, value_name: &str) -> Option<&mut Span> {
        if value_name == TEXT_CONTENT {
            self.text.as_mut()
        } else {
            self.attributes
                .iter_mut()
                .find(|(attr, _)| attr == value_name)
                .map(|(_, span)| span)
        }
    }

    fn collect_edits<'a>(&'a self, edits: &mut Vec<(&'a Range<usize>, String)>) {
        for (_, span) in &self.attributes {
            if span.is_changed() {
                edits.push((&span.range, escape(&span.value, true)));
            }
        }
        if let Some(span) = self.text.as_ref().filter(|span| span.is_changed()) {
            edits.push((&span.range, escape(&span.value, false)));
        }
        for child in &self.children {
            child.collect_edits(edits);
        }
    }
}

fn escape(value: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\'' if in_attribute => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// 标签/属性树文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDocument {
    source: String,
    bom: bool,
    /// 虚拟根节点，唯一的子节点是文档根标签
    root: Element,
}

impl TagDocument {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let (bom, body) = match content.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, content),
        };

        let doc = roxmltree::Document::parse(body).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let root = Element {
            name: String::new(),
            attributes: Vec::new(),
            children: vec![Element::from_node(doc.root_element())],
            text: None,
        };

        Ok(TagDocument { source: body.to_string(), bom, root })
    }

    /// 文档根标签
    pub fn root(&self) -> &Element {
        &self.root.children[0]
    }

    /// 沿标签路径查找节点；失败时返回第一个缺失的标签名
    pub fn find(&self, tags: &[&str]) -> Result<&Element> {
        let mut current = &self.root;
        for tag in tags {
            current = current
                .child(tag)
                .ok_or_else(|| SettingsError::TagNotFound { tag: tag.to_string() })?;
        }
        Ok(current)
    }

    fn find_mut(&mut self, tags: &[&str]) -> Result<&mut Element> {
        let mut current = &mut self.root;
        for tag in tags {
            current = current
                .child_mut(tag)
                .ok_or_else(|| SettingsError::TagNotFound { tag: tag.to_string() })?;
        }
        Ok(current)
    }

    /// 按深层键读取：`tag/tag/.../valueName`
    pub fn get_deep(&self, key: &str) -> Result<&str> {
        let (tags, value_name) = split_deep_key(key)?;
        let element = self.find(&tags)?;
        element.value(value_name).ok_or_else(|| SettingsError::AttributeNotFound {
            tag: element.name.clone(),
            attribute: value_name.to_string(),
        })
    }

    /// 按深层键修改已有的属性或文本
    pub fn set_deep(&mut self, key: &str, value: &str) -> Result<()> {
        let (tags, value_name) = split_deep_key(key)?;
        let element = self.find_mut(&tags)?;
        let tag = element.name.clone();
        let span = element.value_mut(value_name).ok_or_else(|| SettingsError::AttributeNotFound {
            tag,
            attribute: value_name.to_string(),
        })?;
        span.value = value.to_string();
        Ok(())
    }
}

fn split_deep_key(key: &str) -> Result<(Vec<&str>, &str)> {
    let mut segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    let value_name = segments
        .pop()
        .ok_or_else(|| SettingsError::application(format!("\"{}\" is not a tag option name", key)))?;
    if segments.is_empty() {
        return Err(SettingsError::application(format!("\"{}\" has no tag path", key)));
    }
    Ok((segments, value_name))
}

impl SettingsDocument for TagDocument {
    fn resolve(&self, item: &ParameterItem) -> Result<ResolvedValue> {
        let (value_path, value_name) = match (&item.value_path, &item.value_name) {
            (Some(path), Some(name)) => (path, name),
            _ => {
                return Err(SettingsError::validation(format!(
                    "parameter \"{}\" needs valuePath and valueName",
                    item.name
                )))
            }
        };

        let mut tags: Vec<&str> = value_path.split('/').filter(|s| !s.is_empty()).collect();
        tags.push(item.name.as_str());

        let element = self.find(&tags)?;
        let value = element.value(value_name).ok_or_else(|| SettingsError::AttributeNotFound {
            tag: item.name.clone(),
            attribute: value_name.clone(),
        })?;

        Ok(ResolvedValue { name: item.option_name(), value: value.to_string() })
    }

    fn apply(&mut self, option_name: &str, value: &str) -> Result<()> {
        self.set_deep(option_name, value)
    }

    fn serialize(&self) -> String {
        let mut edits = Vec::new();
        self.root.collect_edits(&mut edits);
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut body = self.source.clone();
        for (range, replacement) in edits {
            body.replace_range(range.clone(), &replacement);
        }

        if self.bom {
            format!("{}{}", BOM, body)
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Prefs version="2">
  <Video>
    <Resolution width="1920" height="1080" />
    <Gamma>1.0</Gamma>
  </Video>
  <Audio volume='0.8'/>
</Prefs>
"#;

    fn doc() -> TagDocument {
        TagDocument::parse(PREFS, Path::new("prefs.xml")).unwrap()
    }

    #[test]
    fn test_tree_shape() {
        let doc = doc();
        let root = doc.root();

        assert_eq!(root.name(), "Prefs");
        assert_eq!(root.attribute("version"), Some("2"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child("Video").unwrap().child("Gamma").unwrap().text(), Some("1.0"));
        // 有子标签的节点只有空白文本
        assert_eq!(root.child("Video").unwrap().text(), None);
    }

    #[test]
    fn test_get_deep() {
        let doc = doc();

        assert_eq!(doc.get_deep("Prefs/Video/Resolution/width").unwrap(), "1920");
        assert_eq!(doc.get_deep("Prefs/Video/Gamma/#text").unwrap(), "1.0");
        assert_eq!(doc.get_deep("Prefs/Audio/volume").unwrap(), "0.8");

        assert!(matches!(
            doc.get_deep("Prefs/Input/Mouse/speed").unwrap_err(),
            SettingsError::TagNotFound { tag } if tag == "Input"
        ));
        assert!(matches!(
            doc.get_deep("Prefs/Video/Resolution/depth").unwrap_err(),
            SettingsError::AttributeNotFound { .. }
        ));
    }

    #[test]
    fn test_unchanged_serialize_is_identical() {
        assert_eq!(doc().serialize(), PREFS);
    }

    #[test]
    fn test_set_deep_splices_values() {
        let mut doc = doc();
        doc.set_deep("Prefs/Video/Resolution/width", "1280").unwrap();
        doc.set_deep("Prefs/Video/Gamma/#text", "1.2").unwrap();
        doc.set_deep("Prefs/Audio/volume", "0.5").unwrap();

        let out = doc.serialize();
        assert!(out.contains(r#"<Resolution width="1280" height="1080" />"#));
        assert!(out.contains("<Gamma>1.2</Gamma>"));
        assert!(out.contains("<Audio volume='0.5'/>"));
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    }

    #[test]
    fn test_set_deep_escapes() {
        let mut doc = doc();
        doc.set_deep("Prefs/Video/Gamma/#text", "a<b & c").unwrap();
        doc.set_deep("Prefs/Video/Resolution/height", "\"q\"").unwrap();

        let out = doc.serialize();
        assert!(out.contains("<Gamma>a&lt;b &amp; c</Gamma>"));
        assert!(out.contains(r#"height="&quot;q&quot;""#));

        let reparsed = TagDocument::parse(&out, Path::new("prefs.xml")).unwrap();
        assert_eq!(reparsed.get_deep("Prefs/Video/Gamma/#text").unwrap(), "a<b & c");
    }

    #[test]
    fn test_set_deep_does_not_create_nodes() {
        let mut doc = doc();
        assert!(doc.set_deep("Prefs/Video/Resolution/depth", "32").is_err());
        assert!(doc.set_deep("Prefs/Network/port", "1").is_err());
        assert_eq!(doc.serialize(), PREFS);
    }

    #[test]
    fn test_bom_preserved() {
        let content = format!("{}<Prefs a=\"1\"/>", BOM);
        let mut doc = TagDocument::parse(&content, Path::new("p.xml")).unwrap();
        doc.set_deep("Prefs/a", "2").unwrap();

        assert_eq!(doc.serialize(), format!("{}<Prefs a=\"2\"/>", BOM));
    }

    #[test]
    fn test_malformed_xml() {
        let err = TagDocument::parse("<Prefs><Video></Prefs>", Path::new("bad.xml")).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
