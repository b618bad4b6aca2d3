mod line;
mod sectional;
mod tag;


pub use line::{line_pattern, LineDocument};
pub use sectional::{IniDocument, IniSection};
pub use tag::{Element, TagDocument, TEXT_CONTENT};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoding::FileEncoding;
use crate::schema::ParameterItem;
use crate::utils::Result;

/// 设置文件的结构类型（settings.json 中的 `view` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileView {
    /// 带 `[section]` 的 INI
    Sectional,
    /// 无分节、逐行 `set <name> to <value>` 的配置
    Line,
    /// 标签/属性树（XML）
    Tag,
}

impl FileView {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileView::Sectional => "sectional",
            FileView::Line => "line",
            FileView::Tag => "tag",
        }
    }
}

impl std::fmt::Display for FileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从文件中解析出的一个选项值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    /// 选项名（按文件中的实际写法生成）
    pub name: String,
    pub value: String,
}

/// 格式适配器对已解析文件提供的统一操作
///
/// 提取引擎和写回引擎只通过这个 trait 访问文件内容，
/// 具体格式由文件的 `view` 决定。
pub trait SettingsDocument {
    /// 按参数条目声明的位置查找当前值
    fn resolve(&self, item: &ParameterItem) -> Result<ResolvedValue>;

    /// 按选项名定位并修改已有的值（不新增节点）
    fn apply(&mut self, option_name: &str, value: &str) -> Result<()>;

    /// 序列化为文本，未修改的部分保持原样
    fn serialize(&self) -> String;
}

/// 文本中的一行及其换行符
///
/// 换行符单独保存（`\n`、`\r\n` 或最后一行的空串），保证原样写回。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    pub eol: String,
}

/// 按行拆分文本，保留每行原本的换行符
pub(crate) fn split_lines(content: &str) -> Vec<TextLine> {
    content
        .split_inclusive('\n')
        .map(|raw| {
            if let Some(text) = raw.strip_suffix("\r\n") {
                TextLine { text: text.to_string(), eol: "\r\n".to_string() }
            } else if let Some(text) = raw.strip_suffix('\n') {
                TextLine { text: text.to_string(), eol: "\n".to_string() }
            } else {
                TextLine { text: raw.to_string(), eol: String::new() }
            }
        })
        .collect()
}

pub(crate) fn push_lines(out: &mut String, lines: &[TextLine]) {
    for line in lines {
        out.push_str(&line.text);
        out.push_str(&line.eol);
    }
}

/// 某个格式适配器解析后的文件对象
///
/// 对象由提取阶段创建并一直保留，写回阶段只在其上定位并修改已有节点。
#[derive(Debug, Clone)]
pub enum ParsedFile {
    Sectional(IniDocument),
    Line(LineDocument),
    Tag(TagDocument),
}

impl ParsedFile {
    /// 按 `view` 选择适配器解析文本
    pub fn parse(content: &str, view: FileView, path: &Path) -> Result<Self> {
        Ok(match view {
            FileView::Sectional => ParsedFile::Sectional(IniDocument::parse(content)),
            FileView::Line => ParsedFile::Line(LineDocument::parse(content)),
            FileView::Tag => ParsedFile::Tag(TagDocument::parse(content, path)?),
        })
    }

    /// 解码原始字节后解析
    pub fn from_bytes(bytes: &[u8], view: FileView, encoding: FileEncoding, path: &Path) -> Result<Self> {
        Self::parse(&encoding.decode(bytes), view, path)
    }

    /// 序列化并编码为原始字节
    pub fn to_bytes(&self, encoding: FileEncoding) -> Result<Vec<u8>> {
        encoding.encode(&self.serialize())
    }

    pub fn view(&self) -> FileView {
        match self {
            ParsedFile::Sectional(_) => FileView::Sectional,
            ParsedFile::Line(_) => FileView::Line,
            ParsedFile::Tag(_) => FileView::Tag,
        }
    }

    fn document(&self) -> &dyn SettingsDocument {
        match self {
            ParsedFile::Sectional(doc) => doc,
            ParsedFile::Line(doc) => doc,
            ParsedFile::Tag(doc) => doc,
        }
    }

    fn document_mut(&mut self) -> &mut dyn SettingsDocument {
        match self {
            ParsedFile::Sectional(doc) => doc,
            ParsedFile::Line(doc) => doc,
            ParsedFile::Tag(doc) => doc,
        }
    }
}

impl SettingsDocument for ParsedFile {
    fn resolve(&self, item: &ParameterItem) -> Result<ResolvedValue> {
        self.document().resolve(item)
    }

    fn apply(&mut self, option_name: &str, value: &str) -> Result<()> {
        self.document_mut().apply(option_name, value)
    }

    fn serialize(&self) -> String {
        self.document().serialize()
    }
}
