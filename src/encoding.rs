//! 设置文件编码
//!
//! settings.json 中的编码名沿用启动器的写法（`utf-8` / `win1251` / `cp866`），
//! 实际编解码交给 encoding_rs。

use encoding_rs::{Encoding, IBM866, UTF_8, WINDOWS_1251};
use serde::{Deserialize, Serialize};

use crate::utils::{Result, SettingsError};

/// 游戏设置文件支持的编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FileEncoding {
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[default]
    #[serde(rename = "win1251", alias = "windows-1251", alias = "cp1251")]
    Win1251,
    #[serde(rename = "cp866", alias = "ibm866")]
    Cp866,
}

impl FileEncoding {
    /// 从编码名解析（大小写不敏感）
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(FileEncoding::Utf8),
            "win1251" | "windows-1251" | "cp1251" => Some(FileEncoding::Win1251),
            "cp866" | "ibm866" => Some(FileEncoding::Cp866),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileEncoding::Utf8 => "utf-8",
            FileEncoding::Win1251 => "win1251",
            FileEncoding::Cp866 => "cp866",
        }
    }

    fn codec(&self) -> &'static Encoding {
        match self {
            FileEncoding::Utf8 => UTF_8,
            FileEncoding::Win1251 => WINDOWS_1251,
            FileEncoding::Cp866 => IBM866,
        }
    }

    /// 解码原始字节
    ///
    /// 不做 BOM 处理：BOM 作为 `\u{FEFF}` 保留在文本中，写回时原样输出。
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, had_errors) = self.codec().decode_without_bom_handling(bytes);
        if had_errors {
            tracing::warn!("Malformed {} sequences replaced while decoding", self.label());
        }
        text.into_owned()
    }

    /// 编码文本；存在无法用该编码表示的字符时返回校验错误
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let (bytes, _, had_errors) = self.codec().encode(text);
        if had_errors {
            return Err(SettingsError::validation(format!(
                "text contains characters that cannot be encoded as {}",
                self.label()
            )));
        }
        Ok(bytes.into_owned())
    }
}

impl std::fmt::Display for FileEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(FileEncoding::from_label("UTF-8"), Some(FileEncoding::Utf8));
        assert_eq!(FileEncoding::from_label("win1251"), Some(FileEncoding::Win1251));
        assert_eq!(FileEncoding::from_label("cp866"), Some(FileEncoding::Cp866));
        assert_eq!(FileEncoding::from_label("koi8-r"), None);
    }

    #[test]
    fn test_win1251_roundtrip_cyrillic() {
        let bytes = FileEncoding::Win1251.encode("Разрешение=1").unwrap();
        // 'Р' 在 windows-1251 中是单字节 0xD0
        assert_eq!(bytes[0], 0xD0);
        assert_eq!(FileEncoding::Win1251.decode(&bytes), "Разрешение=1");
    }

    #[test]
    fn test_cp866_roundtrip() {
        let bytes = FileEncoding::Cp866.encode("Привет").unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(FileEncoding::Cp866.decode(&bytes), "Привет");
    }

    #[test]
    fn test_utf8_bom_preserved() {
        let raw = b"\xEF\xBB\xBF[Display]\n";
        let text = FileEncoding::Utf8.decode(raw);
        assert!(text.starts_with('\u{FEFF}'));
        assert_eq!(FileEncoding::Utf8.encode(&text).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_unencodable_text() {
        assert!(FileEncoding::Win1251.encode("日本語").is_err());
    }

    #[test]
    fn test_serde_names() {
        let enc: FileEncoding = serde_json::from_str("\"win1251\"").unwrap();
        assert_eq!(enc, FileEncoding::Win1251);
        assert_eq!(serde_json::to_string(&FileEncoding::Utf8).unwrap(), "\"utf-8\"");
    }
}
