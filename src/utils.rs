use thiserror::Error;
use std::path::PathBuf;

/// 自定义错误类型
///
/// 分类与设置流水线的错误模型对应：找不到（文件/节/键/标签/属性）、
/// 校验（schema 或配置本身有问题）、读写（IO 失败）以及应用层不变量被破坏。
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Section \"{section}\" not found")]
    SectionNotFound { section: String },

    #[error("Key \"{key}\" not found in section \"{section}\"")]
    KeyNotFound { section: String, key: String },

    #[error("No \"set {name} to ...\" line found")]
    LinePatternNotFound { name: String },

    #[error("Tag \"{tag}\" not found")]
    TagNotFound { tag: String },

    #[error("Attribute \"{attribute}\" not found in tag \"{tag}\"")]
    AttributeNotFound { tag: String, attribute: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Read/write error: {source}. Path: '{}'", path.display())]
    ReadWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Application error: {message}")]
    Application { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SettingsError {
    pub fn validation(message: impl Into<String>) -> Self {
        SettingsError::Validation { message: message.into() }
    }

    pub fn application(message: impl Into<String>) -> Self {
        SettingsError::Application { message: message.into() }
    }

    /// 将 IO 错误包装为带路径的读写错误，文件不存在时单独归类
    pub fn read_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            SettingsError::FileNotFound { path }
        } else {
            SettingsError::ReadWrite { path, source }
        }
    }

    /// 是否属于“找不到”一类
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SettingsError::FileNotFound { .. }
                | SettingsError::SectionNotFound { .. }
                | SettingsError::KeyNotFound { .. }
                | SettingsError::LinePatternNotFound { .. }
                | SettingsError::TagNotFound { .. }
                | SettingsError::AttributeNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// 字符串中小数点后的位数（没有小数点时为 0）
pub fn decimal_places(text: &str) -> usize {
    text.trim()
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

/// 按位数格式化数值；0 位时先四舍五入，保证整数参数不会出现小数部分
pub fn format_number(value: f64, places: usize) -> String {
    if places == 0 {
        // 加 0.0 去掉负零
        format!("{:.0}", value.round() + 0.0)
    } else {
        format!("{:.*}", places, value)
    }
}

/// 将数值限制在 `[min, max]` 区间内
pub fn clamp_to_range(value: f64, min: f64, max: f64) -> f64 {
    if min > max {
        return value;
    }
    value.clamp(min, max)
}

/// 解析数值字符串（允许首尾空白）
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places("1.50"), 2);
        assert_eq!(decimal_places("2"), 0);
        assert_eq!(decimal_places(" 0.0001 "), 4);
        assert_eq!(decimal_places("1."), 0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0, 2), "2.00");
        assert_eq!(format_number(2.7, 0), "3");
        assert_eq!(format_number(-1.5, 1), "-1.5");
        assert_eq!(format_number(0.1 + 0.2, 3), "0.300");
    }

    #[test]
    fn test_format_number_whole_values() {
        assert_eq!(format_number(1e20, 0), "100000000000000000000");
        assert_eq!(format_number(-2.5, 0), "-3");
        assert_eq!(format_number(-0.4, 0), "0");
    }

    #[test]
    fn test_clamp_to_range() {
        assert_eq!(clamp_to_range(15.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp_to_range(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp_to_range(5.0, 0.0, 10.0), 5.0);
        // 区间无效时不做限制
        assert_eq!(clamp_to_range(5.0, 10.0, 0.0), 5.0);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("1920x1080"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_read_write_not_found() {
        let err = SettingsError::read_write(
            "a.ini",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.is_not_found());
        assert!(matches!(err, SettingsError::FileNotFound { .. }));

        let err = SettingsError::read_write(
            "a.ini",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
    }
}
