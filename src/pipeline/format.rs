//! # 输出格式与 MIME 映射
//!
//! ## 设计思路
//!
//! 用显式枚举代替到处散落的 MIME 字符串分支：
//! - `OutputFormat` 表示用户可选择的目标编码格式
//! - 扩展名查表覆盖全部已知图片 MIME，未知类型统一回退 `bin`

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::TransformError;

/// 用户可选择的目标编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    /// 从外部字符串解析格式。
    pub fn from_str(format: &str) -> Result<Self, TransformError> {
        match format.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(TransformError::InvalidFormat(format!(
                "未知输出格式：{}（可选：png / jpeg / webp）",
                other
            ))),
        }
    }

    /// 输出为稳定字符串，供展示与持久化。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// 从 MIME 类型反查格式（仅限可编码的三种）。
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Webp => image::ImageFormat::WebP,
        }
    }
}

static MIME_EXTENSIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("image/jpeg", "jpg"),
        ("image/png", "png"),
        ("image/webp", "webp"),
        ("image/gif", "gif"),
        ("image/bmp", "bmp"),
        ("image/svg+xml", "svg"),
        ("image/tiff", "tiff"),
        ("image/x-icon", "ico"),
    ])
});

/// MIME → 文件扩展名查表，未知类型回退 `bin`。
pub fn extension_for_mime(mime: &str) -> &'static str {
    MIME_EXTENSIONS.get(mime).copied().unwrap_or("bin")
}
