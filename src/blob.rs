//! # 图片数据模型
//!
//! ## 设计思路
//!
//! `ImageBlob` 是整条链路的不可变数据载体：一次摄入产生一个新实例，
//! 后续阶段只读取、从不修改。底层使用 `bytes::Bytes`，克隆为引用计数，
//! 避免在"预览 → 变换 → 分发"各阶段重复拷贝字节。

use bytes::Bytes;

/// 不可变图片数据：字节 + MIME 类型。
///
/// 每次摄入（粘贴/选择文件）都会生成全新实例替换旧实例，绝不原地修改。
#[derive(Debug, Clone)]
pub struct ImageBlob {
    bytes: Bytes,
    mime: String,
}

impl ImageBlob {
    /// 以已知 MIME 类型构造。
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    /// 从字节嗅探 MIME 类型构造。
    ///
    /// 嗅探失败时回退为 `application/octet-stream`，
    /// 由后续解码阶段给出真正的错误。
    pub fn sniffed(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let mime = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self { bytes, mime }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 引用计数克隆底层字节，无深拷贝。
    pub fn clone_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// 字节长度（用于体积提示与上限校验）。
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
