//! # 变换流水线错误模型
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载变换链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 变换流水线统一错误类型。
///
/// 该类型会在动作层被上转为 `AppError`，最终转换为用户可见的提示。
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// 输入无法解码为图片。解码失败时不产生任何部分输出，后续阶段不会执行。
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}
