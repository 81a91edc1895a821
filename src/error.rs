//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)` 等不一致模式。
//!
//! 每个动作边界自行捕获失败并转换为用户可见提示，
//! 不允许任何错误逃逸到未处理的全局状态。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `TransformError` 提供 `From` 转换，无需手动 map。

use crate::pipeline::TransformError;

/// 应用级统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 启动期致命配置错误（缺少上传凭据等），不属于单次调用的失败。
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 变换流水线错误（解码 / 编码 / 资源限制），会话保持可用。
    #[error("{0}")]
    Transform(#[from] TransformError),

    /// 网络/上传服务失败，可通过再次触发动作重试。
    #[error("网络错误: {0}")]
    Network(String),

    /// 剪贴板不可用（权限被拒或内容为空）。
    #[error("剪贴板不可用: {0}")]
    ClipboardUnavailable(String),

    /// 动作前置条件不满足：当前无已加载图片。不执行任何 I/O。
    #[error("未加载图片")]
    Precondition,

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 存储目录或设置文件不可用
    #[error("存储不可用: {0}")]
    Storage(String),
}
