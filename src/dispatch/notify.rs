//! # 用户提示协作方接口
//!
//! 提示的具体呈现（toast 组件、样式）在系统边界之外，
//! 本模块只定义派发接口与一个日志后端的默认实现。

/// 提示级别，对应前端 toast 的三种样式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Danger,
}

/// 提示协作方：toast 与上传结果 URL 的发布出口。
pub trait Notifier: Send + Sync {
    fn toast(&self, kind: ToastKind, message: &str);

    /// 发布上传成功返回的 URL。仅在所属会话仍然存活时被调用。
    fn publish_url(&self, url: &str);
}

/// 日志后端的默认实现：无 UI 场景（REPL/服务）直接落到 log。
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Info => log::info!("🔔 {}", message),
            ToastKind::Success => log::info!("✅ {}", message),
            ToastKind::Danger => log::error!("❌ {}", message),
        }
    }

    fn publish_url(&self, url: &str) {
        log::info!("🔗 上传地址: {}", url);
    }
}
