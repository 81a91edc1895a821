//! # 会话与取消模块（session）
//!
//! - `state`：`Session` / `SessionState`，一次摄入一个会话的生命周期
//! - `cancel`：`CancellationScope`，会话级可撤销注册上下文

mod cancel;
mod state;

pub use cancel::CancellationScope;
pub use state::{BusyGuard, Session, SessionState};

pub(crate) use state::PreviewState;
