//! # 动作分发模块（dispatch）
//!
//! ## 设计思路
//!
//! 将"触发 → 变换 → 汇"的四条动作序列按职责拆分为多个子模块：
//!
//! - `handler`：动作编排（前置条件、忙碌守卫、序列本身）
//! - `upload`：上传服务边界与命名文件包装
//! - `download`：本地保存汇
//! - `clipboard`：系统剪贴板源与汇
//! - `notify`：用户提示协作方接口
//!
//! ## 实现思路
//!
//! 对外仅暴露编排器与各协作方 trait；具体实现（Cloudinary、磁盘、
//! arboard、日志提示）可在组装处自由替换。

mod clipboard;
mod download;
mod handler;
mod notify;
mod upload;

pub use clipboard::{ClipboardSink, ClipboardSource, SystemClipboard};
pub use download::{DiskDownloadSink, DownloadSink};
pub use handler::{Action, ActionDispatcher, ActionOutcome};
pub use notify::{LogNotifier, Notifier, ToastKind};
pub use upload::{CloudinaryUploader, NamedFile, UploadConfig, UploadService};
