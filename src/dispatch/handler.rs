//! # 动作编排模块
//!
//! ## 设计思路
//!
//! `ActionDispatcher` 把离散触发（按钮、键位组合）映射为四种动作序列，
//! 每个序列都是"变换流水线 + 一个汇"的组合。协作方（上传、落盘、
//! 剪贴板、提示）全部以 trait 注入，测试可替换为录制桩。
//!
//! ## 实现思路
//!
//! 每个动作的入口顺序固定：
//! 1. 前置条件：存在活跃会话——否则提示"无图片"并返回前置错误，零 I/O
//! 2. 忙碌标志 check-then-set：占用中则静默丢弃（不排队）
//! 3. 执行序列；忙碌标志由 RAII 守卫在一切退出路径上复位
//!
//! 上传在挂起点之后回来时校验会话令牌：被新摄入取代的上传照常跑完，
//! 但其 URL 绝不接入新会话的状态。

use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::pipeline::{OutputFormat, ResizeMode, TransformOptions, TransformPipeline};
use crate::session::Session;
use crate::settings::SettingsStore;

use super::clipboard::ClipboardSink;
use super::download::DownloadSink;
use super::notify::{Notifier, ToastKind};
use super::upload::{NamedFile, UploadService};

/// 可触发的动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upload,
    Download,
    RawDownload,
    ClipboardCopy,
}

/// 单次触发的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// 同会话已有动作在执行，本次触发被静默丢弃。
    DroppedBusy,
}

/// 动作编排器。
pub struct ActionDispatcher<U, D, C, N> {
    pipeline: TransformPipeline,
    uploader: U,
    downloads: D,
    clipboard: C,
    notifier: N,
    settings: Arc<SettingsStore>,
}

impl<U, D, C, N> ActionDispatcher<U, D, C, N>
where
    U: UploadService,
    D: DownloadSink,
    C: ClipboardSink,
    N: Notifier,
{
    pub fn new(
        pipeline: TransformPipeline,
        uploader: U,
        downloads: D,
        clipboard: C,
        notifier: N,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            pipeline,
            uploader,
            downloads,
            clipboard,
            notifier,
            settings,
        }
    }

    /// 动作统一入口。
    ///
    /// 无会话时提示并返回 `Precondition`；其余失败在此边界转换为
    /// 用户提示后返回，不向全局逃逸。
    pub async fn dispatch(
        &self,
        session: Option<&Arc<Session>>,
        action: Action,
    ) -> Result<ActionOutcome, AppError> {
        let Some(session) = session else {
            self.notifier.toast(ToastKind::Danger, "No image found");
            return Err(AppError::Precondition);
        };

        let start = Instant::now();
        let result = match action {
            Action::Upload => self.upload(session).await,
            Action::Download => self.download(session),
            Action::RawDownload => self.download_raw(session),
            Action::ClipboardCopy => self.copy_to_clipboard(session).await,
        };

        match &result {
            Ok(outcome) => log::info!(
                "✅ 动作 {:?} 完成 - outcome={:?} total={}ms",
                action,
                outcome,
                start.elapsed().as_millis()
            ),
            Err(err) => {
                // 过期会话的失败与成功同样被抑制，不打扰新会话
                if session.is_superseded() {
                    log::info!("⏭️ 会话 #{} 已被取代，丢弃过期错误提示: {}", session.id(), err);
                } else {
                    self.notifier.toast(ToastKind::Danger, &err.to_string());
                }
                log::warn!("⚠️ 动作 {:?} 失败: {}", action, err);
            }
        }

        result
    }

    async fn upload(&self, session: &Session) -> Result<ActionOutcome, AppError> {
        let Some(_guard) = session.try_begin_action() else {
            log::debug!("会话 #{} 忙碌中，丢弃 Upload 触发", session.id());
            return Ok(ActionOutcome::DroppedBusy);
        };

        self.notifier.toast(ToastKind::Info, "Compressing image...");
        let options = self.transform_options(session);
        let transformed = self.pipeline.transform(session.blob(), &options)?;
        self.notify_blob_size(transformed.len());

        self.notifier.toast(ToastKind::Info, "Uploading image...");
        let token = session.token();
        let file = NamedFile::for_blob(&transformed);
        let url = self.uploader.upload(file).await?;

        // 挂起点之后：会话可能已被新摄入取代，过期结果不得接入新状态
        if token.is_cancelled() {
            log::info!("⏭️ 会话 #{} 已被取代，丢弃过期上传结果", session.id());
        } else {
            self.notifier.publish_url(&url);
            self.notifier.toast(ToastKind::Success, "Uploaded Image!");
        }

        Ok(ActionOutcome::Completed)
    }

    fn download(&self, session: &Session) -> Result<ActionOutcome, AppError> {
        let Some(_guard) = session.try_begin_action() else {
            log::debug!("会话 #{} 忙碌中，丢弃 Download 触发", session.id());
            return Ok(ActionOutcome::DroppedBusy);
        };

        self.notifier.toast(ToastKind::Info, "Downloading image...");
        let options = self.transform_options(session);
        let transformed = self.pipeline.transform(session.blob(), &options)?;
        self.notify_blob_size(transformed.len());

        self.downloads.save(&transformed)?;
        self.notifier.toast(ToastKind::Success, "Downloaded Image!");
        Ok(ActionOutcome::Completed)
    }

    /// 跳过变换流水线，原样保存摄入时的字节。
    fn download_raw(&self, session: &Session) -> Result<ActionOutcome, AppError> {
        let Some(_guard) = session.try_begin_action() else {
            log::debug!("会话 #{} 忙碌中，丢弃 RawDownload 触发", session.id());
            return Ok(ActionOutcome::DroppedBusy);
        };

        self.notifier.toast(ToastKind::Info, "Downloading image...");
        self.notify_blob_size(session.blob().len());

        self.downloads.save(session.blob())?;
        self.notifier.toast(ToastKind::Success, "Downloaded Image!");
        Ok(ActionOutcome::Completed)
    }

    async fn copy_to_clipboard(&self, session: &Session) -> Result<ActionOutcome, AppError> {
        let Some(_guard) = session.try_begin_action() else {
            log::debug!("会话 #{} 忙碌中，丢弃 ClipboardCopy 触发", session.id());
            return Ok(ActionOutcome::DroppedBusy);
        };

        self.notifier.toast(ToastKind::Info, "Copying image...");
        let options = self.transform_options(session);
        let transformed = self.pipeline.transform(session.blob(), &options)?;

        // 剪贴板只保证支持 PNG，非 PNG 结果在本动作内转码
        let payload = if transformed.mime() == OutputFormat::Png.mime() {
            transformed
        } else {
            self.pipeline.convert_to_png(&transformed)?
        };

        self.clipboard.write_image(&payload).await?;
        self.notifier.toast(ToastKind::Success, "Copied to clipboard!");
        Ok(ActionOutcome::Completed)
    }

    /// 从持久化偏好与会话当前设置组装单次变换参数。
    fn transform_options(&self, session: &Session) -> TransformOptions {
        let resize_mode = if self.settings.should_super_compress() {
            ResizeMode::ByDisplayDims
        } else {
            ResizeMode::ByWidth
        };

        TransformOptions {
            target_format: self.settings.download_type(),
            resize_mode,
            resize_settings: session.resize_settings().unwrap_or_default(),
        }
    }

    fn notify_blob_size(&self, len: usize) {
        self.notifier
            .toast(ToastKind::Info, &format!("Blob size: {} bytes", len));
    }
}
