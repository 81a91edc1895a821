//! # 会话状态模块
//!
//! ## 设计思路
//!
//! 用显式的 `Session` 对象取代散落各处的全局可变状态：
//! 一次摄入对应一个会话，会话独占一个 `ImageBlob`、一份预览派生数据、
//! 一个忙碌标志和一个 `CancellationScope`。任意时刻至多一个会话存活。
//!
//! ## 实现思路
//!
//! `ingest` 的顺序是正确性关键：先同步取消上一个会话的作用域，
//! 再创建新会话——旧会话的监听器绝不可能与新会话的监听器共存，
//! 迟到的旧回调也无法改写新会话的状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::blob::ImageBlob;
use crate::pipeline::ResizeSettings;
use crate::preview::Dimensions;

use super::cancel::CancellationScope;

/// 预览阶段派生出的会话内状态。
#[derive(Debug, Clone)]
pub(crate) struct PreviewState {
    pub(crate) dimensions: Option<Dimensions>,
    pub(crate) scale: f64,
    pub(crate) resize: Option<ResizeSettings>,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            dimensions: None,
            scale: 1.0,
            resize: None,
        }
    }
}

/// 一次摄入图片的完整状态包，从捕获到销毁。
pub struct Session {
    id: u64,
    blob: ImageBlob,
    busy: AtomicBool,
    scope: CancellationScope,
    preview: Mutex<PreviewState>,
}

impl Session {
    fn new(id: u64, blob: ImageBlob) -> Self {
        Self {
            id,
            blob,
            busy: AtomicBool::new(false),
            scope: CancellationScope::fresh(),
            preview: Mutex::new(PreviewState::default()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn blob(&self) -> &ImageBlob {
        &self.blob
    }

    /// 领取本会话的撤销令牌。
    ///
    /// 动作在挂起点（上传等）之后必须用它判断自己是否已被新会话取代。
    pub fn token(&self) -> CancellationToken {
        self.scope.token()
    }

    pub fn is_superseded(&self) -> bool {
        self.scope.is_cancelled()
    }

    pub(crate) fn cancel_scope(&self) {
        self.scope.cancel();
    }

    /// 尝试进入动作：check-then-set 忙碌标志。
    ///
    /// 返回 `None` 表示已有动作在执行，触发方应静默丢弃本次触发。
    /// 返回的守卫在任意退出路径上（成功/失败/提前返回）恢复空闲。
    pub fn try_begin_action(&self) -> Option<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(BusyGuard { busy: &self.busy })
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.preview_state().dimensions
    }

    pub fn scale(&self) -> f64 {
        self.preview_state().scale
    }

    pub fn resize_settings(&self) -> Option<ResizeSettings> {
        self.preview_state().resize
    }

    pub(crate) fn preview_state(&self) -> PreviewState {
        self.preview
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store_preview_state(&self, state: PreviewState) {
        *self
            .preview
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// 忙碌标志的 RAII 守卫，离开作用域时无条件恢复空闲。
pub struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// 会话生命周期管理器：持有当前会话（若有）。
#[derive(Default)]
pub struct SessionState {
    current: Option<Arc<Session>>,
    next_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 摄入新图片，返回新会话。
    ///
    /// 先同步取消并丢弃上一个会话，再创建新会话——两个会话的监听器
    /// 绝不共存，正在执行的旧动作在下一个挂起点后自行退场。
    pub fn ingest(&mut self, blob: ImageBlob) -> Arc<Session> {
        self.teardown_current();

        self.next_id += 1;
        let session = Arc::new(Session::new(self.next_id, blob));
        log::info!(
            "📋 新会话 #{} 已创建 - {} {} bytes",
            session.id(),
            session.blob().mime(),
            session.blob().len()
        );

        self.current = Some(Arc::clone(&session));
        session
    }

    /// 仅拆除当前会话，不开启新会话。
    pub fn reset(&mut self) {
        self.teardown_current();
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.clone()
    }

    fn teardown_current(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.cancel_scope();
            log::info!("🧹 会话 #{} 已拆除", previous.id());
        }
    }
}
