//! # 预览控制模块
//!
//! ## 设计思路
//!
//! 摄入时探测一次基础尺寸（自然分辨率 + 渲染盒尺寸），之后每次调整
//! 缩放系数都从这份原始尺寸重新推导 `ResizeSettings`——绝不在上一份
//! 设置上累乘，连续多次调整不会产生舍入漂移。
//!
//! 渲染盒尺寸由渲染协作方（`DisplayMetrics`）量取，本模块不做任何渲染。
//!
//! ## 实现思路
//!
//! - `initialize`：header 级探测自然宽高（复用流水线的探测，不完整解码），
//!   以缩放系数 1 生成初始设置
//! - `set_scale` / `set_scale_input`：非法输入（非数字、非正、非有限）
//!   一律视为无操作，保持现有设置，不向下游传播错误

use crate::pipeline::{self, ResizeSettings, TransformError};
use crate::session::{PreviewState, Session};

/// 基础尺寸：摄入时在缩放系数 1 下捕获一次，此后只读。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub natural_width: u32,
    pub natural_height: u32,
    pub display_width: f64,
    pub display_height: f64,
}

/// 渲染协作方接口：量取图片在界面上的渲染盒尺寸。
pub trait DisplayMetrics {
    fn rendered_box(&self, natural_width: u32, natural_height: u32) -> (f64, f64);
}

/// 固定视口：按最长边等比缩入 `max_edge`，不放大。
///
/// 无真实渲染器的驱动场景（REPL、测试）用它充当量取方。
pub struct FixedViewport {
    pub max_edge: f64,
}

impl DisplayMetrics for FixedViewport {
    fn rendered_box(&self, natural_width: u32, natural_height: u32) -> (f64, f64) {
        let width = natural_width as f64;
        let height = natural_height as f64;
        let scale = (self.max_edge / width).min(self.max_edge / height).min(1.0);
        (width * scale, height * scale)
    }
}

/// 预览控制器：基础尺寸探测 + 缩放设置派生。
pub struct PreviewController;

impl PreviewController {
    /// 初始化会话预览：探测自然尺寸、量取渲染盒，按系数 1 生成初始设置。
    pub fn initialize(
        &self,
        session: &Session,
        metrics: &dyn DisplayMetrics,
    ) -> Result<Dimensions, TransformError> {
        let (natural_width, natural_height) = pipeline::probe_dimensions(session.blob().bytes())?;
        let (display_width, display_height) = metrics.rendered_box(natural_width, natural_height);

        let dimensions = Dimensions {
            natural_width,
            natural_height,
            display_width,
            display_height,
        };

        session.store_preview_state(PreviewState {
            dimensions: Some(dimensions),
            scale: 1.0,
            resize: Some(derive_settings(&dimensions, 1.0)),
        });

        log::info!(
            "🖼️ 预览初始化 - 会话 #{} 自然 {}x{} 显示 {:.0}x{:.0}",
            session.id(),
            natural_width,
            natural_height,
            display_width,
            display_height
        );

        Ok(dimensions)
    }

    /// 设置缩放系数并重新派生设置。
    ///
    /// 非法系数（非有限或 ≤ 0）为无操作，返回现有设置。
    /// 预览尚未初始化时返回 `None`。
    pub fn set_scale(&self, session: &Session, factor: f64) -> Option<ResizeSettings> {
        let mut state = session.preview_state();
        let dimensions = state.dimensions?;

        if !factor.is_finite() || factor <= 0.0 {
            return state.resize;
        }

        let settings = derive_settings(&dimensions, factor);
        state.scale = factor;
        state.resize = Some(settings);
        session.store_preview_state(state);

        Some(settings)
    }

    /// 从原始字符串输入设置缩放系数。解析失败为无操作。
    pub fn set_scale_input(&self, session: &Session, raw: &str) -> Option<ResizeSettings> {
        match raw.trim().parse::<f64>() {
            Ok(factor) => self.set_scale(session, factor),
            Err(_) => session.resize_settings(),
        }
    }

    /// 真实/显示尺寸反馈标签，数值整数向下取整。
    pub fn dimension_label(&self, session: &Session) -> Option<String> {
        let settings = session.resize_settings()?;
        Some(format!(
            "Real Dims: {} x {} \n Display Dims: {} x {}",
            settings.resize_width.floor() as i64,
            settings.resize_height.floor() as i64,
            settings.display_width.floor() as i64,
            settings.display_height.floor() as i64,
        ))
    }
}

/// 由原始尺寸 × 系数推导设置。所有调用点共用这一处乘法。
fn derive_settings(dimensions: &Dimensions, factor: f64) -> ResizeSettings {
    ResizeSettings {
        resize_width: dimensions.natural_width as f64 * factor,
        resize_height: dimensions.natural_height as f64 * factor,
        display_width: dimensions.display_width * factor,
        display_height: dimensions.display_height * factor,
    }
}
