//! # 变换流水线模块（pipeline）
//!
//! ## 设计思路
//!
//! 纯函数式阶段：`(blob, options) -> blob`。解码、格式转换、缩放、编码
//! 集中在本模块，不触碰会话状态，也不做任何 I/O 分发。
//!
//! - `format`：输出格式枚举与 MIME/扩展名映射
//! - `transform`：解码 → 缩放 → 编码的实际执行
//! - `error`：阶段本地错误类型
//!
//! ## 实现思路
//!
//! 调用链固定为：
//!
//! ```text
//! ActionDispatcher
//!    ↓
//! TransformPipeline::transform（配置快照 + 阶段耗时日志）
//!    ├─ 解码 + 像素上限校验
//!    ├─ 按模式缩放（fast_image_resize，失败回退 imageops）
//!    └─ 编码为目标格式（未指定时保持原格式）
//! ```

mod error;
mod format;
mod transform;

pub use error::TransformError;
pub use format::{extension_for_mime, OutputFormat};
pub use transform::TransformPipeline;

pub(crate) use transform::probe_dimensions;

use image::imageops::FilterType;

/// 缩放设置。
///
/// 不变式：始终由原始尺寸 × 当前缩放系数重新推导，
/// 绝不在上一份设置的基础上累乘，避免多次调整后的舍入漂移。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResizeSettings {
    /// 目标真实宽度（自然分辨率 × 系数）。
    pub resize_width: f64,
    /// 目标真实高度。
    pub resize_height: f64,
    /// 目标显示宽度（渲染盒尺寸 × 系数）。
    pub display_width: f64,
    /// 目标显示高度。
    pub display_height: f64,
}

/// 缩放模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// 按真实宽度缩放，高度按纵横比推导。
    ByWidth,
    /// 按显示尺寸缩放（"超压缩"）：目标是屏上渲染盒而非自然分辨率，
    /// 在渲染盒小于原图时以保真换体积。
    ByDisplayDims,
}

/// 单次变换的全部输入参数。
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// 目标编码格式；未指定时输出保持输入格式。
    pub target_format: Option<OutputFormat>,
    pub resize_mode: ResizeMode,
    pub resize_settings: ResizeSettings,
}

/// 流水线配置。
///
/// `Default` 提供生产可用的平衡配置。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 解码后的像素上限（`width * height`），防恶意输入撑爆内存。
    pub max_decoded_pixels: u64,
    /// JPEG 编码质量（1~100）。
    pub jpeg_quality: u8,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_decoded_pixels: 40_000_000,
            jpeg_quality: 85,
            resize_filter: FilterType::Triangle,
        }
    }
}
