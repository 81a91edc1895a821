//! # 系统剪贴板源与汇
//!
//! ## 设计思路
//!
//! 与操作系统剪贴板的交互独立成模块，隔离平台不稳定因素。
//! 读方向：剪贴板 RGBA → PNG 字节（进入链路的 blob 一律是编码后的字节）。
//! 写方向：PNG blob → RGBA → `arboard` 写入，失败时有限重试。
//! `arboard` 是阻塞式 API，写方向的重试循环整体放在阻塞线程池上执行，
//! 不占用异步执行器的工作线程。
//!
//! 剪贴板图片只保证支持 PNG；非 PNG 的转码由复制动作在调用前完成，
//! 不属于本模块职责。

use std::borrow::Cow;
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::blob::ImageBlob;
use crate::error::AppError;

/// 剪贴板读取源。必须在用户手势的直接响应中调用。
pub trait ClipboardSource {
    /// 读取剪贴板中的图片；无图片类条目时返回 `Ok(None)`。
    fn read_image(&self) -> Result<Option<ImageBlob>, AppError>;
}

/// 剪贴板写入汇。只保证 PNG 被支持。
pub trait ClipboardSink: Send + Sync {
    fn write_image(&self, blob: &ImageBlob) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// `arboard` 后端的系统剪贴板。
pub struct SystemClipboard {
    retries: u32,
    retry_delay: Duration,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_image(&self) -> Result<Option<ImageBlob>, AppError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| AppError::ClipboardUnavailable(format!("初始化剪贴板失败: {}", e)))?;

        let image = match clipboard.get_image() {
            Ok(image) => image,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e) => {
                return Err(AppError::ClipboardUnavailable(format!(
                    "读取剪贴板失败: {}",
                    e
                )))
            }
        };

        let rgba = RgbaImage::from_raw(
            image.width as u32,
            image.height as u32,
            image.bytes.into_owned(),
        )
        .ok_or_else(|| {
            AppError::ClipboardUnavailable("剪贴板像素数据长度异常".to_string())
        })?;

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| {
                AppError::ClipboardUnavailable(format!("剪贴板图片编码失败: {}", e))
            })?;

        log::info!("📥 已从剪贴板读取图片 ({} bytes PNG)", cursor.get_ref().len());
        Ok(Some(ImageBlob::new(cursor.into_inner(), "image/png")))
    }
}

impl ClipboardSink for SystemClipboard {
    async fn write_image(&self, blob: &ImageBlob) -> Result<(), AppError> {
        let decoded = image::load_from_memory(blob.bytes())
            .map_err(|e| AppError::ClipboardUnavailable(format!("图片解码失败: {}", e)))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let bytes = decoded.into_raw();

        let retries = self.retries;
        let retry_delay = self.retry_delay;

        // 重试循环含阻塞 I/O 与退避休眠，整体移交阻塞线程池
        tokio::task::spawn_blocking(move || {
            let mut last_error = None;
            for attempt in 1..=retries {
                let result = arboard::Clipboard::new().and_then(|mut clipboard| {
                    clipboard.set_image(arboard::ImageData {
                        width: width as usize,
                        height: height as usize,
                        bytes: Cow::Borrowed(&bytes),
                    })
                });

                match result {
                    Ok(()) => {
                        log::info!("📤 已写入剪贴板 {}x{} (尝试 {})", width, height, attempt);
                        return Ok(());
                    }
                    Err(e) => {
                        log::warn!("⚠️ 剪贴板写入失败（尝试 {}/{}）: {}", attempt, retries, e);
                        last_error = Some(e);
                        if attempt < retries {
                            std::thread::sleep(retry_delay);
                        }
                    }
                }
            }

            Err(AppError::ClipboardUnavailable(format!(
                "剪贴板写入重试耗尽: {}",
                last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            )))
        })
        .await
        .map_err(|e| AppError::ClipboardUnavailable(format!("剪贴板写入任务中止: {}", e)))?
    }
}
