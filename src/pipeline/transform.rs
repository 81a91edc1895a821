//! # 解码与变换执行模块
//!
//! ## 设计思路
//!
//! 将"字节 → 图像 → 字节"的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//! 输入 blob 只读，输出永远是新分配的 blob；解码失败不产生任何部分输出。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸，按像素上限快速拒绝
//! 2. 完整解码
//! 3. 按缩放模式计算目标尺寸并缩放（fast_image_resize，失败回退 imageops）
//! 4. 编码为目标格式（未指定时保持输入格式）

use std::io::Cursor;
use std::time::Instant;

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba};

use crate::blob::ImageBlob;

use super::{OutputFormat, PipelineConfig, ResizeMode, TransformError, TransformOptions};

/// 仅通过内存中的图片头信息读取宽高。
///
/// 用于在完整解码前做像素限制检查，预览初始化也复用此探测。
pub(crate) fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), TransformError> {
    let cursor = Cursor::new(bytes);
    let reader = image::ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| TransformError::Decode(format!("无法读取图片尺寸：{}", e)))
}

/// 变换流水线：纯阶段，无共享可变状态。
pub struct TransformPipeline {
    config: PipelineConfig,
}

impl TransformPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// 执行完整变换：解码 → 缩放 → 编码。
    ///
    /// 输出 MIME 与目标格式一致；未指定目标格式时保持输入格式。
    pub fn transform(
        &self,
        blob: &ImageBlob,
        options: &TransformOptions,
    ) -> Result<ImageBlob, TransformError> {
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let (decoded, source_format) = self.decode(blob)?;
        let decode_elapsed = decode_start.elapsed();

        let resize_start = Instant::now();
        let resized = self.resize_for_options(decoded, options)?;
        let resize_elapsed = resize_start.elapsed();

        let (format, mime) = match options.target_format {
            Some(target) => (target.image_format(), target.mime().to_string()),
            None => (source_format, blob.mime().to_string()),
        };

        let encode_start = Instant::now();
        let bytes = self.encode(&resized, format)?;
        let encode_elapsed = encode_start.elapsed();

        let (width, height) = resized.dimensions();
        log::info!(
            "✅ 变换完成 - decode={}ms resize={}ms encode={}ms total={}ms 输出: {} {}x{} {}KB",
            decode_elapsed.as_millis(),
            resize_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis(),
            mime,
            width,
            height,
            bytes.len() / 1024
        );

        Ok(ImageBlob::new(bytes, mime))
    }

    /// 专用 PNG 转换：供剪贴板复制动作使用。
    ///
    /// 系统剪贴板仅保证支持 PNG，非 PNG 输入在此转码；
    /// 已是 PNG 时直接引用计数克隆，无重新编码开销。
    pub fn convert_to_png(&self, blob: &ImageBlob) -> Result<ImageBlob, TransformError> {
        if blob.mime() == OutputFormat::Png.mime() {
            return Ok(blob.clone());
        }

        let (decoded, _) = self.decode(blob)?;
        let bytes = self.encode(&decoded, ImageFormat::Png)?;
        Ok(ImageBlob::new(bytes, OutputFormat::Png.mime()))
    }

    fn decode(&self, blob: &ImageBlob) -> Result<(DynamicImage, ImageFormat), TransformError> {
        let (header_width, header_height) = probe_dimensions(blob.bytes())?;
        self.validate_pixel_limits(header_width, header_height)?;

        let format = image::guess_format(blob.bytes())
            .map_err(|e| TransformError::Decode(format!("不支持的图片格式：{}", e)))?;

        let decoded = image::load_from_memory(blob.bytes())
            .map_err(|e| TransformError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        self.validate_pixel_limits(width, height)?;

        Ok((decoded, format))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), TransformError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| TransformError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > self.config.max_decoded_pixels {
            return Err(TransformError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    /// 按缩放模式计算目标尺寸并执行缩放。
    ///
    /// `ByDisplayDims` 精确拉伸到显示盒；`ByWidth` 按宽度缩放、高度随纵横比推导。
    /// 未初始化的设置（目标小于 1 像素）视为不缩放。
    fn resize_for_options(
        &self,
        image: DynamicImage,
        options: &TransformOptions,
    ) -> Result<DynamicImage, TransformError> {
        let (src_width, src_height) = image.dimensions();
        let settings = &options.resize_settings;

        let target = match options.resize_mode {
            ResizeMode::ByDisplayDims => {
                if settings.display_width < 1.0 || settings.display_height < 1.0 {
                    None
                } else {
                    Some((
                        settings.display_width.floor() as u32,
                        settings.display_height.floor() as u32,
                    ))
                }
            }
            ResizeMode::ByWidth => {
                if settings.resize_width < 1.0 {
                    None
                } else {
                    let width = settings.resize_width.floor() as u32;
                    let height = ((width as f64) * (src_height as f64) / (src_width as f64))
                        .round()
                        .max(1.0) as u32;
                    Some((width, height))
                }
            }
        };

        let Some((target_width, target_height)) = target else {
            return Ok(image);
        };

        if (target_width, target_height) == (src_width, src_height) {
            return Ok(image);
        }

        // 目标尺寸与输入尺寸同受像素上限约束：合法的巨大缩放系数
        // 在此拒绝，而不是放行到缩放缓冲的分配
        self.validate_pixel_limits(target_width, target_height)?;

        match Self::resize_with_fast_image_resize(
            &image,
            target_width,
            target_height,
            self.config.resize_filter,
        ) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
                Ok(image.resize_exact(target_width, target_height, self.config.resize_filter))
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: image::imageops::FilterType,
    ) -> Result<DynamicImage, TransformError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| TransformError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| TransformError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| TransformError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
        match filter {
            image::imageops::FilterType::Nearest => fr::FilterType::Box,
            image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
            image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
            image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
            image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, TransformError> {
        let mut cursor = Cursor::new(Vec::new());

        if format == ImageFormat::Jpeg {
            // JPEG 不支持透明通道，先落到 RGB 再按配置质量编码
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut cursor,
                self.config.jpeg_quality,
            );
            rgb.write_with_encoder(encoder)
                .map_err(|e| TransformError::Encode(format!("JPEG 编码失败：{}", e)))?;
        } else {
            image
                .write_to(&mut cursor, format)
                .map_err(|e| TransformError::Encode(format!("图片编码失败：{}", e)))?;
        }

        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ResizeSettings;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = DynamicImage::ImageRgba8(img);
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn pipeline() -> TransformPipeline {
        TransformPipeline::new(PipelineConfig::default())
    }

    fn settings(resize_width: f64, display: (f64, f64)) -> ResizeSettings {
        ResizeSettings {
            resize_width,
            resize_height: 0.0,
            display_width: display.0,
            display_height: display.1,
        }
    }

    #[test]
    fn jpeg_by_width_produces_requested_width() {
        let blob = ImageBlob::new(create_png_bytes(400, 200), "image/png");
        let options = TransformOptions {
            target_format: Some(OutputFormat::Jpeg),
            resize_mode: ResizeMode::ByWidth,
            resize_settings: settings(100.0, (0.0, 0.0)),
        };

        let out = pipeline()
            .transform(&blob, &options)
            .expect("transform should succeed");

        assert_eq!(out.mime(), "image/jpeg");
        let decoded = image::load_from_memory(out.bytes()).expect("output should decode");
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn display_dims_mode_stretches_to_target_box() {
        let blob = ImageBlob::new(create_png_bytes(400, 200), "image/png");
        let options = TransformOptions {
            target_format: None,
            resize_mode: ResizeMode::ByDisplayDims,
            resize_settings: settings(0.0, (50.0, 30.0)),
        };

        let out = pipeline()
            .transform(&blob, &options)
            .expect("transform should succeed");

        let decoded = image::load_from_memory(out.bytes()).expect("output should decode");
        assert_eq!((decoded.width(), decoded.height()), (50, 30));
    }

    #[test]
    fn mime_preserved_when_no_target_format() {
        let blob = ImageBlob::new(create_png_bytes(64, 64), "image/png");
        let options = TransformOptions {
            target_format: None,
            resize_mode: ResizeMode::ByWidth,
            resize_settings: settings(32.0, (0.0, 0.0)),
        };

        let out = pipeline()
            .transform(&blob, &options)
            .expect("transform should succeed");
        assert_eq!(out.mime(), "image/png");
    }

    #[test]
    fn undecodable_input_fails_with_decode_error() {
        let blob = ImageBlob::new(vec![0u8; 32], "image/png");
        let options = TransformOptions {
            target_format: Some(OutputFormat::Png),
            resize_mode: ResizeMode::ByWidth,
            resize_settings: settings(100.0, (0.0, 0.0)),
        };

        let result = pipeline().transform(&blob, &options);
        assert!(matches!(result, Err(TransformError::Decode(_))));
    }

    #[test]
    fn uninitialized_settings_skip_resize() {
        let blob = ImageBlob::new(create_png_bytes(80, 60), "image/png");
        let options = TransformOptions {
            target_format: Some(OutputFormat::Webp),
            resize_mode: ResizeMode::ByWidth,
            resize_settings: ResizeSettings::default(),
        };

        let out = pipeline()
            .transform(&blob, &options)
            .expect("transform should succeed");
        assert_eq!(out.mime(), "image/webp");
        let decoded = image::load_from_memory(out.bytes()).expect("output should decode");
        assert_eq!((decoded.width(), decoded.height()), (80, 60));
    }

    #[test]
    fn input_blob_left_untouched() {
        let original = create_png_bytes(64, 64);
        let blob = ImageBlob::new(original.clone(), "image/png");
        let options = TransformOptions {
            target_format: Some(OutputFormat::Jpeg),
            resize_mode: ResizeMode::ByWidth,
            resize_settings: settings(32.0, (0.0, 0.0)),
        };

        let _ = pipeline()
            .transform(&blob, &options)
            .expect("transform should succeed");
        assert_eq!(blob.bytes(), original.as_slice());
    }

    #[test]
    fn rejects_too_many_pixels() {
        let mut config = PipelineConfig::default();
        config.max_decoded_pixels = 1_000_000;
        let pipeline = TransformPipeline::new(config);

        let blob = ImageBlob::new(create_png_bytes(2000, 2000), "image/png");
        let options = TransformOptions {
            target_format: None,
            resize_mode: ResizeMode::ByWidth,
            resize_settings: ResizeSettings::default(),
        };

        let result = pipeline.transform(&blob, &options);
        assert!(matches!(result, Err(TransformError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_oversized_resize_target() {
        let blob = ImageBlob::new(create_png_bytes(40, 20), "image/png");

        let by_width = TransformOptions {
            target_format: None,
            resize_mode: ResizeMode::ByWidth,
            resize_settings: settings(1e9, (0.0, 0.0)),
        };
        assert!(matches!(
            pipeline().transform(&blob, &by_width),
            Err(TransformError::ResourceLimit(_))
        ));

        let by_display = TransformOptions {
            target_format: None,
            resize_mode: ResizeMode::ByDisplayDims,
            resize_settings: settings(0.0, (1e9, 1e9)),
        };
        assert!(matches!(
            pipeline().transform(&blob, &by_display),
            Err(TransformError::ResourceLimit(_))
        ));
    }

    #[test]
    fn convert_to_png_reencodes_jpeg() {
        let pipeline = pipeline();
        let blob = ImageBlob::new(create_png_bytes(40, 40), "image/png");
        let jpeg = pipeline
            .transform(
                &blob,
                &TransformOptions {
                    target_format: Some(OutputFormat::Jpeg),
                    resize_mode: ResizeMode::ByWidth,
                    resize_settings: ResizeSettings::default(),
                },
            )
            .expect("jpeg transform should succeed");

        let png = pipeline
            .convert_to_png(&jpeg)
            .expect("png conversion should succeed");
        assert_eq!(png.mime(), "image/png");
        assert_eq!(
            image::guess_format(png.bytes()).expect("output should have known format"),
            ImageFormat::Png
        );
    }
}
