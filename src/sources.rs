//! 摄入源模块
//!
//! # 设计思路
//!
//! 文件选择源：一次用户选择产出一个命名 blob。读取前先查元数据做
//! 体积上限校验，避免把超大文件整个读进内存再拒绝。
//! MIME 优先按字节嗅探，嗅探不出时回退扩展名推断。
//!
//! 剪贴板源见 `dispatch::ClipboardSource`。

use std::fs;
use std::path::Path;

use crate::blob::ImageBlob;
use crate::error::AppError;

/// 单文件体积上限（字节）。
pub const MAX_SOURCE_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 从本地路径加载一个图片 blob。
pub fn load_from_file(path: impl AsRef<Path>) -> Result<ImageBlob, AppError> {
    let path = path.as_ref();

    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(AppError::Storage(format!(
            "不是普通文件: {}",
            path.display()
        )));
    }
    if metadata.len() > MAX_SOURCE_FILE_SIZE {
        return Err(AppError::Storage(format!(
            "文件过大: {} bytes（限制: {} bytes）",
            metadata.len(),
            MAX_SOURCE_FILE_SIZE
        )));
    }

    let bytes = fs::read(path)?;
    let blob = match infer::get(&bytes) {
        Some(kind) => ImageBlob::new(bytes, kind.mime_type()),
        None => ImageBlob::new(bytes, mime_from_extension(path)),
    };

    log::info!(
        "📂 已读取文件 {} - {} {} bytes",
        path.display(),
        blob.mime(),
        blob.len()
    );
    Ok(blob)
}

fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn loads_png_file_with_sniffed_mime() {
        let img = ImageBuffer::from_fn(8, 8, |_, _| Rgba([1u8, 2, 3, 255]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("pic.dat");
        fs::write(&path, cursor.into_inner()).expect("write should succeed");

        let blob = load_from_file(&path).expect("load should succeed");
        assert_eq!(blob.mime(), "image/png");
        assert!(!blob.is_empty());
    }

    #[test]
    fn unsniffable_bytes_fall_back_to_extension() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("vector.svg");
        fs::write(&path, b"<svg xmlns='http://www.w3.org/2000/svg'/>")
            .expect("write should succeed");

        let blob = load_from_file(&path).expect("load should succeed");
        assert_eq!(blob.mime(), "image/svg+xml");
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_from_file("/definitely/not/here.png");
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
