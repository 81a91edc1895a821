//! 本地保存汇模块
//!
//! # 设计思路
//!
//! 统一管理"保存到磁盘"的落点：目录不存在时自动创建，
//! 文件名由时间戳与 MIME 推导的扩展名生成，调用方不关心命名。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::blob::ImageBlob;
use crate::error::AppError;
use crate::pipeline::extension_for_mime;

/// 保存汇接口：给定 blob，落盘并返回最终路径。
pub trait DownloadSink: Send + Sync {
    fn save(&self, blob: &ImageBlob) -> Result<PathBuf, AppError>;
}

/// 磁盘保存汇：写入固定目标目录。
pub struct DiskDownloadSink {
    dir: PathBuf,
}

impl DiskDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn ensure_dir(&self) -> Result<&Path, AppError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::Storage(format!("创建保存目录失败: {}", e)))?;
        Ok(&self.dir)
    }
}

impl DownloadSink for DiskDownloadSink {
    fn save(&self, blob: &ImageBlob) -> Result<PathBuf, AppError> {
        let dir = self.ensure_dir()?;

        let timestamp = Local::now().format("%Y%m%d%H%M%S%f");
        let file_name = format!("img_{}.{}", timestamp, extension_for_mime(blob.mime()));
        let path = dir.join(file_name);

        fs::write(&path, blob.bytes())?;
        log::info!("💾 已保存 {} ({} bytes)", path.display(), blob.len());
        Ok(path)
    }
}
