//! # 上传服务边界
//!
//! ## 设计思路
//!
//! 上传提供方是外部协作者：本模块定义 `UploadService` 接口、命名文件
//! 的包装规则，以及一个 Cloudinary 风格的 HTTP 实现。
//!
//! 凭据在进程启动时一次性校验（`UploadConfig::from_env`），缺失属于
//! 致命配置错误，而不是每次调用的失败。
//!
//! ## 实现思路
//!
//! - 复用型 `reqwest::Client`，连接/总超时在构造时固定
//! - unsigned 上传：multipart 表单携带 `upload_preset` 与 `file`
//! - 响应 JSON 中的 `secure_url` 即发布结果

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::blob::ImageBlob;
use crate::error::AppError;
use crate::pipeline::extension_for_mime;

const CLOUD_NAME_ENV: &str = "PASTEPIPE_CLOUD_NAME";
const UPLOAD_PRESET_ENV: &str = "PASTEPIPE_UPLOAD_PRESET";

/// 待上传的命名文件。
#[derive(Debug, Clone)]
pub struct NamedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl NamedFile {
    /// 按固定规则包装 blob：`image-{随机唯一 id}.{扩展名}`。
    ///
    /// 扩展名走 MIME 查表，未知类型回退 `bin`。
    pub fn for_blob(blob: &ImageBlob) -> Self {
        Self {
            name: format!(
                "image-{}.{}",
                Uuid::new_v4(),
                extension_for_mime(blob.mime())
            ),
            mime: blob.mime().to_string(),
            bytes: blob.clone_bytes(),
        }
    }
}

/// 上传服务接口：`upload(file) -> url`。
pub trait UploadService: Send + Sync {
    fn upload(&self, file: NamedFile) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// 上传凭据与调用参数。
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    /// 单次上传总超时（秒）。
    pub timeout: u64,
}

impl UploadConfig {
    /// 从环境读取并校验凭据。任一缺失即为致命配置错误。
    pub fn from_env() -> Result<Self, AppError> {
        let cloud_name = read_env(CLOUD_NAME_ENV)?;
        let upload_preset = read_env(UPLOAD_PRESET_ENV)?;
        Ok(Self {
            cloud_name,
            upload_preset,
            timeout: 30,
        })
    }
}

fn read_env(name: &str) -> Result<String, AppError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Configuration(format!(
            "缺少上传凭据环境变量 {}",
            name
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Cloudinary 风格的上传实现。
pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: UploadConfig,
}

impl CloudinaryUploader {
    /// 构造复用型 HTTP 客户端，减少每次请求的初始化开销。
    pub fn new(config: UploadConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .connect_timeout(Duration::from_secs(8))
            .build()
            .map_err(|e| AppError::Configuration(format!("构建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/auto/upload",
            self.config.cloud_name
        )
    }
}

impl UploadService for CloudinaryUploader {
    async fn upload(&self, file: NamedFile) -> Result<String, AppError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| AppError::Network(format!("构建上传表单失败: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("上传请求失败: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "上传服务返回错误状态: {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Network(format!("解析上传响应失败: {}", e)))?;

        Ok(body.secure_url)
    }
}
