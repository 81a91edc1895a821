//! 用户偏好存储模块
//!
//! # 设计思路
//!
//! 以 JSON 文件持久化两项跨会话偏好：输出格式（`downloadType`）与
//! 超压缩开关（`shouldSuperCompress`）。写入即落盘，读侧始终走内存副本。
//!
//! 变更通知采用显式订阅接口：`subscribe(key, token, callback)`，
//! 写入时同步回调。订阅绑定会话的撤销令牌，令牌取消后回调变为惰性，
//! 在下一次通知时被整体清理——旧会话的监听器不可能收到新会话的变更。
//!
//! 回调在订阅锁之外执行：回调内再次写入设置是允许的，不会重入锁。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::pipeline::OutputFormat;

/// 可订阅的偏好键。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKey {
    DownloadType,
    ShouldSuperCompress,
}

/// 一次偏好变更的载荷，同步派发给订阅方。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsChange {
    DownloadType(OutputFormat),
    ShouldSuperCompress(bool),
}

impl SettingsChange {
    fn key(&self) -> SettingsKey {
        match self {
            Self::DownloadType(_) => SettingsKey::DownloadType,
            Self::ShouldSuperCompress(_) => SettingsKey::ShouldSuperCompress,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedSettings {
    #[serde(rename = "downloadType", skip_serializing_if = "Option::is_none")]
    download_type: Option<OutputFormat>,
    #[serde(rename = "shouldSuperCompress", skip_serializing_if = "Option::is_none")]
    should_super_compress: Option<bool>,
}

type SubscriberCallback = Arc<dyn Fn(&SettingsChange) + Send + Sync>;

struct Subscriber {
    key: SettingsKey,
    token: CancellationToken,
    callback: SubscriberCallback,
}

/// 偏好存储：文件路径由调用方显式注入。
pub struct SettingsStore {
    path: PathBuf,
    values: Mutex<PersistedSettings>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SettingsStore {
    /// 打开（或新建）指定路径的偏好文件。
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let values = Self::load(&path)?;
        Ok(Self {
            path,
            values: Mutex::new(values),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    fn load(path: &Path) -> Result<PersistedSettings, AppError> {
        if !path.exists() {
            return Ok(PersistedSettings::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Storage(format!("解析设置文件失败: {}", e)))
    }

    pub fn download_type(&self) -> Option<OutputFormat> {
        self.lock_values().download_type
    }

    pub fn should_super_compress(&self) -> bool {
        self.lock_values().should_super_compress.unwrap_or(false)
    }

    pub fn set_download_type(&self, format: OutputFormat) -> Result<(), AppError> {
        {
            let mut values = self.lock_values();
            values.download_type = Some(format);
            self.persist(&values)?;
        }
        self.notify(SettingsChange::DownloadType(format));
        Ok(())
    }

    pub fn set_should_super_compress(&self, enabled: bool) -> Result<(), AppError> {
        {
            let mut values = self.lock_values();
            values.should_super_compress = Some(enabled);
            self.persist(&values)?;
        }
        self.notify(SettingsChange::ShouldSuperCompress(enabled));
        Ok(())
    }

    /// 注册一个绑定撤销令牌的订阅。
    ///
    /// 令牌取消后回调不再被调用，条目在下一次通知时被清理。
    pub fn subscribe(
        &self,
        key: SettingsKey,
        token: CancellationToken,
        callback: impl Fn(&SettingsChange) + Send + Sync + 'static,
    ) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                key,
                token,
                callback: Arc::new(callback),
            });
    }

    /// 同步派发变更：先剔除已失效订阅并快照匹配的回调，
    /// 锁释放后再逐个调用——回调内写设置不会在订阅锁上重入。
    fn notify(&self, change: SettingsChange) {
        let matching: Vec<SubscriberCallback> = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|s| !s.token.is_cancelled());

            subscribers
                .iter()
                .filter(|s| s.key == change.key())
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };

        for callback in matching {
            callback(&change);
        }
    }

    fn persist(&self, values: &PersistedSettings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(values)
            .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, PersistedSettings> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
