//! # pastepipe — 应用入口
//!
//! 本文件仅负责初始化（日志、凭据校验、协作方组装）与一个逐行读取
//! 标准输入的驱动循环。业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。
//!
//! 上传凭据在进程启动时一次性校验，缺失即退出——这是配置错误，
//! 不是某次动作的失败。

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use pastepipe::blob::ImageBlob;
use pastepipe::dispatch::{
    ActionDispatcher, ClipboardSource, CloudinaryUploader, DiskDownloadSink, LogNotifier,
    SystemClipboard, UploadConfig,
};
use pastepipe::error::AppError;
use pastepipe::keyboard::{KeyCombo, Keymap};
use pastepipe::pipeline::{OutputFormat, PipelineConfig, TransformPipeline};
use pastepipe::preview::{FixedViewport, PreviewController};
use pastepipe::session::SessionState;
use pastepipe::settings::{SettingsKey, SettingsStore};
use pastepipe::sources;

fn settings_path() -> PathBuf {
    std::env::var("PASTEPIPE_SETTINGS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("pastepipe-settings.json"))
}

fn download_dir() -> PathBuf {
    std::env::var("PASTEPIPE_DOWNLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("downloads"))
}

const HELP: &str = "\
命令:
  paste              从剪贴板摄入图片
  file <路径>        从文件摄入图片
  scale <系数>       调整缩放系数（非法输入为无操作）
  format <png|jpeg|webp>  设置输出格式
  super <on|off>     切换超压缩（按显示尺寸缩放）
  show               显示当前尺寸标签与偏好
  ctrl+y / ctrl+b / ctrl+d / ctrl+k  上传 / 保存 / 原样保存 / 复制
  reset              拆除当前会话
  quit               退出";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("启动失败: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let upload_config = UploadConfig::from_env()?;
    let settings = Arc::new(SettingsStore::open(settings_path())?);

    let dispatcher = ActionDispatcher::new(
        TransformPipeline::new(PipelineConfig::default()),
        CloudinaryUploader::new(upload_config)?,
        DiskDownloadSink::new(download_dir()),
        SystemClipboard::new(),
        LogNotifier,
        Arc::clone(&settings),
    );

    let preview = PreviewController;
    let viewport = FixedViewport { max_edge: 640.0 };
    let keymap = Keymap::default();
    let clipboard = SystemClipboard::new();
    let mut sessions = SessionState::new();

    log::info!("pastepipe 已就绪，输入 help 查看命令");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match command {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "paste" => match clipboard.read_image() {
                Ok(Some(blob)) => ingest(&mut sessions, &preview, &viewport, &settings, blob),
                Ok(None) => log::error!("❌ No image found in clipboard"),
                Err(err) => log::error!("❌ {err}"),
            },
            "file" => {
                if rest.is_empty() {
                    println!("用法: file <路径>");
                    continue;
                }
                match sources::load_from_file(rest) {
                    Ok(blob) => ingest(&mut sessions, &preview, &viewport, &settings, blob),
                    Err(err) => log::error!("❌ {err}"),
                }
            }
            "scale" => match sessions.current() {
                Some(session) => {
                    preview.set_scale_input(&session, rest);
                    if let Some(label) = preview.dimension_label(&session) {
                        println!("{label}");
                    }
                }
                None => log::error!("❌ No image found"),
            },
            "format" => match OutputFormat::from_str(rest) {
                Ok(format) => {
                    if let Err(err) = settings.set_download_type(format) {
                        log::error!("❌ {err}");
                    }
                }
                Err(err) => log::error!("❌ {err}"),
            },
            "super" => match rest {
                "on" | "off" => {
                    if let Err(err) = settings.set_should_super_compress(rest == "on") {
                        log::error!("❌ {err}");
                    }
                }
                _ => println!("用法: super <on|off>"),
            },
            "show" => {
                match sessions.current() {
                    Some(session) => match preview.dimension_label(&session) {
                        Some(label) => println!("{label}"),
                        None => println!("预览尚未初始化"),
                    },
                    None => println!("当前无会话"),
                }
                println!(
                    "format={} super_compress={}",
                    settings
                        .download_type()
                        .map(|f| f.as_str())
                        .unwrap_or("(原格式)"),
                    settings.should_super_compress()
                );
            }
            "reset" => sessions.reset(),
            _ => match KeyCombo::parse(input).and_then(|combo| keymap.action_for(combo)) {
                Some(action) => {
                    let session = sessions.current();
                    // 失败已在动作边界转换为提示，这里不再重复处理
                    let _ = dispatcher.dispatch(session.as_ref(), action).await;
                }
                None => println!("未知命令，输入 help 查看用法"),
            },
        }
    }

    Ok(())
}

/// 摄入一张图片：建会话、初始化预览、挂上本会话的偏好监听。
fn ingest(
    sessions: &mut SessionState,
    preview: &PreviewController,
    viewport: &FixedViewport,
    settings: &Arc<SettingsStore>,
    blob: ImageBlob,
) {
    let size = blob.len();
    let session = sessions.ingest(blob);

    if let Err(err) = preview.initialize(&session, viewport) {
        log::error!("❌ 预览初始化失败: {err}");
        sessions.reset();
        return;
    }

    log::info!("Blob size: {size} bytes");

    // 订阅绑定会话令牌：会话被取代后该回调自动失效
    let session_id = session.id();
    settings.subscribe(
        SettingsKey::DownloadType,
        session.token(),
        move |change| {
            log::info!("⚙️ 会话 #{session_id} 收到偏好变更: {change:?}");
        },
    );

    if let Some(label) = preview.dimension_label(&session) {
        println!("{label}");
    }
}
