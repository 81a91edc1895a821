//! # pastepipe — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              触发面（REPL / 渲染宿主，外部协作）           │
//! │      粘贴 · 选择文件 · 调整缩放 · 键位组合                │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓              核心编排                             │
//! │                                                          │
//! │  ┌─ session ──── Session / SessionState / 撤销作用域      │
//! │  │     摄入即取代：旧作用域同步取消，新会话全新令牌        │
//! │  │                                                       │
//! │  ├─ preview ──── 基础尺寸探测 + 无漂移缩放设置派生         │
//! │  │                                                       │
//! │  ├─ pipeline ─── (blob, options) → blob 纯变换阶段        │
//! │  │                                                       │
//! │  ├─ dispatch ─── 四动作编排：上传 / 保存 / 原样保存 / 复制 │
//! │  │   ├─ upload      Cloudinary 风格 multipart 上传        │
//! │  │   ├─ download    磁盘保存汇                            │
//! │  │   ├─ clipboard   arboard 源与汇（仅保证 PNG）          │
//! │  │   └─ notify      提示协作方接口                        │
//! │  │                                                       │
//! │  ├─ settings ──── JSON 偏好存储 + 令牌绑定订阅             │
//! │  ├─ sources ───── 文件摄入源（体积上限 + MIME 嗅探）       │
//! │  ├─ keyboard ──── 键位 → 动作绑定表                        │
//! │  └─ error ─────── AppError 统一错误类型                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，动作边界的返回类型 |
//! | [`blob`] | 不可变图片数据载体 `ImageBlob` |
//! | [`session`] | 会话生命周期：摄入、取代、忙碌标志、撤销作用域 |
//! | [`preview`] | 基础尺寸捕获与缩放设置的无漂移重推导 |
//! | [`pipeline`] | 解码 → 缩放 → 编码的纯变换阶段 |
//! | [`dispatch`] | 动作编排与上传/保存/剪贴板/提示各协作方 |
//! | [`settings`] | 跨会话持久化偏好（输出格式、超压缩开关） |
//! | [`sources`] | 文件选择摄入源 |
//! | [`keyboard`] | 键位组合到动作的显式绑定表 |

pub mod blob;
pub mod dispatch;
pub mod error;
pub mod keyboard;
pub mod pipeline;
pub mod preview;
pub mod session;
pub mod settings;
pub mod sources;
