//! # Attendance Review
//!
//! 考勤异常申请（病假、补打卡等）的自动审核后端
//!
//! ## 架构设计
//!
//! ### ① 外部客户端（Clients）
//! - `VisionClient` - 兼容 OpenAI 接口的视觉模型（通义千问 / 火山引擎）
//! - `AttendanceLookup` / `OaClient` - OA 员工与考勤查询
//!
//! ### ② 业务能力层（Services）
//! - `ProofExtractor` - 看一张证明图片，提取结构化事实
//! - `time_validator` - 考勤时间参考校验（不参与裁决）
//!
//! ### ③ 规则层（Rules）
//! - `RuleEngine` - 纯函数裁决：姓名 → 日期 → 类型 → 时间，第一张全部通过的图片胜出
//!
//! ### ④ 流程层（Workflow）
//! - `AnalysisFlow` - 一份申请的完整审核流程
//!
//! ### ⑤ 编排层（Orchestration）
//! - `ProofOrchestrator` - 多图片并发提取
//! - `App` - 批量审核目录中的申请文件
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod rules;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnalysisResult, Application, ApplicationType, ExtractionResult};
pub use orchestrator::{App, ProofOrchestrator};
pub use rules::{RuleEngine, RulePolicy};
pub use services::{ProofExtractor, Provider};
pub use workflow::AnalysisFlow;
