//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `proof_orchestrator` - 多图片并发提取
//! - 每张图片一个任务，单张超时 / 失败互不影响
//! - 按原始顺序汇总，完成顺序不影响输出
//!
//! ### `batch_processor` - 批量申请处理器
//! - 批量加载申请（Vec<Application>）
//! - 控制并发数量（Semaphore）
//! - 输出裁决与全局统计
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Application>)
//!     ↓
//! workflow::AnalysisFlow (处理单份 Application)
//!     ↓
//! proof_orchestrator (处理 Vec<ImageSource>)  +  rules::RuleEngine
//!     ↓
//! services (能力层：提取 / 参考校验)
//!     ↓
//! clients (视觉模型 / OA)
//! ```

pub mod batch_processor;
pub mod proof_orchestrator;

pub use batch_processor::{App, ProcessingStats};
pub use proof_orchestrator::{ExtractionBatch, ProofOrchestrator};
