//! 批量申请处理器 - 编排层
//!
//! ## 职责
//!
//! 程序入口使用的批处理：扫描申请目录，按批并发审核，每条裁决写一行 JSON。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：按配置创建 `AnalysisFlow`，准备输出文件
//! 2. **批量加载**：扫描并加载所有待处理的申请（`Vec<Application>`）
//! 3. **并发控制**：使用 Semaphore 限制同时审核的申请数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **全局统计**：正常 / 异常 / 出错 三类计数

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, FileError};
use crate::models::analysis::AnalysisResult;
use crate::models::application::Application;
use crate::utils::logging;
use crate::workflow::AnalysisFlow;

/// 输出文件中的一行
#[derive(Debug, Serialize)]
struct VerdictLine<'a> {
    file: Option<&'a str>,
    user_id: &'a str,
    alias: &'a str,
    application_type: &'a str,
    application_date: &'a str,
    provider: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a AnalysisResult>,
}

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<AnalysisFlow>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let flow = AnalysisFlow::new(&config).context("初始化分析流程失败")?;

        // 清空上次的输出
        tokio::fs::write(&config.output_file, b"")
            .await
            .map_err(|source| FileError::WriteFailed {
                path: config.output_file.clone(),
                source,
            })?;

        Ok(Self {
            config,
            flow: Arc::new(flow),
        })
    }

    /// 使用已构建好的流程（测试与嵌入场景）
    pub fn with_flow(config: Config, flow: AnalysisFlow) -> Self {
        Self {
            config,
            flow: Arc::new(flow),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描待处理的申请...");
        let applications = crate::models::load_all_application_files(
            &self.config.application_folder,
        )
        .await
        .context("加载申请文件失败")?;

        if applications.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_applications_loaded(
            applications.len(),
            self.config.max_concurrent_applications,
        );

        let stats = self.process_all(applications).await?;
        logging::print_final_stats(&stats, &self.config.output_file);

        Ok(stats)
    }

    /// 处理所有申请
    async fn process_all(&self, applications: Vec<Application>) -> Result<ProcessingStats> {
        let batch_size = self.config.max_concurrent_applications.max(1);
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = applications.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in applications.chunks(batch_size).enumerate() {
            let batch_start = batch_idx * batch_size;
            logging::log_batch_start(
                batch_idx + 1,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let batch_stats = self.process_batch(batch, batch_start, semaphore.clone()).await?;
            logging::log_batch_complete(batch_idx + 1, &batch_stats);
            stats.merge(&batch_stats);
        }

        Ok(stats)
    }

    /// 处理单个批次，结果按申请顺序写入输出文件
    async fn process_batch(
        &self,
        batch: &[Application],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<ProcessingStats> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, application) in batch.iter().enumerate() {
            let app_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = Arc::clone(&self.flow);
            let application = application.clone();
            let provider = self.config.default_provider.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                flow.analyze(&application, &provider).await
            });
            handles.push((app_index, handle));
        }

        let mut stats = ProcessingStats {
            total: batch.len(),
            ..Default::default()
        };
        let mut lines = String::new();

        for ((app_index, handle), application) in handles.into_iter().zip(batch) {
            let outcome = match handle.await {
                Ok(outcome) => outcome.map_err(|e| e.to_string()),
                Err(e) => Err(format!("任务执行失败: {}", e)),
            };

            let line = match &outcome {
                Ok(result) => {
                    if result.is_abnormal {
                        stats.abnormal += 1;
                        info!("[申请 {}] ⚠️ 异常: {}", app_index, result.reason);
                    } else {
                        stats.normal += 1;
                        info!("[申请 {}] ✅ 正常: {}", app_index, result.reason);
                    }
                    self.verdict_line(application, Some(result), None)
                }
                Err(message) => {
                    stats.failed += 1;
                    error!("[申请 {}] ❌ 处理失败: {}", app_index, message);
                    self.verdict_line(application, None, Some(message.clone()))
                }
            };

            lines.push_str(&serde_json::to_string(&line)?);
            lines.push('\n');
        }

        self.append_output(&lines).await?;
        Ok(stats)
    }

    fn verdict_line<'a>(
        &'a self,
        application: &'a Application,
        result: Option<&'a AnalysisResult>,
        error: Option<String>,
    ) -> VerdictLine<'a> {
        VerdictLine {
            file: application.file_path.as_deref(),
            user_id: &application.user_id,
            alias: &application.alias,
            application_type: application.application_type.label(),
            application_date: &application.application_date,
            provider: &self.config.default_provider,
            error,
            result,
        }
    }

    async fn append_output(&self, lines: &str) -> AppResult<()> {
        let write_failed = |source| FileError::WriteFailed {
            path: self.config.output_file.clone(),
            source,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.output_file)
            .await
            .map_err(write_failed)?;
        file.write_all(lines.as_bytes()).await.map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;
        Ok(())
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total: usize,
    /// 审核通过
    pub normal: usize,
    /// 审核判定异常
    pub abnormal: usize,
    /// 硬错误（provider 未配置等）
    pub failed: usize,
}

impl ProcessingStats {
    fn merge(&mut self, other: &ProcessingStats) {
        self.normal += other.normal;
        self.abnormal += other.abnormal;
        self.failed += other.failed;
    }
}
