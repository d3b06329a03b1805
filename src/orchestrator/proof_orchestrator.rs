//! 多图片并发提取
//!
//! 每张图片一个 tokio 任务，全部完成后按原始顺序汇总。
//! 单张图片的超时、出错乃至任务 panic 都只影响它自己的那条详情。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::error::LlmError;
use crate::models::analysis::{ImageAnalysisDetail, ImageSource};
use crate::models::extraction::ExtractionResult;
use crate::services::proof_extractor::{ExtractionOutcome, ExtractionRequest, ProofExtractor};

/// 一次并发提取的汇总
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    /// 按原始图片顺序排列
    pub details: Vec<ImageAnalysisDetail>,
    /// 第一张模型自评有效的图片索引（从 1 开始）
    pub first_proof_valid: Option<usize>,
}

impl ExtractionBatch {
    /// 提取成功的结果及其原始图片索引，保持原始顺序
    pub fn successful(&self) -> Vec<(usize, ExtractionResult)> {
        self.details
            .iter()
            .filter(|d| d.success)
            .filter_map(|d| d.extracted_data.clone().map(|data| (d.index, data)))
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.details.iter().filter(|d| d.success).count()
    }

    /// 有图片且全部失败
    pub fn all_failed(&self) -> bool {
        !self.details.is_empty() && self.success_count() == 0
    }
}

/// 证明图片提取编排器
#[derive(Clone)]
pub struct ProofOrchestrator {
    extractor: Arc<dyn ProofExtractor>,
    timeout: Duration,
}

impl ProofOrchestrator {
    pub fn new(extractor: Arc<dyn ProofExtractor>, timeout: Duration) -> Self {
        Self { extractor, timeout }
    }

    /// 并发提取所有图片
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        sources: &[ImageSource],
    ) -> ExtractionBatch {
        let total = sources.len();
        if total == 0 {
            return ExtractionBatch::default();
        }
        info!("开始并发分析 {} 张图片", total);

        let handles: Vec<_> = sources
            .iter()
            .cloned()
            .map(|source| {
                let extractor = Arc::clone(&self.extractor);
                let request = request.clone();
                let timeout = self.timeout;
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result =
                        match tokio::time::timeout(timeout, extractor.extract_proof(&source, &request))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(LlmError::Timeout {
                                timeout_secs: timeout.as_secs(),
                            }),
                        };
                    (result, started.elapsed())
                })
            })
            .collect();

        // 结果按下标落位，完成顺序不影响输出顺序
        let joined = join_all(handles).await;

        let mut details = Vec::with_capacity(total);
        for (i, (source, joined)) in sources.iter().zip(joined).enumerate() {
            let index = i + 1;
            let mut detail = ImageAnalysisDetail::new(index, source);

            match joined {
                Ok((Ok(outcome), elapsed)) => {
                    detail.processing_time_ms = elapsed.as_millis() as u64;
                    fill_success(&mut detail, outcome);
                    info!(
                        "第 {}/{} 张图片分析完成 ({}), 耗时 {}ms, 自评有效: {}",
                        index, total, source, detail.processing_time_ms, detail.is_valid
                    );
                }
                Ok((Err(e), elapsed)) => {
                    detail.processing_time_ms = elapsed.as_millis() as u64;
                    detail.request_id = e.request_id().map(str::to_string);
                    warn!("第 {}/{} 张图片分析失败 ({}): {}", index, total, source, e);
                    detail.error_message = Some(e.to_string());
                }
                Err(join_err) => {
                    let e = LlmError::TaskFailed(join_err.to_string());
                    error!("第 {}/{} 张图片任务异常: {}", index, total, e);
                    detail.error_message = Some(e.to_string());
                }
            }

            details.push(detail);
        }

        let first_proof_valid = details.iter().find(|d| d.is_valid).map(|d| d.index);
        match first_proof_valid {
            Some(index) => info!("第一张自评有效的图片: 第 {} 张", index),
            None => info!("没有模型自评有效的图片"),
        }

        ExtractionBatch {
            details,
            first_proof_valid,
        }
    }
}

fn fill_success(detail: &mut ImageAnalysisDetail, outcome: ExtractionOutcome) {
    detail.success = true;
    detail.request_id = outcome.request_id;
    detail.token_usage = outcome.token_usage;
    detail.is_valid = outcome.data.is_proof_type_valid;
    detail.extracted_data = Some(outcome.data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationType;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// 按 URL 脚本化返回的提取器
    struct ScriptedExtractor {
        delays: HashMap<String, u64>,
    }

    #[async_trait]
    impl ProofExtractor for ScriptedExtractor {
        async fn extract_proof(
            &self,
            source: &ImageSource,
            _request: &ExtractionRequest,
        ) -> Result<ExtractionOutcome, LlmError> {
            let url = source.image_url().to_string();
            let delay = self.delays.get(&url).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if url.contains("panic") {
                panic!("模拟任务崩溃");
            }
            if url.contains("fail") {
                return Err(LlmError::EmptyContent {
                    provider: "fake".to_string(),
                    request_id: format!("req-{}", url),
                });
            }

            Ok(ExtractionOutcome {
                data: ExtractionResult {
                    request_type: Some(url.clone()),
                    is_proof_type_valid: url.contains("valid"),
                    ..Default::default()
                },
                request_id: Some(format!("req-{}", url)),
                token_usage: None,
            })
        }
    }

    fn request() -> ExtractionRequest {
        ExtractionRequest {
            declared_name: Some("张三".to_string()),
            application_type: ApplicationType::PunchCorrection,
            application_date: "2025-10-21".to_string(),
            start_time: Some("09:00".to_string()),
            end_time: None,
        }
    }

    fn urls(names: &[&str]) -> Vec<ImageSource> {
        names.iter().map(|n| ImageSource::Url(n.to_string())).collect()
    }

    fn orchestrator(delays: &[(&str, u64)], timeout_ms: u64) -> ProofOrchestrator {
        let delays = delays.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        ProofOrchestrator::new(
            Arc::new(ScriptedExtractor { delays }),
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn test_order_is_kept_when_completion_is_reversed() {
        let orch = orchestrator(&[("a", 120), ("b", 60), ("c", 0)], 5_000);
        let batch = orch.extract(&request(), &urls(&["a", "b", "c"])).await;

        let labels: Vec<_> = batch
            .details
            .iter()
            .map(|d| d.image_url.clone().unwrap())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        let indices: Vec<_> = batch.details.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(batch.successful()[2].1.request_type.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let orch = orchestrator(&[], 5_000);
        let batch = orch
            .extract(&request(), &urls(&["fail-1", "ok-valid", "panic-3"]))
            .await;

        assert_eq!(batch.details.len(), 3);
        assert!(!batch.details[0].success);
        assert_eq!(batch.details[0].request_id.as_deref(), Some("req-fail-1"));
        assert!(batch.details[1].success);
        assert!(!batch.details[2].success);
        assert!(batch.details[2]
            .error_message
            .as_deref()
            .unwrap()
            .contains("分析任务执行失败"));

        assert_eq!(batch.first_proof_valid, Some(2));
        let ok = batch.successful();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].0, 2);
        assert!(!batch.all_failed());
    }

    #[tokio::test]
    async fn test_timeout_only_affects_slow_image() {
        let orch = orchestrator(&[("slow", 2_000)], 100);
        let batch = orch.extract(&request(), &urls(&["slow", "fast"])).await;

        assert!(!batch.details[0].success);
        assert!(batch.details[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("超时"));
        assert!(batch.details[1].success);
    }

    #[tokio::test]
    async fn test_empty_and_all_failed() {
        let orch = orchestrator(&[], 1_000);
        let batch = orch.extract(&request(), &[]).await;
        assert!(batch.details.is_empty());
        assert!(!batch.all_failed());

        let batch = orch.extract(&request(), &urls(&["fail-a", "fail-b"])).await;
        assert!(batch.all_failed());
        assert_eq!(batch.first_proof_valid, None);
    }

    #[tokio::test]
    async fn test_mixed_sources_are_numbered_continuously() {
        let orch = orchestrator(&[], 1_000);
        let sources = vec![
            ImageSource::Upload {
                file_name: "a.jpg".to_string(),
                data_uri: "data:image/jpeg;base64,AAAA".to_string(),
            },
            ImageSource::Url("https://x/valid.png".to_string()),
        ];
        let batch = orch.extract(&request(), &sources).await;
        assert_eq!(batch.details[0].file_name.as_deref(), Some("a.jpg"));
        assert_eq!(batch.details[1].index, 2);
        assert_eq!(batch.first_proof_valid, Some(2));
    }
}
