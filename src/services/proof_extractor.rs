//! 证明图片信息提取服务 - 业务能力层
//!
//! 只负责"看一张图，提取结构化事实"，不关心流程，也不做任何判断
//!
//! ## 技术栈
//! - `VisionClient`（async-openai）调用兼容 OpenAI 接口的视觉模型
//! - 通义千问与火山引擎各自一个 `LlmProofExtractor` 实例

use std::str::FromStr;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::llm_client::VisionClient;
use crate::error::{AppError, LlmError};
use crate::models::analysis::{ImageSource, TokenUsage};
use crate::models::application::{non_empty, Application, ApplicationType};
use crate::models::extraction::ExtractionResult;
use crate::services::prompt::build_extractor_prompt;
use crate::utils::logging::truncate_text;

/// AI provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// 通义千问
    Qwen,
    /// 火山引擎
    Volcano,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Qwen => "qwen",
            Provider::Volcano => "volcano",
        }
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qwen" => Ok(Provider::Qwen),
            "volcano" => Ok(Provider::Volcano),
            other => Err(AppError::unknown_provider(other)),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次提取请求携带的申请上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// 申请人姓名（申请里没有时可能来自 OA）
    pub declared_name: Option<String>,
    pub application_type: ApplicationType,
    pub application_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl ExtractionRequest {
    pub fn from_application(app: &Application, declared_name: Option<String>) -> Self {
        // 旧的单个申请时间按上班卡处理
        let start_time = app
            .start()
            .or_else(|| {
                if app.end().is_none() {
                    non_empty(app.application_time.as_deref())
                } else {
                    None
                }
            })
            .map(str::to_string);

        Self {
            declared_name,
            application_type: app.application_type.clone(),
            application_date: app.application_date.clone(),
            start_time,
            end_time: app.end().map(str::to_string),
        }
    }
}

/// 单张图片的提取产出
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub data: ExtractionResult,
    pub request_id: Option<String>,
    pub token_usage: Option<TokenUsage>,
}

/// 证明图片提取能力
#[async_trait]
pub trait ProofExtractor: Send + Sync {
    async fn extract_proof(
        &self,
        source: &ImageSource,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, LlmError>;
}

/// 基于视觉大模型的提取器
pub struct LlmProofExtractor {
    client: VisionClient,
}

impl LlmProofExtractor {
    pub fn new(client: VisionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProofExtractor for LlmProofExtractor {
    async fn extract_proof(
        &self,
        source: &ImageSource,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, LlmError> {
        debug!("[{}] 开始提取: {}", self.client.provider(), source);

        let prompt = build_extractor_prompt(request);
        let reply = self.client.send_vision(&prompt, source.image_url()).await?;

        let data = ExtractionResult::from_llm_content(&reply.content).map_err(|e| {
            warn!(
                "[{}] AI 内容解析失败 (请求ID: {}): {}, AI内容: {}",
                self.client.provider(),
                reply.request_id,
                e,
                truncate_text(&reply.content, 200)
            );
            LlmError::MalformedContent {
                request_id: reply.request_id.clone(),
                content: reply.content.clone(),
                source: e,
            }
        })?;

        Ok(ExtractionOutcome {
            data,
            request_id: Some(reply.request_id),
            token_usage: reply.usage,
        })
    }
}
