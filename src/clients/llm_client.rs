//! 视觉大模型 API 客户端
//!
//! 封装一次"提示词 + 单张图片"的 chat completion 调用。
//! 通义千问与火山引擎都兼容 OpenAI 接口，只是 api_base / model 不同。

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use tracing::{debug, warn};

use crate::error::{ConfigError, LlmError};
use crate::models::analysis::TokenUsage;

/// 一次视觉调用的原始返回
#[derive(Debug, Clone)]
pub struct VisionReply {
    pub content: String,
    pub request_id: String,
    pub usage: Option<TokenUsage>,
}

/// 视觉模型客户端
#[derive(Clone)]
pub struct VisionClient {
    client: Client<OpenAIConfig>,
    provider: String,
    model_name: String,
}

impl VisionClient {
    /// 创建客户端，`timeout` 作用于底层 HTTP 请求
    pub fn new(
        provider: impl Into<String>,
        api_key: &str,
        api_base: &str,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            provider: provider.into(),
            model_name: model_name.into(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// 发送"文本 + 一张图片"并返回模型的文本回复
    pub async fn send_vision(&self, prompt: &str, image_url: &str) -> Result<VisionReply, LlmError> {
        debug!(
            "调用 {} 视觉模型: {}, 提示词长度: {} 字符",
            self.provider,
            self.model_name,
            prompt.len()
        );

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: prompt.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image_url.to_string(),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(|e| self.build_failed(e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.1)
            .build()
            .map_err(|e| self.build_failed(e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("{} API 调用失败: {}", self.provider, e);
            LlmError::api_call_failed(&self.provider, &self.model_name, e)
        })?;

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                provider: self.provider.clone(),
                request_id: response.id.clone(),
            })?;

        debug!("{} 调用成功, 请求ID: {}", self.provider, response.id);

        Ok(VisionReply {
            content,
            request_id: response.id,
            usage,
        })
    }

    fn build_failed(&self, e: async_openai::error::OpenAIError) -> LlmError {
        LlmError::RequestBuildFailed {
            provider: self.provider.clone(),
            source: Box::new(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 需要真实的 VOLCANO_API_KEY，手动运行
    #[tokio::test]
    #[ignore]
    async fn test_send_vision_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let api_key = std::env::var("VOLCANO_API_KEY").expect("需要设置 VOLCANO_API_KEY");
        let client = VisionClient::new(
            "volcano",
            &api_key,
            "https://ark.cn-beijing.volces.com/api/v3",
            "doubao-seed-1-6-251015",
            Duration::from_secs(60),
        )
        .unwrap();

        let reply = client
            .send_vision(
                "请用一句话描述这张图片",
                "https://ark-project.tos-cn-beijing.volces.com/images/view.jpeg",
            )
            .await
            .unwrap();

        println!("请求ID: {}\n{}", reply.request_id, reply.content);
        assert!(!reply.content.is_empty());
    }
}
