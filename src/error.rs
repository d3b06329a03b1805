/// 应用程序错误类型
///
/// 业务上的"异常申请"不会走到这里，而是体现在 `AnalysisResult.is_abnormal` 上；
/// 这里只承载调用方必须处理的硬错误。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// LLM 服务错误
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建 {provider} 请求失败: {source}")]
    RequestBuildFailed {
        provider: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 调用失败
    #[error("{provider} API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        provider: String,
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("{provider} 返回内容为空 (请求ID: {request_id})")]
    EmptyContent { provider: String, request_id: String },
    /// 返回的 JSON 内容无法解析
    #[error("解析 AI 返回的 JSON 内容失败 (请求ID: {request_id}): {source}, AI内容: {content}")]
    MalformedContent {
        request_id: String,
        content: String,
        #[source]
        source: serde_json::Error,
    },
    /// 单张图片调用超时
    #[error("图片分析超时 (超过 {timeout_secs} 秒)")]
    Timeout { timeout_secs: u64 },
    /// 并发任务异常退出
    #[error("分析任务执行失败: {0}")]
    TaskFailed(String),
}

impl LlmError {
    /// 出错时如果已经拿到了供应商的请求ID，则返回它（便于追踪）
    pub fn request_id(&self) -> Option<&str> {
        match self {
            LlmError::EmptyContent { request_id, .. }
            | LlmError::MalformedContent { request_id, .. } => Some(request_id.as_str()),
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 业务逻辑错误
#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    /// 未知的 AI provider
    #[error("未知的 AI provider: {0}")]
    UnknownProvider(String),
    /// provider 存在但没有配置可用的客户端
    #[error("AI provider {0} 未配置 (缺少 API Key)")]
    ProviderNotConfigured(String),
    /// OA 系统查询失败
    #[error("OA 查询失败 ({what}): {message}")]
    OaLookupFailed { what: String, message: String },
}

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    HttpClientBuildFailed(#[from] reqwest::Error),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建未知 provider 错误
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        AppError::Business(BusinessError::UnknownProvider(name.into()))
    }

    /// 创建 OA 查询失败错误
    pub fn oa_lookup_failed(what: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Business(BusinessError::OaLookupFailed {
            what: what.into(),
            message: message.into(),
        })
    }
}

impl LlmError {
    /// 创建 API 调用失败错误
    pub fn api_call_failed(
        provider: impl Into<String>,
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LlmError::ApiCallFailed {
            provider: provider.into(),
            model: model.into(),
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_kept_for_malformed_content() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = LlmError::MalformedContent {
            request_id: "req-1".to_string(),
            content: "{oops".to_string(),
            source,
        };
        assert_eq!(err.request_id(), Some("req-1"));
        assert!(LlmError::Timeout { timeout_secs: 3 }.request_id().is_none());
    }

    #[test]
    fn test_app_error_display_is_layered() {
        let err = AppError::unknown_provider("openai");
        assert_eq!(err.to_string(), "业务错误: 未知的 AI provider: openai");
    }
}
