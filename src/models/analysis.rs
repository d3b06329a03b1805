use serde::{Deserialize, Serialize};

use crate::models::attendance::TimeValidationResult;
use crate::models::extraction::ExtractionResult;

/// 一张待分析的证明图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 直接上传（data URI）
    Upload { file_name: String, data_uri: String },
    /// 图片 URL（直接传给模型，不下载）
    Url(String),
}

impl ImageSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            ImageSource::Upload { .. } => SourceKind::FileUpload,
            ImageSource::Url(_) => SourceKind::UrlDownload,
        }
    }

    /// 传给视觉模型的 image_url
    pub fn image_url(&self) -> &str {
        match self {
            ImageSource::Upload { data_uri, .. } => data_uri,
            ImageSource::Url(url) => url,
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Upload { file_name, .. } => write!(f, "文件上传: {}", file_name),
            ImageSource::Url(url) => write!(f, "URL直传: {}", url),
        }
    }
}

/// 图片来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    FileUpload,
    UrlDownload,
}

/// Token 使用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// 单张图片的分析详情
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnalysisDetail {
    /// 图片索引（从 1 开始，上传与 URL 连续编号）
    pub index: usize,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// LLM 请求 ID（用于追踪）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractionResult>,
    pub processing_time_ms: u64,
    /// 模型自评的证据类型是否有效
    pub is_valid: bool,
}

impl ImageAnalysisDetail {
    /// 为一张图片创建空的详情记录
    pub fn new(index: usize, source: &ImageSource) -> Self {
        let (file_name, image_url) = match source {
            ImageSource::Upload { file_name, .. } => (Some(file_name.clone()), None),
            ImageSource::Url(url) => (None, Some(url.clone())),
        };
        Self {
            index,
            source: source.kind(),
            file_name,
            image_url,
            request_id: None,
            token_usage: None,
            success: false,
            error_message: None,
            extracted_data: None,
            processing_time_ms: 0,
            is_valid: false,
        }
    }
}

/// 统一返回结构
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub is_abnormal: bool,
    pub reason: String,
    /// 第一张通过全部校验的图片索引（从 1 开始，0 表示无）
    #[serde(skip_serializing_if = "is_zero")]
    pub valid_image_index: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images_analysis: Vec<ImageAnalysisDetail>,
    /// 按图片顺序记录的校验失败摘要（通过的图片之前的那些）
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_failures: Vec<String>,
    /// 考勤时间的参考性校验，不参与裁决
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_validation: Option<TimeValidationResult>,
}

impl AnalysisResult {
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            is_abnormal: true,
            reason: reason.into(),
            valid_image_index: 0,
            images_analysis: Vec::new(),
            image_failures: Vec::new(),
            time_validation: None,
        }
    }

    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            is_abnormal: false,
            ..Self::abnormal(reason)
        }
    }

    pub fn with_images_analysis(mut self, details: Vec<ImageAnalysisDetail>) -> Self {
        self.images_analysis = details;
        self
    }
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}
