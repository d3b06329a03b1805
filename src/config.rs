use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的申请数量
    pub max_concurrent_applications: usize,
    /// 待处理申请 TOML 文件目录
    pub application_folder: String,
    /// 裁决结果输出文件（每行一条 JSON）
    pub output_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 默认使用的 AI provider（qwen / volcano）
    pub default_provider: String,
    // --- 通义千问 ---
    pub qwen_api_key: String,
    pub qwen_api_base: String,
    pub qwen_model: String,
    // --- 火山引擎 ---
    pub volcano_api_key: String,
    pub volcano_api_base: String,
    pub volcano_model: String,
    /// 单次图片分析的超时时间（秒）
    pub llm_timeout_secs: u64,
    // --- 考勤 ---
    /// 标准上班时间 (HH:mm)
    pub standard_in_time: String,
    /// 标准下班时间 (HH:mm)
    pub standard_out_time: String,
    /// 补打卡"在司消费"类证据关键字，为空则使用内置列表
    pub in_office_keywords: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_applications: 8,
            application_folder: "applications".to_string(),
            output_file: "verdicts.jsonl".to_string(),
            verbose_logging: false,
            default_provider: "volcano".to_string(),
            qwen_api_key: String::new(),
            qwen_api_base: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            qwen_model: "qwen3-vl-plus".to_string(),
            volcano_api_key: String::new(),
            volcano_api_base: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            volcano_model: "doubao-seed-1-6-251015".to_string(),
            llm_timeout_secs: 60,
            standard_in_time: "09:00".to_string(),
            standard_out_time: "18:00".to_string(),
            in_office_keywords: Vec::new(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，本地开发时优先读取 `.env`
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let default = Self::default();
        Ok(Self {
            max_concurrent_applications: parse_env(
                "MAX_CONCURRENT_APPLICATIONS",
                default.max_concurrent_applications,
            )?
            .max(1),
            application_folder: std::env::var("APPLICATION_FOLDER")
                .unwrap_or(default.application_folder),
            output_file: std::env::var("OUTPUT_FILE").unwrap_or(default.output_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", default.verbose_logging)?,
            default_provider: std::env::var("LLM_PROVIDER").unwrap_or(default.default_provider),
            qwen_api_key: std::env::var("QWEN_API_KEY").unwrap_or(default.qwen_api_key),
            qwen_api_base: std::env::var("QWEN_API_BASE").unwrap_or(default.qwen_api_base),
            qwen_model: std::env::var("QWEN_MODEL").unwrap_or(default.qwen_model),
            volcano_api_key: std::env::var("VOLCANO_API_KEY").unwrap_or(default.volcano_api_key),
            volcano_api_base: std::env::var("VOLCANO_API_BASE")
                .unwrap_or(default.volcano_api_base),
            volcano_model: std::env::var("VOLCANO_MODEL").unwrap_or(default.volcano_model),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", default.llm_timeout_secs)?,
            standard_in_time: std::env::var("STANDARD_IN_TIME")
                .unwrap_or(default.standard_in_time),
            standard_out_time: std::env::var("STANDARD_OUT_TIME")
                .unwrap_or(default.standard_out_time),
            in_office_keywords: std::env::var("IN_OFFICE_PROOF_KEYWORDS")
                .map(|v| split_keywords(&v))
                .unwrap_or(default.in_office_keywords),
        })
    }
}

/// 读取并解析环境变量，不存在时使用默认值
fn parse_env<T: std::str::FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value,
            expected_type: std::any::type_name::<T>().to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// 逗号分隔的关键字列表（兼容中文逗号）
fn split_keywords(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
