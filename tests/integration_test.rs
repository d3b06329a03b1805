use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use attendance_review::clients::{AttendanceLookup, OaClient};
use attendance_review::config::Config;
use attendance_review::error::LlmError;
use attendance_review::models::{Application, ExtractionResult, ImageSource};
use attendance_review::services::{ExtractionOutcome, ExtractionRequest, ProofExtractor, Provider};
use attendance_review::utils::logging;
use attendance_review::{AnalysisFlow, App};
use tokio_test::{assert_err, assert_ok};

/// 按图片 URL 返回预设的模型原始输出
struct CannedExtractor {
    replies: HashMap<String, String>,
}

impl CannedExtractor {
    fn new(replies: &[(&str, &str)]) -> Arc<dyn ProofExtractor> {
        Arc::new(Self {
            replies: replies
                .iter()
                .map(|(url, reply)| (url.to_string(), reply.to_string()))
                .collect(),
        })
    }
}

#[async_trait]
impl ProofExtractor for CannedExtractor {
    async fn extract_proof(
        &self,
        source: &ImageSource,
        _request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, LlmError> {
        let reply = self
            .replies
            .get(source.image_url())
            .ok_or_else(|| LlmError::EmptyContent {
                provider: "canned".to_string(),
                request_id: "req-none".to_string(),
            })?;

        let data =
            ExtractionResult::from_llm_content(reply).map_err(|e| LlmError::MalformedContent {
                request_id: "req-canned".to_string(),
                content: reply.clone(),
                source: e,
            })?;

        Ok(ExtractionOutcome {
            data,
            request_id: Some("req-canned".to_string()),
            token_usage: None,
        })
    }
}

fn flow(extractor: Arc<dyn ProofExtractor>, config: &Config) -> AnalysisFlow {
    let lookup: Arc<dyn AttendanceLookup> = Arc::new(OaClient::default());
    AnalysisFlow::with_components(vec![(Provider::Qwen, extractor)], lookup, config)
}

const MEDICAL_RECORD: &str = r#"```json
{"extracted_name":"张三","request_date":"2025-10-21","request_time":"10:15","request_type":"病历单","is_proof_type_valid":true,"content":"急性肠胃炎，建议休息","is_company_internal":false,"is_chat_record":false,"time_from_content":"","candidate_times":[]}
```"#;

const UNKNOWN_NAME_RECORD: &str = r#"{"extracted_name":"未知","request_date":"2025-10-21","request_type":"病历单","is_proof_type_valid":"true"}"#;

const DESKTOP_0910: &str = r#"{"extracted_name":"未知","request_date":"2025-10-21","request_type":"桌面截图","is_proof_type_valid":true,"candidate_times":["09:10"]}"#;

const CANTEEN_0830: &str = r#"{"request_date":"2025-10-21","request_type":"Canteen Receipt","is_proof_type_valid":false,"candidate_times":"08:30"}"#;

#[tokio::test]
async fn test_sick_leave_scenarios() {
    let config = Config::default();
    let flow = flow(
        CannedExtractor::new(&[("ok", MEDICAL_RECORD), ("unknown", UNKNOWN_NAME_RECORD)]),
        &config,
    );

    let app = Application::new("张三", "病假", "2025-10-21")
        .with_application_time("09:00")
        .with_image_urls(vec!["ok".to_string()]);
    let verdict = assert_ok!(flow.analyze(&app, "qwen").await);
    assert!(!verdict.is_abnormal, "{}", verdict.reason);
    assert_eq!(verdict.valid_image_index, 1);

    let app = app.with_image_urls(vec!["unknown".to_string()]);
    let verdict = assert_ok!(flow.analyze(&app, "qwen").await);
    assert!(verdict.is_abnormal);
    assert!(verdict.reason.contains("证明材料未体现申请人姓名"));
}

#[tokio::test]
async fn test_punch_in_later_than_requested_time() {
    let config = Config::default();
    let flow = flow(CannedExtractor::new(&[("shot", DESKTOP_0910)]), &config);

    let app = Application::new("张三", "补打卡", "2025-10-21")
        .with_start_time("09:05")
        .with_image_urls(vec!["shot".to_string()]);
    let verdict = assert_ok!(flow.analyze(&app, "qwen").await);

    assert!(verdict.is_abnormal);
    assert!(verdict.reason.contains("09:10"));
    assert!(verdict.reason.contains("09:05"));
    assert!(verdict.reason.contains("≤"));
}

#[tokio::test]
async fn test_canteen_receipt_after_failed_images() {
    let config = Config::default();
    let flow = flow(
        CannedExtractor::new(&[
            ("garbled", "抱歉，我看不清这张图片"),
            ("late", DESKTOP_0910),
            ("canteen", CANTEEN_0830),
        ]),
        &config,
    );

    let app = Application::new("张三", "补打卡", "2025-10-21")
        .with_user_id("sy-001")
        .with_start_time("09:00")
        .with_image_urls(vec![
            "garbled".to_string(),
            "late".to_string(),
            "canteen".to_string(),
        ]);
    let verdict = assert_ok!(flow.analyze(&app, "qwen").await);

    assert!(!verdict.is_abnormal, "{}", verdict.reason);
    assert_eq!(verdict.valid_image_index, 3);
    assert_eq!(verdict.images_analysis.len(), 3);
    assert!(!verdict.images_analysis[0].success);
    assert_eq!(
        verdict.images_analysis[0].request_id.as_deref(),
        Some("req-canned")
    );
    assert!(verdict.reason.contains("OA考勤时间: 09:00-18:00"));

    // 整体结果可以序列化为接口返回的 JSON
    let json = serde_json::to_value(&verdict).unwrap();
    assert_eq!(json["is_abnormal"], false);
    assert_eq!(json["images_analysis"][0]["source"], "url_download");
}

#[tokio::test]
async fn test_unknown_provider_is_hard_error() {
    let config = Config::default();
    let flow = flow(CannedExtractor::new(&[]), &config);
    let app = Application::new("张三", "病假", "2025-10-21").with_application_time("09:00");
    assert_err!(flow.analyze(&app, "gpt").await);
}

#[tokio::test]
async fn test_batch_run_writes_one_line_per_application() {
    let dir = std::env::temp_dir().join(format!("attendance_review_batch_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    std::fs::write(
        dir.join("01_sick.toml"),
        r#"
user_id = "sy-001"
alias = "张三"
application_type = "病假"
application_date = "2025-10-21"
application_time = "09:00"
image_urls = ["ok"]
"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("02_punch.toml"),
        r#"
alias = "张三"
application_type = "补打卡"
application_date = "2025-10-21"
start_time = "09:00"
attendance_info = ["08:57"]
"#,
    )
    .unwrap();

    let output = dir.join("verdicts.jsonl");
    let config = Config {
        application_folder: dir.to_string_lossy().to_string(),
        output_file: output.to_string_lossy().to_string(),
        default_provider: "qwen".to_string(),
        max_concurrent_applications: 1,
        ..Config::default()
    };

    let app = App::with_flow(
        config.clone(),
        flow(CannedExtractor::new(&[("ok", MEDICAL_RECORD)]), &config),
    );
    let stats = assert_ok!(app.run().await);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.normal, 1);
    assert_eq!(stats.abnormal, 1);
    assert_eq!(stats.failed, 0);

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["application_type"], "病假");
    assert_eq!(lines[0]["result"]["is_abnormal"], false);
    assert_eq!(
        lines[1]["result"]["reason"],
        "已有打卡记录08:57，无需补卡"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

/// 真实调用视觉模型，需要 .env 中配置 API Key
#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_sick_leave_analysis() {
    logging::init(true);

    let config = Config::from_env().expect("加载配置失败");
    let flow = AnalysisFlow::new(&config).expect("初始化分析流程失败");

    let image_url = std::env::var("LIVE_PROOF_IMAGE_URL").expect("需要设置 LIVE_PROOF_IMAGE_URL");
    let app = Application::new("张三", "病假", "2025-10-21")
        .with_user_id("sy-001")
        .with_application_time("09:00")
        .with_image_urls(vec![image_url]);

    let verdict = flow
        .analyze(&app, &config.default_provider)
        .await
        .expect("分析失败");
    println!("{}", serde_json::to_string_pretty(&verdict).unwrap());
    assert_eq!(verdict.images_analysis.len(), 1);
}
