//! 申请分析流程 - 流程层
//!
//! 核心职责：定义"一份申请"的完整审核流程
//!
//! 流程顺序：
//! 1. 解析 provider → OA 员工信息（可选）
//! 2. 规则前置检查（缺时间 / 已打卡），不发任何网络请求
//! 3. 多图片并发提取
//! 4. OA 考勤数据（可选）→ 规则引擎裁决

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::clients::llm_client::VisionClient;
use crate::clients::oa_client::{AttendanceLookup, OaClient};
use crate::config::Config;
use crate::error::{AppResult, BusinessError};
use crate::models::analysis::AnalysisResult;
use crate::models::application::Application;
use crate::models::attendance::{AttendanceContext, AttendanceRecord, TimeValidationResult};
use crate::orchestrator::proof_orchestrator::ProofOrchestrator;
use crate::rules::{RuleEngine, RulePolicy};
use crate::services::proof_extractor::{
    ExtractionRequest, LlmProofExtractor, ProofExtractor, Provider,
};
use crate::services::time_validator;
use crate::workflow::analysis_ctx::AnalysisCtx;

/// 同时提供上传文件与图片 URL
pub const CONFLICTING_IMAGE_SOURCES: &str = "不能同时提供上传文件和图片URL";
/// 所有图片都没能完成提取，附带每张图片的失败详情返回
///
/// 规则引擎对同一情况有自己的 `ALL_IMAGES_UNUSABLE`，流程在调用引擎前就返回，
/// 所以经由 `analyze` 的调用方只会看到这一条。
pub const ALL_EXTRACTIONS_FAILED: &str = "所有图片分析均失败";

/// 申请分析流程
///
/// - 编排完整的审核流程
/// - 决定何时查 OA、何时调模型、何时交给规则引擎
/// - 不持有请求间共享的可变状态
pub struct AnalysisFlow {
    extractors: HashMap<Provider, Arc<dyn ProofExtractor>>,
    lookup: Arc<dyn AttendanceLookup>,
    engine: RuleEngine,
    timeout: Duration,
    standard_in_time: String,
    standard_out_time: String,
}

impl AnalysisFlow {
    /// 按配置创建流程；只为配置了 API Key 的 provider 创建客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let mut extractors: Vec<(Provider, Arc<dyn ProofExtractor>)> = Vec::new();

        let providers = [
            (
                Provider::Qwen,
                &config.qwen_api_key,
                &config.qwen_api_base,
                &config.qwen_model,
            ),
            (
                Provider::Volcano,
                &config.volcano_api_key,
                &config.volcano_api_base,
                &config.volcano_model,
            ),
        ];
        for (provider, api_key, api_base, model) in providers {
            if api_key.trim().is_empty() {
                warn!("{} 未配置 API Key，跳过", provider);
                continue;
            }
            let client = VisionClient::new(provider.as_str(), api_key, api_base, model, timeout)?;
            extractors.push((provider, Arc::new(LlmProofExtractor::new(client))));
        }

        let lookup = Arc::new(OaClient::new(
            config.standard_in_time.clone(),
            config.standard_out_time.clone(),
        ));

        Ok(Self::with_components(extractors, lookup, config))
    }

    /// 使用外部提供的提取器与 OA 查询能力
    pub fn with_components(
        extractors: Vec<(Provider, Arc<dyn ProofExtractor>)>,
        lookup: Arc<dyn AttendanceLookup>,
        config: &Config,
    ) -> Self {
        Self {
            extractors: extractors.into_iter().collect(),
            lookup,
            engine: RuleEngine::new(RulePolicy::with_keywords(
                config.in_office_keywords.clone(),
            )),
            timeout: Duration::from_secs(config.llm_timeout_secs),
            standard_in_time: config.standard_in_time.clone(),
            standard_out_time: config.standard_out_time.clone(),
        }
    }

    /// 审核一份申请
    ///
    /// 只有 provider 未知或未配置时返回 `Err`；其余所有问题都体现在
    /// `AnalysisResult.is_abnormal` 上
    pub async fn analyze(&self, app: &Application, provider: &str) -> AppResult<AnalysisResult> {
        let provider: Provider = provider.parse()?;
        let extractor = self
            .extractors
            .get(&provider)
            .cloned()
            .ok_or_else(|| BusinessError::ProviderNotConfigured(provider.to_string()))?;

        let ctx = AnalysisCtx::new(provider, app);
        let started = Instant::now();
        info!(
            "{} 开始分析请求 - UserId: {}, 图片数量: {}",
            ctx,
            app.user_id,
            app.image_count()
        );

        let result = self.run(&ctx, app, extractor).await;

        info!(
            "{} 分析完成 - 异常: {}, 原因: {}, 总耗时: {:?}",
            ctx,
            result.is_abnormal,
            result.reason,
            started.elapsed()
        );
        Ok(result)
    }

    async fn run(
        &self,
        ctx: &AnalysisCtx,
        app: &Application,
        extractor: Arc<dyn ProofExtractor>,
    ) -> AnalysisResult {
        // ========== 1. OA 员工信息（可选） ==========
        let declared_name = self.declared_name(ctx, app).await;

        // ========== 2. 前置检查 ==========
        if let Err(verdict) = self.engine.precheck(app) {
            info!("{} 前置检查未通过: {}", ctx, verdict.reason);
            return verdict;
        }

        if app.has_conflicting_sources() {
            warn!("{} 同时提供了上传文件和图片URL", ctx);
            return AnalysisResult::abnormal(CONFLICTING_IMAGE_SOURCES);
        }

        let sources = app.image_sources();
        if sources.is_empty() {
            // 必需证明材料的类型给出"缺少图片"，其余类型直接正常
            info!("{} 未提供图片", ctx);
            return self.engine.validate(app, None, &[]);
        }

        // ========== 3. 并发提取 ==========
        let request = ExtractionRequest::from_application(app, declared_name);
        let orchestrator = ProofOrchestrator::new(extractor, self.timeout);
        let batch = orchestrator.extract(&request, &sources).await;

        if batch.all_failed() {
            warn!("{} 所有 {} 张图片分析均失败", ctx, batch.details.len());
            return AnalysisResult::abnormal(ALL_EXTRACTIONS_FAILED)
                .with_images_analysis(batch.details);
        }

        // ========== 4. 考勤数据 + 规则裁决 ==========
        let (attendance, time_validation) = self.attendance_context(ctx, app).await;

        let successful = batch.successful();
        let (indices, results): (Vec<usize>, Vec<_>) = successful.into_iter().unzip();

        let mut verdict = self.engine.validate(app, attendance.as_ref(), &results);
        // 规则引擎返回的是成功列表中的位置，换算回原始图片索引
        if verdict.valid_image_index > 0 {
            verdict.valid_image_index = indices[verdict.valid_image_index - 1];
        }
        verdict.time_validation = time_validation;
        verdict.with_images_analysis(batch.details)
    }

    /// 申请人姓名：申请里没有时使用 OA 返回的姓名
    async fn declared_name(&self, ctx: &AnalysisCtx, app: &Application) -> Option<String> {
        let alias = app.alias.trim();
        if app.user_id.trim().is_empty() {
            info!("{} 跳过OA查询 - 未提供UserId", ctx);
            return (!alias.is_empty()).then(|| alias.to_string());
        }

        let oa_alias = match self.lookup.lookup_employee(&app.user_id).await {
            Ok(employee) => {
                info!("{} OA 系统获取到员工数据: {:?}", ctx, employee);
                Some(employee.alias)
            }
            Err(e) => {
                warn!("{} OA 系统获取员工数据失败: {}", ctx, e);
                None
            }
        };

        if alias.is_empty() {
            oa_alias.filter(|a| !a.trim().is_empty())
        } else {
            Some(alias.to_string())
        }
    }

    /// 查询考勤数据，生成规则引擎用的上下文和参考校验结果
    async fn attendance_context(
        &self,
        ctx: &AnalysisCtx,
        app: &Application,
    ) -> (Option<AttendanceContext>, Option<TimeValidationResult>) {
        if app.user_id.trim().is_empty() || app.application_date.trim().is_empty() {
            return (None, None);
        }

        let record: Option<AttendanceRecord> = match self
            .lookup
            .lookup_attendance(&app.user_id, &app.application_date)
            .await
        {
            Ok(record) => {
                info!("{} 获取到OA考勤数据: {:?}", ctx, record);
                Some(record)
            }
            Err(e) => {
                warn!("{} 获取OA考勤数据失败: {}", ctx, e);
                None
            }
        };

        let time_validation = time_validator::validate_application_time(app, record.as_ref());
        info!(
            "{} 时间参考校验: {}",
            ctx,
            time_validator::summarize(&time_validation)
        );

        let attendance = record.map(|record| {
            AttendanceContext::from_record(
                &record,
                self.standard_in_time.clone(),
                self.standard_out_time.clone(),
            )
        });

        (attendance, Some(time_validation))
    }
}
