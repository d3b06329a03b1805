//! 规则引擎
//!
//! 纯函数：输入申请、可选的考勤上下文和按图片顺序排列的提取结果，输出裁决。
//! 不做任何 I/O，同样的输入永远得到同样的输出。
//!
//! 裁决顺序：
//! 1. 解析申请时间窗口（start/end，或旧的单个时间）
//! 2. 补打卡"已有打卡记录"快速判断
//! 3. 病假/补打卡必须有证明材料
//! 4. 逐张图片校验 姓名 → 日期 → 类型 → 时间，第一张全部通过的图片胜出
//! 5. 无图片通过时汇总所有失败原因

use chrono::{NaiveTime, Timelike};
use tracing::{debug, info};

use crate::models::analysis::AnalysisResult;
use crate::models::application::{Application, ApplicationType, TimeWindow};
use crate::models::attendance::AttendanceContext;
use crate::models::extraction::ExtractionResult;
use crate::rules::policy::{RulePolicy, CHAT_RECORD_POLICY, CHAT_RECORD_TYPE, UNRECOGNIZED_TYPE};
use crate::rules::time::{format_clock, parse_clock};

pub const NO_APPLICATION_TIME: &str = "未提供申请时间";
pub const MISSING_PROOF_IMAGES: &str = "缺少必要的证明材料图片 (未提供图片)";
/// 需要证明材料、提供了图片但没有一张提取成功时的裁决
///
/// 只有直接调用 `validate` 且传入空结果的调用方会拿到它；
/// `AnalysisFlow` 在这之前就用自己的原因返回了。
pub const ALL_IMAGES_UNUSABLE: &str = "所有图片均处理失败，无法验证";
pub const NO_PROOF_REQUIRED: &str = "正常";
pub const NO_USABLE_TIME: &str = "未识别到有效时间（图片可能无时间信息或无法解析）";

/// 单张图片汇总失败原因时的分隔符
const MESSAGE_SEPARATOR: &str = "；";
/// 多张图片失败摘要之间的分隔符
pub const IMAGE_SEPARATOR: &str = " | ";

/// 规则引擎
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    policy: RulePolicy,
}

/// 类型校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeCheck {
    /// 模型判定有效
    Valid,
    /// 补打卡"在司消费"类凭证纠偏为有效
    Overridden,
    /// 补打卡 + 聊天记录：失败，提示语等时间校验后再定
    ChatRecord,
    /// 类型不匹配
    Mismatch(String),
}

/// 时间校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum TimeCheck {
    /// 非补打卡不校验时间
    NotApplicable,
    Passed,
    /// `compared` 表示确实拿证据时间和申请时间比较过
    Failed { message: String, compared: bool },
}

/// 解析后的申请时间窗口
#[derive(Debug, Clone, Copy)]
enum ClockWindow {
    In(NaiveTime),
    Out(NaiveTime),
    Between(NaiveTime, NaiveTime),
}

impl RuleEngine {
    pub fn new(policy: RulePolicy) -> Self {
        Self { policy }
    }

    /// 不需要看图片的前置检查：申请时间是否存在、是否已有打卡记录
    ///
    /// 通过时返回解析出的时间窗口，否则直接返回异常裁决
    pub fn precheck(&self, app: &Application) -> Result<TimeWindow, AnalysisResult> {
        let Some(window) = app.time_window() else {
            return Err(AnalysisResult::abnormal(NO_APPLICATION_TIME));
        };

        match &window {
            TimeWindow::Interval { start, end } => {
                info!("检测到上下班卡同时申请 - 上班时间: {}, 下班时间: {}", start, end)
            }
            TimeWindow::ClockIn { start } => info!("检测到上班卡申请 - 上班时间: {}", start),
            TimeWindow::ClockOut { end } => info!("检测到下班卡申请 - 下班时间: {}", end),
        }

        if let Some(reason) = already_punched(app, &window) {
            info!("{}", reason);
            return Err(AnalysisResult::abnormal(reason));
        }

        Ok(window)
    }

    /// 对一份申请做最终裁决
    ///
    /// `results` 为提取成功的图片，按原始图片顺序排列；
    /// 返回的 `valid_image_index` 是在 `results` 中的位置（从 1 开始，0 表示无）
    pub fn validate(
        &self,
        app: &Application,
        attendance: Option<&AttendanceContext>,
        results: &[ExtractionResult],
    ) -> AnalysisResult {
        let window = match self.precheck(app) {
            Ok(window) => window,
            Err(verdict) => return verdict,
        };

        if results.is_empty() {
            if !app.application_type.requires_proof() {
                return AnalysisResult::normal(NO_PROOF_REQUIRED);
            }
            return if app.image_count() == 0 {
                AnalysisResult::abnormal(MISSING_PROOF_IMAGES)
            } else {
                AnalysisResult::abnormal(ALL_IMAGES_UNUSABLE)
            };
        }

        let mut image_failures = Vec::with_capacity(results.len());
        for (i, data) in results.iter().enumerate() {
            debug!("--- 正在验证图片 {}/{} ---", i + 1, results.len());

            let failures = self.check_image(app, &window, data);
            if failures.is_empty() {
                info!("图片 {} 验证通过！", i + 1);
                let mut verdict = AnalysisResult::normal(success_reason(attendance));
                verdict.valid_image_index = i + 1;
                verdict.image_failures = image_failures;
                return verdict;
            }

            let summary = format!("图片验证失败: ({})", failures.join(MESSAGE_SEPARATOR));
            info!("{}", summary);
            image_failures.push(summary);
        }

        let mut verdict = AnalysisResult::abnormal(image_failures.join(IMAGE_SEPARATOR));
        verdict.image_failures = image_failures;
        verdict
    }

    /// 校验单张图片，返回失败原因列表（为空表示通过）
    fn check_image(
        &self,
        app: &Application,
        window: &TimeWindow,
        data: &ExtractionResult,
    ) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(message) = check_name(app, data) {
            failures.push(message);
        }

        if let Some(message) = check_date(app, data) {
            failures.push(message);
        }

        // 聊天记录的提示语在时间校验后才确定，先占位
        let mut chat_slot = None;
        match self.check_type(app, data) {
            TypeCheck::Valid => debug!("AI 判定：证据类型[{:?}]有效", data.request_type),
            TypeCheck::Overridden => {
                info!("类型纠偏：[{:?}] 视为补打卡有效证据", data.request_type)
            }
            TypeCheck::ChatRecord => {
                chat_slot = Some(failures.len());
                failures.push(CHAT_RECORD_POLICY.to_string());
            }
            TypeCheck::Mismatch(message) => failures.push(message),
        }

        match check_time(app, window, data) {
            TimeCheck::NotApplicable => {}
            TimeCheck::Passed => {
                if let Some(slot) = chat_slot {
                    failures[slot] = format!("时间验证通过，{}", CHAT_RECORD_POLICY);
                }
            }
            TimeCheck::Failed { message, compared } => {
                if let (Some(slot), true) = (chat_slot, compared) {
                    failures[slot] = format!("时间验证不通过，{}", CHAT_RECORD_POLICY);
                }
                failures.push(message);
            }
        }

        failures
    }

    fn check_type(&self, app: &Application, data: &ExtractionResult) -> TypeCheck {
        if data.is_proof_type_valid {
            return TypeCheck::Valid;
        }

        let label = data.type_label().unwrap_or(UNRECOGNIZED_TYPE);
        if app.application_type == ApplicationType::PunchCorrection {
            if self.policy.is_in_office_proof(label) {
                return TypeCheck::Overridden;
            }
            if label == CHAT_RECORD_TYPE {
                return TypeCheck::ChatRecord;
            }
        }

        TypeCheck::Mismatch(format!(
            "证据类型无效：检测为[{}]，与申请类型[{}]不匹配",
            label, app.application_type
        ))
    }
}

/// 补打卡：当天已有满足方向的打卡记录则无需补卡
fn already_punched(app: &Application, window: &TimeWindow) -> Option<String> {
    if app.application_type != ApplicationType::PunchCorrection || app.attendance_info.is_empty()
    {
        return None;
    }

    // 同时申请上下班卡时以下班卡为准
    let (target, clock_in) = match window {
        TimeWindow::ClockIn { start } => (start, true),
        TimeWindow::ClockOut { end } | TimeWindow::Interval { end, .. } => (end, false),
    };
    let target = parse_clock(target)?;

    let mut recorded: Vec<NaiveTime> = Vec::with_capacity(app.attendance_info.len());
    for time in app.attendance_info.iter().filter_map(|t| parse_clock(t)) {
        if !recorded.contains(&time) {
            recorded.push(time);
        }
    }

    recorded
        .into_iter()
        .find(|&clock| {
            if clock_in {
                clock <= target
            } else {
                clock >= target
            }
        })
        .map(|clock| format!("已有打卡记录{}，无需补卡", format_clock(clock)))
}

/// 姓名校验，仅病假强制；双向包含即可（兼容"张三(研发部)"之类的后缀）
fn check_name(app: &Application, data: &ExtractionResult) -> Option<String> {
    if app.application_type != ApplicationType::SickLeave {
        return None;
    }

    let alias = app.alias.trim();
    if alias.is_empty() {
        return Some("病假申请未提供申请人姓名".to_string());
    }

    match data.extracted_name.as_deref() {
        None => Some("证明材料未体现申请人姓名".to_string()),
        Some(name) if name.contains(alias) || alias.contains(name) => {
            debug!("姓名验证通过");
            None
        }
        Some(name) => Some(format!("证明材料姓名[{}]与申请人[{}]不符", name, alias)),
    }
}

/// 日期校验：字符串严格相等
fn check_date(app: &Application, data: &ExtractionResult) -> Option<String> {
    match data.request_date.as_deref() {
        None => Some("证明材料未识别到日期".to_string()),
        Some(date) if date == app.application_date.trim() => {
            debug!("日期验证通过: {}", date);
            None
        }
        Some(date) => Some(format!(
            "证明材料日期[{}]与申请日期[{}]不符",
            date,
            app.application_date.trim()
        )),
    }
}

/// 时间校验，仅补打卡
fn check_time(app: &Application, window: &TimeWindow, data: &ExtractionResult) -> TimeCheck {
    if app.application_type != ApplicationType::PunchCorrection {
        return TimeCheck::NotApplicable;
    }

    let clock_window = match resolve_window(window) {
        Ok(clock_window) => clock_window,
        Err(message) => {
            return TimeCheck::Failed {
                message,
                compared: false,
            }
        }
    };

    let candidates = candidate_times(data);
    let Some(effective) = select_effective_time(clock_window, &candidates) else {
        return TimeCheck::Failed {
            message: NO_USABLE_TIME.to_string(),
            compared: false,
        };
    };
    debug!(
        "选用时间: '{}' (候选: {:?}, 申请: {})",
        format_clock(effective),
        candidates,
        window
    );

    let effective_str = format_clock(effective);
    let violation = match clock_window {
        ClockWindow::In(start) if effective > start => Some(format!(
            "证据时间[{}]晚于上班时间[{}]，不满足上班卡≤规则",
            effective_str,
            format_clock(start)
        )),
        ClockWindow::Out(end) if effective < end => Some(format!(
            "证据时间[{}]早于下班时间[{}]，不满足下班卡≥规则",
            effective_str,
            format_clock(end)
        )),
        ClockWindow::Between(start, end) if effective < start => Some(format!(
            "证据时间[{}]早于上班时间[{}]，不在申请时间范围[{}-{}]内",
            effective_str,
            format_clock(start),
            format_clock(start),
            format_clock(end)
        )),
        ClockWindow::Between(start, end) if effective > end => Some(format!(
            "证据时间[{}]晚于下班时间[{}]，不在申请时间范围[{}-{}]内",
            effective_str,
            format_clock(end),
            format_clock(start),
            format_clock(end)
        )),
        _ => None,
    };

    match violation {
        Some(message) => TimeCheck::Failed {
            message,
            compared: true,
        },
        None => {
            debug!("时间验证通过: 申请[{}], 证据时间[{}]", window, effective_str);
            TimeCheck::Passed
        }
    }
}

fn resolve_window(window: &TimeWindow) -> Result<ClockWindow, String> {
    let parse = |raw: &str| {
        parse_clock(raw).ok_or_else(|| format!("申请时间[{}]格式错误，无法解析为HH:mm", raw))
    };
    Ok(match window {
        TimeWindow::ClockIn { start } => ClockWindow::In(parse(start.as_str())?),
        TimeWindow::ClockOut { end } => ClockWindow::Out(parse(end.as_str())?),
        TimeWindow::Interval { start, end } => {
            ClockWindow::Between(parse(start.as_str())?, parse(end.as_str())?)
        }
    })
}

/// 候选时间：优先使用提取步骤筛选过的列表，否则退回单值字段
fn candidate_times(data: &ExtractionResult) -> Vec<&str> {
    if !data.candidate_times.is_empty() {
        return data.candidate_times.iter().map(String::as_str).collect();
    }
    data.request_time
        .iter()
        .chain(data.time_from_content.iter())
        .map(String::as_str)
        .collect()
}

/// 按方向选出有效时间：上班卡取最早，下班卡取最晚，
/// 区间优先取区间内的第一个，否则取离区间最近的
fn select_effective_time(window: ClockWindow, candidates: &[&str]) -> Option<NaiveTime> {
    let times: Vec<NaiveTime> = candidates.iter().filter_map(|t| parse_clock(t)).collect();

    match window {
        ClockWindow::In(_) => times.into_iter().min(),
        ClockWindow::Out(_) => times.into_iter().max(),
        ClockWindow::Between(start, end) => {
            if let Some(inside) = times.iter().copied().find(|t| *t >= start && *t <= end) {
                return Some(inside);
            }
            times.into_iter().min_by_key(|t| {
                if *t < start {
                    minutes(start) - minutes(*t)
                } else {
                    minutes(*t) - minutes(end)
                }
            })
        }
    }
}

fn minutes(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

fn success_reason(attendance: Option<&AttendanceContext>) -> String {
    match attendance {
        Some(ctx) => format!(
            "时间检测通过 (图片信息 验证通过) (OA考勤时间: {}-{})",
            ctx.standard_in_time, ctx.standard_out_time
        ),
        None => "时间检测通过 (图片信息 验证通过)".to_string(),
    }
}
