//! 考勤时间参考校验
//!
//! 结果只作为附加信息返回给审核人，不参与最终裁决

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{info, warn};

use crate::models::application::{Application, ApplicationType};
use crate::models::attendance::{AttendanceRecord, RiskLevel, TimeValidationResult};
use crate::rules::time::parse_clock;

/// 根据 OA 考勤数据做参考校验
///
/// `record` 为 None 表示 OA 查询失败，此时只做周一至周五的工作日判断
pub fn validate_application_time(
    app: &Application,
    record: Option<&AttendanceRecord>,
) -> TimeValidationResult {
    let result = match record {
        Some(record) => validate_with_record(app, record),
        None => {
            warn!("无法获取考勤数据，使用基础工作日判断");
            basic_validation(app)
        }
    };

    info!(
        "时间参考校验完成 - 有效: {}, 工作日: {}, 迟到: {}, 风险: {:?}",
        result.is_valid, result.is_work_day, result.is_late, result.risk_level
    );
    result
}

fn validate_with_record(app: &Application, record: &AttendanceRecord) -> TimeValidationResult {
    if !record.is_work_day {
        return non_work_day(&app.application_date);
    }

    let mut result = TimeValidationResult {
        is_valid: true,
        is_work_day: true,
        is_late: false,
        risk_level: RiskLevel::Low,
        suggestion: "申请时间验证通过".to_string(),
        details: "申请时间符合要求".to_string(),
    };

    match app.application_type {
        ApplicationType::PunchCorrection => {
            let requested = app.time_window().and_then(|w| w.start().map(str::to_string));
            let Some(requested) = requested else {
                result.suggestion = "补打卡申请未指定上班时间，无需迟到判断".to_string();
                result.details = format!("标准上班时间 {}", record.work_start_time);
                return result;
            };

            if is_late(&requested, &record.work_start_time) {
                result.is_late = true;
                result.risk_level = RiskLevel::Medium;
                result.suggestion = "申请时间可能导致迟到，请确认是否合理".to_string();
                result.details = format!(
                    "申请时间 {} 晚于标准上班时间 {}",
                    requested, record.work_start_time
                );
            } else {
                result.suggestion = "申请时间合理，符合补打卡要求".to_string();
                result.details = format!(
                    "申请时间 {} 不晚于标准上班时间 {}",
                    requested, record.work_start_time
                );
            }
        }
        ApplicationType::SickLeave => {
            result.suggestion = "病假申请，时间验证通过".to_string();
            result.details = "病假申请无需验证具体时间".to_string();
        }
        ApplicationType::Other(_) => {}
    }

    result
}

fn basic_validation(app: &Application) -> TimeValidationResult {
    // 日期无法解析时按工作日处理
    let is_work_day = NaiveDate::parse_from_str(app.application_date.trim(), "%Y-%m-%d")
        .map(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .unwrap_or(true);

    if !is_work_day {
        return non_work_day(&app.application_date);
    }

    TimeValidationResult {
        is_valid: true,
        is_work_day: true,
        is_late: false,
        risk_level: RiskLevel::Medium,
        suggestion: "无法获取考勤数据，请人工审核".to_string(),
        details: "系统无法验证考勤情况，建议人工审核".to_string(),
    }
}

fn non_work_day(date: &str) -> TimeValidationResult {
    TimeValidationResult {
        is_valid: false,
        is_work_day: false,
        is_late: false,
        risk_level: RiskLevel::High,
        suggestion: "申请时间为非工作日，请确认申请类型".to_string(),
        details: format!("申请日期 {} 不是工作日", date),
    }
}

/// 解析失败时不算迟到
fn is_late(requested: &str, standard: &str) -> bool {
    match (parse_clock(requested), parse_clock(standard)) {
        (Some(requested), Some(standard)) => requested > standard,
        _ => {
            warn!("时间解析失败 - 申请时间: {}, 标准时间: {}", requested, standard);
            false
        }
    }
}

/// 汇总成一句话，便于日志和人工审核
pub fn summarize(result: &TimeValidationResult) -> String {
    let mut messages = Vec::new();

    messages.push(if result.is_work_day {
        "申请时间为工作日"
    } else {
        "申请时间为非工作日"
    });

    if result.is_late {
        messages.push("申请时间可能导致迟到");
    }

    messages.push(match result.risk_level {
        RiskLevel::High => "高风险申请",
        RiskLevel::Medium => "中等风险申请",
        RiskLevel::Low => "低风险申请",
    });

    if !result.suggestion.is_empty() {
        messages.push(result.suggestion.as_str());
    }

    messages.join("；")
}
