//! 证明图片信息提取的提示词

use crate::models::application::ApplicationType;
use crate::services::proof_extractor::ExtractionRequest;

/// 构建"提取器"提示词
///
/// 模型只负责看图提取事实，是否通过由规则引擎决定
pub fn build_extractor_prompt(request: &ExtractionRequest) -> String {
    let type_label = request.application_type.label();

    let proof_examples = match &request.application_type {
        ApplicationType::SickLeave => "病历单、处方单、诊断证明".to_string(),
        ApplicationType::PunchCorrection => {
            "饭堂消费/系统操作/电脑开关机记录、聊天记录、含时间的桌面截图（办公环境优先）"
                .to_string()
        }
        ApplicationType::Other(label) => {
            format!("能证明{}的有效单据/图片/截图（含时间的办公环境截图优先）", label)
        }
    };

    let name_line = match request.declared_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!(
            "1. 目标员工姓名：{}（优先提取图片中患者/看诊人，排除医生）",
            name
        ),
        _ => "1. 目标员工姓名：未提供，请提取图片中患者/看诊人姓名（排除医生）".to_string(),
    };

    let punch_rule = if request.application_type == ApplicationType::PunchCorrection {
        "**补打卡规则**：1. 办公环境桌面截图/聊天记录含时间为有效证据；\
         2. 证明时间（含聊天记录/截图中的时间）≤申请日期；\
         3. 上班卡选≤申请时间最近值，下班卡选≥申请时间最近值（桌面截图当前时间直接认定）；\
         4. 最多返回5个候选时间"
    } else {
        ""
    };

    // 日历只显示月日时用申请年份补全
    let year_hint = match request.application_date.get(..4) {
        Some(year) => format!("{}（仅月日补此年份）", year),
        None => "（仅月日补此年份）".to_string(),
    };

    format!(
        r#"
你是HR助理，需从证据图提取信息并严格返回JSON。

**上下文**：
{name_line}
2. 申请类型：{type_label}（有效证据：{proof_examples}）
3. 申请日期：{date}
4. 申请时间：{time}

{punch_rule}

**任务**：提取JSON（严格按格式）：
- extracted_name：图片中患者/看诊人姓名（排除医生），无法识别填"未知"
- request_date：图片日期（yyyy-MM-dd，仅月日补{year_hint}），无法识别填"未知"
- request_time：图片时间（HH:mm，优先符合申请时间）
- request_type：图片类型（病历单/聊天记录/桌面截图/饭堂消费记录/未知）
- is_proof_type_valid：是否为{type_label}有效证据（补打卡需满足上述规则，病假需病历/诊断证明，其他类型需含时间的办公环境截图）
- content：关键文字摘要（≤60字，不重复时间）
- is_company_internal：是否为公司内部场景（如工位）
- is_chat_record：是否为聊天记录
- time_from_content：从聊天记录内容中提取的时间（HH:mm，无则空）
- candidate_times：候选时间数组（当图片为聊天记录/桌面截图时，提取内容中所有时间点，最多5个）

**JSON格式**：
{{"extracted_name":"","request_date":"","request_time":"","request_type":"","is_proof_type_valid":true/false,"content":"","is_company_internal":true/false,"is_chat_record":false,"time_from_content":"","candidate_times":[]}}
"#,
        date = request.application_date,
        time = display_time(request),
    )
}

/// 申请时间的展示形式
fn display_time(request: &ExtractionRequest) -> String {
    match (request.start_time.as_deref(), request.end_time.as_deref()) {
        (Some(start), Some(end)) => format!("{}~{}", start, end),
        (Some(time), None) | (None, Some(time)) => time.to_string(),
        (None, None) => "未提供".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(application_type: &str) -> ExtractionRequest {
        ExtractionRequest {
            declared_name: Some("张三".to_string()),
            application_type: ApplicationType::from(application_type),
            application_date: "2025-10-21".to_string(),
            start_time: Some("09:00".to_string()),
            end_time: None,
        }
    }

    #[test]
    fn test_punch_correction_prompt_has_rules() {
        let prompt = build_extractor_prompt(&request("补打卡"));
        assert!(prompt.contains("**补打卡规则**"));
        assert!(prompt.contains("4. 申请时间：09:00"));
        assert!(prompt.contains("2025（仅月日补此年份）"));
        assert!(prompt.contains("\"candidate_times\":[]"));
    }

    #[test]
    fn test_sick_leave_prompt() {
        let mut req = request("病假");
        req.declared_name = None;
        req.end_time = Some("18:00".to_string());
        let prompt = build_extractor_prompt(&req);
        assert!(!prompt.contains("补打卡规则"));
        assert!(prompt.contains("病历单、处方单、诊断证明"));
        assert!(prompt.contains("目标员工姓名：未提供"));
        assert!(prompt.contains("09:00~18:00"));
    }
}
