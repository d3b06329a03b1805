use serde::{Deserialize, Serialize};

/// OA 系统返回的员工基础数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInfo {
    pub user_id: String,
    pub alias: String,
}

/// OA 系统返回的当日考勤数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_id: String,
    /// 工作日期 YYYY-MM-DD
    pub work_date: String,
    /// 上班时间 HH:mm
    pub work_start_time: String,
    /// 下班时间 HH:mm
    pub work_end_time: String,
    pub is_work_day: bool,
    /// 考勤类型: normal, late, absent
    pub attendance_type: String,
}

/// 规则引擎使用的考勤上下文，只用于补充最终提示语
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceContext {
    /// 例如: "正常", "迟到", "缺卡"
    pub status: String,
    pub clock_in_time: String,
    pub clock_out_time: String,
    /// 标准上班时间 (HH:mm)
    pub standard_in_time: String,
    /// 标准下班时间 (HH:mm)
    pub standard_out_time: String,
}

impl AttendanceContext {
    pub fn from_record(
        record: &AttendanceRecord,
        standard_in_time: impl Into<String>,
        standard_out_time: impl Into<String>,
    ) -> Self {
        Self {
            status: record.attendance_type.clone(),
            clock_in_time: record.work_start_time.clone(),
            clock_out_time: record.work_end_time.clone(),
            standard_in_time: standard_in_time.into(),
            standard_out_time: standard_out_time.into(),
        }
    }
}

/// 风险级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// 时间参考校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeValidationResult {
    pub is_valid: bool,
    pub is_work_day: bool,
    pub is_late: bool,
    pub risk_level: RiskLevel,
    pub suggestion: String,
    pub details: String,
}
