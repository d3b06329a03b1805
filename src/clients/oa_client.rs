//! OA 系统客户端
//!
//! 员工信息与当日考勤都从 OA 查询。真实接口尚未开放，
//! 当前 `OaClient` 按日期返回模拟数据；调用方只依赖 `AttendanceLookup`。

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::attendance::{AttendanceRecord, EmployeeInfo};

/// OA 查询能力
#[async_trait]
pub trait AttendanceLookup: Send + Sync {
    /// 查询员工基础信息
    async fn lookup_employee(&self, user_id: &str) -> AppResult<EmployeeInfo>;

    /// 查询员工某天的考勤数据，`work_date` 为 YYYY-MM-DD
    async fn lookup_attendance(&self, user_id: &str, work_date: &str)
        -> AppResult<AttendanceRecord>;
}

/// OA 客户端（模拟实现）
#[derive(Debug, Clone)]
pub struct OaClient {
    standard_in_time: String,
    standard_out_time: String,
}

impl OaClient {
    pub fn new(standard_in_time: impl Into<String>, standard_out_time: impl Into<String>) -> Self {
        Self {
            standard_in_time: standard_in_time.into(),
            standard_out_time: standard_out_time.into(),
        }
    }
}

impl Default for OaClient {
    fn default() -> Self {
        Self::new("09:00", "18:00")
    }
}

#[async_trait]
impl AttendanceLookup for OaClient {
    async fn lookup_employee(&self, user_id: &str) -> AppResult<EmployeeInfo> {
        if user_id.trim().is_empty() {
            return Err(AppError::oa_lookup_failed("员工信息", "user_id 为空"));
        }
        debug!("查询员工信息: {}", user_id);

        Ok(EmployeeInfo {
            user_id: user_id.to_string(),
            alias: "测试员工".to_string(),
        })
    }

    async fn lookup_attendance(
        &self,
        user_id: &str,
        work_date: &str,
    ) -> AppResult<AttendanceRecord> {
        let date = NaiveDate::parse_from_str(work_date.trim(), "%Y-%m-%d").map_err(|e| {
            AppError::oa_lookup_failed("考勤数据", format!("日期格式错误 '{}': {}", work_date, e))
        })?;
        debug!("查询考勤数据: {} @ {}", user_id, work_date);

        Ok(AttendanceRecord {
            user_id: user_id.to_string(),
            work_date: work_date.trim().to_string(),
            work_start_time: self.standard_in_time.clone(),
            work_end_time: self.standard_out_time.clone(),
            is_work_day: !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            attendance_type: "normal".to_string(),
        })
    }
}
