use serde::{Deserialize, Serialize};

use crate::models::analysis::ImageSource;

/// 病假
pub const SICK_LEAVE: &str = "病假";
/// 补打卡
pub const PUNCH_CORRECTION: &str = "补打卡";

/// 申请类型
///
/// 规则词汇表是封闭的：病假、补打卡，其余一律归入 `Other`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationType {
    /// 病假
    SickLeave,
    /// 补打卡
    PunchCorrection,
    /// 其他（事假等自由文本）
    Other(String),
}

impl ApplicationType {
    /// 获取标准名称
    pub fn label(&self) -> &str {
        match self {
            ApplicationType::SickLeave => SICK_LEAVE,
            ApplicationType::PunchCorrection => PUNCH_CORRECTION,
            ApplicationType::Other(label) => label,
        }
    }

    /// 该类型是否必须提供证明材料图片
    pub fn requires_proof(&self) -> bool {
        matches!(
            self,
            ApplicationType::SickLeave | ApplicationType::PunchCorrection
        )
    }
}

impl From<String> for ApplicationType {
    fn from(value: String) -> Self {
        match value.trim() {
            SICK_LEAVE => ApplicationType::SickLeave,
            PUNCH_CORRECTION => ApplicationType::PunchCorrection,
            other => ApplicationType::Other(other.to_string()),
        }
    }
}

impl From<&str> for ApplicationType {
    fn from(value: &str) -> Self {
        ApplicationType::from(value.to_string())
    }
}

impl From<ApplicationType> for String {
    fn from(value: ApplicationType) -> Self {
        value.label().to_string()
    }
}

impl std::fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 申请的时间窗口
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeWindow {
    /// 只补上班卡：证据时间需 ≤ start
    ClockIn { start: String },
    /// 只补下班卡：证据时间需 ≥ end
    ClockOut { end: String },
    /// 上下班卡同时申请：证据时间需落在 [start, end]
    Interval { start: String, end: String },
}

impl TimeWindow {
    pub fn start(&self) -> Option<&str> {
        match self {
            TimeWindow::ClockIn { start } | TimeWindow::Interval { start, .. } => Some(start),
            TimeWindow::ClockOut { .. } => None,
        }
    }

    pub fn end(&self) -> Option<&str> {
        match self {
            TimeWindow::ClockOut { end } | TimeWindow::Interval { end, .. } => Some(end),
            TimeWindow::ClockIn { .. } => None,
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeWindow::ClockIn { start } => write!(f, "上班卡 {}", start),
            TimeWindow::ClockOut { end } => write!(f, "下班卡 {}", end),
            TimeWindow::Interval { start, end } => write!(f, "{}~{}", start, end),
        }
    }
}

/// 直接上传的图片（已由图片层编码为 data URI）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub file_name: String,
    pub data_uri: String,
}

/// OA 系统提交的考勤异常申请
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// 员工 ID
    #[serde(default)]
    pub user_id: String,
    /// 员工姓名
    #[serde(default)]
    pub alias: String,
    /// 申请类型
    pub application_type: ApplicationType,
    /// 申请日期 (e.g. "2025-10-21")
    pub application_date: String,
    /// 单个申请时间（旧字段，向后兼容）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_time: Option<String>,
    /// 上班时间 (e.g. "09:00")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// 下班时间 (e.g. "18:00")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// 申请理由
    #[serde(default)]
    pub reason: String,
    /// 图片 URL 列表（与直接上传互斥）
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// 当天已有的打卡时间
    #[serde(default)]
    pub attendance_info: Vec<String>,
    /// 直接上传的图片，只存在于请求作用域
    #[serde(skip)]
    pub uploads: Vec<UploadedImage>,
    /// 来源文件（批量模式）
    #[serde(skip)]
    pub file_path: Option<String>,
}

impl Application {
    pub fn new(
        alias: impl Into<String>,
        application_type: impl Into<ApplicationType>,
        application_date: impl Into<String>,
    ) -> Self {
        Self {
            user_id: String::new(),
            alias: alias.into(),
            application_type: application_type.into(),
            application_date: application_date.into(),
            application_time: None,
            start_time: None,
            end_time: None,
            reason: String::new(),
            image_urls: Vec::new(),
            attendance_info: Vec::new(),
            uploads: Vec::new(),
            file_path: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_application_time(mut self, time: impl Into<String>) -> Self {
        self.application_time = Some(time.into());
        self
    }

    pub fn with_start_time(mut self, time: impl Into<String>) -> Self {
        self.start_time = Some(time.into());
        self
    }

    pub fn with_end_time(mut self, time: impl Into<String>) -> Self {
        self.end_time = Some(time.into());
        self
    }

    pub fn with_image_urls(mut self, urls: Vec<String>) -> Self {
        self.image_urls = urls;
        self
    }

    pub fn with_upload(mut self, file_name: impl Into<String>, data_uri: impl Into<String>) -> Self {
        self.uploads.push(UploadedImage {
            file_name: file_name.into(),
            data_uri: data_uri.into(),
        });
        self
    }

    pub fn with_attendance_info(mut self, times: Vec<String>) -> Self {
        self.attendance_info = times;
        self
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }

    pub fn start(&self) -> Option<&str> {
        non_empty(self.start_time.as_deref())
    }

    pub fn end(&self) -> Option<&str> {
        non_empty(self.end_time.as_deref())
    }

    /// 解析申请的时间窗口
    ///
    /// 优先使用 start/end；都为空时退回旧的单个申请时间作为 start；三者都为空返回 None
    pub fn time_window(&self) -> Option<TimeWindow> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => Some(TimeWindow::Interval {
                start: start.to_string(),
                end: end.to_string(),
            }),
            (Some(start), None) => Some(TimeWindow::ClockIn {
                start: start.to_string(),
            }),
            (None, Some(end)) => Some(TimeWindow::ClockOut {
                end: end.to_string(),
            }),
            (None, None) => non_empty(self.application_time.as_deref()).map(|time| {
                TimeWindow::ClockIn {
                    start: time.to_string(),
                }
            }),
        }
    }

    /// 提供的图片总数（上传 + URL）
    pub fn image_count(&self) -> usize {
        self.uploads.len() + self.non_empty_urls().count()
    }

    /// 同时提供了上传文件和图片 URL
    pub fn has_conflicting_sources(&self) -> bool {
        !self.uploads.is_empty() && self.non_empty_urls().next().is_some()
    }

    /// 按顺序拼接图片来源：先上传文件，再 URL
    pub fn image_sources(&self) -> Vec<ImageSource> {
        self.uploads
            .iter()
            .map(|upload| ImageSource::Upload {
                file_name: upload.file_name.clone(),
                data_uri: upload.data_uri.clone(),
            })
            .chain(self.non_empty_urls().map(|url| ImageSource::Url(url.to_string())))
            .collect()
    }

    fn non_empty_urls(&self) -> impl Iterator<Item = &str> {
        self.image_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
    }
}

/// 空字符串（含纯空白）视为未提供
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_type_from_label() {
        assert_eq!(ApplicationType::from("病假"), ApplicationType::SickLeave);
        assert_eq!(ApplicationType::from(" 补打卡 "), ApplicationType::PunchCorrection);
        assert_eq!(
            ApplicationType::from("事假"),
            ApplicationType::Other("事假".to_string())
        );
        assert!(!ApplicationType::from("事假").requires_proof());
    }

    #[test]
    fn test_time_window_resolution() {
        let app = Application::new("张三", "补打卡", "2025-10-21");
        assert_eq!(app.time_window(), None);

        let legacy = app.clone().with_application_time("09:00");
        assert_eq!(
            legacy.time_window(),
            Some(TimeWindow::ClockIn {
                start: "09:00".to_string()
            })
        );

        // start/end 任一存在时忽略旧字段
        let out = legacy.clone().with_end_time("18:00");
        assert_eq!(
            out.time_window(),
            Some(TimeWindow::ClockOut {
                end: "18:00".to_string()
            })
        );

        let both = out.with_start_time("09:00");
        assert_eq!(
            both.time_window(),
            Some(TimeWindow::Interval {
                start: "09:00".to_string(),
                end: "18:00".to_string()
            })
        );
    }

    #[test]
    fn test_blank_time_is_absent() {
        let app = Application::new("张三", "补打卡", "2025-10-21")
            .with_start_time("  ")
            .with_application_time("");
        assert_eq!(app.time_window(), None);
    }

    #[test]
    fn test_image_sources_order_uploads_first() {
        let app = Application::new("张三", "病假", "2025-10-21")
            .with_upload("a.jpg", "data:image/jpeg;base64,AAAA")
            .with_image_urls(vec!["https://x/1.png".to_string(), " ".to_string()]);

        let sources = app.image_sources();
        assert_eq!(sources.len(), 2);
        assert!(matches!(sources[0], ImageSource::Upload { .. }));
        assert_eq!(sources[1], ImageSource::Url("https://x/1.png".to_string()));
        assert!(app.has_conflicting_sources());
        assert_eq!(app.image_count(), 2);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let content = r#"
            user_id = "sy-001"
            alias = "张三"
            application_type = "补打卡"
            application_date = "2025-10-21"
            start_time = "09:00"
            image_urls = ["https://oa.example.com/a.png"]
            attendance_info = ["18:32"]
        "#;
        let app: Application = toml::from_str(content).unwrap();
        assert_eq!(app.application_type, ApplicationType::PunchCorrection);
        assert_eq!(app.start(), Some("09:00"));
        assert_eq!(app.end(), None);
        assert_eq!(app.attendance_info, vec!["18:32".to_string()]);
        assert!(app.uploads.is_empty());
    }
}
