pub mod analysis;
pub mod application;
pub mod attendance;
pub mod extraction;
pub mod loaders;

pub use analysis::{AnalysisResult, ImageAnalysisDetail, ImageSource, SourceKind, TokenUsage};
pub use application::{Application, ApplicationType, TimeWindow, UploadedImage};
pub use attendance::{
    AttendanceContext, AttendanceRecord, EmployeeInfo, RiskLevel, TimeValidationResult,
};
pub use extraction::ExtractionResult;
pub use loaders::{load_all_application_files, load_application};
