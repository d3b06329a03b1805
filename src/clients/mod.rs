pub mod llm_client;
pub mod oa_client;

pub use llm_client::{VisionClient, VisionReply};
pub use oa_client::{AttendanceLookup, OaClient};
