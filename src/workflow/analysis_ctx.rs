//! 申请分析上下文
//!
//! 封装"我正在用哪个 provider 审核谁的哪份申请"这一信息

use std::fmt::Display;

use crate::models::application::{Application, ApplicationType};
use crate::services::proof_extractor::Provider;

/// 申请分析上下文
#[derive(Debug, Clone)]
pub struct AnalysisCtx {
    pub provider: Provider,
    pub user_id: String,
    pub alias: String,
    pub application_type: ApplicationType,
    pub application_date: String,
}

impl AnalysisCtx {
    pub fn new(provider: Provider, app: &Application) -> Self {
        Self {
            provider,
            user_id: app.user_id.clone(),
            alias: app.alias.clone(),
            application_type: app.application_type.clone(),
            application_date: app.application_date.clone(),
        }
    }
}

impl Display for AnalysisCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let who = if self.alias.is_empty() {
            &self.user_id
        } else {
            &self.alias
        };
        write!(
            f,
            "[{} {} {}@{}]",
            self.provider, who, self.application_type, self.application_date
        )
    }
}
