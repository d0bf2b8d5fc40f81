//! Shared application state passed to all API handlers.

use std::sync::Arc;

use sufra_domain::config::Config;
use sufra_domain::hours::OpeningHours;
use sufra_providers::LlmProvider;
use sufra_store::SessionRepo;

use crate::runtime::session_lock::SessionLockMap;
use crate::runtime::tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hours: OpeningHours,
    pub llm: Arc<dyn LlmProvider>,
    pub sessions: SessionRepo,
    pub tools: Arc<ToolRegistry>,
    pub locks: Arc<SessionLockMap>,
}
