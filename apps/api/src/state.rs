use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::MatchProvider;
use crate::vacancy::resolver::VacancyResolver;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after start-up; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub resolver: VacancyResolver,
    /// Selected by `MATCH_PROVIDER`. `None` when the provider key is missing.
    pub matcher: Option<Arc<dyn MatchProvider>>,
}
