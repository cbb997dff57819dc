//! Shared application state

use research_core::Aggregator;
use research_utils::Environment;

pub struct AppState {
    pub aggregator: Aggregator,
    pub app_name: String,
    pub environment: Environment,
}
