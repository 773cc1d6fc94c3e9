use std::sync::Arc;

use crate::{api::mailer::Mailer, config::Config, db};

/// Shared handler state: connection pool, outbound HTTP client, SMTP
/// transport and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: db::Pool,
    pub http_client: reqwest::Client,
    pub mailer: Mailer,
    pub config: Arc<Config>,
}
