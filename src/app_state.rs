use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{discovery::LinkDiscovery, extractor::ExtractorClient};

/// Shared application state passed to all route handlers and crawl jobs.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub extractor: Arc<ExtractorClient>,
    pub discovery: Arc<LinkDiscovery>,
}

impl AppState {
    pub fn new(db: PgPool, extractor: ExtractorClient, discovery: LinkDiscovery) -> Self {
        Self {
            db,
            extractor: Arc::new(extractor),
            discovery: Arc::new(discovery),
        }
    }
}
