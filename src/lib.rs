use std::sync::Arc;

use cache::CacheAsideFetcher;
use config::Config;
use limiter::ActionLimiters;
use store::SharedStore;
use upstream::TodoSource;

pub mod cache;
pub mod config;
pub mod limiter;
pub mod middleware;
pub mod store;
pub mod upstream;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SharedStore>,
    pub upstream: Arc<dyn TodoSource>,
    pub limiters: ActionLimiters,
    pub fetcher: CacheAsideFetcher,
}
