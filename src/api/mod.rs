pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::engine::EngineService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineService>,
}

impl AppState {
    pub fn new(engine: Arc<EngineService>) -> Self {
        Self { engine }
    }
}
