use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::board::RenderPipeline;

/// 聚合的应用共享状态（只读；请求之间不共享可变状态）
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<RenderPipeline>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, AppError> {
        let pipeline = RenderPipeline::new(&config)?;
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
        })
    }
}
