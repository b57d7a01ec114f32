use std::error::Error;
use std::sync::Arc;

use delinquency::build_scorer;
use scoring::executable_utils::{
    initialize_executable, initialize_metrics, initialize_tracing, run_backend, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);
    let metrics = initialize_metrics()?;

    let scorer = build_scorer(&config.scoring)?;
    let state = AppState::new(Arc::new(scorer), config.common.project_name.clone()).with_metrics(metrics);

    run_backend(config.backend, state).await
}
