use clap::Parser;
use std::{collections::HashMap, error::Error, sync::Arc, time::Instant};
use axum::{
    extract::{rejection::JsonRejection, Form, Json, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use http::header;
use common::config::{BackendConfig, Config};
use crate::{
    error::ValidationError,
    model::{AssessmentInput, RiskAssessment},
    page,
    scorers::Scorer,
};

pub type GenericError = Box<dyn Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "delinquency/config/dev.yaml")]
    pub config: String,

    /// Port to listen on, replacing the one in backend.server_address
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub fn initialize_executable() -> Result<Config, GenericError> {
    if let Ok(path) = dotenvy::dotenv() {
        println!("Loaded environment from {:?}", path);
    }

    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let config = load_config(&args)?;
    println!("Loaded config: {:#?}", config);

    Ok(config)
}

pub fn load_config(args: &Args) -> Result<Config, GenericError> {
    let mut config = Config::load(&args.config)?;
    if let Some(port) = args.port {
        config.override_port(port);
    }
    Ok(config)
}

/// `RUST_LOG` wins over the configured level when set.
pub fn initialize_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn initialize_metrics() -> Result<PrometheusHandle, GenericError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

#[derive(Clone)]
pub struct AppState {
    scorer: Arc<dyn Scorer>,
    project_name: String,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(scorer: Arc<dyn Scorer>, project_name: impl Into<String>) -> Self {
        Self {
            scorer,
            project_name: project_name.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/assess", post(assess_form))
        .route("/api/assess", post(assess_json))
        .route("/about", get(about))
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, GenericError> {
    let origins = allowed_origins
        .iter()
        .map(|origin| origin.parse::<header::HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

pub async fn run_backend(config: BackendConfig, state: AppState) -> Result<(), GenericError> {
    let mut app = create_router(state);
    if !config.allowed_origins.is_empty() {
        app = app.layer(cors_layer(&config.allowed_origins)?);
    }

    tracing::info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn record_assessment(assessment: &RiskAssessment) {
    counter!("delinquency_assessments_total", "level" => assessment.level.to_string()).increment(1);
    histogram!("delinquency_risk_score").record(assessment.score);
}

fn record_validation_failure(error: &ValidationError) {
    counter!("delinquency_validation_failures_total").increment(1);
    tracing::warn!(error = %error, field = error.field(), "Rejected assessment input");
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render_form(
        &state.project_name,
        &state.scorer.fields(),
        &HashMap::new(),
        None,
    ))
}

pub async fn assess_form(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let input = AssessmentInput::from_form(form.clone());
    let fields = state.scorer.fields();

    let t0 = Instant::now();
    match state.scorer.assess(&input) {
        Ok(assessment) => {
            histogram!("delinquency_assess_seconds", "op" => "form").record(t0.elapsed().as_secs_f64());
            record_assessment(&assessment);
            tracing::info!(
                customer_id = ?assessment.customer_id,
                score = assessment.score,
                level = %assessment.level,
                "Assessed customer"
            );
            let html = page::render_result(
                &state.project_name,
                &fields,
                &form,
                &assessment,
                &state.scorer.cut_points(),
            );
            (StatusCode::OK, Html(html)).into_response()
        }
        Err(e) => {
            record_validation_failure(&e);
            let html = page::render_form(&state.project_name, &fields, &form, Some(&e));
            (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
        }
    }
}

pub async fn assess_json(
    State(state): State<AppState>,
    payload: Result<Json<AssessmentInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            counter!("delinquency_validation_failures_total").increment(1);
            tracing::warn!(error = %rejection.body_text(), "Rejected assessment body");
            let body = serde_json::json!({ "error": rejection.body_text() });
            return (rejection.status(), Json(body)).into_response();
        }
    };

    let t0 = Instant::now();
    match state.scorer.assess(&input) {
        Ok(assessment) => {
            histogram!("delinquency_assess_seconds", "op" => "json").record(t0.elapsed().as_secs_f64());
            record_assessment(&assessment);
            tracing::info!(
                customer_id = ?assessment.customer_id,
                score = assessment.score,
                level = %assessment.level,
                "Assessed customer"
            );
            (StatusCode::OK, Json(assessment)).into_response()
        }
        Err(e) => {
            record_validation_failure(&e);
            let body = serde_json::json!({
                "error": e.to_string(),
                "field": e.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    }
}

pub async fn about(State(state): State<AppState>) -> Html<String> {
    Html(page::render_about(
        &state.project_name,
        &state.scorer.name(),
        &state.scorer.fields(),
        &state.scorer.cut_points(),
    ))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}
