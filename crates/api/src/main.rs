mod error;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_morning_core::dashboard::{Dashboard, ReportOutcome, StockDetail};
use market_morning_core::derive::DashboardSnapshot;
use market_morning_core::domain::report::{Report, StockItem, TrendBias};
use market_morning_core::domain::schedule::{DayToken, ScheduleConfig};
use market_morning_core::llm::gemini::GeminiClient;
use market_morning_core::render::{self, Section};
use market_morning_core::session::{CredentialGate, CredentialHost, StagedKeyHost};
use market_morning_core::storage::preferences::PreferenceStore;
use market_morning_core::time::kr_market;

use crate::error::{AppError, Result};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = market_morning_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // Keys arrive through PUT /credential; an env key is pre-selected so the server works
    // without one.
    let keys = Arc::new(StagedKeyHost::new());
    if let Some(key) = settings.gemini_api_key.clone() {
        keys.stage(key).await;
        if let Err(e) = keys.request_credential_selection().await {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to pre-select env API key");
        }
    } else {
        tracing::warn!("GEMINI_API_KEY missing; reports need PUT /credential first");
    }

    let host: Arc<dyn CredentialHost> = keys.clone();
    let gate = CredentialGate::new(Some(host), settings.gemini_api_key.is_some());
    let analyst = GeminiClient::from_settings(&settings)?.with_key_source(gate.key_source(None));
    let store = PreferenceStore::new(settings.preferences_path.clone());
    tracing::info!(path = %store.path().display(), "preference store");

    let state = AppState {
        dashboard: Arc::new(Dashboard::new(Arc::new(analyst), gate, store)),
        keys,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/dashboard", get(get_dashboard))
        .route("/reports", post(create_report))
        .route("/reports/latest", get(get_latest_report))
        .route("/reports/latest/markdown", get(get_latest_markdown))
        .route("/reports/latest/sections/:section", get(get_latest_section))
        .route("/stocks/:ticker/detail", post(open_stock_detail))
        .route("/stocks/detail", get(get_stock_detail).delete(close_stock_detail))
        .route(
            "/schedule",
            get(get_schedule).put(put_schedule).delete(delete_schedule),
        )
        .route("/credential", get(get_credential).put(put_credential))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    dashboard: Arc<Dashboard>,
    keys: Arc<StagedKeyHost>,
}

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let mut rng = StdRng::from_entropy();
    let today = kr_market::seoul_date(Utc::now());
    Json(state.dashboard.snapshot(&mut rng, today).await)
}

async fn create_report(State(state): State<AppState>) -> Result<Json<Report>> {
    match state.dashboard.generate_report(Utc::now()).await {
        ReportOutcome::Generated(report) => Ok(Json(report)),
        ReportOutcome::Busy => Err(AppError::Busy),
        ReportOutcome::CredentialRequired => Err(AppError::CredentialRequired),
        ReportOutcome::CredentialReselect => Err(AppError::CredentialReselect),
        ReportOutcome::Failed { notice } => Err(AppError::Upstream(notice.to_string())),
    }
}

async fn latest_report(state: &AppState) -> Result<Report> {
    state
        .dashboard
        .latest_report()
        .await
        .ok_or_else(|| AppError::NotFound("no report generated yet".to_string()))
}

async fn get_latest_report(State(state): State<AppState>) -> Result<Json<Report>> {
    Ok(Json(latest_report(&state).await?))
}

async fn get_latest_markdown(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let report = latest_report(&state).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        render::report_markdown(&report),
    ))
}

async fn get_latest_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<String> {
    let section: Section = section
        .parse()
        .map_err(|e: anyhow::Error| AppError::Validation(e.to_string()))?;
    let report = latest_report(&state).await?;
    Ok(render::section_text(&report, section))
}

#[derive(Debug, Deserialize)]
struct OpenStockRequest {
    name: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    change: String,
    #[serde(default)]
    trend: TrendBias,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockDetailResponse {
    #[serde(flatten)]
    detail: StockDetail,
    /// False when another stock was opened before the analysis finished.
    current: bool,
}

async fn open_stock_detail(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(req): Json<OpenStockRequest>,
) -> Result<Json<StockDetailResponse>> {
    if ticker.trim().is_empty() || req.name.trim().is_empty() {
        return Err(AppError::Validation("ticker and name are required".to_string()));
    }

    let item = StockItem {
        ticker,
        name: req.name,
        price: req.price,
        change: req.change,
    };
    let today = kr_market::seoul_date(Utc::now());
    let mut rng = StdRng::from_entropy();
    let opened = state.dashboard.open_stock(&mut rng, today, item, req.trend).await;

    let response = match state.dashboard.analyze_stock(opened.ticket).await {
        Some(detail) => StockDetailResponse {
            detail,
            current: true,
        },
        None => StockDetailResponse {
            detail: opened,
            current: false,
        },
    };
    Ok(Json(response))
}

async fn get_stock_detail(State(state): State<AppState>) -> Result<Json<StockDetail>> {
    state
        .dashboard
        .stock_detail()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no stock detail is open".to_string()))
}

async fn close_stock_detail(State(state): State<AppState>) -> StatusCode {
    state.dashboard.close_stock().await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    time: String,
    days: Vec<DayToken>,
}

async fn get_schedule(State(state): State<AppState>) -> Json<ScheduleConfig> {
    Json(state.dashboard.schedule().await)
}

async fn put_schedule(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleConfig>> {
    state
        .dashboard
        .enable_schedule(&req.time, req.days)
        .await
        .map(Json)
        .map_err(|e| AppError::Validation(format!("{e:#}")))
}

async fn delete_schedule(State(state): State<AppState>) -> Result<Json<ScheduleConfig>> {
    Ok(Json(state.dashboard.disable_schedule().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialStatus {
    ready: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRequest {
    api_key: String,
}

async fn get_credential(State(state): State<AppState>) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        ready: state.dashboard.credential_ready().await,
    })
}

async fn put_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<Json<CredentialStatus>> {
    let api_key = non_blank_key(req.api_key)?;
    state.keys.stage(api_key).await;
    state
        .dashboard
        .select_credential()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Json(CredentialStatus { ready: true }))
}

/// A blank key would clear the selected one on promotion.
fn non_blank_key(api_key: String) -> Result<String> {
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(AppError::Validation("apiKey must not be blank".to_string()));
    }
    Ok(api_key)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &market_morning_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
