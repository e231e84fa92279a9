use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    ActivatedStrategy, CycleRow, InvestmentParameters, ProjectionError, ProjectionRow, Roadmap,
    build_roadmap, round2,
};
use crate::store::{
    DEFAULT_RISK_LEVEL, JsonFileStore, KeyValueStore, StoreError, activate, activated_strategies,
    questionnaire_answers, risk_level, save_questionnaire_answers,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const DEFAULT_MONTHLY_INVESTMENT: f64 = 100.0;
const DEFAULT_INVESTMENT_PERIOD: u32 = 12;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "roadmap",
    about = "Dollar-cost averaging roadmap: contribution projection, market-cycle curve and strategy activation"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard page and JSON API
    Serve(ServeArgs),
    /// Print the projection and market cycle for one instrument
    Project(ProjectCommand),
    /// Record a strategy activation in the store
    Activate(ActivateCommand),
    /// List activated strategies
    Strategies(StoreArgs),
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    #[arg(
        long,
        env = "ROADMAP_STORE",
        default_value = "roadmap-store.json",
        help = "JSON file backing the key-value store"
    )]
    store: PathBuf,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "ROADMAP_PORT", default_value_t = 8080)]
    port: u16,
    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
struct ProjectArgs {
    #[arg(long, help = "Instrument symbol, e.g. BTC")]
    symbol: String,
    #[arg(long, help = "Instrument display name; defaults to the symbol")]
    name: Option<String>,
    #[arg(
        long,
        allow_hyphen_values = true,
        value_parser = parse_allocation_text,
        help = "Baseline annual growth in percent, e.g. 8 or 8%"
    )]
    allocation: f64,
    #[arg(long, default_value_t = DEFAULT_MONTHLY_INVESTMENT)]
    monthly_investment: f64,
    #[arg(long, default_value_t = DEFAULT_INVESTMENT_PERIOD, help = "Horizon in months")]
    investment_period: u32,
}

#[derive(Args, Debug)]
struct ProjectCommand {
    #[command(flatten)]
    args: ProjectArgs,
    #[command(flatten)]
    store: StoreArgs,
    #[arg(long, help = "Print the API JSON instead of a table")]
    json: bool,
}

#[derive(Args, Debug)]
struct ActivateCommand {
    #[command(flatten)]
    args: ProjectArgs,
    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AllocationValue {
    Number(f64),
    Text(String),
}

impl AllocationValue {
    fn percent(&self) -> Result<f64, ProjectionError> {
        match self {
            AllocationValue::Number(v) => Ok(*v),
            AllocationValue::Text(text) => {
                parse_allocation_text(text).map_err(ProjectionError::InvalidParameter)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RoadmapPayload {
    #[serde(alias = "instrumentSymbol")]
    symbol: Option<String>,
    #[serde(alias = "instrumentName")]
    name: Option<String>,
    #[serde(alias = "baselineAnnualRate")]
    allocation: Option<AllocationValue>,
    #[serde(alias = "monthlyContribution")]
    monthly_investment: Option<f64>,
    #[serde(alias = "horizonMonths")]
    investment_period: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeResponse {
    total_invested: f64,
    projected_value: f64,
    profit: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoadmapResponse {
    symbol: String,
    name: String,
    monthly_investment: f64,
    investment_period: u32,
    baseline_annual_rate: f64,
    risk_level: String,
    outcome: OutcomeResponse,
    expected_return_percent: f64,
    projection: Vec<ProjectionRow>,
    market_cycle: Vec<CycleRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type SharedStore = Arc<Mutex<Box<dyn KeyValueStore + Send>>>;

/// Every request goes through the one store owner, so activations from
/// concurrent requests are applied one after another.
#[derive(Clone)]
struct AppState {
    store: SharedStore,
}

impl AppState {
    fn new(store: impl KeyValueStore + Send + 'static) -> Self {
        let store: Box<dyn KeyValueStore + Send> = Box::new(store);
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut (dyn KeyValueStore + Send)) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .store
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        f(&mut **guard)
    }
}

fn parse_allocation_text(text: &str) -> Result<f64, String> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!(
            "allocation must be a number or percentage, got '{text}'"
        )),
    }
}

fn build_parameters(args: ProjectArgs) -> Result<InvestmentParameters, ProjectionError> {
    InvestmentParameters::new(
        args.symbol,
        args.name,
        args.allocation,
        args.monthly_investment,
        args.investment_period,
    )
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Serve(args) => {
            run_http_server(args.port, JsonFileStore::new(args.store.store)).await?;
        }
        Command::Project(cmd) => {
            let store = JsonFileStore::new(cmd.store.store);
            let roadmap = build_roadmap(build_parameters(cmd.args)?)?;
            let risk = risk_level_or_default(&store);
            if cmd.json {
                let response = build_roadmap_response(&roadmap, risk);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", render_roadmap_text(&roadmap, &risk));
            }
        }
        Command::Activate(cmd) => {
            let mut store = JsonFileStore::new(cmd.store.store);
            let roadmap = build_roadmap(build_parameters(cmd.args)?)?;
            let strategy = activate(&mut store, &roadmap.outcome, &roadmap.parameters)?;
            println!("{}", serde_json::to_string_pretty(&strategy)?);
        }
        Command::Strategies(args) => {
            let store = JsonFileStore::new(args.store);
            print!("{}", render_strategies_text(&activated_strategies(&store)?));
        }
    }
    Ok(())
}

fn risk_level_or_default<S>(store: &S) -> String
where
    S: KeyValueStore + ?Sized,
{
    risk_level(store).unwrap_or_else(|e| {
        warn!("could not read questionnaire answers: {e}");
        DEFAULT_RISK_LEVEL.to_string()
    })
}

pub async fn run_http_server(port: u16, store: JsonFileStore) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(store = %store.path().display(), "using key-value store");
    let app = router(AppState::new(store));

    let listener = TcpListener::bind(addr).await?;
    info!("roadmap HTTP API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/roadmap",
            get(roadmap_get_handler).post(roadmap_post_handler),
        )
        .route(
            "/api/strategies",
            get(strategies_get_handler).post(strategies_post_handler),
        )
        .route(
            "/api/questionnaire",
            get(questionnaire_get_handler).put(questionnaire_put_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn roadmap_get_handler(
    State(state): State<AppState>,
    payload: Result<Query<RoadmapPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => roadmap_handler_impl(&state, payload),
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    }
}

async fn roadmap_post_handler(
    State(state): State<AppState>,
    payload: Result<Json<RoadmapPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => roadmap_handler_impl(&state, payload),
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    }
}

fn roadmap_handler_impl(state: &AppState, payload: RoadmapPayload) -> Response {
    let roadmap = match parameters_from_payload(payload).and_then(build_roadmap) {
        Ok(roadmap) => roadmap,
        Err(e) => return app_error_response(&AppError::from(e)),
    };

    let risk = state
        .with_store(|store| Ok(risk_level_or_default(&*store)))
        .unwrap_or_else(|e| {
            warn!("store unavailable for risk level: {e}");
            DEFAULT_RISK_LEVEL.to_string()
        });
    json_response(StatusCode::OK, build_roadmap_response(&roadmap, risk))
}

async fn strategies_get_handler(State(state): State<AppState>) -> Response {
    match state.with_store(|store| activated_strategies(&*store)) {
        Ok(strategies) => json_response(StatusCode::OK, strategies),
        Err(e) => app_error_response(&AppError::from(e)),
    }
}

async fn strategies_post_handler(
    State(state): State<AppState>,
    payload: Result<Json<RoadmapPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };
    match activate_from_payload(&state, payload) {
        Ok(strategy) => json_response(StatusCode::CREATED, strategy),
        Err(e) => app_error_response(&e),
    }
}

fn activate_from_payload(
    state: &AppState,
    payload: RoadmapPayload,
) -> Result<ActivatedStrategy, AppError> {
    let roadmap = build_roadmap(parameters_from_payload(payload)?)?;
    let strategy =
        state.with_store(|store| activate(store, &roadmap.outcome, &roadmap.parameters))?;
    Ok(strategy)
}

async fn questionnaire_get_handler(State(state): State<AppState>) -> Response {
    match state.with_store(|store| questionnaire_answers(&*store)) {
        Ok(answers) => json_response(StatusCode::OK, answers),
        Err(e) => app_error_response(&AppError::from(e)),
    }
}

async fn questionnaire_put_handler(
    State(state): State<AppState>,
    answers: Result<Json<BTreeMap<String, Value>>, JsonRejection>,
) -> Response {
    let answers = match answers {
        Ok(Json(answers)) => answers,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };
    match state.with_store(|store| save_questionnaire_answers(store, &answers)) {
        Ok(()) => json_response(StatusCode::OK, answers),
        Err(e) => app_error_response(&AppError::from(e)),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

/// Malformed body or query string, reported in the same JSON shape as
/// every other error.
fn rejection_response(status: StatusCode, detail: String) -> Response {
    warn!("rejected request: {detail}");
    error_response(status, &detail)
}

fn error_status(err: &AppError) -> StatusCode {
    match err {
        AppError::Projection(ProjectionError::InvalidParameter(_)) => StatusCode::BAD_REQUEST,
        AppError::Projection(ProjectionError::EmptyInput)
        | AppError::Store(_)
        | AppError::Encode(_)
        | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn app_error_response(err: &AppError) -> Response {
    let status = error_status(err);
    if status.is_server_error() {
        error!("request failed: {err}");
    } else {
        warn!("rejected request: {err}");
    }
    error_response(status, &err.to_string())
}

#[cfg(test)]
fn parameters_from_json(json: &str) -> Result<InvestmentParameters, String> {
    let payload = serde_json::from_str::<RoadmapPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    parameters_from_payload(payload).map_err(|e| e.to_string())
}

fn parameters_from_payload(payload: RoadmapPayload) -> Result<InvestmentParameters, ProjectionError> {
    let (Some(symbol), Some(allocation)) = (payload.symbol, payload.allocation) else {
        return Err(ProjectionError::InvalidParameter(
            "Missing investment parameters: symbol and allocation are required".to_string(),
        ));
    };

    let mut args = ProjectArgs {
        symbol,
        name: payload.name,
        allocation: allocation.percent()?,
        monthly_investment: DEFAULT_MONTHLY_INVESTMENT,
        investment_period: DEFAULT_INVESTMENT_PERIOD,
    };

    if let Some(v) = payload.monthly_investment {
        args.monthly_investment = v;
    }
    if let Some(v) = payload.investment_period {
        args.investment_period = v;
    }

    build_parameters(args)
}

fn build_roadmap_response(roadmap: &Roadmap, risk_level: String) -> RoadmapResponse {
    let params = &roadmap.parameters;
    RoadmapResponse {
        symbol: params.instrument_symbol().to_string(),
        name: params.instrument_name().to_string(),
        monthly_investment: params.monthly_contribution(),
        investment_period: params.horizon_months(),
        baseline_annual_rate: params.baseline_annual_rate(),
        risk_level,
        outcome: OutcomeResponse {
            total_invested: round2(roadmap.outcome.total_invested),
            projected_value: round2(roadmap.outcome.projected_value),
            profit: round2(roadmap.outcome.profit),
        },
        expected_return_percent: roadmap.expected_return_percent(),
        projection: roadmap.projection_rows(),
        market_cycle: roadmap.cycle_rows(),
    }
}

fn render_roadmap_text(roadmap: &Roadmap, risk_level: &str) -> String {
    let params = &roadmap.parameters;
    let outcome = &roadmap.outcome;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Roadmap for {} ({})",
        params.instrument_name(),
        params.instrument_symbol()
    );
    let _ = writeln!(
        out,
        "  Monthly investment: {:.2} for {} months",
        params.monthly_contribution(),
        params.horizon_months()
    );
    let _ = writeln!(out, "  Baseline allocation: {:.2}%", params.baseline_annual_rate());
    let _ = writeln!(out, "  Risk level: {risk_level}");
    let _ = writeln!(out, "  Total invested: {:.2}", outcome.total_invested);
    let _ = writeln!(out, "  Projected value: {:.2}", outcome.projected_value);
    let _ = writeln!(out, "  Potential profit: {:.2}", outcome.profit);
    let _ = writeln!(
        out,
        "  Projected return: {:.2}%",
        roadmap.expected_return_percent()
    );
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:>5}  {:<12} {:>12} {:>12} {:>7}  {:<18} {:>10} {:>7} {:>9}",
        "Month", "Phase", "Invested", "Value", "Rate%", "Market phase", "Market", "Prob%", "Return%"
    );
    for (row, cycle) in roadmap
        .projection_rows()
        .iter()
        .zip(roadmap.cycle_rows().iter())
    {
        let _ = writeln!(
            out,
            "{:>5}  {:<12} {:>12.2} {:>12.2} {:>7.2}  {:<18} {:>10.2} {:>7.2} {:>9.2}",
            row.month,
            row.market_phase.label(),
            row.total_investment,
            row.projected_value,
            row.monthly_return,
            cycle.market_phase.label(),
            cycle.market_value,
            cycle.bull_run_probability,
            cycle.potential_return,
        );
    }
    out
}

fn render_strategies_text(strategies: &[ActivatedStrategy]) -> String {
    if strategies.is_empty() {
        return "No activated strategies.\n".to_string();
    }
    let mut out = String::new();
    for s in strategies {
        let _ = writeln!(
            out,
            "{}  {} ({})  {:.2}/month for {} months  expected {:.2}%",
            s.activation_date,
            s.name,
            s.symbol,
            s.monthly_investment,
            s.investment_period,
            s.expected_return_percent
        );
    }
    out
}
