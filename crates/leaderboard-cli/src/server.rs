//! Dashboard HTTP server
//!
//! Serves a server-rendered leaderboard page plus a small JSON API over the
//! refresh scheduler's snapshots. The page has three tabs selected with
//! `?tab=`: the benchmark table, an about page and an API overview.
//!
//! The theme is a per-browser preference kept in a `theme` cookie. Browsers
//! without one get the server's default from [`ThemeState`].

use crate::output::{format_latency, format_percentage, format_score};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use leaderboard_core::config::DisplayConfig;
use leaderboard_core::{
    project, sort_rows, DisplayRow, Error, FetchPhase, RefreshHandle, RefreshSnapshot, SortKey,
    SortOrder, Task, Theme, ThemeState,
};
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Cookie carrying a browser's theme
const THEME_COOKIE: &str = "theme";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub refresh: RefreshHandle,
    /// Theme for browsers that have not chosen one
    pub theme: ThemeState,
    pub display: DisplayConfig,
    pub period: Duration,
    /// Refetch when a browser reports it came back online
    pub refetch_on_reconnect: bool,
}

/// Build the dashboard router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/rows", get(rows_handler))
        .route("/api/raw", get(raw_handler))
        .route("/api/status", get(status_handler))
        .route("/api/retry", post(retry_handler))
        .route("/api/filter", post(filter_handler))
        .route("/api/theme", get(get_theme_handler).post(set_theme_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Page sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Benchmark,
    About,
    Api,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Benchmark, Tab::About, Tab::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Benchmark => "benchmark",
            Tab::About => "about",
            Tab::Api => "api",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Tab::Benchmark => "LLM Benchmark",
            Tab::About => "About",
            Tab::Api => "API",
        }
    }

    /// Unknown or missing names fall back to the benchmark table
    fn from_query(name: Option<&str>) -> Self {
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|tab| tab.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown tab: {}", s))
    }
}

/// Query parameters shared by the page and `/api/rows`
#[derive(Debug, Default, Deserialize)]
pub struct RowsQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub tab: Option<String>,
}

/// Rows ready for display plus how they were produced
struct RowsView {
    rows: Vec<DisplayRow>,
    filter: String,
    key: SortKey,
    order: SortOrder,
}

impl RowsQuery {
    /// A `filter` parameter projects the current dataset for this request only;
    /// without one the scheduler's own rows are used.
    fn resolve(&self, snapshot: &RefreshSnapshot, display: &DisplayConfig) -> Result<RowsView, Error> {
        let key = self
            .sort
            .as_deref()
            .unwrap_or(&display.sort_by)
            .parse::<SortKey>()
            .map_err(Error::invalid_request)?;
        let order = match self.order.as_deref() {
            Some(order) => order.parse::<SortOrder>().map_err(Error::invalid_request)?,
            None if display.descending => SortOrder::Descending,
            None => SortOrder::Ascending,
        };

        let (mut rows, filter) = match (&self.filter, &snapshot.dataset) {
            (Some(filter), Some(dataset)) => (project(dataset, filter), filter.clone()),
            (Some(filter), None) => (Vec::new(), filter.clone()),
            (None, _) => (snapshot.rows.as_ref().clone(), snapshot.filter.clone()),
        };
        sort_rows(&mut rows, key, order);

        Ok(RowsView {
            rows,
            filter,
            key,
            order,
        })
    }
}

fn error_response(err: Error) -> Response {
    let status = StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": err.to_string(),
            "category": err.category(),
        })),
    )
        .into_response()
}

/// Theme chosen by this browser, if it sent a valid `theme` cookie
fn cookie_theme(headers: &HeaderMap) -> Option<Theme> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == THEME_COOKIE)
        .and_then(|(_, value)| value.trim().parse().ok())
}

fn client_theme(state: &AppState, headers: &HeaderMap) -> Theme {
    cookie_theme(headers).unwrap_or_else(|| state.theme.current())
}

async fn index_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RowsQuery>,
) -> Response {
    let snapshot = state.refresh.snapshot();
    match query.resolve(&snapshot, &state.display) {
        Ok(view) => {
            let page = Page {
                snapshot: &snapshot,
                view: &view,
                tab: Tab::from_query(query.tab.as_deref()),
                theme: client_theme(&state, &headers),
                show_stderr: state.display.show_stderr,
                period: state.period,
                refetch_on_reconnect: state.refetch_on_reconnect,
            };
            Html(page.render()).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(format!("<p>{}</p><p><a href=\"/\">Back</a></p>", escape_html(&e.to_string()))),
        )
            .into_response(),
    }
}

async fn rows_handler(State(state): State<AppState>, Query(query): Query<RowsQuery>) -> Response {
    let snapshot = state.refresh.snapshot();
    match query.resolve(&snapshot, &state.display) {
        Ok(view) => (
            StatusCode::OK,
            Json(json!({
                "rows": view.rows,
                "filter": view.filter,
                "sort": view.key.to_string(),
                "descending": view.order == SortOrder::Descending,
                "error": snapshot.error,
                "last_success": snapshot.last_success,
                "generation": snapshot.generation,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn raw_handler(State(state): State<AppState>) -> Response {
    match state.refresh.snapshot().dataset {
        Some(dataset) => (StatusCode::OK, Json(dataset.as_ref())).into_response(),
        None => error_response(Error::unavailable("leaderboard has not been loaded yet")),
    }
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.refresh.snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "phase": snapshot.phase,
            "last_outcome": snapshot.last_outcome,
            "error": snapshot.error,
            "last_success": snapshot.last_success,
            "last_attempt": snapshot.last_attempt,
            "generation": snapshot.generation,
            "attempts": snapshot.attempts,
            "filter": snapshot.filter,
            "nodes": snapshot.node_count(),
            "rows": snapshot.rows.len(),
            "refresh_interval_ms": state.period.as_millis() as u64,
        })),
    )
}

async fn retry_handler(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Manual refresh requested");
    state.refresh.retry();
    (StatusCode::ACCEPTED, Json(json!({"status": "accepted"})))
}

#[derive(Debug, Deserialize)]
struct FilterRequest {
    filter: String,
}

async fn filter_handler(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> impl IntoResponse {
    state.refresh.set_filter(request.filter.clone());
    (StatusCode::ACCEPTED, Json(json!({"filter": request.filter})))
}

async fn get_theme_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"theme": client_theme(&state, &headers)})))
}

/// An explicit theme sets it, an empty body toggles
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThemeRequest {
    theme: Option<Theme>,
}

/// Stores the choice in this browser's cookie; other visitors are unaffected
async fn set_theme_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ThemeRequest>,
) -> Response {
    let theme = request
        .theme
        .unwrap_or_else(|| client_theme(&state, &headers).toggle());
    let cookie = format!(
        "{}={}; Path=/; Max-Age=31536000; SameSite=Lax",
        THEME_COOKIE, theme
    );

    let mut response = (StatusCode::OK, Json(json!({"theme": theme}))).into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => debug!("Not setting theme cookie: {}", e),
    }
    response
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.refresh.snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "loaded": snapshot.is_loaded(),
            "stale": snapshot.is_error(),
        })),
    )
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem; background: #fff; color: #222; }
body.dark { background: #121212; color: #e0e0e0; }
body.dark a { color: #8ab4f8; }
nav { border-bottom: 1px solid #8884; padding-bottom: .5rem; margin-bottom: 1rem; }
nav a { margin-right: 1.2rem; text-decoration: none; }
nav a.active { font-weight: 600; text-decoration: underline; }
table { border-collapse: collapse; margin-top: 1rem; }
th, td { padding: .35rem .7rem; border-bottom: 1px solid #8884; text-align: right; }
th:first-child, td:first-child { text-align: left; font-family: monospace; }
.banner { background: #fdecea; color: #611a15; padding: .7rem 1rem; margin: 1rem 0; }
.meta { color: #888; font-size: .85rem; }
"#;

const SCRIPT: &str = r#"
function post(path, body) {
  return fetch(path, {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify(body || {})
  });
}
function retryFetch() {
  post('/api/retry').then(() => setTimeout(() => location.reload(), 1000));
}
function toggleTheme() {
  post('/api/theme', {}).then(() => location.reload());
}
"#;

/// Fires only once the browser can reach the server again
const RECONNECT_SCRIPT: &str = "window.addEventListener('online', retryFetch);\n";

const ABOUT_HTML: &str = r#"<h2>About</h2>
<p>Evaluating a language model involves analyzing many aspects of its capabilities,
from recall to solving math problems. Leaderboards such as the
<a href="https://huggingface.co/spaces/open-llm-leaderboard/open_llm_leaderboard" target="_blank">Open LLM Leaderboard</a>
simplify that work.</p>
<p>This leaderboard gives network users the same information they look at when choosing an
open model, with these differences:</p>
<ul>
<li><strong>What you see is what you get:</strong> rows are live inference endpoints, not model names.</li>
<li><strong>Live data:</strong> tests run around the clock and scores update each time a node enters a session.</li>
<li><strong>Trustless and permissionless:</strong> every node connected to the network is tracked and reported, whoever runs it.</li>
</ul>
<h3>Tasks</h3>
<p>Models are evaluated on six benchmarks through the machine learning test bench, which runs the
EleutherAI Language Model Evaluation Harness:</p>
<ul>
<li><a href="https://arxiv.org/abs/1803.05457" target="_blank">AI2 Reasoning Challenge</a> (25-shot): grade-school science questions.</li>
<li><a href="https://arxiv.org/abs/1905.07830" target="_blank">HellaSwag</a> (10-shot): commonsense inference, easy for humans but hard for models.</li>
<li><a href="https://arxiv.org/abs/2009.03300" target="_blank">MMLU</a> (5-shot): multitask accuracy over 57 subjects.</li>
<li><a href="https://arxiv.org/abs/2109.07958" target="_blank">TruthfulQA</a> (0-shot): propensity to repeat common falsehoods.</li>
<li><a href="https://arxiv.org/abs/1907.10641" target="_blank">Winogrande</a> (5-shot): adversarial Winograd schemas for commonsense reasoning.</li>
<li><a href="https://arxiv.org/abs/2110.14168" target="_blank">GSM8k</a> (5-shot): multi-step grade-school math word problems.</li>
</ul>
<p>Live endpoints are not run over whole datasets. Each task (or MMLU sub-task) uses 50 samples,
which moves accuracy by less than 5% (<a href="http://arxiv.org/abs/2402.14992" target="_blank">tinyBenchmarks, Polo et al.</a>).
A higher score is better.</p>
<h3>Reproducibility</h3>
<p>The code producing these results is in the
<a href="https://github.com/pokt-scan/pocket-ml-testbench" target="_blank">Machine Learning Test Bench</a> repository.
Results are not numerically exact: they depend on a random sample of each dataset and node performance varies over time.</p>
"#;

/// Everything one page render needs
struct Page<'a> {
    snapshot: &'a RefreshSnapshot,
    view: &'a RowsView,
    tab: Tab,
    theme: Theme,
    show_stderr: bool,
    period: Duration,
    refetch_on_reconnect: bool,
}

impl Page<'_> {
    fn render(&self) -> String {
        let mut page = String::new();

        // Only the live table reloads itself
        let refresh = match self.tab {
            Tab::Benchmark => format!(
                "<meta http-equiv=\"refresh\" content=\"{}\">\n",
                self.period.as_secs().max(1)
            ),
            _ => String::new(),
        };
        let _ = write!(
            page,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             {}<title>LLM Leaderboard</title>\n\
             <style>{}</style>\n</head>\n<body class=\"{}\">\n<h1>LLM Leaderboard</h1>\n",
            refresh, STYLE, self.theme
        );

        page.push_str("<nav>");
        for tab in Tab::ALL {
            let class = if tab == self.tab { " class=\"active\"" } else { "" };
            let _ = write!(
                page,
                "<a href=\"/?tab={}\"{}>{}</a>",
                tab.as_str(),
                class,
                tab.label()
            );
        }
        page.push_str(
            "<button type=\"button\" onclick=\"toggleTheme()\">Toggle theme</button></nav>\n",
        );

        match self.tab {
            Tab::Benchmark => self.render_benchmark(&mut page),
            Tab::About => page.push_str(ABOUT_HTML),
            Tab::Api => self.render_api(&mut page),
        }

        let _ = write!(page, "<script>{}", SCRIPT);
        if self.refetch_on_reconnect {
            page.push_str(RECONNECT_SCRIPT);
        }
        page.push_str("</script>\n</body>\n</html>\n");
        page
    }

    fn render_benchmark(&self, page: &mut String) {
        let snapshot = self.snapshot;
        let _ = write!(
            page,
            "<form method=\"get\" action=\"/\">\
             <input name=\"filter\" size=\"60\" placeholder=\"node addresses, comma separated\" value=\"{}\">\
             <button type=\"submit\">Filter</button></form>\n",
            escape_html(&self.view.filter)
        );

        if let Some(error) = &snapshot.error {
            let lead = if snapshot.is_loaded() {
                "Refresh failed, showing previous data."
            } else {
                "Could not load the leaderboard."
            };
            let _ = write!(
                page,
                "<div class=\"banner\">{} {} <button type=\"button\" onclick=\"retryFetch()\">Retry</button></div>\n",
                lead,
                escape_html(error)
            );
        }

        if snapshot.is_loaded() {
            render_table(page, self.view, self.show_stderr);
        } else if snapshot.error.is_none() {
            page.push_str("<p>Loading leaderboard...</p>\n");
        }

        let updated = snapshot
            .last_success
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        let phase = match snapshot.phase {
            FetchPhase::Idle => "idle",
            FetchPhase::Fetching => "fetching",
        };
        let _ = write!(
            page,
            "<p class=\"meta\">{} of {} nodes shown. Last updated {}. Refresh {}.</p>\n",
            self.view.rows.len(),
            snapshot.node_count(),
            updated,
            phase
        );
    }

    fn render_api(&self, page: &mut String) {
        page.push_str(
            "<h2>API</h2>\n<p>The data behind this page is available as JSON for apps and portals \
             that want to follow inference node performance live.</p>\n<table>\n\
             <thead><tr><th>Endpoint</th><th>Returns</th></tr></thead>\n<tbody>\n",
        );
        let endpoints = [
            ("GET /api/rows?filter=&amp;sort=&amp;order=", "Display rows, scores scaled to 0-100"),
            ("GET /api/raw", "The leaderboard exactly as fetched"),
            ("GET /api/status", "Refresh state, last update and errors"),
            ("POST /api/retry", "Refresh now"),
            ("GET /health", "Liveness and staleness"),
        ];
        for (endpoint, returns) in endpoints {
            let _ = write!(page, "<tr><td>{}</td><td>{}</td></tr>\n", endpoint, returns);
        }
        let _ = write!(
            page,
            "</tbody>\n</table>\n<p class=\"meta\">Data refreshes every {} seconds.</p>\n",
            self.period.as_secs().max(1)
        );
    }
}

fn render_table(page: &mut String, view: &RowsView, show_stderr: bool) {
    let show_qos = view.rows.iter().any(DisplayRow::has_qos);

    let mut columns: Vec<(String, &str)> = vec![(SortKey::Node.to_string(), "Node")];
    columns.extend(
        Task::ALL
            .iter()
            .map(|task| (SortKey::Task(*task).to_string(), task.header())),
    );
    if show_qos {
        columns.push((SortKey::ResponseTime.to_string(), "Resp. time"));
        columns.push((SortKey::ErrorRate.to_string(), "Error rate"));
    }

    page.push_str("<table>\n<thead><tr>");
    for (key, header) in &columns {
        // Clicking the active column flips its direction
        let order = if *key == view.key.to_string() && view.order == SortOrder::Descending {
            "asc"
        } else {
            "desc"
        };
        let _ = write!(
            page,
            "<th><a href=\"/?filter={}&amp;sort={}&amp;order={}\">{}</a></th>",
            url_encode(&view.filter),
            key,
            order,
            header
        );
    }
    page.push_str("</tr></thead>\n<tbody>\n");

    for row in &view.rows {
        let _ = write!(page, "<tr><td>{}</td>", escape_html(row.node.as_str()));
        for task in Task::ALL {
            let cell = row
                .score(task)
                .map(|score| format_score(score, show_stderr))
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(page, "<td>{}</td>", cell);
        }
        if show_qos {
            let latency = row.response_time.map(format_latency).unwrap_or_else(|| "-".to_string());
            let errors = row.error_rate.map(format_percentage).unwrap_or_else(|| "-".to_string());
            let _ = write!(page, "<td>{}</td><td>{}</td>", latency, errors);
        }
        page.push_str("</tr>\n");
    }
    page.push_str("</tbody>\n</table>\n");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn url_encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}
