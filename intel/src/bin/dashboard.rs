//! Market Intelligence Dashboard
//!
//! Web front end for generating server market briefs: pick a language and
//! markets, trigger a Gemini report, read it by section, mail a preview.
//!
//! Usage: cargo run --bin dashboard
//! Then open http://localhost:3000

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use market_intel::analyzer::{GeminiClient, TextGenerator};
use market_intel::config::Config;
use market_intel::locale::{Language, Market};
use market_intel::report::RenderedSection;
use market_intel::{GenerationError, ReportService};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

// ── Types ──

struct AppState {
    service: ReportService<Arc<dyn TextGenerator>>,
    default_language: Language,
    /// Held for the whole of a generation; a second trigger gets 409.
    generation_slot: Mutex<()>,
}

type SharedState = Arc<AppState>;

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    language: Option<Language>,
    #[serde(default)]
    markets: Vec<Market>,
}

#[derive(Serialize)]
struct GenerateResponse {
    ok: bool,
    message: String,
    report: ReportView,
    retries: Vec<RetryView>,
}

#[derive(Serialize)]
struct ReportView {
    id: Uuid,
    language: Language,
    markets: Vec<Market>,
    generated_on: NaiveDate,
    attempts: u32,
    fallback: bool,
    sections: Vec<RenderedSection>,
    mail_link: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct RetryView {
    attempt: u32,
    max_attempts: u32,
    delay_secs: u64,
    message: String,
}

#[derive(Serialize)]
struct OptionsResponse {
    default_language: Language,
    default_markets: Vec<Market>,
    max_attempts: u32,
    retry_delay_secs: u64,
    languages: Vec<LanguageView>,
}

#[derive(Serialize)]
struct LanguageView {
    code: &'static str,
    display_name: &'static str,
    page_title: &'static str,
    generate_button: &'static str,
    busy_text: &'static str,
    /// Shown with the busy indicator; retries happen while the request is open.
    retry_hint: String,
    mail_button: &'static str,
    markets: Vec<MarketView>,
}

#[derive(Serialize)]
struct MarketView {
    code: &'static str,
    label: &'static str,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "ok": false, "message": self.message }))).into_response()
    }
}

// ── Main ──

#[tokio::main]
async fn main() -> Result<()> {
    market_intel::init_tracing();

    let cfg = Config::from_env()?;
    let gemini = GeminiClient::new(
        &cfg.gemini_api_key,
        &cfg.gemini_model,
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    let generator: Arc<dyn TextGenerator> = Arc::new(gemini);

    info!("══════════════════════════════════════════════");
    info!("  Market Intelligence Dashboard");
    info!("  Model: {} + Google Search", cfg.gemini_model);
    info!("  Retry: {} attempts, {}s backoff", cfg.max_attempts, cfg.retry_delay_secs);
    info!("  http://localhost:{}", cfg.dashboard_port);
    info!("══════════════════════════════════════════════");
    if cfg.mail_recipient.is_empty() {
        warn!("MAIL_RECIPIENT not set, reports will have no mail link");
    }

    let state: SharedState = Arc::new(AppState {
        service: ReportService::from_config(generator, &cfg),
        default_language: cfg.default_language,
        generation_slot: Mutex::new(()),
    });

    let addr = format!("0.0.0.0:{}", cfg.dashboard_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dashboard running at http://localhost:{}", cfg.dashboard_port);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(serve_html))
        .route("/api/health", get(api_health))
        .route("/api/options", get(api_options))
        .route("/api/generate", post(api_generate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── API Handlers ──

async fn serve_html() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn api_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn api_options(State(state): State<SharedState>) -> Json<OptionsResponse> {
    let policy = state.service.retry_policy();
    let languages = Language::ALL
        .into_iter()
        .map(|lang| {
            let p = lang.profile();
            LanguageView {
                code: p.code,
                display_name: p.display_name,
                page_title: p.page_title,
                generate_button: p.generate_button,
                busy_text: p.busy_text,
                retry_hint: format!(
                    "{} ({}s × {})",
                    p.retrying_text,
                    policy.delay.as_secs(),
                    policy.max_attempts.max(1)
                ),
                mail_button: p.mail_button,
                markets: Market::ALL
                    .into_iter()
                    .map(|m| MarketView { code: m.code(), label: m.label(lang) })
                    .collect(),
            }
        })
        .collect();

    Json(OptionsResponse {
        default_language: state.default_language,
        default_markets: Market::DEFAULT_SELECTION.to_vec(),
        max_attempts: policy.max_attempts,
        retry_delay_secs: policy.delay.as_secs(),
        languages,
    })
}

async fn api_generate(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let language = req.language.unwrap_or(state.default_language);
    let profile = language.profile();
    let markets = Market::normalize_selection(&req.markets);
    if markets.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, profile.no_market_text));
    }

    let _slot = state.generation_slot.try_lock().map_err(|_| {
        warn!("Generation already in flight, rejecting request");
        ApiError::new(StatusCode::CONFLICT, profile.busy_conflict_text)
    })?;

    let mut retries = Vec::new();
    let result = state
        .service
        .generate(language, &markets, |notice| {
            retries.push(RetryView {
                attempt: notice.attempt,
                max_attempts: notice.max_attempts,
                delay_secs: notice.delay.as_secs(),
                message: profile.retrying_text.to_string(),
            });
        })
        .await;

    match result {
        Ok(report) => Ok(Json(GenerateResponse {
            ok: true,
            message: profile.success_text.to_string(),
            report: ReportView {
                id: report.id,
                language: report.language,
                markets: report.markets.clone(),
                generated_on: report.generated_on,
                attempts: report.attempts,
                fallback: report.sections.is_fallback(),
                sections: report.rendered_sections(),
                mail_link: report.mail_link.clone(),
            },
            retries,
        })),
        Err(e @ GenerationError::Exhausted { .. }) => {
            error!("Report generation exhausted: {e}");
            Err(ApiError::new(StatusCode::TOO_MANY_REQUESTS, profile.exhausted_text))
        }
        Err(e) => {
            error!("Report generation failed: {e}");
            Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                format!("{}: {e}", profile.failure_text),
            ))
        }
    }
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Market Intelligence</title>
<style>
  * { box-sizing: border-box; }
  body { margin: 0; font-family: -apple-system, "Segoe UI", "Noto Sans TC", "Noto Sans JP", sans-serif; background: #0f172a; color: #e2e8f0; }
  .layout { display: flex; min-height: 100vh; }
  aside { width: 280px; padding: 24px; background: #111827; border-right: 1px solid #1f2937; }
  main { flex: 1; padding: 32px; max-width: 1100px; }
  h1 { font-size: 1.6rem; margin: 0 0 24px; }
  label { display: block; font-size: .85rem; color: #94a3b8; margin: 16px 0 6px; }
  select { width: 100%; padding: 8px; background: #1f2937; color: #e2e8f0; border: 1px solid #334155; border-radius: 6px; }
  .market { display: flex; align-items: center; gap: 8px; margin: 6px 0; color: #e2e8f0; font-size: .95rem; }
  button { width: 100%; margin-top: 24px; padding: 10px; border: 0; border-radius: 6px; background: #2563eb; color: white; font-weight: 600; cursor: pointer; }
  button:disabled { background: #475569; cursor: wait; }
  .status { padding: 12px 16px; border-radius: 6px; margin-bottom: 16px; display: none; }
  .status.busy { display: block; background: #1e293b; }
  .status.ok { display: block; background: #064e3b; }
  .status.err { display: block; background: #7f1d1d; }
  .tabs { display: flex; gap: 4px; border-bottom: 1px solid #334155; }
  .tab { padding: 8px 16px; cursor: pointer; border-radius: 6px 6px 0 0; color: #94a3b8; }
  .tab.active { background: #1e293b; color: #e2e8f0; }
  .panel { background: #1e293b; padding: 20px; border-radius: 0 6px 6px 6px; white-space: pre-wrap; line-height: 1.6; }
  .mail { display: inline-block; margin-top: 16px; color: #93c5fd; }
  .meta { font-size: .8rem; color: #64748b; margin-top: 12px; }
</style>
</head>
<body>
<div class="layout">
  <aside>
    <label for="lang">Language</label>
    <select id="lang"></select>
    <label>Markets</label>
    <div id="markets"></div>
    <button id="go"></button>
  </aside>
  <main>
    <h1 id="title"></h1>
    <div id="status" class="status"></div>
    <div id="tabs" class="tabs"></div>
    <div id="panel"></div>
    <a id="mail" class="mail" style="display:none"></a>
    <div id="meta" class="meta"></div>
  </main>
</div>
<script>
let options = null;
let report = null;

function profile() {
  const code = document.getElementById('lang').value;
  return options.languages.find(l => l.code === code);
}

function renderControls() {
  const p = profile();
  document.title = p.page_title;
  document.getElementById('title').textContent = p.page_title;
  document.getElementById('go').textContent = p.generate_button;
  const box = document.getElementById('markets');
  const checked = new Set([...box.querySelectorAll('input:checked')].map(i => i.value));
  const initial = box.children.length === 0;
  box.innerHTML = '';
  for (const m of p.markets) {
    const row = document.createElement('label');
    row.className = 'market';
    const input = document.createElement('input');
    input.type = 'checkbox';
    input.value = m.code;
    input.checked = initial ? options.default_markets.includes(m.code) : checked.has(m.code);
    row.appendChild(input);
    row.appendChild(document.createTextNode(m.label));
    box.appendChild(row);
  }
}

function setStatus(kind, text) {
  const el = document.getElementById('status');
  el.className = 'status ' + kind;
  el.textContent = text;
}

function showSection(idx) {
  const tabs = document.getElementById('tabs').children;
  for (let i = 0; i < tabs.length; i++) tabs[i].classList.toggle('active', i === idx);
  document.getElementById('panel').innerHTML = '';
  const panel = document.createElement('div');
  panel.className = 'panel';
  panel.textContent = report.sections[idx].text;
  document.getElementById('panel').appendChild(panel);
}

function renderReport(data) {
  report = data.report;
  const tabs = document.getElementById('tabs');
  tabs.innerHTML = '';
  report.sections.forEach((s, i) => {
    const t = document.createElement('div');
    t.className = 'tab';
    t.textContent = s.heading;
    t.onclick = () => showSection(i);
    tabs.appendChild(t);
  });
  showSection(0);
  const mail = document.getElementById('mail');
  if (report.mail_link) {
    mail.href = report.mail_link;
    mail.textContent = profile().mail_button;
    mail.style.display = 'inline-block';
  } else {
    mail.style.display = 'none';
  }
  const retried = data.retries.length ? ` · retries: ${data.retries.length}` : '';
  document.getElementById('meta').textContent =
    `${report.generated_on} · attempts: ${report.attempts}${retried} · ${report.id}`;
}

async function generate() {
  const btn = document.getElementById('go');
  const markets = [...document.querySelectorAll('#markets input:checked')].map(i => i.value);
  btn.disabled = true;
  setStatus('busy', `${profile().busy_text} · ${profile().retry_hint}`);
  try {
    const res = await fetch('/api/generate', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ language: document.getElementById('lang').value, markets }),
    });
    const data = await res.json().catch(() => ({ ok: false, message: res.statusText }));
    if (data.ok) {
      setStatus('ok', data.message);
      renderReport(data);
    } else {
      setStatus('err', data.message);
    }
  } catch (e) {
    setStatus('err', String(e));
  } finally {
    btn.disabled = false;
  }
}

async function init() {
  options = await (await fetch('/api/options')).json();
  const sel = document.getElementById('lang');
  for (const l of options.languages) {
    const o = document.createElement('option');
    o.value = l.code;
    o.textContent = l.display_name;
    sel.appendChild(o);
  }
  sel.value = options.default_language;
  sel.onchange = renderControls;
  document.getElementById('go').onclick = generate;
  renderControls();
}

init();
</script>
</body>
</html>
"##;
