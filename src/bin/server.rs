use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cutlist::engine::PackEngine;
use cutlist::score::ScoreStrategy;
use cutlist::stock::Bin;
use cutlist::types::{BinSpec, Demand, PackConfig, PackReport, Piece, expand_demands};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct PackRequest {
    stock: f64,
    #[serde(default)]
    bins: Vec<BinRequest>,
    cuts: Vec<CutRequest>,
    #[serde(default)]
    kerf: f64,
    #[serde(default)]
    trim: f64,
    #[serde(default)]
    strategy: ScoreStrategy,
}

#[derive(Deserialize, Serialize)]
struct BinRequest {
    length: f64,
    #[serde(default)]
    origin: f64,
}

#[derive(Deserialize, Serialize)]
struct CutRequest {
    length: f64,
    qty: u32,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Serialize)]
struct PackResponse {
    bins: Vec<Bin>,
    unplaced: Vec<Piece>,
    used_bin_count: usize,
    waste_percent: f64,
}

impl From<PackReport> for PackResponse {
    fn from(report: PackReport) -> Self {
        Self {
            used_bin_count: report.used_bin_count(),
            waste_percent: report.total_waste_percent(),
            bins: report.bins,
            unplaced: report.unplaced,
        }
    }
}

async fn pack(Json(req): Json<PackRequest>) -> Result<Json<PackResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /pack"
    );

    let mut demands = Vec::with_capacity(req.cuts.len());
    for c in &req.cuts {
        if c.qty == 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "cut quantity must be non-zero".to_string(),
            ));
        }
        demands.push(Demand {
            length: c.length,
            qty: c.qty,
            label: c.label.clone().unwrap_or_else(|| c.length.to_string()),
        });
    }
    let boxes = expand_demands(&demands).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let bins: Vec<BinSpec> = req
        .bins
        .iter()
        .enumerate()
        .map(|(i, b)| BinSpec::new(b.length, b.origin, i))
        .collect();

    let engine = PackEngine::new(PackConfig {
        base_stock_length: req.stock,
        saw_kerf: req.kerf,
        trim: req.trim,
        strategy: req.strategy,
    });
    let report = engine
        .run(bins, boxes)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(report.into()))
}

#[tokio::main]
async fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/pack", post(pack))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
