use crate::cache::PriceTable;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bazaar_common::Side;
use std::sync::Arc;

const INVALID_PRODUCT_ID: &str = "invalid product ID";
const PRODUCT_NOT_CACHED: &str = "invalid product ID or price not in cache";

/// `/buy/{id}`, `/sell/{id}` and `/csv` over a shared price table
pub fn router(table: Arc<PriceTable>) -> Router {
    Router::new()
        .route("/csv", get(csv_dump))
        .route("/buy/*product", get(buy_price))
        .route("/sell/*product", get(sell_price))
        .fallback(fallback)
        .with_state(table)
}

fn prefix(side: Side) -> &'static str {
    match side {
        Side::Buy => "/buy",
        Side::Sell => "/sell",
    }
}

/// Remainder of `path` below the side's prefix, if it is under it at all
fn strip_side_prefix(path: &str, side: Side) -> Option<&str> {
    path.strip_prefix(prefix(side))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Side addressed by a request path, if it lives under `/buy` or `/sell`
fn side_of(path: &str) -> Option<(Side, &str)> {
    [Side::Buy, Side::Sell]
        .into_iter()
        .find_map(|side| strip_side_prefix(path, side).map(|rest| (side, rest)))
}

/// Product identifier in the last non-empty segment. Trailing slashes are ignored.
pub fn product_id(segments: &str) -> Option<&str> {
    segments
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
}

fn price_response(table: &PriceTable, side: Side, segments: &str) -> Response {
    let Some(product_id) = product_id(segments) else {
        return (StatusCode::BAD_REQUEST, INVALID_PRODUCT_ID).into_response();
    };

    match table.format_side(product_id, side) {
        Some(price) => (StatusCode::OK, price).into_response(),
        None => (StatusCode::NOT_FOUND, PRODUCT_NOT_CACHED).into_response(),
    }
}

async fn buy_price(State(table): State<Arc<PriceTable>>, Path(product): Path<String>) -> Response {
    price_response(&table, Side::Buy, &product)
}

async fn sell_price(State(table): State<Arc<PriceTable>>, Path(product): Path<String>) -> Response {
    price_response(&table, Side::Sell, &product)
}

async fn csv_dump(State(table): State<Arc<PriceTable>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        table.render_csv(),
    )
        .into_response()
}

// `/buy`, `/buy/` and friends never reach the wildcard routes
async fn fallback(State(table): State<Arc<PriceTable>>, method: Method, uri: Uri) -> Response {
    match side_of(uri.path()) {
        Some(_) if method != Method::GET => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Some((side, rest)) => price_response(&table, side, rest),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
