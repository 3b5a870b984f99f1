use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

/// How many recent block intervals the average covers.
const STATS_WINDOW: usize = 10;

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let node_state = state.node.state();
    let chain = node_state.blockchain.chain();
    let height = chain.len();

    // genesis has a fixed timestamp, so intervals only count mined blocks
    let intervals: Vec<i64> = chain
        .windows(2)
        .skip(1)
        .map(|pair| (pair[1].timestamp - pair[0].timestamp).max(0))
        .collect();
    let last_interval_ms = intervals.last().copied();
    let window = &intervals[intervals.len().saturating_sub(STATS_WINDOW)..];
    let avg_interval_ms = if window.is_empty() {
        None
    } else {
        Some(window.iter().sum::<i64>() as f64 / window.len() as f64)
    };

    HttpResponse::Ok().json(StatsResponse {
        name: state.node.name().to_string(),
        height,
        difficulty: node_state.blockchain.last_block().difficulty,
        mine_rate_ms: node_state.blockchain.mine_rate(),
        stats_window: STATS_WINDOW,
        last_interval_ms,
        avg_interval_ms,
        pool_size: node_state.pool.len(),
    })
}
