use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, HealthResponse};

/// Liveness plus enough context to tell nodes apart.
#[get("/health/")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "up",
        node: state.node.name().to_string(),
        height: state.node.state().blockchain.len(),
    })
}
