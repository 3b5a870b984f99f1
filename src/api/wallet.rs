use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, WalletInfoResponse};

#[get("/wallet-info/")]
pub async fn get_wallet_info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(WalletInfoResponse {
        address: state.node.address().to_string(),
        balance: state.node.balance(),
    })
}
