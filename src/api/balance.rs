use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse};
use crate::wallet::Wallet;

#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    let balance = Wallet::calculate_balance(state.node.state().blockchain.chain(), &address);
    HttpResponse::Ok().json(BalanceResponse { address, balance })
}
