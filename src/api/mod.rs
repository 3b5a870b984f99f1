mod balance;
mod chain;
mod health;
pub mod models;
mod peer;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blocks)
            .service(chain::get_length)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::mine_transactions)
            .service(tx::post_transact)
            .service(tx::get_pool_map)
            .service(wallet::get_wallet_info)
            .service(balance::get_balance)
            .service(stats::get_stats)
            .service(peer::post_chain)
            .service(peer::post_transaction),
    );
}
