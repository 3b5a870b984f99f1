use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use cryptochain::api::{self, AppState};
use cryptochain::config::Config;
use cryptochain::wallet::generate_keypair_hex;
use cryptochain::{Blockchain, Node, NullTransport};

#[actix_web::main]
async fn main() -> io::Result<()> {
    if std::env::args().nth(1).as_deref() == Some("keygen") {
        let (secret, address) = generate_keypair_hex();
        println!("WALLET_PRIVATE_KEY={secret}");
        println!("# address {address}");
        return Ok(());
    }

    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env().map_err(io::Error::other)?;
    let wallet = config.wallet().map_err(io::Error::other)?;

    let node = Arc::new(Node::new(
        config.node_name.clone(),
        wallet,
        Blockchain::with_mine_rate(config.mine_rate_ms),
        Arc::new(NullTransport),
    ));
    info!(
        "⛓️ {} listening at http://{}:{} (wallet {})",
        node.name(),
        config.host,
        config.port,
        node.address()
    );

    let state = web::Data::new(AppState { node });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
