mod config;
mod contract;
mod docx;
mod pipeline;
mod services;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err));
        }
    };

    let state = AppState::new(&config);
    let json_limit = config.json_limit;
    info!(
        "Server running at http://{}:{} (template: {})",
        config.host, config.port, config.template
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(json_limit))
            .app_data(web::Data::new(state.clone()))
            .service(services::contracts::configure_routes())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
