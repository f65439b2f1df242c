use std::io;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use log::{error, info, warn};
use runbot::api::{configure_routes, AppState};
use runbot::{banner, config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Print the startup banner
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  Warning: Could not load .env file: {}", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Panics inside handler tasks are caught by the router; this only makes
    // sure they reach the log instead of stderr.
    std::panic::set_hook(Box::new(|info| error!("panic: {}", info)));

    let app_config = config::AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let state = AppState::new(&app_config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    if state.verifier.is_none() {
        warn!("DISCORD_PUBLIC_KEY not set; inbound requests are not signature-checked");
    }

    let router = state.router.clone();
    actix_rt::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(30));
        loop {
            tick.tick().await;
            router.evict_stale();
        }
    });

    info!(
        "Judge at {} (poll every {}ms, up to {} tries)",
        app_config.judge.api_base,
        app_config.judge.poll_interval.as_millis(),
        app_config.judge.poll_max_tries
    );
    info!("🚀 Listening on 0.0.0.0:{}", app_config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", app_config.port))?
    .run()
    .await
}
