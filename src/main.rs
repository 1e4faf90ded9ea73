use actix_web::{App, HttpServer};
use anyhow::Context;
use payrecon::config::Config;
use payrecon::middleware::{JwtAuth, RequestId};
use payrecon::{build_gateway, AppServices, Storage};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app.log_format);
    config.validate().context("Configuration validation failed")?;

    tracing::info!("Starting payrecon");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    let storage = Storage::from_config(&config)
        .await
        .context("Failed to initialise storage")?;
    let gateway = build_gateway(&config).context("Failed to build payment gateway")?;
    let services = AppServices::new(&config, storage, gateway);
    let jwt_secret = config.auth.jwt_secret.clone();

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(JwtAuth::new(jwt_secret.clone()))
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .configure(move |cfg| services.configure(cfg))
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await?;
    Ok(())
}

fn init_tracing(format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "payrecon=debug,actix_web=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
