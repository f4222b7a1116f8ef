use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use emr_clinic::config::AppConfig;
use emr_clinic::db;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    // create db connection pool
    let pool = db::build_pool(&config.database_url, config.pool_size)?;
    {
        let mut conn = pool.get().context("Failed to get a connection for migrations")?;
        db::run_migrations(&mut conn)?;
    }

    let bind = (config.host.clone(), config.port);
    tracing::info!(host = %bind.0, port = bind.1, pool_size = config.pool_size, "starting emr-clinic");

    let pool = web::Data::new(pool);
    let config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(config.clone())
            .wrap(middleware::Logger::default())
            .configure(emr_clinic::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
