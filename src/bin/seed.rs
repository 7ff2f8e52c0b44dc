use storefront_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    services::setup_service::seed_catalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(
        &config.database_url,
        config.db_max_connections,
        config.db_acquire_timeout,
    )?;
    // Ensure the tables exist before inserting.
    run_migrations(&orm_from_pool(&pool)).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed");
    Ok(())
}
