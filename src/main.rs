use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_api::{config::AppConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let idle = config.cart_session_idle;
    tracing::info!(
        sign_in_policy = %config.sign_in_policy,
        cart_storage_dir = %config.cart_storage_dir.display(),
        "configuration loaded"
    );

    let state = AppState::new(config)?;

    let carts = state.carts.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(idle.max(std::time::Duration::from_secs(60)) / 2);
        loop {
            ticker.tick().await;
            let pruned = carts.prune_idle(idle).await;
            if pruned > 0 {
                tracing::debug!(pruned, "idle cart sessions dropped");
            }
        }
    });

    let app = routes::app(state);

    tracing::info!("listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
