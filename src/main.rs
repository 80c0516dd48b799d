/// Haven accounts server
use haven_accounts::{
    config::{LoggingConfig, ServerConfig},
    context::AppContext,
    error::AccountResult,
    jobs, server,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AccountResult<()> {
    let config = ServerConfig::from_env()?;

    init_tracing(&config.logging);

    print_banner(&config.service.version);

    let ctx = AppContext::new(config).await?;

    if let Some(bootstrap) = &ctx.config.bootstrap {
        if ctx.account_service.ensure_superuser(bootstrap).await? {
            tracing::info!("Bootstrap superuser {} created", bootstrap.email);
        }
    }

    let ctx = Arc::new(ctx);

    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| "haven_accounts=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner(version: &str) {
    println!(
        r#"
    __  __
   / / / /___ __   _____  ____
  / /_/ / __ `/ | / / _ \/ __ \
 / __  / /_/ /| |/ /  __/ / / /
/_/ /_/\__,_/ |___/\___/_/ /_/

        Haven accounts v{}
        "#,
        version
    );
}
