use clap::Parser;
use mimalloc::MiMalloc;
use mssql_connect::config::Config;
use mssql_connect::types::CliArgs;
use mssql_connect::{ConnectionStringBuilder, connect};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let cfg = Config::load(&args)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let host = cfg.host_spec();
    info!(
        host = %host,
        dbname = %cfg.dbname,
        username = %cfg.username,
        loglevel = %cfg.loglevel
    );

    let conn_str = ConnectionStringBuilder::new().build(&host, &cfg.credentials())?;
    if args.dry_run {
        println!("{}", conn_str.redacted());
        return Ok(());
    }

    let db = match connect(&conn_str).await {
        Ok(db) => db,
        Err(failure) => {
            let (handle, e) = failure.into_parts();
            error!(
                connection = %conn_str.redacted(),
                handle_opened = handle.is_some(),
                error = %e,
                "unable to connect"
            );
            return Err(e.into());
        }
    };

    db.close().await?;
    Ok(())
}
