use std::{path::PathBuf, sync::Arc};

use ai_course::{
    api::{AppState, router},
    config::Config,
    db,
    utils::init_log,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to database file
    #[arg(short, long, default_value = "database/course.db")]
    database: PathBuf,
    /// Optional toml config, secrets may also come from the environment
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    #[arg(short, long, default_value = "8080")]
    port: u16,
    /// Log directory, stdout when absent
    #[arg(short, long)]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_log(args.log.clone())?;
    let config = Config::load(args.config.as_deref())?;
    info!("model {} at {}", config.ai.model, config.ai.base_url);

    let database = db::connect(&args.database).await?;
    let sessions = SqliteStore::new(database.clone());
    sessions.migrate().await?;

    let state = Arc::new(AppState::new(&config, database)?);
    let app = router(state, sessions);

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!("Starting server at http://{}:{}", args.host, args.port);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        args.host, args.port
    );
    axum::serve(listener, app).await?;
    Ok(())
}
