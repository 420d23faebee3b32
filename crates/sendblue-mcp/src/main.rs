use anyhow::Context as _;
use axum::{Router, routing::get};
use clap::Parser;
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use sendblue_mcp::{Cli, Config, LogFormat, SendblueServer, Transport};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout carries the stdio MCP channel.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(cli).context("invalid configuration")?;
    let server = SendblueServer::from_config(&config).context("cannot start without credentials")?;

    info!(
        transport = %config.transport,
        api_base_url = %config.api_base_url,
        "starting sendblue MCP server"
    );

    match config.transport {
        Transport::Stdio => serve_stdio(server).await,
        Transport::Http => serve_http(server, &config).await,
    }
}

async fn serve_stdio(server: SendblueServer) -> anyhow::Result<()> {
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start stdio transport")?;
    running.waiting().await?;
    Ok(())
}

async fn serve_http(server: SendblueServer, config: &Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let mut mcp_config = StreamableHttpServerConfig::default();
    mcp_config.cancellation_token = shutdown.child_token();
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        mcp_config,
    );

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", mcp);

    let addr = format!("{}:{}", config.http_host, config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening (streamable HTTP at /mcp)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
