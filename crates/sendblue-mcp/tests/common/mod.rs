use anyhow::Context as _;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

pub use sendblue_test_support::{KillOnDrop, StubSendblue};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    sendblue_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    sendblue_test_support::wait_http_ok(url, timeout_dur).await
}

/// Base command for the server binary, isolated from the caller's Sendblue env and `.env`.
pub fn server_command() -> Command {
    let bin = env!("CARGO_BIN_EXE_sendblue-mcp");
    let mut cmd = Command::new(bin);
    cmd.current_dir(std::env::temp_dir())
        .env_remove("SENDBLUE_API_KEY_ID")
        .env_remove("SENDBLUE_API_SECRET_KEY")
        .env_remove("SENDBLUE_API_BASE_URL")
        .env_remove("SENDBLUE_ACCOUNTS_BASE_URL")
        .env_remove("MCP_TRANSPORT")
        .env_remove("MCP_HTTP_PORT")
        .env_remove("MCP_HTTP_HOST")
        .env("RUST_LOG", "info");
    cmd
}

/// Spawn the server in HTTP mode against `stub_base`.
pub fn spawn_http_server(stub_base: &str, port: u16) -> anyhow::Result<Child> {
    server_command()
        .env("SENDBLUE_API_KEY_ID", "test_api_key_id")
        .env("SENDBLUE_API_SECRET_KEY", "test_api_secret_key")
        .env("SENDBLUE_API_BASE_URL", format!("{stub_base}/api"))
        .env("SENDBLUE_ACCOUNTS_BASE_URL", format!("{stub_base}/accounts"))
        .env("MCP_TRANSPORT", "http")
        .env("MCP_HTTP_HOST", "127.0.0.1")
        .env("MCP_HTTP_PORT", port.to_string())
        .stdin(Stdio::null())
        .spawn()
        .context("spawn sendblue-mcp")
}
