//! Startup tests that spawn the real binary.

use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config
fn minimal_config(port: u16, db_dir: &TempDir) -> String {
    format!(
        r#"
[ops]
method = "none"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"

[stripe]
secret_key = "sk_test_startup"
webhook_secret = "whsec_startup"
"#,
        port,
        db_dir.path().join("valet.db").display()
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_valet"))
        .env("VALET_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn run_to_exit(config_path: &std::path::Path) -> std::process::Output {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_valet"))
            .env("VALET_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

#[tokio::test]
async fn test_health_and_sanitized_config() {
    let port = get_available_port();
    let db_dir = TempDir::new().unwrap();
    let config_file = write_config(&minimal_config(port, &db_dir));

    let mut server = spawn_server(config_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(health["status"], "ok");

    let config: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(config["server"]["port"], port);
    assert_eq!(config["stripe"]["webhook_secret_configured"], true);
    assert!(!config.to_string().contains("sk_test_startup"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_to_exit(std::path::Path::new("/nonexistent/config.toml")).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_ops_section_exits_with_error() {
    let config_file = write_config(
        r#"
[stripe]
secret_key = "sk_test_startup"
webhook_secret = "whsec_startup"
"#,
    );

    let result = run_to_exit(config_file.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_unsigned_webhooks_must_be_explicit() {
    let config_file = write_config(
        r#"
[ops]
method = "none"

[stripe]
secret_key = "sk_test_startup"
"#,
    );

    let result = run_to_exit(config_file.path()).await;
    assert!(!result.status.success());
}
