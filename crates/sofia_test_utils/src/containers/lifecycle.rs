//! Container lifecycle management: start and health checks.

use crate::config::{PgVersion, TestDbConfig};
use anyhow::{bail, Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

const CONTAINER_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Path to the compose file shipped with this crate.
pub fn docker_compose_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("docker")
        .join("docker-compose.yml")
}

/// Check if Docker is available on the system.
pub fn is_docker_available() -> bool {
    Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run `docker compose` (v2), falling back to `docker-compose` (v1).
fn docker_compose_cmd(args: &[&str]) -> Result<Output> {
    let compose_file = docker_compose_path();

    let v2 = Command::new("docker")
        .args(["compose", "-f"])
        .arg(&compose_file)
        .args(args)
        .output();
    if let Ok(out) = v2 {
        if out.status.success() {
            return Ok(out);
        }
    }

    Command::new("docker-compose")
        .arg("-f")
        .arg(&compose_file)
        .args(args)
        .output()
        .context("Failed to run docker-compose")
}

/// Check if the service for `version` is up.
pub fn is_container_running(version: PgVersion) -> bool {
    docker_compose_cmd(&["ps", "-q", version.service_name()])
        .map(|out| !out.stdout.is_empty())
        .unwrap_or(false)
}

/// Start the service for `version`.
pub fn start_container(version: PgVersion) -> Result<()> {
    let service = version.service_name();
    info!("Starting container: {}", service);

    let output = docker_compose_cmd(&["up", "-d", service])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Failed to start container {}: {}", service, stderr);
    }
    Ok(())
}

async fn accepts_queries(version: PgVersion) -> bool {
    if TcpStream::connect(("localhost", version.port())).await.is_err() {
        return false;
    }

    let conn_str = TestDbConfig::new(version).connection_string();
    let connect = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(1))
        .connect(&conn_str);

    match timeout(Duration::from_secs(2), connect).await {
        Ok(Ok(pool)) => sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok(),
        _ => false,
    }
}

/// Wait until the server answers `SELECT 1`.
pub async fn wait_for_healthy(version: PgVersion) -> Result<()> {
    info!("Waiting for {} on port {}", version, version.port());
    let start = std::time::Instant::now();

    loop {
        if accepts_queries(version).await {
            debug!("{} is healthy after {:?}", version, start.elapsed());
            return Ok(());
        }
        if start.elapsed() > CONTAINER_STARTUP_TIMEOUT {
            bail!(
                "Timeout waiting for {} after {:?}",
                version,
                CONTAINER_STARTUP_TIMEOUT
            );
        }
        sleep(HEALTH_CHECK_INTERVAL).await;
    }
}

/// Start the container if needed and wait for it to accept queries.
pub async fn ensure_container_running(version: PgVersion) -> Result<()> {
    if !is_docker_available() {
        bail!("Docker is not available. Please install Docker to run these tests.");
    }

    if !is_container_running(version) {
        start_container(version)?;
    }

    wait_for_healthy(version).await
}
