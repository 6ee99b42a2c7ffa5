//! Container runtime backed by the `docker` CLI

use async_trait::async_trait;
use tokio::process::Command;

use shared::{process_debug, ProcessId};

use crate::error::{PoolError, PoolResult};
use crate::traits::ContainerRuntime;
use crate::types::RunningContainer;

const PS_FORMAT: &str = "{{.ID}}\t{{.Image}}\t{{.Ports}}";

/// Drives containers through a docker-compatible CLI
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    binary: String,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use another docker-compatible binary
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    /// Run the CLI and return its trimmed stdout
    async fn exec(&self, args: &[String]) -> PoolResult<String> {
        let command = format!("{} {}", self.binary, args.join(" "));
        process_debug!(ProcessId::current(), "Running `{}`", command);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| PoolError::runtime(&command, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PoolError::runtime(command, stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running(&self, image: &str) -> PoolResult<Vec<RunningContainer>> {
        let args = [
            "ps".to_string(),
            "--filter".to_string(),
            format!("ancestor={image}"),
            "--format".to_string(),
            PS_FORMAT.to_string(),
        ];
        let stdout = self.exec(&args).await?;

        Ok(stdout
            .lines()
            .filter_map(parse_ps_line)
            .filter(|container| container.image == image)
            .collect())
    }

    async fn run(&self, image: &str, host_port: u16, internal_port: u16) -> PoolResult<String> {
        let args = [
            "run".to_string(),
            "--rm".to_string(),
            "-d".to_string(),
            "-p".to_string(),
            format!("{host_port}:{internal_port}"),
            image.to_string(),
        ];

        let stdout = self.exec(&args).await.map_err(|e| PoolError::SpawnFailed {
            host_port,
            message: e.to_string(),
        })?;

        // The id is the last line; pull progress may precede it
        match stdout.lines().last().map(str::trim) {
            Some(id) if !id.is_empty() && !id.contains("Error ") => Ok(id.to_string()),
            _ => Err(PoolError::SpawnFailed {
                host_port,
                message: format!("no container id in output: {stdout}"),
            }),
        }
    }

    async fn kill(&self, ids: Vec<String>) -> PoolResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut args = vec!["kill".to_string()];
        args.extend(ids);
        self.exec(&args).await.map(|_| ())
    }
}

/// Parse one `ID<TAB>IMAGE<TAB>PORTS` line of `docker ps`
///
/// Containers without a published TCP port are skipped. Wildcard bind
/// addresses are reached over loopback.
pub fn parse_ps_line(line: &str) -> Option<RunningContainer> {
    let mut fields = line.split('\t');
    let id = fields.next()?.trim();
    let image = fields.next()?.trim();
    let ports = fields.next()?.trim();
    if id.is_empty() {
        return None;
    }

    // e.g. "0.0.0.0:5501->8000/tcp, :::5501->8000/tcp"
    let (address, host_port) = ports.split(", ").find_map(|mapping| {
        let (published, _) = mapping.split_once("->")?;
        let (address, port) = published.rsplit_once(':')?;
        Some((address, port.parse::<u16>().ok()?))
    })?;

    let address = match address {
        "" | "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };

    Some(RunningContainer {
        id: id.to_string(),
        image: image.to_string(),
        address: address.to_string(),
        host_port,
    })
}
