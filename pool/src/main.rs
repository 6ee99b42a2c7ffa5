//! Main entry point for the pool binary
//!
//! Picks up the containers already running, then routes voice channels to
//! them over HTTP until Ctrl+C.

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use pool::{
    services::{DockerRuntime, HttpInstanceClient, InMemoryChannelStore},
    web, ContainerPool, PoolConfig, PoolContext, PoolError, PoolResult,
};
use shared::{logging, process_info, ProcessId};

/// Routes voice channels to bot containers
#[derive(Parser)]
#[command(name = "pool")]
#[command(about = "Manages the pool of voice relay containers")]
pub struct Args {
    /// HTTP port of the pool
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Image every instance container runs
    #[arg(long, env = "BOT_CONTAINER_NAME", default_value = "bot-container")]
    pub image: String,

    /// First host port handed to a new container
    #[arg(long, env = "FIRST_BOT_PORT", default_value = "5500")]
    pub first_port: u16,

    /// Controller port inside each container
    #[arg(long, env = "PORT_CONTROLLER", default_value = "8000")]
    pub internal_port: u16,

    /// Host address new containers are reached on
    #[arg(long, env = "SPAWN_ADDRESS", default_value = "127.0.0.1")]
    pub spawn_address: String,

    /// Docker-compatible CLI
    #[arg(long, env = "DOCKER_BIN", default_value = "docker")]
    pub docker: String,

    /// Seed unknown channels and fake users on /channel_joined
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Kill every tracked container on shutdown
    #[arg(long)]
    pub kill_on_exit: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> PoolResult<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    ProcessId::init_pool();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), "container pool");

    let config = PoolConfig::default()
        .with_image(&args.image)
        .with_first_port(args.first_port)
        .with_internal_port(args.internal_port)
        .with_spawn_address(&args.spawn_address);
    let container_pool = Arc::new(ContainerPool::new(
        Arc::new(DockerRuntime::with_binary(&args.docker)),
        Arc::new(HttpInstanceClient::new()),
        config,
    ));

    match container_pool.bootstrap().await {
        Ok(found) => {
            process_info!(ProcessId::current(), "Tracking {} running containers", found);
        }
        Err(e) => logging::log_error(ProcessId::current(), "Container discovery", &e),
    }

    let context = Arc::new(
        PoolContext::new(container_pool.clone(), Arc::new(InMemoryChannelStore::new())).with_debug(args.debug),
    );
    let app = web::router(context);

    let listener = TcpListener::bind(("0.0.0.0", args.port))
        .await
        .map_err(|e| PoolError::config(format!("Cannot bind port {}: {}", args.port, e)))?;
    process_info!(ProcessId::current(), "Pool listening on {}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match signal::ctrl_c().await {
                Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
                Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
            }
        })
        .await?;

    if args.kill_on_exit {
        container_pool.kill_all().await?;
    }

    logging::log_success(ProcessId::current(), "Pool stopped gracefully");
    Ok(())
}
