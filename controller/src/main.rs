//! Main entry point for the controller binary
//!
//! Opens a control channel per child, keeps both children alive and serves
//! the control surface until Ctrl+C.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

use controller::{
    core::relay_speaking,
    pipe::PipeEndpoint,
    services::RealProcessLauncher,
    web, ChildSpec, ControlChannel, ControllerContext, ControllerError, ControllerResult,
    ProcessSupervisor, SupervisorConfig,
};
use shared::{logging, process_debug, process_info, ChannelIdentity, ProcessId};

/// Keeps a bot and a relay process alive and joined to the same channel
#[derive(Parser)]
#[command(name = "controller")]
#[command(about = "Supervises the voice bot and relay of one instance")]
pub struct Args {
    /// HTTP port of the control surface
    #[arg(long, env = "PORT_CONTROLLER", default_value = "8000")]
    pub port: u16,

    /// Bot executable
    #[arg(long, env = "DBOT_PATH", default_value = "dbot")]
    pub dbot_path: String,

    /// Relay executable
    #[arg(long, env = "VRELAY_PATH", default_value = "vrelay")]
    pub vrelay_path: String,

    /// Pipe prefix shared with the bot, relative to --pipe-dir
    #[arg(long, env = "DBOT_PIPE_PREFIX", default_value = "dbot")]
    pub dbot_pipe_prefix: String,

    /// Pipe prefix shared with the relay, relative to --pipe-dir
    #[arg(long, env = "VRELAY_PIPE_PREFIX", default_value = "vrelay")]
    pub vrelay_pipe_prefix: String,

    /// Directory holding the pipe sockets
    #[arg(long, env = "PIPE_DIR", default_value = "/tmp")]
    pub pipe_dir: PathBuf,

    /// Login token passed to the bot
    #[arg(long, env = "DISCORD_LOGIN_TOKEN", default_value = "")]
    pub discord_login_token: String,

    /// Do not spawn children; expect them to be started separately
    #[arg(long, env = "DONT_SPAWN")]
    pub dont_spawn: bool,

    /// Guild to join on first spawn
    #[arg(long, requires = "channel")]
    pub guild: Option<String>,

    /// Channel to join on first spawn
    #[arg(long, requires = "guild")]
    pub channel: Option<String>,

    /// Seconds between health checks
    #[arg(long, default_value = "8")]
    pub check_period: u64,

    /// Failed checks before a child is restarted
    #[arg(long, default_value = "1")]
    pub failure_threshold: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

async fn open_channel(
    name: &str,
    dir: &Path,
    prefix: &str,
    initial: Option<&ChannelIdentity>,
) -> ControllerResult<Arc<ControlChannel>> {
    let channel = ControlChannel::open(name, PipeEndpoint::in_dir(dir, prefix)).await?;
    let channel = match initial {
        Some(identity) => channel.with_identity(identity.clone()),
        None => channel,
    };
    process_debug!(ProcessId::current(), "{} pipes at {}", name, channel.endpoint().prefix());
    Ok(Arc::new(channel))
}

#[tokio::main]
async fn main() -> ControllerResult<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    ProcessId::init_controller();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), "bot controller");

    let initial = match (&args.guild, &args.channel) {
        (Some(guild), Some(channel)) => Some(ChannelIdentity::new(guild.clone(), channel.clone())),
        _ => None,
    };

    let dbot = open_channel("dbot", &args.pipe_dir, &args.dbot_pipe_prefix, initial.as_ref()).await?;
    let vrelay = open_channel("vrelay", &args.pipe_dir, &args.vrelay_pipe_prefix, initial.as_ref()).await?;
    let _relay = relay_speaking(&[dbot.clone(), vrelay.clone()]);

    let mut dbot_args = Vec::new();
    if !args.discord_login_token.is_empty() {
        dbot_args.push(args.discord_login_token.clone());
    }

    let config = SupervisorConfig::default()
        .with_period(Duration::from_secs(args.check_period))
        .with_failure_threshold(args.failure_threshold)
        .with_spawn_enabled(!args.dont_spawn);
    let supervisor = Arc::new(
        ProcessSupervisor::new(Arc::new(RealProcessLauncher::new()), config)
            .with_child(ChildSpec::new("dbot", &args.dbot_path).with_extra_args(dbot_args), dbot.clone())
            .with_child(ChildSpec::new("vrelay", &args.vrelay_path), vrelay.clone()),
    );
    supervisor.start();

    let context = Arc::new(ControllerContext::new(supervisor.clone()));
    let app = web::router(context);

    let listener = TcpListener::bind(("0.0.0.0", args.port))
        .await
        .map_err(|e| ControllerError::config(format!("Cannot bind port {}: {}", args.port, e)))?;
    process_info!(ProcessId::current(), "Controller listening on {}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match signal::ctrl_c().await {
                Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
                Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
            }
        })
        .await?;

    supervisor.kill_all().await;
    dbot.shutdown();
    vrelay.shutdown();

    logging::log_success(ProcessId::current(), "Controller stopped gracefully");
    Ok(())
}
