//! Stand-in for the bot and relay children
//!
//! Speaks the pipe protocol like a real child: joins and leaves on request,
//! reports its channel on `info` and logs who is speaking.
//!
//! Usage: `stub_child <prefix> [extra..] [guild channel]`. When at least two
//! arguments follow the prefix, the last two are the channel to start in.

use clap::Parser;
use std::time::Duration;

use controller::pipe::{PipeEndpoint, PipePeer};
use shared::{logging, process_info, process_warn, ChannelIdentity, Command, Message, ProcessId};

#[derive(Parser)]
#[command(name = "stub_child")]
#[command(about = "Pipe protocol stand-in for a supervised child")]
struct Args {
    /// Pipe prefix handed over by the controller
    prefix: String,

    /// Extra arguments, optionally ending with `<guild> <channel>`
    rest: Vec<String>,

    /// Milliseconds between connection attempts
    #[arg(long, default_value = "200")]
    retry_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn initial_channel(rest: &[String]) -> Option<ChannelIdentity> {
    match rest {
        [.., guild, channel] => Some(ChannelIdentity::new(guild.clone(), channel.clone())),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    ProcessId::init_stub_child();
    logging::init_tracing_with_level(Some(&args.log_level));

    let endpoint = PipeEndpoint::new(&args.prefix);
    let mut peer =
        PipePeer::connect_with_retry(&endpoint, Duration::from_millis(args.retry_interval), 50).await?;
    logging::log_startup(ProcessId::current(), &format!("stub child on {}", endpoint.prefix()));

    let mut identity = ChannelIdentity::sentinel();
    if let Some(target) = initial_channel(&args.rest) {
        identity = target;
        peer.send(&Command::Joined(identity.clone()).into()).await;
    }

    while let Some(message) = peer.recv().await {
        match message.parse() {
            Command::Join(target) => {
                process_info!(ProcessId::current(), "Joining {}", target);
                identity = target;
                peer.send(&Command::Joined(identity.clone()).into()).await;
            }
            Command::Leave => {
                process_info!(ProcessId::current(), "Leaving {}", identity);
                identity = ChannelIdentity::sentinel();
                peer.send(&Message::left()).await;
            }
            Command::InfoRequest => {
                peer.send(&Command::Info(identity.clone()).into()).await;
            }
            Command::Speaking(names) if names.is_empty() => {
                process_info!(ProcessId::current(), "Nobody is speaking");
            }
            Command::Speaking(names) => {
                process_info!(ProcessId::current(), "Speaking: {}", names.join(", "));
            }
            Command::Unknown(unknown) => {
                process_warn!(ProcessId::current(), "Unknown message {}", unknown);
                let error = Command::Error(format!("unknown command {}", unknown.command()));
                peer.send(&error.into()).await;
            }
            _ => {}
        }
    }

    logging::log_shutdown(ProcessId::current(), "controller went away");
    Ok(())
}
