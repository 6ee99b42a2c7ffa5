//! Helper to handle child process stdout/stderr output
//!
//! Every line a child prints becomes one log event carrying the child's name.
//! Lines tagged `[Trace]`, `[Debug]`, `[Info]`, `[Warn]`, `[Error]` or
//! `[Fatal]` are re-emitted at that level with the tag stripped.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use shared::{process_debug, process_error, process_info, process_warn, ProcessId};

/// Lines that carry no information
const NOISE: &[&str] = &["rtp_parse: timestamp jump from"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// No recognised tag
    Plain,
}

/// Pipe both output streams so they can be forwarded
pub fn configure_child_stdio(cmd: &mut Command) {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());
}

/// Spawn one forwarding task per piped stream
///
/// Consuming the pipes also keeps the child from blocking on a full buffer.
pub fn spawn_output_forwarders(child: &mut Child, child_name: &str) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, child_name.to_string()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, child_name.to_string()));
    }
}

async fn forward_lines<R>(stream: R, child_name: String)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            // Undecodable bytes are replaced; the pipe must keep draining
            Ok(_) => forward_line(&child_name, &String::from_utf8_lossy(&line)),
            Err(e) => {
                process_debug!(ProcessId::current(), "Output of {} unreadable: {}", child_name, e);
                break;
            }
        }
    }
}

/// Emit one output line of `child_name` at its tagged level
pub fn forward_line(child_name: &str, line: &str) {
    let Some((level, text)) = classify(line) else {
        return;
    };

    match level {
        LineLevel::Trace => {
            tracing::trace!(process = %ProcessId::current(), child = child_name, "{}", text);
        }
        LineLevel::Debug => {
            process_debug!(ProcessId::current(), child = child_name, "{}", text);
        }
        LineLevel::Info | LineLevel::Plain => {
            process_info!(ProcessId::current(), child = child_name, "{}", text);
        }
        LineLevel::Warn => {
            process_warn!(ProcessId::current(), child = child_name, "{}", text);
        }
        LineLevel::Error => {
            process_error!(ProcessId::current(), child = child_name, "{}", text);
        }
    }
}

/// Level and message of a line, `None` for blank or noise lines
pub fn classify(line: &str) -> Option<(LineLevel, &str)> {
    let line = line.trim();
    if line.is_empty() || NOISE.iter().any(|noise| line.contains(noise)) {
        return None;
    }

    for (tag, level) in [
        ("[Trace] ", LineLevel::Trace),
        ("[Debug] ", LineLevel::Debug),
        ("[Info] ", LineLevel::Info),
        ("[Warn] ", LineLevel::Warn),
        ("[Error] ", LineLevel::Error),
        ("[Fatal] ", LineLevel::Error),
    ] {
        if let Some(index) = line.find(tag) {
            return Some((level, line[index + tag.len()..].trim()));
        }
    }

    Some((LineLevel::Plain, line))
}
