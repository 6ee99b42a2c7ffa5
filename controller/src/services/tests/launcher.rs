use std::time::Duration;
use tokio::time::timeout;

use crate::error::ControllerError;
use crate::services::RealProcessLauncher;
use crate::traits::{LaunchRequest, ProcessLauncher};

fn shell(script: &str) -> LaunchRequest {
    LaunchRequest {
        child: "dbot".to_string(),
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

#[tokio::test]
async fn test_exit_code_is_reported() {
    let launcher = RealProcessLauncher::new();
    let mut process = launcher.launch(shell("echo '[Info] hello'; exit 3")).await.unwrap();

    assert!(process.pid.is_some());
    let exit = process.take_exit().expect("exit receiver");
    let code = timeout(Duration::from_secs(5), exit).await.expect("process exited").unwrap();
    assert_eq!(code, Some(3));
    assert!(process.take_exit().is_none(), "exit receiver is handed out once");
}

#[tokio::test]
async fn test_kill_ends_the_process() {
    let launcher = RealProcessLauncher::new();
    let mut process = launcher.launch(shell("sleep 30")).await.unwrap();
    let exit = process.take_exit().unwrap();

    assert!(process.kill());
    assert!(!process.kill(), "second kill is a no-op");

    let code = timeout(Duration::from_secs(5), exit).await.expect("killed in time").unwrap();
    assert_eq!(code, None, "a killed process has no exit code");
}

#[tokio::test]
async fn test_missing_program_is_a_spawn_error() {
    let launcher = RealProcessLauncher::new();
    let request = LaunchRequest {
        child: "vrelay".to_string(),
        program: "/nonexistent/vrelay".to_string(),
        args: Vec::new(),
    };

    match launcher.launch(request).await {
        Err(ControllerError::SpawnFailed { child, .. }) => assert_eq!(child, "vrelay"),
        other => panic!("expected a spawn failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_utf8_output_keeps_the_child_alive() {
    let launcher = RealProcessLauncher::new();
    let script = "printf '\\377\\n'; head -c 300000 /dev/zero | tr '\\0' a; echo; exit 3";
    let mut process = launcher.launch(shell(script)).await.unwrap();
    let exit = process.take_exit().unwrap();

    let code = timeout(Duration::from_secs(10), exit).await.expect("process exited").unwrap();
    assert_eq!(code, Some(3), "output kept draining after the undecodable line");
}
