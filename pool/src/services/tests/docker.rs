use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

use crate::error::PoolError;
use crate::services::docker::{parse_ps_line, DockerRuntime};
use crate::traits::ContainerRuntime;

const FAKE_DOCKER: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
case "$1" in
  ps)
    printf 'abc\tbot-container\t0.0.0.0:5501->8000/tcp, :::5501->8000/tcp\n'
    printf 'def\tother-image\t0.0.0.0:6000->80/tcp\n'
    printf 'ghi\tbot-container\t\n'
    ;;
  run)
    echo "$@" > "$dir/run_args"
    echo "f00dcafe"
    ;;
  kill)
    shift
    echo "$@" > "$dir/killed"
    ;;
  *)
    echo "unsupported" >&2
    exit 1
    ;;
esac
"#;

fn fake_docker() -> (TempDir, DockerRuntime) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docker");
    std::fs::write(&path, FAKE_DOCKER).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    let runtime = DockerRuntime::with_binary(path.to_string_lossy());
    (dir, runtime)
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap().trim().to_string()
}

#[test]
fn test_parse_published_port() {
    let container = parse_ps_line("abc\tbot-container\t0.0.0.0:5501->8000/tcp, :::5501->8000/tcp").unwrap();

    assert_eq!(container.id, "abc");
    assert_eq!(container.image, "bot-container");
    assert_eq!(container.address, "127.0.0.1");
    assert_eq!(container.host_port, 5501);
}

#[test]
fn test_parse_keeps_specific_address() {
    let container = parse_ps_line("abc\tbot-container\t10.0.0.4:5600->8000/tcp").unwrap();

    assert_eq!(container.address, "10.0.0.4");
    assert_eq!(container.host_port, 5600);
}

#[test]
fn test_parse_skips_unpublished_containers() {
    assert!(parse_ps_line("abc\tbot-container\t8000/tcp").is_none());
    assert!(parse_ps_line("abc\tbot-container").is_none());
    assert!(parse_ps_line("").is_none());
}

#[tokio::test]
async fn test_list_running_filters_by_image() {
    let (_dir, runtime) = fake_docker();

    let running = runtime.list_running("bot-container").await.unwrap();

    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, "abc");
    assert_eq!(running[0].host_port, 5501);
}

#[tokio::test]
async fn test_run_publishes_port_and_returns_id() {
    let (dir, runtime) = fake_docker();

    let id = runtime.run("bot-container", 5502, 8000).await.unwrap();

    assert_eq!(id, "f00dcafe");
    assert_eq!(read(dir.path(), "run_args"), "run --rm -d -p 5502:8000 bot-container");
}

#[tokio::test]
async fn test_kill_passes_every_id() {
    let (dir, runtime) = fake_docker();

    runtime.kill(vec!["abc".to_string(), "def".to_string()]).await.unwrap();

    assert_eq!(read(dir.path(), "killed"), "abc def");
}

#[tokio::test]
async fn test_missing_binary_is_a_runtime_error() {
    let runtime = DockerRuntime::with_binary("/nonexistent/docker");

    let result = runtime.list_running("bot-container").await;

    assert!(matches!(result, Err(PoolError::Runtime { .. })));
    assert!(runtime.kill(Vec::new()).await.is_ok(), "nothing to kill");
}
