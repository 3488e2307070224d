#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/pbcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("stub service did not bind {}", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn spawn_serve(sock_path: &Path, extra: &[&str]) -> Child {
    let child = Command::new(env!("CARGO_BIN_EXE_pipebridge"))
        .args(["--log-level", "error", "serve", "--endpoint"])
        .arg(sock_path)
        .args(extra)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start");
    wait_for_socket(sock_path, Duration::from_secs(3));
    child
}

fn send(sock_path: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pipebridge"))
        .args(["--log-level", "error", "--format", "json", "send", "--endpoint"])
        .arg(sock_path)
        .args(extra)
        .output()
        .expect("send should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("send should emit json")
}

fn stop(mut child: Child, dir: &Path) {
    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn send_update_user_to_ack_service() {
    let dir = unique_temp_dir("ack");
    let sock_path = dir.join("demo_pipe.sock");
    let mut child = spawn_serve(&sock_path, &["--mode", "ack", "--count", "1"]);

    let output = send(&sock_path, &["update_user", "-f", "userId=1001", "-f", "message=Hello"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let payload = stdout_json(&output);
    assert_eq!(payload["outcome"], "delivered");
    assert_eq!(payload["action"], "update_user");
    assert_eq!(payload["reply"], "ACK");
    assert_eq!(payload["reply_size"], 3);

    let status = child.wait().expect("serve should exit after --count");
    assert!(status.success());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn reply_mode_echoes_request_in_service_reply() {
    let dir = unique_temp_dir("reply");
    let sock_path = dir.join("demo_pipe.sock");
    let child = spawn_serve(&sock_path, &["--mode", "reply"]);

    let output = send(&sock_path, &["-f", "userId=1001", "--no-timestamp"]);

    assert!(output.status.success());
    let reply = stdout_json(&output)["reply"]
        .as_str()
        .expect("reply should be text")
        .to_string();
    assert!(reply.starts_with(r#"Service Reply: {"action":"update_user","userId":1001}"#));
    assert!(reply.ends_with("(ID: 1)"));
    stop(child, &dir);
}

#[test]
fn silent_service_yields_delivered_empty() {
    let dir = unique_temp_dir("silent");
    let sock_path = dir.join("demo_pipe.sock");
    let child = spawn_serve(&sock_path, &["--mode", "silent"]);

    let output = send(&sock_path, &[]);

    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["outcome"], "delivered_empty");
    assert!(payload["reply"].is_null());
    stop(child, &dir);
}

#[test]
fn length_prefixed_exchange_round_trips() {
    let dir = unique_temp_dir("framed");
    let sock_path = dir.join("demo_pipe.sock");
    let child = spawn_serve(&sock_path, &["--mode", "echo", "--framing", "length-prefixed"]);

    let output = send(
        &sock_path,
        &["--json", r#"{"action":"ping","n":7}"#, "--framing", "length-prefixed"],
    );

    assert!(output.status.success());
    let reply = stdout_json(&output)["reply"]
        .as_str()
        .expect("reply should be text")
        .to_string();
    let echoed: serde_json::Value = serde_json::from_str(&reply).expect("echo should be json");
    assert_eq!(echoed["action"], "ping");
    assert_eq!(echoed["n"], 7);
    stop(child, &dir);
}

#[test]
fn missing_service_returns_1() {
    let dir = unique_temp_dir("missing");
    let output = send(&dir.join("nobody.sock"), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("send failed"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn hanging_service_returns_124() {
    let dir = unique_temp_dir("hang");
    let sock_path = dir.join("demo_pipe.sock");
    let child = spawn_serve(&sock_path, &["--mode", "hang"]);

    let started = Instant::now();
    let output = send(&sock_path, &["--timeout", "300ms"]);

    assert_eq!(output.status.code(), Some(124));
    assert!(started.elapsed() < Duration::from_secs(10));
    stop(child, &dir);
}

#[test]
fn invalid_json_request_returns_64() {
    let dir = unique_temp_dir("badjson");
    let output = send(&dir.join("unused.sock"), &["--json", r#"{"userId":1}"#]);

    assert_eq!(output.status.code(), Some(64));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_extended_reports_defaults() {
    let output = Command::new(env!("CARGO_BIN_EXE_pipebridge"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("version: {}", env!("CARGO_PKG_VERSION"))));
    assert!(stdout.contains("default_endpoint: /tmp/demo_pipe.sock"));
}
