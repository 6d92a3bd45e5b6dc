// CLI integration tests driving `sendit serve` over stdio.
use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_sendit");
    Command::new(exe)
}

fn serve(args: &[&str], lines: &[Value]) -> Output {
    let mut child = cmd()
        .arg("serve")
        .args(args)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
    }
    child.wait_with_output().expect("wait")
}

fn stdout_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn send(id: i64, arguments: Value) -> Value {
    json!({"id": id, "method": "sendMessage", "arguments": arguments})
}

#[test]
fn send_and_complete_flow() {
    let output = serve(
        &[],
        &[
            send(1, json!({"recipient": "+15551234567", "message": "hi"})),
            json!({"event": "composeFinished", "outcome": "sent"}),
        ],
    );
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec![json!({"id": 1, "result": "sent"})]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let presented = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(|value| value["notice"]["kind"] == json!("presented"))
        .expect("presented notice");
    assert_eq!(presented["notice"]["channel"], json!("com.sendit/messages"));
    assert_eq!(
        presented["notice"]["details"]["recipient"],
        json!("+15551234567")
    );
    assert!(presented["notice"]["details"]["call"].as_u64().is_some());
}

#[test]
fn missing_message_is_invalid_arguments() {
    let output = serve(&[], &[send(2, json!({"recipient": "+1555"}))]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["id"], json!(2));
    assert_eq!(lines[0]["error"]["code"], json!("INVALID_ARGUMENTS"));
    assert_eq!(lines[0]["error"]["message"], json!("Message not found"));
    assert_eq!(lines[0]["error"]["details"]["field"], json!("message"));
}

#[test]
fn unknown_method_is_not_implemented() {
    let output = serve(
        &[],
        &[json!({"id": "a", "method": "readMessages", "arguments": {}})],
    );
    let lines = stdout_lines(&output);
    assert_eq!(lines[0]["id"], json!("a"));
    assert_eq!(lines[0]["error"]["code"], json!("NOT_IMPLEMENTED"));
}

#[test]
fn unavailable_flag_reports_sms_not_available() {
    let output = serve(
        &["--unavailable"],
        &[send(3, json!({"recipient": "+1555", "message": "hi"}))],
    );
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["error"]["code"], json!("SMS_NOT_AVAILABLE"));
    assert_eq!(lines[0]["error"]["message"], json!("SMS is not available"));
}

#[test]
fn eof_while_pending_abandons_call() {
    let output = serve(&[], &[send(4, json!({"recipient": "+1555", "message": "hi"}))]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["id"], json!(4));
    assert_eq!(lines[0]["error"]["code"], json!("CALL_ABANDONED"));
}

#[test]
fn custom_channel_appears_in_notices() {
    let output = serve(
        &["--channel", "com.example/sms"],
        &[json!({"event": "composeFinished", "outcome": "sent"})],
    );
    assert!(output.status.success());
    assert!(stdout_lines(&output).is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let discarded = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(|value| value["notice"]["kind"] == json!("discarded"))
        .expect("discarded notice");
    assert_eq!(discarded["notice"]["channel"], json!("com.example/sms"));
}

#[test]
fn version_prints_json() {
    let output = cmd().arg("version").output().expect("version");
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["name"], json!("sendit"));
    assert_eq!(value["version"], json!(env!("CARGO_PKG_VERSION")));
}
