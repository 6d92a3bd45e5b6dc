//! Purpose: Host the bridge over newline-delimited JSON on stdio.
//! Exports: `HostConfig`, `serve`.
//! Role: Plays the environment: UI calls and composer events arrive on stdin,
//!   call resolutions leave on stdout, composer activity goes to stderr notices.
//! Invariants: stdout only emits call resolutions (one JSON object per line).
//! Invariants: stdin EOF answers any still-pending call before exiting.
//! Invariants: Malformed lines are answered with a `USAGE` error, under the
//!   line's `id` when one could be read and null otherwise.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};

use sendit::api::{
    Bridge, BridgeConfig, CallResult, CompletionHandle, CompletionOutcome, Composer, Error,
    ErrorKind, Resolver, RouteOutcome, SendRequest,
};
use sendit::notice::{Notice, notice_json};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug)]
pub(super) struct HostConfig {
    pub channel: String,
    pub can_send: bool,
}

struct Resolution {
    id: Value,
    result: CallResult,
}

/// A line the host could not act on, answered under whatever id it carried.
struct Rejected {
    id: Value,
    error: Error,
}

impl From<Error> for Rejected {
    fn from(error: Error) -> Self {
        Self {
            id: Value::Null,
            error,
        }
    }
}

enum HostMessage {
    Call {
        id: Value,
        method: String,
        arguments: Value,
    },
    Finished(CompletionOutcome),
    Availability(bool),
}

/// Composer whose UI lives on the other side of stdio: presenting emits a
/// notice, and a later `composeFinished` line dismisses it.
struct StdioComposer {
    channel: String,
    can_send: AtomicBool,
    on_dismiss: Mutex<Option<CompletionHandle>>,
}

impl StdioComposer {
    fn new(config: &HostConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            can_send: AtomicBool::new(config.can_send),
            on_dismiss: Mutex::new(None),
        }
    }

    fn set_can_send(&self, can_send: bool) {
        self.can_send.store(can_send, Ordering::SeqCst);
    }

    fn take_dismiss(&self) -> Option<CompletionHandle> {
        self.on_dismiss
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Composer for StdioComposer {
    fn can_send(&self) -> bool {
        self.can_send.load(Ordering::SeqCst)
    }

    fn present(&self, request: SendRequest, on_dismiss: CompletionHandle) {
        let call = on_dismiss.id().get();
        *self
            .on_dismiss
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(on_dismiss);
        emit_notice(
            Notice::now("presented", &self.channel, "message composer presented")
                .with_detail("call", call)
                .with_detail("recipient", request.recipient)
                .with_detail("body_chars", request.body.chars().count()),
        );
    }
}

pub(super) fn serve(config: HostConfig) -> Result<(), Error> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let reader = BufReader::new(stdin.lock());
    let writer = BufWriter::new(stdout.lock());
    run(reader, writer, config)
}

fn run<R: BufRead, W: Write>(mut reader: R, mut writer: W, config: HostConfig) -> Result<(), Error> {
    let composer = Arc::new(StdioComposer::new(&config));
    let bridge = Bridge::with_config(
        composer.clone(),
        BridgeConfig::default().with_channel(config.channel.clone()),
    );
    let (tx, rx) = mpsc::channel::<Resolution>();
    tracing::info!(channel = %config.channel, can_send = config.can_send, "bridge host started");

    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read host input")
                .with_source(err)
        })?;
        if read == 0 {
            break;
        }

        let message = line.trim_end_matches(['\n', '\r']);
        if message.trim().is_empty() {
            continue;
        }

        match parse_host_message(message) {
            Ok(HostMessage::Call {
                id,
                method,
                arguments,
            }) => {
                let sink = tx.clone();
                let resolver = Resolver::from_fn(move |result| {
                    let _ = sink.send(Resolution { id, result });
                });
                bridge.dispatch(&method, &arguments, resolver);
            }
            Ok(HostMessage::Finished(outcome)) => {
                let label = outcome.label();
                let routed = match composer.take_dismiss() {
                    Some(handle) => handle.complete(outcome),
                    None => bridge.complete(outcome),
                };
                if routed == RouteOutcome::Discarded {
                    emit_notice(
                        Notice::now("discarded", &config.channel, "completion with no pending call")
                            .with_detail("outcome", label),
                    );
                }
            }
            Ok(HostMessage::Availability(can_send)) => composer.set_can_send(can_send),
            Err(Rejected { id, error }) => write_response(&mut writer, id, &Err(error))?,
        }

        for resolution in rx.try_iter() {
            write_response(&mut writer, resolution.id, &resolution.result)?;
        }
    }

    bridge.abandon_pending("host input closed");
    for resolution in rx.try_iter() {
        write_response(&mut writer, resolution.id, &resolution.result)?;
    }
    writer.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush host output")
            .with_source(err)
    })
}

fn parse_host_message(line: &str) -> Result<HostMessage, Rejected> {
    let value = serde_json::from_str::<Value>(line).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid JSON")
            .with_source(err)
    })?;
    let Value::Object(mut object) = value else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("message must be a JSON object")
            .into());
    };

    if let Some(event) = object.remove("event") {
        return Ok(parse_event(event, object)?);
    }

    let id = match object.remove("id") {
        None => Value::Null,
        Some(id @ (Value::String(_) | Value::Number(_) | Value::Null)) => id,
        Some(_) => {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("id must be a string, number, or null")
                .into());
        }
    };
    let Some(method) = object
        .remove("method")
        .and_then(|value| value.as_str().map(ToString::to_string))
    else {
        return Err(Rejected {
            id,
            error: Error::new(ErrorKind::Usage)
                .with_message("message needs a string `method` or `event`"),
        });
    };
    let arguments = object.remove("arguments").unwrap_or(Value::Null);
    Ok(HostMessage::Call {
        id,
        method,
        arguments,
    })
}

fn parse_event(event: Value, mut object: Map<String, Value>) -> Result<HostMessage, Error> {
    match event.as_str() {
        Some("composeFinished") => {
            let outcome = object
                .remove("outcome")
                .and_then(|value| value.as_str().map(ToString::to_string))
                .ok_or_else(|| {
                    Error::new(ErrorKind::Usage)
                        .with_message("composeFinished requires a string `outcome`")
                })?;
            Ok(HostMessage::Finished(parse_outcome(&outcome, &object)))
        }
        Some("availability") => object
            .remove("canSend")
            .and_then(|value| value.as_bool())
            .map(HostMessage::Availability)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message("availability requires a boolean `canSend`")
            }),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message("unknown event")
            .with_detail("event", event.clone())),
    }
}

fn parse_outcome(outcome: &str, object: &Map<String, Value>) -> CompletionOutcome {
    match outcome {
        "sent" => CompletionOutcome::Sent,
        "cancelled" => CompletionOutcome::Cancelled,
        "failed" => CompletionOutcome::Failed(
            object
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unspecified")
                .to_string(),
        ),
        _ => CompletionOutcome::Unrecognized,
    }
}

#[derive(Debug, Serialize)]
struct HostResponse {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<HostError>,
}

#[derive(Debug, Serialize)]
struct HostError {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    details: Map<String, Value>,
}

impl HostResponse {
    fn new(id: Value, result: &CallResult) -> Self {
        match result {
            Ok(reply) => Self {
                id,
                result: Some(reply.as_str()),
                error: None,
            },
            Err(err) => Self {
                id,
                result: None,
                error: Some(HostError {
                    code: err.code(),
                    message: err.message().unwrap_or(err.code()).to_string(),
                    hint: err.hint().map(ToString::to_string),
                    details: err.details().clone(),
                }),
            },
        }
    }
}

fn write_response<W: Write>(writer: &mut W, id: Value, result: &CallResult) -> Result<(), Error> {
    let payload = HostResponse::new(id, result);
    serde_json::to_writer(&mut *writer, &payload).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode host response")
            .with_source(err)
    })?;
    writer.write_all(b"\n").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write host response")
            .with_source(err)
    })?;
    writer.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush host response")
            .with_source(err)
    })
}

fn emit_notice(notice: Notice) {
    let json = serde_json::to_string(&notice_json(&notice))
        .unwrap_or_else(|_| "{\"notice\":{\"kind\":\"internal\"}}".to_string());
    eprintln!("{json}");
}
