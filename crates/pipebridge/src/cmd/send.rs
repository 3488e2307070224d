use std::fs;
use std::time::{Duration, Instant};

use pipebridge_codec::{ActionRequest, TIMESTAMP_KEY};
use pipebridge_session::{dispatch_with_config, ReplyCompletion, SessionConfig, SessionOutcome};
use pipebridge_transport::PipeEndpoint;
use serde_json::Value;

use crate::cmd::SendArgs;
use crate::exit::{encode_error, io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_outcome, OutputFormat, SendReport};

const DEFAULT_ACTION: &str = "update_user";

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let request = build_request(&args)?;
    let config = session_config(&args)?;

    let started = Instant::now();
    let handle = dispatch_with_config(&request, &config)
        .map_err(|err| encode_error("encode failed", err))?;
    let session_id = handle.id();
    tracing::debug!(
        session = session_id,
        action = request.action(),
        endpoint = %config.endpoint,
        "request dispatched"
    );

    let abort = handle.abort_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; aborting session");
            abort.cancel();
        }
    });

    let outcome = handle.outcome().await;
    let report = SendReport {
        session_id,
        endpoint: &config.endpoint,
        action: request.action(),
        elapsed: started.elapsed(),
    };

    match outcome {
        SessionOutcome::Failed(err) => Err(session_error("send failed", err)),
        outcome => {
            print_outcome(&outcome, &report, format);
            Ok(SUCCESS)
        }
    }
}

fn build_request(args: &SendArgs) -> CliResult<ActionRequest> {
    let mut request = if let Some(json) = &args.json {
        parse_request(json, "--json")?
    } else if let Some(path) = &args.file {
        let text = fs::read_to_string(path).map_err(|err| {
            io_error(&format!("failed reading {}", path.display()), err)
        })?;
        parse_request(&text, &path.display().to_string())?
    } else {
        ActionRequest::new(args.action.as_deref().unwrap_or(DEFAULT_ACTION))
    };

    for field in &args.fields {
        let (key, value) = parse_field(field)?;
        request = request.field(key, value);
    }

    if !args.no_timestamp && request.get(TIMESTAMP_KEY).is_none() {
        request = request.with_timestamp();
    }
    Ok(request)
}

fn parse_request(text: &str, source: &str) -> CliResult<ActionRequest> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| CliError::new(USAGE, format!("{source} is not valid JSON: {err}")))?;
    ActionRequest::try_from(value)
        .map_err(|err| CliError::new(USAGE, format!("{source} is not a valid request: {err}")))
}

fn parse_field(input: &str) -> CliResult<(String, Value)> {
    let Some((key, raw)) = input.split_once('=') else {
        return Err(CliError::new(
            USAGE,
            format!("--field expects KEY=VALUE, got {input:?}"),
        ));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::new(USAGE, "--field key must not be empty"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn session_config(args: &SendArgs) -> CliResult<SessionConfig> {
    let completion = if args.first_chunk {
        ReplyCompletion::FirstChunk
    } else {
        ReplyCompletion::StreamEnd
    };
    Ok(SessionConfig::for_endpoint(PipeEndpoint::new(&args.endpoint))
        .with_connect_timeout(parse_timeout(&args.connect_timeout)?)
        .with_io_timeout(parse_timeout(&args.timeout)?)
        .with_framing(args.framing.into())
        .with_completion(completion)
        .with_shutdown_write(!args.no_half_close)
        .with_max_reply_size(args.max_reply))
}

/// A duration, or `none` to wait indefinitely.
fn parse_timeout(input: &str) -> CliResult<Option<Duration>> {
    if input.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_duration(input).map(Some)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pipebridge_codec::Framing;

    use super::*;
    use crate::cmd::Command;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Command,
    }

    fn send_args(argv: &[&str]) -> SendArgs {
        let argv = ["pipebridge", "send"].iter().chain(argv).copied();
        match Harness::try_parse_from(argv).expect("send args should parse").command {
            Command::Send(args) => args,
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn default_request_is_stamped_update_user() {
        let request = build_request(&send_args(&[])).unwrap();
        assert_eq!(request.action(), "update_user");
        assert!(request.get(TIMESTAMP_KEY).and_then(Value::as_u64).is_some());
    }

    #[test]
    fn fields_are_typed_when_they_parse_as_json() {
        let request = build_request(&send_args(&[
            "--no-timestamp",
            "-f",
            "userId=1001",
            "-f",
            "message=Hello",
            "-f",
            "tags=[\"a\",\"b\"]",
        ]))
        .unwrap();

        assert_eq!(request.get("userId"), Some(&Value::from(1001)));
        assert_eq!(request.get("message"), Some(&Value::from("Hello")));
        assert!(request.get("tags").is_some_and(Value::is_array));
        assert!(request.get(TIMESTAMP_KEY).is_none());
    }

    #[test]
    fn json_request_keeps_its_own_timestamp() {
        let request = build_request(&send_args(&[
            "--json",
            r#"{"action":"refresh","timestamp":42}"#,
        ]))
        .unwrap();
        assert_eq!(request.action(), "refresh");
        assert_eq!(request.get(TIMESTAMP_KEY), Some(&Value::from(42)));
    }

    #[test]
    fn json_request_without_action_is_usage_error() {
        let err = build_request(&send_args(&["--json", r#"{"userId":1}"#])).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn field_without_separator_is_rejected() {
        assert_eq!(parse_field("userId").unwrap_err().code, USAGE);
        assert_eq!(parse_field("=1").unwrap_err().code, USAGE);
    }

    #[test]
    fn config_follows_flags() {
        let config = session_config(&send_args(&[
            "--endpoint",
            "/tmp/other.sock",
            "--timeout",
            "none",
            "--connect-timeout",
            "250ms",
            "--framing",
            "length-prefixed",
            "--first-chunk",
        ]))
        .unwrap();

        assert_eq!(config.endpoint.to_string(), "/tmp/other.sock");
        assert_eq!(config.io_timeout, None);
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.framing, Framing::LengthPrefixed);
        assert_eq!(config.completion, ReplyCompletion::FirstChunk);
        assert!(config.shutdown_write);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_timeout("None").unwrap(), None);
    }
}
