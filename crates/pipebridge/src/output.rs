use std::io::{IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pipebridge_session::SessionOutcome;
use pipebridge_transport::PipeEndpoint;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// What `send` knows about a finished session besides its outcome.
pub struct SendReport<'a> {
    pub session_id: u64,
    pub endpoint: &'a PipeEndpoint,
    pub action: &'a str,
    pub elapsed: Duration,
}

#[derive(Serialize)]
struct OutcomeOutput<'a> {
    outcome: &'a str,
    session_id: u64,
    endpoint: String,
    action: &'a str,
    reply_size: usize,
    reply: Option<String>,
    elapsed_ms: u128,
    timestamp: String,
}

pub fn print_outcome(outcome: &SessionOutcome, report: &SendReport<'_>, format: OutputFormat) {
    let reply = outcome.reply().map(|bytes| &bytes[..]).unwrap_or_default();
    let state = outcome.state();

    match format {
        OutputFormat::Json => {
            let out = OutcomeOutput {
                outcome: state.as_str(),
                session_id: report.session_id,
                endpoint: report.endpoint.to_string(),
                action: report.action,
                reply_size: reply.len(),
                reply: outcome.reply().map(|bytes| payload_preview(bytes)),
                elapsed_ms: report.elapsed.as_millis(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OUTCOME", "SESSION", "ACTION", "SIZE", "ELAPSED", "REPLY"])
                .add_row(vec![
                    state.as_str().to_string(),
                    report.session_id.to_string(),
                    report.action.to_string(),
                    reply.len().to_string(),
                    format!("{}ms", report.elapsed.as_millis()),
                    payload_preview(reply),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "outcome={} session={} action={} size={} elapsed={}ms reply={}",
                state,
                report.session_id,
                report.action,
                reply.len(),
                report.elapsed.as_millis(),
                payload_preview(reply)
            );
        }
        OutputFormat::Raw => {
            print_raw(reply);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_marks_binary_replies() {
        assert_eq!(payload_preview(b"ACK"), "ACK");
        assert_eq!(payload_preview(&[0xff, 0xfe, 0x00]), "<binary 3 bytes>");
    }
}
