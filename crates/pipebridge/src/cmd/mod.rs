use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use pipebridge_codec::Framing;
use pipebridge_session::DEFAULT_MAX_REPLY;
use pipebridge_transport::DEFAULT_ENDPOINT;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one action to the service and print its reply.
    Send(SendArgs),
    /// Run a stub service for local testing.
    Serve(ServeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format).await,
        Command::Serve(args) => serve::run(args).await,
        Command::Version(args) => version::run(args),
    }
}

/// Wire framing, as spelled on the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FramingArg {
    /// One unframed JSON document; reply runs to end of stream.
    Raw,
    /// 4-byte little-endian length header per message.
    LengthPrefixed,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Raw => Framing::Raw,
            FramingArg::LengthPrefixed => Framing::LengthPrefixed,
        }
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Action identifier. Default: update_user.
    #[arg(conflicts_with_all = ["json", "file"])]
    pub action: Option<String>,
    /// Request field as KEY=VALUE (repeatable). VALUE is parsed as JSON,
    /// falling back to a plain string.
    #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
    /// Whole request as a JSON object.
    #[arg(long, conflicts_with_all = ["action", "file"])]
    pub json: Option<String>,
    /// Read the request JSON object from a file.
    #[arg(long, conflicts_with_all = ["action", "json"])]
    pub file: Option<PathBuf>,
    /// Service endpoint: a socket path, or \\.\pipe\NAME on Windows.
    #[arg(long, short = 'e', env = "PIPEBRIDGE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
    /// Bound on connecting (e.g. 5s, 500ms, or "none").
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
    /// Bound on writing the request and receiving the reply.
    #[arg(long, default_value = "30s")]
    pub timeout: String,
    /// Wire framing.
    #[arg(long, default_value = "raw")]
    pub framing: FramingArg,
    /// Close after the first reply chunk instead of waiting for end of stream.
    #[arg(long)]
    pub first_chunk: bool,
    /// Keep the write side open after sending the request.
    #[arg(long)]
    pub no_half_close: bool,
    /// Do not stamp a "timestamp" field.
    #[arg(long)]
    pub no_timestamp: bool,
    /// Maximum reply size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_REPLY)]
    pub max_reply: usize,
}

/// How the stub service answers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ServeMode {
    /// Reply "ACK".
    Ack,
    /// Reply with the request bytes.
    Echo,
    /// Reply "Service Reply: <request> (ID: <n>)".
    Reply,
    /// Read the request and close without replying.
    Silent,
    /// Read the request and never reply or close.
    Hang,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Endpoint to listen on.
    #[arg(long, short = 'e', env = "PIPEBRIDGE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
    /// Reply behavior.
    #[arg(long, default_value = "reply")]
    pub mode: ServeMode,
    /// Wire framing.
    #[arg(long, default_value = "raw")]
    pub framing: FramingArg,
    /// Exit after serving N connections.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
