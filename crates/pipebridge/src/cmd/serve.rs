use std::io;

use bytes::BytesMut;
use pipebridge_codec::{encode_frame, Framing, LENGTH_PREFIX_SIZE, MAX_FRAME_PAYLOAD};
use pipebridge_transport::{PipeEndpoint, PipeListener, PipeStream};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cmd::{ServeArgs, ServeMode};
use crate::exit::{transport_error, CliResult, SUCCESS};

const READ_CHUNK: usize = 4096;

pub async fn run(args: ServeArgs) -> CliResult<i32> {
    let listener = PipeListener::bind(PipeEndpoint::new(&args.endpoint))
        .map_err(|err| transport_error("bind failed", err))?;
    let framing = Framing::from(args.framing);
    let mode = args.mode;

    info!(
        endpoint = %listener.endpoint(),
        transport = listener.transport_name(),
        mode = ?mode,
        framing = framing.name(),
        "stub service listening"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut connections = JoinSet::new();
    let mut served = 0u64;
    loop {
        if args.count.is_some_and(|count| served >= count as u64) {
            break;
        }

        let stream = tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupt received; stopping");
                connections.abort_all();
                break;
            }
            accepted = listener.accept() => {
                accepted.map_err(|err| transport_error("accept failed", err))?
            }
        };

        served += 1;
        let connection = served;
        connections.spawn(async move {
            if let Err(err) = handle_connection(stream, mode, framing, connection).await {
                warn!(connection, error = %err, "connection ended with error");
            }
        });
    }

    while connections.join_next().await.is_some() {}
    Ok(SUCCESS)
}

async fn handle_connection(
    mut stream: PipeStream,
    mode: ServeMode,
    framing: Framing,
    connection: u64,
) -> io::Result<()> {
    let request = read_request(&mut stream, framing).await?;
    info!(
        connection,
        size = request.len(),
        peer_pid = ?stream.peer_pid(),
        "request received"
    );
    debug!(connection, request = %String::from_utf8_lossy(&request), "request body");

    if mode == ServeMode::Hang {
        std::future::pending::<()>().await;
    }

    if let Some(reply) = reply_for(mode, &request, connection) {
        write_reply(&mut stream, framing, &reply).await?;
        info!(connection, size = reply.len(), "reply sent");
    }
    Ok(())
}

/// The reply a mode sends for `request`, or `None` to close silently.
fn reply_for(mode: ServeMode, request: &[u8], connection: u64) -> Option<Vec<u8>> {
    match mode {
        ServeMode::Ack => Some(b"ACK".to_vec()),
        ServeMode::Echo => Some(request.to_vec()),
        ServeMode::Reply => Some(
            format!(
                "Service Reply: {} (ID: {connection})",
                String::from_utf8_lossy(request)
            )
            .into_bytes(),
        ),
        ServeMode::Silent | ServeMode::Hang => None,
    }
}

/// Read one request: a single frame when length-prefixed, otherwise until
/// end of stream or until the bytes form a complete JSON document.
async fn read_request<S>(stream: &mut S, framing: Framing) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    match framing {
        Framing::LengthPrefixed => {
            let mut header = [0u8; LENGTH_PREFIX_SIZE];
            stream.read_exact(&mut header).await?;
            let len = u32::from_le_bytes(header) as usize;
            if len > MAX_FRAME_PAYLOAD {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {len} bytes exceeds {MAX_FRAME_PAYLOAD}"),
                ));
            }
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).await?;
            Ok(body)
        }
        Framing::Raw => {
            let mut buf = Vec::new();
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if is_complete_document(&buf) {
                    break;
                }
            }
            Ok(buf)
        }
    }
}

/// Only a buffer ending in a closing bracket is worth parsing.
fn is_complete_document(buf: &[u8]) -> bool {
    match buf.iter().rev().find(|b| !b.is_ascii_whitespace()) {
        Some(b'}' | b']') => serde_json::from_slice::<Value>(buf).is_ok(),
        _ => false,
    }
}

async fn write_reply<S>(stream: &mut S, framing: Framing, reply: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    match framing {
        Framing::Raw => stream.write_all(reply).await?,
        Framing::LengthPrefixed => {
            let mut frame = BytesMut::new();
            encode_frame(reply, &mut frame)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            stream.write_all(&frame).await?;
        }
    }
    stream.flush().await
}
