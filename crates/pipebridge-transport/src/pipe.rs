use std::sync::Mutex;

use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeServer, ServerOptions};
use tracing::{debug, info};

use crate::endpoint::PipeEndpoint;
use crate::error::{Result, TransportError};
use crate::stream::PipeStream;

/// Open the client end of a Windows named pipe.
///
/// A busy pipe (every server instance taken) is reported as a connect
/// failure like any other; the bridge does not wait or retry.
pub(crate) async fn connect(endpoint: &PipeEndpoint) -> Result<PipeStream> {
    let path = endpoint.path();
    let client = ClientOptions::new()
        .open(path)
        .map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!(?path, "connected to named pipe");
    Ok(PipeStream::from_pipe_client(client))
}

/// Listening side of a local endpoint.
///
/// Holds one pending server instance; each accepted connection hands that
/// instance out and creates the next one before returning.
pub struct PipeListener {
    next: Mutex<Option<NamedPipeServer>>,
    endpoint: PipeEndpoint,
}

impl PipeListener {
    /// Create the first pipe instance. Must be called from within a tokio runtime.
    pub fn bind(endpoint: impl Into<PipeEndpoint>) -> Result<Self> {
        let endpoint = endpoint.into();
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .create(endpoint.path())
            .map_err(|e| TransportError::Bind {
                path: endpoint.path().to_path_buf(),
                source: e,
            })?;
        info!(path = ?endpoint.path(), "listening on named pipe");
        Ok(Self {
            next: Mutex::new(Some(server)),
            endpoint,
        })
    }

    /// Wait for the next incoming connection.
    pub async fn accept(&self) -> Result<PipeStream> {
        let server = self.take_instance()?;
        server.connect().await.map_err(TransportError::Accept)?;

        let replacement = ServerOptions::new()
            .create(self.endpoint.path())
            .map_err(TransportError::Accept)?;
        if let Ok(mut slot) = self.next.lock() {
            *slot = Some(replacement);
        }
        debug!("accepted connection");
        Ok(PipeStream::from_pipe_server(server))
    }

    fn take_instance(&self) -> Result<NamedPipeServer> {
        let pending = match self.next.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match pending {
            Some(server) => Ok(server),
            None => ServerOptions::new()
                .create(self.endpoint.path())
                .map_err(TransportError::Accept),
        }
    }

    /// The endpoint this listener is bound to.
    pub fn endpoint(&self) -> &PipeEndpoint {
        &self.endpoint
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "named-pipe"
    }
}
