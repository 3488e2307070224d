use std::future::Future;

use pipebridge_transport::{PipeEndpoint, PipeStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens the connection a session talks over.
///
/// Sessions are generic over this seam so the exchange logic can run
/// against in-memory or instrumented streams. Production code uses
/// [`EndpointConnector`].
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open one connection to `endpoint`.
    fn connect(
        &self,
        endpoint: &PipeEndpoint,
    ) -> impl Future<Output = pipebridge_transport::Result<Self::Stream>> + Send;
}

/// Connects through the platform transport (UDS or named pipe).
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointConnector;

impl Connector for EndpointConnector {
    type Stream = PipeStream;

    async fn connect(
        &self,
        endpoint: &PipeEndpoint,
    ) -> pipebridge_transport::Result<PipeStream> {
        pipebridge_transport::connect(endpoint).await
    }
}
