use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;

use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info};

use crate::endpoint::PipeEndpoint;
use crate::error::{Result, TransportError};
use crate::stream::PipeStream;

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

fn check_path_len(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}

/// Connect to a listening Unix domain socket.
pub(crate) async fn connect(endpoint: &PipeEndpoint) -> Result<PipeStream> {
    let path = endpoint.path();
    check_path_len(path)?;
    let stream = UnixStream::connect(path)
        .await
        .map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!(?path, "connected to unix domain socket");
    Ok(PipeStream::from_unix(stream))
}

/// Listening side of a local endpoint.
///
/// The bridge itself never listens; this exists for stub services and
/// tests. The socket file is removed on drop, but only if it is still the
/// socket this listener created.
pub struct PipeListener {
    listener: UnixListener,
    endpoint: PipeEndpoint,
    created_inode: Option<(u64, u64)>,
}

impl PipeListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// Bind and listen on the endpoint.
    ///
    /// If a socket file already exists at the path it is removed first
    /// (stale socket cleanup). Any other kind of file is left alone and the
    /// bind fails. Must be called from within a tokio runtime.
    pub fn bind(endpoint: impl Into<PipeEndpoint>) -> Result<Self> {
        Self::bind_with_mode(endpoint, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind with an explicit permission mode for the socket file.
    pub fn bind_with_mode(endpoint: impl Into<PipeEndpoint>, mode: u32) -> Result<Self> {
        let endpoint = endpoint.into();
        let path = endpoint.path().to_path_buf();
        check_path_len(&path)?;

        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(bind_err)?;
            } else {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            endpoint,
            created_inode: Some((created.dev(), created.ino())),
        })
    }

    /// Wait for the next incoming connection.
    pub async fn accept(&self) -> Result<PipeStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        debug!("accepted connection");
        Ok(PipeStream::from_unix(stream))
    }

    /// The endpoint this listener is bound to.
    pub fn endpoint(&self) -> &PipeEndpoint {
        &self.endpoint
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "unix-domain-socket"
    }
}

impl Drop for PipeListener {
    fn drop(&mut self) {
        let path = self.endpoint.path();
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino
                {
                    debug!(?path, "cleaning up socket file");
                    let _ = std::fs::remove_file(path);
                } else {
                    debug!(?path, "socket path identity changed; skipping cleanup");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/pbt-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("test.sock")
    }

    fn cleanup(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[tokio::test]
    async fn test_bind_accept_connect() {
        let sock_path = make_sock_path("bind");
        let listener = PipeListener::bind(sock_path.as_path()).unwrap();
        assert!(sock_path.exists());

        let endpoint = PipeEndpoint::new(&sock_path);
        let client = tokio::spawn(async move {
            let mut client = connect(&endpoint).await.unwrap();
            client.write_all(b"hello").await.unwrap();
        });

        let mut server = listener.accept().await.unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(server.transport_name(), "unix-domain-socket");

        client.await.unwrap();

        drop(listener);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        cleanup(&sock_path);
    }

    #[tokio::test]
    async fn test_connect_without_listener_is_endpoint_absent() {
        let sock_path = make_sock_path("absent");
        let err = connect(&PipeEndpoint::new(&sock_path)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.is_endpoint_absent());
        cleanup(&sock_path);
    }

    #[tokio::test]
    async fn test_path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = PipeListener::bind(long_path.as_str());
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));

        let result = connect(&PipeEndpoint::new(&long_path)).await;
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[tokio::test]
    async fn test_bind_default_permissions_hardened() {
        let sock_path = make_sock_path("perms");
        let listener = PipeListener::bind(sock_path.as_path()).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        cleanup(&sock_path);
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let sock_path = make_sock_path("stale");
        let first = PipeListener::bind(sock_path.as_path()).unwrap();
        // Leak the file: a crashed service leaves its socket behind.
        std::mem::forget(first);

        let second = PipeListener::bind(sock_path.as_path()).unwrap();
        assert_eq!(second.endpoint().path(), sock_path.as_path());

        drop(second);
        cleanup(&sock_path);
    }

    #[tokio::test]
    async fn test_bind_rejects_existing_non_socket_file() {
        let sock_path = make_sock_path("file");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = PipeListener::bind(sock_path.as_path());
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(sock_path.exists(), "non-socket files must never be removed");

        cleanup(&sock_path);
    }

    #[tokio::test]
    async fn test_drop_removes_own_socket() {
        let sock_path = make_sock_path("drop-own");
        let listener = PipeListener::bind(sock_path.as_path()).unwrap();
        assert!(sock_path.exists());

        drop(listener);
        assert!(!sock_path.exists(), "drop should remove the socket it bound");

        cleanup(&sock_path);
    }

    #[tokio::test]
    async fn test_drop_does_not_remove_replaced_path() {
        let sock_path = make_sock_path("drop-race");
        let listener = PipeListener::bind(sock_path.as_path()).unwrap();

        std::fs::remove_file(&sock_path).unwrap();
        std::fs::write(&sock_path, b"replacement-file").unwrap();

        drop(listener);
        assert!(
            sock_path.exists(),
            "drop must not remove path if inode identity changed"
        );

        cleanup(&sock_path);
    }
}
