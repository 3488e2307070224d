use pipebridge_codec::{EncodeError, EncodedPayload, Framing, MAX_FRAME_PAYLOAD};
use serde::Serialize;

use crate::config::SessionConfig;
use crate::outcome::SessionOutcome;
use crate::session::{PipeSession, SessionHandle};

/// Encode `request` and start a session with the default configuration.
///
/// Encoding failures are returned here, before any connection exists.
/// Must be called inside a tokio runtime when encoding succeeds.
pub fn dispatch<T>(request: &T) -> Result<SessionHandle, EncodeError>
where
    T: Serialize + ?Sized,
{
    dispatch_with_config(request, &SessionConfig::default())
}

/// Encode `request` and start a session with `config`.
pub fn dispatch_with_config<T>(
    request: &T,
    config: &SessionConfig,
) -> Result<SessionHandle, EncodeError>
where
    T: Serialize + ?Sized,
{
    let payload = prepare(request, config.framing)?;
    Ok(PipeSession::new(config.clone()).open(payload))
}

/// Encode `request`, run a session and wait for its outcome.
///
/// ```no_run
/// use pipebridge_codec::ActionRequest;
/// use pipebridge_session::{request, SessionConfig};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let action = ActionRequest::new("update_user")
///     .field("userId", 1001)
///     .with_timestamp();
/// let outcome = request(&action, &SessionConfig::default()).await?;
/// println!("{:?}", outcome.into_result()?);
/// # Ok(())
/// # }
/// ```
pub async fn request<T>(request: &T, config: &SessionConfig) -> Result<SessionOutcome, EncodeError>
where
    T: Serialize + ?Sized,
{
    let handle = dispatch_with_config(request, config)?;
    Ok(handle.outcome().await)
}

fn prepare<T>(request: &T, framing: Framing) -> Result<EncodedPayload, EncodeError>
where
    T: Serialize + ?Sized,
{
    let payload = pipebridge_codec::encode(request)?;
    if framing == Framing::LengthPrefixed && payload.len() > MAX_FRAME_PAYLOAD {
        return Err(EncodeError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }
    Ok(payload)
}
