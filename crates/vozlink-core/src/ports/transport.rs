//! Outbound media-transport port.

use async_trait::async_trait;

use crate::error::TransportError;

/// The serialized outbound leg of the call.
///
/// The delivery engine is the only caller of `send_media`/`send_mark`; the
/// session coordinator sends `clear` on barge-in. Implementations must
/// preserve call order — a mark sent after its media frame must arrive after
/// it.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Send one audio payload to the caller.
    async fn send_media(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Send a playback marker the provider will echo back once the audio
    /// before it has played out.
    async fn send_mark(&self, name: &str) -> Result<(), TransportError>;

    /// Tell the provider to flush its playback queue immediately.
    async fn send_clear(&self) -> Result<(), TransportError>;

    /// Whether the connection is still usable. Deliveries to a transport
    /// that is not open are soft failures: logged and skipped, never fatal.
    fn is_open(&self) -> bool;
}
