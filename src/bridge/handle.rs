//! Host callback contracts
//!
//! The webview host owns result delivery and permission negotiation; the
//! core only ever talks to them through these traits.

use serde_json::Value;

/// A persistent result channel held by the calling webview code.
///
/// One command invocation owns one handle. A handle stays open across
/// `pending` and `frame` deliveries and is consumed by the first terminal
/// `success` or `error`.
pub trait CallbackHandle: Send + Sync {
    /// Acknowledge without a result, keeping the handle open for the real
    /// outcome later.
    fn pending(&self);

    /// Terminal success payload
    fn success(&self, payload: Value);

    /// Terminal failure message
    fn error(&self, message: String);

    /// Non-terminal result; the handle stays open for further frames
    fn frame(&self, payload: Value);
}

/// Aggregate camera/microphone/storage permission status as reported by
/// the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Everything the capture pipeline needs is granted
    Granted,
    /// Not yet decided; the host can prompt
    Undetermined,
    /// The host reports a standing denial
    Denied,
}

/// Deferred command re-invocation, run by the host once permissions land
pub type PermissionRetry = Box<dyn FnOnce() + Send + 'static>;

/// Host-owned permission negotiation
pub trait PermissionGate: Send + Sync {
    fn state(&self) -> PermissionState;

    /// Prompt the user. The host invokes `retry` once the grant comes
    /// through; on denial it may simply drop it.
    fn request(&self, retry: PermissionRetry);
}
