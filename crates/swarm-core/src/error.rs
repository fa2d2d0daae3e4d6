use std::io;

/// Errors raised while framing or parsing a wire message.
///
/// These are connection-scoped: any [`WireError`] is fatal to the connection
/// it occurred on, never to the owning process (see the error taxonomy in
/// `SPEC_FULL.md` section 7).
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic: expected {expected:#010x}, got {got:#010x}")]
    BadMagic { expected: u32, got: u32 },

    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    #[error("payload length {len} exceeds max frame size {max}")]
    FrameTooLarge { len: u32, max: u32 },

    #[error("truncated payload: expected {expected} bytes, got {got}")]
    TruncatedPayload { expected: usize, got: usize },

    #[error("unexpected message type: expected {expected:?}, got {got:?}")]
    UnexpectedMessageType {
        expected: &'static str,
        got: &'static str,
    },
}
