//! The quantum of data exchanged between devices.

use bytes::Bytes;

/// A single opaque payload travelling through a channel mailbox.
///
/// Receive paths attach an error marker instead of dropping the frame, so
/// consumers observe transport failures in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Payload bytes. May be empty; empty payloads are not forwarded on
    /// channel send paths.
    pub payload: Bytes,
    /// Error marker set by a receive path that failed.
    pub error: Option<String>,
}

impl Message {
    /// Create a message carrying the given payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            error: None,
        }
    }

    /// Create an error-marked message with an empty payload.
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            payload: Bytes::new(),
            error: Some(error.into()),
        }
    }

    /// True when the receive path recorded a transport failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<Vec<u8>> for Message {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<&'static str> for Message {
    fn from(payload: &'static str) -> Self {
        Self::new(Bytes::from_static(payload.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_message() {
        let msg = Message::new(b"hello".to_vec());
        assert_eq!(&msg.payload[..], b"hello");
        assert!(!msg.is_error());
    }

    #[test]
    fn test_error_message() {
        let msg = Message::from_error("recv failed");
        assert!(msg.payload.is_empty());
        assert_eq!(msg.error.as_deref(), Some("recv failed"));
    }
}
