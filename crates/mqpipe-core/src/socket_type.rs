//! Socket type enumeration for message-queue sockets.
//!
//! Each driver ("zeromq", "nanomsg", ...) may support a different subset of
//! these types; unsupported types fail at socket creation with a clear error.

use std::fmt;

/// Message-queue socket types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// SUB socket for subscribing to published messages
    Sub,
    /// PUB socket for publishing messages to subscribers
    Pub,
    /// XSUB socket for extended subscribers with dynamic subscriptions
    XSub,
    /// XPUB socket for extended publishers with subscription awareness
    XPub,
    /// PUSH socket for distributing messages to pullers
    Push,
    /// PULL socket for receiving messages from pushers
    Pull,
    /// REQ socket for synchronous request-reply clients
    Req,
    /// REP socket for synchronous request-reply servers
    Rep,
    /// DEALER socket for asynchronous request-reply patterns
    Dealer,
    /// ROUTER socket for routing replies by identity
    Router,
    /// PAIR socket for exclusive bidirectional communication
    Pair,
    /// BUS socket for many-to-many broadcast
    Bus,
}

/// All socket types, in declaration order.
pub const ALL_SOCKET_TYPES: [SocketType; 12] = [
    SocketType::Sub,
    SocketType::Pub,
    SocketType::XSub,
    SocketType::XPub,
    SocketType::Push,
    SocketType::Pull,
    SocketType::Req,
    SocketType::Rep,
    SocketType::Dealer,
    SocketType::Router,
    SocketType::Pair,
    SocketType::Bus,
];

impl SocketType {
    /// The canonical lowercase name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Pub => "pub",
            Self::XSub => "xsub",
            Self::XPub => "xpub",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Req => "req",
            Self::Rep => "rep",
            Self::Dealer => "dealer",
            Self::Router => "router",
            Self::Pair => "pair",
            Self::Bus => "bus",
        }
    }

    /// Parse a socket type from its configuration name, case-insensitively.
    ///
    /// # Panics
    ///
    /// Panics on an unknown name. Socket-type names reach this point from a
    /// validated configuration, so an unknown name is a programmer error, not
    /// a runtime condition.
    pub fn from_name(name: &str) -> SocketType {
        match name.to_ascii_lowercase().as_str() {
            "sub" => Self::Sub,
            "pub" => Self::Pub,
            "xsub" => Self::XSub,
            "xpub" => Self::XPub,
            "push" => Self::Push,
            "pull" => Self::Pull,
            "req" => Self::Req,
            "rep" => Self::Rep,
            "dealer" => Self::Dealer,
            "router" => Self::Router,
            "pair" => Self::Pair,
            "bus" => Self::Bus,
            _ => panic!("mqpipe: invalid socket type name (value={name:?})"),
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for typ in ALL_SOCKET_TYPES {
            assert_eq!(SocketType::from_name(typ.as_str()), typ);
            assert_eq!(typ.to_string(), typ.as_str());
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(SocketType::from_name("PUSH"), SocketType::Push);
        assert_eq!(SocketType::from_name("XPub"), SocketType::XPub);
    }

    #[test]
    #[should_panic(expected = "invalid socket type name")]
    fn test_unknown_name_panics() {
        SocketType::from_name("not-a-socket");
    }
}
