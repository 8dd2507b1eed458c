//! Endpoint address handling shared by the drivers.
//!
//! Addresses are scheme-prefixed: `tcp://HOST:PORT`, `ipc://PATH`,
//! `inproc://NAME`. Listeners accept the FairMQ wildcard forms; connectors
//! always receive the literal address.

/// Rewrite a listener address into a bindable one.
///
/// `tcp://*:PORT` binds every interface, so the wildcard host becomes
/// `0.0.0.0`; a `*` port becomes `0`, letting the OS pick.
pub fn listen_addr(addr: &str) -> String {
    let addr = addr.replacen("//*:", "//0.0.0.0:", 1);
    match addr.strip_suffix(":*") {
        Some(prefix) => format!("{prefix}:0"),
        None => addr,
    }
}

/// The filesystem path of an `ipc://` address, if it is one.
pub fn ipc_path(addr: &str) -> Option<&str> {
    addr.strip_prefix("ipc://")
}

/// Remove a stale socket file left behind by a previous listener.
///
/// A missing file is not an error; anything else is left for the bind call
/// to report.
pub fn unlink_ipc(addr: &str) {
    if let Some(path) = ipc_path(addr) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_host() {
        assert_eq!(listen_addr("tcp://*:5555"), "tcp://0.0.0.0:5555");
    }

    #[test]
    fn test_wildcard_port() {
        assert_eq!(listen_addr("tcp://*:*"), "tcp://0.0.0.0:0");
        assert_eq!(listen_addr("tcp://localhost:*"), "tcp://localhost:0");
    }

    #[test]
    fn test_literal_addresses_unchanged() {
        assert_eq!(listen_addr("tcp://127.0.0.1:7777"), "tcp://127.0.0.1:7777");
        assert_eq!(listen_addr("ipc:///tmp/mqpipe.sock"), "ipc:///tmp/mqpipe.sock");
        assert_eq!(listen_addr("inproc://pipeline"), "inproc://pipeline");
    }

    #[test]
    fn test_ipc_path() {
        assert_eq!(ipc_path("ipc:///tmp/a.sock"), Some("/tmp/a.sock"));
        assert_eq!(ipc_path("tcp://*:1"), None);
    }
}
