//! Port availability probe.

use std::net::{SocketAddr, TcpListener};

/// Try to bind `addr` and release it at once. `false` means the port is in use
/// (or otherwise not bindable).
pub fn is_available(addr: SocketAddr) -> bool {
    match TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) => {
            tracing::debug!(%addr, error = %e, "probe bind failed");
            false
        }
    }
}
