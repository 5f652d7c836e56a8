use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Whether this instance is in the foreground and may raise notifications.
pub trait Visibility: Send + Sync {
    fn is_active(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysVisible;

impl Visibility for AlwaysVisible {
    fn is_active(&self) -> bool {
        true
    }
}

/// Visibility as reported by connected browser tabs.
///
/// Active when no browser is connected, or when at least one connected
/// client last reported itself visible.
#[derive(Debug, Default)]
pub struct BrowserVisibility {
    clients: Mutex<HashMap<SocketAddr, bool>>,
}

impl BrowserVisibility {
    pub fn set_client(&self, peer: SocketAddr, visible: bool) {
        match self.clients.lock() {
            Ok(mut clients) => {
                clients.insert(peer, visible);
                debug!(%peer, visible, "client visibility updated");
            }
            Err(e) => warn!(error = %e, "visibility lock poisoned"),
        }
    }

    pub fn remove_client(&self, peer: SocketAddr) {
        if let Ok(mut clients) = self.clients.lock() {
            clients.remove(&peer);
        }
    }
}

impl Visibility for BrowserVisibility {
    fn is_active(&self) -> bool {
        match self.clients.lock() {
            Ok(clients) => clients.is_empty() || clients.values().any(|visible| *visible),
            // Poisoned: fall back to the no-client behaviour.
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_no_clients_is_active() {
        assert!(BrowserVisibility::default().is_active());
        assert!(AlwaysVisible.is_active());
    }

    #[test]
    fn test_any_visible_client_is_active() {
        let visibility = BrowserVisibility::default();
        visibility.set_client(peer(1), false);
        assert!(!visibility.is_active());

        visibility.set_client(peer(2), true);
        assert!(visibility.is_active());

        visibility.set_client(peer(2), false);
        assert!(!visibility.is_active());
    }

    #[test]
    fn test_disconnect_forgets_client() {
        let visibility = BrowserVisibility::default();
        visibility.set_client(peer(1), false);
        visibility.remove_client(peer(1));
        assert!(visibility.is_active());
    }
}
