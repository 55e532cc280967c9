//! Connection policy: the IP allow-list.
//!
//! Fail-closed. A candidate is only accepted when the console is up, the
//! allow-list variable is registered and one of its entries resolves to the
//! candidate's IP.

use std::net::SocketAddr;

use tokio::net::lookup_host;
use tracing::{debug, info, warn};

use crate::config::{ALLOWED_ADDRESSES_CVAR, DEFAULT_ALLOWED_ADDRESS};
use crate::console::Console;

/// Decide whether `candidate` may open a remote console session.
///
/// Each allow-list entry is resolved with the candidate's port, so only the
/// address takes part in the comparison.
pub async fn is_remote_allowed_to_connect(
    console: Option<&dyn Console>,
    candidate: SocketAddr,
) -> bool {
    let Some(console) = console else {
        warn!(%candidate, "Remote console connection rejected: console not available");
        return false;
    };

    let Some(list) = console.get_string(ALLOWED_ADDRESSES_CVAR) else {
        warn!(
            %candidate,
            "Remote console connection rejected: {} is not registered",
            ALLOWED_ADDRESSES_CVAR
        );
        return false;
    };

    let list = if list.trim().is_empty() {
        DEFAULT_ALLOWED_ADDRESS.to_string()
    } else {
        list
    };

    let candidate_ip = candidate.ip().to_canonical();

    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let resolved = match lookup_host((entry, candidate.port())).await {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(entry, error = %e, "Could not resolve allow-list entry");
                continue;
            }
        };

        if resolved
            .map(|addr| addr.ip().to_canonical())
            .any(|ip| ip == candidate_ip)
        {
            info!(%candidate, entry, "Remote console connection accepted");
            return true;
        }
    }

    warn!(%candidate, "Remote console connection rejected: address not in allow-list");
    info!(
        "To allow this address, add it to {} (comma-separated, e.g. \"127.0.0.1,192.168.0.10\")",
        ALLOWED_ADDRESSES_CVAR
    );
    false
}
