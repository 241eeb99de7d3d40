//! LAN discovery of MDC displays.
//!
//! Probes every address of an IPv4 range on the MDC port with a display-id-1
//! health check and keeps the addresses that answered.  Probes run
//! concurrently, at most `max_concurrency` at a time.

use std::net::Ipv4Addr;
use std::sync::Arc;

use mdc_core::DisplayId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::application::display_control::DisplayController;
use crate::infrastructure::network::session::{
    Connector, DeviceSession, SessionConfig, TcpConnector, DEFAULT_MDC_PORT,
};

/// Display id used for probing; displays answer on id 1 out of the box.
pub const PROBE_DISPLAY_ID: DisplayId = 1;

/// Errors from discovery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The range string is not `a.b.c.d` or `a.b.c.x-y`.
    #[error("invalid IP range {0:?}: expected a.b.c.d or a.b.c.x-y")]
    InvalidRange(String),
}

/// A display that answered the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDisplay {
    pub address: Ipv4Addr,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub temperature: Option<u8>,
}

/// How discovery probes the range.
#[derive(Clone)]
pub struct DiscoveryOptions {
    pub port: u16,
    pub session: SessionConfig,
    pub max_concurrency: usize,
    pub connector: Arc<dyn Connector>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_MDC_PORT,
            session: SessionConfig::default(),
            max_concurrency: 32,
            connector: Arc::new(TcpConnector),
        }
    }
}

/// Expands `"a.b.c.d"` or `"a.b.c.x-y"` into the addresses it covers.
///
/// # Errors
///
/// [`DiscoveryError::InvalidRange`] for malformed octets or `x > y`.
///
/// # Examples
///
/// ```rust
/// use mdc_controller::infrastructure::network::discovery::parse_ip_range;
///
/// let ips = parse_ip_range("192.168.1.10-12").unwrap();
/// assert_eq!(ips.len(), 3);
/// assert_eq!(ips[2].to_string(), "192.168.1.12");
/// ```
pub fn parse_ip_range(range: &str) -> Result<Vec<Ipv4Addr>, DiscoveryError> {
    let invalid = || DiscoveryError::InvalidRange(range.to_string());
    let range = range.trim();

    let (base, last) = range.rsplit_once('.').ok_or_else(invalid)?;
    let prefix: Vec<u8> = base
        .split('.')
        .map(|octet| octet.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    let &[a, b, c] = prefix.as_slice() else {
        return Err(invalid());
    };

    let (start, end) = match last.split_once('-') {
        Some((start, end)) => (start.trim(), end.trim()),
        None => (last, last),
    };
    let start: u8 = start.parse().map_err(|_| invalid())?;
    let end: u8 = end.parse().map_err(|_| invalid())?;
    if start > end {
        return Err(invalid());
    }

    Ok((start..=end).map(|d| Ipv4Addr::new(a, b, c, d)).collect())
}

/// Probes every address in `range` and returns the responsive displays,
/// sorted by address.
///
/// # Errors
///
/// [`DiscoveryError::InvalidRange`] if `range` cannot be parsed.  Unreachable
/// addresses are not errors; they are simply left out.
pub async fn discover_displays(
    range: &str,
    options: &DiscoveryOptions,
) -> Result<Vec<DiscoveredDisplay>, DiscoveryError> {
    let addresses = parse_ip_range(range)?;
    info!(range, addresses = addresses.len(), "starting display discovery");

    let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for address in addresses {
        let permits = Arc::clone(&permits);
        let options = options.clone();
        tasks.spawn(async move {
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok()?;
            probe(address, &options).await
        });
    }

    let mut found = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(display)) => found.push(display),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "discovery probe task failed"),
        }
    }

    found.sort_by_key(|d| d.address);
    info!(found = found.len(), "discovery finished");
    Ok(found)
}

async fn probe(address: Ipv4Addr, options: &DiscoveryOptions) -> Option<DiscoveredDisplay> {
    let controller = DisplayController::new(DeviceSession::new(
        PROBE_DISPLAY_ID,
        address.to_string(),
        options.port,
        options.session,
        Arc::clone(&options.connector),
    ));

    let record = controller.health_check().await;
    controller.disconnect().await;

    if !record.responsive {
        debug!(%address, "no display answered");
        return None;
    }
    info!(%address, model = ?record.model, "found display");
    Some(DiscoveredDisplay {
        address,
        model: record.model,
        serial_number: record.serial_number,
        temperature: record.temperature,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
