//! mDNS discovery of gantry control servers.
//!
//! Browses `_http._tcp.local.` for a fixed window and keeps resolved
//! services whose instance name contains the configured marker. The
//! device name comes from the `gantry` TXT property, falling back to the
//! instance name. Deduplicated by device name; first resolution wins.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, info};

use gantry_core::DeviceRecord;

use crate::error::CliError;

/// Service type gantry firmware registers under.
pub const SERVICE_TYPE: &str = "_http._tcp.local.";

/// TXT property carrying the device name.
const NAME_PROPERTY: &str = "gantry";

/// Browse the local network for gantry control servers.
///
/// Blocking: runs until `window` elapses. Call from a blocking-friendly
/// context.
pub fn browse(marker: &str, window: Duration) -> Result<Vec<DeviceRecord>, CliError> {
    let daemon = ServiceDaemon::new().map_err(|e| CliError::Discovery {
        message: format!("failed to start mDNS daemon: {e}"),
    })?;
    let receiver = daemon.browse(SERVICE_TYPE).map_err(|e| CliError::Discovery {
        message: format!("failed to browse {SERVICE_TYPE}: {e}"),
    })?;

    info!(service_type = SERVICE_TYPE, marker, "browsing for gantries");

    let deadline = Instant::now() + window;
    let mut found: BTreeMap<String, DeviceRecord> = BTreeMap::new();

    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let Ok(event) = receiver.recv_timeout(remaining) else {
            break;
        };
        if let ServiceEvent::ServiceResolved(service) = event {
            if let Some(record) = record_from_service(&service, marker) {
                info!(
                    device = %record.name,
                    address = %record.address,
                    port = record.port,
                    "gantry resolved"
                );
                found.entry(record.name.clone()).or_insert(record);
            }
        }
    }

    let _ = daemon.stop_browse(SERVICE_TYPE);
    let _ = daemon.shutdown();

    Ok(found.into_values().collect())
}

/// Turn a resolved service into a device record, if it is a gantry.
fn record_from_service(service: &ServiceInfo, marker: &str) -> Option<DeviceRecord> {
    let fullname = service.get_fullname();
    if !fullname.to_lowercase().contains(marker) {
        debug!(service = fullname, "ignoring non-gantry service");
        return None;
    }

    let name = service
        .get_properties()
        .get_property_val_str(NAME_PROPERTY)
        .map(str::to_owned)
        .or_else(|| instance_name(fullname).map(str::to_owned))?;

    // Prefer an IPv4 address; the firmware only binds v4.
    let addresses = service.get_addresses();
    let address = addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.iter().next())?;

    Some(DeviceRecord::new(name, address.to_string(), service.get_port()))
}

/// Instance portion of an mDNS fullname
/// (`gantry-arm1._http._tcp.local.` -> `gantry-arm1`).
fn instance_name(fullname: &str) -> Option<&str> {
    fullname.split('.').next().filter(|s| !s.is_empty())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_is_well_formed() {
        assert!(SERVICE_TYPE.starts_with('_'));
        assert!(SERVICE_TYPE.ends_with(".local."));
        assert!(SERVICE_TYPE.contains("._tcp."));
    }

    #[test]
    fn instance_name_strips_service_suffix() {
        assert_eq!(
            instance_name("gantry-arm1._http._tcp.local."),
            Some("gantry-arm1")
        );
        assert_eq!(instance_name(""), None);
    }
}
