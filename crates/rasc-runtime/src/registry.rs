use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::device::{build_sysinfo_request, classify_sysinfo, DeviceKind};
use crate::error::ProbeError;
use crate::pool::DeviceConnection;
use crate::wire::WireMode;

struct RegisteredDevice {
    kind: DeviceKind,
    connection: Mutex<DeviceConnection>,
    sysinfo: Value,
}

/// A device found and classified by [`DeviceRegistry::register_device`].
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    pub entity_id: String,
    pub kind: DeviceKind,
    pub addr: SocketAddr,
    pub sysinfo: Value,
}

/// Tracks every device this runtime probes: its kind (for command/state
/// request shapes) and its pooled connection.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, RegisteredDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self { devices: HashMap::new() }
    }

    pub fn register(&mut self, entity_id: impl Into<String>, kind: DeviceKind, addr: SocketAddr, mode: WireMode) {
        let entity_id = entity_id.into();
        let connection = Mutex::new(DeviceConnection::new(entity_id.clone(), addr, mode));
        self.devices.insert(entity_id, RegisteredDevice { kind, connection, sysinfo: Value::Null });
    }

    /// Discovers and registers a device by sequentially probing each port
    /// in `port_range` on `host` with `{"system":{"get_sysinfo":null}}`
    /// until one answers, classifying the response's `type` field into a
    /// [`DeviceKind`] and stashing the full sysinfo payload against the
    /// registered entity.
    ///
    /// A port that refuses the connection or times out is skipped in favor
    /// of the next one; a port that answers but reports a `type` this
    /// runtime doesn't recognize fails the whole discovery immediately
    /// rather than silently moving on, since an unclassifiable device found
    /// on the expected host is a configuration problem, not a missing one.
    pub async fn register_device(
        &mut self,
        entity_id: impl Into<String>,
        host: &str,
        port_range: RangeInclusive<u16>,
        mode: WireMode,
        timeout: Duration,
    ) -> Result<DeviceHandle, ProbeError> {
        let entity_id = entity_id.into();
        let start_port = *port_range.start();
        let end_port = *port_range.end();

        for port in port_range {
            let addr: SocketAddr = match format!("{host}:{port}").parse() {
                Ok(addr) => addr,
                Err(_) => continue,
            };
            let mut conn = DeviceConnection::new(entity_id.clone(), addr, mode);
            let sysinfo = match conn.request(&build_sysinfo_request(), timeout).await {
                Ok(response) => response,
                Err(_) => continue,
            };

            let kind = classify_sysinfo(&sysinfo).ok_or_else(|| {
                let device_type = sysinfo
                    .get("system")
                    .and_then(|s| s.get("get_sysinfo"))
                    .and_then(|si| si.get("type"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                ProbeError::DeviceTypeUnknown { addr, device_type }
            })?;

            self.devices
                .insert(entity_id.clone(), RegisteredDevice { kind, connection: Mutex::new(conn), sysinfo: sysinfo.clone() });
            return Ok(DeviceHandle { entity_id, kind, addr, sysinfo });
        }

        Err(ProbeError::NoDeviceFoundInRange { host: host.to_string(), start_port, end_port })
    }

    pub fn kind_of(&self, entity_id: &str) -> Option<DeviceKind> {
        self.devices.get(entity_id).map(|d| d.kind)
    }

    pub fn sysinfo_of(&self, entity_id: &str) -> Option<&Value> {
        self.devices.get(entity_id).map(|d| &d.sysinfo)
    }

    pub fn is_registered(&self, entity_id: &str) -> bool {
        self.devices.contains_key(entity_id)
    }

    /// Runs `f` against the pooled connection for `entity_id`, serializing
    /// access to that device's connection without blocking probes to other
    /// devices.
    pub async fn with_connection<F, Fut, T>(&self, entity_id: &str, f: F) -> Result<T, ProbeError>
    where
        F: FnOnce(&mut DeviceConnection) -> Fut,
        Fut: Future<Output = Result<T, ProbeError>>,
    {
        let device = self
            .devices
            .get(entity_id)
            .ok_or_else(|| ProbeError::UnknownDevice(entity_id.to_string()))?;
        let mut conn = device.connection.lock().await;
        f(&mut conn).await
    }
}
