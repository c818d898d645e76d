// Output module - Frame sinks: WLED controllers over DDP, or nowhere
use anyhow::{anyhow, Result};
use ddp_rs::connection::DDPConnection;
use ddp_rs::protocol::{PixelConfig, ID};
use std::net::UdpSocket;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::WledDeviceConfig;
use crate::types::Rgb;

// WLED DDP timeout is ~1 second, so send keepalive every 500ms to be safe
const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(500);

/// Receives each composed frame in wiring order.
pub trait PixelSink: Send {
    fn send(&mut self, frame: &[Rgb]) -> Result<()>;
}

/// Discards frames; useful for benchmarking and headless tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl PixelSink for NullSink {
    fn send(&mut self, _frame: &[Rgb]) -> Result<()> {
        Ok(())
    }
}

pub fn frame_bytes(frame: &[Rgb]) -> Vec<u8> {
    frame.iter().flat_map(|px| [px.r, px.g, px.b]).collect()
}

pub struct DdpSinkConfig {
    pub devices: Vec<WledDeviceConfig>,
    pub send_parallel: bool,
    pub fail_fast: bool,
}

impl DdpSinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.devices.iter().all(|d| !d.enabled) {
            return Err(anyhow!("No devices configured"));
        }

        // Check for overlapping LED ranges
        let enabled: Vec<&WledDeviceConfig> = self.devices.iter().filter(|d| d.enabled).collect();
        for (i, a) in enabled.iter().enumerate() {
            for b in &enabled[i + 1..] {
                let (a_start, a_end) = (a.led_offset, a.led_offset + a.led_count);
                let (b_start, b_end) = (b.led_offset, b.led_offset + b.led_count);
                if a_start < b_end && a_end > b_start {
                    return Err(anyhow!(
                        "Overlapping LED ranges: Device {} ({}-{}) overlaps with Device {} ({}-{})",
                        a.ip,
                        a_start,
                        a_end.saturating_sub(1),
                        b.ip,
                        b_start,
                        b_end.saturating_sub(1)
                    ));
                }
            }
        }

        Ok(())
    }
}

/// The slice of `frame` (RGB bytes) that belongs to `device`.
fn device_slice<'a>(frame: &'a [u8], device: &WledDeviceConfig) -> Result<&'a [u8]> {
    let byte_offset = device.led_offset * 3;
    let byte_count = device.led_count * 3;
    if byte_offset + byte_count > frame.len() {
        return Err(anyhow!(
            "Device {} range exceeds frame size (device wants LEDs {}-{}, frame has {} LEDs)",
            device.ip,
            device.led_offset,
            (device.led_offset + device.led_count).saturating_sub(1),
            frame.len() / 3
        ));
    }
    Ok(&frame[byte_offset..byte_offset + byte_count])
}

struct DeviceConnection {
    device_config: WledDeviceConfig,
    ddp_connection: Mutex<DDPConnection>,
    last_send_time: Mutex<Instant>,
}

impl DeviceConnection {
    fn new(device_config: WledDeviceConfig) -> Result<Self> {
        let dest_addr = format!("{}:4048", device_config.ip);
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let ddp_connection = DDPConnection::try_new(&dest_addr, PixelConfig::default(), ID::Default, socket)?;

        Ok(DeviceConnection {
            device_config,
            ddp_connection: Mutex::new(ddp_connection),
            last_send_time: Mutex::new(Instant::now()),
        })
    }

    /// Sends this device's share of the frame. Black frames are only sent as
    /// keepalives.
    fn send(&self, frame: &[u8]) -> Result<()> {
        let device_frame = device_slice(frame, &self.device_config)?;
        let ip = &self.device_config.ip;

        let needs_keepalive = self
            .last_send_time
            .lock()
            .map(|last| last.elapsed() >= KEEPALIVE_INTERVAL)
            .unwrap_or(false);
        if device_frame.iter().all(|&b| b == 0) && !needs_keepalive {
            return Ok(());
        }

        let mut conn = self
            .ddp_connection
            .lock()
            .map_err(|_| anyhow!("Failed to acquire lock for device {}", ip))?;
        conn.write(device_frame).map_err(|e| anyhow!("Failed to send to {}: {}", ip, e))?;
        if let Ok(mut last) = self.last_send_time.lock() {
            *last = Instant::now();
        }
        Ok(())
    }
}

/// Splits each frame across one or more WLED controllers.
pub struct DdpSink {
    devices: Vec<DeviceConnection>,
    config: DdpSinkConfig,
}

impl DdpSink {
    pub fn new(config: DdpSinkConfig) -> Result<Self> {
        config.validate()?;

        let mut devices = Vec::new();
        for device_config in config.devices.iter().filter(|d| d.enabled) {
            match DeviceConnection::new(device_config.clone()) {
                Ok(conn) => {
                    debug!(ip = %device_config.ip, "WLED device connected");
                    devices.push(conn);
                }
                Err(e) => warn!("Failed to connect to {}: {}", device_config.ip, e),
            }
        }

        if devices.is_empty() {
            return Err(anyhow!("No devices connected successfully"));
        }

        Ok(DdpSink { devices, config })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn send_parallel(&self, frame: &[u8]) -> Vec<String> {
        let errors = Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for device in &self.devices {
                let errors = &errors;
                s.spawn(move || {
                    if let Err(e) = device.send(frame) {
                        if let Ok(mut errors) = errors.lock() {
                            errors.push(e.to_string());
                        }
                    }
                });
            }
        });
        errors.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send_sequential(&self, frame: &[u8]) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        for device in &self.devices {
            if let Err(e) = device.send(frame) {
                if self.config.fail_fast {
                    return Err(e);
                }
                errors.push(e.to_string());
            }
        }
        Ok(errors)
    }
}

impl PixelSink for DdpSink {
    fn send(&mut self, frame: &[Rgb]) -> Result<()> {
        let bytes = frame_bytes(frame);
        let errors = if self.config.send_parallel {
            self.send_parallel(&bytes)
        } else {
            self.send_sequential(&bytes)?
        };
        for err in &errors {
            warn!("{}", err);
        }
        if self.config.fail_fast && !errors.is_empty() {
            return Err(anyhow!("{} device(s) failed", errors.len()));
        }
        Ok(())
    }
}
