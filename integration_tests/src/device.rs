//! Receiver serial client.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::Result;
use lora_tracker::protocol::{decode_report, ReceivedReading};
use serialport::SerialPort;

/// Find a single receiver port. Returns error if none found.
///
/// The receiver only talks when a reading arrives, so ports cannot be
/// probed; the first CDC-ACM device wins.
pub fn find_data_port() -> Result<String> {
    let ports = serialport::available_ports()?;
    match ports.into_iter().find(|p| p.port_name.contains("ttyACM")) {
        Some(port) => Ok(port.port_name),
        None => anyhow::bail!("No receiver port found - ensure device is connected"),
    }
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str) -> Result<String> {
    if port_arg == "auto" {
        find_data_port()
    } else {
        Ok(port_arg.to_string())
    }
}

/// Time left before `timeout`, zero once it has passed.
fn remaining(timeout: Duration, elapsed: Duration) -> Duration {
    timeout.saturating_sub(elapsed)
}

/// Client reading uplink reports from the receiver.
pub struct ReceiverClient {
    port: Box<dyn SerialPort>,
}

impl ReceiverClient {
    /// Open the receiver port.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(200))
            .open()?;

        Ok(Self { port })
    }

    /// Clear any pending data in the serial buffer.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }

    /// Wait for the next decodable reading.
    ///
    /// Frames that fail to decode (log noise, a partial frame after
    /// connecting) are skipped.
    pub fn next_reading(&mut self, timeout: Duration) -> Result<ReceivedReading> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            let Some(mut frame) = self.read_frame(remaining(timeout, start.elapsed()))? else {
                break;
            };

            // corncobs expects the zero delimiter
            frame.push(0x00);
            match decode_report(&frame) {
                Ok(reading) => return Ok(reading),
                Err(e) => println!("    (skipping frame: {})", e),
            }
        }

        anyhow::bail!("Timeout waiting for reading after {:?}", timeout)
    }

    /// Read bytes until zero delimiter. None on timeout.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1];
        let start = Instant::now();

        while start.elapsed() < timeout {
            match self.port.read(&mut buf) {
                Ok(1) => {
                    if buf[0] == 0x00 {
                        if !data.is_empty() {
                            return Ok(Some(data));
                        }
                    } else {
                        data.push(buf[0]);
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_before_deadline() {
        let left = remaining(Duration::from_secs(5), Duration::from_secs(2));
        assert_eq!(left, Duration::from_secs(3));
    }

    #[test]
    fn test_remaining_past_deadline_is_zero() {
        let left = remaining(Duration::from_millis(100), Duration::from_millis(101));
        assert_eq!(left, Duration::ZERO);
    }
}
