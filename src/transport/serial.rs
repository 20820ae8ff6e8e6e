//! Serial transport for SLCAN (Lawicel) USB-CAN adapters
//!
//! Uses blocking threads for low-latency I/O:
//! - Reader thread: reads from serial port, decodes SLCAN lines, queues frames
//! - Writer thread: takes frames from the outgoing queue, writes SLCAN lines
//!
//! The controller side only touches the two bounded queues, so
//! `try_send`/`try_receive` never block. The threads stop when:
//! - the transport is dropped
//! - the serial port disconnects (detected via consecutive empty reads)
//! - a write error occurs

use super::Transport;
use crate::codec::{slcan, Codec, SlcanCodec};
use crate::constants::{CHANNEL_CAPACITY, SERIAL_BUFFER_SIZE, SERIAL_DISCONNECT_THRESHOLD};
use crate::error::{TrackError, Result};
use crate::protocol::CanFrame;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Serial transport for SLCAN adapters
///
/// # Example
///
/// ```ignore
/// let mut transport = SerialTransport::open("/dev/ttyACM0", 115_200)?;
/// transport.try_send(&frame);
/// while let Some(frame) = transport.try_receive() { /* ... */ }
/// ```
pub struct SerialTransport {
    port_name: String,
    rx: mpsc::Receiver<CanFrame>,
    tx: mpsc::Sender<CanFrame>,
    shutdown: Arc<AtomicBool>,
}

impl SerialTransport {
    /// Open the port, configure the adapter for 250 kbit/s and start I/O threads
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let map_err = |e: serialport::Error| TrackError::SerialOpen {
            port: port_name.to_string(),
            source: std::io::Error::other(e.to_string()),
        };

        let mut port_write = serialport::new(port_name, baud_rate)
            .timeout(std::time::Duration::from_millis(10))
            .open()
            .map_err(map_err)?;
        let port_read = port_write.try_clone().map_err(map_err)?;

        for command in slcan::SETUP_COMMANDS {
            port_write
                .write_all(command)
                .map_err(|e| TrackError::SerialOpen {
                    port: port_name.to_string(),
                    source: e,
                })?;
        }

        let (in_tx, in_rx) = mpsc::channel::<CanFrame>(CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<CanFrame>(CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));

        // Reader thread (blocking)
        let shutdown_reader = shutdown.clone();
        let reader_name = port_name.to_string();
        std::thread::spawn(move || {
            let mut port = port_read;
            let mut codec = SlcanCodec::new();
            let mut buf = [0u8; SERIAL_BUFFER_SIZE];
            let mut consecutive_errors = 0u32;

            while !shutdown_reader.load(Ordering::Relaxed) {
                match port.read(&mut buf) {
                    Ok(n) if n > 0 => {
                        consecutive_errors = 0;
                        let mut closed = false;
                        codec.decode(&buf[..n], |frame| {
                            if in_tx.blocking_send(frame).is_err() {
                                closed = true;
                            }
                        });
                        if closed {
                            break;
                        }
                    }
                    Ok(_) => {
                        consecutive_errors += 1;
                        if consecutive_errors > SERIAL_DISCONNECT_THRESHOLD {
                            warn!("Serial port {} stopped responding", reader_name);
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        consecutive_errors = 0;
                    }
                    Err(e) => {
                        warn!("Serial read error on {}: {}", reader_name, e);
                        break;
                    }
                }
            }
            debug!("Serial reader for {} stopped", reader_name);
        });

        // Writer thread (blocking)
        let writer_name = port_name.to_string();
        std::thread::spawn(move || {
            let mut port = port_write;
            let codec = SlcanCodec::new();
            let mut line = Vec::with_capacity(32);

            // Ends when the transport drops its sender
            while let Some(frame) = out_rx.blocking_recv() {
                line.clear();
                codec.encode(&frame, &mut line);
                if let Err(e) = port.write_all(&line) {
                    warn!("Serial write error on {}: {}", writer_name, e);
                    break;
                }
            }
            debug!("Serial writer for {} stopped", writer_name);
        });

        Ok(Self {
            port_name: port_name.to_string(),
            rx: in_rx,
            tx: out_tx,
            shutdown,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Transport for SerialTransport {
    fn try_send(&mut self, frame: &CanFrame) -> bool {
        self.tx.try_send(*frame).is_ok()
    }

    fn try_receive(&mut self) -> Option<CanFrame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
