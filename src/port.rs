use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::config::Config;

/// Buffered line reader over an open serial port.
pub struct SensorPort {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SensorPort {
    pub fn open(config: &Config) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_poll)
            .open()
            .with_context(|| format!("failed to open serial port {}", config.port_name))?;

        info!(
            "opened serial port {} at {} baud",
            config.port_name, config.baud_rate
        );

        Ok(Self {
            name: config.port_name.clone(),
            reader: BufReader::new(port),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Read for SensorPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for SensorPort {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl Drop for SensorPort {
    fn drop(&mut self) {
        if let Err(e) = self.reader.get_mut().flush() {
            debug!("flush of {} on close failed: {e}", self.name);
        }
        info!("closed serial port {}", self.name);
    }
}

/// Reads one newline-terminated record into `buf`, terminator included.
///
/// Read timeouts only mean no bytes arrived yet; partial data stays in
/// `buf` and reading resumes. Returns `None` at end of stream or once
/// `stop` is set.
pub fn read_record<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    stop: &AtomicBool,
) -> io::Result<Option<usize>> {
    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(None);
        }

        match reader.read_until(b'\n', buf) {
            Ok(0) if buf.is_empty() => return Ok(None),
            Ok(_) => return Ok(Some(buf.len())),
            Err(ref e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                continue
            }
            Err(e) => return Err(e),
        }
    }
}
