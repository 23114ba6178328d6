use std::env;
use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use heapless::String;
use log::{debug, info};

use serial_plot::config::BAUD_RATE;
use serial_plot::fake::{FakeSensor, MAX_LINE_LENGTH};

// One record per tenth of a second of device time.
const RECORD_PERIOD: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let Some(port_name) = args.next() else {
        bail!("usage: fake_sensor <serial_port> [count]");
    };
    let count = args
        .next()
        .map(|count| count.parse::<usize>())
        .transpose()
        .context("count must be a whole number")?;

    let mut port = serialport::new(&port_name, BAUD_RATE)
        .timeout(Duration::from_millis(100))
        .open()
        .with_context(|| format!("failed to open serial port {port_name}"))?;
    info!("writing fake records to {port_name} at {BAUD_RATE} baud");

    let sensor = FakeSensor::new(1);
    let lines: Box<dyn Iterator<Item = String<MAX_LINE_LENGTH>>> = match count {
        Some(count) => Box::new(sensor.take(count)),
        None => Box::new(sensor),
    };

    for line in lines {
        port.write_all(line.as_bytes()).context("failed to write record")?;
        port.flush().context("failed to flush port")?;
        debug!("sent {}", line.trim_end());
        thread::sleep(RECORD_PERIOD);
    }

    Ok(())
}
