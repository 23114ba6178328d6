use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};

pub const BAUD_RATE: u32 = 115_200;
pub const WINDOW_LEN: usize = 100;
pub const Y_RANGE: (f64, f64) = (0.0, 50.0);
pub const FRAME_PAUSE: Duration = Duration::from_millis(50);
pub const PLOT_SIZE: (u32, u32) = (800, 400);

// How long a single port read may block before the stop flag is checked
// again. A record itself may take arbitrarily long to arrive.
pub const READ_POLL: Duration = Duration::from_millis(100);

pub const USAGE: &str = "<log_file> <serial_port>";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub log_path: PathBuf,
    pub port_name: String,
    pub baud_rate: u32,
    pub read_poll: Duration,
    pub plot_path: PathBuf,
    pub plot_size: (u32, u32),
    pub y_range: (f64, f64),
    pub frame_pause: Duration,
}

impl Config {
    pub fn new(log_path: impl Into<PathBuf>, port_name: impl Into<String>) -> Self {
        let log_path = log_path.into();
        Self {
            plot_path: plot_path_for(&log_path),
            log_path,
            port_name: port_name.into(),
            baud_rate: BAUD_RATE,
            read_poll: READ_POLL,
            plot_size: PLOT_SIZE,
            y_range: Y_RANGE,
            frame_pause: FRAME_PAUSE,
        }
    }

    /// Builds a config from the positional arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let (Some(log_path), Some(port_name), None) = (args.next(), args.next(), args.next())
        else {
            bail!("expected exactly two arguments: {USAGE}");
        };

        Ok(Self::new(log_path, port_name))
    }
}

/// The plot image sits next to the log with a `.png` extension.
pub fn plot_path_for(log_path: &Path) -> PathBuf {
    let plot_path = log_path.with_extension("png");
    if plot_path == log_path {
        log_path.with_extension("plot.png")
    } else {
        plot_path
    }
}
