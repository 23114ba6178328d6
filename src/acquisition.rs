use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::chart::Chart;
use crate::config::{WINDOW_LEN, Y_RANGE};
use crate::port::read_record;
use crate::{Error, Record, RollingWindow};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    Accepted { echoed: bool },
    Skipped(Error),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub accepted: u64,
    pub skipped: u64,
    /// The loop ended because a stop was requested rather than end of input.
    pub interrupted: bool,
    pub last_line: Option<String>,
}

impl Summary {
    /// After an interrupt, repeats the last raw line received and says
    /// goodbye. Prints nothing when the input simply ended.
    pub fn write_farewell<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if !self.interrupted {
            return Ok(());
        }
        if let Some(line) = &self.last_line {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "exiting")
    }
}

/// The read, log and plot loop.
///
/// Owns the record source, the log sink, the console and the chart; all of
/// them are flushed and released when [`Acquisition::run`] returns, whether
/// it returns an error or not.
pub struct Acquisition<R, L, C, P> {
    source: R,
    log: L,
    console: C,
    chart: P,
    window: RollingWindow<WINDOW_LEN>,
    y_range: (f64, f64),
    accepted: u64,
    skipped: u64,
    last_line: Option<String>,
    sign_warned: bool,
}

impl<R, L, C, P> Acquisition<R, L, C, P>
where
    R: BufRead,
    L: Write,
    C: Write,
    P: Chart,
{
    pub fn new(source: R, log: L, console: C, chart: P) -> Self {
        Self {
            source,
            log,
            console,
            chart,
            window: RollingWindow::new(),
            y_range: Y_RANGE,
            accepted: 0,
            skipped: 0,
            last_line: None,
            sign_warned: false,
        }
    }

    pub fn with_y_range(mut self, (lo, hi): (f64, f64)) -> Self {
        self.y_range = (lo, hi);
        self
    }

    /// Handles one raw line. Malformed lines are skipped without touching
    /// the log; only sink and chart failures are errors.
    pub fn process_line(&mut self, line: &str) -> Result<Step> {
        let record = match Record::parse(line) {
            Ok(record) => record,
            Err(e) => {
                self.skipped += 1;
                warn!("skipping malformed record ({e}): {line:?}");
                return Ok(Step::Skipped(e));
            }
        };

        if record.sign_dropped && !self.sign_warned {
            warn!("minus sign in front of a numeric field; readings are logged unsigned");
            self.sign_warned = true;
        }

        let sample = record.sample(self.accepted);

        // Format first so a record is written whole or not at all.
        let entry = format!("{sample}\n");
        self.log
            .write_all(entry.as_bytes())
            .context("failed to write log file")?;

        let echoed = record.echoes();
        if echoed {
            writeln!(self.console, "{}", sample.echo()).context("failed to write console")?;
        }
        debug!("record {}: {sample}", self.accepted);

        self.window.push(record.channels[0].value());
        self.redraw()?;

        self.accepted += 1;
        Ok(Step::Accepted { echoed })
    }

    fn redraw(&mut self) -> Result<()> {
        let (lo, hi) = self.y_range;
        self.chart.clear();
        self.chart.set_y_range(lo, hi);
        self.chart.plot(&self.window.to_array());
        self.chart.render_and_yield()
    }

    fn acquire(&mut self, stop: &AtomicBool) -> Result<bool> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if read_record(&mut self.source, &mut buf, stop)
                .context("failed to read from serial port")?
                .is_none()
            {
                return Ok(stop.load(Ordering::SeqCst));
            }

            let raw = String::from_utf8_lossy(&buf);
            let line = raw.trim_end_matches(|c: char| c == '\r' || c == '\n');
            self.last_line = Some(line.to_owned());
            self.process_line(line)?;

            if !self.chart.is_open() {
                info!("plot window closed");
                return Ok(true);
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        let log = self.log.flush().context("failed to flush log file");
        let console = self.console.flush().context("failed to flush console");
        info!(
            "acquisition stopped: {} records logged, {} skipped",
            self.accepted, self.skipped
        );
        log.and(console)
    }

    /// Runs until `stop` is set, the chart is closed or the source ends.
    pub fn run(mut self, stop: &AtomicBool) -> Result<Summary> {
        let outcome = self.acquire(stop);
        let closed = self.close();
        let interrupted = outcome?;
        closed?;

        Ok(Summary {
            accepted: self.accepted,
            skipped: self.skipped,
            interrupted,
            last_line: self.last_line.take(),
        })
    }
}
