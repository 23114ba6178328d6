use std::env;
use std::fs::File;
use std::io::{stdout, BufWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use serial_plot::acquisition::Acquisition;
use serial_plot::chart::{Chart, PngChart};
use serial_plot::config::Config;
use serial_plot::port::SensorPort;

fn png_chart(config: &Config) -> Box<dyn Chart> {
    let chart = PngChart::new(config);
    info!("plotting to {}", chart.path().display());
    Box::new(chart)
}

#[cfg(feature = "window")]
fn open_chart(config: &Config) -> Box<dyn Chart> {
    let title = format!("serial-plot: {}", config.port_name);
    match serial_plot::chart::WindowChart::open(config, &title) {
        Ok(chart) => Box::new(chart),
        Err(e) => {
            log::warn!("{e:#}, falling back to a PNG chart");
            png_chart(config)
        }
    }
}

#[cfg(not(feature = "window"))]
fn open_chart(config: &Config) -> Box<dyn Chart> {
    png_chart(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args(env::args().skip(1))?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))
        .context("failed to install interrupt handler")?;

    let port = SensorPort::open(&config)?;
    println!("connected to: {}", port.name());

    let log_file = File::create(&config.log_path)
        .with_context(|| format!("failed to create {}", config.log_path.display()))?;
    info!("logging to {}", config.log_path.display());

    let chart = open_chart(&config);
    let summary = Acquisition::new(port, BufWriter::new(log_file), stdout().lock(), chart)
        .with_y_range(config.y_range)
        .run(&stop)?;

    summary
        .write_farewell(&mut stdout().lock())
        .context("failed to write console")?;

    Ok(())
}
