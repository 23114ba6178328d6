use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::config::{Config, WINDOW_LEN};

const MARGIN: u32 = 20;
const GRID_DIVISIONS: usize = 10;
const GRID_COLOR: RGBColor = RGBColor(220, 220, 220);
const TRACE_COLOR: RGBColor = RGBColor(31, 119, 180);

/// A single redrawable line chart.
pub trait Chart {
    fn clear(&mut self);
    fn set_y_range(&mut self, lo: f64, hi: f64);
    /// Plots `series` against its index.
    fn plot(&mut self, series: &[f64]);
    /// Draws the current frame, then pauses so it can be seen.
    fn render_and_yield(&mut self) -> Result<()>;

    /// False once the operator has closed the display.
    fn is_open(&self) -> bool {
        true
    }
}

impl<T: Chart + ?Sized> Chart for &mut T {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn set_y_range(&mut self, lo: f64, hi: f64) {
        (**self).set_y_range(lo, hi)
    }

    fn plot(&mut self, series: &[f64]) {
        (**self).plot(series)
    }

    fn render_and_yield(&mut self) -> Result<()> {
        (**self).render_and_yield()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<T: Chart + ?Sized> Chart for Box<T> {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn set_y_range(&mut self, lo: f64, hi: f64) {
        (**self).set_y_range(lo, hi)
    }

    fn plot(&mut self, series: &[f64]) {
        (**self).plot(series)
    }

    fn render_and_yield(&mut self) -> Result<()> {
        (**self).render_and_yield()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Chart state shared by every backend: the axes and the series to trace.
///
/// Only lines are drawn, no text, so no font support is needed.
struct Frame {
    size: (u32, u32),
    x_len: usize,
    y_range: (f64, f64),
    series: Vec<f64>,
}

impl Frame {
    fn new(config: &Config) -> Self {
        Self {
            size: config.plot_size,
            x_len: WINDOW_LEN,
            y_range: config.y_range,
            series: Vec::with_capacity(WINDOW_LEN),
        }
    }

    fn plot(&mut self, series: &[f64]) {
        self.series.clear();
        self.series.extend_from_slice(series);
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;

        let (lo, hi) = self.y_range;
        let x_max = self.x_len as f64;
        let mut chart = ChartBuilder::on(root)
            .margin(MARGIN)
            .build_cartesian_2d(0.0..x_max, lo..hi)?;

        for i in 0..=GRID_DIVISIONS {
            let t = i as f64 / GRID_DIVISIONS as f64;
            let y = lo + (hi - lo) * t;
            let x = x_max * t;
            chart.draw_series(LineSeries::new([(0.0, y), (x_max, y)], &GRID_COLOR))?;
            chart.draw_series(LineSeries::new([(x, lo), (x, hi)], &GRID_COLOR))?;
        }

        chart.draw_series(LineSeries::new(
            self.series.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            TRACE_COLOR.stroke_width(2),
        ))?;

        root.present()
    }
}

/// Chart rendered to a PNG image that is rewritten on every frame.
///
/// This is the headless fallback when no window can be opened.
pub struct PngChart {
    path: PathBuf,
    frame: Frame,
    pause: Duration,
}

impl PngChart {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.plot_path.clone(),
            frame: Frame::new(config),
            pause: config.frame_pause,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Chart for PngChart {
    fn clear(&mut self) {
        self.frame.series.clear();
    }

    fn set_y_range(&mut self, lo: f64, hi: f64) {
        self.frame.y_range = (lo, hi);
    }

    fn plot(&mut self, series: &[f64]) {
        self.frame.plot(series);
    }

    fn render_and_yield(&mut self) -> Result<()> {
        let root = BitMapBackend::new(&self.path, self.frame.size).into_drawing_area();
        self.frame
            .draw(&root)
            .map_err(|e| anyhow!("failed to render {}: {e}", self.path.display()))?;
        thread::sleep(self.pause);
        Ok(())
    }
}

/// Packs 24-bit RGB triples into the `0RGB` words a framebuffer window takes.
#[cfg(any(feature = "window", test))]
fn pack_rgb(rgb: &[u8], pixels: &mut [u32]) {
    for (pixel, rgb) in pixels.iter_mut().zip(rgb.chunks_exact(3)) {
        *pixel = (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2]);
    }
}

/// Live chart in an on-screen window.
///
/// Each frame is drawn into an in-memory bitmap and copied to the window's
/// framebuffer. Presenting the frame also processes pending window events.
#[cfg(feature = "window")]
pub struct WindowChart {
    window: minifb::Window,
    frame: Frame,
    rgb: Vec<u8>,
    pixels: Vec<u32>,
    pause: Duration,
}

#[cfg(feature = "window")]
impl WindowChart {
    pub fn open(config: &Config, title: &str) -> Result<Self> {
        let (width, height) = config.plot_size;
        let (width, height) = (width as usize, height as usize);
        let window = minifb::Window::new(title, width, height, minifb::WindowOptions::default())
            .map_err(|e| anyhow!("failed to open plot window: {e}"))?;

        Ok(Self {
            window,
            frame: Frame::new(config),
            rgb: vec![0; width * height * 3],
            pixels: vec![0; width * height],
            pause: config.frame_pause,
        })
    }
}

#[cfg(feature = "window")]
impl Chart for WindowChart {
    fn clear(&mut self) {
        self.frame.series.clear();
    }

    fn set_y_range(&mut self, lo: f64, hi: f64) {
        self.frame.y_range = (lo, hi);
    }

    fn plot(&mut self, series: &[f64]) {
        self.frame.plot(series);
    }

    fn render_and_yield(&mut self) -> Result<()> {
        {
            let root = BitMapBackend::with_buffer(&mut self.rgb, self.frame.size).into_drawing_area();
            self.frame
                .draw(&root)
                .map_err(|e| anyhow!("failed to render plot window: {e}"))?;
        }
        pack_rgb(&self.rgb, &mut self.pixels);

        let (width, height) = self.frame.size;
        self.window
            .update_with_buffer(&self.pixels, width as usize, height as usize)
            .map_err(|e| anyhow!("failed to update plot window: {e}"))?;
        thread::sleep(self.pause);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.window.is_open()
    }
}
