//! Reader for free-form ASCII sensor records.
//!
//! A record is one line of text. Every maximal run of ASCII digits is a
//! token, and tokens are assigned to fields by position:
//!
//! ```text
//! token  0      1        2        3       4+2k           5+2k
//! field  tag    minutes  seconds  tenths  channel k int  channel k fraction
//! ```
//!
//! with `k` in `0..10`, so a record needs at least 24 tokens. A typical
//! device line looks like `#9 01:23.4 12.34, 5.6, ...`.

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt::{self, Display, Write};

pub mod fake;
pub mod serial;
pub mod window;

#[cfg(feature = "std")]
pub mod acquisition;
#[cfg(feature = "std")]
pub mod chart;
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod port;

pub use serial::{tokenize, Tokens};
pub use window::RollingWindow;

pub const CHANNELS: usize = 10;
pub const MIN_TOKENS: usize = FIRST_CHANNEL + 2 * CHANNELS;

const TAG: usize = 0;
const MINUTES: usize = 1;
const SECONDS: usize = 2;
const TENTHS: usize = 3;
const FIRST_CHANNEL: usize = 4;

// Digits past this many significant ones are far below f64 precision.
const SIGNIFICANT_DIGITS: usize = 40;
// Significant digits plus "e" and a signed exponent.
const FLOAT_TEXT_LEN: usize = SIGNIFICANT_DIGITS + 21;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    TooFewTokens { found: usize },
    InvalidNumber,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooFewTokens { found } => write!(
                f,
                "expected at least {MIN_TOKENS} numeric fields, found {found}"
            ),
            Error::InvalidNumber => f.write_str("numeric field out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

/// A time value counted in tenths of a second.
///
/// Printed as `<secs>.<tenth>` so repeated `+0.1` steps stay exact in the log.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Tenths(pub u64);

impl Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// Device clock reading built from the minutes, seconds and tenths fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeviceTime {
    Exact(Tenths),
    /// Seconds, for fields too large to count exactly in `u64` tenths.
    Approx(f64),
}

impl Display for DeviceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTime::Exact(tenths) => write!(f, "{tenths}"),
            DeviceTime::Approx(secs) if is_integral(*secs) => write!(f, "{secs:.1}"),
            DeviceTime::Approx(secs) => write!(f, "{secs}"),
        }
    }
}

// Every f64 at or past 2^52 in magnitude is a whole number.
fn is_integral(x: f64) -> bool {
    const EXACT: f64 = 4_503_599_627_370_496.0;
    x.is_finite() && (x >= EXACT || x <= -EXACT || x == (x as i64) as f64)
}

/// Value of the decimal `<whole>.<fraction>`, for digit strings of any length.
fn decimal(whole: &str, fraction: &str) -> Result<f64> {
    let mut text = heapless::String::<FLOAT_TEXT_LEN>::new();
    let mut dropped: i64 = 0;
    for digit in whole.chars().chain(fraction.chars()).skip_while(|&c| c == '0') {
        if text.len() < SIGNIFICANT_DIGITS {
            let _ = text.push(digit);
        } else {
            dropped += 1;
        }
    }
    if text.is_empty() {
        return Ok(0.0);
    }

    let exponent = dropped - fraction.len() as i64;
    write!(text, "e{exponent}").map_err(|_| Error::InvalidNumber)?;
    text.parse::<f64>().map_err(|_| Error::InvalidNumber)
}

/// One channel reading, kept as the digit strings it was built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading<'a> {
    pub whole: &'a str,
    pub fraction: &'a str,
    value: f64,
}

impl<'a> Reading<'a> {
    pub fn new(whole: &'a str, fraction: &'a str) -> Result<Self> {
        Ok(Self {
            whole,
            fraction,
            value: decimal(whole, fraction)?,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Display for Reading<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole, self.fraction)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record<'a> {
    pub tag: &'a str,
    pub minutes: &'a str,
    pub seconds: &'a str,
    pub tenths: &'a str,
    pub device_time: DeviceTime,
    pub channels: [Reading<'a>; CHANNELS],
    /// A minus sign was seen in front of at least one token and dropped.
    pub sign_dropped: bool,
}

fn exact_time(minutes: &str, seconds: &str, tenths: &str) -> Option<Tenths> {
    let minutes = minutes.parse::<u64>().ok()?;
    let seconds = seconds.parse::<u64>().ok()?;
    let tenths = tenths.parse::<u64>().ok()?;

    minutes
        .checked_mul(600)?
        .checked_add(seconds.checked_mul(10)?)?
        .checked_add(tenths)
        .map(Tenths)
}

fn device_time(minutes: &str, seconds: &str, tenths: &str) -> Result<DeviceTime> {
    if let Some(exact) = exact_time(minutes, seconds, tenths) {
        return Ok(DeviceTime::Exact(exact));
    }

    let float = |token: &str| token.parse::<f64>().map_err(|_| Error::InvalidNumber);
    Ok(DeviceTime::Approx(
        float(minutes)? * 60.0 + float(seconds)? + float(tenths)? * 0.1,
    ))
}

impl<'a> Record<'a> {
    pub fn parse(line: &'a str) -> Result<Self> {
        Self::from_tokens(&tokenize(line))
    }

    pub fn from_tokens(tokens: &Tokens<'a>) -> Result<Self> {
        let t = tokens.as_slice();
        if t.len() < MIN_TOKENS {
            return Err(Error::TooFewTokens { found: t.len() });
        }

        let mut channels = [Reading {
            whole: "",
            fraction: "",
            value: 0.0,
        }; CHANNELS];
        for (k, channel) in channels.iter_mut().enumerate() {
            let at = FIRST_CHANNEL + 2 * k;
            *channel = Reading::new(t[at], t[at + 1])?;
        }

        Ok(Self {
            tag: t[TAG],
            minutes: t[MINUTES],
            seconds: t[SECONDS],
            tenths: t[TENTHS],
            device_time: device_time(t[MINUTES], t[SECONDS], t[TENTHS])?,
            channels,
            sign_dropped: tokens.signed(),
        })
    }

    /// Records whose tenths field is exactly `"0"` are echoed to the console.
    pub fn echoes(&self) -> bool {
        self.tenths == "0"
    }

    /// Pairs this record with the synthetic elapsed time of the `index`-th
    /// accepted record.
    pub fn sample(&self, index: u64) -> Sample<'a> {
        Sample {
            device_time: self.device_time,
            elapsed: Tenths(index),
            channels: self.channels,
        }
    }
}

/// A record ready to be written out.
///
/// `Display` gives the log form `device, elapsed, ch0, ..., ch9`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<'a> {
    pub device_time: DeviceTime,
    pub elapsed: Tenths,
    pub channels: [Reading<'a>; CHANNELS],
}

impl<'a> Sample<'a> {
    /// Console form, `device: elapsed, ch0, ..., ch9`.
    pub fn echo(&self) -> Echo<'_, 'a> {
        Echo(self)
    }

    fn write_body(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elapsed)?;
        for channel in &self.channels {
            write!(f, ", {channel}")?;
        }
        Ok(())
    }
}

impl Display for Sample<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, ", self.device_time)?;
        self.write_body(f)
    }
}

pub struct Echo<'s, 'a>(&'s Sample<'a>);

impl Display for Echo<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.0.device_time)?;
        self.0.write_body(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "#9 1:23.4 12.34, 5.6, 7.8, 9.0, 1.2, 3.4, 5.6, 7.8, 9.0, 1.2";

    fn render(value: impl Display) -> heapless::String<256> {
        let mut out = heapless::String::new();
        write!(out, "{value}").unwrap();
        out
    }

    #[test]
    fn record_parses_named_fields() {
        let record = Record::parse(LINE).unwrap();
        assert_eq!(record.tag, "9");
        assert_eq!(record.minutes, "1");
        assert_eq!(record.seconds, "23");
        assert_eq!(record.tenths, "4");
        assert_eq!(record.device_time, DeviceTime::Exact(Tenths(834)));
        assert_eq!(record.channels[0].value(), 12.34);
        assert_eq!(record.channels[1].value(), 5.6);
        assert_eq!(record.channels[9].value(), 1.2);
        assert!(!record.sign_dropped);
    }

    #[test]
    fn sample_formats_log_line() {
        let record = Record::parse(LINE).unwrap();
        let sample = record.sample(7);
        assert_eq!(sample.elapsed, Tenths(7));
        assert_eq!(
            render(&sample).as_str(),
            "83.4, 0.7, 12.34, 5.6, 7.8, 9.0, 1.2, 3.4, 5.6, 7.8, 9.0, 1.2"
        );
        assert_eq!(render(&sample).split(", ").count(), 2 + CHANNELS);
    }

    #[test]
    fn echo_uses_colon_after_device_time() {
        let record = Record::parse(LINE).unwrap();
        assert_eq!(
            render(record.sample(0).echo()).as_str(),
            "83.4: 0.0, 12.34, 5.6, 7.8, 9.0, 1.2, 3.4, 5.6, 7.8, 9.0, 1.2"
        );
    }

    #[test]
    fn fraction_digits_are_logged_verbatim() {
        let line = "0 0:0.0 1.50 2.05 3.500 4.0 5.00 6.1 7.2 8.3 9.4 10.5";
        let record = Record::parse(line).unwrap();
        assert_eq!(record.channels[0].value(), 1.5);
        assert_eq!(record.channels[1].value(), 2.05);
        assert_eq!(
            render(record.sample(0)).as_str(),
            "0.0, 0.0, 1.50, 2.05, 3.500, 4.0, 5.00, 6.1, 7.2, 8.3, 9.4, 10.5"
        );

        // Splitting each field on '.' gives back the matched digit runs.
        let tokens = tokenize(line);
        let logged = render(record.sample(0));
        for (k, field) in logged.split(", ").skip(2).enumerate() {
            let (whole, fraction) = field.split_once('.').unwrap();
            assert_eq!(whole, tokens.as_slice()[4 + 2 * k]);
            assert_eq!(fraction, tokens.as_slice()[5 + 2 * k]);
        }
    }

    #[test]
    fn too_few_tokens_is_an_error() {
        assert_eq!(
            Record::parse("1 2 3"),
            Err(Error::TooFewTokens { found: 3 })
        );
        assert_eq!(Record::parse(""), Err(Error::TooFewTokens { found: 0 }));

        // One short of a full record.
        let short = "9 1:23.4 12.34, 5.6, 7.8, 9.0, 1.2, 3.4, 5.6, 7.8, 9.0, 1";
        assert_eq!(
            Record::parse(short),
            Err(Error::TooFewTokens { found: 23 })
        );
    }

    #[test]
    fn extra_tokens_are_ignored() {
        let line = "#9 1:23.4 12.34, 5.6, 7.8, 9.0, 1.2, 3.4, 5.6, 7.8, 9.0, 1.2 crc 77";
        let record = Record::parse(line).unwrap();
        assert_eq!(record.channels[9].value(), 1.2);
    }

    #[test]
    fn echo_only_on_literal_zero_tenths() {
        let zero = "9 1:23.0 1.1 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1";
        let padded = "9 1:23.00 1.1 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1";
        let nonzero = "9 1:23.5 1.1 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1";

        assert!(Record::parse(zero).unwrap().echoes());
        assert!(!Record::parse(padded).unwrap().echoes());
        assert!(!Record::parse(nonzero).unwrap().echoes());
    }

    #[test]
    fn device_time_accepts_large_tenths() {
        let record =
            Record::parse("9 2:00.12 1.1 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1").unwrap();
        assert_eq!(record.device_time, DeviceTime::Exact(Tenths(1212)));
        assert_eq!(render(record.device_time).as_str(), "121.2");
    }

    #[test]
    fn oversized_minutes_fall_back_to_float_seconds() {
        let huge_minutes = "9 99999999999999999999:00.1 1.1 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1";
        let record = Record::parse(huge_minutes).unwrap();
        assert_eq!(record.device_time, DeviceTime::Approx(6e21));
        assert!(render(record.sample(0))
            .as_str()
            .starts_with("6000000000000000000000.0, 0.0, 1.1, "));

        // Fits in u64 as minutes, but not once counted in tenths.
        let overflow = "9 40000000000000000:00.1 1.1 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1";
        let record = Record::parse(overflow).unwrap();
        assert_eq!(record.device_time, DeviceTime::Approx(2.4e18));
        assert_eq!(render(record.device_time).as_str(), "2400000000000000000.0");
    }

    #[test]
    fn long_readings_are_accepted() {
        let whole = "1234567890123456789012345678901234567890";
        let fraction = "123456789012345678901234567890";
        let long_reading = "9 1:00.1 \
            1234567890123456789012345678901234567890.123456789012345678901234567890 \
            2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1";

        let record = Record::parse(long_reading).unwrap();
        assert_eq!(record.channels[0].whole, whole);
        assert_eq!(record.channels[0].fraction, fraction);
        assert_eq!(
            record.channels[0].value(),
            "1234567890123456789012345678901234567890.123456789012345678901234567890"
                .parse::<f64>()
                .unwrap()
        );
        assert!(render(record.sample(0)).as_str().starts_with(
            "60.1, 0.0, \
             1234567890123456789012345678901234567890.123456789012345678901234567890, 2.2, "
        ));
    }

    #[test]
    fn reading_values_ignore_leading_zeros() {
        assert_eq!(Reading::new("007", "50").unwrap().value(), 7.5);
        assert_eq!(Reading::new("0", "000").unwrap().value(), 0.0);
        assert_eq!(Reading::new("0", "0001").unwrap().value(), 0.0001);
        assert_eq!(Reading::new("2", "05").unwrap().value(), 2.05);
    }

    #[test]
    fn negative_readings_lose_their_sign() {
        let record =
            Record::parse("9 1:00.1 -1.5 2.2 3.3 4.4 5.5 6.6 7.7 8.8 9.9 10.1").unwrap();
        assert_eq!(record.channels[0].value(), 1.5);
        assert!(record.sign_dropped);
    }

    #[test]
    fn tenths_display() {
        assert_eq!(render(Tenths(0)).as_str(), "0.0");
        assert_eq!(render(Tenths(3)).as_str(), "0.3");
        assert_eq!(render(Tenths(900)).as_str(), "90.0");
        assert_eq!(render(DeviceTime::Approx(1.5)).as_str(), "1.5");
        assert_eq!(render(DeviceTime::Approx(f64::INFINITY)).as_str(), "inf");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            render(Error::TooFewTokens { found: 5 }).as_str(),
            "expected at least 24 numeric fields, found 5"
        );
    }
}
