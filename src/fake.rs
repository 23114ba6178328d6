use core::fmt::Write;

use heapless::String;

use crate::CHANNELS;

pub const MAX_LINE_LENGTH: usize = 160;

// Hundredths of a degree.
const BASE_LEVEL: u32 = 2000;
const CHANNEL_STEP: u32 = 150;
const RAMP_PERIOD: u32 = 200;

/// Synthetic sensor that emits records in the device's text layout, one
/// per tenth of a second of device time.
///
/// Channel values follow a triangle wave so a plotted trace is easy to
/// recognise.
pub struct FakeSensor {
    tag: u8,
    tick: u32,
}

impl FakeSensor {
    pub fn new(tag: u8) -> Self {
        Self { tag, tick: 0 }
    }

    /// Device time of the next record, in tenths.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    fn level(&self, channel: u32) -> u32 {
        let phase = (self.tick + channel * 7) % RAMP_PERIOD;
        let ramp = if phase < RAMP_PERIOD / 2 {
            phase
        } else {
            RAMP_PERIOD - phase
        };
        BASE_LEVEL + channel * CHANNEL_STEP + ramp * 10
    }

    pub fn next_line(&mut self) -> String<MAX_LINE_LENGTH> {
        let mut line = String::new();
        let minutes = self.tick / 600;
        let seconds = (self.tick / 10) % 60;
        let tenths = self.tick % 10;

        // The longest line is well under MAX_LINE_LENGTH; ignore the
        // impossible overflow.
        let _ = write!(line, "#{} {minutes:02}:{seconds:02}.{tenths}", self.tag);
        for channel in 0..CHANNELS as u32 {
            let level = self.level(channel);
            let _ = write!(line, " {}.{:02}", level / 100, level % 100);
        }
        let _ = line.push_str("\r\n");

        self.tick = self.tick.wrapping_add(1);
        line
    }
}

impl Iterator for FakeSensor {
    type Item = String<MAX_LINE_LENGTH>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_line())
    }
}
