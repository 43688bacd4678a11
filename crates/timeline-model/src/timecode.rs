//! Frame number to SMPTE timecode conversion.
//!
//! Drop-frame timecode skips frame numbers 0 and 1 (0-3 at 59.94) at the
//! start of every minute except each tenth minute, so that the displayed
//! time tracks wall-clock time at 29.97/59.94 fps.

use crate::item::Frame;
use crate::sequence::FrameRate;

/// Format a frame count as `HH:MM:SS:FF`, or `HH:MM:SS;FF` for drop-frame.
///
/// Drop-frame is only honoured for rates that support it. Hours wrap at 24.
/// Negative frames are formatted by magnitude with a leading `-`.
pub fn frames_to_timecode(frame: Frame, rate: FrameRate, drop_frame: bool) -> String {
    let nominal = Frame::from(rate.nominal().max(1));
    let drop_frame = drop_frame && rate.supports_drop_frame();

    let sign = if frame < 0 { "-" } else { "" };
    let mut frames = frame.abs();

    if drop_frame {
        frames = drop_frame_display_count(frames, nominal);
    }

    let ff = frames % nominal;
    let total_secs = frames / nominal;
    let ss = total_secs % 60;
    let mm = (total_secs / 60) % 60;
    let hh = (total_secs / 3600) % 24;
    let separator = if drop_frame { ';' } else { ':' };

    format!("{sign}{hh:02}:{mm:02}:{ss:02}{separator}{ff:02}")
}

/// Add back the frame numbers skipped by drop-frame counting.
fn drop_frame_display_count(frames: Frame, nominal: Frame) -> Frame {
    let dropped_per_minute = nominal / 15;
    let per_ten_minutes = nominal * 600 - dropped_per_minute * 9;
    let per_minute = nominal * 60 - dropped_per_minute;

    let ten_minute_blocks = frames / per_ten_minutes;
    let remainder = frames % per_ten_minutes;

    let skipped = if remainder > dropped_per_minute {
        dropped_per_minute * 9 * ten_minute_blocks
            + dropped_per_minute * ((remainder - dropped_per_minute) / per_minute)
    } else {
        dropped_per_minute * 9 * ten_minute_blocks
    };

    frames + skipped
}
