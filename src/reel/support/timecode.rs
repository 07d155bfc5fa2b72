use anyhow::{Context, Result, bail};

/// Slack added before truncating to whole milliseconds so values such as
/// `2.3 * 1000.0 == 2299.9999999999995` land on the intended millisecond.
const MILLIS_EPSILON: f64 = 1e-6;

/// Whole milliseconds in `seconds`, truncated toward zero.
pub fn whole_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0 + MILLIS_EPSILON).floor() as u64
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = whole_millis(seconds);
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Parse `HH:MM:SS,mmm` (or `HH:MM:SS.mmm`) into seconds.
pub fn parse_srt_timestamp(value: &str) -> Result<f64> {
    let cleaned = value.trim().replace(',', ".");
    let (time_part, fractional_part) = match cleaned.split_once('.') {
        Some((time, fraction)) => (time, fraction),
        None => (cleaned.as_str(), "0"),
    };

    let mut hms = time_part.split(':');
    let hours = hms
        .next()
        .context("Timestamp missing hours")?
        .parse::<u64>()
        .context("Invalid hours in timestamp")?;
    let minutes = hms
        .next()
        .context("Timestamp missing minutes")?
        .parse::<u64>()
        .context("Invalid minutes in timestamp")?;
    let seconds = hms
        .next()
        .context("Timestamp missing seconds")?
        .parse::<u64>()
        .context("Invalid seconds in timestamp")?;

    if hms.next().is_some() {
        bail!("Timestamp has more than three components: {value}");
    }
    if minutes >= 60 || seconds >= 60 {
        bail!("Timestamp minutes and seconds must be below 60: {value}");
    }

    let millis_str: String = fractional_part
        .chars()
        .chain(std::iter::repeat('0'))
        .take(3)
        .collect();
    let millis = millis_str
        .parse::<u64>()
        .context("Invalid millisecond component in timestamp")?;

    let total_ms = (hours * 3600 + minutes * 60 + seconds) * 1000 + millis;
    Ok(total_ms as f64 / 1000.0)
}
