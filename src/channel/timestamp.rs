use chrono::NaiveDateTime;

pub(crate) const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

// dddd-dd-dd dd:dd:dd,ddd
const STAMP_SHAPE: &[u8] = b"dddd-dd-dd dd:dd:dd,ddd";

/// Recovers the emission timestamp from a free-text log line. Total over
/// any input: lines carrying the known `2020-04-02 03:29:50,913` prefix
/// shape parse exactly (UTC, millisecond precision); anything else gets
/// the caller's fallback, which means such lines are ordered by
/// processing time rather than emission time.
pub fn extract_timestamp_millis(line: &str, fallback_millis: i64) -> i64 {
    match find_stamp(line).and_then(parse_stamp) {
        Some(millis) => millis,
        None => fallback_millis,
    }
}

fn parse_stamp(stamp: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(stamp, LINE_TIMESTAMP_FORMAT)
        .ok()
        .map(|parsed| parsed.and_utc().timestamp_millis())
}

fn find_stamp(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    if bytes.len() < STAMP_SHAPE.len() {
        return None;
    }
    for start in 0..=bytes.len() - STAMP_SHAPE.len() {
        let window = &bytes[start..start + STAMP_SHAPE.len()];
        if stamp_shape_matches(window) {
            return std::str::from_utf8(window).ok();
        }
    }
    None
}

fn stamp_shape_matches(window: &[u8]) -> bool {
    window
        .iter()
        .zip(STAMP_SHAPE)
        .all(|(byte, shape)| match *shape {
            b'd' => byte.is_ascii_digit(),
            other => *byte == other,
        })
}
