//! Text parsing helpers for command intake.
//!
//! These are dependency-free so they work without the `serde` feature:
//! the lenient integer parser used for command arguments, and the
//! mapping from `/cmd/...` path segments to a command triple.

/// Parse a leading integer the way the firmware's string-to-int does.
///
/// Leading whitespace and one sign are accepted; parsing stops at the
/// first non-digit. Anything without digits yields 0, and values outside
/// `i32` saturate.
///
/// ```
/// use ir_trainz::parsing::to_int;
///
/// assert_eq!(to_int("2"), 2);
/// assert_eq!(to_int(" -3"), -3);
/// assert_eq!(to_int("2fast"), 2);
/// assert_eq!(to_int("fast"), 0);
/// ```
pub fn to_int(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| {
            (acc * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1)
        });
    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// True if `segment` starts with an upper-case ASCII letter.
///
/// A two-segment `/cmd/{a}/{b}` path is `{channel}/{cmd}` when this holds
/// for `a`, and `{cmd}/{args}` otherwise.
pub fn is_channel_segment(segment: &str) -> bool {
    segment
        .as_bytes()
        .first()
        .is_some_and(u8::is_ascii_uppercase)
}

/// Split `/cmd/...` path segments into `(channel, command, args)`.
///
/// Returns `None` for zero or more than three segments.
///
/// ```
/// use ir_trainz::parsing::split_cmd_path;
///
/// assert_eq!(split_cmd_path(&["B", "speed", "2"]), Some(("B", "speed", "2")));
/// assert_eq!(split_cmd_path(&["G", "light"]), Some(("G", "light", "")));
/// assert_eq!(split_cmd_path(&["speed", "-1"]), Some(("", "speed", "-1")));
/// assert_eq!(split_cmd_path(&["stop"]), Some(("", "stop", "")));
/// ```
pub fn split_cmd_path<'a>(segments: &[&'a str]) -> Option<(&'a str, &'a str, &'a str)> {
    match *segments {
        [channel, command, args] => Some((channel, command, args)),
        [first, second] if is_channel_segment(first) => Some((first, second, "")),
        [command, args] => Some(("", command, args)),
        [command] => Some(("", command, "")),
        _ => None,
    }
}
