// SPDX-License-Identifier: MIT

use super::*;
use chrono::TimeZone;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(chrono::Duration::seconds(5));
    assert_eq!(clock.now(), start + chrono::Duration::seconds(5));
}

#[test]
fn format_is_rfc3339_with_nanos() {
    let at = Utc.with_ymd_and_hms(2026, 7, 26, 12, 0, 0).unwrap();
    let formatted = format_rfc3339_nanos(at);
    assert!(formatted.ends_with("Z") || formatted.contains('+'));
    assert!(formatted.contains('.'), "expected nanosecond fraction: {formatted}");
}
