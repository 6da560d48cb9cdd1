use chrono::Utc;
use jobsignal::channel::extract_timestamp_millis;

#[test]
fn well_formed_stamp_parses_exactly() {
    let line = "INFO     2020-04-02 03:29:50,913 root current run 0";
    assert_eq!(extract_timestamp_millis(line, -1), 1_585_798_190_913);
}

#[test]
fn stampless_lines_fall_back_to_the_supplied_clock() {
    let fallback = Utc::now().timestamp_millis();
    assert_eq!(extract_timestamp_millis("no stamp here", fallback), fallback);
    assert_eq!(extract_timestamp_millis("", fallback), fallback);
}

#[test]
fn extraction_is_total_over_arbitrary_input() {
    let fallback = 42;
    for line in [
        "ERROR",
        "2020-13-02 03:29:50,913 month out of range",
        "9999-99-99 99:99:99,999",
        "\u{1f980} unicode noise 2020-04-02 03:29:50,913 trailing",
    ] {
        let millis = extract_timestamp_millis(line, fallback);
        assert!(millis == fallback || millis > 0, "line `{line}`");
    }
}

#[test]
fn shape_match_with_invalid_calendar_value_falls_back() {
    // matches the digit shape but is not a real datetime
    assert_eq!(extract_timestamp_millis("9999-99-99 99:99:99,999", 7), 7);
}
