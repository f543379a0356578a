//! Time formatting helpers.

/// Format remaining seconds as a `m:ss` countdown for the resend timer.
pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_pads_seconds() {
        assert_eq!(format_countdown(120), "2:00");
        assert_eq!(format_countdown(65), "1:05");
        assert_eq!(format_countdown(9), "0:09");
    }
}
