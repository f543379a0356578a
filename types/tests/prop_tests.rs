use proptest::prelude::*;

use loanflow_types::{EmailAddress, OtpCode, PhoneNumber, Timestamp};

proptest! {
    /// Any ten digits parse, and normalization adds exactly the country prefix.
    #[test]
    fn ten_digit_phone_parses(digits in "[0-9]{10}") {
        let phone = PhoneNumber::parse(&digits).unwrap();
        prop_assert_eq!(phone.as_str(), digits.as_str());
        prop_assert_eq!(phone.normalized(), format!("+91{digits}"));
    }

    /// Digit strings of any other length are rejected.
    #[test]
    fn wrong_length_phone_rejected(digits in "[0-9]{1,9}|[0-9]{13,16}") {
        prop_assert!(PhoneNumber::parse(&digits).is_err());
    }

    /// The prefixed form parses back to the same national number.
    #[test]
    fn prefixed_phone_matches_national(digits in "[0-9]{10}") {
        let national = PhoneNumber::parse(&digits).unwrap();
        let prefixed = PhoneNumber::parse(&national.normalized()).unwrap();
        prop_assert_eq!(national, prefixed);
    }

    /// A passcode parses iff it is exactly six ASCII digits.
    #[test]
    fn otp_parse_matches_shape(raw in "[0-9a-z]{0,8}") {
        let expected = raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit());
        prop_assert_eq!(OtpCode::parse(&raw).is_ok(), expected);
    }

    /// Simple `local@domain.tld` addresses always validate.
    #[test]
    fn simple_email_parses(local in "[a-z0-9._]{1,12}", domain in "[a-z0-9]{1,12}", tld in "[a-z]{2,6}") {
        let raw = format!("{local}@{domain}.{tld}");
        prop_assert!(EmailAddress::parse(&raw).is_ok());
    }

    /// Whitespace anywhere inside an address makes it invalid.
    #[test]
    fn email_with_space_rejected(local in "[a-z]{1,6}", domain in "[a-z]{1,6}") {
        let raw = format!("{local} x@{domain}.com");
        prop_assert!(EmailAddress::parse(&raw).is_err());
    }

    /// has_expired is monotone in `now`.
    #[test]
    fn expiry_monotone(start in 0u64..1_000_000, window in 0u64..1_000_000, a in 0u64..3_000_000, b in 0u64..3_000_000) {
        let issued = Timestamp::from_millis(start);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if issued.has_expired(window, Timestamp::from_millis(lo)) {
            prop_assert!(issued.has_expired(window, Timestamp::from_millis(hi)));
        }
    }
}
