use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VERSION_NUMBER_REGEX: Regex = Regex::new(r"^(\d+)(\.(\d+))?(\.(\d+))?.*$").unwrap();
}

/// The numeric part of a free-form version string, split into major, minor and fix level.
///
/// Comparing these numbers rather than the raw strings orders "1.6" before "1.10". Anything after
///  the third number (qualifiers like "-SNAPSHOT" or ".RELEASE") is ignored, and a string that
///  does not start with a digit counts as 0.0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionValue {
    pub major: u64,
    pub minor: u64,
    pub fix: u64,
    pub has_numeric_version: bool,
}

impl VersionValue {
    pub fn parse(raw: &str) -> VersionValue {
        let captures = match VERSION_NUMBER_REGEX.captures(raw) {
            Some(c) => c,
            None => return VersionValue::default(),
        };

        let group = |idx: usize| captures.get(idx)
            .map(|m| parse_saturating(m.as_str()))
            .unwrap_or(0);

        VersionValue {
            major: group(1),
            minor: group(3),
            fix: group(5),
            has_numeric_version: true,
        }
    }

    fn as_tuple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.fix)
    }
}

/// the regex guarantees digits only, so the only failure is overflow
fn parse_saturating(digits: &str) -> u64 {
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

impl PartialEq for VersionValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_tuple() == other.as_tuple()
    }
}
impl Eq for VersionValue {}

impl PartialOrd for VersionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for VersionValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::minor_numeric("1.6", "1.10", Ordering::Less)]
    #[case::missing_parts_are_zero("2", "2.0.0", Ordering::Equal)]
    #[case::non_numeric_is_zero("abc", "1.0", Ordering::Less)]
    #[case::qualifier_ignored("1.2.3-SNAPSHOT", "1.2.3", Ordering::Equal)]
    #[case::osgi_qualifier_ignored("2.4.0.R7", "2.4.0", Ordering::Equal)]
    #[case::fix_level("1.0.2", "1.0.10", Ordering::Less)]
    #[case::major_wins("10.0", "9.99.99", Ordering::Greater)]
    #[case::both_empty("", "", Ordering::Equal)]
    fn test_compare(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(VersionValue::parse(a).cmp(&VersionValue::parse(b)), expected);
    }

    #[test]
    fn test_parse_parts() {
        let v = VersionValue::parse("3.14.15.v20160301");
        assert_eq!((v.major, v.minor, v.fix), (3, 14, 15));
        assert!(v.has_numeric_version);

        let v = VersionValue::parse("4.");
        assert_eq!((v.major, v.minor, v.fix), (4, 0, 0));
    }

    #[test]
    fn test_unparsable() {
        let v = VersionValue::parse("latest");
        assert_eq!((v.major, v.minor, v.fix), (0, 0, 0));
        assert!(!v.has_numeric_version);
    }

    #[test]
    fn test_overflow_saturates() {
        let v = VersionValue::parse("99999999999999999999999.1");
        assert_eq!(v.major, u64::MAX);
        assert_eq!(v.minor, 1);
    }
}
