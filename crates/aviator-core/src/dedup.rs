//! Dedup gate
//!
//! Delivery is skipped only when both canonical fields equal the last
//! delivered pair.

use crate::observation::Observation;

/// Decide whether `candidate` needs delivering
///
/// `last` is the most recently *delivered* observation, `None` before the
/// first successful delivery of this process.
pub fn should_deliver(candidate: &Observation, last: Option<&Observation>) -> bool {
    match last {
        Some(last) => candidate.value != last.value || candidate.timestamp != last.timestamp,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(value: &str, time: &str) -> Observation {
        Observation::parse(value, time).unwrap()
    }

    #[test]
    fn test_first_observation_is_delivered() {
        assert!(should_deliver(&observation("2.50x", "09:15:00"), None));
    }

    #[test]
    fn test_identical_pair_is_skipped_repeatedly() {
        let o = observation("2.50x", "09:15:00");
        assert!(!should_deliver(&o, Some(&o)));
        assert!(!should_deliver(&o, Some(&o)));
    }

    #[test]
    fn test_either_field_change_is_delivered() {
        let last = observation("2.50x", "09:15:00");
        assert!(should_deliver(&observation("2.51x", "09:15:00"), Some(&last)));
        assert!(should_deliver(&observation("2.50x", "09:15:01"), Some(&last)));
    }

    #[test]
    fn test_comparison_is_on_canonical_form() {
        let last = observation("2,50", "09:15:00");
        assert!(!should_deliver(&observation("2.50 x", "at 09:15:00"), Some(&last)));
    }
}
