/// Values that can be "empty" and should then yield to the next attempt.
pub trait NonEmpty {
    fn is_blank(&self) -> bool;
}

impl NonEmpty for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl NonEmpty for serde_json::Map<String, serde_json::Value> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Run `attempts` in order and return the first result that is present and
/// not blank. Later attempts are not run once one succeeds.
pub fn first_non_empty<T: NonEmpty>(attempts: &[&dyn Fn() -> Option<T>]) -> Option<T> {
    attempts
        .iter()
        .filter_map(|attempt| attempt())
        .find(|value| !value.is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn first_present_value_wins() {
        let a = || Some("first".to_owned());
        let b = || Some("second".to_owned());
        assert_eq!(first_non_empty::<String>(&[&a, &b]).as_deref(), Some("first"));
    }

    #[test]
    fn blank_and_missing_values_fall_through() {
        let missing = || None::<String>;
        let blank = || Some("  \n".to_owned());
        let last = || Some("found".to_owned());
        assert_eq!(first_non_empty::<String>(&[&missing, &blank, &last]).as_deref(), Some("found"));
    }

    #[test]
    fn later_attempts_not_run_after_success() {
        let ran = Cell::new(false);
        let a = || Some("ok".to_owned());
        let b = || {
            ran.set(true);
            Some("never".to_owned())
        };
        assert_eq!(first_non_empty::<String>(&[&a, &b]).as_deref(), Some("ok"));
        assert!(!ran.get());
    }

    #[test]
    fn none_when_every_attempt_is_empty() {
        type Object = serde_json::Map<String, serde_json::Value>;
        let empty = || Some(Object::new());
        let missing = || None::<Object>;
        assert!(first_non_empty::<Object>(&[&empty, &missing]).is_none());
    }
}
