use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, carrying on with the inner value if a previous holder panicked.
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads an optionally signed integer from the start of `s`, ignoring whatever follows
/// the digits ("250ms" -> 250). Returns `None` when no digit leads the string.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }

    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// True when `s` is a non-empty run of ASCII digits.
pub fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_int_ignores_suffix() {
        assert_eq!(parse_leading_int("250"), Some(250));
        assert_eq!(parse_leading_int(" 250ms"), Some(250));
        assert_eq!(parse_leading_int("-5"), Some(-5));
        assert_eq!(parse_leading_int("12.7"), Some(12));
    }

    #[test]
    fn leading_int_rejects_non_numeric() {
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn digit_runs() {
        assert!(all_digits("300"));
        assert!(!all_digits(""));
        assert!(!all_digits("3a"));
    }
}
