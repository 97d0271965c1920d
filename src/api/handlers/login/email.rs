//! Email address grammar for login requests.

use once_cell::sync::Lazy;
use regex::Regex;

/// Dot-separated local segments, `@`, dot-separated domain labels and an
/// alphabetic top-level label of at least two letters.
const EMAIL_PATTERN: &str =
    r"^[a-zA-Z0-9_+&*-]+(?:\.[a-zA-Z0-9_+&*-]+)*@(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$";

/// Longest address accepted (RFC 5321 path limit minus the angle brackets).
pub const MAX_EMAIL_LEN: usize = 254;

static EMAIL_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(EMAIL_PATTERN));

/// Returns `true` only when `email` matches the login address grammar.
///
/// Overlong input and a pattern that failed to compile both yield `false`.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN {
        return false;
    }

    EMAIL_RE.as_ref().is_ok_and(|re| re.is_match(email))
}
