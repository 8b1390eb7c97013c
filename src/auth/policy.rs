use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_FULL_NAME_LEN: usize = 255;

/// Characters that satisfy the "special character" rule.
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// A single password strength requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Special,
}

impl PasswordRule {
    /// Evaluation order; violations are always reported in this order.
    pub const ALL: [PasswordRule; 5] = [
        PasswordRule::MinLength,
        PasswordRule::Uppercase,
        PasswordRule::Lowercase,
        PasswordRule::Digit,
        PasswordRule::Special,
    ];

    pub fn is_met(self, password: &str) -> bool {
        match self {
            PasswordRule::MinLength => password.chars().count() >= MIN_PASSWORD_LEN,
            PasswordRule::Uppercase => password.chars().any(|c| c.is_ascii_uppercase()),
            PasswordRule::Lowercase => password.chars().any(|c| c.is_ascii_lowercase()),
            PasswordRule::Digit => password.chars().any(|c| c.is_ascii_digit()),
            PasswordRule::Special => password.chars().any(|c| SPECIAL_CHARS.contains(c)),
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            PasswordRule::MinLength => "Password must be at least 8 characters long",
            PasswordRule::Uppercase => "Password must contain at least one uppercase letter",
            PasswordRule::Lowercase => "Password must contain at least one lowercase letter",
            PasswordRule::Digit => "Password must contain at least one digit",
            PasswordRule::Special => "Password must contain at least one special character",
        }
    }
}

/// Returns every unmet rule, or `Ok` when the password is strong enough.
pub fn check_password_strength(password: &str) -> Result<(), Vec<PasswordRule>> {
    let unmet: Vec<PasswordRule> = PasswordRule::ALL
        .into_iter()
        .filter(|rule| !rule.is_met(password))
        .collect();
    if unmet.is_empty() {
        Ok(())
    } else {
        Err(unmet)
    }
}

/// Emails are stored and compared trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn is_valid_full_name(full_name: &str) -> bool {
    let len = full_name.trim().chars().count();
    (1..=MAX_FULL_NAME_LEN).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_reports_all_unmet_rules_in_order() {
        let unmet = check_password_strength("abc").unwrap_err();
        assert_eq!(
            unmet,
            vec![
                PasswordRule::MinLength,
                PasswordRule::Uppercase,
                PasswordRule::Digit,
                PasswordRule::Special,
            ]
        );
    }

    #[test]
    fn strong_password_passes() {
        assert!(check_password_strength("Abcdefg1!").is_ok());
    }

    #[test]
    fn each_rule_is_checked_independently() {
        assert_eq!(
            check_password_strength("abcdefg1!").unwrap_err(),
            vec![PasswordRule::Uppercase]
        );
        assert_eq!(
            check_password_strength("ABCDEFG1!").unwrap_err(),
            vec![PasswordRule::Lowercase]
        );
        assert_eq!(
            check_password_strength("Abcdefgh!").unwrap_err(),
            vec![PasswordRule::Digit]
        );
        assert_eq!(
            check_password_strength("Abcdefgh1").unwrap_err(),
            vec![PasswordRule::Special]
        );
        assert_eq!(
            check_password_strength("Abcd1!").unwrap_err(),
            vec![PasswordRule::MinLength]
        );
    }

    #[test]
    fn email_normalization_and_syntax() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn full_name_bounds() {
        assert!(is_valid_full_name("Ada Lovelace"));
        assert!(!is_valid_full_name("   "));
        assert!(!is_valid_full_name(&"x".repeat(256)));
    }
}
