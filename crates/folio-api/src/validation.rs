use folio_types::api::FieldError;

use crate::error::ApiError;

/// Collects field errors so a client sees every problem in one response.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message,
        });
    }

    /// Non-empty (after trimming) and at most `max` characters.
    pub fn required(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", field));
        } else {
            self.max_len(field, Some(value), max);
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.push(field, format!("{} must be at most {} characters", field, max));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if !is_plausible_email(value) {
            self.push(field, "Invalid email address".to_string());
        } else {
            self.max_len(field, Some(value), max);
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Shape check only: `local@domain.tld`, no whitespace, exactly one `@`.
pub fn is_plausible_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !domain.starts_with('.'),
        None => false,
    }
}

/// Trim, and treat blank optional text as absent.
pub fn trimmed_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_plausible_email("a@x.com"));
        assert!(is_plausible_email("first.last+tag@sub.example.org"));
        assert!(!is_plausible_email("a@x"));
        assert!(!is_plausible_email("@x.com"));
        assert!(!is_plausible_email("a@@x.com"));
        assert!(!is_plausible_email("a b@x.com"));
        assert!(!is_plausible_email("a@.com"));
        assert!(!is_plausible_email("a@x."));
    }

    #[test]
    fn collects_all_errors() {
        let err = Validator::new()
            .required("name", "  ", 10)
            .email("email", "nope", 255)
            .max_len("subject", Some("abcdef"), 3)
            .finish()
            .unwrap_err();

        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "subject"]);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let cyrillic = "привет";
        assert!(Validator::new().required("m", cyrillic, 6).finish().is_ok());
        assert!(Validator::new().required("m", cyrillic, 5).finish().is_err());
    }

    #[test]
    fn blank_optional_is_none() {
        assert_eq!(trimmed_opt(Some("  ".into())), None);
        assert_eq!(trimmed_opt(Some(" hi ".into())).as_deref(), Some("hi"));
        assert_eq!(trimmed_opt(None), None);
    }
}
