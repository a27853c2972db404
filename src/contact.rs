//! Contact form: a validated message and a WhatsApp chat link built from it.
//!
//! Nothing is sent anywhere; the caller prints or opens the link.

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::ContactError;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Line separator the chat link expects, already percent-encoded.
const LINE_BREAK: &str = "%0a";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// All three fields are required and the email must look like one.
    pub fn validate(&self) -> Result<(), ContactError> {
        if self.name.trim().is_empty() {
            return Err(ContactError::MissingField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(ContactError::MissingField("email"));
        }
        if self.message.trim().is_empty() {
            return Err(ContactError::MissingField("message"));
        }
        let email = self.email.trim();
        if !EMAIL_REGEX.is_match(email) {
            return Err(ContactError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    /// Chat text: bold labels, one field per line.
    pub fn chat_text(&self) -> String {
        [
            format!("*Name*: {}", urlencoding::encode(self.name.trim())),
            format!("*Email*: {}", urlencoding::encode(self.email.trim())),
            format!("*Message*: {}", urlencoding::encode(self.message.trim())),
        ]
        .join(LINE_BREAK)
    }

    /// `https://wa.me/<number>?text=...` after validating the message.
    ///
    /// Non-digits in `number` (spaces, `+`, dashes) are stripped.
    pub fn whatsapp_link(&self, number: &str) -> Result<String, ContactError> {
        self.validate()?;
        let digits: String = number.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(ContactError::MissingField("whatsapp_number"));
        }
        Ok(format!("https://wa.me/{}?text={}", digits, self.chat_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ContactMessage {
        ContactMessage::new("Ada Lovelace", "ada@example.com", "Need help with Flask")
    }

    #[test]
    fn test_valid_message() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut msg = valid();
        msg.name = "  ".into();
        assert_eq!(msg.validate(), Err(ContactError::MissingField("name")));

        let mut msg = valid();
        msg.email.clear();
        assert_eq!(msg.validate(), Err(ContactError::MissingField("email")));

        let mut msg = valid();
        msg.message.clear();
        assert_eq!(msg.validate(), Err(ContactError::MissingField("message")));
    }

    #[test]
    fn test_invalid_email() {
        for bad in ["ada", "ada@", "ada@example", "a da@example.com", "@example.com"] {
            let mut msg = valid();
            msg.email = bad.into();
            assert!(
                matches!(msg.validate(), Err(ContactError::InvalidEmail(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_whatsapp_link_format() {
        let link = valid().whatsapp_link("+1 555-123-4567").unwrap();
        assert_eq!(
            link,
            "https://wa.me/15551234567?text=*Name*: Ada%20Lovelace%0a*Email*: \
             ada%40example.com%0a*Message*: Need%20help%20with%20Flask"
        );
    }

    #[test]
    fn test_whatsapp_link_encodes_newlines_in_message() {
        let msg = ContactMessage::new("A", "a@b.co", "line one\nline two & more");
        let link = msg.whatsapp_link("123").unwrap();
        assert!(link.ends_with("*Message*: line%20one%0Aline%20two%20%26%20more"));
    }

    #[test]
    fn test_whatsapp_link_requires_number_and_valid_message() {
        assert_eq!(
            valid().whatsapp_link("n/a"),
            Err(ContactError::MissingField("whatsapp_number"))
        );
        let mut msg = valid();
        msg.email = "nope".into();
        assert!(msg.whatsapp_link("123").is_err());
    }
}
