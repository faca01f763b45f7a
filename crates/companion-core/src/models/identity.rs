use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;
use utoipa::ToSchema;

/// User record returned by a tenant's auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// A present email must be well formed or the whole record is refused.
    #[serde(
        default,
        deserialize_with = "valid_email",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$").ok()
        })
        .as_ref()
}

fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.')
        && !email.contains("..")
        && email_pattern().is_some_and(|pattern| pattern.is_match(email))
}

fn valid_email<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let email = String::deserialize(deserializer)?;
    if is_valid_email(&email) {
        Ok(Some(email))
    } else {
        Err(D::Error::custom(format!("invalid email: {}", email)))
    }
}

/// Outcome of authenticating one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Tenant has no auth endpoint; the request proceeds as anonymous-authenticated.
    Disabled,
    /// The auth endpoint accepted the token. `None` when its body was not a user record.
    Authenticated(Option<AuthUser>),
    Rejected,
}

impl Identity {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Identity::Rejected)
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Identity::Authenticated(Some(user)) => Some(user),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user().map(|u| u.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_numeric_id_is_coerced() {
        let user: AuthUser = serde_json::from_str(r#"{"id": 42, "email": "a@b.c"}"#).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
        assert!(user.roles.is_empty());
    }

    #[test]
    fn test_auth_user_requires_id() {
        assert!(serde_json::from_str::<AuthUser>(r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn test_email_validation() {
        for ok in ["a@b.co", "first.last+tag@mail.example.com", "O'Neil@acme.test"] {
            assert!(is_valid_email(ok), "rejected {}", ok);
        }
        for bad in ["", "nobody", "a@b", "@acme.com", ".a@acme.com", "a..b@acme.com", "a b@acme.com", "a@acme.c"] {
            assert!(!is_valid_email(bad), "accepted {}", bad);
        }
    }

    #[test]
    fn test_invalid_email_refuses_the_record() {
        assert!(serde_json::from_str::<AuthUser>(r#"{"id": 1, "email": "not-an-email"}"#).is_err());
        assert!(serde_json::from_str::<AuthUser>(r#"{"id": 1, "email": null}"#).is_err());

        let user: AuthUser = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(user.email, None);
    }

    #[test]
    fn test_identity_user_id() {
        let user = AuthUser {
            id: "u1".into(),
            email: None,
            name: None,
            roles: vec![],
        };
        assert_eq!(Identity::Authenticated(Some(user)).user_id(), Some("u1"));
        assert_eq!(Identity::Authenticated(None).user_id(), None);
        assert_eq!(Identity::Disabled.user_id(), None);
        assert!(Identity::Rejected.is_rejected());
    }
}
