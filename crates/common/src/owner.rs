//! Owner identity of a basket or order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Opaque token identifying an unauthenticated visitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Wraps an existing token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GuestToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GuestToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The identity a basket or order belongs to.
///
/// Exactly one of an authenticated user or a guest token. The identity
/// resolver of the transport layer produces this value; the order core never
/// inspects requests itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Owner {
    /// An authenticated user.
    User(UserId),
    /// An anonymous visitor.
    Guest(GuestToken),
}

impl Owner {
    /// Returns the user id if this owner is authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Owner::User(id) => Some(*id),
            Owner::Guest(_) => None,
        }
    }

    /// Returns the guest token if this owner is anonymous.
    pub fn guest_token(&self) -> Option<&GuestToken> {
        match self {
            Owner::User(_) => None,
            Owner::Guest(token) => Some(token),
        }
    }

    /// Rebuilds an owner from the two nullable storage columns.
    ///
    /// Returns `None` unless exactly one column is set.
    pub fn from_columns(user_id: Option<i64>, guest_token: Option<String>) -> Option<Self> {
        match (user_id, guest_token) {
            (Some(id), None) => Some(Owner::User(UserId::new(id))),
            (None, Some(token)) => Some(Owner::Guest(GuestToken(token))),
            _ => None,
        }
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::User(id) => write!(f, "user:{id}"),
            Owner::Guest(token) => write!(f, "guest:{token}"),
        }
    }
}

impl From<UserId> for Owner {
    fn from(id: UserId) -> Self {
        Owner::User(id)
    }
}

impl From<GuestToken> for Owner {
    fn from(token: GuestToken) -> Self {
        Owner::Guest(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(GuestToken::generate(), GuestToken::generate());
    }

    #[test]
    fn from_columns_requires_exactly_one() {
        assert_eq!(
            Owner::from_columns(Some(1), None),
            Some(Owner::User(UserId::new(1)))
        );
        assert_eq!(
            Owner::from_columns(None, Some("abc".into())),
            Some(Owner::Guest(GuestToken::new("abc")))
        );
        assert_eq!(Owner::from_columns(None, None), None);
        assert_eq!(Owner::from_columns(Some(1), Some("abc".into())), None);
    }

    #[test]
    fn accessors_match_variant() {
        let user = Owner::User(UserId::new(3));
        assert_eq!(user.user_id(), Some(UserId::new(3)));
        assert!(user.guest_token().is_none());

        let guest = Owner::Guest(GuestToken::new("t"));
        assert!(guest.user_id().is_none());
        assert_eq!(guest.guest_token().map(GuestToken::as_str), Some("t"));
    }

    #[test]
    fn display_is_tagged() {
        assert_eq!(Owner::User(UserId::new(5)).to_string(), "user:5");
        assert_eq!(Owner::Guest(GuestToken::new("x")).to_string(), "guest:x");
    }
}
