//! User identity: the email address used verbatim as the store key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Validated email identity.
///
/// Never normalized: `A@x.com` and `a@x.com` are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
  /// Validate a raw identity string.
  ///
  /// # Errors
  ///
  /// [`ControllerError::Validation`] if the string is empty or has no `@`
  /// with text on both sides.
  pub fn parse(raw: &str) -> Result<Self, ControllerError> {
    if raw.is_empty() {
      return Err(ControllerError::Validation("identity is empty".to_string()));
    }

    match raw.split_once('@') {
      Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
        Ok(Self(raw.to_string()))
      }
      _ => Err(ControllerError::Validation(format!(
        "not an email address: {raw:?}"
      )))
    }
  }

  /// Identity as the raw key string.
  #[must_use]
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for Identity {
  type Error = ControllerError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<Identity> for String {
  fn from(value: Identity) -> Self {
    value.0
  }
}
