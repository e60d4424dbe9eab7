use std::fmt;

use crate::{char_len, validate_string, Error, FieldErrors, STUB_UUID};

pub const PASSWORD_MIN_LEN: usize = 6;
pub const DISPLAY_NAME_MIN_LEN: usize = 3;

/// Identity assigned by the identity provider
#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub String);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as the key of a map field, such as the vote map. A dot would be
    /// read as a nested field path.
    pub fn field_key(&self) -> Result<&str, Error> {
        match self.0.is_empty() || self.0.contains('.') {
            true => Err(Error::Unknown(format!(
                "user id {:?} cannot be used as a field name",
                self.0
            ))),
            false => Ok(&self.0),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

impl User {
    /// Name shown next to the user's content
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("anonymous")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), Error> {
        validate_string(&self.email)?;
        validate_string(&self.password)?;
        validate_string(&self.display_name)?;
        let mut errs = FieldErrors::new();
        if self.email.trim().is_empty() {
            errs.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errs.add("password", "Password is required");
        } else if char_len(&self.password) < PASSWORD_MIN_LEN {
            errs.add("password", "Password should be at least 6 characters");
        }
        let name = self.display_name.trim();
        if name.is_empty() {
            errs.add("display_name", "Display name is required");
        } else if char_len(name) < DISPLAY_NAME_MIN_LEN {
            errs.add("display_name", "Username should be at least 3 characters");
        }
        errs.into_result()
    }
}
