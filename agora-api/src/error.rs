use std::{collections::BTreeMap, fmt};

use crate::Collection;

/// Per-field validation messages, keyed by form field name
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> FieldErrors {
        FieldErrors(BTreeMap::new())
    }

    /// Records `msg` for `field`, keeping the first message if one is already there
    pub fn add(&mut self, field: &'static str, msg: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| msg.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|m| m as &str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(f, m)| (*f, m as &str))
    }

    /// Turns the collected messages into a `Result`
    pub fn into_result(self) -> Result<(), Error> {
        match self.is_empty() {
            true => Ok(()),
            false => Err(Error::Validation(self)),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, msg) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {msg}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Permission denied")]
    PermissionDenied,

    /// Message returned by the identity provider, kept verbatim
    #[error("{0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Topic slug already used {0}")]
    SlugAlreadyUsed(String),

    #[error("Document {collection}/{id} not found")]
    NotFound { collection: Collection, id: String },

    #[error("Malformed document {collection}/{id}: {reason}")]
    MalformedDocument {
        collection: Collection,
        id: String,
        reason: String,
    },

    /// Read or write failure reported by the document store
    #[error("Store error: {0}")]
    Store(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),
}

impl Error {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Error {
        Error::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Whether the store rejected a query because its composite index is not
    /// (yet) available. The store does not give us a code for this, only a
    /// message that talks about the index.
    pub fn is_index_error(&self) -> bool {
        match self {
            Error::Store(msg) => msg.to_lowercase().contains("index"),
            _ => false,
        }
    }

    /// Short text suitable for a toast or banner
    pub fn notice(&self) -> String {
        match self {
            Error::Unknown(_) => String::from("Something went wrong, please try again"),
            Error::NotAuthenticated => String::from("Please log in to continue"),
            Error::PermissionDenied => String::from("You are not allowed to do this"),
            Error::Auth(msg) => msg.clone(),
            Error::Validation(_) => String::from("Please fix the errors before submitting"),
            Error::SlugAlreadyUsed(_) => String::from("A topic with this name already exists"),
            Error::NotFound { collection, .. } => match collection {
                Collection::Topics => String::from("Topic not found"),
                Collection::Posts => String::from("Post not found"),
                Collection::Comments => String::from("Comment not found"),
                Collection::Users => String::from("User not found"),
            },
            Error::MalformedDocument { .. } => String::from("Received invalid data from the server"),
            Error::Store(_) if self.is_index_error() => String::from(
                "This view is still being prepared, please try again in a few minutes",
            ),
            Error::Store(_) => String::from("Something went wrong, please try again"),
            Error::Upload(_) => String::from("Error uploading image"),
            Error::NullByteInString(_) => String::from("Text contains invalid characters"),
            Error::FeatureDisabled(what) => format!("{what} is not available"),
        }
    }
}
