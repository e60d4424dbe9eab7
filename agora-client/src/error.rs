use crate::api::Error as ApiError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_authenticated() -> Error {
        Error::Api(ApiError::NotAuthenticated)
    }

    pub fn permission_denied() -> Error {
        Error::Api(ApiError::PermissionDenied)
    }

    pub fn feature_disabled(what: &str) -> Error {
        Error::Api(ApiError::FeatureDisabled(String::from(what)))
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            Error::Anyhow(_) => None,
        }
    }

    /// Text to show the user
    pub fn notice(&self) -> String {
        match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal client error");
                String::from("Something went wrong, please try again")
            }
            Error::Api(err) => err.notice(),
        }
    }
}
