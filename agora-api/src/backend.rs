use std::pin::Pin;

use futures::Stream;
use tokio::sync::watch;

use crate::{Collection, Document, DocumentId, Error, Fields, NewUser, Query, Update, User};

/// Live query results: every item is the full, ordered result set at that time
pub type Subscription = Pin<Box<dyn Stream<Item = Result<Vec<Document>, Error>> + Send>>;

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &DocumentId) -> Result<Option<Document>, Error>;

    /// Creates a document with a store-assigned id
    async fn add(&self, collection: Collection, fields: Fields) -> Result<DocumentId, Error>;

    /// Creates or overwrites the document at `id`
    async fn set(&self, collection: Collection, id: &DocumentId, fields: Fields) -> Result<(), Error>;

    /// Applies `update` atomically. Fails with `Error::NotFound` if there is no
    /// such document.
    async fn update(&self, collection: Collection, id: &DocumentId, update: Update) -> Result<(), Error>;

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), Error>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, Error>;

    /// Opens a live query. Dropping the stream closes it.
    fn subscribe(&self, query: Query) -> Subscription;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persistence {
    /// Signed out when the browsing session ends
    Session,
    #[default]
    Durable,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current user, updated on every sign-in and sign-out
    fn auth_state(&self) -> watch::Receiver<Option<User>>;

    async fn sign_up(&self, new_user: &NewUser) -> Result<User, Error>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, Error>;
    async fn sign_in_federated(&self, provider: FederatedProvider) -> Result<User, Error>;
    async fn send_email_verification(&self) -> Result<(), Error>;
    async fn send_sign_in_link(&self, email: &str, continue_url: &str) -> Result<(), Error>;
    async fn sign_in_with_email_link(&self, email: &str, link: &str) -> Result<User, Error>;
    async fn update_display_name(&self, name: &str) -> Result<User, Error>;
    async fn set_persistence(&self, persistence: Persistence) -> Result<(), Error>;
    async fn sign_out(&self) -> Result<(), Error>;
}

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), Error>;
    async fn download_url(&self, path: &str) -> Result<String, Error>;
}
