use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    api::{
        fields, Collection, DocumentId, DocumentStore, FederatedProvider, FieldErrors,
        IdentityProvider, NewUser, Time, User, Value,
    },
    storage::{last_activity_key, LocalStorage, EMAIL_FOR_SIGN_IN_KEY},
    Error, ForumConfig, Result,
};

/// Signs users in and out, and keeps track of when they were last active
pub struct AuthSession {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn LocalStorage>,
    config: ForumConfig,
    state: watch::Receiver<Option<User>>,
}

impl AuthSession {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn LocalStorage>,
        config: ForumConfig,
    ) -> AuthSession {
        let state = identity.auth_state();
        AuthSession {
            identity,
            store,
            storage,
            config,
            state,
        }
    }

    pub fn config(&self) -> &ForumConfig {
        &self.config
    }

    pub fn current(&self) -> Option<User> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every sign-in and sign-out
    pub fn watch(&self) -> watch::Receiver<Option<User>> {
        self.state.clone()
    }

    pub async fn sign_up(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;
        self.identity.set_persistence(self.config.persistence).await?;
        self.identity.sign_up(&new_user).await?;
        let user = self
            .identity
            .update_display_name(new_user.display_name.trim())
            .await?;
        tracing::info!(user = %user.id, "signed up");

        if self.config.features.email_verification {
            if let Err(err) = self.identity.send_email_verification().await {
                tracing::warn!(?err, user = %user.id, "failed sending verification email");
            }
        }
        self.write_user_document(&user, true).await;
        self.record_activity(&user, chrono::Utc::now());
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let mut errs = FieldErrors::new();
        if email.trim().is_empty() {
            errs.add("email", "Email is required");
        }
        if password.is_empty() {
            errs.add("password", "Password is required");
        }
        errs.into_result()?;
        self.identity.set_persistence(self.config.persistence).await?;
        let user = self.identity.sign_in(email.trim(), password).await?;
        tracing::info!(user = %user.id, "signed in");
        self.record_activity(&user, chrono::Utc::now());
        Ok(user)
    }

    pub async fn sign_in_federated(&self, provider: FederatedProvider) -> Result<User> {
        if !self.config.features.federated_sign_in {
            return Err(Error::feature_disabled("Federated sign-in"));
        }
        self.identity.set_persistence(self.config.persistence).await?;
        let user = self.identity.sign_in_federated(provider).await?;
        tracing::info!(user = %user.id, ?provider, "signed in");
        self.write_user_document(&user, false).await;
        self.record_activity(&user, chrono::Utc::now());
        Ok(user)
    }

    /// Mails a passwordless sign-in link to `email`
    pub async fn send_sign_in_link(&self, email: &str) -> Result<()> {
        if !self.config.features.email_link_sign_in {
            return Err(Error::feature_disabled("Email link sign-in"));
        }
        let email = email.trim();
        if email.is_empty() {
            let mut errs = FieldErrors::new();
            errs.add("email", "Email is required");
            errs.into_result()?;
        }
        self.identity
            .send_sign_in_link(email, &self.config.sign_in_link_url)
            .await?;
        self.storage.set(EMAIL_FOR_SIGN_IN_KEY, email)?;
        Ok(())
    }

    /// Finishes signing in from a link sent by `send_sign_in_link`. `email`
    /// is needed only when the link is opened on another device.
    pub async fn complete_sign_in_link(&self, link: &str, email: Option<&str>) -> Result<User> {
        if !self.config.features.email_link_sign_in {
            return Err(Error::feature_disabled("Email link sign-in"));
        }
        let email = match email {
            Some(e) => String::from(e.trim()),
            None => self.storage.get(EMAIL_FOR_SIGN_IN_KEY).unwrap_or_default(),
        };
        if email.is_empty() {
            let mut errs = FieldErrors::new();
            errs.add("email", "Please provide your email for confirmation");
            errs.into_result()?;
        }
        self.identity.set_persistence(self.config.persistence).await?;
        let user = self.identity.sign_in_with_email_link(&email, link).await?;
        self.storage.remove(EMAIL_FOR_SIGN_IN_KEY)?;
        tracing::info!(user = %user.id, "signed in with email link");
        self.write_user_document(&user, false).await;
        self.record_activity(&user, chrono::Utc::now());
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        let user = self.current();
        self.identity.sign_out().await?;
        if let Some(user) = user {
            tracing::info!(user = %user.id, "signed out");
            self.storage.remove(&last_activity_key(&user.id))?;
        }
        Ok(())
    }

    /// Remembers `now` as the last time `user` did something
    pub fn record_activity(&self, user: &User, now: Time) {
        let key = last_activity_key(&user.id);
        if let Err(err) = self.storage.set(&key, &now.timestamp_millis().to_string()) {
            tracing::warn!(?err, "failed recording last activity");
        }
    }

    pub fn last_activity(&self, user: &User) -> Option<Time> {
        let millis = self.storage.get(&last_activity_key(&user.id))?;
        let millis = millis.parse::<i64>().ok()?;
        chrono::TimeZone::timestamp_millis_opt(&chrono::Utc, millis).single()
    }

    /// Called on start-up. Signs out a user whose last recorded activity is
    /// older than the inactivity timeout, and returns whether a user is still
    /// signed in.
    pub async fn check_session(&self, now: Time) -> Result<bool> {
        let Some(user) = self.current() else {
            return Ok(false);
        };
        if let Some(last) = self.last_activity(&user) {
            let idle = now.signed_duration_since(last);
            let timeout = chrono::Duration::from_std(self.config.inactivity_timeout())
                .map_err(|e| Error::Anyhow(e.into()))?;
            if idle > timeout {
                tracing::info!(user = %user.id, %idle, "session expired while away");
                self.sign_out().await?;
                return Ok(false);
            }
        }
        self.record_activity(&user, now);
        Ok(true)
    }

    /// Best-effort copy of the user's profile in the `users` collection. A
    /// document that already exists is only overwritten when `overwrite`.
    async fn write_user_document(&self, user: &User, overwrite: bool) {
        let id = DocumentId(user.id.0.clone());
        if !overwrite {
            match self.store.get(Collection::Users, &id).await {
                Ok(Some(_)) => return,
                Ok(None) => (),
                Err(err) => {
                    tracing::warn!(?err, user = %user.id, "failed reading user document");
                    return;
                }
            }
        }
        let doc = fields([
            ("uid", Value::from(user.id.as_str())),
            ("email", Value::from(user.email.clone())),
            ("displayName", Value::from(user.name())),
            ("createdAt", Value::PendingTimestamp),
            ("topics", Value::Array(Vec::new())),
            ("moderatingTopics", Value::Array(Vec::new())),
        ]);
        if let Err(err) = self.store.set(Collection::Users, &id, doc).await {
            tracing::warn!(?err, user = %user.id, "failed writing user document");
        }
    }
}
