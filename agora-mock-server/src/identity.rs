use agora_api::{
    Error, FederatedProvider, IdentityProvider, NewUser, Persistence, User, UserId, Uuid,
};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::MockServer;

#[derive(Debug)]
pub(crate) struct Account {
    user: User,
    /// `None` for accounts that never set a password
    password: Option<String>,
}

fn auth_error(code: &str) -> Error {
    Error::Auth(format!("Firebase: Error (auth/{code})."))
}

fn new_account(email: &str, password: Option<String>, verified: bool) -> Account {
    Account {
        user: User {
            id: UserId(Uuid::new_v4().simple().to_string()),
            email: Some(String::from(email)),
            display_name: None,
            email_verified: verified,
        },
        password,
    }
}

/// One client's view of the identity provider: accounts are shared through
/// the server, the signed-in user is per client
pub struct MockIdentity {
    server: MockServer,
    state: watch::Sender<Option<User>>,
    persistence: Mutex<Persistence>,
}

impl MockServer {
    pub fn identity(&self) -> MockIdentity {
        let (state, _) = watch::channel(None);
        MockIdentity {
            server: self.clone(),
            state,
            persistence: Mutex::new(Persistence::default()),
        }
    }

    /// Account returned by the next federated sign-in popups
    pub fn set_federated_account(&self, email: &str, display_name: &str) {
        self.0.lock().federated_account = Some((String::from(email), String::from(display_name)));
    }

    /// A pending sign-in link mailed to `email`
    pub fn test_sign_in_link(&self, email: &str) -> Option<String> {
        self.0
            .lock()
            .sign_in_links
            .iter()
            .rev()
            .find(|(_, e)| *e == email)
            .map(|(link, _)| link.clone())
    }

    pub fn test_verification_emails(&self) -> Vec<String> {
        self.0.lock().verification_emails.clone()
    }
}

impl MockIdentity {
    pub fn persistence(&self) -> Persistence {
        *self.persistence.lock()
    }

    fn current(&self) -> Result<User, Error> {
        self.state.borrow().clone().ok_or(Error::NotAuthenticated)
    }

    fn signed_in(&self, user: User) -> User {
        tracing::debug!(user = %user.id, "signed in");
        self.state.send_replace(Some(user.clone()));
        user
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentity {
    fn auth_state(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }

    async fn sign_up(&self, new_user: &NewUser) -> Result<User, Error> {
        let user = {
            let mut inner = self.server.0.lock();
            if !new_user.email.contains('@') {
                return Err(auth_error("invalid-email"));
            }
            if new_user.password.chars().count() < 6 {
                return Err(Error::Auth(String::from(
                    "Firebase: Password should be at least 6 characters (auth/weak-password).",
                )));
            }
            if inner.accounts.contains_key(&new_user.email) {
                return Err(auth_error("email-already-in-use"));
            }
            let account = new_account(&new_user.email, Some(new_user.password.clone()), false);
            let user = account.user.clone();
            inner.accounts.insert(new_user.email.clone(), account);
            user
        };
        Ok(self.signed_in(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, Error> {
        let user = {
            let inner = self.server.0.lock();
            let account = inner
                .accounts
                .get(email)
                .ok_or_else(|| auth_error("user-not-found"))?;
            if account.password.as_deref() != Some(password) {
                return Err(auth_error("wrong-password"));
            }
            account.user.clone()
        };
        Ok(self.signed_in(user))
    }

    async fn sign_in_federated(&self, provider: FederatedProvider) -> Result<User, Error> {
        let user = {
            let mut inner = self.server.0.lock();
            let Some((email, name)) = inner.federated_account.clone() else {
                return Err(auth_error("popup-closed-by-user"));
            };
            tracing::debug!(?provider, %email, "federated sign-in");
            let account = inner
                .accounts
                .entry(email.clone())
                .or_insert_with(|| new_account(&email, None, true));
            if account.user.display_name.is_none() {
                account.user.display_name = Some(name);
            }
            account.user.clone()
        };
        Ok(self.signed_in(user))
    }

    async fn send_email_verification(&self) -> Result<(), Error> {
        let user = self.current()?;
        let email = user.email.ok_or_else(|| auth_error("missing-email"))?;
        self.server.0.lock().verification_emails.push(email);
        Ok(())
    }

    async fn send_sign_in_link(&self, email: &str, continue_url: &str) -> Result<(), Error> {
        if !email.contains('@') {
            return Err(auth_error("invalid-email"));
        }
        let link = format!("{continue_url}?mode=signIn&oobCode={}", Uuid::new_v4().simple());
        self.server
            .0
            .lock()
            .sign_in_links
            .insert(link, String::from(email));
        Ok(())
    }

    async fn sign_in_with_email_link(&self, email: &str, link: &str) -> Result<User, Error> {
        let user = {
            let mut inner = self.server.0.lock();
            match inner.sign_in_links.get(link) {
                Some(e) if e == email => (),
                _ => return Err(auth_error("invalid-action-code")),
            }
            inner.sign_in_links.remove(link);
            let account = inner
                .accounts
                .entry(String::from(email))
                .or_insert_with(|| new_account(email, None, true));
            account.user.email_verified = true;
            account.user.clone()
        };
        Ok(self.signed_in(user))
    }

    async fn update_display_name(&self, name: &str) -> Result<User, Error> {
        let user = self.current()?;
        let user = {
            let mut inner = self.server.0.lock();
            let account = inner
                .accounts
                .values_mut()
                .find(|a| a.user.id == user.id)
                .ok_or_else(|| auth_error("user-not-found"))?;
            account.user.display_name = Some(String::from(name));
            account.user.clone()
        };
        Ok(self.signed_in(user))
    }

    async fn set_persistence(&self, persistence: Persistence) -> Result<(), Error> {
        *self.persistence.lock() = persistence;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), Error> {
        if let Some(u) = self.state.send_replace(None) {
            tracing::debug!(user = %u.id, "signed out");
        }
        Ok(())
    }
}
