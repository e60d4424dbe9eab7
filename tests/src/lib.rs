//! Fixtures for running several forum clients against one in-memory backend

use std::sync::Arc;

use agora_api::{Collection, Document, NewUser, User};
use agora_client::{Backend, Forum, ForumConfig, MemoryStorage};
use agora_mock_server::MockServer;

pub use agora_api as api;
pub use agora_client as client;

/// A backend shared by every client created from it
#[derive(Clone, Default)]
pub struct World {
    pub srv: MockServer,
}

impl World {
    pub fn new() -> World {
        World {
            srv: MockServer::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        Backend {
            store: Arc::new(self.srv.clone()),
            identity: Arc::new(self.srv.identity()),
            blobs: Arc::new(self.srv.clone()),
        }
    }

    /// A fresh client, signed out, with its own local storage
    pub fn client(&self) -> Forum {
        self.client_with(ForumConfig::default())
    }

    pub fn client_with(&self, config: ForumConfig) -> Forum {
        Forum::new(self.backend(), Arc::new(MemoryStorage::new()), config)
    }

    /// A fresh client on which `name` just signed up
    pub async fn user(&self, name: &str) -> (Forum, User) {
        let forum = self.client();
        let user = forum
            .session()
            .sign_up(new_user(name))
            .await
            .unwrap_or_else(|err| panic!("signing up {name}: {err}"));
        (forum, user)
    }

    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.srv.test_documents(collection)
    }
}

pub fn email(name: &str) -> String {
    format!("{name}@example.org")
}

pub const PASSWORD: &str = "hunter22";

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        email: email(name),
        password: String::from(PASSWORD),
        display_name: String::from(name),
    }
}
