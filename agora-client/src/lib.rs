use std::sync::Arc;

mod composer;
pub use composer::{image_path, Composer};

mod config;
pub use config::{Features, ForumConfig};

mod discovery;
pub use discovery::{Discovery, Profile, TopicSort};

mod error;
pub use error::{Error, Result};

mod feed;
pub use feed::{comments_query, posts_query, Feed, FeedOrder, FeedState};

pub mod format;

mod history;
pub use history::SearchHistory;

mod mapping;
pub use mapping::{map_snapshot, FromDocument};

mod membership;
pub use membership::MembershipTracker;

mod route;
pub use route::Route;

mod session;
pub use session::AuthSession;

pub mod storage;
pub use storage::{JsonFileStorage, LocalStorage, MemoryStorage};

mod timeout;
pub use timeout::{ActivityEvent, SessionTimeout};

mod votes;
pub use votes::{VoteLedger, VoteTarget};

pub mod api {
    pub use agora_api::*;
}

use api::{
    BlobStore, Comment, CommentId, DocumentStore, IdentityProvider, NewComment, NewPost, NewTopic,
    Post, PostEdit, PostId, Topic, TopicId, User, VoteDirection,
};

/// The external services the forum runs on
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStore>,
}

/// All the forum components, acting on behalf of the signed-in user
pub struct Forum {
    config: ForumConfig,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn LocalStorage>,
    session: Arc<AuthSession>,
    votes: VoteLedger,
    membership: MembershipTracker,
    composer: Composer,
    discovery: Discovery,
}

impl Forum {
    pub fn new(backend: Backend, storage: Arc<dyn LocalStorage>, config: ForumConfig) -> Forum {
        let session = Arc::new(AuthSession::new(
            backend.identity.clone(),
            backend.store.clone(),
            storage.clone(),
            config.clone(),
        ));
        Forum {
            votes: VoteLedger::new(backend.store.clone()),
            membership: MembershipTracker::new(backend.store.clone()),
            composer: Composer::new(backend.store.clone(), backend.blobs.clone()),
            discovery: Discovery::new(backend.store.clone(), config.clone()),
            store: backend.store,
            storage,
            session,
            config,
        }
    }

    pub fn config(&self) -> &ForumConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current()
    }

    /// Starts the inactivity timer. It stops when the returned handle is dropped.
    pub fn start_session_timeout(&self) -> SessionTimeout {
        SessionTimeout::start(self.session.clone())
    }

    fn require_topics(&self) -> Result<()> {
        match self.config.features.topics {
            true => Ok(()),
            false => Err(Error::feature_disabled("Topics")),
        }
    }

    pub fn post_feed(&self, order: FeedOrder, topic: Option<&TopicId>) -> Result<Feed<Post>> {
        if topic.is_some() {
            self.require_topics()?;
        }
        Ok(Feed::open(&self.store, posts_query(order, topic)))
    }

    pub fn comment_feed(&self, post: &PostId) -> Feed<Comment> {
        Feed::open(&self.store, comments_query(post))
    }

    pub async fn vote_post(&self, post: &Post, direction: VoteDirection) -> Result<Post> {
        let user = self.current_user();
        self.votes.apply_vote(user.as_ref(), post, direction).await
    }

    pub async fn vote_comment(&self, comment: &Comment, direction: VoteDirection) -> Result<Comment> {
        let user = self.current_user();
        self.votes.apply_vote(user.as_ref(), comment, direction).await
    }

    pub async fn submit_post(&self, post: NewPost) -> Result<PostId> {
        if post.topic_id.is_some() {
            self.require_topics()?;
        }
        let user = self.current_user();
        self.composer.submit_post(user.as_ref(), post).await
    }

    pub async fn submit_comment(&self, comment: NewComment) -> Result<CommentId> {
        let user = self.current_user();
        self.composer.submit_comment(user.as_ref(), comment).await
    }

    pub async fn edit_post(&self, post: &Post, topic: Option<&Topic>, edit: PostEdit) -> Result<Post> {
        let user = self.current_user();
        self.composer.edit_post(user.as_ref(), post, topic, edit).await
    }

    pub async fn delete_post(&self, post: &Post) -> Result<()> {
        let user = self.current_user();
        self.composer.delete_post(user.as_ref(), post).await
    }

    pub async fn create_topic(&self, topic: NewTopic) -> Result<Topic> {
        self.require_topics()?;
        let user = self.current_user();
        self.composer.create_topic(user.as_ref(), topic).await
    }

    pub async fn join_topic(&self, topic: &Topic) -> Result<Topic> {
        self.require_topics()?;
        let user = self.current_user();
        self.membership.join(topic, user.as_ref()).await
    }

    pub async fn leave_topic(&self, topic: &Topic) -> Result<Topic> {
        self.require_topics()?;
        let user = self.current_user();
        self.membership.leave(topic, user.as_ref()).await
    }

    pub async fn toggle_membership(&self, topic: &Topic) -> Result<Topic> {
        self.require_topics()?;
        let user = self.current_user();
        self.membership.toggle(topic, user.as_ref()).await
    }

    /// Search history of the signed-in user
    pub fn search_history(&self) -> Result<SearchHistory> {
        let user = self.current_user().ok_or_else(Error::not_authenticated)?;
        Ok(SearchHistory::new(
            self.storage.clone(),
            &user.id,
            self.config.search_history_len,
        ))
    }

    /// Runs a topic search, remembering it in the user's history when signed in
    pub async fn search_topics(
        &self,
        search: &str,
        category: Option<api::Category>,
        sort: TopicSort,
    ) -> Result<Vec<Topic>> {
        self.require_topics()?;
        if let Ok(history) = self.search_history() {
            if let Err(err) = history.record(search) {
                tracing::warn!(?err, "failed recording search history");
            }
        }
        self.discovery.search_topics(search, category, sort).await
    }
}
