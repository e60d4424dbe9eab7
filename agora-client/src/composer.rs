use std::sync::Arc;

use crate::{
    api::{
        fields, BlobStore, Collection, CommentId, DocumentId, DocumentStore, Error as ApiError,
        Fields, ImageUpload, NewComment, NewPost, NewTopic, Post, PostEdit, PostId, Query, Time,
        Topic, TopicId, TopicSettings, Update, User, Value,
    },
    mapping::FromDocument,
    Error, Result,
};

/// Where an image attached to a post is uploaded
pub fn image_path(file_name: &str, now: Time) -> String {
    format!("images/{}_{file_name}", now.timestamp_millis())
}

/// Writes new content, and the counters that go with it
pub struct Composer {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

fn own_upvote(user: &User) -> Value {
    Value::Map(fields([(user.id.as_str(), Value::from("up"))]))
}

impl Composer {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Composer {
        Composer { store, blobs }
    }

    /// Runs a follow-up counter update. Its failure leaves the counter
    /// drifting, which is logged but not reported to the caller.
    async fn best_effort(&self, collection: Collection, id: &str, update: Update, what: &str) {
        let id = DocumentId(String::from(id));
        if let Err(err) = self.store.update(collection, &id, update).await {
            tracing::warn!(?err, %collection, %id, "failed {what}");
        }
    }

    async fn upload_image(&self, image: ImageUpload) -> Result<String> {
        let path = image_path(&image.file_name, chrono::Utc::now());
        self.blobs
            .upload(&path, image.data, &image.content_type)
            .await
            .map_err(|err| {
                tracing::error!(?err, %path, "failed uploading image");
                err
            })?;
        Ok(self.blobs.download_url(&path).await?)
    }

    pub async fn submit_post(&self, user: Option<&User>, post: NewPost) -> Result<PostId> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        post.validate()?;
        let image_url = match post.image {
            Some(image) => Some(self.upload_image(image).await?),
            None => None,
        };
        let doc = fields([
            ("subject", Value::from(post.subject.trim())),
            ("content", Value::from(post.content.trim())),
            ("author", Value::from(user.name())),
            ("authorId", Value::from(user.id.as_str())),
            ("topicId", Value::from(post.topic_id.as_ref().map(|t| t.0.as_str()))),
            ("imageUrl", Value::from(image_url)),
            ("votes", Value::from(1)),
            ("userVotes", own_upvote(user)),
            ("commentCount", Value::from(0)),
            ("createdAt", Value::PendingTimestamp),
        ]);
        let id = self.store.add(Collection::Posts, doc).await.map_err(|err| {
            tracing::error!(?err, "failed creating post");
            err
        })?;
        tracing::info!(post = %id, user = %user.id, "created post");
        if let Some(topic) = &post.topic_id {
            let update = Update::new()
                .increment("postCount", 1)
                .server_timestamp("lastActivityAt");
            self.best_effort(Collection::Topics, &topic.0, update, "bumping topic post count")
                .await;
        }
        Ok(PostId(id.0))
    }

    pub async fn submit_comment(&self, user: Option<&User>, comment: NewComment) -> Result<CommentId> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        comment.validate()?;
        let doc = fields([
            ("postId", Value::from(comment.post_id.0.as_str())),
            ("content", Value::from(comment.content.trim())),
            ("author", Value::from(user.name())),
            ("authorId", Value::from(user.id.as_str())),
            ("votes", Value::from(1)),
            ("userVotes", own_upvote(user)),
            ("createdAt", Value::PendingTimestamp),
        ]);
        let id = self.store.add(Collection::Comments, doc).await.map_err(|err| {
            tracing::error!(?err, post = %comment.post_id, "failed creating comment");
            err
        })?;
        self.best_effort(
            Collection::Posts,
            &comment.post_id.0,
            Update::new().increment("commentCount", 1),
            "bumping post comment count",
        )
        .await;
        Ok(CommentId(id.0))
    }

    /// Creates a topic, with `user` as its first member and moderator
    pub async fn create_topic(&self, user: Option<&User>, topic: NewTopic) -> Result<Topic> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        topic.validate()?;
        let slug = topic.slug();
        let taken = Query::collection(Collection::Topics)
            .filter_eq("urlName", slug.as_str())
            .limit(1);
        if !self.store.query(&taken).await?.is_empty() {
            return Err(ApiError::SlugAlreadyUsed(slug).into());
        }

        let settings = TopicSettings::default();
        let doc = fields([
            ("name", Value::from(topic.name.trim())),
            ("urlName", Value::from(slug.as_str())),
            ("description", Value::from(topic.description.trim())),
            ("category", Value::from(topic.category.as_str())),
            ("rules", Value::from(topic.rules.as_deref().map(str::trim).unwrap_or(""))),
            ("createdBy", Value::from(user.id.as_str())),
            ("creatorName", Value::from(user.name())),
            ("createdAt", Value::PendingTimestamp),
            ("updatedAt", Value::PendingTimestamp),
            ("lastActivityAt", Value::PendingTimestamp),
            ("memberCount", Value::from(1)),
            ("postCount", Value::from(0)),
            ("members", Value::from(vec![user.id.as_str()])),
            ("moderators", Value::from(vec![user.id.as_str()])),
            ("isPrivate", Value::from(false)),
            ("isNSFW", Value::from(false)),
            ("settings", settings_value(&settings)),
        ]);
        let id = self.store.add(Collection::Topics, doc).await.map_err(|err| {
            tracing::error!(?err, %slug, "failed creating topic");
            err
        })?;
        tracing::info!(topic = %id, %slug, "created topic");

        let update = Update::new()
            .array_union("topics", id.as_str())
            .array_union("moderatingTopics", id.as_str());
        self.best_effort(Collection::Users, user.id.as_str(), update, "recording topic on user")
            .await;

        let doc = self
            .store
            .get(Collection::Topics, &id)
            .await?
            .ok_or_else(|| ApiError::not_found(Collection::Topics, id.as_str()))?;
        Ok(Topic::from_document(&doc, chrono::Utc::now())?)
    }

    /// Changes the text of `post`. Allowed to its author and to the
    /// moderators of its topic, which must then be passed as `topic`.
    pub async fn edit_post(
        &self,
        user: Option<&User>,
        post: &Post,
        topic: Option<&Topic>,
        edit: PostEdit,
    ) -> Result<Post> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        let moderates = match (topic, &post.topic_id) {
            (Some(t), Some(tid)) => t.id == *tid && t.is_moderator(&user.id),
            _ => false,
        };
        if post.author_id != user.id && !moderates {
            return Err(Error::permission_denied());
        }
        edit.validate()?;
        let update = Update::new()
            .set("subject", edit.subject.trim())
            .set("content", edit.content.trim())
            .server_timestamp("updatedAt");
        let id = DocumentId(post.id.0.clone());
        self.store.update(Collection::Posts, &id, update).await?;
        let mut res = post.clone();
        res.subject = String::from(edit.subject.trim());
        res.content = String::from(edit.content.trim());
        res.updated_at = Some(chrono::Utc::now());
        Ok(res)
    }

    pub async fn delete_post(&self, user: Option<&User>, post: &Post) -> Result<()> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        if post.author_id != user.id {
            return Err(Error::permission_denied());
        }
        let id = DocumentId(post.id.0.clone());
        // The store reports success when deleting a missing document
        if self.store.get(Collection::Posts, &id).await?.is_none() {
            return Err(ApiError::not_found(Collection::Posts, id.as_str()).into());
        }
        self.store.delete(Collection::Posts, &id).await?;
        tracing::info!(post = %post.id, "deleted post");
        if let Some(TopicId(topic)) = &post.topic_id {
            self.best_effort(
                Collection::Topics,
                topic,
                Update::new().increment("postCount", -1),
                "decrementing topic post count",
            )
            .await;
        }
        Ok(())
    }
}

fn settings_value(s: &TopicSettings) -> Value {
    let f: Fields = fields([
        ("allowImages", Value::from(s.allow_images)),
        ("allowPolls", Value::from(s.allow_polls)),
        ("allowLinks", Value::from(s.allow_links)),
        ("requireModeratorApproval", Value::from(s.require_moderator_approval)),
    ]);
    Value::Map(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Category, Comment, UserId, VoteDirection};
    use agora_mock_server::MockServer;
    use chrono::TimeZone;

    fn user(id: &str) -> User {
        User {
            id: UserId(String::from(id)),
            email: None,
            display_name: Some(String::from(id)),
            email_verified: true,
        }
    }

    fn setup() -> (MockServer, Composer) {
        let srv = MockServer::new();
        let composer = Composer::new(Arc::new(srv.clone()), Arc::new(srv.clone()));
        (srv, composer)
    }

    fn new_post(subject: &str, content: &str, topic: Option<&TopicId>) -> NewPost {
        NewPost {
            subject: String::from(subject),
            content: String::from(content),
            topic_id: topic.cloned(),
            image: None,
        }
    }

    fn new_topic(name: &str) -> NewTopic {
        NewTopic {
            name: String::from(name),
            description: String::from("A place to talk about it"),
            category: Category::Technology,
            rules: None,
        }
    }

    fn stored_post(srv: &MockServer, id: &PostId) -> Post {
        let doc = srv.test_document(Collection::Posts, &id.0).unwrap();
        Post::from_document(&doc, chrono::Utc::now()).unwrap()
    }

    #[test]
    fn image_paths() {
        let t = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(image_path("cat.png", t), "images/1700000000123_cat.png");
    }

    #[tokio::test]
    async fn posts_start_with_their_authors_upvote() {
        let (srv, composer) = setup();
        let alice = user("alice");
        let id = composer
            .submit_post(Some(&alice), new_post(" Hello ", "World", None))
            .await
            .unwrap();
        let p = stored_post(&srv, &id);
        assert_eq!(p.subject, "Hello");
        assert_eq!(p.votes, 1);
        assert_eq!(p.user_votes.get(&alice.id), Some(&VoteDirection::Up));
        assert_eq!(p.comment_count, 0);
        assert_eq!(p.author_name, "alice");
    }

    #[tokio::test]
    async fn blank_content_never_reaches_the_store() {
        let (srv, composer) = setup();
        let alice = user("alice");
        assert!(composer
            .submit_post(Some(&alice), new_post("   ", "\t", None))
            .await
            .is_err());
        let comment = NewComment {
            post_id: PostId(String::from("p")),
            content: String::from("  \n "),
        };
        assert!(composer.submit_comment(Some(&alice), comment).await.is_err());
        assert!(composer
            .submit_post(None, new_post("Hello", "World", None))
            .await
            .is_err());
        assert_eq!(srv.test_request_count(), 0);
    }

    #[tokio::test]
    async fn images_are_uploaded_first() {
        let (srv, composer) = setup();
        let alice = user("alice");
        let mut post = new_post("Look", "at this", None);
        post.image = Some(ImageUpload {
            file_name: String::from("cat.png"),
            content_type: String::from("image/png"),
            data: vec![0x89, 0x50],
        });

        srv.fail_uploads(Some("quota exceeded"));
        let err = composer
            .submit_post(Some(&alice), post.clone())
            .await
            .unwrap_err();
        assert_eq!(err.notice(), "Error uploading image");
        assert!(srv.test_documents(Collection::Posts).is_empty());

        srv.fail_uploads(None);
        let id = composer.submit_post(Some(&alice), post).await.unwrap();
        let url = stored_post(&srv, &id).image_url.unwrap();
        let path = url.strip_prefix("mock://").unwrap();
        assert!(path.starts_with("images/") && path.ends_with("_cat.png"));
        assert_eq!(srv.test_blob(path).unwrap().data, vec![0x89, 0x50]);
    }

    #[tokio::test]
    async fn comments_bump_the_post() {
        let (srv, composer) = setup();
        let alice = user("alice");
        let post = composer
            .submit_post(Some(&alice), new_post("Hello", "World", None))
            .await
            .unwrap();
        for text in ["first", "second"] {
            let c = NewComment {
                post_id: post.clone(),
                content: String::from(text),
            };
            composer.submit_comment(Some(&user("bob")), c).await.unwrap();
        }
        assert_eq!(stored_post(&srv, &post).comment_count, 2);
        let comments = srv.test_documents(Collection::Comments);
        assert_eq!(comments.len(), 2);
        let c = Comment::from_document(&comments[0], chrono::Utc::now()).unwrap();
        assert_eq!(c.votes, 1);
        assert_eq!(c.user_votes.get(&UserId(String::from("bob"))), Some(&VoteDirection::Up));
    }

    #[tokio::test]
    async fn topics_get_unique_slugs() {
        let (srv, composer) = setup();
        let (a, b) = (user("a"), user("b"));
        let t = composer
            .create_topic(Some(&a), new_topic("Web Development"))
            .await
            .unwrap();
        assert_eq!(t.url_name, "web-development");
        assert_eq!(t.member_count, 1);
        assert_eq!(t.post_count, 0);
        assert!(t.is_member(&a.id) && t.is_moderator(&a.id));
        assert!(t.moderators.contains(&a.id));
        assert_eq!(t.settings, TopicSettings::default());

        let writes = srv.test_documents(Collection::Topics).len();
        let err = composer
            .create_topic(Some(&b), new_topic("web  development"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Api(ApiError::SlugAlreadyUsed(ref s)) if s == "web-development"
        ));
        assert_eq!(srv.test_documents(Collection::Topics).len(), writes);
    }

    #[tokio::test]
    async fn topic_posts_bump_counters() {
        let (srv, composer) = setup();
        let a = user("a");
        let t = composer.create_topic(Some(&a), new_topic("Rust")).await.unwrap();
        let id = composer
            .submit_post(Some(&a), new_post("Hi", "there", Some(&t.id)))
            .await
            .unwrap();
        let doc = srv.test_document(Collection::Topics, &t.id.0).unwrap();
        let after = Topic::from_document(&doc, chrono::Utc::now()).unwrap();
        assert_eq!(after.post_count, 1);
        assert!(after.last_activity_at >= t.last_activity_at);

        let post = stored_post(&srv, &id);
        composer.delete_post(Some(&a), &post).await.unwrap();
        let doc = srv.test_document(Collection::Topics, &t.id.0).unwrap();
        assert_eq!(doc.get("postCount"), Some(&Value::Integer(0)));
        assert!(srv.test_documents(Collection::Posts).is_empty());
    }

    #[tokio::test]
    async fn deleting_twice_counts_once() {
        let (srv, composer) = setup();
        let a = user("a");
        let t = composer.create_topic(Some(&a), new_topic("Rust")).await.unwrap();
        let mut ids = Vec::new();
        for subject in ["one", "two"] {
            let id = composer
                .submit_post(Some(&a), new_post(subject, "body", Some(&t.id)))
                .await
                .unwrap();
            ids.push(id);
        }
        let post = stored_post(&srv, &ids[0]);
        composer.delete_post(Some(&a), &post).await.unwrap();
        assert!(matches!(
            composer.delete_post(Some(&a), &post).await,
            Err(Error::Api(ApiError::NotFound { .. }))
        ));
        assert_eq!(srv.test_documents(Collection::Posts).len(), 1);
        let doc = srv.test_document(Collection::Topics, &t.id.0).unwrap();
        assert_eq!(doc.get("postCount"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn edit_and_delete_permissions() {
        let (srv, composer) = setup();
        let (owner, author, other) = (user("owner"), user("author"), user("other"));
        let t = composer.create_topic(Some(&owner), new_topic("Rust")).await.unwrap();
        let id = composer
            .submit_post(Some(&author), new_post("Hi", "there", Some(&t.id)))
            .await
            .unwrap();
        let post = stored_post(&srv, &id);
        let edit = PostEdit {
            subject: String::from("Hi!"),
            content: String::from("there!"),
        };

        assert!(matches!(
            composer.edit_post(Some(&other), &post, Some(&t), edit.clone()).await,
            Err(Error::Api(ApiError::PermissionDenied))
        ));
        let edited = composer
            .edit_post(Some(&owner), &post, Some(&t), edit.clone())
            .await
            .unwrap();
        assert_eq!(edited.subject, "Hi!");
        let stored = stored_post(&srv, &id);
        assert_eq!(stored.content, "there!");
        assert!(stored.updated_at.is_some());

        // Moderators may edit, but only authors delete
        assert!(matches!(
            composer.delete_post(Some(&owner), &stored).await,
            Err(Error::Api(ApiError::PermissionDenied))
        ));
        composer.delete_post(Some(&author), &stored).await.unwrap();
    }

    #[tokio::test]
    async fn counter_failures_do_not_fail_the_comment() {
        let (srv, composer) = setup();
        // No such post: the comment is written, the counter update fails
        let c = NewComment {
            post_id: PostId(String::from("ghost")),
            content: String::from("hello?"),
        };
        composer.submit_comment(Some(&user("a")), c).await.unwrap();
        assert_eq!(srv.test_documents(Collection::Comments).len(), 1);
    }
}
