use std::sync::Arc;

use crate::{
    api::{Collection, DocumentId, DocumentStore, Error as ApiError, Topic, Update, User},
    mapping::FromDocument,
    Error, Result,
};

pub struct MembershipTracker {
    store: Arc<dyn DocumentStore>,
}

impl MembershipTracker {
    pub fn new(store: Arc<dyn DocumentStore>) -> MembershipTracker {
        MembershipTracker { store }
    }

    /// Adds `user` to the members of `topic`. Already being a member is not
    /// an error, and does not write anything.
    ///
    /// Membership is checked against the stored topic, so that passing the
    /// same outdated `topic` twice still counts a single join.
    pub async fn join(&self, topic: &Topic, user: Option<&User>) -> Result<Topic> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        let current = self.stored(topic).await?;
        self.join_stored(current, user).await
    }

    /// Removes `user` from the members of `topic`. The creator of a topic
    /// always stays a member.
    pub async fn leave(&self, topic: &Topic, user: Option<&User>) -> Result<Topic> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        if topic.created_by == user.id {
            return Err(Error::permission_denied());
        }
        let current = self.stored(topic).await?;
        self.leave_stored(current, user).await
    }

    /// Joins or leaves depending on whether `user` is currently a member
    pub async fn toggle(&self, topic: &Topic, user: Option<&User>) -> Result<Topic> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        let current = self.stored(topic).await?;
        match current.is_member(&user.id) {
            true if current.created_by == user.id => Err(Error::permission_denied()),
            true => self.leave_stored(current, user).await,
            false => self.join_stored(current, user).await,
        }
    }

    async fn stored(&self, topic: &Topic) -> Result<Topic> {
        let id = DocumentId(topic.id.0.clone());
        let doc = self
            .store
            .get(Collection::Topics, &id)
            .await?
            .ok_or_else(|| ApiError::not_found(Collection::Topics, id.as_str()))?;
        Ok(Topic::from_document(&doc, chrono::Utc::now())?)
    }

    async fn join_stored(&self, mut topic: Topic, user: &User) -> Result<Topic> {
        if topic.is_member(&user.id) {
            return Ok(topic);
        }
        let update = Update::new()
            .array_union("members", user.id.as_str())
            .increment("memberCount", 1);
        self.send(&topic, update).await?;
        topic.members.insert(user.id.clone());
        topic.member_count += 1;
        Ok(topic)
    }

    async fn leave_stored(&self, mut topic: Topic, user: &User) -> Result<Topic> {
        if !topic.is_member(&user.id) {
            return Ok(topic);
        }
        let update = Update::new()
            .array_remove("members", user.id.as_str())
            .increment("memberCount", -1);
        self.send(&topic, update).await?;
        topic.members.remove(&user.id);
        topic.member_count -= 1;
        Ok(topic)
    }

    async fn send(&self, topic: &Topic, update: Update) -> Result<()> {
        let id = DocumentId(topic.id.0.clone());
        self.store
            .update(Collection::Topics, &id, update)
            .await
            .map_err(|err| {
                tracing::error!(?err, topic = %topic.id, "failed updating topic membership");
                err.into()
            })
    }
}
