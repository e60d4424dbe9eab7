use std::sync::Arc;

use crate::{
    api::{
        Collection, Comment, DocumentId, DocumentStore, Post, Update, User, Votable, VoteChange,
        VoteDirection,
    },
    Error, Result,
};

/// Something users can vote on, stored in its own document
pub trait VoteTarget: Votable + Clone {
    const COLLECTION: Collection;

    fn document_id(&self) -> DocumentId;
}

impl VoteTarget for Post {
    const COLLECTION: Collection = Collection::Posts;

    fn document_id(&self) -> DocumentId {
        DocumentId(self.id.0.clone())
    }
}

impl VoteTarget for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn document_id(&self) -> DocumentId {
        DocumentId(self.id.0.clone())
    }
}

pub struct VoteLedger {
    store: Arc<dyn DocumentStore>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> VoteLedger {
        VoteLedger { store }
    }

    /// Records `user`'s click on the `direction` arrow of `target`, and returns
    /// `target` as it should look afterwards.
    ///
    /// The score change and the vote map entry are sent as a single update,
    /// the score going through the store's atomic increment.
    pub async fn apply_vote<T: VoteTarget>(
        &self,
        user: Option<&User>,
        target: &T,
        direction: VoteDirection,
    ) -> Result<T> {
        let user = user.ok_or_else(Error::not_authenticated)?;
        let change = VoteChange::compute(target.vote_of(&user.id), direction);
        let entry = format!("userVotes.{}", user.id.field_key()?);
        let update = Update::new().increment("votes", change.delta);
        let update = match change.current {
            Some(dir) => update.set(entry, dir.as_str()),
            None => update.delete(entry),
        };
        let id = target.document_id();
        if let Err(err) = self.store.update(T::COLLECTION, &id, update).await {
            tracing::error!(?err, collection = %T::COLLECTION, %id, "failed recording vote");
            return Err(err.into());
        }
        let mut res = target.clone();
        res.record_vote(&user.id, &change);
        Ok(res)
    }
}
