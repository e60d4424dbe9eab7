use std::collections::BTreeSet;

use crate::api::{
    Category, Collection, Comment, CommentId, Document, Error, Post, PostId, Time, Topic, TopicId,
    TopicSettings, UserId, Value, VoteDirection, VoteMap,
};

/// Local view model built from a stored document
pub trait FromDocument: Sized {
    const COLLECTION: Collection;

    /// `now` stands in for server timestamps that are not resolved yet
    fn from_document(doc: &Document, now: Time) -> Result<Self, Error>;
}

/// Maps a whole snapshot, skipping (and logging) the documents that do not map
pub fn map_snapshot<T: FromDocument>(docs: &[Document], now: Time) -> Vec<T> {
    docs.iter()
        .filter_map(|d| match T::from_document(d, now) {
            Ok(t) => Some(t),
            Err(err) => {
                tracing::warn!(?err, id = %d.id, "skipping malformed document");
                None
            }
        })
        .collect()
}

struct Reader<'a> {
    collection: Collection,
    doc: &'a Document,
    now: Time,
}

impl<'a> Reader<'a> {
    fn malformed(&self, reason: String) -> Error {
        Error::MalformedDocument {
            collection: self.collection,
            id: self.doc.id.0.clone(),
            reason,
        }
    }

    fn opt_string(&self, field: &str) -> Result<Option<String>, Error> {
        match self.doc.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v) => Err(self.malformed(format!("field {field} is not a string: {v:?}"))),
        }
    }

    fn string(&self, field: &str) -> Result<String, Error> {
        self.opt_string(field)?
            .ok_or_else(|| self.malformed(format!("missing field {field}")))
    }

    fn int_or_zero(&self, field: &str) -> Result<i64, Error> {
        match self.doc.get(field) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Integer(i)) => Ok(*i),
            Some(v) => Err(self.malformed(format!("field {field} is not an integer: {v:?}"))),
        }
    }

    fn flag(&self, field: &str) -> bool {
        self.doc.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    fn opt_time(&self, field: &str) -> Result<Option<Time>, Error> {
        match self.doc.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::PendingTimestamp) => Ok(Some(self.now)),
            Some(Value::Timestamp(ts)) => ts
                .to_time()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("field {field} is out of range"))),
            Some(v) => Err(self.malformed(format!("field {field} is not a timestamp: {v:?}"))),
        }
    }

    /// Creation times may be missing or pending on freshly written documents
    fn created_at(&self) -> Result<Time, Error> {
        Ok(self.opt_time("createdAt")?.unwrap_or(self.now))
    }

    fn votes(&self, field: &str) -> VoteMap {
        let Some(map) = self.doc.get(field).and_then(Value::as_map) else {
            return VoteMap::new();
        };
        map.iter()
            .filter_map(|(uid, v)| {
                let dir = v.as_str().and_then(VoteDirection::parse)?;
                Some((UserId(uid.clone()), dir))
            })
            .collect()
    }

    fn users(&self, field: &str) -> BTreeSet<UserId> {
        self.doc
            .get(field)
            .and_then(Value::as_array)
            .unwrap_or(&[])
            .iter()
            .filter_map(|v| v.as_str().map(|s| UserId(String::from(s))))
            .collect()
    }
}

fn reader(collection: Collection, doc: &Document, now: Time) -> Reader<'_> {
    Reader {
        collection,
        doc,
        now,
    }
}

const ANONYMOUS: &str = "anonymous";

impl FromDocument for Post {
    const COLLECTION: Collection = Collection::Posts;

    fn from_document(doc: &Document, now: Time) -> Result<Post, Error> {
        let r = reader(Self::COLLECTION, doc, now);
        Ok(Post {
            id: PostId(doc.id.0.clone()),
            subject: r.string("subject")?,
            content: r.string("content")?,
            author_name: r.opt_string("author")?.unwrap_or_else(|| String::from(ANONYMOUS)),
            author_id: UserId(r.string("authorId")?),
            topic_id: r.opt_string("topicId")?.map(TopicId),
            image_url: r.opt_string("imageUrl")?,
            votes: r.int_or_zero("votes")?,
            user_votes: r.votes("userVotes"),
            comment_count: r.int_or_zero("commentCount")?,
            created_at: r.created_at()?,
            updated_at: r.opt_time("updatedAt")?,
        })
    }
}

impl FromDocument for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn from_document(doc: &Document, now: Time) -> Result<Comment, Error> {
        let r = reader(Self::COLLECTION, doc, now);
        Ok(Comment {
            id: CommentId(doc.id.0.clone()),
            post_id: PostId(r.string("postId")?),
            content: r.string("content")?,
            author_name: r.opt_string("author")?.unwrap_or_else(|| String::from(ANONYMOUS)),
            author_id: UserId(r.string("authorId")?),
            votes: r.int_or_zero("votes")?,
            user_votes: r.votes("userVotes"),
            created_at: r.created_at()?,
        })
    }
}

impl FromDocument for Topic {
    const COLLECTION: Collection = Collection::Topics;

    fn from_document(doc: &Document, now: Time) -> Result<Topic, Error> {
        let r = reader(Self::COLLECTION, doc, now);
        let category = r.string("category")?;
        let category = Category::parse(&category)
            .ok_or_else(|| r.malformed(format!("unknown category {category:?}")))?;
        let defaults = TopicSettings::default();
        let setting = |name: &str, default: bool| {
            doc.get(&format!("settings.{name}"))
                .and_then(Value::as_bool)
                .unwrap_or(default)
        };
        Ok(Topic {
            id: TopicId(doc.id.0.clone()),
            name: r.string("name")?,
            url_name: r.string("urlName")?,
            description: r.opt_string("description")?.unwrap_or_default(),
            category,
            rules: r.opt_string("rules")?.filter(|r| !r.trim().is_empty()),
            created_by: UserId(r.string("createdBy")?),
            creator_name: r.opt_string("creatorName")?.unwrap_or_else(|| String::from(ANONYMOUS)),
            created_at: r.created_at()?,
            updated_at: r.opt_time("updatedAt")?,
            last_activity_at: r.opt_time("lastActivityAt")?,
            member_count: r.int_or_zero("memberCount")?,
            post_count: r.int_or_zero("postCount")?,
            members: r.users("members"),
            moderators: r.users("moderators"),
            is_private: r.flag("isPrivate"),
            is_nsfw: r.flag("isNSFW"),
            settings: TopicSettings {
                allow_images: setting("allowImages", defaults.allow_images),
                allow_polls: setting("allowPolls", defaults.allow_polls),
                allow_links: setting("allowLinks", defaults.allow_links),
                require_moderator_approval: setting(
                    "requireModeratorApproval",
                    defaults.require_moderator_approval,
                ),
            },
        })
    }
}
