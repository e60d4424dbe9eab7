mod backend;
pub use backend::{BlobStore, DocumentStore, FederatedProvider, IdentityProvider, Persistence, Subscription};

mod comment;
pub use comment::{Comment, CommentId, NewComment};

mod document;
pub use document::{
    fields, resolve_timestamps, Collection, Document, DocumentId, FieldOp, Fields, StoreTimestamp,
    Update, Value,
};

mod error;
pub use error::{Error, FieldErrors};

mod post;
pub use post::{ImageUpload, NewPost, Post, PostEdit, PostId};

mod query;
pub use query::{Filter, IndexSpec, Order, OrderType, Query};

mod topic;
pub use topic::{slugify, Category, NewTopic, Topic, TopicId, TopicSettings};

mod user;
pub use user::{NewUser, User, UserId};

mod vote;
pub use vote::{tally, Votable, VoteChange, VoteDirection, VoteMap};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<chrono::Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

// Strings that end up in documents must not carry null bytes: the store rejects
// them and we would rather say so before issuing the request.
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

/// Number of characters in `s`, as displayed by the character counters of the forms
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
