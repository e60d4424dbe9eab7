use std::fmt;

use crate::{validate_string, Error, FieldErrors, PostId, Time, UserId, Votable, VoteMap};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub String);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub content: String,
    pub author_name: String,
    pub author_id: UserId,
    pub votes: i64,
    pub user_votes: VoteMap,
    pub created_at: Time,
}

impl Votable for Comment {
    fn score(&self) -> i64 {
        self.votes
    }

    fn votes(&self) -> &VoteMap {
        &self.user_votes
    }

    fn score_mut(&mut self) -> &mut i64 {
        &mut self.votes
    }

    fn votes_mut(&mut self) -> &mut VoteMap {
        &mut self.user_votes
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        validate_string(&self.content)?;
        let mut errs = FieldErrors::new();
        if self.content.trim().is_empty() {
            errs.add("content", "Comment cannot be empty");
        }
        errs.into_result()
    }
}
