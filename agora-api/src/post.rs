use std::fmt;

use crate::{validate_string, Error, FieldErrors, Time, TopicId, UserId, Votable, VoteMap};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub subject: String,
    pub content: String,
    pub author_name: String,
    pub author_id: UserId,
    pub topic_id: Option<TopicId>,
    pub image_url: Option<String>,
    pub votes: i64,
    pub user_votes: VoteMap,
    pub comment_count: i64,
    pub created_at: Time,
    pub updated_at: Option<Time>,
}

impl Votable for Post {
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
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    pub subject: String,
    pub content: String,
    pub topic_id: Option<TopicId>,
    pub image: Option<ImageUpload>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), Error> {
        validate_post_text(&self.subject, &self.content)?;
        if let Some(img) = &self.image {
            validate_string(&img.file_name)?;
            if img.file_name.trim().is_empty() {
                let mut errs = FieldErrors::new();
                errs.add("image", "Image file name is required");
                return errs.into_result();
            }
        }
        Ok(())
    }
}

/// New text for an existing post
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PostEdit {
    pub subject: String,
    pub content: String,
}

impl PostEdit {
    pub fn validate(&self) -> Result<(), Error> {
        validate_post_text(&self.subject, &self.content)
    }
}

fn validate_post_text(subject: &str, content: &str) -> Result<(), Error> {
    validate_string(subject)?;
    validate_string(content)?;
    let mut errs = FieldErrors::new();
    if subject.trim().is_empty() {
        errs.add("subject", "Please fill in both subject and message");
    }
    if content.trim().is_empty() {
        errs.add("content", "Please fill in both subject and message");
    }
    errs.into_result()
}
