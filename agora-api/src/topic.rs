use std::{collections::BTreeSet, fmt};

use crate::{char_len, validate_string, Error, FieldErrors, Time, UserId};

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 50;
pub const DESCRIPTION_MIN_LEN: usize = 10;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const RULES_MAX_LEN: usize = 1000;

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct TopicId(pub String);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Business,
    Creative,
    Education,
    Entertainment,
    Gaming,
    Health,
    Lifestyle,
    Science,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Technology,
        Category::Business,
        Category::Creative,
        Category::Education,
        Category::Entertainment,
        Category::Gaming,
        Category::Health,
        Category::Lifestyle,
        Category::Science,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Business => "business",
            Category::Creative => "creative",
            Category::Education => "education",
            Category::Entertainment => "entertainment",
            Category::Gaming => "gaming",
            Category::Health => "health",
            Category::Lifestyle => "lifestyle",
            Category::Science => "science",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Business => "Business",
            Category::Creative => "Creative Arts",
            Category::Education => "Education",
            Category::Entertainment => "Entertainment",
            Category::Gaming => "Gaming",
            Category::Health => "Health & Fitness",
            Category::Lifestyle => "Lifestyle",
            Category::Science => "Science",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored alongside the topic. None of these are enforced by the write paths.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TopicSettings {
    pub allow_images: bool,
    pub allow_polls: bool,
    pub allow_links: bool,
    pub require_moderator_approval: bool,
}

impl Default for TopicSettings {
    fn default() -> TopicSettings {
        TopicSettings {
            allow_images: true,
            allow_polls: true,
            allow_links: true,
            require_moderator_approval: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub url_name: String,
    pub description: String,
    pub category: Category,
    pub rules: Option<String>,
    pub created_by: UserId,
    pub creator_name: String,
    pub created_at: Time,
    pub updated_at: Option<Time>,
    pub last_activity_at: Option<Time>,
    pub member_count: i64,
    pub post_count: i64,
    pub members: BTreeSet<UserId>,
    pub moderators: BTreeSet<UserId>,
    pub is_private: bool,
    pub is_nsfw: bool,
    pub settings: TopicSettings,
}

impl Topic {
    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// The creator always moderates, whatever the stored moderator set says
    pub fn is_moderator(&self, user: &UserId) -> bool {
        self.created_by == *user || self.moderators.contains(user)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewTopic {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub rules: Option<String>,
}

impl NewTopic {
    pub fn validate(&self) -> Result<(), Error> {
        validate_string(&self.name)?;
        validate_string(&self.description)?;
        if let Some(r) = &self.rules {
            validate_string(r)?;
        }

        let mut errs = FieldErrors::new();
        let name = self.name.trim();
        if name.is_empty() {
            errs.add("name", "Topic name is required");
        } else if char_len(name) < NAME_MIN_LEN {
            errs.add("name", "Topic name must be at least 3 characters");
        } else if char_len(name) > NAME_MAX_LEN {
            errs.add("name", "Topic name must be less than 50 characters");
        } else if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-')
        {
            errs.add(
                "name",
                "Topic name can only contain letters, numbers, spaces, and hyphens",
            );
        }

        let description = self.description.trim();
        if description.is_empty() {
            errs.add("description", "Description is required");
        } else if char_len(description) < DESCRIPTION_MIN_LEN {
            errs.add("description", "Description must be at least 10 characters");
        } else if char_len(description) > DESCRIPTION_MAX_LEN {
            errs.add("description", "Description must be less than 500 characters");
        }

        if let Some(r) = &self.rules {
            if char_len(r) > RULES_MAX_LEN {
                errs.add("rules", "Rules must be less than 1000 characters");
            }
        }
        errs.into_result()
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// URL-safe name of a topic: lowercased, whitespace runs turned into a single
/// hyphen, hyphen runs collapsed
pub fn slugify(name: &str) -> String {
    let mut res = String::with_capacity(name.len());
    let mut last_hyphen = false;
    let mut in_space = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            in_space = true;
            continue;
        }
        if in_space {
            if !last_hyphen {
                res.push('-');
            }
            last_hyphen = true;
            in_space = false;
        }
        if c == '-' {
            if !last_hyphen {
                res.push('-');
            }
            last_hyphen = true;
        } else {
            res.push(c);
            last_hyphen = false;
        }
    }
    res
}
