use std::sync::Arc;

use crate::{
    api::{
        Category, Collection, DocumentId, DocumentStore, Error as ApiError, OrderType, Post, Query,
        Topic,
    },
    mapping::{map_snapshot, FromDocument},
    ForumConfig, Result,
};

#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TopicSort {
    /// Order in which the store returns them
    #[default]
    Relevance,
    Members,
    Recent,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    pub name: String,
    pub topics: Vec<Topic>,
    pub recent_posts: Vec<Post>,
}

/// One-shot reads used to find topics and people
pub struct Discovery {
    store: Arc<dyn DocumentStore>,
    config: ForumConfig,
}

impl Discovery {
    pub fn new(store: Arc<dyn DocumentStore>, config: ForumConfig) -> Discovery {
        Discovery { store, config }
    }

    async fn run<T: FromDocument>(&self, query: &Query) -> Result<Vec<T>> {
        let docs = self.store.query(query).await.map_err(|err| {
            tracing::error!(?err, ?query, "query failed");
            err
        })?;
        Ok(map_snapshot(&docs, chrono::Utc::now()))
    }

    /// Topics whose name or description contains `search`, ignoring case
    pub async fn search_topics(
        &self,
        search: &str,
        category: Option<Category>,
        sort: TopicSort,
    ) -> Result<Vec<Topic>> {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let query = match category {
            Some(c) => Query::collection(Collection::Topics).filter_eq("category", c.as_str()),
            None => Query::collection(Collection::Topics),
        };
        let mut topics = self
            .run::<Topic>(&query)
            .await?
            .into_iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .collect::<Vec<_>>();
        match sort {
            TopicSort::Relevance => (),
            TopicSort::Members => topics.sort_by(|a, b| b.member_count.cmp(&a.member_count)),
            TopicSort::Recent => topics.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        Ok(topics)
    }

    pub async fn trending_topics(&self) -> Result<Vec<Topic>> {
        let query = Query::collection(Collection::Topics)
            .order_by("memberCount", OrderType::Desc)
            .limit(self.config.trending_len);
        self.run(&query).await
    }

    /// Looks a topic up by its id, then by its slug
    pub async fn topic(&self, id_or_slug: &str) -> Result<Topic> {
        let now = chrono::Utc::now();
        let by_id = self
            .store
            .get(Collection::Topics, &DocumentId(String::from(id_or_slug)))
            .await?;
        if let Some(doc) = by_id {
            return Ok(Topic::from_document(&doc, now)?);
        }
        let query = Query::collection(Collection::Topics)
            .filter_eq("urlName", id_or_slug)
            .limit(1);
        match self.store.query(&query).await?.first() {
            Some(doc) => Ok(Topic::from_document(doc, now)?),
            None => Err(ApiError::not_found(Collection::Topics, id_or_slug).into()),
        }
    }

    /// Topics created by, and latest posts of, the user with display name `name`
    pub async fn profile(&self, name: &str) -> Result<Profile> {
        let topics = Query::collection(Collection::Topics).filter_eq("creatorName", name);
        let posts = Query::collection(Collection::Posts)
            .filter_eq("author", name)
            .order_by("createdAt", OrderType::Desc)
            .limit(self.config.profile_posts_len);
        Ok(Profile {
            name: String::from(name),
            topics: self.run(&topics).await?,
            recent_posts: self.run(&posts).await?,
        })
    }
}
