use std::sync::Arc;

use futures::StreamExt;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    api::{Collection, DocumentStore, OrderType, PostId, Query, TopicId},
    mapping::{map_snapshot, FromDocument},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeedState<T> {
    Loading,
    Ready(Vec<T>),

    /// The store is still building the index this feed needs; retrying in a
    /// few minutes should work
    IndexBuilding,

    Failed(String),
}

impl<T> FeedState<T> {
    pub fn items(&self) -> Option<&[T]> {
        match self {
            FeedState::Ready(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FeedState::Loading)
    }
}

#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrder {
    #[default]
    New,
    Top,
    Hot,
}

impl FeedOrder {
    pub fn field(self) -> &'static str {
        match self {
            FeedOrder::New => "createdAt",
            FeedOrder::Top => "votes",
            FeedOrder::Hot => "commentCount",
        }
    }

    pub fn parse(s: &str) -> Option<FeedOrder> {
        match s {
            "new" => Some(FeedOrder::New),
            "top" => Some(FeedOrder::Top),
            "hot" => Some(FeedOrder::Hot),
            _ => None,
        }
    }
}

pub fn posts_query(order: FeedOrder, topic: Option<&TopicId>) -> Query {
    let q = Query::collection(Collection::Posts);
    let q = match topic {
        Some(t) => q.filter_eq("topicId", t.0.as_str()),
        None => q,
    };
    q.order_by(order.field(), OrderType::Desc)
}

pub fn comments_query(post: &PostId) -> Query {
    Query::collection(Collection::Comments)
        .filter_eq("postId", post.0.as_str())
        .order_by("createdAt", OrderType::Desc)
}

/// Live, ordered view over a query. The subscription is closed when the feed
/// is dropped.
pub struct Feed<T> {
    state: watch::Receiver<FeedState<T>>,
    task: JoinHandle<()>,
}

impl<T> Feed<T>
where
    T: 'static + Clone + FromDocument + Send + Sync,
{
    pub fn open(store: &Arc<dyn DocumentStore>, query: Query) -> Feed<T> {
        let (sender, state) = watch::channel(FeedState::Loading);
        let mut snapshots = store.subscribe(query.clone());
        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.next().await {
                let new_state = match snapshot {
                    Ok(docs) => FeedState::Ready(map_snapshot(&docs, chrono::Utc::now())),
                    Err(err) if err.is_index_error() => {
                        tracing::warn!(?err, ?query, "live query waiting for an index");
                        FeedState::IndexBuilding
                    }
                    Err(err) => {
                        tracing::error!(?err, ?query, "live query failed");
                        FeedState::Failed(err.to_string())
                    }
                };
                if sender.send(new_state).is_err() {
                    return;
                }
            }
        });
        Feed { state, task }
    }

    pub fn state(&self) -> FeedState<T> {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<FeedState<T>> {
        self.state.clone()
    }

    /// Waits until the state satisfies `pred`, or until the feed can no
    /// longer change, and returns the state at that point
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&FeedState<T>) -> bool) -> FeedState<T> {
        loop {
            let current = self.state.borrow_and_update().clone();
            if pred(&current) {
                return current;
            }
            if self.state.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }

    /// Waits for the feed to leave the loading state
    pub async fn loaded(&mut self) -> FeedState<T> {
        self.wait_for(|s| !s.is_loading()).await
    }
}

impl<T> Drop for Feed<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
