use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use agora_api::{
    resolve_timestamps, BlobStore, Collection, Document, DocumentId, DocumentStore, Error, Fields,
    IndexSpec, Query, Subscription, Time, Update, Uuid,
};
use futures::channel::mpsc;
use parking_lot::Mutex;

mod identity;
pub use identity::MockIdentity;

/// In-memory backend: document store with live queries, identity provider
/// and blob storage. Clones share the same state.
#[derive(Clone)]
pub struct MockServer(Arc<Mutex<Inner>>);

struct Inner {
    docs: BTreeMap<Collection, BTreeMap<DocumentId, Document>>,
    feeds: Vec<Feed>,

    /// `None` means every composite index is available
    indexes: Option<HashSet<IndexSpec>>,

    accounts: BTreeMap<String, identity::Account>,
    federated_account: Option<(String, String)>,
    sign_in_links: BTreeMap<String, String>,
    verification_emails: Vec<String>,

    blobs: BTreeMap<String, Blob>,

    write_failure: Option<String>,
    upload_failure: Option<String>,
    subscription_failure: Option<String>,
    requests: usize,
    last_time: Option<Time>,
}

struct Feed {
    query: Query,
    sender: mpsc::UnboundedSender<Result<Vec<Document>, Error>>,
}

#[derive(Clone, Debug)]
pub struct Blob {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl Inner {
    /// Server clock, strictly increasing so that creation order is total
    fn now(&mut self) -> Time {
        let mut now = chrono::Utc::now();
        if let Some(last) = self.last_time {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_time = Some(now);
        now
    }

    fn check_write(&mut self) -> Result<(), Error> {
        self.requests += 1;
        match &self.write_failure {
            Some(msg) => Err(Error::Store(msg.clone())),
            None => Ok(()),
        }
    }

    fn check_index(&self, q: &Query) -> Result<(), Error> {
        let (Some(indexes), Some(needed)) = (&self.indexes, q.required_index()) else {
            return Ok(());
        };
        match indexes.contains(&needed) {
            true => Ok(()),
            false => Err(Error::Store(format!(
                "The query requires an index. That index is currently building: {needed}"
            ))),
        }
    }

    fn snapshot(&self, q: &Query) -> Vec<Document> {
        match self.docs.get(&q.collection) {
            Some(docs) => q.run(docs.values()),
            None => Vec::new(),
        }
    }

    fn relay(&mut self, collection: Collection) {
        let mut feeds = std::mem::take(&mut self.feeds);
        feeds.retain(|f| {
            if f.query.collection != collection {
                return !f.sender.is_closed();
            }
            f.sender.unbounded_send(Ok(self.snapshot(&f.query))).is_ok()
        });
        self.feeds = feeds;
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Arc::new(Mutex::new(Inner {
            docs: BTreeMap::new(),
            feeds: Vec::new(),
            indexes: None,
            accounts: BTreeMap::new(),
            federated_account: None,
            sign_in_links: BTreeMap::new(),
            verification_emails: Vec::new(),
            blobs: BTreeMap::new(),
            write_failure: None,
            upload_failure: None,
            subscription_failure: None,
            requests: 0,
            last_time: None,
        })))
    }

    /// Makes queries needing a composite index fail until it is provisioned
    pub fn require_indexes(&self) {
        let mut inner = self.0.lock();
        if inner.indexes.is_none() {
            inner.indexes = Some(HashSet::new());
        }
    }

    pub fn provision_index(&self, index: IndexSpec) {
        tracing::info!(%index, "provisioning composite index");
        if let Some(indexes) = &mut self.0.lock().indexes {
            indexes.insert(index);
        }
    }

    /// Makes every subsequent write fail with `msg`, or succeed again on `None`
    pub fn fail_writes(&self, msg: Option<&str>) {
        self.0.lock().write_failure = msg.map(String::from);
    }

    pub fn fail_uploads(&self, msg: Option<&str>) {
        self.0.lock().upload_failure = msg.map(String::from);
    }

    /// Makes live queries fail with `msg`: the open ones get the error and
    /// end, and new ones are refused until called again with `None`
    pub fn fail_subscriptions(&self, msg: Option<&str>) {
        let mut inner = self.0.lock();
        inner.subscription_failure = msg.map(String::from);
        if let Some(msg) = msg {
            for f in inner.feeds.drain(..) {
                let _ = f.sender.unbounded_send(Err(Error::Store(String::from(msg))));
            }
        }
    }

    /// Number of store requests received so far
    pub fn test_request_count(&self) -> usize {
        self.0.lock().requests
    }

    pub fn test_documents(&self, collection: Collection) -> Vec<Document> {
        self.0
            .lock()
            .docs
            .get(&collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn test_document(&self, collection: Collection, id: &str) -> Option<Document> {
        self.0
            .lock()
            .docs
            .get(&collection)?
            .get(&DocumentId(String::from(id)))
            .cloned()
    }

    pub fn test_blob(&self, path: &str) -> Option<Blob> {
        self.0.lock().blobs.get(path).cloned()
    }

    /// Number of live queries still open
    pub fn test_num_feeds(&self) -> usize {
        let mut inner = self.0.lock();
        inner.feeds.retain(|f| !f.sender.is_closed());
        inner.feeds.len()
    }

    /// Stores a document as-is, bypassing failure injection
    pub fn admin_insert(&self, collection: Collection, id: &str, mut fields: Fields) {
        let mut inner = self.0.lock();
        let now = inner.now();
        resolve_timestamps(&mut fields, now);
        let id = DocumentId(String::from(id));
        inner
            .docs
            .entry(collection)
            .or_default()
            .insert(id.clone(), Document { id, fields });
        inner.relay(collection);
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MockServer {
    async fn get(&self, collection: Collection, id: &DocumentId) -> Result<Option<Document>, Error> {
        let mut inner = self.0.lock();
        inner.requests += 1;
        Ok(inner.docs.get(&collection).and_then(|d| d.get(id)).cloned())
    }

    async fn add(&self, collection: Collection, mut fields: Fields) -> Result<DocumentId, Error> {
        let mut inner = self.0.lock();
        inner.check_write()?;
        let now = inner.now();
        resolve_timestamps(&mut fields, now);
        let id = DocumentId(Uuid::new_v4().simple().to_string());
        inner.docs.entry(collection).or_default().insert(
            id.clone(),
            Document {
                id: id.clone(),
                fields,
            },
        );
        inner.relay(collection);
        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &DocumentId, mut fields: Fields) -> Result<(), Error> {
        let mut inner = self.0.lock();
        inner.check_write()?;
        let now = inner.now();
        resolve_timestamps(&mut fields, now);
        inner.docs.entry(collection).or_default().insert(
            id.clone(),
            Document {
                id: id.clone(),
                fields,
            },
        );
        inner.relay(collection);
        Ok(())
    }

    async fn update(&self, collection: Collection, id: &DocumentId, update: Update) -> Result<(), Error> {
        let mut inner = self.0.lock();
        inner.check_write()?;
        let now = inner.now();
        let doc = inner
            .docs
            .get_mut(&collection)
            .and_then(|d| d.get_mut(id))
            .ok_or_else(|| Error::not_found(collection, id.as_str()))?;
        update.apply_to(&mut doc.fields, Some(now));
        inner.relay(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), Error> {
        let mut inner = self.0.lock();
        inner.check_write()?;
        let removed = inner
            .docs
            .get_mut(&collection)
            .and_then(|d| d.remove(id))
            .is_some();
        if removed {
            inner.relay(collection);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, Error> {
        let mut inner = self.0.lock();
        inner.requests += 1;
        inner.check_index(query)?;
        Ok(inner.snapshot(query))
    }

    fn subscribe(&self, query: Query) -> Subscription {
        let (sender, receiver) = mpsc::unbounded();
        let mut inner = self.0.lock();
        inner.requests += 1;
        let check = match &inner.subscription_failure {
            Some(msg) => Err(Error::Store(msg.clone())),
            None => inner.check_index(&query),
        };
        match check {
            Err(e) => {
                tracing::info!(?query, %e, "rejecting live query");
                // The stream ends right after the error, as the sender is dropped here
                let _ = sender.unbounded_send(Err(e));
            }
            Ok(()) => {
                if sender.unbounded_send(Ok(inner.snapshot(&query))).is_ok() {
                    inner.feeds.push(Feed { query, sender });
                }
            }
        }
        Box::pin(receiver)
    }
}

#[async_trait::async_trait]
impl BlobStore for MockServer {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), Error> {
        let mut inner = self.0.lock();
        if let Some(msg) = &inner.upload_failure {
            return Err(Error::Upload(msg.clone()));
        }
        inner.blobs.insert(
            String::from(path),
            Blob {
                data,
                content_type: String::from(content_type),
            },
        );
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, Error> {
        match self.0.lock().blobs.contains_key(path) {
            true => Ok(format!("mock://{path}")),
            false => Err(Error::Upload(format!("Object '{path}' does not exist"))),
        }
    }
}
