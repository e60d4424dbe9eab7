use std::{cmp::Ordering, collections::BTreeMap, fmt};

use chrono::TimeZone;

use crate::Time;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Posts,
    Comments,
    Topics,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::Topics => "topics",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Timestamp in the store's native representation
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl StoreTimestamp {
    pub fn from_time(t: Time) -> StoreTimestamp {
        StoreTimestamp {
            seconds: t.timestamp(),
            nanos: t.timestamp_subsec_nanos(),
        }
    }

    pub fn to_time(&self) -> Option<Time> {
        chrono::Utc.timestamp_opt(self.seconds, self.nanos).single()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(StoreTimestamp),

    /// A server timestamp that was requested but not resolved yet
    PendingTimestamp,

    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) => 2,
            Value::Timestamp(_) | Value::PendingTimestamp => 3,
            Value::String(_) => 4,
            Value::Array(_) => 5,
            Value::Map(_) => 6,
        }
    }

    /// Total order used by queries. Values of different types order by type;
    /// a pending timestamp orders after every resolved one, as it will resolve
    /// to "now".
    pub fn cmp_order(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::PendingTimestamp, Value::PendingTimestamp) => Ordering::Equal,
            (Value::PendingTimestamp, Value::Timestamp(_)) => Ordering::Greater,
            (Value::Timestamp(_), Value::PendingTimestamp) => Ordering::Less,
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp_order(y) {
                        Ordering::Equal => (),
                        o => return o,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    match ka.cmp(kb).then_with(|| va.cmp_order(vb)) {
                        Ordering::Equal => (),
                        o => return o,
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(String::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<Time> for Value {
    fn from(t: Time) -> Value {
        Value::Timestamp(StoreTimestamp::from_time(t))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Value {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

pub type Fields = BTreeMap<String, Value>;

/// Builds a field map from `(name, value)` pairs
pub fn fields<I, K>(items: I) -> Fields
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    items.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    /// Looks up a dotted field path, descending into maps
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut cur = self.fields.get(segments.next()?)?;
        for s in segments {
            cur = cur.as_map()?.get(s)?;
        }
        Some(cur)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum FieldOp {
    Set(Value),
    Delete,
    /// Atomic add, performed by the store
    Increment(i64),
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
    ServerTimestamp,
}

/// A list of field operations sent to the store as one request
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Update(pub Vec<(String, FieldOp)>);

impl Update {
    pub fn new() -> Update {
        Update(Vec::new())
    }

    pub fn op(mut self, path: impl Into<String>, op: FieldOp) -> Update {
        self.0.push((path.into(), op));
        self
    }

    pub fn set(self, path: impl Into<String>, v: impl Into<Value>) -> Update {
        self.op(path, FieldOp::Set(v.into()))
    }

    pub fn delete(self, path: impl Into<String>) -> Update {
        self.op(path, FieldOp::Delete)
    }

    pub fn increment(self, path: impl Into<String>, by: i64) -> Update {
        self.op(path, FieldOp::Increment(by))
    }

    pub fn array_union(self, path: impl Into<String>, v: impl Into<Value>) -> Update {
        self.op(path, FieldOp::ArrayUnion(vec![v.into()]))
    }

    pub fn array_remove(self, path: impl Into<String>, v: impl Into<Value>) -> Update {
        self.op(path, FieldOp::ArrayRemove(vec![v.into()]))
    }

    pub fn server_timestamp(self, path: impl Into<String>) -> Update {
        self.op(path, FieldOp::ServerTimestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies all operations in order. Server timestamps resolve to `now`,
    /// or stay pending if `now` is `None`.
    pub fn apply_to(&self, fields: &mut Fields, now: Option<Time>) {
        for (path, op) in self.0.iter() {
            apply_op(fields, path, op, now);
        }
    }
}

/// Resolves every pending timestamp of a field map to `now`
pub fn resolve_timestamps(fields: &mut Fields, now: Time) {
    fn resolve(v: &mut Value, now: Time) {
        match v {
            Value::PendingTimestamp => *v = Value::from(now),
            Value::Array(a) => a.iter_mut().for_each(|v| resolve(v, now)),
            Value::Map(m) => m.values_mut().for_each(|v| resolve(v, now)),
            _ => (),
        }
    }
    fields.values_mut().for_each(|v| resolve(v, now));
}

fn apply_op(fields: &mut Fields, path: &str, op: &FieldOp, now: Option<Time>) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut target = fields;
    if let Some(parents) = parents {
        for seg in parents.split('.') {
            let entry = target
                .entry(String::from(seg))
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(entry, Value::Map(_)) {
                if matches!(op, FieldOp::Delete) {
                    return;
                }
                *entry = Value::Map(BTreeMap::new());
            }
            target = match entry {
                Value::Map(m) => m,
                _ => unreachable!("entry was just made a map"),
            };
        }
    }
    match op {
        FieldOp::Set(v) => {
            target.insert(String::from(leaf), v.clone());
        }
        FieldOp::Delete => {
            target.remove(leaf);
        }
        FieldOp::Increment(by) => {
            let cur = target.get(leaf).and_then(Value::as_i64).unwrap_or(0);
            target.insert(String::from(leaf), Value::Integer(cur.saturating_add(*by)));
        }
        FieldOp::ArrayUnion(items) => {
            let mut arr = match target.remove(leaf) {
                Some(Value::Array(a)) => a,
                _ => Vec::new(),
            };
            for i in items {
                if !arr.contains(i) {
                    arr.push(i.clone());
                }
            }
            target.insert(String::from(leaf), Value::Array(arr));
        }
        FieldOp::ArrayRemove(items) => {
            let mut arr = match target.remove(leaf) {
                Some(Value::Array(a)) => a,
                _ => Vec::new(),
            };
            arr.retain(|v| !items.contains(v));
            target.insert(String::from(leaf), Value::Array(arr));
        }
        FieldOp::ServerTimestamp => {
            let v = match now {
                Some(now) => Value::from(now),
                None => Value::PendingTimestamp,
            };
            target.insert(String::from(leaf), v);
        }
    }
}
