use std::{cmp::Ordering, fmt};

use crate::{Collection, Document, Value};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum OrderType {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Order {
    pub field: String,
    pub order: OrderType,
}

/// Equality filters, at most one ordering, and an optional limit
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

/// Composite index that the store must have provisioned to answer a query
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IndexSpec {
    pub collection: Collection,
    pub fields: Vec<String>,
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.collection, self.fields.join(", "))
    }
}

impl Query {
    pub fn collection(collection: Collection) -> Query {
        Query {
            collection,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Query {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: OrderType) -> Query {
        self.order = Some(Order {
            field: field.into(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Query {
        self.limit = Some(limit);
        self
    }

    /// Whether `doc` passes the filters. Documents lacking the ordering field
    /// are never part of an ordered query's results.
    pub fn matches(&self, doc: &Document) -> bool {
        let filters_ok = self
            .filters
            .iter()
            .all(|f| doc.get(&f.field) == Some(&f.value));
        let order_ok = match &self.order {
            None => true,
            Some(o) => doc.get(&o.field).is_some(),
        };
        filters_ok && order_ok
    }

    /// Evaluates the query over `docs`. Ties are broken by document id so that
    /// results are deterministic.
    pub fn run<'a, I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut res = docs
            .into_iter()
            .filter(|d| self.matches(d))
            .cloned()
            .collect::<Vec<_>>();
        match &self.order {
            None => res.sort_by(|a, b| a.id.cmp(&b.id)),
            Some(o) => res.sort_by(|a, b| {
                let va = a.get(&o.field).unwrap_or(&Value::Null);
                let vb = b.get(&o.field).unwrap_or(&Value::Null);
                let ord = match o.order {
                    OrderType::Asc => va.cmp_order(vb),
                    OrderType::Desc => vb.cmp_order(va),
                };
                match ord {
                    Ordering::Equal => a.id.cmp(&b.id),
                    o => o,
                }
            }),
        }
        if let Some(limit) = self.limit {
            res.truncate(limit);
        }
        res
    }

    /// The composite index needed by this query, if any: equality filters
    /// combined with an ordering on another field need one.
    pub fn required_index(&self) -> Option<IndexSpec> {
        let order = self.order.as_ref()?;
        if self.filters.iter().all(|f| f.field == order.field) {
            return None;
        }
        let mut fields = self
            .filters
            .iter()
            .map(|f| f.field.clone())
            .filter(|f| *f != order.field)
            .collect::<Vec<_>>();
        fields.push(order.field.clone());
        Some(IndexSpec {
            collection: self.collection,
            fields,
        })
    }
}
