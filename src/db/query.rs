use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::db::repository::{Entity, Repository};
use crate::error::AppError;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Case-insensitive substring search across a set of fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSearch {
    pub term: String,
    pub fields: Vec<String>,
}

/// Equality filter over top-level document fields.
///
/// An array-valued field matches when it contains the filter value,
/// mirroring MongoDB's implicit `$elemMatch` on equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
    text: Option<TextSearch>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.to_string(), value.into());
        self
    }

    /// Adds the condition only when a value is present.
    pub fn eq_opt<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn text(mut self, term: &str, fields: &[&str]) -> Self {
        let term = term.trim();
        if !term.is_empty() {
            self.text = Some(TextSearch {
                term: term.to_string(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
            });
        }
        self
    }

    pub fn conditions(&self) -> &BTreeMap<String, Value> {
        &self.conditions
    }

    pub fn text_search(&self) -> Option<&TextSearch> {
        self.text.as_ref()
    }

    /// Evaluate the filter against a serialized document.
    pub fn matches(&self, doc: &Value) -> bool {
        let fields_match = self.conditions.iter().all(|(field, expected)| {
            match doc.get(field) {
                Some(actual) => {
                    actual == expected
                        || actual
                            .as_array()
                            .is_some_and(|items| items.contains(expected))
                }
                None => expected.is_null(),
            }
        });

        if !fields_match {
            return false;
        }

        match &self.text {
            None => true,
            Some(search) => {
                let needle = search.term.to_lowercase();
                search.fields.iter().any(|field| {
                    doc.get(field)
                        .and_then(Value::as_str)
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
        }
    }

    /// Translate the filter into a MongoDB query document.
    pub fn to_document(&self) -> Result<bson::Document, AppError> {
        let mut query = bson::Document::new();
        for (field, value) in &self.conditions {
            let value = bson::to_bson(value).map_err(|e| AppError::Internal(e.to_string()))?;
            query.insert(field.clone(), value);
        }

        if let Some(search) = &self.text {
            let pattern = regex::escape(&search.term);
            let clauses: Vec<bson::Bson> = search
                .fields
                .iter()
                .map(|field| {
                    let mut clause = bson::Document::new();
                    clause.insert(
                        field.clone(),
                        bson::doc! { "$regex": pattern.as_str(), "$options": "i" },
                    );
                    bson::Bson::Document(clause)
                })
                .collect();
            query.insert("$or", clauses);
        }

        Ok(query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sort(Vec<(String, SortDirection)>);

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self(vec![(field.to_string(), SortDirection::Asc)])
    }

    pub fn desc(field: &str) -> Self {
        Self(vec![(field.to_string(), SortDirection::Desc)])
    }

    pub fn then_asc(mut self, field: &str) -> Self {
        self.0.push((field.to_string(), SortDirection::Asc));
        self
    }

    pub fn then_desc(mut self, field: &str) -> Self {
        self.0.push((field.to_string(), SortDirection::Desc));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.0
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (field, direction) in &self.0 {
            let ordering = compare_values(a.get(field), b.get(field));
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    pub fn to_document(&self) -> bson::Document {
        let mut sort = bson::Document::new();
        for (field, direction) in &self.0 {
            let value = match direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            sort.insert(field.clone(), value);
        }
        sort
    }
}

/// Missing and null sort first, like MongoDB's ascending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Query parameters accepted by listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// A paginated listing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: Sort,
    pub page: u64,
    pub limit: u64,
}

impl ListQuery {
    pub fn new(filter: Filter, sort: Sort, params: &PageParams) -> Self {
        Self {
            filter,
            sort,
            page: params.page.unwrap_or(1).max(1),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Stable signature used as a cache key.
    pub fn signature(&self) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(serialized.as_bytes());
        format!("{:x}", digest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub limit: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Compute pagination metadata, clamping the requested page into range.
    pub fn compute(requested_page: u64, limit: u64, total_count: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = total_count.div_ceil(limit);
        let current_page = requested_page.clamp(1, total_pages.max(1));
        Self {
            current_page,
            total_pages,
            total_count,
            limit,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }

    pub fn skip(&self) -> u64 {
        (self.current_page - 1) * self.limit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn empty(limit: u64) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::compute(1, limit, 0),
        }
    }
}

/// Count, clamp the page, then fetch that page.
pub async fn paginate<T: Entity>(
    repo: &dyn Repository<T>,
    query: &ListQuery,
) -> Result<Page<T>, AppError> {
    let total = repo.count(&query.filter).await?;
    let pagination = Pagination::compute(query.page, query.limit, total);
    let items = repo
        .find(
            &query.filter,
            &query.sort,
            pagination.skip(),
            Some(pagination.limit),
        )
        .await?;

    Ok(Page { items, pagination })
}
