//! Offset/limit pagination over vendor listing endpoints

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;

/// Largest page the listing endpoints accept
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Objects carrying a vendor-assigned identifier
pub trait Identified {
    fn identifier(&self) -> &str;
}

/// Key/value predicate narrowing a listing query (filters are ANDed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    pub fn with_values<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Progress through a multi-page listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: u64,
    pub limit: u64,
    /// Total reported by the first page; fixed for the rest of the listing
    pub total: Option<u64>,
}

impl PageCursor {
    pub fn new(limit: u64) -> Self {
        Self {
            offset: 0,
            limit,
            total: None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.total, Some(total) if self.offset >= total)
    }
}

/// One page of a listing response
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total: u64, items: Vec<T>) -> Self {
        Self { total, items }
    }
}

/// Collects every page of a listing into one deduplicated set
#[derive(Debug, Clone)]
pub struct PaginatedLister {
    what: String,
    page_size: u64,
}

impl PaginatedLister {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch pages until the reported total is reached or a page comes back empty.
    ///
    /// A repeated identifier means the listing drifted while paging; the whole
    /// result is discarded with [`CloudError::Inconsistency`]. Any page failure
    /// is returned as-is, also without partial results.
    pub async fn collect<T, F, Fut>(&self, mut fetch: F) -> Result<Vec<T>>
    where
        T: Identified,
        F: FnMut(PageCursor) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        if self.page_size == 0 {
            return Err(CloudError::InvalidConfig(format!(
                "page size for {} listing must be positive",
                self.what
            )));
        }

        let mut cursor = PageCursor::new(self.page_size);
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        while !cursor.is_exhausted() {
            let page = fetch(cursor).await?;
            tracing::debug!(
                "{} page offset={} limit={} returned {} of {}",
                self.what,
                cursor.offset,
                cursor.limit,
                page.items.len(),
                page.total
            );

            if cursor.total.is_none() {
                cursor.total = Some(page.total);
            }

            if page.items.is_empty() {
                break;
            }
            cursor.offset += cursor.limit;

            for item in page.items {
                if !seen.insert(item.identifier().to_string()) {
                    return Err(CloudError::Inconsistency(format!(
                        "repeated {} id [{}] while listing",
                        self.what,
                        item.identifier()
                    )));
                }
                items.push(item);
            }
        }

        Ok(items)
    }
}
