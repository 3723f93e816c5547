//! Lazy page-walking cursor

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::warn;

use crate::api::{Request, Response};
use crate::error::{Error, Result};
use crate::http::HttpTransport;

/// The largest page size the API accepts.
pub const PER_PAGE_MAX: usize = 100;

/// Lazy, rewindable cursor over the entries of a paginated listing.
///
/// Construction wraps the first page's response; further pages are fetched
/// only when the cursor crosses into them, by re-issuing a copy of the
/// originating request against the `next` pagination link. Fetched pages are
/// kept, so [`rewind`] never refetches.
///
/// Page numbers are 1-indexed and only grow; the item cursor resets to 0
/// whenever the page cursor advances.
///
/// [`rewind`]: Paginator::rewind
pub struct Paginator {
    transport: Arc<dyn HttpTransport>,
    template: Arc<Request>,
    first_page: u32,
    per_page: usize,
    max_results: Option<usize>,
    pages: BTreeMap<u32, Response>,
    bodies: BTreeMap<u32, Vec<Value>>,
    item_cursor: usize,
    page_cursor: u32,
}

impl Paginator {
    /// Wrap the first page of a listing.
    ///
    /// `first_page` and `per_page` derive from the initiating request's
    /// query parameters; an absent `per_page` defaults to the size of the
    /// first page's result array.
    pub fn new(transport: Arc<dyn HttpTransport>, response: Response) -> Result<Self> {
        let body = decode_page(&response)?;
        let params = response.request().params();

        let first_page = params
            .get("page")
            .and_then(|v| v.parse::<u32>().ok())
            .map_or(1, |page| page.max(1));
        // a zero page size would make the cursor arithmetic meaningless
        let per_page = params
            .get("per_page")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(body.len())
            .max(1);

        let template = Arc::clone(response.request());
        let mut pages = BTreeMap::new();
        let mut bodies = BTreeMap::new();
        bodies.insert(first_page, body);
        pages.insert(first_page, response);

        Ok(Self {
            transport,
            template,
            first_page,
            per_page,
            max_results: None,
            pages,
            bodies,
            item_cursor: 0,
            page_cursor: first_page,
        })
    }

    /// Cap the total number of items yielded.
    ///
    /// With `per_page=50` and a cap of 200 the walk makes 4 requests total.
    pub fn limit_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// The page size in effect
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Reset the cursor to the first item; fetched pages are kept.
    pub fn rewind(&mut self) {
        self.item_cursor = 0;
        self.page_cursor = self.first_page;
    }

    /// Check if the cursor points at an entry within the result cap.
    pub fn valid(&self) -> bool {
        let has_item = self
            .bodies
            .get(&self.page_cursor)
            .is_some_and(|body| self.item_cursor < body.len());
        has_item && self.max_results.map_or(true, |max| self.key() < max)
    }

    /// The entry under the cursor, or `None` past the end.
    pub fn current(&self) -> Option<&Value> {
        if !self.valid() {
            return None;
        }
        self.bodies
            .get(&self.page_cursor)
            .and_then(|body| body.get(self.item_cursor))
    }

    /// Zero-based global index of the cursor.
    pub fn key(&self) -> usize {
        self.item_cursor + (self.page_cursor - self.first_page) as usize * self.per_page
    }

    /// Advance the cursor, fetching the next page at a page boundary.
    ///
    /// When the fetch fails the speculative advance is undone so the caller
    /// may retry; iteration does not hard-fail on a transient error.
    pub async fn advance(&mut self) {
        self.item_cursor += 1;

        // anywhere inside the page there is nothing to fetch
        if self.item_cursor < self.per_page || self.item_cursor % self.per_page != 0 {
            return;
        }

        let next_page = self.page_cursor + 1;
        if self.bodies.contains_key(&next_page) {
            // already fetched
            self.item_cursor = 0;
            self.page_cursor = next_page;
            return;
        }

        let Some(link) = self
            .pages
            .get(&self.page_cursor)
            .and_then(|response| response.pagination_link("next"))
        else {
            return; // end of the listing
        };

        let request = self.template.copy_with_url(link);
        match self.fetch(request).await {
            Ok((response, body)) => {
                self.item_cursor = 0;
                self.page_cursor = next_page;
                self.bodies.insert(next_page, body);
                self.pages.insert(next_page, response);
            }
            Err(err) => {
                warn!(error = %err, page = next_page, "page fetch failed, cursor kept");
                self.item_cursor -= 1; // revert so the caller can retry
            }
        }
    }

    async fn fetch(&self, request: Request) -> Result<(Response, Vec<Value>)> {
        let response = self.transport.send(&request).await?;
        let body = decode_page(&response)?;
        Ok((response, body))
    }

    /// Stream the entries lazily.
    ///
    /// A page-fetch failure ends the stream (the manual cursor API is the
    /// place for retry semantics).
    pub fn into_stream(self) -> impl Stream<Item = Value> + Send {
        stream::unfold((self, false), |(mut pager, stalled)| async move {
            if stalled || !pager.valid() {
                return None;
            }
            let item = pager.current().cloned()?;
            let before = pager.key();
            pager.advance().await;
            let stalled = pager.valid() && pager.key() == before;
            Some((item, (pager, stalled)))
        })
    }

    /// Drain the whole listing into memory, honoring the result cap.
    pub async fn collect_all(mut self) -> Vec<Value> {
        let mut items = Vec::new();
        while self.valid() {
            let Some(item) = self.current().cloned() else {
                break;
            };
            items.push(item);
            let before = self.key();
            self.advance().await;
            if self.valid() && self.key() == before {
                break; // fetch stalled; do not spin on the same entry
            }
        }
        items
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("first_page", &self.first_page)
            .field("per_page", &self.per_page)
            .field("max_results", &self.max_results)
            .field("page_cursor", &self.page_cursor)
            .field("item_cursor", &self.item_cursor)
            .field("fetched_pages", &self.bodies.len())
            .finish_non_exhaustive()
    }
}

/// A paginated body must be a JSON array of entries.
fn decode_page(response: &Response) -> Result<Vec<Value>> {
    let value = response.json()?;
    value
        .as_array()
        .cloned()
        .ok_or_else(|| Error::invalid_argument("paginated response body is not an array"))
}
