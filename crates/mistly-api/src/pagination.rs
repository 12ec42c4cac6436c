// Paginated list endpoints
//
// Mist list endpoints take `limit` + `page` (1-based) query parameters and
// advertise the total item count in an `X-Page-Total` header. Collections
// are exposed as lazy streams so callers that only need the first match
// never fetch the remaining pages.
//
// Not every endpoint honors `page`. A page that repeats the previous one
// ends the stream, and `MAX_PAGES` bounds the walk regardless.

use async_stream::try_stream;
use futures_util::Stream;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{trace, warn};

use crate::client::MistClient;
use crate::error::Error;

/// Items requested per page.
pub const PAGE_LIMIT: u32 = 100;

/// Upper bound on pages fetched for one collection.
pub const MAX_PAGES: u32 = 1000;

/// One page of a list endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count from `X-Page-Total`, when the endpoint reports it.
    pub total: Option<u64>,
}

impl MistClient {
    /// Stream every item of a list endpoint, fetching pages on demand.
    ///
    /// Stops on a short page, an empty page, a page identical to the one
    /// before it, or once `X-Page-Total` items have been yielded. Fails
    /// with [`Error::Pagination`] after `max_pages` full pages.
    pub fn paginate<T>(
        &self,
        path: String,
        limit: u32,
    ) -> impl Stream<Item = Result<T, Error>> + Send + '_
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.paginate_bounded(path, limit, MAX_PAGES)
    }

    /// [`paginate`](Self::paginate) with an explicit page cap.
    pub fn paginate_bounded<T>(
        &self,
        path: String,
        limit: u32,
        max_pages: u32,
    ) -> impl Stream<Item = Result<T, Error>> + Send + '_
    where
        T: DeserializeOwned + Send + 'static,
    {
        try_stream! {
            let mut page_no: u32 = 1;
            let mut seen: u64 = 0;
            let mut previous: Option<Vec<Value>> = None;

            loop {
                if page_no > max_pages {
                    Err::<(), _>(Error::Pagination { path: path.clone(), pages: max_pages })?;
                }

                let page: Page<Value> = self.get_page(&path, page_no, limit).await?;
                let received = page.items.len();
                trace!(path = %path, page = page_no, received, total = ?page.total, "fetched page");

                if received > 0 && previous.as_ref() == Some(&page.items) {
                    warn!(path = %path, page = page_no, "endpoint repeated the previous page, stopping");
                    break;
                }

                seen = seen.saturating_add(u64::try_from(received).unwrap_or(u64::MAX));
                for raw in &page.items {
                    yield decode::<T>(raw)?;
                }

                let short = received < usize::try_from(limit).unwrap_or(usize::MAX);
                let exhausted = page.total.is_some_and(|total| seen >= total);
                if received == 0 || short || exhausted {
                    break;
                }
                previous = Some(page.items);
                page_no += 1;
            }
        }
    }
}

fn decode<T: DeserializeOwned>(raw: &Value) -> Result<T, Error> {
    T::deserialize(raw).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: raw.to_string(),
    })
}
