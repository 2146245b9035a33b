//! Token-chained draining of a paginated listing.

use tracing::debug;

use crate::error::Result;
use crate::store::{RemoteItem, SettingsStore};

/// Everything a listing produced, with the page count for the load report.
#[derive(Debug)]
pub(crate) struct Listing {
    pub items: Vec<RemoteItem>,
    pub pages: usize,
}

/// Drains the store's listing under `prefix` to completion.
///
/// Pagination is strictly sequential: each page's continuation token comes
/// from the previous response. The drain ends on the first page with zero
/// items (a valid terminal state even on the first call, token or not) or on
/// a page without a continuation token. Errors from the store propagate
/// unmodified; there is no retry at this layer.
pub(crate) async fn drain(store: &dyn SettingsStore, prefix: &str) -> Result<Listing> {
    let mut items = Vec::new();
    let mut pages = 0usize;
    let mut token: Option<String> = None;

    loop {
        let page = store.list_page(prefix, token.take()).await?;
        pages += 1;

        if page.items.is_empty() {
            break;
        }
        items.extend(page.items);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!(pages, items = items.len(), "listing drained");
    Ok(Listing { items, pages })
}
