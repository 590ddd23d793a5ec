//! Continuation-token pagination

use crate::backend::{ExecutionEvent, OrchestrationBackend, Page, PageRequest};
use crate::error::ReportResult;
use std::future::Future;
use tracing::{debug, trace};

/// Collect every page of a listing, following continuation tokens
///
/// Pages are requested one after another and concatenated in arrival order.
/// An empty token is treated the same as no token.
pub async fn paginate<T, F, Fut>(page_size: usize, mut fetch: F) -> ReportResult<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = ReportResult<Page<T>>>,
{
    let mut request = PageRequest::first(page_size);
    let mut items = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = fetch(request.clone()).await?;
        pages += 1;
        trace!("Page {} returned {} items", pages, page.items.len());
        items.extend(page.items);

        match page.next_token {
            Some(token) if !token.is_empty() => request = request.next(token),
            _ => break,
        }
    }

    debug!("Collected {} items over {} pages", items.len(), pages);
    Ok(items)
}

/// Complete, ordered event history of an execution
pub async fn fetch_history(
    backend: &dyn OrchestrationBackend,
    execution_id: &str,
    page_size: usize,
) -> ReportResult<Vec<ExecutionEvent>> {
    debug!("Fetching history for {}", execution_id);
    paginate(page_size, |request| async move {
        backend.get_execution_history(execution_id, &request).await
    })
    .await
}
