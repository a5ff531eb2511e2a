use std::future::Future;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::model::PageResponse;

/// Anything that can fetch one numbered page of `R` records.
///
/// Closures of the shape `Fn(u32) -> impl Future<Output = Result<PageResponse<R>, E>>`
/// implement this directly, which is how tests script page sequences.
pub trait PageSource<R> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<PageResponse<R>, Self::Error>>;
}

impl<R, E, F, Fut> PageSource<R> for F
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<PageResponse<R>, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<PageResponse<R>, E>> {
        self(page)
    }
}

/// Called once per successfully fetched page, before the next request goes out.
pub trait DrainObserver {
    fn on_page(&self, _page: u32, _total_pages: u32, _records: usize) {}
}

/// Observer that ignores every page.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl DrainObserver for NoopObserver {}

impl DrainObserver for indicatif::ProgressBar {
    fn on_page(&self, page: u32, total_pages: u32, records: usize) {
        self.set_length(u64::from(total_pages));
        self.set_position(u64::from(page));
        self.set_message(format!("page {page}/{total_pages} (+{records})"));
    }
}

#[derive(Debug, Error)]
#[error("failed to fetch page {page}: {source}")]
pub struct DrainError<E>
where
    E: std::error::Error + 'static,
{
    pub page: u32,
    #[source]
    pub source: E,
}

/// Fetch pages 1, 2, ... until the server says there are no more.
///
/// Termination follows the `current_page`/`total_pages` the server reports,
/// not the page number that was asked for. The first failed page aborts the
/// whole drain; nothing fetched before it is returned.
pub async fn try_drain<R, S, O>(source: &S, observer: &O) -> Result<Vec<R>, DrainError<S::Error>>
where
    S: PageSource<R>,
    O: DrainObserver + ?Sized,
{
    let mut collected: Vec<R> = Vec::new();
    let mut page: u32 = 1;
    let mut last_page: u32;

    loop {
        debug!(page, "requesting page");
        let response = source
            .fetch_page(page)
            .await
            .map_err(|source| DrainError { page, source })?;

        let more = response.has_more();
        last_page = response.current_page;
        let count = response.records.len();
        observer.on_page(response.current_page, response.total_pages, count);
        collected.extend(response.records);

        if !more {
            break;
        }
        page = page.saturating_add(1);
    }

    info!(pages = last_page, records = collected.len(), "drain complete");
    Ok(collected)
}

/// Like [`try_drain`], but never fails: errors are logged and turn into an
/// empty result.
pub async fn drain<R, S>(source: &S) -> Vec<R>
where
    S: PageSource<R>,
{
    drain_with_observer(source, &NoopObserver).await
}

pub async fn drain_with_observer<R, S, O>(source: &S, observer: &O) -> Vec<R>
where
    S: PageSource<R>,
    O: DrainObserver + ?Sized,
{
    match try_drain(source, observer).await {
        Ok(records) => records,
        Err(e) => {
            error!(page = e.page, error = %e.source, "error fetching users");
            Vec::new()
        }
    }
}
