//! Browser collaborator seam.
//!
//! The crawl loop and the login bootstrap only ever talk to a browser through
//! these traits. [`crate::HttpBrowser`] is the bundled implementation; a real
//! headless browser can be plugged in by implementing the same two traits.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Primary link query: anchors plus the attributes client-side routers use.
pub const LINK_SELECTOR: &str = "a[href], [data-href], [routerlink]";

/// Fallback link query when the primary one fails.
pub const ANCHOR_SELECTOR: &str = "a[href]";

/// How to find a single element on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A CSS selector; the first match wins.
    Css(&'static str),
    /// A `<button>` whose visible text contains this string, case-insensitively.
    ButtonText(&'static str),
}

/// Opaque reference to an element found by [`BrowserPage::find_element`].
///
/// Only valid for the page (and the document) it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub(crate) locator: Locator,
    pub(crate) index: usize,
}

impl ElementHandle {
    pub fn locator(&self) -> &Locator {
        &self.locator
    }
}

/// A browsing context: one cookie jar and auth state shared by every page it opens.
#[async_trait]
pub trait Browser: Send + Sync {
    type Page: BrowserPage;

    async fn new_page(&self) -> Result<Self::Page>;
}

/// One tab inside a [`Browser`] context.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Load `url`, following redirects, and return the final url.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String>;

    /// Url of the currently loaded document, after any redirects.
    fn current_url(&self) -> Option<String>;

    async fn title(&self) -> Result<String>;

    async fn run_script(&mut self, script: &str) -> Result<()>;

    /// Every link-like target matched by `selector`, resolved to absolute
    /// urls, in document order.
    async fn query_links(&self, selector: &str) -> Result<Vec<String>>;

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>>;

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<()>;

    async fn click(&mut self, element: &ElementHandle) -> Result<()>;

    async fn wait_for_quiescence(&mut self, timeout: Duration) -> Result<()>;

    async fn close(self) -> Result<()>;
}
