//! In-memory browser for crawl and login tests.

use crate::browser::{Browser, BrowserPage, ElementHandle, LINK_SELECTOR, Locator};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub title: Option<String>,
    /// Returned by the primary link query.
    pub links: Vec<String>,
    /// Returned by the anchor-only fallback query.
    pub anchor_links: Vec<String>,
    pub primary_query_fails: bool,
    pub anchor_query_fails: bool,
    pub redirect_to: Option<String>,
    pub unreachable: bool,
    pub elements: Vec<Locator>,
}

impl ScriptedPage {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn linking(title: &str, links: &[&str]) -> Self {
        let links: Vec<String> = links.iter().map(|l| l.to_string()).collect();
        Self {
            title: Some(title.to_string()),
            anchor_links: links.clone(),
            links,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    pub navigations: Vec<String>,
    pub fills: Vec<(Locator, String)>,
    pub clicks: Vec<Locator>,
    pub scripts: usize,
    pub opened: usize,
    pub closed: usize,
}

#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    pages: Arc<HashMap<String, ScriptedPage>>,
    fetch_delay: Duration,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: ScriptedPage) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), page);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.lock().unwrap().clone()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    type Page = ScriptedTab;

    async fn new_page(&self) -> Result<ScriptedTab> {
        self.journal.lock().unwrap().opened += 1;
        Ok(ScriptedTab {
            pages: self.pages.clone(),
            fetch_delay: self.fetch_delay,
            journal: self.journal.clone(),
            current: None,
        })
    }
}

pub struct ScriptedTab {
    pages: Arc<HashMap<String, ScriptedPage>>,
    fetch_delay: Duration,
    journal: Arc<Mutex<Journal>>,
    current: Option<String>,
}

impl ScriptedTab {
    fn page(&self) -> Result<&ScriptedPage> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .ok_or(ScanError::NoDocument)
    }
}

#[async_trait]
impl BrowserPage for ScriptedTab {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<String> {
        self.journal.lock().unwrap().navigations.push(url.to_string());
        tokio::time::sleep(self.fetch_delay).await;

        let page = self
            .pages
            .get(url)
            .filter(|p| !p.unreachable)
            .ok_or_else(|| ScanError::Other(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;
        let landed = page.redirect_to.clone().unwrap_or_else(|| url.to_string());
        self.current = Some(landed.clone());
        Ok(landed)
    }

    fn current_url(&self) -> Option<String> {
        self.current.clone()
    }

    async fn title(&self) -> Result<String> {
        self.page()?
            .title
            .clone()
            .ok_or_else(|| ScanError::Other("title unavailable".to_string()))
    }

    async fn run_script(&mut self, _script: &str) -> Result<()> {
        self.journal.lock().unwrap().scripts += 1;
        Ok(())
    }

    async fn query_links(&self, selector: &str) -> Result<Vec<String>> {
        let page = self.page()?;
        if selector == LINK_SELECTOR {
            if page.primary_query_fails {
                return Err(ScanError::InvalidSelector(selector.to_string()));
            }
            return Ok(page.links.clone());
        }
        if page.anchor_query_fails {
            return Err(ScanError::InvalidSelector(selector.to_string()));
        }
        Ok(page.anchor_links.clone())
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        Ok(self
            .page()?
            .elements
            .contains(locator)
            .then(|| ElementHandle {
                locator: locator.clone(),
                index: 0,
            }))
    }

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .fills
            .push((element.locator.clone(), value.to_string()));
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .clicks
            .push(element.locator.clone());
        Ok(())
    }

    async fn wait_for_quiescence(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.journal.lock().unwrap().closed += 1;
        Ok(())
    }
}
