use crate::browser::{ANCHOR_SELECTOR, Browser, BrowserPage, LINK_SELECTOR};
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::login::{LoginOutcome, bootstrap_session};
use crate::normalize::normalize;
use crate::prioritize::prioritize_links;
use crate::result::{CrawlResult, Edge, Page, ProgressEvent, Termination};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Channel for per-page progress. The crawl owns the sender and drops it when
/// it finishes, which ends the receiver's stream.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

const SCROLL_TOP_SCRIPT: &str = "window.scrollTo(0, 0)";

fn scroll_script(step: usize, steps: usize) -> String {
    format!(
        "window.scrollTo(0, document.body.scrollHeight * {} / {})",
        step + 1,
        steps
    )
}

/// Mutable state of a single crawl invocation.
#[derive(Debug)]
pub struct CrawlState {
    frontier: VecDeque<String>,
    visited: HashSet<String>,
    pages: Vec<Page>,
    edges: Vec<Edge>,
    edge_keys: HashSet<Edge>,
    inbound: HashMap<String, usize>,
    started: Instant,
}

impl CrawlState {
    /// `started` is the instant the time budget counts from.
    pub fn new(start_url: &str, started: Instant) -> Self {
        Self {
            frontier: VecDeque::from([normalize(start_url, start_url)]),
            visited: HashSet::new(),
            pages: Vec::new(),
            edges: Vec::new(),
            edge_keys: HashSet::new(),
            inbound: HashMap::new(),
            started,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn inbound(&self) -> &HashMap<String, usize> {
        &self.inbound
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Record an occurrence of `from -> to`: the inbound count always grows,
    /// the edge set only on first sight. Unvisited targets join the frontier.
    fn record_link(&mut self, from: &str, to: &str) {
        let edge = Edge::new(from, to);
        if self.edge_keys.insert(edge.clone()) {
            self.edges.push(edge);
        }
        *self.inbound.entry(to.to_string()).or_insert(0) += 1;
        if !self.visited.contains(to) {
            self.frontier.push_back(to.to_string());
        }
    }

    fn into_result(self, termination: Termination, login: LoginOutcome) -> CrawlResult {
        CrawlResult {
            pages: self.pages,
            edges: self.edges,
            termination,
            login,
        }
    }
}

/// Sequential breadth-first crawler over a [`Browser`] context.
pub struct Crawler<B: Browser> {
    browser: B,
    config: CrawlConfig,
}

impl<B: Browser> Crawler<B> {
    pub fn new(browser: B, config: CrawlConfig) -> Self {
        Self { browser, config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Run the crawl to one of its budgets. Only failing to open a page in the
    /// browser context is an error; everything else shrinks the result.
    pub async fn crawl(&self, progress: Option<ProgressSender>) -> Result<CrawlResult> {
        let config = &self.config;
        info!(
            "Starting crawl of {} (max {} pages, time budget {:?})",
            config.start_url, config.max_pages, config.max_time
        );

        // The login bootstrap is charged against the time budget.
        let started = Instant::now();
        let login = bootstrap_session(
            &self.browser,
            &config.start_url,
            config.credentials.as_ref(),
            &config.timings,
        )
        .await;

        let mut state = CrawlState::new(&config.start_url, started);

        let termination = loop {
            if state.frontier.is_empty() {
                break Termination::Completed;
            }
            if state.pages.len() >= config.max_pages {
                break Termination::PageBudgetExhausted;
            }
            if let Some(max_time) = config.max_time
                && state.started.elapsed() >= max_time
            {
                break Termination::TimeBudgetExhausted;
            }

            let Some(url) = state.frontier.pop_front() else {
                break Termination::Completed;
            };
            if !state.visited.insert(url.clone()) {
                continue;
            }

            let mut page = self.browser.new_page().await?;
            if let Some(event) = self.visit(&mut page, &url, &mut state).await
                && let Some(tx) = &progress
            {
                // A dropped receiver only means nobody is listening any more.
                let _ = tx.send(event);
            }
            if let Err(e) = page.close().await {
                debug!("Closing page for {} failed: {}", url, e);
            }
        };

        info!(
            "Crawl complete ({:?}). Visited {} pages, {} edges",
            termination,
            state.pages.len(),
            state.edges.len()
        );
        Ok(state.into_result(termination, login))
    }

    /// Fetch one frontier url and fold its links into the state. `None` when
    /// the page contributed nothing.
    async fn visit(
        &self,
        page: &mut B::Page,
        url: &str,
        state: &mut CrawlState,
    ) -> Option<ProgressEvent> {
        let timings = &self.config.timings;

        let landed = match page.navigate(url, timings.navigation_timeout).await {
            Ok(landed) => landed,
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                return None;
            }
        };

        self.settle(page).await;

        let current = page.current_url().unwrap_or(landed);
        let actual = normalize(&current, url);
        if actual != url && !state.visited.insert(actual.clone()) {
            debug!("{} redirected to already visited {}", url, actual);
            return None;
        }

        let title = match page.title().await {
            Ok(title) if !title.trim().is_empty() => title,
            _ => actual.clone(),
        };
        state.pages.push(Page {
            url: actual.clone(),
            title,
        });

        let raw_links = Self::extract_links(page, &actual).await;
        let admitted = self.config.link_filter.filter(&raw_links, &actual);
        let chosen = prioritize_links(&admitted, &state.inbound, state.pages.len());
        debug!(
            "{}: {} raw links, {} admitted, {} kept",
            actual,
            raw_links.len(),
            admitted.len(),
            chosen.len()
        );

        let mut routes = Vec::with_capacity(chosen.len());
        for target in chosen {
            let target = normalize(&target, &actual);
            state.record_link(&actual, &target);
            routes.push(target);
        }

        Some(ProgressEvent {
            page: actual,
            routes,
        })
    }

    /// Give client-side rendering a chance: wait, scroll down in steps, scroll
    /// back up, wait again. Script failures just end the scrolling.
    async fn settle(&self, page: &mut B::Page) {
        let timings = &self.config.timings;
        sleep(timings.initial_settle).await;

        let mut scrolled = timings.scroll_steps > 0;
        for step in 0..timings.scroll_steps {
            if let Err(e) = page.run_script(&scroll_script(step, timings.scroll_steps)).await {
                debug!("Scroll routine stopped: {}", e);
                scrolled = false;
                break;
            }
            sleep(timings.scroll_step_delay).await;
        }
        if scrolled && page.run_script(SCROLL_TOP_SCRIPT).await.is_ok() {
            sleep(timings.scroll_reset_delay).await;
        }

        sleep(timings.final_settle).await;
    }

    async fn extract_links(page: &B::Page, page_url: &str) -> Vec<String> {
        let raw = match page.query_links(LINK_SELECTOR).await {
            Ok(links) => links,
            Err(e) => {
                debug!("Primary link query failed on {}: {}", page_url, e);
                match page.query_links(ANCHOR_SELECTOR).await {
                    Ok(links) => links,
                    Err(e) => {
                        warn!("No links extracted from {}: {}", page_url, e);
                        Vec::new()
                    }
                }
            }
        };

        let mut seen = HashSet::new();
        raw.into_iter().filter(|href| seen.insert(href.clone())).collect()
    }
}
