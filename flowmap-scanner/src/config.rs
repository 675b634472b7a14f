use crate::filter::LinkFilter;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MAX_PAGES: usize = 10;
pub const MAX_PAGES_LIMIT: usize = 200;
pub const MIN_MAX_TIME_SECS: u64 = 10;
pub const MAX_MAX_TIME_SECS: u64 = 3600;

/// Clamp a requested page budget to `[1, 200]`, defaulting to 10.
pub fn clamp_max_pages(requested: Option<i64>) -> usize {
    match requested {
        Some(n) => n.clamp(1, MAX_PAGES_LIMIT as i64) as usize,
        None => DEFAULT_MAX_PAGES,
    }
}

/// Clamp a requested time budget in seconds to `[10, 3600]`. No request means no time budget.
pub fn clamp_max_time(requested_secs: Option<u64>) -> Option<Duration> {
    requested_secs
        .map(|secs| Duration::from_secs(secs.clamp(MIN_MAX_TIME_SECS, MAX_MAX_TIME_SECS)))
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Both parts are trimmed; a blank part means no credentials at all.
    pub fn from_parts(email: Option<&str>, password: Option<&str>) -> Option<Self> {
        let email = email.map(str::trim).filter(|e| !e.is_empty())?;
        let password = password.map(str::trim).filter(|p| !p.is_empty())?;
        Some(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Waits that let client-rendered content appear before links are read.
#[derive(Debug, Clone)]
pub struct SettleTimings {
    pub navigation_timeout: Duration,
    pub initial_settle: Duration,
    pub scroll_steps: usize,
    pub scroll_step_delay: Duration,
    pub scroll_reset_delay: Duration,
    pub final_settle: Duration,
    pub login_settle: Duration,
    pub login_submit_settle: Duration,
    pub quiescence_timeout: Duration,
}

impl SettleTimings {
    /// No waiting at all; navigation keeps its timeout.
    pub fn none() -> Self {
        Self {
            initial_settle: Duration::ZERO,
            scroll_step_delay: Duration::ZERO,
            scroll_reset_delay: Duration::ZERO,
            final_settle: Duration::ZERO,
            login_settle: Duration::ZERO,
            login_submit_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(20),
            initial_settle: Duration::from_millis(1500),
            scroll_steps: 5,
            scroll_step_delay: Duration::from_millis(400),
            scroll_reset_delay: Duration::from_millis(500),
            final_settle: Duration::from_millis(1000),
            login_settle: Duration::from_millis(1500),
            login_submit_settle: Duration::from_millis(2000),
            quiescence_timeout: Duration::from_secs(30),
        }
    }
}

/// Everything one crawl invocation needs to know.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_url: String,
    pub max_pages: usize,
    pub max_time: Option<Duration>,
    pub credentials: Option<Credentials>,
    pub timings: SettleTimings,
    pub link_filter: LinkFilter,
}

impl CrawlConfig {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_pages: DEFAULT_MAX_PAGES,
            max_time: None,
            credentials: None,
            timings: SettleTimings::default(),
            link_filter: LinkFilter::default(),
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.clamp(1, MAX_PAGES_LIMIT);
        self
    }

    pub fn with_max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timings(mut self, timings: SettleTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_link_filter(mut self, link_filter: LinkFilter) -> Self {
        self.link_filter = link_filter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_max_pages() {
        assert_eq!(clamp_max_pages(None), 10);
        assert_eq!(clamp_max_pages(Some(0)), 1);
        assert_eq!(clamp_max_pages(Some(-4)), 1);
        assert_eq!(clamp_max_pages(Some(50)), 50);
        assert_eq!(clamp_max_pages(Some(10_000)), 200);
    }

    #[test]
    fn test_clamp_max_time() {
        assert_eq!(clamp_max_time(None), None);
        assert_eq!(clamp_max_time(Some(1)), Some(Duration::from_secs(10)));
        assert_eq!(clamp_max_time(Some(90)), Some(Duration::from_secs(90)));
        assert_eq!(clamp_max_time(Some(99_999)), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_credentials_need_both_parts() {
        assert!(Credentials::from_parts(Some("me@a.com"), None).is_none());
        assert!(Credentials::from_parts(Some("  "), Some("pw")).is_none());
        let creds = Credentials::from_parts(Some(" me@a.com "), Some("pw ")).unwrap();
        assert_eq!(creds.email, "me@a.com");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::from_parts(Some("me@a.com"), Some("hunter2")).unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_config_page_budget_is_clamped() {
        assert_eq!(CrawlConfig::new("http://a.com").with_max_pages(0).max_pages, 1);
        assert_eq!(CrawlConfig::new("http://a.com").with_max_pages(500).max_pages, 200);
    }
}
