pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod filter;
pub mod http_browser;
pub mod login;
pub mod normalize;
pub mod prioritize;
pub mod result;

#[cfg(test)]
mod testing;

pub use browser::{Browser, BrowserPage, ElementHandle, Locator};
pub use config::{Credentials, CrawlConfig, SettleTimings, clamp_max_pages, clamp_max_time};
pub use crawler::{Crawler, ProgressReceiver, ProgressSender, progress_channel};
pub use error::ScanError;
pub use filter::LinkFilter;
pub use http_browser::{HttpBrowser, HttpBrowserOptions};
pub use login::LoginOutcome;
pub use result::{CrawlResult, Edge, Page, ProgressEvent, Termination};
