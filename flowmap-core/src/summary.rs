use flowmap_scanner::normalize::canonicalize;
use flowmap_scanner::{Edge, Page};
use serde::{Deserialize, Serialize};
use url::Url;

pub const MAX_SUMMARY_PAGES: usize = 15;
pub const MAX_SUMMARY_EDGES: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPage {
    pub path: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEdge {
    pub from: String,
    pub to: String,
}

/// Compact, path-based view of a crawl handed to the flow classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub base_url: Option<String>,
    pub pages: Vec<SummaryPage>,
    pub edges: Vec<SummaryEdge>,
    pub global_nav_heuristic: Vec<String>,
}

impl FlowSummary {
    /// Summarize the first [`MAX_SUMMARY_PAGES`] pages and [`MAX_SUMMARY_EDGES`]
    /// edges, plus the heuristic global-nav targets, relative to `base_url`.
    pub fn build(
        pages: &[Page],
        edges: &[Edge],
        global_nav: &[String],
        base_url: Option<&str>,
    ) -> Self {
        Self {
            base_url: base_url.map(str::to_string),
            pages: pages
                .iter()
                .take(MAX_SUMMARY_PAGES)
                .map(|p| SummaryPage {
                    path: to_path(&p.url, base_url),
                    title: p.title.clone(),
                })
                .collect(),
            edges: edges
                .iter()
                .take(MAX_SUMMARY_EDGES)
                .map(|e| SummaryEdge {
                    from: to_path(&e.from, base_url),
                    to: to_path(&e.to, base_url),
                })
                .collect(),
            global_nav_heuristic: global_nav.iter().map(|u| to_path(u, base_url)).collect(),
        }
    }
}

/// Origin the summary paths are relative to: the start url's, else the first
/// page's. Urls without a tuple origin (`data:`, `file:`) have none.
pub fn base_origin(start_url: Option<&str>, pages: &[Page]) -> Option<String> {
    let origin_of = |url: &str| {
        let origin = Url::parse(url.trim()).ok()?.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    };

    start_url
        .filter(|s| !s.trim().is_empty())
        .and_then(origin_of)
        .or_else(|| pages.first().and_then(|p| origin_of(&p.url)))
}

/// Path of `url` relative to `base`, without query or trailing slash. With no
/// base, or if `url` does not parse against it, `url` comes back unchanged.
pub fn to_path(url: &str, base: Option<&str>) -> String {
    let Some(base) = base else {
        return url.to_string();
    };
    match Url::parse(base).and_then(|b| b.join(url)) {
        Ok(resolved) => {
            let path = resolved.path().trim_end_matches('/');
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        }
        Err(_) => url.to_string(),
    }
}

/// Inverse of [`to_path`] for classifier output: resolve a path against the
/// base origin into a canonical url. Absolute http(s) urls pass through.
pub fn to_full_url(path: &str, base: Option<&str>) -> String {
    let path = path.trim();
    let Some(base) = base else {
        return path.to_string();
    };
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let rooted = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    match Url::parse(base).and_then(|b| b.join(&rooted)) {
        Ok(resolved) => canonicalize(resolved.as_str()),
        Err(_) => path.to_string(),
    }
}
