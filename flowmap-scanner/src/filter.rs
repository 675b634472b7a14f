use crate::normalize::{is_same_site, normalize};
use tracing::debug;
use url::Url;

/// Path prefixes that are chrome on almost every site and never worth a crawl slot.
pub const DEFAULT_GLOBAL_PREFIXES: &[&str] = &[
    "login", "signin", "signup", "logout", "register", "terms", "privacy", "about", "contact",
    "help", "faq", "cookie",
];

pub const DEFAULT_MAX_PATH_DEPTH: usize = 5;

const ASSET_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "css", "js", "woff", "woff2", "ttf",
    "eot",
];

/// Admission test for outbound links: same site, navigable, not an asset,
/// not a well-known global page, and not too deep.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    global_prefixes: Vec<String>,
    max_path_depth: usize,
}

impl LinkFilter {
    pub fn new() -> Self {
        Self {
            global_prefixes: DEFAULT_GLOBAL_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
        }
    }

    pub fn with_global_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_prefixes = prefixes
            .into_iter()
            .map(|p| p.into().trim_matches('/').to_lowercase())
            .collect();
        self
    }

    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    pub fn max_path_depth(&self) -> usize {
        self.max_path_depth
    }

    /// Returns the normalized target when `href` (found on `page_url`) passes
    /// every rule, `None` otherwise.
    pub fn admit(&self, href: &str, page_url: &str) -> Option<String> {
        let href = href.trim();
        if !is_meaningful_link(href, page_url) {
            return None;
        }

        let target = normalize(href, page_url);
        let path = Url::parse(&target).ok()?.path().to_string();

        if self.is_global_path(&path) {
            debug!("  -> {} is a global page, skipping", target);
            return None;
        }
        if path_depth(&path) > self.max_path_depth {
            debug!("  -> {} is deeper than {}, skipping", target, self.max_path_depth);
            return None;
        }
        Some(target)
    }

    /// Apply [`LinkFilter::admit`] to every href, keeping discovery order.
    pub fn filter<I, S>(&self, hrefs: I, page_url: &str) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hrefs
            .into_iter()
            .filter_map(|href| self.admit(href.as_ref(), page_url))
            .collect()
    }

    fn is_global_path(&self, path: &str) -> bool {
        let first_segment = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        !first_segment.is_empty() && self.global_prefixes.iter().any(|p| *p == first_segment)
    }
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Same-site, http(s), non-asset check on a raw href.
pub fn is_meaningful_link(href: &str, base: &str) -> bool {
    let lowered = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("javascript:")
    {
        return false;
    }

    let Some(resolved) = Url::parse(base).and_then(|b| b.join(href)).ok() else {
        return false;
    };
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return false;
    }
    if !is_same_site(resolved.as_str(), base) {
        return false;
    }
    !is_static_asset(resolved.path())
}

/// Number of non-empty path segments.
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

fn is_static_asset(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    match lowered.rsplit_once('.') {
        Some((_, ext)) => ASSET_EXTENSIONS.contains(&ext),
        None => false,
    }
}
