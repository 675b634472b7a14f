use url::Url;

/// Resolve `url` against `base` and reduce it to the canonical form used as
/// the identity key for pages and edges.
///
/// Unparseable input is returned unchanged and treated as an opaque key.
pub fn normalize(url: &str, base: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(url)) {
        Ok(resolved) => canonical_form(resolved),
        Err(_) => url.to_string(),
    }
}

/// Base-less variant of [`normalize`] for urls that are already absolute.
pub fn canonicalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => canonical_form(parsed),
        Err(_) => url.to_string(),
    }
}

fn canonical_form(mut url: Url) -> String {
    url.set_fragment(None);
    if !url.cannot_be_a_base() {
        let path = url.path();
        if path != "/" && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/');
            let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
            url.set_path(&trimmed);
        }
    }
    url.to_string()
}

/// Hostname of `url`, or an empty string when it has none.
pub fn hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Hostname equality that tolerates a `www.` prefix on either side.
pub fn is_same_site(url: &str, base: &str) -> bool {
    let base_host = hostname(base);
    let url_host = hostname(url);
    if base_host == url_host {
        return true;
    }
    url_host == format!("www.{}", base_host) || base_host == format!("www.{}", url_host)
}
