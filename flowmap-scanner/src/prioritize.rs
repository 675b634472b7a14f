use std::collections::HashMap;

pub const MAX_LINKS_PER_PAGE: usize = 12;

/// Live inbound-count cutoff: `max(2, ceil(0.4 * page_count))`.
pub fn live_threshold(page_count: usize) -> usize {
    // ceil(0.4 * n) == ceil(2n / 5)
    (page_count * 2).div_ceil(5).max(2)
}

/// Pick at most [`MAX_LINKS_PER_PAGE`] admitted links, preferring targets
/// that few pages link to so far. If every candidate is already popular the
/// full admitted set is used instead.
pub fn prioritize_links(
    admitted: &[String],
    inbound: &HashMap<String, usize>,
    page_count: usize,
) -> Vec<String> {
    let threshold = live_threshold(page_count);
    let preferred: Vec<&String> = admitted
        .iter()
        .filter(|url| inbound.get(url.as_str()).copied().unwrap_or(0) < threshold)
        .collect();

    let chosen: Vec<&String> = if preferred.is_empty() {
        admitted.iter().collect()
    } else {
        preferred
    };

    chosen
        .into_iter()
        .take(MAX_LINKS_PER_PAGE)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| format!("http://a.com{}", p)).collect()
    }

    #[test]
    fn test_threshold_values() {
        assert_eq!(live_threshold(0), 2);
        assert_eq!(live_threshold(1), 2);
        assert_eq!(live_threshold(5), 2);
        assert_eq!(live_threshold(6), 3);
        assert_eq!(live_threshold(10), 4);
        assert_eq!(live_threshold(11), 5);
    }

    #[test]
    fn test_popular_links_excluded() {
        let admitted = urls(&["/home", "/pricing", "/blog"]);
        let mut inbound = HashMap::new();
        inbound.insert("http://a.com/home".to_string(), 2);
        inbound.insert("http://a.com/pricing".to_string(), 1);

        let chosen = prioritize_links(&admitted, &inbound, 5);
        assert_eq!(chosen, urls(&["/pricing", "/blog"]));
    }

    #[test]
    fn test_falls_back_when_everything_is_popular() {
        let admitted = urls(&["/home", "/pricing"]);
        let mut inbound = HashMap::new();
        inbound.insert("http://a.com/home".to_string(), 7);
        inbound.insert("http://a.com/pricing".to_string(), 2);

        let chosen = prioritize_links(&admitted, &inbound, 5);
        assert_eq!(chosen, admitted);
    }

    #[test]
    fn test_truncates_in_discovery_order() {
        let paths: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
        let admitted: Vec<String> = paths.iter().map(|p| format!("http://a.com{}", p)).collect();

        let chosen = prioritize_links(&admitted, &HashMap::new(), 1);
        assert_eq!(chosen.len(), MAX_LINKS_PER_PAGE);
        assert_eq!(chosen[..], admitted[..MAX_LINKS_PER_PAGE]);
    }

    #[test]
    fn test_empty_input() {
        assert!(prioritize_links(&[], &HashMap::new(), 3).is_empty());
    }
}
