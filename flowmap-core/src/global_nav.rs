use flowmap_scanner::Edge;
use flowmap_scanner::normalize::canonicalize;
use std::collections::HashMap;

/// Inbound-count cutoff for global navigation: `max(2, ceil(0.5 * page_count))`.
///
/// Deliberately stricter than the crawl-time prioritization cutoff.
pub fn global_nav_threshold(page_count: usize) -> usize {
    page_count.div_ceil(2).max(2)
}

/// Link targets that enough of the crawled pages point at to count as site
/// chrome (header, footer, sidebars). Targets are canonicalized before
/// counting and returned in the order they were first seen.
pub fn detect_global_nav(edges: &[Edge], page_count: usize) -> Vec<String> {
    if page_count == 0 {
        return Vec::new();
    }

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for edge in edges {
        let target = canonicalize(&edge.to);
        let count = counts.entry(target.clone()).or_insert(0);
        if *count == 0 {
            order.push(target);
        }
        *count += 1;
    }

    let threshold = global_nav_threshold(page_count);
    order
        .into_iter()
        .filter(|target| counts[target] >= threshold)
        .collect()
}
