use flowmap_scanner::Edge;
use flowmap_scanner::normalize::canonicalize;
use std::collections::{HashMap, HashSet};

/// Collapse the edges into global-navigation targets down to one per target.
///
/// Self-loops are always dropped. For a nav target the edge leaving `root`
/// wins, otherwise the first one seen. The output lists the remaining
/// non-nav edges in input order, then the kept nav edges in the order their
/// targets first appeared.
pub fn denoise_edges(edges: &[Edge], global_nav: &[String], root: Option<&str>) -> Vec<Edge> {
    let nav: HashSet<String> = global_nav.iter().map(|u| canonicalize(u)).collect();
    let root = root.map(canonicalize);

    let mut content_edges = Vec::new();
    let mut nav_edges: Vec<Edge> = Vec::new();
    let mut nav_slot: HashMap<String, usize> = HashMap::new();

    for edge in edges {
        let canonical = Edge::new(canonicalize(&edge.from), canonicalize(&edge.to));
        if canonical.is_self_loop() {
            continue;
        }
        let Edge { from, to } = canonical;

        if !nav.contains(&to) {
            content_edges.push(edge.clone());
            continue;
        }

        match nav_slot.get(&to) {
            None => {
                nav_slot.insert(to, nav_edges.len());
                nav_edges.push(edge.clone());
            }
            Some(&slot) => {
                let from_root = root.as_deref() == Some(from.as_str());
                let kept_from_root = root.as_deref() == Some(canonicalize(&nav_edges[slot].from).as_str());
                if from_root && !kept_from_root {
                    nav_edges[slot] = edge.clone();
                }
            }
        }
    }

    content_edges.extend(nav_edges);
    content_edges
}
