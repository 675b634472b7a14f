use crate::classify::{Classification, FlowClassifier, run_classifier};
use crate::denoise::denoise_edges;
use crate::global_nav::detect_global_nav;
use crate::summary::{FlowSummary, base_origin, to_full_url};
use flowmap_scanner::{CrawlResult, Edge, Page};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One user journey through the site, as an ordered list of page urls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub page_urls: Vec<String>,
}

/// Final result of a crawl plus flow extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMap {
    pub pages: Vec<Page>,
    pub edges: Vec<Edge>,
    pub flows: Vec<Flow>,
    pub global_nav_urls: Vec<String>,
    pub denoised_edges: Vec<Edge>,
}

#[derive(Debug, Clone)]
pub struct FlowExtraction {
    pub map: FlowMap,
    /// Set when a configured classifier failed. The graph is still complete.
    pub error: Option<String>,
}

/// Start url if given, else the first crawled page.
fn graph_root<'a>(start_url: &'a str, pages: &'a [Page]) -> Option<&'a str> {
    let start_url = start_url.trim();
    if start_url.is_empty() {
        pages.first().map(|p| p.url.as_str())
    } else {
        Some(start_url)
    }
}

/// Shape the crawl graph into flows: detect global navigation, ask the
/// classifier (when there is one) to refine it and name the flows, then
/// denoise the edges against whichever nav set won.
pub async fn extract_flows(
    crawl: &CrawlResult,
    start_url: &str,
    classifier: Option<&dyn FlowClassifier>,
) -> FlowExtraction {
    let heuristic_nav = detect_global_nav(&crawl.edges, crawl.pages.len());
    let base = base_origin(Some(start_url), &crawl.pages);
    let summary = FlowSummary::build(&crawl.pages, &crawl.edges, &heuristic_nav, base.as_deref());

    let (global_nav_urls, flows, error) = match run_classifier(classifier, &summary).await {
        Classification::Classified {
            global_nav_urls,
            flows,
        } => {
            let global_nav_urls = global_nav_urls
                .iter()
                .map(|path| to_full_url(path, base.as_deref()))
                .collect();
            let flows = flows
                .into_iter()
                .map(|flow| Flow {
                    page_urls: flow
                        .page_urls
                        .iter()
                        .map(|path| to_full_url(path, base.as_deref()))
                        .collect(),
                    ..flow
                })
                .collect();
            (global_nav_urls, flows, None)
        }
        Classification::Unavailable => (heuristic_nav, Vec::new(), None),
        Classification::Error(message) => (heuristic_nav, Vec::new(), Some(message)),
    };

    let denoised_edges = denoise_edges(
        &crawl.edges,
        &global_nav_urls,
        graph_root(start_url, &crawl.pages),
    );
    info!(
        "{} flows, {} global nav urls, {} of {} edges kept after denoising",
        flows.len(),
        global_nav_urls.len(),
        denoised_edges.len(),
        crawl.edges.len()
    );

    FlowExtraction {
        map: FlowMap {
            pages: crawl.pages.clone(),
            edges: crawl.edges.clone(),
            flows,
            global_nav_urls,
            denoised_edges,
        },
        error,
    }
}
