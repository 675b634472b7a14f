// Plain-text rendering of a flow map

use crate::flows::FlowMap;
use crate::summary::{base_origin, to_path};
use colored::Colorize;
use flowmap_scanner::{LoginOutcome, Termination};
use std::collections::HashSet;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Crawl context the map itself does not carry.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub start_url: &'a str,
    pub termination: Termination,
    pub login: &'a LoginOutcome,
    pub flow_error: Option<&'a str>,
}

pub fn termination_label(termination: Termination) -> &'static str {
    match termination {
        Termination::Completed => "frontier exhausted",
        Termination::PageBudgetExhausted => "page budget reached",
        Termination::TimeBudgetExhausted => "time budget reached",
    }
}

/// Generate a text report of pages, global navigation and flows. Urls are
/// shown as paths relative to the site origin.
pub fn generate_flow_report(map: &FlowMap, ctx: &ReportContext<'_>) -> String {
    let base = base_origin(Some(ctx.start_url), &map.pages);
    let path = |url: &str| to_path(url, base.as_deref());

    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Site: {}\n", base.as_deref().unwrap_or(ctx.start_url)));
    report.push_str(&format!(
        "  Pages crawled: {} ({})\n",
        map.pages.len(),
        termination_label(ctx.termination)
    ));
    report.push_str(&format!(
        "  Links: {} ({} after denoising)\n",
        map.edges.len(),
        map.denoised_edges.len()
    ));
    let login = match ctx.login {
        LoginOutcome::Authenticated => "authenticated".green().to_string(),
        LoginOutcome::Skipped => "not attempted".dimmed().to_string(),
        LoginOutcome::Failed(reason) => format!("{} ({})", "failed".yellow(), reason),
    };
    report.push_str(&format!("  Login: {}\n", login));
    report.push_str(&format!("  Flows: {}\n", map.flows.len()));
    if let Some(error) = ctx.flow_error {
        report.push_str(&format!("  {} {}\n", "Flow extraction failed:".red(), error));
    }

    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    let nav: HashSet<&str> = map.global_nav_urls.iter().map(String::as_str).collect();

    report.push_str("## Pages\n");
    for page in &map.pages {
        let marker = if nav.contains(page.url.as_str()) {
            " nav".cyan().to_string()
        } else {
            String::new()
        };
        report.push_str(&format!(
            "  {} {}{}\n",
            path(page.url.as_str()).green(),
            page.title.dimmed(),
            marker
        ));
    }
    report.push('\n');

    if !map.global_nav_urls.is_empty() {
        report.push_str("## Global navigation\n");
        for url in &map.global_nav_urls {
            report.push_str(&format!("  {}\n", path(url.as_str()).cyan()));
        }
        report.push('\n');
    }

    for flow in &map.flows {
        report.push_str(&format!("## {} {}\n", flow.title.bold(), format!("[{}]", flow.id).dimmed()));
        if let Some(description) = &flow.description {
            report.push_str(&format!("  {}\n", description));
        }
        let steps: Vec<String> = flow.page_urls.iter().map(|u| path(u.as_str())).collect();
        report.push_str(&format!("  {}\n\n", steps.join(" → ")));
    }

    report
}
