use crate::login::LoginOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// One fetched page and the targets the crawl kept from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub page: String,
    pub routes: Vec<String>,
}

/// Why the crawl loop stopped. Every variant still carries a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    Completed,
    PageBudgetExhausted,
    TimeBudgetExhausted,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub pages: Vec<Page>,
    pub edges: Vec<Edge>,
    pub termination: Termination,
    pub login: LoginOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_self_loop() {
        assert!(Edge::new("http://a.com/", "http://a.com/").is_self_loop());
        assert!(!Edge::new("http://a.com/", "http://a.com/b").is_self_loop());
    }

    #[test]
    fn test_crawl_result_json() {
        let result = CrawlResult {
            pages: vec![Page {
                url: "http://a.com/".to_string(),
                title: "Home".to_string(),
            }],
            edges: Vec::new(),
            termination: Termination::TimeBudgetExhausted,
            login: LoginOutcome::Failed("no password field".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "pages": [{"url": "http://a.com/", "title": "Home"}],
                "edges": [],
                "termination": "timeBudgetExhausted",
                "login": {"status": "failed", "reason": "no password field"},
            })
        );
        assert_eq!(
            serde_json::to_value(LoginOutcome::Skipped).unwrap(),
            json!({"status": "skipped"})
        );
    }
}
