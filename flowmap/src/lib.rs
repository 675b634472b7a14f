pub mod handlers;

pub use handlers::{
    CrawlRequest, OutputFormat, StreamEvent, execute_crawl, parse_start_url, save_flow_map,
};
