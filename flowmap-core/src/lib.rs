pub mod classify;
pub mod denoise;
pub mod flows;
pub mod global_nav;
pub mod report;
pub mod summary;

pub use classify::{Classification, ClassifyError, FlowClassifier, GroqClassifier};
pub use denoise::denoise_edges;
pub use flows::{Flow, FlowExtraction, FlowMap, extract_flows};
pub use global_nav::detect_global_nav;
pub use summary::FlowSummary;
