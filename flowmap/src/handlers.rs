use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use flowmap_core::classify::{FlowClassifier, GroqClassifier};
use flowmap_core::flows::{FlowMap, extract_flows};
use flowmap_core::report::{ReportContext, generate_flow_report};
use flowmap_scanner::{
    Browser, CrawlConfig, CrawlResult, Credentials, Crawler, HttpBrowser, ProgressEvent,
    ProgressReceiver, SettleTimings, clamp_max_pages, clamp_max_time, progress_channel,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Parse a start url, adding `http://` when the scheme is missing.
pub fn parse_start_url(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(url.to_string());
    }

    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON event per line on stdout.
    Ndjson,
    /// Coloured report once the crawl is done.
    Text,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ndjson" | "json" => Ok(OutputFormat::Ndjson),
            "text" => Ok(OutputFormat::Text),
            other => bail!("Unknown output format '{}'", other),
        }
    }
}

/// Line-delimited events written to stdout in [`OutputFormat::Ndjson`].
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent<'a> {
    Progress {
        page: &'a str,
        routes: &'a [String],
    },
    Extracting {
        message: &'a str,
    },
    Result {
        data: &'a FlowMap,
        #[serde(rename = "flowExtractError", skip_serializing_if = "Option::is_none")]
        flow_extract_error: Option<&'a str>,
    },
    Error {
        error: String,
    },
}

pub fn write_event<W: Write>(out: &mut W, event: &StreamEvent<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Everything the `crawl` subcommand was asked to do.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub start_url: String,
    pub max_pages: usize,
    pub max_time: Option<Duration>,
    pub credentials: Option<Credentials>,
    pub settle: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

impl CrawlRequest {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_pages: clamp_max_pages(None),
            max_time: None,
            credentials: None,
            settle: true,
            format: OutputFormat::Ndjson,
            output: None,
            quiet: false,
        }
    }

    pub fn from_matches(args: &ArgMatches, quiet: bool) -> Result<Self> {
        let raw_url = args
            .get_one::<String>("url")
            .context("--url is required")?;
        let Some(start_url) = parse_start_url(raw_url) else {
            bail!("Invalid start URL '{}'", raw_url);
        };

        let format = args
            .get_one::<String>("format")
            .map(|f| f.parse::<OutputFormat>())
            .transpose()?
            .unwrap_or(OutputFormat::Ndjson);

        Ok(Self {
            start_url,
            max_pages: clamp_max_pages(args.get_one::<i64>("max-pages").copied()),
            max_time: clamp_max_time(args.get_one::<u64>("max-time").copied()),
            credentials: Credentials::from_parts(
                args.get_one::<String>("email").map(String::as_str),
                args.get_one::<String>("password").map(String::as_str),
            ),
            settle: !args.get_flag("no-settle"),
            format,
            output: args.get_one::<PathBuf>("output").cloned(),
            quiet,
        })
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        let timings = if self.settle {
            SettleTimings::default()
        } else {
            SettleTimings::none()
        };
        CrawlConfig::new(self.start_url.clone())
            .with_max_pages(self.max_pages)
            .with_max_time(self.max_time)
            .with_credentials(self.credentials.clone())
            .with_timings(timings)
    }
}

fn new_spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting crawl...");
    Some(spinner)
}

/// Drain progress events until the crawl drops its sender.
async fn forward_progress<W: Write>(
    mut rx: ProgressReceiver,
    format: OutputFormat,
    out: &mut W,
    spinner: Option<&ProgressBar>,
) -> io::Result<usize> {
    let mut seen = 0;
    while let Some(ProgressEvent { page, routes }) = rx.recv().await {
        seen += 1;
        if let Some(spinner) = spinner {
            spinner.set_message(format!("Crawling... {} pages, last {}", seen, page));
        }
        if format == OutputFormat::Ndjson {
            write_event(
                out,
                &StreamEvent::Progress {
                    page: &page,
                    routes: &routes,
                },
            )?;
        }
    }
    Ok(seen)
}

/// Crawl, extract flows and render the result to `out`.
pub async fn execute_crawl<B: Browser, W: Write>(
    browser: B,
    request: &CrawlRequest,
    classifier: Option<&dyn FlowClassifier>,
    out: &mut W,
) -> Result<FlowMap> {
    let spinner = new_spinner(request.quiet);
    let crawler = Crawler::new(browser, request.crawl_config());
    let (tx, rx) = progress_channel();

    let (crawled, forwarded) = tokio::join!(
        crawler.crawl(Some(tx)),
        forward_progress(rx, request.format, out, spinner.as_ref()),
    );
    forwarded.context("Failed to write progress")?;

    let crawl: CrawlResult = match crawled {
        Ok(crawl) => crawl,
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.finish_and_clear();
            }
            if request.format == OutputFormat::Ndjson {
                write_event(out, &StreamEvent::Error { error: e.to_string() })?;
            }
            return Err(e).context("Crawl failed");
        }
    };

    let message = "Extracting user flows...";
    if let Some(spinner) = &spinner {
        spinner.set_message(message);
    }
    if request.format == OutputFormat::Ndjson {
        write_event(out, &StreamEvent::Extracting { message })?;
    }

    let extraction = extract_flows(&crawl, &request.start_url, classifier).await;
    if let Some(spinner) = &spinner {
        spinner.finish_with_message(format!(
            "Crawl complete! {} pages, {} flows",
            extraction.map.pages.len(),
            extraction.map.flows.len()
        ));
    }

    match request.format {
        OutputFormat::Ndjson => write_event(
            out,
            &StreamEvent::Result {
                data: &extraction.map,
                flow_extract_error: extraction.error.as_deref(),
            },
        )?,
        OutputFormat::Text => {
            let report = generate_flow_report(
                &extraction.map,
                &ReportContext {
                    start_url: &request.start_url,
                    termination: crawl.termination,
                    login: &crawl.login,
                    flow_error: extraction.error.as_deref(),
                },
            );
            out.write_all(report.as_bytes())?;
            out.flush()?;
        }
    }

    if let Some(path) = &request.output {
        let written = save_flow_map(&extraction.map, path)?;
        info!("Flow map written to {}", written.display());
        if request.format == OutputFormat::Text && !request.quiet {
            eprintln!("{} {}", "[+] Flow map saved to".green(), written.display());
        }
    }

    Ok(extraction.map)
}

/// Write `map` as pretty JSON to `path` (tilde-expanded), creating parent
/// directories. Returns the expanded path.
pub fn save_flow_map(map: &FlowMap, path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref());

    if let Some(parent) = expanded.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(map)?;
    fs::write(&expanded, json)
        .with_context(|| format!("Failed to write {}", expanded.display()))?;
    Ok(expanded)
}

/// Entry point for `flowmap crawl`.
pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> Result<()> {
    let request = CrawlRequest::from_matches(args, quiet)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let classifier = GroqClassifier::from_env().context("Invalid classifier configuration")?;
    if classifier.is_none() {
        warn!("GROQ_API_KEY not set, flows will not be classified");
    }

    let browser = match HttpBrowser::launch() {
        Ok(browser) => browser,
        Err(e) => {
            if request.format == OutputFormat::Ndjson {
                write_event(&mut out, &StreamEvent::Error { error: e.to_string() })?;
            }
            return Err(e).context("Failed to start browser session");
        }
    };

    execute_crawl(
        browser,
        &request,
        classifier.as_ref().map(|c| c as &dyn FlowClassifier),
        &mut out,
    )
    .await?;
    Ok(())
}
