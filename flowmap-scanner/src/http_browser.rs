use crate::browser::{Browser, BrowserPage, ElementHandle, Locator};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

const FORM_CONTROLS: &str = "input, textarea, select";

/// Connection settings for [`HttpBrowser`].
#[derive(Debug, Clone)]
pub struct HttpBrowserOptions {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for HttpBrowserOptions {
    fn default() -> Self {
        Self {
            user_agent: "Flowmap/0.1 (https://github.com/trapdoorsec/flowmap)".to_string(),
            request_timeout: Duration::from_secs(20),
            max_redirects: 10,
        }
    }
}

/// Static-HTML browser: a cookie-carrying HTTP client plus a parsed DOM.
///
/// Every page opened from one `HttpBrowser` shares its cookie jar, so a login
/// performed on one page carries over to the rest of the crawl.
#[derive(Clone)]
pub struct HttpBrowser {
    client: Client,
    request_timeout: Duration,
}

impl HttpBrowser {
    pub fn launch() -> Result<Self> {
        Self::with_options(HttpBrowserOptions::default())
    }

    pub fn with_options(options: HttpBrowserOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent)
            .cookie_store(true)
            .timeout(options.request_timeout)
            .connect_timeout(options.request_timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .build()
            .map_err(|e| ScanError::Launch(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout: options.request_timeout,
        })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    type Page = HttpPage;

    async fn new_page(&self) -> Result<HttpPage> {
        Ok(HttpPage {
            client: self.client.clone(),
            action_timeout: self.request_timeout,
            url: None,
            body: None,
            filled: Vec::new(),
        })
    }
}

pub struct HttpPage {
    client: Client,
    action_timeout: Duration,
    url: Option<Url>,
    body: Option<String>,
    filled: Vec<(ElementHandle, String)>,
}

enum ClickAction {
    Follow(Url),
    Submit {
        method: Method,
        action: Url,
        fields: Vec<(String, String)>,
    },
    Nothing,
}

impl HttpPage {
    fn document(&self) -> Result<(Html, &Url)> {
        match (&self.body, &self.url) {
            (Some(body), Some(url)) => Ok((Html::parse_document(body), url)),
            _ => Err(ScanError::NoDocument),
        }
    }

    /// Send the request and read the body under a single deadline.
    async fn fetch(
        &mut self,
        request: RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> Result<String> {
        let response = async {
            let response = request.send().await?;
            let final_url = response.url().clone();
            let body = response.text().await?;
            Ok::<_, ScanError>((final_url, body))
        };
        let (final_url, body) = tokio::time::timeout(timeout, response)
            .await
            .map_err(|_| ScanError::Timeout {
                url: url.to_string(),
                timeout,
            })??;

        debug!("Loaded {} ({} bytes)", final_url, body.len());
        self.url = Some(final_url.clone());
        self.body = Some(body);
        self.filled.clear();
        Ok(final_url.to_string())
    }

    fn click_action(&self, element: &ElementHandle) -> Result<ClickAction> {
        let (document, base) = self.document()?;
        let target = nth_match(&document, element)
            .ok_or_else(|| ScanError::Other("element is no longer attached".to_string()))?;

        if target.value().name() == "a" {
            return Ok(match target.value().attr("href").map(|h| base.join(h)) {
                Some(Ok(url)) => ClickAction::Follow(url),
                _ => ClickAction::Nothing,
            });
        }

        let Some(form) = enclosing_form(&target) else {
            return Ok(ClickAction::Nothing);
        };

        let method = match form.value().attr("method").map(str::to_ascii_lowercase) {
            Some(m) if m == "post" => Method::POST,
            _ => Method::GET,
        };
        let action = match form.value().attr("action").filter(|a| !a.trim().is_empty()) {
            Some(action) => base
                .join(action)
                .map_err(|e| ScanError::InvalidUrl(e.to_string()))?,
            None => base.clone(),
        };

        let mut fields = default_form_fields(&form, &target);

        for (handle, value) in &self.filled {
            let Some(control) = nth_match(&document, handle) else {
                continue;
            };
            let same_form = enclosing_form(&control).is_some_and(|f| f.id() == form.id());
            let Some(name) = control.value().attr("name") else {
                continue;
            };
            if !same_form {
                continue;
            }
            match fields.iter_mut().find(|(n, _)| n == name) {
                Some(field) => field.1 = value.clone(),
                None => fields.push((name.to_string(), value.clone())),
            }
        }

        if let Some(name) = target.value().attr("name") {
            let value = target.value().attr("value").unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }

        Ok(ClickAction::Submit {
            method,
            action,
            fields,
        })
    }
}

#[async_trait]
impl BrowserPage for HttpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        let request = self.client.get(parsed);
        self.fetch(request, url, timeout).await
    }

    fn current_url(&self) -> Option<String> {
        self.url.as_ref().map(Url::to_string)
    }

    async fn title(&self) -> Result<String> {
        let (document, _) = self.document()?;
        let selector = parse_selector("title")?;
        Ok(document
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default())
    }

    async fn run_script(&mut self, _script: &str) -> Result<()> {
        Err(ScanError::Unsupported("script execution"))
    }

    async fn query_links(&self, selector: &str) -> Result<Vec<String>> {
        let (document, base) = self.document()?;
        let selector = parse_selector(selector)?;
        Ok(extract_links(&document, base, &selector))
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        let (document, _) = self.document()?;
        Ok(matches(&document, locator).first().map(|_| ElementHandle {
            locator: locator.clone(),
            index: 0,
        }))
    }

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<()> {
        {
            let (document, _) = self.document()?;
            if nth_match(&document, element).is_none() {
                return Err(ScanError::Other("element is no longer attached".to_string()));
            }
        }
        self.filled.retain(|(handle, _)| handle != element);
        self.filled.push((element.clone(), value.to_string()));
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let action = self.click_action(element)?;
        match action {
            ClickAction::Follow(url) => {
                debug!("Following link to {}", url);
                let request = self.client.get(url.clone());
                self.fetch(request, url.as_str(), self.action_timeout).await?;
            }
            ClickAction::Submit {
                method,
                action,
                fields,
            } => {
                debug!("Submitting form to {} ({} fields)", action, fields.len());
                let request = if method == Method::POST {
                    self.client.post(action.clone()).form(&fields)
                } else {
                    let mut url = action.clone();
                    url.query_pairs_mut().clear().extend_pairs(&fields);
                    self.client.get(url)
                };
                self.fetch(request, action.as_str(), self.action_timeout).await?;
            }
            ClickAction::Nothing => {}
        }
        Ok(())
    }

    async fn wait_for_quiescence(&mut self, _timeout: Duration) -> Result<()> {
        // Responses are read to completion in `fetch`, nothing is left in flight.
        Ok(())
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::InvalidSelector(format!("{}: {:?}", css, e)))
}

fn matches<'a>(document: &'a Html, locator: &Locator) -> Vec<ElementRef<'a>> {
    match locator {
        Locator::Css(css) => match parse_selector(css) {
            Ok(selector) => document.select(&selector).collect(),
            Err(e) => {
                debug!("Unusable locator: {}", e);
                Vec::new()
            }
        },
        Locator::ButtonText(text) => {
            let needle = text.to_lowercase();
            let Ok(selector) = parse_selector("button") else {
                return Vec::new();
            };
            document
                .select(&selector)
                .filter(|b| b.text().collect::<String>().to_lowercase().contains(&needle))
                .collect()
        }
    }
}

fn nth_match<'a>(document: &'a Html, handle: &ElementHandle) -> Option<ElementRef<'a>> {
    matches(document, &handle.locator).into_iter().nth(handle.index)
}

fn enclosing_form<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "form")
}

/// Name/value pairs a form would submit untouched, excluding buttons.
fn default_form_fields(form: &ElementRef<'_>, clicked: &ElementRef<'_>) -> Vec<(String, String)> {
    let Ok(controls) = parse_selector(FORM_CONTROLS) else {
        return Vec::new();
    };
    let mut fields = Vec::new();

    for control in form.select(&controls) {
        if control.id() == clicked.id() {
            continue;
        }
        let el = control.value();
        let Some(name) = el.attr("name") else {
            continue;
        };
        if el.attr("disabled").is_some() {
            continue;
        }

        let value = match el.name() {
            "textarea" => control.text().collect::<String>(),
            "select" => selected_option(&control),
            _ => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "image" | "reset" | "file" => continue,
                    "checkbox" | "radio" => {
                        if el.attr("checked").is_none() {
                            continue;
                        }
                        el.attr("value").unwrap_or("on").to_string()
                    }
                    _ => el.attr("value").unwrap_or_default().to_string(),
                }
            }
        };
        fields.push((name.to_string(), value));
    }
    fields
}

fn selected_option(select: &ElementRef<'_>) -> String {
    let Ok(options) = parse_selector("option") else {
        return String::new();
    };
    let all: Vec<ElementRef<'_>> = select.select(&options).collect();
    all.iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| all.first())
        .map(|o| {
            o.value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| o.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

fn extract_links(document: &Html, base: &Url, selector: &Selector) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(selector) {
        let el = element.value();
        let raw = ["href", "data-href", "routerlink"]
            .iter()
            .filter_map(|attr| el.attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty());
        let Some(raw) = raw else {
            continue;
        };
        if raw == "#" || raw.to_ascii_lowercase().starts_with("javascript:") {
            continue;
        }
        let Ok(absolute) = base.join(raw) else {
            continue;
        };
        let absolute = absolute.to_string();
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ANCHOR_SELECTOR, LINK_SELECTOR};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><head><title>Test page</title></head><body>{}</body></html>", body))
    }

    #[tokio::test]
    async fn test_navigate_times_out_as_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(html("slow").set_delay(Duration::from_millis(800)))
            .mount(&server)
            .await;

        let browser = HttpBrowser::launch().unwrap();
        let mut page = browser.new_page().await.unwrap();
        let started = std::time::Instant::now();
        let result = page
            .navigate(&format!("{}/slow", server.uri()), Duration::from_millis(200))
            .await;

        assert!(matches!(result, Err(ScanError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_millis(600));
        assert!(page.current_url().is_none());
    }

    #[tokio::test]
    async fn test_navigate_reports_final_url_after_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/new", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(html("moved"))
            .mount(&server)
            .await;

        let browser = HttpBrowser::launch().unwrap();
        let mut page = browser.new_page().await.unwrap();
        let final_url = page
            .navigate(&format!("{}/old", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(final_url, format!("{}/new", server.uri()));
        assert_eq!(page.title().await.unwrap(), "Test page");
    }

    #[tokio::test]
    async fn test_query_links_resolves_and_dedupes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r##"<a href="/a">A</a>
                   <a href="/a">A again</a>
                   <div data-href="/b">B</div>
                   <span routerLink="/c">C</span>
                   <a href="#">nothing</a>
                   <a href="javascript:void(0)">js</a>"##,
            ))
            .mount(&server)
            .await;

        let browser = HttpBrowser::launch().unwrap();
        let mut page = browser.new_page().await.unwrap();
        page.navigate(&format!("{}/", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        let links = page.query_links(LINK_SELECTOR).await.unwrap();
        assert_eq!(
            links,
            vec![
                format!("{}/a", server.uri()),
                format!("{}/b", server.uri()),
                format!("{}/c", server.uri()),
            ]
        );

        let anchors = page.query_links(ANCHOR_SELECTOR).await.unwrap();
        assert_eq!(anchors, vec![format!("{}/a", server.uri())]);
    }

    #[tokio::test]
    async fn test_queries_fail_before_navigation() {
        let browser = HttpBrowser::launch().unwrap();
        let page = browser.new_page().await.unwrap();
        assert!(matches!(page.title().await, Err(ScanError::NoDocument)));
        assert!(page.query_links(ANCHOR_SELECTOR).await.is_err());
    }

    #[tokio::test]
    async fn test_run_script_is_unsupported() {
        let browser = HttpBrowser::launch().unwrap();
        let mut page = browser.new_page().await.unwrap();
        assert!(matches!(
            page.run_script("window.scrollTo(0, 0)").await,
            Err(ScanError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_form_submission_posts_filled_and_hidden_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<form method="post" action="/session">
                     <input type="hidden" name="csrf" value="tok123">
                     <input type="email" name="email">
                     <input type="password" name="password">
                     <button type="submit">Sign in</button>
                   </form>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_string_contains("csrf=tok123"))
            .and(body_string_contains("email=me%40a.com"))
            .and(body_string_contains("password=hunter2"))
            .respond_with(html("welcome"))
            .expect(1)
            .mount(&server)
            .await;

        let browser = HttpBrowser::launch().unwrap();
        let mut page = browser.new_page().await.unwrap();
        page.navigate(&format!("{}/", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        let email = page
            .find_element(&Locator::Css(r#"input[type="email"]"#))
            .await
            .unwrap()
            .unwrap();
        let password = page
            .find_element(&Locator::Css(r#"input[type="password"]"#))
            .await
            .unwrap()
            .unwrap();
        page.fill(&email, "me@a.com").await.unwrap();
        page.fill(&password, "hunter2").await.unwrap();

        let submit = page
            .find_element(&Locator::ButtonText("sign in"))
            .await
            .unwrap()
            .unwrap();
        page.click(&submit).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_element_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html("<p>no forms here</p>"))
            .mount(&server)
            .await;

        let browser = HttpBrowser::launch().unwrap();
        let mut page = browser.new_page().await.unwrap();
        page.navigate(&format!("{}/", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        let found = page
            .find_element(&Locator::Css(r#"input[type="password"]"#))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
