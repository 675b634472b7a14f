use crate::browser::{Browser, BrowserPage, ElementHandle, Locator};
use crate::config::{Credentials, SettleTimings};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Tried in order; the first field found is used.
pub const EMAIL_LOCATORS: &[Locator] = &[
    Locator::Css(r#"input[type="email"]"#),
    Locator::Css(r#"input[name="email"]"#),
    Locator::Css(r#"input[name="username"]"#),
    Locator::Css(r#"input[autocomplete="username"]"#),
    Locator::Css(r#"input[placeholder*="mail" i]"#),
    Locator::Css(r#"input[placeholder*="user" i]"#),
];

pub const PASSWORD_LOCATOR: Locator = Locator::Css(r#"input[type="password"]"#);

/// Tried in order; the first control found is clicked.
pub const SUBMIT_LOCATORS: &[Locator] = &[
    Locator::Css(r#"button[type="submit"]"#),
    Locator::Css(r#"input[type="submit"]"#),
    Locator::ButtonText("Log in"),
    Locator::ButtonText("Sign in"),
    Locator::ButtonText("Login"),
    Locator::Css(r#"[type="submit"]"#),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum LoginOutcome {
    /// A login form was found, filled and submitted.
    Authenticated,
    /// No credentials were supplied.
    Skipped,
    /// The attempt was abandoned; the crawl continues unauthenticated.
    Failed(String),
}

/// Try once to log in on the start page. Never fails the crawl: whatever
/// cookies the attempt produced stay in the browser context.
pub async fn bootstrap_session<B: Browser>(
    browser: &B,
    start_url: &str,
    credentials: Option<&Credentials>,
    timings: &SettleTimings,
) -> LoginOutcome {
    let Some(credentials) = credentials else {
        return LoginOutcome::Skipped;
    };

    info!("Attempting login on {} as {}", start_url, credentials.email);

    let mut page = match browser.new_page().await {
        Ok(page) => page,
        Err(e) => return LoginOutcome::Failed(format!("could not open login page: {}", e)),
    };

    let outcome = match submit_login(&mut page, start_url, credentials, timings).await {
        Ok(()) => LoginOutcome::Authenticated,
        Err(reason) => LoginOutcome::Failed(reason),
    };

    if let Err(e) = page.close().await {
        debug!("Closing login page failed: {}", e);
    }

    match &outcome {
        LoginOutcome::Authenticated => info!("Login form submitted"),
        LoginOutcome::Failed(reason) => warn!("Login abandoned: {}", reason),
        LoginOutcome::Skipped => {}
    }
    outcome
}

async fn submit_login<P: BrowserPage>(
    page: &mut P,
    start_url: &str,
    credentials: &Credentials,
    timings: &SettleTimings,
) -> Result<(), String> {
    page.navigate(start_url, timings.navigation_timeout)
        .await
        .map_err(|e| format!("could not load {}: {}", start_url, e))?;
    sleep(timings.login_settle).await;

    let email_field = first_present(page, EMAIL_LOCATORS)
        .await?
        .ok_or("no email or username field")?;
    let password_field = page
        .find_element(&PASSWORD_LOCATOR)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("no password field")?;

    page.fill(&email_field, &credentials.email)
        .await
        .map_err(|e| format!("could not fill email: {}", e))?;
    page.fill(&password_field, &credentials.password)
        .await
        .map_err(|e| format!("could not fill password: {}", e))?;

    let submit = first_present(page, SUBMIT_LOCATORS)
        .await?
        .ok_or("no submit control")?;
    page.click(&submit)
        .await
        .map_err(|e| format!("submit failed: {}", e))?;

    if let Err(e) = page.wait_for_quiescence(timings.quiescence_timeout).await {
        debug!("Network did not settle after login: {}", e);
    }
    sleep(timings.login_submit_settle).await;
    Ok(())
}

async fn first_present<P: BrowserPage>(
    page: &P,
    locators: &[Locator],
) -> Result<Option<ElementHandle>, String> {
    for locator in locators {
        if let Some(handle) = page.find_element(locator).await.map_err(|e| e.to_string())? {
            debug!("Matched {:?}", locator);
            return Ok(Some(handle));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBrowser, ScriptedPage};

    const START: &str = "http://site.test/";

    fn login_page(elements: Vec<Locator>) -> ScriptedBrowser {
        ScriptedBrowser::new().with_page(
            START,
            ScriptedPage {
                elements,
                ..ScriptedPage::titled("Sign in")
            },
        )
    }

    fn creds() -> Credentials {
        Credentials::from_parts(Some("me@a.com"), Some("hunter2")).unwrap()
    }

    #[tokio::test]
    async fn test_skipped_without_credentials() {
        let browser = login_page(vec![]);
        let outcome = bootstrap_session(&browser, START, None, &SettleTimings::none()).await;
        assert_eq!(outcome, LoginOutcome::Skipped);
        assert!(browser.journal().navigations.is_empty());
    }

    #[tokio::test]
    async fn test_first_matching_locators_win() {
        let browser = login_page(vec![
            Locator::Css(r#"input[name="username"]"#),
            Locator::Css(r#"input[placeholder*="mail" i]"#),
            PASSWORD_LOCATOR,
            Locator::ButtonText("Sign in"),
            Locator::Css(r#"[type="submit"]"#),
        ]);

        let outcome =
            bootstrap_session(&browser, START, Some(&creds()), &SettleTimings::none()).await;
        assert_eq!(outcome, LoginOutcome::Authenticated);

        let journal = browser.journal();
        assert_eq!(
            journal.fills,
            vec![
                (Locator::Css(r#"input[name="username"]"#), "me@a.com".to_string()),
                (PASSWORD_LOCATOR, "hunter2".to_string()),
            ]
        );
        assert_eq!(journal.clicks, vec![Locator::ButtonText("Sign in")]);
        assert_eq!(journal.opened, journal.closed);
    }

    #[tokio::test]
    async fn test_missing_password_field_abandons() {
        let browser = login_page(vec![Locator::Css(r#"input[type="email"]"#)]);
        let outcome =
            bootstrap_session(&browser, START, Some(&creds()), &SettleTimings::none()).await;
        assert_eq!(outcome, LoginOutcome::Failed("no password field".to_string()));
        assert!(browser.journal().fills.is_empty());
    }

    #[tokio::test]
    async fn test_missing_submit_abandons_after_filling() {
        let browser = login_page(vec![Locator::Css(r#"input[type="email"]"#), PASSWORD_LOCATOR]);
        let outcome =
            bootstrap_session(&browser, START, Some(&creds()), &SettleTimings::none()).await;
        assert_eq!(outcome, LoginOutcome::Failed("no submit control".to_string()));
        assert_eq!(browser.journal().fills.len(), 2);
        assert!(browser.journal().clicks.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_start_page_fails_quietly() {
        let browser = ScriptedBrowser::new();
        let outcome =
            bootstrap_session(&browser, START, Some(&creds()), &SettleTimings::none()).await;
        assert!(matches!(outcome, LoginOutcome::Failed(reason) if reason.contains(START)));
    }
}
