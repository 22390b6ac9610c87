//! Page retrieval and plain-text extraction.
//!
//! The fetcher downloads a URL with the engine's shared HTTP client (which
//! carries the request timeout) and reduces the document to readable text:
//! script/style/head subtrees are dropped, block elements become line
//! breaks, and whitespace is collapsed. Failures map onto [`FetchError`]
//! and are never retried here.

use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::types::FetchError;

/// Extracted page content.
#[derive(Clone, Debug)]
pub struct PageText {
    /// Normalized plain text: blocks separated by single newlines, runs of
    /// whitespace collapsed.
    pub text: String,
    /// The `<title>` text, when the page has a non-empty one.
    pub title: Option<String>,
}

/// Downloads pages and extracts their text.
#[derive(Clone, Debug)]
pub struct PageFetcher {
    client: Client,
    min_page_len: usize,
}

impl PageFetcher {
    /// `client` must be configured with a request timeout; `min_page_len`
    /// is the shortest extracted text considered readable.
    pub fn new(client: Client, min_page_len: usize) -> Self {
        Self {
            client,
            min_page_len,
        }
    }

    /// Fetches `url` and returns its extracted text.
    pub async fn fetch(&self, url: &Url) -> Result<PageText, FetchError> {
        debug!(%url, "fetching page");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::AuthRequired);
        }
        if redirected_to_login(url, response.url()) {
            return Err(FetchError::AuthRequired);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify_transport)?;
        let page = extract_page_text(&body);
        if page.text.len() < self.min_page_len {
            return Err(FetchError::Empty);
        }
        debug!(%url, bytes = page.text.len(), "extracted page text");
        Ok(page)
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Unreachable {
            reason: err.without_url().to_string(),
        }
    }
}

/// A 2xx response whose final URL landed on a login path after a redirect is
/// treated the same as an auth-walled status code.
fn redirected_to_login(requested: &Url, landed: &Url) -> bool {
    if requested.path() == landed.path() && requested.host_str() == landed.host_str() {
        return false;
    }
    let path = landed.path().to_ascii_lowercase();
    ["login", "signin", "sign-in", "sign_in", "sso"]
        .iter()
        .any(|marker| path.contains(marker))
}

/// Reduces an HTML document to normalized plain text plus its title.
pub(crate) fn extract_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);

    PageText {
        text: normalize_whitespace(&raw),
        title,
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if matches!(
                name,
                "script" | "style" | "noscript" | "template" | "head" | "svg" | "iframe"
            ) {
                continue;
            }
            collect_text(child_element, out);
            if is_block_element(name) {
                out.push('\n');
            }
        }
    }
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "br"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "td"
            | "th"
            | "tr"
            | "ul"
    )
}

/// Collapses horizontal whitespace inside lines and drops blank lines,
/// leaving one newline between blocks.
fn normalize_whitespace(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }
    lines.join("\n")
}
