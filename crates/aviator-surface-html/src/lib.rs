// # HTML Snapshot Surface
//
// This crate provides a `Surface` over a snapshot of an HTML document.
//
// ## Purpose
//
// A headless stand-in for a live page:
// - Server-rendered pages whose fields are present in the fetched HTML
// - Offline replay of captured pages
// - Integration testing of selector configurations
//
// ## Limitations
//
// - Only CSS selectors are evaluated. XPath expressions never match, so
//   selector lists should end with a CSS fallback.
// - A click cannot run page scripts. When the surface is bound to a page URL
//   a click re-fetches the page instead; otherwise it is only recorded.

use async_trait::async_trait;
use aviator_core::traits::{Element, SelectorExpr, Surface};
use aviator_core::{Error, Result};
use scraper::{Html, Selector};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Surface backed by an HTML document snapshot
pub struct HtmlSnapshotSurface {
    /// Raw document, parsed per query
    html: RwLock<String>,

    /// Page to re-fetch after a click
    page_url: Option<String>,

    /// HTTP client for page fetches
    client: reqwest::Client,

    /// Selectors of clicked elements, in order
    clicks: Mutex<Vec<SelectorExpr>>,
}

impl HtmlSnapshotSurface {
    /// Create a surface over a fixed document
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: RwLock::new(html.into()),
            page_url: None,
            client: reqwest::Client::new(),
            clicks: Mutex::new(Vec::new()),
        }
    }

    /// Fetch `url` and create a surface bound to it
    ///
    /// Every click re-fetches the page, so the snapshot follows the
    /// server-side state.
    pub async fn from_url(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let surface = Self {
            html: RwLock::new(String::new()),
            page_url: Some(url.into()),
            client,
            clicks: Mutex::new(Vec::new()),
        };
        surface.refresh().await?;

        Ok(surface)
    }

    /// Replace the snapshot
    pub async fn set_html(&self, html: impl Into<String>) {
        *self.html.write().await = html.into();
    }

    /// Re-fetch the bound page, if any
    pub async fn refresh(&self) -> Result<()> {
        let Some(url) = &self.page_url else {
            return Ok(());
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::http(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        debug!("Fetched {} ({} bytes)", url, body.len());
        self.set_html(body).await;
        Ok(())
    }

    /// Selectors of clicked elements, in click order
    pub fn clicks(&self) -> Vec<SelectorExpr> {
        self.clicks
            .lock()
            .map(|clicks| clicks.clone())
            .unwrap_or_default()
    }
}

/// Text of the first element matching `css` in `html`
fn first_match_text(html: &str, css: &str) -> Result<Option<String>> {
    let selector = Selector::parse(css)
        .map_err(|e| Error::surface(format!("Invalid CSS selector {:?}: {:?}", css, e)))?;

    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>()))
}

#[async_trait]
impl Surface for HtmlSnapshotSurface {
    async fn lookup(&self, selector: &SelectorExpr) -> Result<Option<Element>> {
        let css = match selector {
            SelectorExpr::Css(css) => css,
            SelectorExpr::XPath(_) => {
                trace!("XPath not supported on HTML snapshots: {}", selector);
                return Ok(None);
            }
        };

        let html = self.html.read().await;
        let found = first_match_text(&html, css)?.is_some();
        Ok(found.then(|| Element::new(selector.clone())))
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        let SelectorExpr::Css(css) = element.selector() else {
            return Ok(String::new());
        };

        // An element that vanished since lookup reads as empty
        let html = self.html.read().await;
        Ok(first_match_text(&html, css)?.unwrap_or_default())
    }

    async fn dispatch_click(&self, element: &Element) -> Result<()> {
        if let Ok(mut clicks) = self.clicks.lock() {
            clicks.push(element.selector().clone());
        }

        self.refresh().await
    }

    fn surface_name(&self) -> &'static str {
        "html-snapshot"
    }
}

impl std::fmt::Debug for HtmlSnapshotSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlSnapshotSurface")
            .field("page_url", &self.page_url)
            .finish()
    }
}
