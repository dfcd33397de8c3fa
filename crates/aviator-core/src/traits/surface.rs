// # Surface Trait
//
// Defines the interface to the observed interface: a live document that can be
// queried by selector, read, and clicked.
//
// ## Implementations
//
// - HTML snapshot: `aviator-surface-html` crate
// - Future: a driven browser session
//
// ## Usage
//
// ```rust,ignore
// use aviator_core::traits::{SelectorExpr, Surface};
//
// let surface = /* Surface implementation */;
// let selector = SelectorExpr::css(".bubble-multiplier");
// if let Some(element) = surface.lookup(&selector).await? {
//     println!("{}", surface.read_text(&element).await?);
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A lookup expression understood by a [`Surface`]
///
/// In configuration this is written either as a tagged object
/// (`{ "css": "..." }`, `{ "xpath": "..." }`) or, through [`FromStr`], as a
/// plain string: `css:` and `xpath:` prefixes select the kind explicitly, a
/// leading `/` means XPath, anything else is CSS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectorExpr {
    /// CSS selector
    #[serde(rename = "css")]
    Css(String),
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath(String),
}

impl SelectorExpr {
    /// Create a CSS selector expression
    pub fn css(expr: impl Into<String>) -> Self {
        Self::Css(expr.into())
    }

    /// Create an XPath expression
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// The raw expression text
    pub fn as_str(&self) -> &str {
        match self {
            SelectorExpr::Css(expr) | SelectorExpr::XPath(expr) => expr,
        }
    }
}

impl fmt::Display for SelectorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorExpr::Css(expr) => write!(f, "css:{}", expr),
            SelectorExpr::XPath(expr) => write!(f, "xpath:{}", expr),
        }
    }
}

impl FromStr for SelectorExpr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let selector = if let Some(rest) = s.strip_prefix("xpath:") {
            SelectorExpr::xpath(rest.trim())
        } else if let Some(rest) = s.strip_prefix("css:") {
            SelectorExpr::css(rest.trim())
        } else if s.starts_with('/') {
            SelectorExpr::xpath(s)
        } else {
            SelectorExpr::css(s)
        };

        if selector.as_str().is_empty() {
            return Err(crate::Error::config("Selector expression cannot be empty"));
        }

        Ok(selector)
    }
}

/// Opaque handle to an element located on a [`Surface`]
///
/// Handles are only meaningful to the surface that produced them and only
/// for the current state of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    selector: SelectorExpr,
}

impl Element {
    /// Create a handle for the element matched by `selector`
    ///
    /// Surface implementations and test doubles call this from `lookup()`.
    pub fn new(selector: SelectorExpr) -> Self {
        Self { selector }
    }

    /// The expression that located this element
    pub fn selector(&self) -> &SelectorExpr {
        &self.selector
    }
}

/// Trait for observed-interface implementations
///
/// The surface is an **observer** capability: it answers lookups, reads text
/// and forwards clicks. It makes no decision about what to read or when.
///
/// ## Forbidden Capabilities
/// - ❌ Retry or wait for rendering (owned by the `Poller`)
/// - ❌ Parse field values (owned by the extractor)
/// - ❌ Remember previously delivered values (owned by the `Collector`)
#[async_trait]
pub trait Surface: Send + Sync {
    /// Find the first element matching `selector`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Element))`: An element matched
    /// - `Ok(None)`: Nothing matches right now (not an error)
    /// - `Err(Error)`: The surface could not be queried
    async fn lookup(&self, selector: &SelectorExpr) -> Result<Option<Element>, crate::Error>;

    /// Read the text content of an element
    ///
    /// Returns the raw text; callers trim and normalize it.
    async fn read_text(&self, element: &Element) -> Result<String, crate::Error>;

    /// Dispatch a click on an element
    async fn dispatch_click(&self, element: &Element) -> Result<(), crate::Error>;

    /// Get the surface name (for logging/debugging)
    fn surface_name(&self) -> &'static str;
}

/// A named, ordered list of lookup expressions for a clickable control
///
/// The reveal and conceal controls are both triggers. The first expression
/// that locates an element wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    name: String,
    candidates: Vec<SelectorExpr>,
}

impl Trigger {
    /// Create a new trigger
    pub fn new(name: impl Into<String>, candidates: Vec<SelectorExpr>) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }

    /// Trigger name used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidate expressions, in priority order
    pub fn candidates(&self) -> &[SelectorExpr] {
        &self.candidates
    }

    /// Locate the control on `surface`
    ///
    /// Absence is reported as `Ok(None)`; callers decide whether it matters.
    pub async fn locate(&self, surface: &dyn Surface) -> Result<Option<Element>, crate::Error> {
        for selector in &self.candidates {
            if let Some(element) = surface.lookup(selector).await? {
                tracing::debug!("Trigger {} located via {}", self.name, selector);
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_from_str() {
        assert_eq!(
            "xpath:/html/body/div".parse::<SelectorExpr>().unwrap(),
            SelectorExpr::xpath("/html/body/div")
        );
        assert_eq!(
            "/html/body/div".parse::<SelectorExpr>().unwrap(),
            SelectorExpr::xpath("/html/body/div")
        );
        assert_eq!(
            "css: .bubble-multiplier".parse::<SelectorExpr>().unwrap(),
            SelectorExpr::css(".bubble-multiplier")
        );
        assert_eq!(
            "[class*='time']".parse::<SelectorExpr>().unwrap(),
            SelectorExpr::css("[class*='time']")
        );
        assert!("xpath:".parse::<SelectorExpr>().is_err());
    }

    #[test]
    fn test_selector_serde_shape() {
        let json = serde_json::to_value(SelectorExpr::css(".a")).unwrap();
        assert_eq!(json, serde_json::json!({ "css": ".a" }));

        let parsed: SelectorExpr =
            serde_json::from_value(serde_json::json!({ "xpath": "//button" })).unwrap();
        assert_eq!(parsed, SelectorExpr::xpath("//button"));
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(SelectorExpr::css(".a").to_string(), "css:.a");
        assert_eq!(SelectorExpr::xpath("//b").to_string(), "xpath://b");
    }
}
