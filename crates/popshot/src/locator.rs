//! Locators for elements of the page under test.
//!
//! A locator turns into a DOM query expression that the driver evaluates.
//! Click targets must be stable across UI states: an element id, a test id,
//! a CSS selector, or an ARIA role paired with an accessible name. Bare text
//! matches are only usable for reading, because labels flip as state toggles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector for locating an element.
///
/// Written in scenario files as a single-key map, e.g. `{ id: showChartBtn }`,
/// `{ css: ".chart-container" }` or `{ role: button, name: "📊 Show Chart" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    /// Element id, without the leading `#`
    Id {
        /// The id attribute
        id: String,
    },
    /// Test id (`data-testid` attribute)
    TestId {
        /// The data-testid attribute
        test_id: String,
    },
    /// ARIA role, optionally narrowed by accessible name
    Role {
        /// Role such as `button`
        role: String,
        /// Accessible name (aria-label, or trimmed text content)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// CSS selector
    Css {
        /// The selector
        css: String,
    },
    /// First element whose own text contains the string
    Text {
        /// Text to find
        text: String,
    },
}

impl Locator {
    /// Locate by element id
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id { id: id.into() }
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId { test_id: id.into() }
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            css: selector.into(),
        }
    }

    /// Locate by ARIA role
    #[must_use]
    pub fn by_role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
        }
    }

    /// Locate by ARIA role and accessible name
    #[must_use]
    pub fn by_role_with_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    /// Locate by text content
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Whether the locator may be used as a click target.
    ///
    /// Text matches and roles without an accessible name are not: either can
    /// resolve to a different element than intended.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        match self {
            Self::Text { .. } => false,
            Self::Role { name, .. } => name.as_deref().is_some_and(|n| !n.trim().is_empty()),
            _ => true,
        }
    }

    /// Whether the locator carries an empty selector
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Id { id } => id.trim().is_empty(),
            Self::TestId { test_id } => test_id.trim().is_empty(),
            Self::Role { role, .. } => role.trim().is_empty(),
            Self::Css { css } => css.trim().is_empty(),
            Self::Text { text } => text.is_empty(),
        }
    }

    /// JavaScript expression evaluating to the element or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Id { id } => format!("document.getElementById({id:?})"),
            Self::TestId { test_id } => {
                format!("document.querySelector('[data-testid=' + JSON.stringify({test_id:?}) + ']')")
            }
            Self::Css { css } => format!("document.querySelector({css:?})"),
            Self::Text { text } => format!(
                "(Array.from(document.body ? document.body.querySelectorAll('*') : [])\
                 .filter(el => el.textContent.includes({text:?}))\
                 .find(el => !Array.from(el.children).some(c => c.textContent.includes({text:?}))) || null)"
            ),
            Self::Role { role, name } => {
                let name = name
                    .as_ref()
                    .map_or_else(|| "null".to_string(), |n| format!("{n:?}"));
                format!(
                    "((role, name) => {{\
                     const implicit = {{ button: 'button,input[type=button],input[type=submit]', link: 'a[href]', \
                     heading: 'h1,h2,h3,h4,h5,h6', checkbox: 'input[type=checkbox]', textbox: 'input:not([type]),input[type=text],textarea', \
                     img: 'img', list: 'ul,ol', listitem: 'li' }};\
                     const sel = '[role=\"' + role + '\"]' + (implicit[role] ? ',' + implicit[role] : '');\
                     const label = el => (el.getAttribute('aria-label') || el.textContent || el.value || '').trim();\
                     return Array.from(document.querySelectorAll(sel)).find(el => name === null || label(el) === name) || null;\
                     }})({role:?}, {name})"
                )
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id { id } => write!(f, "#{id}"),
            Self::TestId { test_id } => write!(f, "[data-testid={test_id}]"),
            Self::Css { css } => write!(f, "{css}"),
            Self::Text { text } => write!(f, "text={text:?}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name={name:?}]"),
            Self::Role { role, name: None } => write!(f, "role={role}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod query_tests {
        use super::*;

        #[test]
        fn test_id_query() {
            let query = Locator::id("showChartBtn").to_query();
            assert_eq!(query, r#"document.getElementById("showChartBtn")"#);
        }

        #[test]
        fn test_css_query() {
            let query = Locator::css(".chart-container").to_query();
            assert!(query.contains("querySelector"));
            assert!(query.contains(".chart-container"));
        }

        #[test]
        fn test_test_id_query() {
            let query = Locator::test_id("summary").to_query();
            assert!(query.contains("data-testid"));
            assert!(query.contains("\"summary\""));
        }

        #[test]
        fn test_role_query_with_name() {
            let query = Locator::by_role_with_name("button", "📊 Show Chart").to_query();
            assert!(query.contains("aria-label"));
            assert!(query.contains("\"button\""));
            assert!(query.contains("📊 Show Chart"));
        }

        #[test]
        fn test_role_query_without_name() {
            let query = Locator::by_role("button").to_query();
            assert!(query.ends_with("(\"button\", null)"));
        }

        #[test]
        fn test_text_query() {
            let query = Locator::text("Recent activity").to_query();
            assert!(query.contains("textContent.includes(\"Recent activity\")"));
        }

        #[test]
        fn test_special_chars_are_escaped() {
            let query = Locator::css(r#"a[title="x"]"#).to_query();
            assert!(query.contains(r#"a[title=\"x\"]"#));
        }
    }

    mod stability_tests {
        use super::*;

        #[test]
        fn test_text_is_not_stable() {
            assert!(!Locator::text("Show Chart").is_stable());
        }

        #[test]
        fn test_role_without_name_is_not_stable() {
            assert!(!Locator::by_role("button").is_stable());
            assert!(!Locator::by_role_with_name("button", " ").is_stable());
        }

        #[test]
        fn test_structural_locators_are_stable() {
            assert!(Locator::id("themeToggle").is_stable());
            assert!(Locator::css("#themeToggle").is_stable());
            assert!(Locator::test_id("toggle").is_stable());
            assert!(Locator::by_role_with_name("button", "Show").is_stable());
        }

        #[test]
        fn test_empty_detection() {
            assert!(Locator::id("  ").is_empty());
            assert!(Locator::css("").is_empty());
            assert!(!Locator::id("x").is_empty());
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_parse_forms() {
            let id: Locator = serde_yaml_ng::from_str("id: showChartBtn").unwrap();
            assert_eq!(id, Locator::id("showChartBtn"));

            let css: Locator = serde_yaml_ng::from_str("css: .chart-container").unwrap();
            assert_eq!(css, Locator::css(".chart-container"));

            let role: Locator =
                serde_yaml_ng::from_str("role: button\nname: \"📊 Show Chart\"").unwrap();
            assert_eq!(role, Locator::by_role_with_name("button", "📊 Show Chart"));

            let bare_role: Locator = serde_yaml_ng::from_str("role: button").unwrap();
            assert_eq!(bare_role, Locator::by_role("button"));

            let test_id: Locator = serde_yaml_ng::from_str("test_id: summary").unwrap();
            assert_eq!(test_id, Locator::test_id("summary"));
        }

        #[test]
        fn test_unknown_form_rejected() {
            let parsed: Result<Locator, _> = serde_yaml_ng::from_str("xpath: //div");
            assert!(parsed.is_err());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::id("output").to_string(), "#output");
        assert_eq!(
            Locator::by_role_with_name("button", "Hide").to_string(),
            "role=button[name=\"Hide\"]"
        );
        assert_eq!(Locator::css(".chart-container").to_string(), ".chart-container");
    }
}
