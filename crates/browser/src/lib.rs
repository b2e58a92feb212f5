//! Narrow browser capability contract.
//!
//! The automation core never talks to a browser binding directly; it
//! drives these traits. Real implementations (CDP, WebDriver) live
//! outside this workspace and one scripted in-memory implementation
//! lives in the automation crate's test harness.

pub mod page;
pub mod snapshot;

pub use page::{BrowserProvider, DomScope, LaunchOptions, Page, SelectOption};

/// Errors surfaced by a browser implementation.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// No element matched the selector in this scope.
    #[error("Element not found: {0}")]
    NotFound(String),

    /// The browser process could not be started or attached.
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation failed or timed out.
    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// In-page script evaluation failed.
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// The element exists but rejected the interaction (detached,
    /// obscured, read-only native control, etc.).
    #[error("Interaction failed on {selector}: {reason}")]
    Interaction { selector: String, reason: String },

    /// Transport-level failure talking to the browser.
    #[error("Browser transport error: {0}")]
    Transport(String),
}
