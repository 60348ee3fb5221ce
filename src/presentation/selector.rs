//! Display selection.
//!
//! `start()` shows the merged display list to a [`DisplaySelector`], which
//! stands in for the browser's picker: it returns the index of the chosen
//! display, or `None` when the user dismisses the prompt.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use url::Url;

// ============================================================================
// DisplayOption
// ============================================================================

/// One entry in the selection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOption {
    /// Display name.
    pub name: String,
    /// Name of the mechanism offering it.
    pub mechanism: String,
}

// ============================================================================
// DisplaySelector
// ============================================================================

/// Picks a display for a presentation.
#[async_trait]
pub trait DisplaySelector: Send + Sync {
    /// Returns the index of the chosen option, or `None` to decline.
    ///
    /// `options` is never empty.
    async fn select(&self, url: &Url, options: &[DisplayOption]) -> Option<usize>;
}

// ============================================================================
// FirstDisplay
// ============================================================================

/// Always takes the first display offered.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstDisplay;

#[async_trait]
impl DisplaySelector for FirstDisplay {
    async fn select(&self, _url: &Url, options: &[DisplayOption]) -> Option<usize> {
        if options.is_empty() { None } else { Some(0) }
    }
}

// ============================================================================
// SelectorFn
// ============================================================================

/// Adapts a synchronous closure into a [`DisplaySelector`].
///
/// # Example
///
/// ```ignore
/// let prefer_cast = SelectorFn::new(|_url, options| {
///     options.iter().position(|o| o.mechanism == "cast")
/// });
/// ```
pub struct SelectorFn<F> {
    select: F,
}

impl<F> SelectorFn<F>
where
    F: Fn(&Url, &[DisplayOption]) -> Option<usize> + Send + Sync,
{
    /// Wraps `select`.
    pub fn new(select: F) -> Self {
        Self { select }
    }
}

impl<F> fmt::Debug for SelectorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> DisplaySelector for SelectorFn<F>
where
    F: Fn(&Url, &[DisplayOption]) -> Option<usize> + Send + Sync,
{
    async fn select(&self, url: &Url, options: &[DisplayOption]) -> Option<usize> {
        (self.select)(url, options)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<DisplayOption> {
        vec![
            DisplayOption {
                name: "Presentation window".into(),
                mechanism: "window".into(),
            },
            DisplayOption {
                name: "Chromecast".into(),
                mechanism: "cast".into(),
            },
        ]
    }

    fn url() -> Url {
        Url::parse("https://slides.example/").expect("url")
    }

    #[tokio::test]
    async fn test_first_display() {
        assert_eq!(FirstDisplay.select(&url(), &options()).await, Some(0));
        assert_eq!(FirstDisplay.select(&url(), &[]).await, None);
    }

    #[tokio::test]
    async fn test_selector_fn() {
        let prefer_cast = SelectorFn::new(|_: &Url, options: &[DisplayOption]| {
            options.iter().position(|o| o.mechanism == "cast")
        });
        assert_eq!(prefer_cast.select(&url(), &options()).await, Some(1));

        let decline = SelectorFn::new(|_: &Url, _: &[DisplayOption]| None);
        assert_eq!(decline.select(&url(), &options()).await, None);
    }
}
