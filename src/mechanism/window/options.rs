//! Window mechanism options.

// ============================================================================
// Constants
// ============================================================================

/// Name of the window display.
pub const DEFAULT_DISPLAY_NAME: &str = "Presentation window";

/// Target name used when opening the receiver window.
pub const DEFAULT_WINDOW_NAME: &str = "presentation";

// ============================================================================
// WindowOptions
// ============================================================================

/// Window mechanism configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    /// Name reported for the window display.
    pub display_name: String,

    /// Target name passed to the window system on open.
    pub window_name: String,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowOptions {
    /// Creates options with the default names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            window_name: DEFAULT_WINDOW_NAME.to_string(),
        }
    }

    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the window target name.
    #[inline]
    #[must_use]
    pub fn with_window_name(mut self, name: impl Into<String>) -> Self {
        self.window_name = name.into();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
