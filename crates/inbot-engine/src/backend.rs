use crate::error::BackendError;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The `index`-th element matching `selector`, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub selector: String,
    pub index: usize,
}

impl ElementRef {
    pub fn first(selector: impl Into<String>) -> Self {
        Self::nth(selector, 0)
    }

    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How a browser session is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
    pub viewport: Option<Viewport>,
    /// Pause inserted before every interaction (click, type, navigate).
    pub action_delay: Duration,
}

impl LaunchOptions {
    /// Headless sessions run without a kernel sandbox; visible sessions get a
    /// maximized 1920x1080 window and a small per-action delay.
    pub fn for_mode(headless: bool) -> Self {
        if headless {
            Self {
                headless,
                args: vec![
                    "--no-sandbox".to_string(),
                    "--disable-setuid-sandbox".to_string(),
                ],
                viewport: None,
                action_delay: Duration::ZERO,
            }
        } else {
            Self {
                headless,
                args: vec!["--start-maximized".to_string()],
                viewport: Some(Viewport {
                    width: 1920,
                    height: 1080,
                }),
                action_delay: Duration::from_millis(10),
            }
        }
    }
}

/// Page-query capabilities a browser driver must provide for a run.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start the browser and open a blank page.
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BackendError>;

    /// Close the browser and cleanup resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    async fn is_ready(&self) -> bool;

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Wait for the navigation triggered by the previous interaction to settle.
    async fn wait_for_navigation(&mut self) -> Result<NavigationResult, BackendError>;

    async fn current_url(&mut self) -> Result<String, BackendError>;

    /// Wait until at least one element matches `selector`, or fail with `Timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BackendError>;

    async fn exists(&mut self, selector: &str) -> Result<bool, BackendError> {
        Ok(self.count(selector).await? > 0)
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BackendError>;

    /// Whether `scope` has a descendant matching `selector`.
    async fn contains(&mut self, scope: &ElementRef, selector: &str) -> Result<bool, BackendError>;

    /// Visible text of the first descendant of `scope` matching `selector`.
    /// Fails with `ElementNotFound` if there is none.
    async fn read_text(&mut self, scope: &ElementRef, selector: &str)
    -> Result<String, BackendError>;

    /// Visible text of `target` itself.
    async fn element_text(&mut self, target: &ElementRef) -> Result<String, BackendError>;

    async fn read_attribute(
        &mut self,
        scope: &ElementRef,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BackendError>;

    /// Grow the scroll position of the first element matching `selector` until it
    /// stops changing. A missing container is not an error.
    async fn scroll_to_end(&mut self, selector: &str) -> Result<(), BackendError>;

    async fn click(&mut self, target: &ElementRef) -> Result<(), BackendError>;

    /// Focus `target` and insert `text` as if typed.
    async fn type_text(&mut self, target: &ElementRef, text: &str) -> Result<(), BackendError>;
}
