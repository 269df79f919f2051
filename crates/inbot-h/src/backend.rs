use crate::cdp::CdpClient;
use crate::script;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use inbot_engine::backend::{Backend, ElementRef, LaunchOptions, NavigationResult};
use inbot_engine::error::BackendError;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const WAIT_POLL: Duration = Duration::from_millis(100);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const SCROLL_POLL: Duration = Duration::from_secs(1);
const MAX_SCROLL_ROUNDS: usize = 200;

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    action_delay: Duration,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            client: None,
            action_delay: Duration::ZERO,
        }
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    fn page(&self) -> Result<&Page, BackendError> {
        self.client
            .as_ref()
            .map(|client| &client.page)
            .ok_or(BackendError::NotReady)
    }

    async fn pace(&self) {
        if !self.action_delay.is_zero() {
            tokio::time::sleep(self.action_delay).await;
        }
    }

    async fn navigation_result(page: &Page) -> Result<NavigationResult, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BackendError> {
        info!("Launching Chromium backend...");
        self.client = Some(CdpClient::launch(options).await?);
        self.action_delay = options.action_delay;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        self.pace().await;
        let page = self.page()?;

        info!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        Self::navigation_result(page).await
    }

    async fn wait_for_navigation(&mut self) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;
        match tokio::time::timeout(NAVIGATION_TIMEOUT, page.wait_for_navigation()).await {
            Err(_) => return Err(BackendError::Timeout("navigation".into())),
            Ok(Err(e)) => return Err(BackendError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }
        Self::navigation_result(page).await
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        Ok(Self::navigation_result(self.page()?).await?.url)
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BackendError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(selector).await? > 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BackendError::Timeout(selector.to_string()));
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BackendError> {
        script::evaluate_value(self.page()?, &script::count(selector)).await
    }

    async fn contains(&mut self, scope: &ElementRef, selector: &str) -> Result<bool, BackendError> {
        let expression = script::contains(&scope.selector, scope.index, selector);
        script::evaluate_value(self.page()?, &expression).await
    }

    async fn read_text(
        &mut self,
        scope: &ElementRef,
        selector: &str,
    ) -> Result<String, BackendError> {
        let expression = script::descendant_text(&scope.selector, scope.index, selector);
        Ok(script::evaluate::<String>(self.page()?, &expression)
            .await?
            .unwrap_or_default())
    }

    async fn element_text(&mut self, target: &ElementRef) -> Result<String, BackendError> {
        let expression = script::element_text(&target.selector, target.index);
        Ok(script::evaluate::<String>(self.page()?, &expression)
            .await?
            .unwrap_or_default())
    }

    async fn read_attribute(
        &mut self,
        scope: &ElementRef,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BackendError> {
        let expression = script::descendant_attribute(&scope.selector, scope.index, selector, name);
        script::evaluate(self.page()?, &expression).await
    }

    async fn scroll_to_end(&mut self, selector: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let expression = script::scroll_step(selector);
        let mut previous: Option<f64> = None;

        for round in 0..MAX_SCROLL_ROUNDS {
            let position: f64 = match script::evaluate_value(page, &expression).await {
                Ok(position) => position,
                Err(BackendError::ElementNotFound(_)) => {
                    debug!("Nothing to scroll: {} is not on the page", selector);
                    return Ok(());
                }
                Err(err) => return Err(err),
            };
            if previous == Some(position) {
                debug!("{} settled after {} scroll round(s)", selector, round);
                return Ok(());
            }
            previous = Some(position);
            tokio::time::sleep(SCROLL_POLL).await;
        }

        debug!("{} still growing after {} rounds", selector, MAX_SCROLL_ROUNDS);
        Ok(())
    }

    async fn click(&mut self, target: &ElementRef) -> Result<(), BackendError> {
        self.pace().await;
        let page = self.page()?;
        let element = page
            .find_elements(target.selector.as_str())
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?
            .into_iter()
            .nth(target.index)
            .ok_or_else(|| {
                BackendError::ElementNotFound(format!("{}[{}]", target.selector, target.index))
            })?;

        element
            .click()
            .await
            .map_err(|e| BackendError::Script(format!("click failed: {}", e)))?;
        Ok(())
    }

    async fn type_text(&mut self, target: &ElementRef, text: &str) -> Result<(), BackendError> {
        self.pace().await;
        let page = self.page()?;
        script::evaluate_value::<bool>(page, &script::focus(&target.selector, target.index))
            .await?;

        page.execute(InsertTextParams::new(text))
            .await
            .map_err(|e| BackendError::Script(format!("text input failed: {}", e)))?;
        Ok(())
    }
}
