#![allow(dead_code)]

use async_trait::async_trait;
use inbot_engine::backend::{Backend, ElementRef, LaunchOptions, NavigationResult};
use inbot_engine::config::SelectorPack;
use inbot_engine::error::{BackendError, GenerationError};
use inbot_engine::generator::ReplyGenerator;
use inbot_engine::retry::RetryPolicy;
use inbot_engine::session::BackendFactory;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FEED_URL: &str = "https://www.linkedin.com/feed/";
pub const OTHER_URL: &str = "mock://messaging/other";

/// Elements of one page, keyed by the selector that matches them.
pub type Page = HashMap<String, Vec<MockElement>>;

#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub text: String,
    pub children: HashMap<String, Vec<MockElement>>,
    pub attributes: HashMap<String, String>,
}

impl MockElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn child(mut self, selector: &str, element: MockElement) -> Self {
        self.children
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub routes: HashMap<String, Page>,
    /// Clicking one of these elements loads the given address.
    pub click_routes: Vec<(ElementRef, String)>,
    /// Like `click_routes`, but only while the page at the first address is loaded.
    pub page_click_routes: Vec<(String, ElementRef, String)>,
    pub page: Page,
    pub current_url: String,
    pub launches: Vec<LaunchOptions>,
    pub closes: usize,
    pub navigations: Vec<String>,
    pub clicks: Vec<ElementRef>,
    pub typed: Vec<(ElementRef, String)>,
    pub scrolls: Vec<String>,
    pub fail_launch: bool,
    /// Transient navigation failures to report before navigations succeed.
    pub flaky_navigations: usize,
    pub failing_clicks: Vec<String>,
    /// Selectors whose `count` fails with a script error.
    pub failing_queries: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn route(&self, url: &str, page: Page) -> &Self {
        self.state().routes.insert(url.to_string(), page);
        self
    }

    pub fn click_route(&self, target: ElementRef, url: &str) -> &Self {
        self.state().click_routes.push((target, url.to_string()));
        self
    }

    pub fn click_route_from(&self, page_url: &str, target: ElementRef, url: &str) -> &Self {
        self.state()
            .page_click_routes
            .push((page_url.to_string(), target, url.to_string()));
        self
    }

    pub fn factory(&self) -> BackendFactory {
        let backend = self.clone();
        Arc::new(move || Box::new(backend.clone()) as Box<dyn Backend>)
    }

    /// Text typed into elements matching `selector`, in order.
    pub fn typed_into(&self, selector: &str) -> Vec<String> {
        self.state()
            .typed
            .iter()
            .filter(|(target, _)| target.selector == selector)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.state()
            .clicks
            .iter()
            .filter(|target| target.selector == selector)
            .count()
    }
}

impl MockState {
    fn load(&mut self, url: &str) {
        self.page = self.routes.get(url).cloned().unwrap_or_default();
        self.current_url = url.to_string();
    }

    fn element(&self, target: &ElementRef) -> Result<&MockElement, BackendError> {
        self.page
            .get(&target.selector)
            .and_then(|elements| elements.get(target.index))
            .ok_or_else(|| {
                BackendError::ElementNotFound(format!("{}[{}]", target.selector, target.index))
            })
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BackendError> {
        let mut state = self.state();
        state.launches.push(options.clone());
        if state.fail_launch {
            return Err(BackendError::Launch("no browser".into()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.state().closes += 1;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        !self.state.lock().unwrap().launches.is_empty()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let mut state = self.state();
        state.navigations.push(url.to_string());
        if state.flaky_navigations > 0 {
            state.flaky_navigations -= 1;
            return Err(BackendError::Navigation("net::ERR_NETWORK_CHANGED".into()));
        }
        state.load(url);
        Ok(NavigationResult {
            url: url.to_string(),
            title: String::new(),
        })
    }

    async fn wait_for_navigation(&mut self) -> Result<NavigationResult, BackendError> {
        Ok(NavigationResult {
            url: self.state().current_url.clone(),
            title: String::new(),
        })
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        Ok(self.state().current_url.clone())
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<(), BackendError> {
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(BackendError::Timeout(selector.to_string()))
        }
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BackendError> {
        let state = self.state();
        if state.failing_queries.iter().any(|failing| failing == selector) {
            return Err(BackendError::Script(format!("{} query failed", selector)));
        }
        Ok(state.page.get(selector).map_or(0, Vec::len))
    }

    async fn contains(&mut self, scope: &ElementRef, selector: &str) -> Result<bool, BackendError> {
        let state = self.state();
        let element = state.element(scope)?;
        Ok(element
            .children
            .get(selector)
            .is_some_and(|children| !children.is_empty()))
    }

    async fn read_text(
        &mut self,
        scope: &ElementRef,
        selector: &str,
    ) -> Result<String, BackendError> {
        let state = self.state();
        let element = state.element(scope)?;
        element
            .children
            .get(selector)
            .and_then(|children| children.first())
            .map(|child| child.text.clone())
            .ok_or_else(|| BackendError::ElementNotFound(selector.to_string()))
    }

    async fn element_text(&mut self, target: &ElementRef) -> Result<String, BackendError> {
        let state = self.state();
        Ok(state.element(target)?.text.clone())
    }

    async fn read_attribute(
        &mut self,
        scope: &ElementRef,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BackendError> {
        let state = self.state();
        let element = state.element(scope)?;
        Ok(element
            .children
            .get(selector)
            .and_then(|children| children.first())
            .and_then(|child| child.attributes.get(name).cloned()))
    }

    async fn scroll_to_end(&mut self, selector: &str) -> Result<(), BackendError> {
        self.state().scrolls.push(selector.to_string());
        Ok(())
    }

    async fn click(&mut self, target: &ElementRef) -> Result<(), BackendError> {
        let mut state = self.state();
        state.element(target)?;
        state.clicks.push(target.clone());
        if state.failing_clicks.contains(&target.selector) {
            return Err(BackendError::Script(format!("{} is detached", target.selector)));
        }
        let route = state
            .page_click_routes
            .iter()
            .find(|(page_url, routed, _)| *page_url == state.current_url && routed == target)
            .map(|(_, _, url)| url.clone())
            .or_else(|| {
                state
                    .click_routes
                    .iter()
                    .find(|(routed, _)| routed == target)
                    .map(|(_, url)| url.clone())
            });
        if let Some(url) = route {
            state.load(&url);
        }
        Ok(())
    }

    async fn type_text(&mut self, target: &ElementRef, text: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        state.element(target)?;
        state.typed.push((target.clone(), text.to_string()));
        Ok(())
    }
}

/// Generator that plays back queued results, then keeps returning `fallback`.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: text.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, result: Result<String, GenerationError>) -> Self {
        self.queue.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.queue.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.fallback.clone()),
        }
    }
}

pub fn instant_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

/// One conversation card in an inbox page.
pub struct Card<'a> {
    pub name: &'a str,
    pub badge: Option<&'a str>,
    pub href: Option<&'a str>,
}

impl<'a> Card<'a> {
    pub fn read(name: &'a str, href: &'a str) -> Self {
        Self {
            name,
            badge: None,
            href: Some(href),
        }
    }

    pub fn unread(name: &'a str, badge: &'a str, href: &'a str) -> Self {
        Self {
            name,
            badge: Some(badge),
            href: Some(href),
        }
    }
}

/// An inbox page listing `cards`; `authors` are the message group names of the
/// thread shown next to the list, oldest first.
pub fn inbox_page(selectors: &SelectorPack, cards: &[Card<'_>], authors: &[&str]) -> Page {
    let inbox = &selectors.inbox;
    let mut page = Page::new();
    page.insert(inbox.list.clone(), vec![MockElement::default()]);

    let rendered = cards
        .iter()
        .map(|card| {
            let mut element = MockElement::default()
                .child(&inbox.participant_name, MockElement::text(card.name));
            if let Some(badge) = card.badge {
                element = element.child(&inbox.badge, MockElement::text(badge));
            }
            if let Some(href) = card.href {
                element = element.child(&inbox.link, MockElement::default().attr("href", href));
            }
            element
        })
        .collect();
    page.insert(inbox.card.clone(), rendered);

    if !authors.is_empty() {
        page.insert(
            inbox.latest_author.clone(),
            authors.iter().map(|a| MockElement::text(a)).collect(),
        );
    }
    if let Some(tab) = &inbox.other.tab {
        page.insert(tab.clone(), vec![MockElement::text("Other")]);
    }
    page
}

/// One message in a thread page.
pub struct Msg<'a> {
    pub text: &'a str,
    pub time: Option<&'a str>,
    pub group_time: Option<&'a str>,
    pub date: Option<&'a str>,
}

impl<'a> Msg<'a> {
    pub fn at(text: &'a str, time: &'a str) -> Self {
        Self {
            text,
            time: Some(time),
            group_time: None,
            date: None,
        }
    }
}

/// A thread page with `messages` oldest first.
pub fn thread_page(selectors: &SelectorPack, messages: &[Msg<'_>], with_input: bool) -> Page {
    let thread = &selectors.thread;
    let mut page = Page::new();
    page.insert(thread.list.clone(), vec![MockElement::default()]);

    let rendered = messages
        .iter()
        .map(|msg| {
            let mut element =
                MockElement::default().child(&thread.body, MockElement::text(msg.text));
            if let Some(time) = msg.time {
                element = element.child(&thread.time, MockElement::text(time));
            }
            if let Some(time) = msg.group_time {
                element = element.child(&thread.group_time, MockElement::text(time));
            }
            if let Some(date) = msg.date {
                element = element.child(&thread.date_heading, MockElement::text(date));
            }
            element
        })
        .collect();
    page.insert(thread.message.clone(), rendered);

    if with_input {
        let composer = &selectors.composer;
        page.insert(composer.input.clone(), vec![MockElement::default()]);
        page.insert(composer.send.clone(), vec![MockElement::text("Send")]);
    }
    page
}

/// Login page whose submit button leads to `after_login`.
pub fn login_page(backend: &MockBackend, selectors: &SelectorPack, after_login: &str) {
    let login = &selectors.login;
    let mut page = Page::new();
    for selector in [&login.username, &login.password, &login.submit] {
        page.insert(selector.clone(), vec![MockElement::default()]);
    }
    backend.route(&login.url, page);
    backend.click_route(ElementRef::first(&login.submit), after_login);
}
