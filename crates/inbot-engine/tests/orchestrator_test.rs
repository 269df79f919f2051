mod common;

use common::{
    Card, FEED_URL, MockBackend, Msg, OTHER_URL, ScriptedGenerator, inbox_page, instant_retry,
    login_page, thread_page,
};
use inbot_engine::composer::ReplyComposer;
use inbot_engine::config::SelectorPack;
use inbot_engine::error::{GenerationError, InboxError};
use inbot_engine::generator::ReplyGenerator;
use inbot_engine::model::{InboxView, Language};
use inbot_engine::session::Credentials;
use inbot_engine::{ElementRef, RunOrchestrator, RunSettings};
use std::sync::Arc;
use std::time::Duration;

const REPO: &str = "https://github.com/inbot-dev/inbot";
const ALEX: &str = "https://www.linkedin.com/messaging/thread/alex/";
const LEE: &str = "https://www.linkedin.com/messaging/thread/lee/";
const CASEY: &str = "https://www.linkedin.com/messaging/thread/casey/";
const DANA: &str = "mock://thread/dana";
const PAT: &str = "mock://thread/pat";

fn settings() -> RunSettings {
    RunSettings {
        headless: true,
        retry: instant_retry(2),
        wait_timeout: Duration::from_millis(10),
        input_timeout: Duration::from_millis(10),
        settle: Duration::ZERO,
    }
}

/// A logged-in inbox with Alex (2 unread) and Lee (1 unread) in the priority view and
/// an empty other view.
fn inbox(selectors: &SelectorPack, alex_input: bool) -> MockBackend {
    let backend = MockBackend::new();
    login_page(&backend, selectors, FEED_URL);
    backend.route(
        &selectors.inbox.priority.url,
        inbox_page(
            selectors,
            &[
                Card::read("Sam", "/messaging/thread/sam/"),
                Card::unread("Alex", "2", "/messaging/thread/alex/"),
                Card::unread("Lee", "1", "/messaging/thread/lee/"),
            ],
            &["Sam Taylor"],
        ),
    );
    backend.route(
        ALEX,
        thread_page(
            selectors,
            &[
                Msg::at("hello there", "09:58"),
                Msg::at("how are you", "10:00"),
                Msg::at("hi", "10:01"),
            ],
            alex_input,
        ),
    );
    backend.route(LEE, thread_page(selectors, &[Msg::at("ping", "11:00")], true));
    backend.route(OTHER_URL, inbox_page(selectors, &[], &[]));
    if let Some(tab) = &selectors.inbox.other.tab {
        backend.click_route(ElementRef::first(tab), OTHER_URL);
    }
    backend
}

fn orchestrator(
    backend: &MockBackend,
    selectors: &Arc<SelectorPack>,
    generator: &Arc<ScriptedGenerator>,
) -> RunOrchestrator {
    let generator: Arc<dyn ReplyGenerator> = generator.clone();
    RunOrchestrator::new(
        backend.factory(),
        selectors.clone(),
        Credentials {
            email: "me@example.com".into(),
            password: "hunter2".into(),
        },
        generator,
        ReplyComposer::new(REPO),
        settings(),
    )
}

#[tokio::test]
async fn test_replies_to_every_unread_conversation() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, true);
    let generator = Arc::new(ScriptedGenerator::replying("Hi Alex, doing great! [en]"));

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(
        prompts[0],
        "The user Alex wrote the following messages:\n\
         TODAY at 10:01: hi\n\
         TODAY at 10:00: how are you\n"
    );
    assert_eq!(prompts.len(), 2);

    let sent = backend.typed_into(&selectors.composer.input);
    assert_eq!(
        sent[0],
        format!(
            "Hi Alex, doing great!\n\n{}{}",
            Language::English.disclaimer(),
            REPO
        )
    );
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|reply| reply.ends_with(REPO)));

    assert_eq!(report.views.len(), 2);
    assert_eq!(report.views[0].view, InboxView::Priority);
    assert_eq!(report.views[0].replied, 2);
    assert_eq!(report.views[1].view, InboxView::Other);
    assert_eq!(report.views[1].discovered, 0);
    assert_eq!(backend.state().closes, 1);
}

#[tokio::test]
async fn test_missing_reply_input_skips_without_generating() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, false);
    let generator = Arc::new(ScriptedGenerator::replying("Sure [en]"));

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("The user Lee wrote"));
    assert_eq!(report.views[0].skipped, 1);
    assert_eq!(report.views[0].replied, 1);
    assert_eq!(backend.state().closes, 1);
}

#[tokio::test]
async fn test_authentication_failure_ends_the_run() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, true);
    backend.state().click_routes[0].1 = "https://www.linkedin.com/uas/login-submit".into();
    let generator = Arc::new(ScriptedGenerator::replying("unused"));

    let err = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, InboxError::AuthenticationFailure(_)));
    assert_eq!(generator.calls(), 0);
    assert_eq!(backend.state().navigations, vec![selectors.login.url.clone()]);
    assert_eq!(backend.state().closes, 1);
}

#[tokio::test]
async fn test_generation_failure_does_not_stop_the_loop() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, true);
    let generator = Arc::new(
        ScriptedGenerator::replying("Hola [es]").then(Err(GenerationError::Status {
            status: 400,
            body: "bad request".into(),
        })),
    );

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    assert_eq!(report.views[0].failed, 1);
    assert_eq!(report.views[0].replied, 1);
    let sent = backend.typed_into(&selectors.composer.input);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(Language::Spanish.disclaimer()));
    assert_eq!(backend.state().closes, 1);
}

#[tokio::test]
async fn test_transient_generation_failure_is_retried() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, true);
    let generator = Arc::new(
        ScriptedGenerator::replying("Thanks [en]").then(Err(GenerationError::Status {
            status: 503,
            body: "overloaded".into(),
        })),
    );

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    assert_eq!(generator.calls(), 3);
    assert_eq!(report.replied(), 2);
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn test_broken_view_is_reported_and_session_still_released() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, true);
    backend.state().routes.remove(OTHER_URL);
    let generator = Arc::new(ScriptedGenerator::replying("Thanks [en]"));

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    assert_eq!(report.views[0].replied, 2);
    assert!(report.views[1].error.is_some());
    assert_eq!(backend.state().closes, 1);
}

#[tokio::test]
async fn test_empty_threads_are_skipped_without_generating() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = inbox(&selectors, true);
    backend.route(ALEX, thread_page(&selectors, &[], true));
    backend.route(LEE, thread_page(&selectors, &[], true));
    let generator = Arc::new(ScriptedGenerator::replying("Thanks [en]"));

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    assert_eq!(generator.calls(), 0);
    assert!(backend.typed_into(&selectors.composer.input).is_empty());
    assert_eq!(report.views[0].discovered, 2);
    assert_eq!(report.views[0].skipped, 2);
    assert_eq!(report.views[0].replied, 0);
    assert_eq!(backend.state().closes, 1);
}

#[tokio::test]
async fn test_linkless_card_is_opened_from_its_own_view() {
    let selectors = Arc::new(SelectorPack::default());
    let backend = MockBackend::new();
    login_page(&backend, &selectors, FEED_URL);
    backend.route(
        &selectors.inbox.priority.url,
        inbox_page(
            &selectors,
            &[Card::read("Sam", "/messaging/thread/sam/")],
            &["Sam Taylor"],
        ),
    );
    backend.route(
        OTHER_URL,
        inbox_page(
            &selectors,
            &[
                Card::unread("Casey", "1", "/messaging/thread/casey/"),
                Card {
                    name: "Dana",
                    badge: Some("1"),
                    href: None,
                },
            ],
            &[],
        ),
    );
    if let Some(tab) = &selectors.inbox.other.tab {
        backend.click_route(ElementRef::first(tab), OTHER_URL);
    }

    // Casey's thread shows the priority list next to it, where the second card is Pat.
    let mut casey = thread_page(&selectors, &[Msg::at("casey here", "10:30")], true);
    casey.extend(inbox_page(
        &selectors,
        &[
            Card::read("Sam", "/messaging/thread/sam/"),
            Card {
                name: "Pat",
                badge: None,
                href: None,
            },
        ],
        &[],
    ));
    backend.route(CASEY, casey);
    backend.route(
        DANA,
        thread_page(&selectors, &[Msg::at("dana here", "11:05")], true),
    );
    backend.route(
        PAT,
        thread_page(&selectors, &[Msg::at("pat private message", "11:00")], true),
    );
    let second_card = ElementRef::nth(&selectors.inbox.card, 1);
    backend.click_route_from(CASEY, second_card.clone(), PAT);
    backend.click_route_from(OTHER_URL, second_card, DANA);
    let generator = Arc::new(ScriptedGenerator::replying("Thanks [en]"));

    let report = orchestrator(&backend, &selectors, &generator)
        .run()
        .await
        .unwrap();

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(
        prompts,
        vec![
            "The user Casey wrote the following messages:\nTODAY at 10:30: casey here\n"
                .to_string(),
            "The user Dana wrote the following messages:\nTODAY at 11:05: dana here\n"
                .to_string(),
        ]
    );
    assert_eq!(report.views[1].replied, 2);
    assert_eq!(backend.typed_into(&selectors.composer.input).len(), 2);
    assert_eq!(backend.state().current_url, DANA);
}
