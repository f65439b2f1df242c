// tests/router_flow.rs
//! End-to-end command flows with an in-process judge and reply channel.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use runbot::config::DeliveryConfig;
use runbot::delivery::{Acknowledgement, DeliveryTarget, InputForm, ReplyChannel, ReplyPayload};
use runbot::errors::{BotError, ChannelError, Result};
use runbot::judge::CodeJudge;
use runbot::models::{JudgeResult, JudgeStatus};
use runbot::report::encode;
use runbot::router::{EventKind, InboundEvent, OptionValue, Router};

type Call = (String, String, Option<String>);
type Responder = Box<dyn Fn(&str) -> Result<JudgeResult> + Send + Sync>;

struct FakeJudge {
    calls: Arc<Mutex<Vec<Call>>>,
    respond: Responder,
}

impl CodeJudge for FakeJudge {
    async fn submit(&self, language: &str, code: &str, stdin: Option<&str>) -> Result<JudgeResult> {
        self.calls
            .lock()
            .unwrap()
            .push((language.to_string(), code.to_string(), stdin.map(str::to_string)));
        (self.respond)(code)
    }
}

fn accepted(stdout: &str) -> JudgeResult {
    JudgeResult {
        status: JudgeStatus { id: 3, description: "Accepted".to_string() },
        stdout: Some(encode(stdout)),
        stderr: None,
        compile_output: None,
    }
}

fn router<F>(respond: F) -> (Arc<Router<FakeJudge>>, Arc<Mutex<Vec<Call>>>)
where
    F: Fn(&str) -> Result<JudgeResult> + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let judge = FakeJudge { calls: calls.clone(), respond: Box::new(respond) };
    let router = Router::new(judge, DeliveryConfig::default(), Duration::from_secs(60));
    (Arc::new(router), calls)
}

#[derive(Default)]
struct Channel {
    calls: Mutex<Vec<(String, Option<ReplyPayload>)>>,
    forms: Mutex<Vec<InputForm>>,
    scripted: Mutex<VecDeque<std::result::Result<(), ChannelError>>>,
}

impl Channel {
    fn scripted(results: Vec<std::result::Result<(), ChannelError>>) -> Self {
        Self { scripted: Mutex::new(results.into()), ..Self::default() }
    }

    fn names(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    fn last_content(&self) -> String {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|(_, p)| p.as_ref().map(|p| p.content.clone()))
            .unwrap_or_default()
    }

    fn last_payload(&self) -> ReplyPayload {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|(_, p)| p.clone())
            .expect("no payload was sent")
    }

    fn record(&self, name: &str, payload: Option<&ReplyPayload>) -> std::result::Result<(), ChannelError> {
        self.calls.lock().unwrap().push((name.to_string(), payload.cloned()));
        self.scripted.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl ReplyChannel for Channel {
    async fn acknowledge(&self, _ack: Acknowledgement) -> std::result::Result<(), ChannelError> {
        self.record("acknowledge", None)
    }
    async fn respond(&self, payload: &ReplyPayload) -> std::result::Result<(), ChannelError> {
        self.record("respond", Some(payload))
    }
    async fn edit_original(&self, payload: &ReplyPayload) -> std::result::Result<(), ChannelError> {
        self.record("edit_original", Some(payload))
    }
    async fn follow_up(&self, payload: &ReplyPayload) -> std::result::Result<(), ChannelError> {
        self.record("follow_up", Some(payload))
    }
    async fn show_form(&self, form: &InputForm) -> std::result::Result<(), ChannelError> {
        self.forms.lock().unwrap().push(form.clone());
        self.record("show_form", None)
    }
}

fn command(id: &str, name: &str, options: &[(&str, OptionValue)]) -> InboundEvent {
    InboundEvent {
        id: id.to_string(),
        channel_id: Some("chan".to_string()),
        kind: EventKind::Command {
            name: name.to_string(),
            options: options.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        },
    }
}

fn text(value: &str) -> OptionValue {
    OptionValue::Text(value.to_string())
}

async fn dispatch(router: &Router<FakeJudge>, event: InboundEvent, channel: &Arc<Channel>) {
    router.dispatch(event, DeliveryTarget::new(channel.clone())).await;
}

#[tokio::test]
async fn test_run_with_inline_code() {
    let (router, calls) = router(|_| Ok(accepted("Hello\n")));
    let channel = Arc::new(Channel::default());

    let event = command(
        "1",
        "run",
        &[("lang", text("java")), ("code", text("```java\nclass Main {}\n```")), ("input", text("42"))],
    );
    dispatch(&router, event, &channel).await;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![("java".to_string(), "class Main {}".to_string(), Some("42".to_string()))]
    );
    assert_eq!(channel.names(), vec!["acknowledge", "edit_original"]);
    assert_eq!(channel.last_content(), "```\nStatus: Accepted\n\n[stdout]\nHello\n\n```");
}

#[tokio::test]
async fn test_private_run_stays_ephemeral() {
    let (router, _) = router(|_| Ok(accepted("hi")));
    let channel = Arc::new(Channel::default());

    let event = command(
        "1",
        "run",
        &[("lang", text("java")), ("code", text("class A {}")), ("private", OptionValue::Boolean(true))],
    );
    dispatch(&router, event, &channel).await;

    assert!(channel.last_payload().ephemeral);
}

#[tokio::test]
async fn test_run_without_code_opens_form_then_resumes() {
    let (router, calls) = router(|_| Ok(accepted("7")));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "run", &[("lang", text("java"))]), &channel).await;

    assert_eq!(channel.names(), vec!["show_form"]);
    assert!(calls.lock().unwrap().is_empty());
    let form = channel.forms.lock().unwrap()[0].clone();
    assert_eq!(form.custom_id, "run|java|0");

    let submit = InboundEvent {
        id: "2".to_string(),
        channel_id: None,
        kind: EventKind::FormSubmit {
            custom_id: form.custom_id,
            fields: HashMap::from([
                ("code".to_string(), "class\u{200B} Main {}".to_string()),
                ("input".to_string(), "3 4".to_string()),
            ]),
        },
    };
    let form_channel = Arc::new(Channel::default());
    dispatch(&router, submit, &form_channel).await;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![("java".to_string(), "class Main {}".to_string(), Some("3 4".to_string()))]
    );
    assert!(form_channel.last_content().contains("[stdout]\n7"));
}

#[tokio::test]
async fn test_unknown_form_is_rejected() {
    let (router, calls) = router(|_| Ok(accepted("x")));
    let channel = Arc::new(Channel::default());

    let submit = InboundEvent {
        id: "9".to_string(),
        channel_id: None,
        kind: EventKind::FormSubmit { custom_id: "pem|ws|slug".to_string(), fields: HashMap::new() },
    };
    dispatch(&router, submit, &channel).await;

    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(channel.last_content(), "Invalid action.");
}

#[tokio::test]
async fn test_duplicate_event_is_processed_once() {
    let (router, calls) = router(|_| Ok(accepted("once")));
    let channel = Arc::new(Channel::default());
    let event = command("dup", "run", &[("lang", text("java")), ("code", text("class A {}"))]);

    dispatch(&router, event.clone(), &channel).await;
    dispatch(&router, event, &channel).await;

    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(channel.names(), vec!["acknowledge", "edit_original"]);
}

#[tokio::test]
async fn test_unsupported_language_is_reported_inline() {
    let (router, _) = router(|_| Err(BotError::UnsupportedLanguage("cobol".to_string())));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "run", &[("lang", text("cobol")), ("code", text("DISPLAY 'HI'."))]), &channel).await;

    assert_eq!(channel.last_content(), "Language `cobol` is not supported.");
}

#[tokio::test]
async fn test_unsupported_language_without_code_skips_form() {
    let (router, _) = router(|_| Ok(accepted("x")));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "run", &[("lang", text("cobol"))]), &channel).await;

    assert_eq!(channel.names(), vec!["respond"]);
    assert_eq!(channel.last_content(), "Language `cobol` is not supported.");
}

#[tokio::test]
async fn test_poll_timeout_is_reported_inline() {
    let (router, _) = router(|_| Err(BotError::PollTimeout { attempts: 60 }));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]), &channel).await;

    assert_eq!(channel.last_content(), "Execution timed out waiting for the judge.");
}

#[tokio::test]
async fn test_expired_acknowledgment_stops_the_pipeline() {
    let (router, calls) = router(|_| Ok(accepted("x")));
    let channel = Arc::new(Channel::scripted(vec![Err(ChannelError::Expired)]));

    dispatch(&router, command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]), &channel).await;

    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(channel.names(), vec!["acknowledge"]);
}

#[tokio::test]
async fn test_expired_finalize_is_swallowed() {
    let (router, calls) = router(|_| Ok(accepted("x")));
    let channel = Arc::new(Channel::scripted(vec![Ok(()), Err(ChannelError::Expired)]));

    dispatch(&router, command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]), &channel).await;

    // The judge work still happened; the failed edit is not retried or
    // followed by an error reply.
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(channel.names(), vec!["acknowledge", "edit_original"]);
}

#[tokio::test]
async fn test_rejected_report_falls_back_to_command_error() {
    let (router, _) = router(|_| Ok(accepted("x")));
    let channel = Arc::new(Channel::scripted(vec![
        Ok(()),
        Err(ChannelError::Rejected { status: 502, body: "bad gateway".to_string() }),
    ]));

    dispatch(&router, command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]), &channel).await;

    // Unlike an expired interaction, the reply slot is still live.
    assert_eq!(channel.names(), vec!["acknowledge", "edit_original", "edit_original"]);
    assert_eq!(channel.last_content(), "Command error.");
}

#[tokio::test]
async fn test_unexpected_error_becomes_command_error() {
    let (router, _) = router(|_| Err(BotError::UnexpectedResponse("no token".to_string())));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]), &channel).await;

    assert_eq!(channel.last_content(), "Command error.");
}

#[tokio::test]
async fn test_panicking_handler_still_answers() {
    let (router, _) = router(|_| panic!("judge exploded"));
    let channel = Arc::new(Channel::default());

    let event = command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]);
    router.spawn(event, DeliveryTarget::new(channel.clone())).await.unwrap();

    assert_eq!(channel.names(), vec!["acknowledge", "edit_original"]);
    assert_eq!(channel.last_content(), "Command error.");
}

#[tokio::test]
async fn test_long_report_is_attached() {
    let long = "line\n".repeat(1000);
    let (router, _) = router(move |_| Ok(accepted(&long)));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "run", &[("lang", text("java")), ("code", text("class A {}"))]), &channel).await;

    let payload = channel.last_payload();
    let file = payload.attachment.expect("long output should be attached");
    assert_eq!(file.filename, "output.txt");
    assert!(String::from_utf8(file.content).unwrap().starts_with("Status: Accepted\n\n[stdout]\nline"));
}

#[tokio::test]
async fn test_help_and_unknown_commands() {
    let (router, _) = router(|_| Ok(accepted("x")));

    let channel = Arc::new(Channel::default());
    dispatch(&router, command("1", "help", &[]), &channel).await;
    assert_eq!(channel.names(), vec!["respond"]);
    assert!(channel.last_payload().ephemeral);
    assert!(channel.last_content().contains("/run"));

    let channel = Arc::new(Channel::default());
    dispatch(&router, command("2", "page-list", &[]), &channel).await;
    assert_eq!(channel.last_content(), "Unknown command.");
}

#[tokio::test]
async fn test_clear_without_moderator_is_unavailable() {
    let (router, _) = router(|_| Ok(accepted("x")));
    let channel = Arc::new(Channel::default());

    dispatch(&router, command("1", "clear", &[("amount", OptionValue::Integer(5))]), &channel).await;

    assert_eq!(channel.last_content(), "Clearing messages is not available here.");
}
