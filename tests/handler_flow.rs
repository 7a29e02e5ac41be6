use rowpipe::{
    AppendOutcome, ClientFactory, CommitConfirmer, Event, IngestHandler, IngestOutcome,
    IngestSession, LogLevel, OffsetToken, OnErrorPolicy, OpenChannelRequest, PollClock, Row,
    RowAssembler, RowError, StreamChannel, StreamClient, TransportError, CHANNEL_NAME,
    INIT_DIAGNOSTIC,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// No-op clock so confirmation retries run without real delay.
struct NullClock;

impl PollClock for NullClock {
    fn sleep(&mut self, _interval: Duration) {}
}

#[derive(Default)]
struct RemoteState {
    appended: Vec<(Row, String)>,
    append_responses: Vec<AppendOutcome>,
    committed: Option<String>,
    auto_commit: bool,
    polls: usize,
    client_closed: bool,
    channel_valid: bool,
    channel_closed: bool,
    fail_create: bool,
}

#[derive(Clone)]
struct MockFactory {
    state: Rc<RefCell<RemoteState>>,
}

impl ClientFactory for MockFactory {
    type Client = MockClient;

    fn create(&self, _identity: &str) -> Result<MockClient, TransportError> {
        let state = self.state.borrow();
        if state.fail_create {
            return Err(TransportError::new("endpoint unreachable"));
        }
        drop(state);
        Ok(MockClient {
            state: self.state.clone(),
        })
    }
}

struct MockClient {
    state: Rc<RefCell<RemoteState>>,
}

impl StreamClient for MockClient {
    type Channel = MockChannel;

    fn is_closed(&self) -> bool {
        self.state.borrow().client_closed
    }

    fn open_channel(&mut self, _request: OpenChannelRequest) -> Result<MockChannel, TransportError> {
        let mut state = self.state.borrow_mut();
        state.channel_valid = true;
        state.channel_closed = false;
        Ok(MockChannel {
            state: self.state.clone(),
        })
    }
}

struct MockChannel {
    state: Rc<RefCell<RemoteState>>,
}

impl StreamChannel for MockChannel {
    fn is_valid(&self) -> bool {
        self.state.borrow().channel_valid
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().channel_closed
    }

    fn append_row(
        &mut self,
        row: &Row,
        offset: &OffsetToken,
    ) -> Result<AppendOutcome, TransportError> {
        let mut state = self.state.borrow_mut();
        state
            .appended
            .push((row.clone(), offset.as_str().to_string()));
        let outcome = if state.append_responses.is_empty() {
            AppendOutcome::accepted()
        } else {
            state.append_responses.remove(0)
        };
        if state.auto_commit && !outcome.has_errors() {
            state.committed = Some(offset.as_str().to_string());
        }
        Ok(outcome)
    }

    fn latest_committed_token(&mut self) -> Result<Option<OffsetToken>, TransportError> {
        let mut state = self.state.borrow_mut();
        state.polls += 1;
        Ok(state.committed.clone().map(OffsetToken::from_raw))
    }
}

fn remote(auto_commit: bool) -> (MockFactory, Rc<RefCell<RemoteState>>) {
    let state = Rc::new(RefCell::new(RemoteState {
        auto_commit,
        ..RemoteState::default()
    }));
    (
        MockFactory {
            state: state.clone(),
        },
        state,
    )
}

fn session(factory: MockFactory) -> IngestSession<MockFactory> {
    let request = OpenChannelRequest {
        channel_name: CHANNEL_NAME.to_string(),
        database: "db1".to_string(),
        schema: "public".to_string(),
        table: "events".to_string(),
        on_error: OnErrorPolicy::Continue,
    };
    IngestSession::new(factory, "instance-1", request)
}

fn handler(debug: bool) -> IngestHandler<NullClock> {
    let vars: BTreeMap<String, String> = [("account".to_string(), "acct1".to_string())]
        .into_iter()
        .collect();
    let assembler = RowAssembler::with_snapshot(&vars).expect("snapshot serializes");
    IngestHandler::new(assembler, CommitConfirmer::new(NullClock), debug)
}

fn event(pairs: &[(&str, &str)]) -> Event {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn single_event_commits_token_one() {
    let (factory, state) = remote(true);
    let mut session = session(factory);
    let mut handler = handler(false);
    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    assert_eq!(outcome.status(), "200 OK");
    match outcome {
        IngestOutcome::Committed { token, rows } => {
            assert_eq!(token.as_str(), "1");
            assert_eq!(rows, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    let state = state.borrow();
    assert_eq!(state.appended.len(), 1);
    assert_eq!(state.appended[0].1, "1");
    assert_eq!(session.sequencer().current_id(), 2);
}

#[test]
fn consecutive_invocations_confirm_increasing_tokens() {
    let (factory, state) = remote(true);
    let mut session = session(factory);
    let mut handler = handler(false);
    for _ in 0..3 {
        let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
        assert!(outcome.is_success());
    }
    let tokens: Vec<_> = state
        .borrow()
        .appended
        .iter()
        .map(|(_, token)| token.clone())
        .collect();
    assert_eq!(tokens, vec!["1", "2", "3"]);
}

#[test]
fn validation_error_surfaces_first_message_and_keeps_the_token() {
    let (factory, state) = remote(true);
    state
        .borrow_mut()
        .append_responses
        .push(AppendOutcome::rejected(0, "bad value"));
    let mut session = session(factory);
    let mut handler = handler(false);

    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    assert_eq!(outcome.status(), "500 bad value");
    assert_eq!(session.sequencer().current_id(), 1, "counter unchanged");

    // The next invocation reuses the same token.
    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    assert!(outcome.is_success());
    let tokens: Vec<_> = state
        .borrow()
        .appended
        .iter()
        .map(|(_, token)| token.clone())
        .collect();
    assert_eq!(tokens, vec!["1", "1"]);
}

#[test]
fn errors_beyond_the_first_are_discarded() {
    let (factory, state) = remote(true);
    state.borrow_mut().append_responses.push(AppendOutcome {
        errors: vec![
            RowError {
                row_index: 0,
                message: "bad value".to_string(),
            },
            RowError {
                row_index: 1,
                message: "worse value".to_string(),
            },
        ],
    });
    let mut session = session(factory);
    let mut handler = handler(false);
    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    assert_eq!(outcome.status(), "500 bad value");
}

#[test]
fn commit_timeout_renders_the_full_diagnostic() {
    let (factory, state) = remote(false);
    state.borrow_mut().committed = Some("0".to_string());
    let mut session = session(factory);
    let mut handler = handler(false);
    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    let status = outcome.status();
    assert!(status.starts_with("500 "));
    assert!(status.contains("Failed to receive required OffsetToken"));
    assert!(status.contains("OffsetToken:1"));
    assert!(status.contains("MaxRetryCounts:20"));
    assert!(status.contains("(0)"));
    assert_eq!(session.sequencer().current_id(), 1, "counter unchanged");
    assert_eq!(state.borrow().polls, 21, "initial poll plus twenty retries");
}

#[test]
fn multi_mode_submits_one_row_per_key_under_one_token() {
    let (factory, state) = remote(true);
    let mut session = session(factory);
    let mut handler = handler(false);
    let outcome = handler.ingest_multi(&mut session, &event(&[("a", "1"), ("b", "2")]));
    match outcome {
        IngestOutcome::Committed { token, rows } => {
            assert_eq!(token.as_str(), "1");
            assert_eq!(rows, 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    let state = state.borrow();
    assert_eq!(state.appended.len(), 2);
    assert_eq!(state.appended[0].0.event_type, "a");
    assert_eq!(state.appended[1].0.event_type, "b");
    assert_eq!(state.appended[0].1, "1");
    assert_eq!(state.appended[1].1, "1");
    assert_eq!(state.polls, 1, "only the last token is confirmed, once");
}

#[test]
fn initialization_failure_surfaces_the_fixed_diagnostic() {
    let (factory, state) = remote(true);
    state.borrow_mut().fail_create = true;
    let mut session = session(factory);
    let mut handler = handler(false);
    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    assert_eq!(outcome.status(), format!("500 {INIT_DIAGNOSTIC}"));
    assert!(matches!(outcome, IngestOutcome::Initialization { .. }));
    assert!(state.borrow().appended.is_empty(), "nothing was submitted");
}

#[test]
fn empty_multi_event_submits_nothing() {
    let (factory, state) = remote(true);
    let mut session = session(factory);
    let mut handler = handler(false);
    let outcome = handler.ingest_multi(&mut session, &Event::new());
    assert!(matches!(outcome, IngestOutcome::Unexpected { .. }));
    assert!(state.borrow().appended.is_empty());
    assert_eq!(session.sequencer().current_id(), 1);
}

#[test]
fn channel_invalidation_between_invocations_rekeys_tokens() {
    let (factory, state) = remote(true);
    let mut session = session(factory);
    let mut handler = handler(false);
    for _ in 0..2 {
        let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
        assert!(outcome.is_success());
    }
    state.borrow_mut().channel_valid = false;
    let outcome = handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    assert!(outcome.is_success());
    let tokens: Vec<_> = state
        .borrow()
        .appended
        .iter()
        .map(|(_, token)| token.clone())
        .collect();
    assert_eq!(tokens, vec!["1", "2", "1"], "fresh channel restarts at 1");
}

#[test]
fn debug_mode_logs_the_inbound_event() {
    let (factory, _state) = remote(true);
    let mut session = session(factory);
    let mut handler = handler(true);
    handler.ingest_single(&mut session, &event(&[("key1", "value1")]));
    let lines: Vec<_> = handler
        .logger()
        .segments()
        .flat_map(|segment| segment.lines().iter())
        .collect();
    assert!(lines
        .iter()
        .any(|line| line.contains("DEBUG") && line.contains("EVENT:")));
    assert_eq!(handler.logger().level(), LogLevel::Debug);
}
