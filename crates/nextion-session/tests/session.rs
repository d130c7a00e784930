use std::time::Duration;

use futures_util::StreamExt;
use nextion_frame::{DelimiterCodec, DELIMITER};
use nextion_message::{Event, EventCode, Response, ResponseCode, ReturnMode, TouchEvent, Value};
use nextion_session::{ConnectionState, Session, SessionConfig, SessionError, SessionNotice};
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::codec::FramedRead;

const WAIT: Duration = Duration::from_secs(2);
const SHORT: Duration = Duration::from_millis(100);

/// Scripted device on the far end of an in-memory link.
struct Device {
    commands: FramedRead<ReadHalf<DuplexStream>, DelimiterCodec>,
    writer: WriteHalf<DuplexStream>,
}

impl Device {
    async fn expect(&mut self, command: &str) {
        let frame = time::timeout(WAIT, self.commands.next())
            .await
            .unwrap_or_else(|_| panic!("device should receive '{command}'"))
            .expect("link should stay open")
            .expect("command should frame cleanly");
        assert_eq!(
            String::from_utf8_lossy(frame.as_bytes()),
            command,
            "unexpected command on the wire"
        );
    }

    async fn reply(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("reply should write");
        self.writer
            .write_all(&DELIMITER)
            .await
            .expect("delimiter should write");
    }

    async fn idle_for(&mut self, window: Duration) -> bool {
        time::timeout(window, self.commands.next()).await.is_err()
    }

    async fn handshake(&mut self) {
        self.expect("bkcmd=3").await;
        self.reply(&[0x01]).await;
        self.expect("sleep=0").await;
        self.reply(&[0x01]).await;
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        request_timeout: Duration::from_millis(500),
        bind_timeout: Duration::from_millis(500),
        ..SessionConfig::default()
    }
}

fn pair(config: SessionConfig) -> (Session, Device) {
    pair_with_capacity(config, 1024)
}

/// `capacity` bounds the bytes in flight toward the device.
fn pair_with_capacity(config: SessionConfig, capacity: usize) -> (Session, Device) {
    let (host, device) = tokio::io::duplex(capacity);
    let session = Session::new(host, config);
    let (reader, writer) = tokio::io::split(device);
    let device = Device {
        commands: FramedRead::new(reader, DelimiterCodec::new()),
        writer,
    };
    (session, device)
}

async fn ready() -> (Session, Device) {
    let (session, mut device) = pair(test_config());
    let (bound, ()) = tokio::join!(session.bind(), device.handshake());
    bound.expect("bind should succeed");
    (session, device)
}

async fn next_notice(notices: &mut broadcast::Receiver<SessionNotice>) -> SessionNotice {
    time::timeout(WAIT, notices.recv())
        .await
        .expect("notice should arrive")
        .expect("notice channel should stay open")
}

fn success() -> Response {
    Response::new(ResponseCode::Success)
}

#[tokio::test]
async fn bind_configures_device_before_ready() {
    let (session, mut device) = pair(test_config());
    let mut notices = session.notices();
    assert_eq!(session.state(), ConnectionState::Binding);

    let (bound, ()) = tokio::join!(session.bind(), device.handshake());
    bound.expect("bind should succeed");

    assert_eq!(session.state(), ConnectionState::Ready);
    assert_eq!(next_notice(&mut notices).await, SessionNotice::Ready);
}

#[tokio::test]
async fn bind_failure_is_configuration_error_and_disconnects() {
    let (session, mut device) = pair(test_config());
    let mut notices = session.notices();

    let device_side = async {
        device.expect("bkcmd=3").await;
        device.reply(&[0x00]).await;
    };
    let (bound, ()) = tokio::join!(session.bind(), device_side);

    match bound {
        Err(SessionError::Configuration { command, reason }) => {
            assert_eq!(command, "bkcmd=3");
            assert!(reason.contains("invalidInstruction"), "reason: {reason}");
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(matches!(
        next_notice(&mut notices).await,
        SessionNotice::Disconnected { .. }
    ));

    let err = session.request("page 0").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::NotReady {
            state: ConnectionState::Disconnected
        }
    ));
    assert!(matches!(
        session.bind().await,
        Err(SessionError::NotReady { .. })
    ));
}

#[tokio::test]
async fn bind_timeout_is_configuration_error() {
    let (session, mut device) = pair(SessionConfig {
        bind_timeout: SHORT,
        ..test_config()
    });

    let (bound, ()) = tokio::join!(session.bind(), device.expect("bkcmd=3"));

    match bound {
        Err(SessionError::Configuration { command, reason }) => {
            assert_eq!(command, "bkcmd=3");
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn bind_without_success_replies_only_sends() {
    let (session, mut device) = pair(SessionConfig {
        return_mode: ReturnMode::OnFailure,
        ..test_config()
    });

    let device_side = async {
        device.expect("bkcmd=2").await;
        device.expect("sleep=0").await;
    };
    let (bound, ()) = tokio::join!(session.bind(), device_side);

    bound.expect("bind should succeed without replies");
    assert_eq!(session.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn request_before_ready_is_rejected() {
    let (session, _device) = pair(test_config());

    let err = session.request("sleep=0").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::NotReady {
            state: ConnectionState::Binding
        }
    ));
}

#[tokio::test]
async fn late_response_does_not_resolve_next_request() {
    let (session, mut device) = ready().await;
    let mut notices = session.notices();

    let (first, ()) = tokio::join!(
        session.request_timeout("sleep=0", SHORT),
        device.expect("sleep=0")
    );
    match first {
        Err(SessionError::Timeout { command, timeout }) => {
            assert_eq!(command, "sleep=0");
            assert_eq!(timeout, SHORT);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Ready);

    // The device finally answers the abandoned request.
    device.reply(&[0x01]).await;
    assert_eq!(
        next_notice(&mut notices).await,
        SessionNotice::UnmatchedResponse(success())
    );

    let device_side = async {
        device.expect("foo.val=1").await;
        device.reply(&[0x1a]).await;
    };
    let (second, ()) = tokio::join!(session.request("foo.val=1"), device_side);
    assert_eq!(
        second.expect("second request should settle").code,
        ResponseCode::InvalidVariableName
    );
}

#[tokio::test]
async fn requests_never_overlap_on_the_wire() {
    let (session, mut device) = ready().await;

    let device_side = async {
        device.expect("a=1").await;
        assert!(
            device.idle_for(SHORT).await,
            "second command written before the first settled"
        );
        device.reply(&[0x01]).await;
        device.expect("b=2").await;
        device.reply(&[0x01]).await;
    };
    let (a, b, ()) = tokio::join!(session.request("a=1"), session.request("b=2"), device_side);

    assert_eq!(a.expect("first request"), success());
    assert_eq!(b.expect("second request"), success());
}

#[tokio::test]
async fn request_all_settles_each_command_in_order() {
    let (session, mut device) = ready().await;

    let device_side = async {
        device.expect("a=1").await;
        device.reply(&[0x01]).await;
        device.expect("b=2").await;
        device.expect("c=3").await;
        device.reply(&[0x1a]).await;
    };
    let (results, ()) = tokio::join!(
        session.request_all_timeout(["a=1", "b=2", "c=3"], SHORT),
        device_side
    );

    let results = results.expect("batch should start");
    assert_eq!(results.len(), 3);
    assert_eq!(*results[0].as_ref().expect("a=1 settles"), success());
    assert!(matches!(
        &results[1],
        Err(SessionError::Timeout { command, .. }) if command == "b=2"
    ));
    assert_eq!(
        results[2].as_ref().expect("c=3 settles").code,
        ResponseCode::InvalidVariableName
    );
}

#[tokio::test]
async fn events_are_routed_while_a_request_is_in_flight() {
    let (session, mut device) = ready().await;
    let mut all = session.subscribe();
    let mut pages = session.subscribe_to(EventCode::PageId);

    let device_side = async {
        device.expect("page 1").await;
        device.reply(&[0x66, 0x01]).await;
        device.reply(&[0x65, 0x00, 0x02, 0x01]).await;
        device.reply(&[0x01]).await;
    };
    let (response, ()) = tokio::join!(session.request("page 1"), device_side);
    assert_eq!(response.expect("request should settle"), success());

    assert_eq!(all.recv().await, Some(Event::PageId { page_id: 1 }));
    assert_eq!(
        all.recv().await,
        Some(Event::TouchEvent(TouchEvent {
            page_id: 0,
            button_id: 2,
            release_event: true,
        }))
    );
    assert_eq!(pages.recv().await, Some(Event::PageId { page_id: 1 }));
}

#[tokio::test]
async fn link_loss_fails_pending_request_and_disconnects() {
    let (session, mut device) = ready().await;
    let mut notices = session.notices();
    let mut state = session.watch_state();
    let mut events = session.subscribe();

    let device_side = async move {
        device.expect("t0.txt=\"hi\"").await;
        drop(device);
    };
    let (response, ()) = tokio::join!(session.request("t0.txt=\"hi\""), device_side);

    match response {
        Err(SessionError::Link { reason }) => assert_eq!(reason, "link closed"),
        other => panic!("expected link error, got {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(
        next_notice(&mut notices).await,
        SessionNotice::Disconnected {
            reason: "link closed".to_string()
        }
    );
    assert!(state.has_changed().expect("state sender alive"));
    assert_eq!(*state.borrow_and_update(), ConnectionState::Disconnected);
    assert_eq!(events.recv().await, None);
    assert_eq!(session.subscribe().recv().await, None);

    assert!(matches!(
        session.request("page 0").await,
        Err(SessionError::NotReady {
            state: ConnectionState::Disconnected
        })
    ));
    assert!(matches!(
        session.send("page 0").await,
        Err(SessionError::NotReady { .. })
    ));
}

#[tokio::test]
async fn unknown_code_is_reported_and_decoding_continues() {
    let (session, mut device) = ready().await;
    let mut notices = session.notices();

    let device_side = async {
        device.expect("x=1").await;
        device.reply(&[0x40, 0x01]).await;
        device.reply(&[0x01]).await;
    };
    let (response, ()) = tokio::join!(session.request("x=1"), device_side);

    assert_eq!(response.expect("request should still settle"), success());
    match next_notice(&mut notices).await {
        SessionNotice::Error { message } => assert!(message.contains("0x40"), "{message}"),
        other => panic!("expected error notice, got {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn get_value_resolves_with_numeric_data() {
    let (session, mut device) = ready().await;
    let mut numbers = session.subscribe_to(EventCode::NumericData);

    let device_side = async {
        device.expect("get n0.val").await;
        device.reply(&[0x71, 0x2C, 0x01]).await;
    };
    let (value, ()) = tokio::join!(session.get_value("n0.val"), device_side);

    assert_eq!(value.expect("value should arrive"), Value::Number(300));
    assert_eq!(
        numbers.recv().await,
        Some(Event::NumericData { value: 300 })
    );
}

#[tokio::test]
async fn get_value_skips_success_and_reads_text() {
    let (session, mut device) = ready().await;

    let device_side = async {
        device.expect("get t0.txt").await;
        device.reply(&[0x01]).await;
        device.reply(b"\x70hello").await;
    };
    let (value, ()) = tokio::join!(session.get_value("t0.txt"), device_side);

    assert_eq!(
        value.expect("value should arrive"),
        Value::Text("hello".to_string())
    );
}

#[tokio::test]
async fn get_value_ignores_data_sent_before_its_query() {
    let (session, mut device) = ready().await;

    let query = async {
        // Queue behind the request that holds the write path.
        tokio::task::yield_now().await;
        session.get_value("t0.txt").await
    };
    let device_side = async {
        device.expect("page 0").await;
        device.reply(b"\x70stale").await;
        device.reply(&[0x01]).await;
        device.expect("get t0.txt").await;
        device.reply(b"\x70fresh").await;
    };
    let (first, value, ()) = tokio::join!(session.request("page 0"), query, device_side);

    assert_eq!(first.expect("page 0 should succeed"), success());
    assert_eq!(
        value.expect("value should arrive"),
        Value::Text("fresh".to_string())
    );
}

#[tokio::test]
async fn stalled_write_times_out_and_disconnects() {
    let (session, mut device) = pair_with_capacity(test_config(), 64);
    let (bound, ()) = tokio::join!(session.bind(), device.handshake());
    bound.expect("bind should succeed");
    let mut notices = session.notices();

    // The device stops reading; the command cannot fit in the link buffer.
    let command = format!("t0.txt=\"{}\"", "x".repeat(512));
    let result = time::timeout(
        WAIT,
        session.request_timeout(command, Duration::from_millis(200)),
    )
    .await
    .expect("request should settle within its own timeout");

    assert!(
        matches!(result, Err(SessionError::Timeout { .. })),
        "got {result:?}"
    );
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(matches!(
        next_notice(&mut notices).await,
        SessionNotice::Error { .. }
    ));
    assert!(matches!(
        next_notice(&mut notices).await,
        SessionNotice::Disconnected { .. }
    ));

    // The write path is free again.
    let sent = time::timeout(WAIT, session.send("page 0"))
        .await
        .expect("send should not wait on the stalled write");
    assert!(matches!(
        sent,
        Err(SessionError::NotReady {
            state: ConnectionState::Disconnected
        })
    ));
    time::timeout(WAIT, session.close())
        .await
        .expect("close should not wait on the stalled write")
        .expect("close should succeed");
    drop(device);
}

#[tokio::test]
async fn get_value_rejected_by_device() {
    let (session, mut device) = ready().await;

    let device_side = async {
        device.expect("get nope.val").await;
        device.reply(&[0x1a]).await;
    };
    let (value, ()) = tokio::join!(session.get_value("nope.val"), device_side);

    match value {
        Err(SessionError::Rejected { command, code }) => {
            assert_eq!(command, "get nope.val");
            assert_eq!(code, ResponseCode::InvalidVariableName);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn set_value_formats_assignment() {
    let (session, mut device) = ready().await;

    let device_side = async {
        device.expect("h0.val=42").await;
        device.reply(&[0x01]).await;
    };
    let (response, ()) = tokio::join!(session.set_value("h0.val", 42), device_side);
    assert_eq!(response.expect("assignment should settle"), success());
}

#[tokio::test]
async fn send_does_not_wait_for_a_response() {
    let (session, mut device) = ready().await;

    session.send("ref 0").await.expect("send should flush");
    device.expect("ref 0").await;
}

#[tokio::test]
async fn close_shuts_down_the_link() {
    let (session, mut device) = ready().await;
    let mut notices = session.notices();

    session.close().await.expect("close should succeed");

    let eof = time::timeout(WAIT, device.commands.next())
        .await
        .expect("device should observe shutdown");
    assert!(eof.is_none());
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(
        next_notice(&mut notices).await,
        SessionNotice::Disconnected {
            reason: "closed by host".to_string()
        }
    );
}

#[tokio::test]
async fn system_helpers_validate_before_writing() {
    let (session, mut device) = ready().await;

    assert!(matches!(
        session.set_system_variable("sys9", 1).await,
        Err(SessionError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.set_random_range(10, 1).await,
        Err(SessionError::InvalidArgument(_))
    ));
    assert!(device.idle_for(SHORT).await, "rejected calls must not write");

    let device_side = async {
        device.expect("sys1=7").await;
        device.reply(&[0x01]).await;
        device.expect("ranset 1,10").await;
        device.reply(&[0x01]).await;
        device.expect("sleep=1").await;
        device.reply(&[0x01]).await;
    };
    let requests = async {
        let sys = session.set_system_variable("sys1", 7).await;
        let range = session.set_random_range(1, 10).await;
        let sleep = session.sleep().await;
        (sys, range, sleep)
    };
    let ((sys, range, sleep), ()) = tokio::join!(requests, device_side);

    assert_eq!(sys.expect("sys1 assignment"), success());
    assert_eq!(range.expect("ranset"), success());
    assert_eq!(sleep.expect("sleep"), success());
}
