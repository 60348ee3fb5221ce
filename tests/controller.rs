//! Controller-side session tests.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use presentation_shim::{ConnectionState, ErrorKind, Message, Presentation, RequestState};

use common::{CountingSelector, MockMechanism, SLIDES_URL, init_logging};

// ============================================================================
// start()
// ============================================================================

#[tokio::test]
async fn test_start_connects_single_display() {
    init_logging();
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");

    let request = presentation.request(SLIDES_URL).expect("request");
    assert_eq!(request.state(), RequestState::Idle);

    let connection = request.start().await.expect("start");
    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(connection.url().map(|u| u.as_str()), Some(SLIDES_URL));
    assert_eq!(request.state(), RequestState::Connected);
    assert_eq!(display.navigations.load(Ordering::SeqCst), 1);

    let records = presentation.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, connection.id());
    assert_eq!(records[0].connection, connection);
}

#[tokio::test]
async fn test_start_without_mechanisms_is_not_found() {
    let presentation = Presentation::builder().build().expect("build");
    let request = presentation.request(SLIDES_URL).expect("request");

    let err = request.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(request.state(), RequestState::Failed);
}

#[tokio::test]
async fn test_zero_displays_skips_selection() {
    let selector = CountingSelector::new(Some(0));
    let calls = Arc::clone(&selector.calls);
    let presentation = Presentation::builder()
        .mechanism(MockMechanism::new("empty"))
        .selector(selector)
        .build()
        .expect("build");

    let err = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!presentation.availability().value());
}

#[tokio::test]
async fn test_displays_listed_in_registration_order() {
    let first = MockMechanism::new("first");
    first.add_display("A");
    let second = MockMechanism::new("second");
    second.add_display("B");
    second.add_display("C");

    let selector = CountingSelector::new(Some(2));
    let options = Arc::clone(&selector.last_options);
    let presentation = Presentation::builder()
        .mechanism(first)
        .mechanism(second)
        .selector(selector)
        .build()
        .expect("build");

    let connection = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .expect("start");

    let names: Vec<String> = options.lock().iter().map(|o| o.name.clone()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(connection.peer().mechanism(), "second");
    assert!(presentation.availability().value());
}

#[tokio::test]
async fn test_declined_selection_is_abort() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    let presentation = Presentation::builder()
        .mechanism(mock)
        .selector(CountingSelector::new(None))
        .build()
        .expect("build");

    let request = presentation.request(SLIDES_URL).expect("request");
    let err = request.start().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Abort);
    assert_eq!(request.state(), RequestState::Failed);
    assert_eq!(display.navigations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_out_of_range_selection_is_abort() {
    let mock = MockMechanism::new("mock");
    mock.add_display("Test Display");
    let presentation = Presentation::builder()
        .mechanism(mock)
        .selector(CountingSelector::new(Some(5)))
        .build()
        .expect("build");

    let err = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Abort);
}

#[tokio::test]
async fn test_navigation_failure_is_operation_error() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    display.fail_navigate.store(true, Ordering::SeqCst);
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");

    let err = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operation);
    assert!(presentation.records().is_empty());
}

#[tokio::test]
async fn test_failed_start_can_be_retried() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    display.fail_navigate.store(true, Ordering::SeqCst);
    let presentation = Presentation::builder().mechanism(mock.clone()).build().expect("build");
    let request = presentation.request(SLIDES_URL).expect("request");

    assert!(request.start().await.is_err());
    display.fail_navigate.store(false, Ordering::SeqCst);

    let connection = request.start().await.expect("retry");
    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(mock.discoveries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_channel_failure_keeps_record_for_reconnect() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    display.fail_channel.store(true, Ordering::SeqCst);
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");
    let request = presentation.request(SLIDES_URL).expect("request");

    let err = request.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operation);
    assert_eq!(request.state(), RequestState::Failed);

    let records = presentation.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].connection.state(), ConnectionState::Closed);

    display.fail_channel.store(false, Ordering::SeqCst);
    let connection = request.reconnect(&records[0].id.to_string()).await.expect("reconnect");
    assert_eq!(connection, records[0].connection);
    assert_eq!(connection.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_subscribers_receive_new_connection() {
    let mock = MockMechanism::new("mock");
    mock.add_display("Test Display");
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");
    let request = presentation.request(SLIDES_URL).expect("request");

    let mut connections = request.subscribe();
    let connection = request.start().await.expect("start");

    let announced = connections.recv().await.expect("announced");
    assert_eq!(announced, connection);
}

#[tokio::test]
async fn test_request_state_sequence() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    let gate = display.gate_channel();
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");
    let request = presentation.request(SLIDES_URL).expect("request");

    let mut states = request.watch_state();
    let starting = tokio::spawn({
        let request = request.clone();
        async move { request.start().await }
    });

    states
        .wait_for(|state| *state == RequestState::Connecting)
        .await
        .expect("connecting");
    gate.notify_one();

    starting.await.expect("join").expect("start");
    assert_eq!(*states.borrow_and_update(), RequestState::Connected);
}

#[tokio::test]
async fn test_get_availability_not_supported() {
    let presentation = Presentation::builder().build().expect("build");
    let err = presentation
        .request(SLIDES_URL)
        .expect("request")
        .get_availability()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[test]
fn test_invalid_url_is_syntax_error() {
    let presentation = Presentation::builder().build().expect("build");
    let err = presentation.request("slides without scheme").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test]
async fn test_messages_both_directions() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");
    let connection = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .expect("start");

    let remote = display.remote.last();
    let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    remote.set_message_handler(move |message| received_clone.lock().push(message));

    connection.send("next").expect("send");
    connection.send(vec![0xde, 0xad]).expect("send");
    assert_eq!(
        *received.lock(),
        vec![Message::from("next"), Message::Binary(vec![0xde, 0xad])]
    );

    let replies = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let replies_clone = Arc::clone(&replies);
    connection.set_message_handler(move |message| replies_clone.lock().push(message));
    remote.send("slide 2").expect("reply");
    assert_eq!(*replies.lock(), vec![Message::from("slide 2")]);
}

// ============================================================================
// Terminate
// ============================================================================

#[tokio::test]
async fn test_terminate_then_send_is_invalid_state() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");
    let connection = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .expect("start");

    connection.terminate().await;

    assert_eq!(connection.state(), ConnectionState::Terminated);
    assert_eq!(connection.send("late").unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(display.terminations.load(Ordering::SeqCst), 1);
    assert!(!display.remote.last().is_connected());
}

#[tokio::test]
async fn test_remote_close_moves_to_closed() {
    let mock = MockMechanism::new("mock");
    let display = mock.add_display("Test Display");
    let presentation = Presentation::builder().mechanism(mock).build().expect("build");
    let connection = presentation
        .request(SLIDES_URL)
        .expect("request")
        .start()
        .await
        .expect("start");

    display.remote.last().close();
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert_eq!(connection.send("x").unwrap_err().kind(), ErrorKind::InvalidState);
}
