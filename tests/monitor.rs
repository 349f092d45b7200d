mod support;

use std::time::{Duration, Instant};

use sharelink::{
    config::Config,
    error::ErrorKind,
    events::{self, Event},
    monitor::{Monitor, State},
    track::TaskId,
};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{protocol::frame::coding::CloseCode, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::support::Step::{Close, Pause, Text};

const GRACE: Duration = Duration::from_millis(400);

fn config(progress: &Url, grace_period: Duration) -> Config {
    let mut config = Config::default();
    config.progress_url = progress.clone();
    config.grace_period = grace_period;
    config
}

fn task_id() -> TaskId {
    "task-1".parse().unwrap()
}

fn progress(percent: u8, label: &str) -> Event {
    Event::Progress {
        percent,
        label: label.to_owned(),
    }
}

/// Collects events up to and including `Closed`, with their arrival time.
async fn collect(event_rx: &mut events::Receiver) -> Vec<(Instant, Event)> {
    let mut events = Vec::new();
    while let Some(event) = event_rx.recv().await {
        let closed = event.is_closed();
        events.push((Instant::now(), event));
        if closed {
            break;
        }
    }
    events
}

fn is_normal_close(message: Option<&Message>) -> bool {
    matches!(
        message,
        Some(Message::Close(Some(frame)))
            if frame.code == CloseCode::Normal && frame.reason.as_str() == "Done"
    )
}

#[tokio::test]
async fn events_keep_arrival_order_and_close_after_grace() {
    let (url, server) =
        support::serve_progress(vec![Text("progress:10 A"), Text("progress:55 A"), Text("done:ok")]).await;
    let (event_tx, mut event_rx) = events::channel();

    let mut handle = Monitor::new(&config(&url, GRACE), event_tx).spawn(task_id());
    let events = collect(&mut event_rx).await;
    handle.join().await.unwrap();

    let kinds: Vec<_> = events.iter().map(|(_, event)| event.clone()).collect();
    assert_eq!(
        kinds,
        [
            Event::Subscribed { task_id: task_id() },
            progress(10, "A"),
            progress(55, "A"),
            Event::Done {
                status: "ok".to_owned()
            },
            Event::Closed,
        ]
    );

    // Allow for scheduling of the observer.
    let done_at = events[3].0;
    let closed_at = events[4].0;
    assert!(closed_at - done_at >= GRACE - Duration::from_millis(50));

    let received = server.await.unwrap();
    assert_eq!(received.first(), Some(&Message::text("subscribe:task-1")));
    assert!(is_normal_close(received.last()));
}

#[tokio::test]
async fn remote_close_before_done_fails_immediately() {
    let (url, _server) = support::serve_progress(vec![Text("progress:10 A"), Close]).await;
    let (event_tx, mut event_rx) = events::channel();

    // Long enough to notice if it were applied.
    let mut monitor = Monitor::new(&config(&url, Duration::from_secs(30)), event_tx);
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run(&task_id(), &CancellationToken::new()),
    )
    .await
    .unwrap();

    assert_eq!(result.unwrap_err().kind, ErrorKind::StreamFailure);
    assert_eq!(monitor.state(), State::Closed);

    let events: Vec<_> = collect(&mut event_rx)
        .await
        .into_iter()
        .map(|(_, event)| event)
        .collect();
    assert_eq!(events.len(), 4);
    assert_eq!(events[1], progress(10, "A"));
    assert!(matches!(events[2], Event::Failed { .. }));
    assert_eq!(events[3], Event::Closed);
}

#[tokio::test]
async fn malformed_progress_is_passed_through() {
    let (url, _server) = support::serve_progress(vec![Text("progress:ual text"), Text("done:ok")]).await;
    let (event_tx, mut event_rx) = events::channel();

    let mut handle = Monitor::new(&config(&url, Duration::from_millis(50)), event_tx).spawn(task_id());
    let events: Vec<_> = collect(&mut event_rx)
        .await
        .into_iter()
        .map(|(_, event)| event)
        .collect();
    handle.join().await.unwrap();

    assert_eq!(
        events[1],
        Event::Other {
            text: "progress:ual text".to_owned()
        }
    );
    assert!(!events.iter().any(|event| matches!(event, Event::Failed { .. })));
}

#[tokio::test]
async fn messages_during_grace_are_forwarded() {
    let (url, _server) = support::serve_progress(vec![
        Text("done:ok"),
        Text("progress:100 A"),
        Text("done:again"),
        Pause(Duration::from_millis(50)),
        Close,
    ])
    .await;
    let (event_tx, mut event_rx) = events::channel();

    let mut handle = Monitor::new(&config(&url, GRACE), event_tx).spawn(task_id());
    let events: Vec<_> = collect(&mut event_rx)
        .await
        .into_iter()
        .map(|(_, event)| event)
        .collect();

    // A close by the server after completion is not a failure.
    handle.join().await.unwrap();
    assert_eq!(
        events[1..],
        [
            Event::Done {
                status: "ok".to_owned()
            },
            progress(100, "A"),
            Event::Done {
                status: "again".to_owned()
            },
            Event::Closed,
        ]
    );
}

#[tokio::test]
async fn stop_closes_the_subscription_normally() {
    let (url, server) = support::serve_progress(vec![Text("progress:1 A")]).await;
    let (event_tx, mut event_rx) = events::channel();

    let handle = Monitor::new(&config(&url, GRACE), event_tx).spawn(task_id());
    while let Some(event) = event_rx.recv().await {
        if matches!(event, Event::Progress { .. }) {
            break;
        }
    }

    handle.stop().await.unwrap();
    assert_eq!(event_rx.recv().await, Some(Event::Closed));

    let received = server.await.unwrap();
    assert!(is_normal_close(received.last()));
}

#[tokio::test]
async fn stop_before_connecting() {
    let url = Url::parse("ws://127.0.0.1:9/ws/progress").unwrap();
    let (event_tx, mut event_rx) = events::channel();

    let token = CancellationToken::new();
    token.cancel();

    let mut monitor = Monitor::new(&config(&url, GRACE), event_tx);
    monitor.run(&task_id(), &token).await.unwrap();

    assert_eq!(event_rx.recv().await, Some(Event::Closed));
    assert_eq!(monitor.state(), State::Closed);
}

#[tokio::test]
async fn unreachable_server_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}/ws/progress", listener.local_addr().unwrap())).unwrap();
    drop(listener);

    let (event_tx, mut event_rx) = events::channel();
    let mut monitor = Monitor::new(&config(&url, GRACE), event_tx);

    let err = monitor
        .run(&task_id(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StreamFailure);
    assert!(matches!(event_rx.recv().await, Some(Event::Failed { .. })));
    assert_eq!(event_rx.recv().await, Some(Event::Closed));
}
