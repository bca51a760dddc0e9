mod common;

use common::{FakeTrapServer, ack, closed_port, framed};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};
use trap_forwarder::domain::{ResultCode, ServerMessage};
use trap_forwarder::sender::{
    SenderConfig, TcpTransport, TrapSender, TrapTransport, TransportError,
};

fn config(port: u16) -> SenderConfig {
    SenderConfig {
        port,
        timeout: Duration::from_millis(500),
        ..SenderConfig::default()
    }
}

#[tokio::test]
async fn test_send_data_ok() {
    let server = FakeTrapServer::start(vec![ack(
        "processed: 2; failed: 0; total: 2; seconds spent: 0.000055",
    )])
    .await;

    let mut sender = TrapSender::new(config(server.port())).unwrap();
    sender.add_data("web-01", "cpu.load", "0.25", Some(1000)).unwrap();
    sender.add_data("web-01", "mem.free", "1024", None).unwrap();

    let results = assert_ok!(sender.send_data(None, None).await);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::Ok);
    assert_eq!(results[0].failed_count(), Some(0));

    let requests = server.requests();
    assert_eq!(
        requests,
        vec![
            r#"{"request":"sender data","data":[{"host":"web-01","key":"cpu.load","value":"0.25","clock":1000},{"host":"web-01","key":"mem.free","value":"1024"}]}"#
        ]
    );
    assert_eq!(sender.data_len(), 2);
}

#[tokio::test]
async fn test_chunks_are_sent_in_order() {
    let server = FakeTrapServer::start(vec![
        ack("processed: 1; failed: 0; total: 1"),
        ack("processed: 0; failed: 1; total: 1"),
    ])
    .await;

    let mut sender = TrapSender::new(config(server.port())).unwrap();
    sender.add_data("h1", "k1", "5", Some(1000)).unwrap();
    sender.add_data("h1", "k2", "7", Some(1000)).unwrap();

    let results = sender.send_data(Some(2000), Some(1)).await.unwrap();
    let codes: Vec<ResultCode> = results.iter().map(|r| r.code).collect();
    assert_eq!(codes, vec![ResultCode::Ok, ResultCode::SendFailed]);
    assert_eq!(results[1].failed_count(), Some(1));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains(r#""key":"k1""#));
    assert!(requests[0].ends_with(r#""clock":2000}"#));
    assert!(requests[1].contains(r#""key":"k2""#));
}

#[tokio::test]
async fn test_empty_store_does_not_connect() {
    let sender = TrapSender::new(config(closed_port().await)).unwrap();
    let results = sender.send_data(None, Some(10)).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(sender.stats().snapshot().round_trips, 0);
}

#[tokio::test]
async fn test_bad_magic_is_invalid_response() {
    let server = FakeTrapServer::start(vec![b"HTTP/1.1 400 Bad Request\r\n\r\n".to_vec()]).await;

    let result = TrapSender::new(config(server.port()))
        .unwrap()
        .send_single("web-01", "cpu.load", "1", None)
        .await
        .unwrap();

    assert_eq!(result.code, ResultCode::InvalidResponse);
    match &result.message {
        ServerMessage::Error(text) => assert!(text.contains(r#""key":"cpu.load""#)),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn test_short_non_prefix_reply_is_invalid_response() {
    let server = FakeTrapServer::start(vec![b"NO".to_vec()]).await;

    let result = TrapSender::new(config(server.port()))
        .unwrap()
        .send_single("web-01", "cpu.load", "1", None)
        .await
        .unwrap();

    assert_eq!(result.code, ResultCode::InvalidResponse);
    assert!(result.message.to_string().contains(r#""key":"cpu.load""#));
}

#[tokio::test]
async fn test_truncated_prefix_is_connection_error() {
    let server = FakeTrapServer::start(vec![b"ZBX".to_vec()]).await;

    let result = TrapSender::new(config(server.port()))
        .unwrap()
        .send_single("web-01", "cpu.load", "1", None)
        .await
        .unwrap();

    assert_eq!(result.code, ResultCode::ConnectionError);
}

#[tokio::test]
async fn test_reply_written_in_pieces() {
    let reply = ack("processed: 5; failed: 0; total: 5; seconds spent: 0.000101");
    let pieces = vec![
        reply[..2].to_vec(),
        reply[2..5].to_vec(),
        reply[5..9].to_vec(),
        reply[9..13].to_vec(),
        reply[13..20].to_vec(),
        reply[20..].to_vec(),
    ];
    let server = FakeTrapServer::start_in_pieces(pieces, Duration::from_millis(20)).await;

    let mut sender = TrapSender::new(config(server.port())).unwrap();
    for key in ["a", "b", "c", "d", "e"] {
        sender.add_data("web-01", key, "1", None).unwrap();
    }

    let results = sender.send_data(None, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::Ok);
    assert_eq!(results[0].failed_count(), Some(0));
    assert_eq!(results[0].summary.unwrap().processed, Some(5));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_response_without_info_is_parse_error() {
    let server = FakeTrapServer::start(vec![framed(r#"{"response":"success"}"#)]).await;

    let result = TrapSender::new(config(server.port()))
        .unwrap()
        .send_single("web-01", "cpu.load", "1", None)
        .await
        .unwrap();

    assert_eq!(result.code, ResultCode::ParseError);
}

#[tokio::test]
async fn test_connection_refused() {
    let port = closed_port().await;
    let mut sender = TrapSender::new(config(port)).unwrap();
    sender.add_data("web-01", "a", "1", None).unwrap();
    sender.add_data("web-01", "b", "2", None).unwrap();

    let results = sender.send_data(None, Some(1)).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.code == ResultCode::ConnectionError));
    assert!(results[0].message.to_string().contains(&port.to_string()));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let holder = tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let transport = TcpTransport::new("127.0.0.1", port, Duration::from_millis(200));
    let error = assert_err!(transport.exchange(&framed("{}")).await);
    assert!(matches!(
        error,
        TransportError::Timeout {
            stage: "read header",
            ..
        }
    ));

    holder.abort();
}

#[tokio::test]
async fn test_one_by_one_pairs_results_with_points() {
    let server = FakeTrapServer::start(vec![
        ack("processed: 1; failed: 0; total: 1"),
        ack("processed: 0; failed: 1; total: 1"),
        ack("processed: 1; failed: 0; total: 1"),
    ])
    .await;

    let mut sender = TrapSender::new(config(server.port())).unwrap();
    for key in ["a", "b", "c"] {
        sender.add_data("web-01", key, "1", Some(1000)).unwrap();
    }

    let pairs = sender.send_data_one_by_one().await.unwrap();
    let summary: Vec<(&str, ResultCode)> = pairs
        .iter()
        .map(|(result, point)| (point.key.as_str(), result.code))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a", ResultCode::Ok),
            ("b", ResultCode::SendFailed),
            ("c", ResultCode::Ok)
        ]
    );
    assert_eq!(server.requests().len(), 3);
    assert_eq!(sender.data_len(), 3);

    let stats = sender.stats().snapshot();
    assert_eq!(stats.round_trips, 3);
    assert_eq!(stats.send_failed, 1);
}
