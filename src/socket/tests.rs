//! Tests for the socket module
//!
//! Timing tests run on a paused tokio clock against a scripted in-memory
//! transport; one test talks to a real loopback WebSocket server.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::error::SocketError;
    use async_trait::async_trait;
    use futures::channel::mpsc as fmpsc;
    use futures::{SinkExt, StreamExt};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, Instant};

    enum Outcome {
        Fail,
        Open(Connection),
    }

    struct ScriptedTransport {
        script: Mutex<VecDeque<Outcome>>,
        attempts: mpsc::UnboundedSender<Instant>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Outcome>) -> (Arc<Self>, mpsc::UnboundedReceiver<Instant>) {
            let (attempts, rx) = mpsc::unbounded_channel();
            let transport = Arc::new(Self {
                script: Mutex::new(script.into()),
                attempts,
            });
            (transport, rx)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self, _url: &str) -> Result<Connection, SocketError> {
            let _ = self.attempts.send(Instant::now());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Outcome::Open(connection)) => Ok(connection),
                Some(Outcome::Fail) | None => Err(SocketError::Connect("refused".to_string())),
            }
        }
    }

    /// Server side of an in-memory connection
    struct Peer {
        to_client: fmpsc::UnboundedSender<Result<String, SocketError>>,
        from_client: fmpsc::UnboundedReceiver<String>,
    }

    fn pipe() -> (Connection, Peer) {
        let (client_tx, from_client) = fmpsc::unbounded::<String>();
        let (to_client, client_rx) = fmpsc::unbounded::<Result<String, SocketError>>();
        let sink = client_tx.sink_map_err(|e| SocketError::Send(e.to_string()));
        (
            Connection::new(Box::pin(sink), Box::pin(client_rx)),
            Peer {
                to_client,
                from_client,
            },
        )
    }

    struct Recorder {
        greeting: Option<&'static str>,
        events: mpsc::UnboundedSender<String>,
    }

    impl Recorder {
        fn new(greeting: Option<&'static str>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            let (events, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { greeting, events }), rx)
        }
    }

    #[async_trait]
    impl SocketHandler for Recorder {
        async fn on_open(&self, sender: SocketSender) {
            if let Some(greeting) = self.greeting {
                sender.send(greeting).unwrap();
            }
            let _ = self.events.send("open".to_string());
        }

        async fn on_message(&self, text: String) {
            let _ = self.events.send(format!("message:{text}"));
        }

        async fn on_error(&self, _error: &SocketError) {
            let _ = self.events.send("error".to_string());
        }

        async fn on_close(&self) {
            let _ = self.events.send("close".to_string());
        }
    }

    async fn wait_for(events: &mut mpsc::UnboundedReceiver<String>, wanted: &str) {
        while let Some(event) = events.recv().await {
            if event == wanted {
                return;
            }
        }
        panic!("event stream ended before {wanted}");
    }

    fn gaps(times: &[Instant]) -> Vec<u64> {
        times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect()
    }

    fn scripted_client(transport: Arc<ScriptedTransport>, handler: Arc<Recorder>) -> SocketClient {
        SocketClient::new(SocketOptions::new("ws://alerts.test/ws"), transport, handler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_delays_double_and_cap() {
        let (transport, mut attempts) = ScriptedTransport::new(vec![]);
        let (handler, _events) = Recorder::new(None);
        let client = scripted_client(transport, handler);

        client.connect();
        let mut times = Vec::new();
        for _ in 0..8 {
            times.push(attempts.recv().await.unwrap());
        }

        assert_eq!(gaps(&times), vec![1, 2, 4, 8, 16, 30, 30]);
        client.shutdown().await;
        assert_eq!(client.state(), SocketState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_resets_after_successful_open() {
        let (connection, peer) = pipe();
        let (transport, mut attempts) = ScriptedTransport::new(vec![
            Outcome::Fail,
            Outcome::Fail,
            Outcome::Open(connection),
        ]);
        let (handler, mut events) = Recorder::new(None);
        let client = scripted_client(transport, handler);

        client.connect();
        let mut times = Vec::new();
        for _ in 0..3 {
            times.push(attempts.recv().await.unwrap());
        }
        wait_for(&mut events, "open").await;
        assert_eq!(client.state(), SocketState::Open);

        // Server goes away
        drop(peer);
        wait_for(&mut events, "close").await;

        for _ in 0..2 {
            times.push(attempts.recv().await.unwrap());
        }
        assert_eq!(gaps(&times), vec![1, 2, 1, 2]);
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_runs_only_while_open() {
        let (connection, mut peer) = pipe();
        let (transport, _attempts) = ScriptedTransport::new(vec![Outcome::Open(connection)]);
        let (handler, mut events) = Recorder::new(Some("call_not_read"));
        let client = scripted_client(transport, handler);

        client.connect();
        assert_eq!(peer.from_client.next().await.as_deref(), Some("call_not_read"));
        let opened = Instant::now();

        assert_eq!(
            peer.from_client.next().await.as_deref(),
            Some(client::HEARTBEAT_PAYLOAD)
        );
        assert_eq!(opened.elapsed(), Duration::from_secs(25));
        assert_eq!(
            peer.from_client.next().await.as_deref(),
            Some(r#"{"kind":"ping"}"#)
        );
        assert_eq!(opened.elapsed(), Duration::from_secs(50));

        peer.to_client.unbounded_send(Ok("hello".to_string())).unwrap();
        wait_for(&mut events, "message:hello").await;

        // Closing the connection stops the heartbeat along with the sink
        peer.to_client.close_channel();
        wait_for(&mut events, "close").await;
        assert_eq!(peer.from_client.next().await, None);

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_does_not_close_connection() {
        let (connection, peer) = pipe();
        let (transport, mut attempts) = ScriptedTransport::new(vec![Outcome::Open(connection)]);
        let (handler, mut events) = Recorder::new(None);
        let client = scripted_client(transport, handler);

        client.connect();
        wait_for(&mut events, "open").await;
        attempts.recv().await.unwrap();

        peer.to_client
            .unbounded_send(Err(SocketError::Protocol("bad frame".to_string())))
            .unwrap();
        wait_for(&mut events, "error").await;
        peer.to_client.unbounded_send(Ok("still here".to_string())).unwrap();
        wait_for(&mut events, "message:still here").await;

        assert_eq!(client.state(), SocketState::Open);
        assert!(attempts.try_recv().is_err());
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent_and_teardown_repeatable() {
        let (connection, mut peer) = pipe();
        let (transport, mut attempts) = ScriptedTransport::new(vec![Outcome::Open(connection)]);
        let (handler, mut events) = Recorder::new(None);
        let client = scripted_client(transport, handler);

        client.connect();
        client.connect();
        wait_for(&mut events, "open").await;
        client.connect();

        attempts.recv().await.unwrap();
        assert!(attempts.try_recv().is_err());

        client.teardown();
        client.teardown();
        // The live connection is closed from our side
        assert_eq!(peer.from_client.next().await, None);
        client
            .subscribe()
            .wait_for(|state| *state == SocketState::Stopped)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_during_backoff_retries_immediately() {
        let (transport, mut attempts) = ScriptedTransport::new(vec![]);
        let (handler, _events) = Recorder::new(None);
        let client = scripted_client(transport, handler);

        client.connect();
        let mut times = vec![attempts.recv().await.unwrap()];
        client
            .subscribe()
            .wait_for(|state| *state == SocketState::Closed)
            .await
            .unwrap();

        client.connect();
        times.push(attempts.recv().await.unwrap());
        // Backoff keeps growing after the skipped wait
        times.push(attempts.recv().await.unwrap());

        assert_eq!(gaps(&times), vec![0, 2]);
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_reconnect() {
        let (transport, mut attempts) = ScriptedTransport::new(vec![]);
        let (handler, _events) = Recorder::new(None);
        let client = scripted_client(transport, handler);

        client.connect();
        attempts.recv().await.unwrap();
        client.teardown();

        sleep(Duration::from_secs(120)).await;
        assert!(attempts.try_recv().is_err());
        assert_eq!(client.state(), SocketState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_mount_keeps_connection() {
        let (connection, _peer) = pipe();
        let (transport, mut attempts) = ScriptedTransport::new(vec![Outcome::Open(connection)]);
        let (handler, mut events) = Recorder::new(None);
        let client = Arc::new(scripted_client(transport, handler));
        let mount = SocketMount::new(client.clone());

        // Setup, immediate cleanup, setup again
        let first = mount.setup();
        mount.release(first);
        let second = mount.setup();
        assert!(!mount.is_current(first));

        wait_for(&mut events, "open").await;
        sleep(Duration::from_secs(1)).await;
        assert_eq!(client.state(), SocketState::Open);
        attempts.recv().await.unwrap();
        assert!(attempts.try_recv().is_err());

        // A stale release never tears down the live mount
        mount.release(first);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(client.state(), SocketState::Open);

        mount.release(second);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(client.state(), SocketState::Stopped);
    }

    #[tokio::test]
    async fn test_tungstenite_transport_round_trip() {
        use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
        use axum::response::IntoResponse;
        use axum::routing::get;
        use axum::Router;

        async fn upgrade(ws: WebSocketUpgrade) -> impl IntoResponse {
            ws.on_upgrade(|mut socket: WebSocket| async move {
                while let Some(Ok(Message::Text(text))) = socket.recv().await {
                    if text == "call_not_read" {
                        let reply = r#"[{"id":"a1","user_id":"u1","type":"middle"}]"#;
                        if socket.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
            })
        }

        let base = crate::test_support::serve(Router::new().route("/ws", get(upgrade))).await;
        let url = format!("{}/ws", base.replacen("http", "ws", 1));

        let (handler, mut events) = Recorder::new(Some("call_not_read"));
        let client = SocketClient::new(
            SocketOptions::new(url),
            Arc::new(TungsteniteTransport),
            handler,
        );
        client.connect();

        let expected = r#"message:[{"id":"a1","user_id":"u1","type":"middle"}]"#;
        tokio::time::timeout(Duration::from_secs(5), wait_for(&mut events, expected))
            .await
            .expect("reply over a real socket");
        assert_eq!(client.state(), SocketState::Open);
        client.shutdown().await;
    }
}
