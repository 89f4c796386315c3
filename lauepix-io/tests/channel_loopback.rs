//! Channel client against an in-process WebSocket server.

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::channel;
use std::thread;
use std::time::Duration;

use lauepix_core::{Command, Error, Inbound, Stage, Transport};
use lauepix_io::{ChannelClient, ChannelConfig, ChannelEvent};
use serde_json::{json, Value};
use tungstenite::{accept, Message, WebSocket};

const TIMEOUT: Duration = Duration::from_secs(5);

fn config(port: u16, reconnect_ms: u64) -> ChannelConfig {
    ChannelConfig::new(format!("ws://127.0.0.1:{port}/"))
        .with_reconnect_delay(Duration::from_millis(reconnect_ms))
        .with_poll_interval(Duration::from_millis(10))
}

fn serve(listener: &TcpListener) -> WebSocket<TcpStream> {
    let (stream, _) = listener.accept().unwrap();
    let Ok(socket) = accept(stream) else {
        panic!("websocket handshake failed");
    };
    socket
}

fn read_json(socket: &mut WebSocket<TcpStream>) -> Value {
    loop {
        if let Message::Text(text) = socket.read().unwrap() {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[test]
fn test_registers_pumps_and_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let mut socket = serve(&listener);
        let hello = read_json(&mut socket);
        socket
            .send(Message::Text(
                json!({"channel": "rlv", "command": "update_import_log", "log": "elsewhere"})
                    .to_string(),
            ))
            .unwrap();
        socket
            .send(Message::Text(
                json!({"channel": "gui", "command": "update_import_log", "log": "reading"})
                    .to_string(),
            ))
            .unwrap();
        let cancel = read_json(&mut socket);
        drop(socket);

        let mut socket = serve(&listener);
        let hello_again = read_json(&mut socket);
        (hello, cancel, hello_again)
    });

    let (tx, rx) = channel();
    let client = ChannelClient::spawn(config(port, 300), tx).unwrap();

    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), ChannelEvent::Connected);
    let ChannelEvent::Message(inbound) = rx.recv_timeout(TIMEOUT).unwrap() else {
        panic!("expected a message");
    };
    let Inbound::StageLog(log) = *inbound else {
        panic!("expected a stage log");
    };
    assert_eq!(log.stage, Stage::Import);
    assert_eq!(log.log, "reading");

    client
        .handle()
        .send(&Command::CancelActiveTask.to_message())
        .unwrap();

    assert!(matches!(
        rx.recv_timeout(TIMEOUT).unwrap(),
        ChannelEvent::Disconnected(_)
    ));
    assert!(matches!(
        client.handle().send(&Command::CancelActiveTask.to_message()),
        Err(Error::NotConnected)
    ));
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), ChannelEvent::Connected);

    let (hello, cancel, hello_again) = server.join().unwrap();
    let registration = json!({"channel": "server", "command": "record_connection", "id": "gui"});
    assert_eq!(hello, registration);
    assert_eq!(hello_again, registration);
    assert_eq!(cancel, json!({"channel": "server", "command": "cancel_active_task"}));
}

#[test]
fn test_unreachable_backend_keeps_retrying() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let (tx, rx) = channel();
    let mut client = ChannelClient::spawn(config(port, 20), tx).unwrap();

    for _ in 0..3 {
        assert!(matches!(
            rx.recv_timeout(TIMEOUT).unwrap(),
            ChannelEvent::ConnectFailed(_)
        ));
    }
    assert!(!client.is_connected());

    client.shutdown();
    assert!(client
        .handle()
        .send(&Command::StorePlannerReflections.to_message())
        .is_err());
}

#[test]
fn test_frames_sent_before_drop_are_delivered() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let mut socket = serve(&listener);
        let mut received = Vec::new();
        while let Ok(message) = socket.read() {
            match message {
                Message::Text(text) => received.push(serde_json::from_str::<Value>(&text).unwrap()),
                Message::Close(_) => break,
                _ => {}
            }
        }
        received
    });

    let (tx, rx) = channel::<ChannelEvent>();
    let client = ChannelClient::spawn(config(port, 300), tx).unwrap();
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), ChannelEvent::Connected);

    client
        .handle()
        .send(&Command::CancelActiveTask.to_message())
        .unwrap();
    drop(client);

    let received = server.join().unwrap();
    assert_eq!(
        received.last(),
        Some(&json!({"channel": "server", "command": "cancel_active_task"}))
    );
}
