//! Loopback HTTP server standing in for the recognition service in tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub(crate) type Requests = Arc<Mutex<Vec<String>>>;

/// Answers every connection with the same canned response and records the raw requests.
pub(crate) async fn setup_test_server(status: u16, body: &'static str) -> (SocketAddr, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            respond(stream, status, body, &recorded).await;
        }
    });
    (addr, requests)
}

async fn respond(mut stream: TcpStream, status: u16, body: &str, recorded: &Requests) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        if request_complete(&raw) {
            break;
        }
    }

    // Recorded before answering so the client never observes a response first.
    recorded
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&raw).into_owned());

    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let headers = text[..header_end].to_ascii_lowercase();
    let body_len = raw.len() - (header_end + 4);
    match headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
    {
        Some(len) => body_len >= len.trim().parse::<usize>().unwrap(),
        None => text.ends_with("0\r\n\r\n"),
    }
}
