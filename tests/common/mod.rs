#![allow(dead_code)]

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Frames `body` the way the server does.
pub fn framed(body: &str) -> Vec<u8> {
    let mut out = b"ZBXD\x01".to_vec();
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(body.as_bytes());
    out
}

pub fn ack(info: &str) -> Vec<u8> {
    framed(&format!(r#"{{"response":"success","info":"{info}"}}"#))
}

/// Minimal trap server: answers each connection with the next canned reply
/// and keeps every request body it received.
pub struct FakeTrapServer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeTrapServer {
    pub async fn start(replies: Vec<Vec<u8>>) -> Self {
        Self::serve(replies.into_iter().map(|r| vec![r]).collect(), Duration::ZERO).await
    }

    /// Single connection whose reply is written piece by piece with `pause`
    /// between writes.
    pub async fn start_in_pieces(pieces: Vec<Vec<u8>>, pause: Duration) -> Self {
        Self::serve(vec![pieces], pause).await
    }

    async fn serve(replies: Vec<Vec<Vec<u8>>>, pause: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let handle = tokio::spawn(async move {
            for reply in replies {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };

                let mut header = [0u8; 13];
                if socket.read_exact(&mut header).await.is_err() {
                    continue;
                }
                let mut len_bytes = [0u8; 8];
                len_bytes.copy_from_slice(&header[5..13]);
                let mut body = vec![0u8; u64::from_le_bytes(len_bytes) as usize];
                if socket.read_exact(&mut body).await.is_err() {
                    continue;
                }
                seen.lock().push(String::from_utf8_lossy(&body).into_owned());

                for (index, piece) in reply.iter().enumerate() {
                    if index > 0 {
                        tokio::time::sleep(pause).await;
                    }
                    if socket.write_all(piece).await.is_err() {
                        break;
                    }
                    let _ = socket.flush().await;
                }
                let _ = socket.shutdown().await;
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for FakeTrapServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
