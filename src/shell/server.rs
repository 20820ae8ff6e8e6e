//! TCP command shell
//!
//! - TCP on 127.0.0.1 only
//! - One shell command per line, one JSON reply per line
//! - Any number of connections, commands are run one at a time
//!
//! Connections are served on tokio. Every line is forwarded over a channel
//! to the thread that owns the controller (`run_controller`), so the
//! blocking exchange never runs on the async runtime.

use super::ShellSession;
use crate::controller::{Clock, TrackController};
use crate::error::{TrackError, Result};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// One line waiting for the controller thread
pub struct ShellRequest {
    pub line: String,
    pub reply: oneshot::Sender<Response>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub message: Option<String>,
}

impl Response {
    fn ok(message: String) -> Self {
        Self {
            ok: true,
            message: Some(message),
        }
    }

    fn error(message: String) -> Self {
        Self {
            ok: false,
            message: Some(message),
        }
    }
}

pub async fn bind_listener(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    TcpListener::bind(addr)
        .await
        .map_err(|e| TrackError::ShellBind { port, source: e })
}

pub async fn run_server_with_listener(
    listener: TcpListener,
    requests: mpsc::Sender<ShellRequest>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Shell listening on {}", addr);
    }

    while !shutdown.load(Ordering::Relaxed) {
        let accept = tokio::time::timeout(Duration::from_millis(250), listener.accept()).await;

        let Ok(Ok((stream, peer))) = accept else {
            continue;
        };

        debug!("Shell client {} connected", peer);
        let tx = requests.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, tx).await {
                debug!("Shell client {}: {}", peer, e);
            }
        });
    }

    Ok(())
}

async fn handle_connection(stream: TcpStream, requests: mpsc::Sender<ShellRequest>) -> Result<()> {
    let protocol_err = |e: std::io::Error| TrackError::ShellProtocol {
        message: e.to_string(),
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await.map_err(protocol_err)? {
        if line.trim().is_empty() {
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        requests
            .send(ShellRequest {
                line,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TrackError::ShellProtocol {
                message: "controller stopped".to_string(),
            })?;

        let response = reply_rx.await.unwrap_or_else(|_| {
            Response::error("controller stopped".to_string())
        });

        let mut out = serde_json::to_vec(&response).map_err(|e| TrackError::ShellProtocol {
            message: e.to_string(),
        })?;
        out.push(b'\n');
        writer.write_all(&out).await.map_err(protocol_err)?;
    }

    Ok(())
}

/// Serve shell requests until every sender is gone
///
/// Runs on the thread that owns the controller; blocks between requests.
pub fn run_controller<T: Transport, C: Clock>(
    controller: &mut TrackController<T, C>,
    mut requests: mpsc::Receiver<ShellRequest>,
) {
    let mut session = ShellSession::new();
    while let Some(request) = requests.blocking_recv() {
        let response = match session.handle_line(controller, &request.line) {
            Ok(Some(message)) => Response::ok(message),
            Ok(None) => Response::error(format!(
                "unrecognized command: {}",
                request.line.trim()
            )),
            Err(e) => Response::error(e.to_string()),
        };
        let _ = request.reply.send(response);
    }
}

/// Send one line to a running shell server and wait for the reply
pub fn send_command_blocking(port: u16, line: &str, timeout: Duration) -> Result<Response> {
    use std::io::{BufRead, Write};

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let connect_err = |e: std::io::Error| TrackError::ShellProtocol {
        message: format!("port {}: {}", port, e),
    };

    let mut stream = std::net::TcpStream::connect_timeout(&addr, timeout).map_err(connect_err)?;
    stream.set_read_timeout(Some(timeout)).map_err(connect_err)?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(connect_err)?;

    stream.write_all(line.as_bytes()).map_err(connect_err)?;
    stream.write_all(b"\n").map_err(connect_err)?;
    stream.flush().map_err(connect_err)?;

    let mut out = String::new();
    std::io::BufReader::new(stream)
        .read_line(&mut out)
        .map_err(connect_err)?;

    serde_json::from_str(out.trim()).map_err(|e| TrackError::ShellProtocol {
        message: format!("invalid response: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::constants::LOOPBACK_CAPACITY;
    use crate::transport::LoopbackTransport;

    #[test]
    fn test_response_json_shape() {
        let json = serde_json::to_string(&Response::ok("power on".into())).unwrap();
        assert_eq!(json, r#"{"ok":true,"message":"power on"}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_server_roundtrip() {
        let listener = bind_listener(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (tx, rx) = mpsc::channel(8);
        let controller_thread = std::thread::spawn(move || {
            let config = ControllerConfig {
                hash: 0xDF24,
                timeout_ms: 20,
                ..ControllerConfig::default()
            };
            let mut controller =
                TrackController::new(LoopbackTransport::silent(LOOPBACK_CAPACITY), &config);
            run_controller(&mut controller, rx);
        });

        let shutdown = Arc::new(AtomicBool::new(false));
        let server = tokio::spawn(run_server_with_listener(listener, tx, shutdown.clone()));

        let replies = tokio::task::spawn_blocking(move || {
            let timeout = Duration::from_secs(2);
            vec![
                send_command_blocking(port, "send 0000   18 0", timeout).unwrap(),
                send_command_blocking(port, "speed 1 10", timeout).unwrap(),
                send_command_blocking(port, "jump", timeout).unwrap(),
            ]
        })
        .await
        .unwrap();

        assert_eq!(replies[0], Response::ok("DF24   18 0".into()));
        assert!(!replies[1].ok);
        assert!(replies[1].message.as_deref().unwrap().contains("No response"));
        assert!(!replies[2].ok);

        shutdown.store(true, Ordering::SeqCst);
        server.await.unwrap().unwrap();
        controller_thread.join().unwrap();
    }
}
