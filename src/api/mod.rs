//! Measurement API.
//!
//! A small HTTP/1.1 server over `std::net`. Perception workers post each
//! frame's measurement halves here and get the drill result back once both
//! halves of the frame have arrived.
//!
//! Requests are served one at a time from a single background thread. The
//! same thread periodically expires half-frames whose partner never came and
//! sessions that stopped sending.

use crate::engine::{DrillEngine, FrameOutcome};
use crate::sample::{DetectionHalf, Pose};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const MAX_HEADER_BYTES: usize = 8192;
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    /// How often stale half-frames are swept.
    pub expire_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8800".to_string(),
            expire_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

/// Body of `POST /sessions/{id}/frames`.
#[derive(Debug, Deserialize)]
struct FrameRequest {
    drill_type: String,
    frame_index: u64,
    #[serde(default)]
    detection: Option<DetectionHalf>,
    #[serde(default)]
    pose: Option<Pose>,
}

pub struct ApiServer {
    cfg: ApiConfig,
    engine: Arc<DrillEngine>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, engine: Arc<DrillEngine>) -> Self {
        Self { cfg, engine }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "api configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg.clone();
        let engine = self.engine;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, cfg, engine, shutdown_thread) {
                log::error!("measurement api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    cfg: ApiConfig,
    engine: Arc<DrillEngine>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut last_sweep = Instant::now();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if last_sweep.elapsed() >= cfg.expire_interval {
            last_sweep = Instant::now();
            match engine.expire_stale(last_sweep) {
                Ok(0) => {}
                Ok(dropped) => log::debug!("expired {} stale half-frames", dropped),
                Err(err) => log::warn!("stale frame sweep failed: {}", err),
            }
            if let Err(err) = engine.expire_idle_sessions(last_sweep) {
                log::warn!("idle session sweep failed: {}", err);
            }
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &engine) {
                    log::warn!("measurement api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, engine: &DrillEngine) -> Result<()> {
    stream.set_nonblocking(false)?;
    let peer = stream.peer_addr()?;
    let local = stream.local_addr()?;
    if local.ip().is_loopback() && !peer.ip().is_loopback() {
        write_json_response(&mut stream, 403, r#"{"error":"forbidden"}"#)?;
        return Ok(());
    }

    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            write_json_response(&mut stream, 400, r#"{"error":"bad_request"}"#)?;
            return Err(err);
        }
    };

    let segments: Vec<&str> = request
        .path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        ("GET", ["sessions", session_id]) => get_session(&mut stream, engine, session_id),
        ("DELETE", ["sessions", session_id]) => end_session(&mut stream, engine, session_id),
        ("POST", ["sessions", session_id, "frames"]) => {
            post_frame(&mut stream, engine, session_id, &request.body)
        }
        (_, ["health"]) | (_, ["sessions", _]) | (_, ["sessions", _, "frames"]) => {
            write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)
        }
        _ => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
    }
}

fn post_frame(
    stream: &mut TcpStream,
    engine: &DrillEngine,
    session_id: &str,
    body: &[u8],
) -> Result<()> {
    let frame: FrameRequest = match serde_json::from_slice(body) {
        Ok(frame) => frame,
        Err(err) => {
            write_json_response(stream, 400, r#"{"error":"invalid_body"}"#)?;
            return Err(anyhow!("invalid frame body: {}", err));
        }
    };
    if crate::engine::validate_session_id(session_id).is_err() {
        return write_json_response(stream, 400, r#"{"error":"invalid_session_id"}"#);
    }

    let outcome = match engine.submit(
        session_id,
        &frame.drill_type,
        frame.frame_index,
        frame.detection,
        frame.pose,
    ) {
        Ok(outcome) => outcome,
        Err(err) => {
            write_json_response(stream, 500, r#"{"error":"internal"}"#)?;
            return Err(err);
        }
    };
    let payload = match outcome {
        FrameOutcome::Pending => json!({ "status": "pending" }),
        FrameOutcome::Stale => json!({ "status": "stale", "count": 0, "triggered": false }),
        FrameOutcome::UnknownDrill => {
            json!({ "status": "ignored", "count": 0, "triggered": false })
        }
        FrameOutcome::Evaluated(result) => json!({
            "status": "evaluated",
            "count": result.count,
            "triggered": result.triggered,
        }),
    };
    write_response(stream, 200, "application/json", &serde_json::to_vec(&payload)?)
}

fn get_session(stream: &mut TcpStream, engine: &DrillEngine, session_id: &str) -> Result<()> {
    match engine.summary(session_id) {
        Ok(Some(summary)) => {
            write_response(stream, 200, "application/json", &serde_json::to_vec(&summary)?)
        }
        Ok(None) => write_json_response(stream, 404, r#"{"error":"unknown_session"}"#),
        Err(_) => write_json_response(stream, 400, r#"{"error":"invalid_session_id"}"#),
    }
}

fn end_session(stream: &mut TcpStream, engine: &DrillEngine, session_id: &str) -> Result<()> {
    match engine.end_session(session_id) {
        Ok(true) => write_json_response(stream, 200, r#"{"status":"ended"}"#),
        Ok(false) => write_json_response(stream, 404, r#"{"error":"unknown_session"}"#),
        Err(_) => write_json_response(stream, 400, r#"{"error":"invalid_session_id"}"#),
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request headers too large"));
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of headers"));
        }
        data.extend_from_slice(&buf[..n]);
    };

    let text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid content-length"))?,
        None => 0,
    };
    if content_length > MAX_BODY_BYTES {
        return Err(anyhow!("request body too large"));
    }
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of body"));
        }
        data.extend_from_slice(&buf[..n]);
    }

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body: data[header_end..header_end + content_length].to_vec(),
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        403 => "HTTP/1.1 403 Forbidden",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}
