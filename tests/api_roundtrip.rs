use anyhow::Result;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use drill_counter::api::{ApiConfig, ApiHandle, ApiServer};
use drill_counter::DrillEngine;

struct TestApi {
    api_handle: Option<ApiHandle>,
}

impl TestApi {
    fn new() -> Result<Self> {
        let api_config = ApiConfig {
            addr: "127.0.0.1:0".to_string(),
            ..ApiConfig::default()
        };
        let engine = Arc::new(DrillEngine::default());
        let api_handle = ApiServer::new(api_config, engine).spawn()?;
        Ok(Self {
            api_handle: Some(api_handle),
        })
    }

    fn request(&self, method: &str, path: &str, body: Option<&Value>) -> Result<(u16, Value)> {
        let addr = self.api_handle.as_ref().unwrap().addr;
        let mut stream = TcpStream::connect(addr)?;
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes())?;
        let (headers, body) = read_response(&mut stream)?;
        let status = headers
            .split_whitespace()
            .nth(1)
            .unwrap_or("0")
            .parse()?;
        Ok((status, serde_json::from_str(&body)?))
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        if let Some(handle) = self.api_handle.take() {
            handle.stop().expect("stop api");
        }
    }
}

fn read_response(stream: &mut TcpStream) -> Result<(String, String)> {
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    let mut parts = response.splitn(2, "\r\n\r\n");
    let headers = parts.next().unwrap_or("").to_string();
    let body = parts.next().unwrap_or("").to_string();
    Ok((headers, body))
}

fn frame(frame_index: u64, ball_x: f64) -> Value {
    json!({
        "drill_type": "push_pull",
        "frame_index": frame_index,
        "detection": { "ball": [ball_x, 0.5, 0.1, 0.1] },
        "pose": { "l_ankle": [0.5, 0.45], "r_ankle": [0.7, 0.8] }
    })
}

#[test]
fn health_check() -> Result<()> {
    let api = TestApi::new()?;
    let (status, body) = api.request("GET", "/health", None)?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[test]
fn frames_are_evaluated_once_both_halves_arrive() -> Result<()> {
    let api = TestApi::new()?;

    let pose_only = json!({
        "drill_type": "push_pull",
        "frame_index": 0,
        "pose": { "l_ankle": [0.5, 0.45], "r_ankle": [0.7, 0.8] }
    });
    let (status, body) = api.request("POST", "/sessions/court-1/frames", Some(&pose_only))?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "pending");

    let ball_only = json!({
        "drill_type": "push_pull",
        "frame_index": 0,
        "detection": { "ball": { "x": 0.5, "y": 0.5, "w": 0.1, "h": 0.1 } }
    });
    let (_, body) = api.request("POST", "/sessions/court-1/frames", Some(&ball_only))?;
    assert_eq!(body["status"], "evaluated");
    assert_eq!(body["triggered"], false);

    let (_, body) = api.request("POST", "/sessions/court-1/frames", Some(&frame(1, 0.52)))?;
    assert_eq!(body["triggered"], true);
    assert_eq!(body["count"], 0);

    let (_, body) = api.request("POST", "/sessions/court-1/frames", Some(&frame(14, 0.48)))?;
    assert_eq!(body["triggered"], true);
    assert_eq!(body["count"], 1);

    let (status, summary) = api.request("GET", "/sessions/court-1", None)?;
    assert_eq!(status, 200);
    assert_eq!(summary["drill"], "push_pull");
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["frames_evaluated"], 3);

    let (status, body) = api.request("DELETE", "/sessions/court-1", None)?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ended");
    let (status, _) = api.request("GET", "/sessions/court-1", None)?;
    assert_eq!(status, 404);
    Ok(())
}

#[test]
fn late_frame_is_reported_stale() -> Result<()> {
    let api = TestApi::new()?;
    let ball_only = json!({
        "drill_type": "push_pull",
        "frame_index": 1,
        "detection": { "ball": [0.55, 0.5, 0.1, 0.1] }
    });
    let (_, body) = api.request("POST", "/sessions/late/frames", Some(&ball_only))?;
    assert_eq!(body["status"], "pending");
    let (_, body) = api.request("POST", "/sessions/late/frames", Some(&frame(2, 0.5)))?;
    assert_eq!(body["status"], "evaluated");

    let (status, body) = api.request("POST", "/sessions/late/frames", Some(&frame(1, 0.55)))?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "stale");
    assert_eq!(body["triggered"], false);

    let (_, summary) = api.request("GET", "/sessions/late", None)?;
    assert_eq!(summary["frames_evaluated"], 1);
    assert_eq!(summary["pending_frames"], 0);
    Ok(())
}

#[test]
fn unknown_drill_is_ignored() -> Result<()> {
    let api = TestApi::new()?;
    let body = json!({ "drill_type": "elastico", "frame_index": 0 });
    let (status, body) = api.request("POST", "/sessions/s1/frames", Some(&body))?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["count"], 0);
    Ok(())
}

#[test]
fn rejects_bad_requests() -> Result<()> {
    let api = TestApi::new()?;

    let (status, body) = api.request(
        "POST",
        "/sessions/s1/frames",
        Some(&json!({ "frame_index": "zero" })),
    )?;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_body");

    let (status, body) = api.request("POST", "/sessions/bad.id/frames", Some(&frame(0, 0.5)))?;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_session_id");

    let (status, _) = api.request("POST", "/health", None)?;
    assert_eq!(status, 405);

    let (status, _) = api.request("GET", "/events", None)?;
    assert_eq!(status, 404);
    Ok(())
}
