#![allow(dead_code)]

use anyhow::Result;
use chart_analyst::config;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

pub const BOT_TOKEN: &str = "123456:test-bot-token";
pub const CHAT_ID: &str = "-1001234567890";
pub const CHART_PATH: &str = "/v2/tradingview/advanced-chart/storage";
pub const IMAGE_PATH: &str = "/img/chart.png";
pub const CHAT_PATH: &str = "/chat/completions";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nstub-image";
pub const SAMPLE_REPORT: &str = "【技術分析報告】\n幣種代號：BTCUSDT\n趨勢判斷：偏多";

pub fn ensure_test_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn send_photo_path() -> String {
    format!("/bot{}/sendPhoto", BOT_TOKEN)
}

pub fn send_message_path() -> String {
    format!("/bot{}/sendMessage", BOT_TOKEN)
}

#[derive(Clone)]
pub struct CannedResponse {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
    pub truncated: bool,
}

impl CannedResponse {
    pub fn json(status: &'static str, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into_bytes(),
            delay: None,
            truncated: false,
        }
    }

    pub fn png(bytes: &[u8]) -> Self {
        Self {
            status: "200 OK",
            content_type: "image/png",
            body: bytes.to_vec(),
            delay: None,
            truncated: false,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Advertises a longer body than is sent, then closes the connection.
    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn form_value(&self, key: &str) -> Option<String> {
        self.body.split('&').find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            (decode_form_component(name) == key).then(|| decode_form_component(value))
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Minimal HTTP/1.1 server standing in for the chart service, the model
/// endpoint and the bot API. Every request is recorded in arrival order.
pub struct ServiceStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ServiceStub {
    pub fn start<F>(routes: F) -> Result<Self>
    where
        F: FnOnce(&str) -> HashMap<String, CannedResponse>,
    {
        let mut listener: Option<TcpListener> = None;
        for _ in 0..64 {
            let port = fastrand::u16(40_000..60_000);
            if let Ok(bound) = TcpListener::bind(("127.0.0.1", port)) {
                listener = Some(bound);
                break;
            }
        }
        let listener = match listener {
            Some(listener) => listener,
            None => TcpListener::bind("127.0.0.1:0")?,
        };
        listener.set_nonblocking(true)?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let routes = Arc::new(routes(&base_url));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown, shutdown_rx) = mpsc::channel();

        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    let _ = stream.set_nonblocking(false);
                    // One thread per connection so a delayed route does not
                    // hold up the requests that follow it.
                    let routes = Arc::clone(&routes);
                    let recorded = Arc::clone(&recorded);
                    thread::spawn(move || {
                        let _ = handle_request(stream, &routes, &recorded);
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => {
                    thread::sleep(Duration::from_millis(10));
                }
            }
        });

        Ok(Self {
            base_url,
            requests,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }

    pub fn find(&self, path: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().find(|request| request.path == path)
    }
}

impl Drop for ServiceStub {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_request(
    mut stream: TcpStream,
    routes: &HashMap<String, CannedResponse>,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line)? == 0 {
        return Ok(());
    }

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(());
    }
    let method = parts[0].to_string();
    let path = parts[1].split('?').next().unwrap_or(parts[1]).to_string();

    let mut headers = HashMap::new();
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header == "\r\n" {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    if let Ok(mut log) = recorded.lock() {
        log.push(RecordedRequest {
            method,
            path: path.clone(),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    match routes.get(&path) {
        Some(response) => {
            if let Some(delay) = response.delay {
                thread::sleep(delay);
            }
            write_response(&mut stream, response)
        }
        None => write_response(
            &mut stream,
            &CannedResponse::json("404 Not Found", "{}".to_string()),
        ),
    }
}

fn write_response(stream: &mut TcpStream, response: &CannedResponse) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        if response.truncated {
            response.body.len() + 64
        } else {
            response.body.len()
        }
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

pub fn decode_form_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'+' => out.push(b' '),
            b'%' if idx + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[idx + 1..idx + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(value) => {
                        out.push(value);
                        idx += 2;
                    }
                    Err(_) => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn chart_ok(base_url: &str) -> CannedResponse {
    CannedResponse::json(
        "200 OK",
        serde_json::json!({ "url": format!("{}{}", base_url, IMAGE_PATH), "size": 1024 })
            .to_string(),
    )
}

pub fn completion_ok(text: &str) -> CannedResponse {
    CannedResponse::json(
        "200 OK",
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
        })
        .to_string(),
    )
}

pub fn telegram_ok() -> CannedResponse {
    CannedResponse::json("200 OK", r#"{"ok":true,"result":{}}"#.to_string())
}

pub fn telegram_error() -> CannedResponse {
    CannedResponse::json(
        "400 Bad Request",
        r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#
            .to_string(),
    )
}

/// Every route answering successfully; tests replace individual entries.
pub fn happy_routes(base_url: &str) -> HashMap<String, CannedResponse> {
    HashMap::from([
        (CHART_PATH.to_string(), chart_ok(base_url)),
        (IMAGE_PATH.to_string(), CannedResponse::png(PNG_BYTES)),
        (CHAT_PATH.to_string(), completion_ok(SAMPLE_REPORT)),
        (send_photo_path(), telegram_ok()),
        (send_message_path(), telegram_ok()),
    ])
}

pub fn temp_chart_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "chart-analyst-{}-{}-{}.png",
        name,
        std::process::id(),
        fastrand::u32(..)
    ))
}

pub fn settings_for(base_url: &str, output: &PathBuf) -> HashMap<String, String> {
    HashMap::from([
        (config::CHART_IMG_API_KEY.to_string(), "chart-key".to_string()),
        (config::TELEGRAM_BOT_TOKEN.to_string(), BOT_TOKEN.to_string()),
        (config::TELEGRAM_CHAT_ID.to_string(), CHAT_ID.to_string()),
        (config::GH_TOKEN.to_string(), "ghp_test_token".to_string()),
        ("SYMBOL".to_string(), "BTCUSDT".to_string()),
        ("INTERVAL".to_string(), "4h".to_string()),
        ("CHART_IMG_API_URL".to_string(), base_url.to_string()),
        ("AI_API_BASE_URL".to_string(), base_url.to_string()),
        ("TELEGRAM_API_URL".to_string(), base_url.to_string()),
        (
            "CHART_OUTPUT_PATH".to_string(),
            output.to_string_lossy().into_owned(),
        ),
    ])
}

pub fn expected_stage_order() -> Vec<String> {
    vec![
        format!("POST {}", CHART_PATH),
        format!("GET {}", IMAGE_PATH),
        format!("POST {}", send_photo_path()),
        format!("POST {}", CHAT_PATH),
        format!("POST {}", send_message_path()),
    ]
}
