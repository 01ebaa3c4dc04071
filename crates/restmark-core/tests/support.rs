//! In-process HTTP fixture implementing the benchmark target contract.
//!
//! Hand-rolled on `std::net` so the test suite needs no server framework.
//! Every connection is handled on its own thread; responses always close
//! the connection.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How long each handler "works" before responding. Long enough that
/// requests overlap under concurrency, short enough to keep tests fast.
const HANDLER_DELAY: Duration = Duration::from_millis(3);

#[derive(Debug, Clone)]
pub struct Item {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

pub struct ServerState {
    items: Mutex<BTreeMap<i64, Item>>,
    next_id: AtomicI64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ServerState {
    fn new(seed: &[(&str, f64)]) -> Self {
        let mut items = BTreeMap::new();
        for (idx, (name, price)) in seed.iter().enumerate() {
            items.insert(
                idx as i64 + 1,
                Item {
                    name: (*name).to_string(),
                    description: Some("seed record".to_string()),
                    price: *price,
                },
            );
        }
        Self {
            next_id: AtomicI64::new(items.len() as i64 + 1),
            items: Mutex::new(items),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Highest number of simultaneously executing handlers observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub struct ContractServer {
    base_url: String,
    state: Arc<ServerState>,
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ContractServer {
    /// Spawn a fixture server with the given seed records.
    pub fn spawn(seed: &[(&str, f64)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture server");
        let addr = listener.local_addr().expect("fixture server addr");
        listener
            .set_nonblocking(true)
            .expect("set_nonblocking on fixture listener");

        let state = Arc::new(ServerState::new(seed));
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let accept_state = Arc::clone(&state);
        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    let state = Arc::clone(&accept_state);
                    thread::spawn(move || handle_client(stream, &state));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(1));
                }
                Err(_) => break,
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: shutdown_tx,
            thread: Some(handle),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

impl Drop for ContractServer {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

struct Request {
    method: String,
    path: String,
    body: String,
}

fn handle_client(mut stream: TcpStream, state: &ServerState) {
    let request = match read_request(&mut stream) {
        Some(request) => request,
        None => return,
    };

    state.in_flight.fetch_add(1, Ordering::SeqCst);
    let current = state.in_flight.load(Ordering::SeqCst);
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);
    thread::sleep(HANDLER_DELAY);

    let (status, body) = route(&request, state);

    // Leave the in-flight window before the client can observe completion,
    // so the gauge never over-counts relative to the client's ceiling.
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    write_response(&mut stream, status, &body);
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut raw = Vec::new();
    let mut buffer = [0u8; 2048];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buffer[..n]);
        if let Some(pos) = find_header_end(&raw) {
            break pos;
        }
        if raw.len() > 64 * 1024 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let content_length = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .next()
        .unwrap_or(0);

    let mut body_bytes = raw[header_end + 4..].to_vec();
    while body_bytes.len() < content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        body_bytes.extend_from_slice(&buffer[..n]);
    }
    body_bytes.truncate(content_length);

    Some(Request {
        method,
        path,
        body: String::from_utf8_lossy(&body_bytes).into_owned(),
    })
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

fn route(request: &Request, state: &ServerState) -> (u16, String) {
    let path = request.path.as_str();
    match (request.method.as_str(), path) {
        ("GET", "/") => (200, r#"{"message":"contract fixture"}"#.to_string()),
        ("GET", "/health") => (200, r#"{"status":"healthy"}"#.to_string()),
        ("POST", "/echo") => (200, request.body.clone()),
        ("GET", _) if path.starts_with("/echo/") => {
            let message = &path["/echo/".len()..];
            (200, format!(r#"{{"message":"{message}"}}"#))
        }
        ("GET", "/db/items") => (200, list_items(state)),
        ("GET", _) if path.starts_with("/db/items/") => get_item(path, state),
        ("POST", "/db/items") => create_item(&request.body, state),
        ("PUT", _) if path.starts_with("/db/items/") => update_item(path, &request.body, state),
        ("DELETE", _) if path.starts_with("/db/items/") => delete_item(path, state),
        ("GET", _) if path.starts_with("/stress/cpu/") => {
            let n: u64 = path["/stress/cpu/".len()..].parse().unwrap_or(0);
            (
                200,
                format!(r#"{{"iterations":{n},"result":{n},"processing_time_ms":0.1}}"#),
            )
        }
        ("GET", _) if path.starts_with("/stress/memory/") => {
            let mb: u64 = path["/stress/memory/".len()..].parse().unwrap_or(0);
            if mb > 100 {
                (400, r#"{"error":"requested allocation too large"}"#.to_string())
            } else {
                (200, format!(r#"{{"allocated_mb":{mb},"processing_time_ms":0.1}}"#))
            }
        }
        _ => (404, r#"{"error":"not found"}"#.to_string()),
    }
}

fn item_json(id: i64, item: &Item) -> String {
    let description = match &item.description {
        Some(d) => format!(r#""{d}""#),
        None => "null".to_string(),
    };
    format!(
        r#"{{"id":{id},"name":"{}","description":{description},"price":{},"created_at":"2026-01-01T00:00:00Z"}}"#,
        item.name, item.price
    )
}

fn list_items(state: &ServerState) -> String {
    let items = state.items.lock().unwrap();
    let rows: Vec<String> = items.iter().map(|(id, item)| item_json(*id, item)).collect();
    format!("[{}]", rows.join(","))
}

fn path_id(path: &str) -> Option<i64> {
    path.rsplit('/').next()?.parse().ok()
}

fn get_item(path: &str, state: &ServerState) -> (u16, String) {
    let Some(id) = path_id(path) else {
        return (404, r#"{"error":"invalid id"}"#.to_string());
    };
    let items = state.items.lock().unwrap();
    match items.get(&id) {
        Some(item) => (200, item_json(id, item)),
        None => (404, r#"{"error":"item not found"}"#.to_string()),
    }
}

fn parse_item(body: &str) -> Option<Item> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    Some(Item {
        name: value.get("name")?.as_str()?.to_string(),
        description: value
            .get("description")
            .and_then(|d| d.as_str())
            .map(str::to_string),
        price: value.get("price")?.as_f64()?,
    })
}

fn create_item(body: &str, state: &ServerState) -> (u16, String) {
    let Some(item) = parse_item(body) else {
        return (422, r#"{"error":"invalid item payload"}"#.to_string());
    };
    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let json = item_json(id, &item);
    state.items.lock().unwrap().insert(id, item);
    (201, json)
}

fn update_item(path: &str, body: &str, state: &ServerState) -> (u16, String) {
    let Some(id) = path_id(path) else {
        return (404, r#"{"error":"invalid id"}"#.to_string());
    };
    let Some(item) = parse_item(body) else {
        return (422, r#"{"error":"invalid item payload"}"#.to_string());
    };
    let mut items = state.items.lock().unwrap();
    if !items.contains_key(&id) {
        return (404, r#"{"error":"item not found"}"#.to_string());
    }
    let json = item_json(id, &item);
    items.insert(id, item);
    (200, json)
}

fn delete_item(path: &str, state: &ServerState) -> (u16, String) {
    let Some(id) = path_id(path) else {
        return (404, r#"{"error":"invalid id"}"#.to_string());
    };
    let mut items = state.items.lock().unwrap();
    match items.remove(&id) {
        Some(_) => (200, format!(r#"{{"deleted":{id}}}"#)),
        None => (404, r#"{"error":"item not found"}"#.to_string()),
    }
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    let _flush_result = stream.flush();
    drop(stream.shutdown(Shutdown::Both));
}
