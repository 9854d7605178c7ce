use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::sync::config::SpotifyConfig;

/// One canned HTTP response, served once in connection order.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Received {
    pub order: usize,
    pub request_line: String,
    pub body: String,
}

/// Local HTTP/1.1 server answering each connection with the next `Reply`.
///
/// Every connection is handled on its own thread, so a slow reply does not
/// hold back later ones. Connections beyond the script get a 500.
pub struct StubServer {
    base: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl StubServer {
    pub fn start(script: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        thread::spawn(move || {
            for (order, stream) in listener.incoming().enumerate() {
                let Ok(stream) = stream else {
                    continue;
                };
                let reply = script
                    .get(order)
                    .cloned()
                    .unwrap_or_else(|| Reply::json(500, "{}"));
                let log = Arc::clone(&log);
                thread::spawn(move || serve(stream, order, &reply, &log));
            }
        });

        Self {
            base: format!("http://{addr}/v1"),
            received,
        }
    }

    /// Client settings pointing at this server.
    pub fn config(&self, request_timeout_secs: u64) -> SpotifyConfig {
        SpotifyConfig {
            api_base_url: self.base.clone(),
            request_timeout_secs,
            max_retries: 3,
            ..SpotifyConfig::default()
        }
    }

    /// Requests read so far, in connection order.
    pub fn received(&self) -> Vec<Received> {
        let mut got = self.received.lock().expect("stub log").clone();
        got.sort_by_key(|r| r.order);
        got
    }
}

fn serve(mut stream: TcpStream, order: usize, reply: &Reply, log: &Mutex<Vec<Received>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let Some((request_line, body)) = read_request(&mut stream) else {
        return;
    };
    log.lock().expect("stub log").push(Received {
        order,
        request_line,
        body,
    });

    thread::sleep(reply.delay);
    let mut head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(reply.body.as_bytes());
    let _ = stream.flush();
}

fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default().to_string();
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some((request_line, body))
}
