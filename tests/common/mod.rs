//! Local stand-in for the provider's HTTP API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Header, Response, Server};

pub const DOMAIN: &str = "mg.example.com";
pub const API_KEY: &str = "key-test";
/// `Basic base64("api:key-test")`
pub const EXPECTED_AUTH: &str = "Basic YXBpOmtleS10ZXN0";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: &'static str,
    body: String,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;

pub struct MockProvider {
    pub base: String,
    routes: Routes,
    requests: Arc<Mutex<Vec<Recorded>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockProvider {
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind mock provider");
        let base = format!("http://{}", server.server_addr());

        let routes: Routes = Arc::default();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let stop = Arc::new(AtomicBool::new(false));

        let (r, q, s) = (routes.clone(), requests.clone(), stop.clone());
        let handle = thread::spawn(move || {
            while !s.load(Ordering::SeqCst) {
                let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(20)) else {
                    continue;
                };

                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv(name))
                        .map(|h| h.value.as_str().to_string())
                };
                q.lock().unwrap().push(Recorded {
                    url: request.url().to_string(),
                    authorization: header("Authorization"),
                    accept: header("Accept"),
                });

                let path = request.url().split('?').next().unwrap_or("").to_string();
                let route = r.lock().unwrap().get(&path).cloned().unwrap_or(Route {
                    status: 404,
                    content_type: "text/plain",
                    body: "not found".into(),
                });

                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], route.content_type.as_bytes()).unwrap();
                let _ = request.respond(
                    Response::from_string(route.body)
                        .with_status_code(route.status)
                        .with_header(content_type),
                );
            }
        });

        Self {
            base,
            routes,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    /// Versioned API root to hand to `EventLogClient::with_base`.
    pub fn api_base(&self) -> String {
        format!("{}/v3/", self.base)
    }

    pub fn events_path() -> String {
        format!("/v3/{DOMAIN}/events")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn route(&self, path: &str, status: u16, content_type: &'static str, body: impl Into<String>) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                content_type,
                body: body.into(),
            },
        );
    }

    pub fn json(&self, path: &str, body: serde_json::Value) {
        self.route(path, 200, "application/json", body.to_string());
    }

    /// Serve a page of events at `path`, pointing to `next`/`last` cursors.
    pub fn page(&self, path: &str, events: &[(f64, &str)], next: &str, last: &str) {
        let items: Vec<_> = events
            .iter()
            .map(|(ts, storage)| {
                serde_json::json!({
                    "event": "stored",
                    "timestamp": ts,
                    "storage": { "url": self.url(storage), "key": storage },
                })
            })
            .collect();
        self.json(
            path,
            serde_json::json!({
                "items": items,
                "paging": { "next": self.url(next), "last": self.url(last) },
            }),
        );
    }

    /// Serve a stored message payload at `path`.
    pub fn message(&self, path: &str, message_id: &str, subject: &str) {
        let mime = format!("Message-Id: {message_id}\r\nSubject: {subject}\r\n\r\nbody of {message_id}\r\n");
        self.json(
            path,
            serde_json::json!({
                "Message-Id": message_id,
                "subject": subject,
                "body-mime": mime,
            }),
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
