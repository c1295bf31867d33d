use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use url::Url;

use crate::domain::event::{Event, Message, MessagePayload, Page, Paging, StoredMessage, Timestamp};
use crate::mail::error::ProviderError;

/// Basic-auth principal the provider expects alongside the API key.
const API_USER: &str = "api";

pub const DEFAULT_API_BASE: &str = "https://api.mailgun.net/v3/";

/// Anything that can produce the (event, message) sequence for an import run.
pub trait EventSource {
    fn stream(
        &self,
        begin: Timestamp,
        want_raw: bool,
    ) -> Result<Box<dyn Iterator<Item = StoredMessage> + '_>>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct EventLogClient {
    http: Client,
    api_top: Url,
    api_key: String,
    running: Option<Arc<AtomicBool>>,
}

impl EventLogClient {
    pub fn new(domain: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_base(DEFAULT_API_BASE, domain, api_key, None)
    }

    /// `base` is the versioned API root, e.g. `https://api.eu.mailgun.net/v3/`.
    ///
    /// `timeout` bounds each HTTP call; `None` lets a call wait indefinitely.
    pub fn with_base(
        base: &str,
        domain: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let domain = domain.into();

        let mut base = base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_top = Url::parse(&base)
            .and_then(|u| u.join(&format!("{domain}/")))
            .map_err(|e| anyhow!("Invalid API base '{base}': {e}"))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_top,
            api_key: api_key.into(),
            running: None,
        })
    }

    /// Streams end before their next request once `running` is cleared.
    pub fn with_cancel(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    fn cancelled(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.load(Ordering::SeqCst))
    }

    fn api_url(&self, api: &str) -> Result<Url> {
        Ok(self.api_top.join(api)?)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(API_USER, Some(&self.api_key))
    }

    /// Lazily walk every stored event from `begin` onward, oldest first.
    ///
    /// Only the first page request can fail; later failures end the stream.
    pub fn stream(&self, begin: Timestamp, want_raw: bool) -> Result<EventStream<'_>> {
        let url = self.api_url("events")?;
        debug!("GET {url} begin={begin}");

        let resp = self
            .get(url.as_str())
            .query(&[
                ("ascending", "yes".to_string()),
                ("begin", begin.to_string()),
                ("event", "stored".to_string()),
            ])
            .send()
            .context("Failed to send events request")?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp).into());
        }

        let page: Page = resp.json().context("Failed to parse events response")?;
        Ok(EventStream::new(self, page, want_raw))
    }

    fn fetch_page(&self, url: &str) -> Result<Page> {
        debug!("GET {url}");
        let resp = self.get(url).send()?;
        if !resp.status().is_success() {
            return Err(anyhow!("page fetch returned {}", resp.status()));
        }
        Ok(resp.json()?)
    }

    /// `Ok(None)` means the event has nothing importable (no storage URL, no id).
    fn fetch_message(&self, event: &Event, want_raw: bool) -> Result<Option<Message>> {
        let Some(url) = event.storage_url() else {
            debug!("event at {} has no storage url", event.timestamp);
            return Ok(None);
        };

        let mut req = self.get(url);
        if want_raw {
            req = req.header(ACCEPT, "message/rfc2822");
        }
        let resp = req.send()?;
        if !resp.status().is_success() {
            return Err(anyhow!("payload fetch {url} returned {}", resp.status()));
        }

        let payload: MessagePayload = resp.json()?;
        Ok(payload.into_message())
    }
}

impl EventSource for EventLogClient {
    fn stream(
        &self,
        begin: Timestamp,
        want_raw: bool,
    ) -> Result<Box<dyn Iterator<Item = StoredMessage> + '_>> {
        Ok(Box::new(EventLogClient::stream(self, begin, want_raw)?))
    }
}

fn classify_failure(resp: Response) -> ProviderError {
    let status = resp.status().as_u16();
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if !is_json {
        return ProviderError::Unknown { status };
    }
    match resp.json::<ApiErrorBody>() {
        Ok(body) => ProviderError::Api {
            status,
            message: body.message,
        },
        Err(_) => ProviderError::Unknown { status },
    }
}

/// Pull-based walk over the event log.
///
/// Consuming it is destructive: dropping it mid-way loses the unread pages.
pub struct EventStream<'a> {
    client: &'a EventLogClient,
    want_raw: bool,
    items: std::vec::IntoIter<Event>,
    paging: Paging,
    page_was_empty: bool,
    yielded: HashSet<String>,
    finished: bool,
}

impl<'a> EventStream<'a> {
    fn new(client: &'a EventLogClient, page: Page, want_raw: bool) -> Self {
        Self {
            client,
            want_raw,
            page_was_empty: page.items.is_empty(),
            items: page.items.into_iter(),
            paging: page.paging,
            yielded: HashSet::new(),
            finished: false,
        }
    }

    /// Follow the `next` cursor. Returns false when there is nothing more to read.
    fn advance_page(&mut self) -> bool {
        if self.page_was_empty || self.paging.is_exhausted() {
            return false;
        }
        match self.client.fetch_page(&self.paging.next) {
            Ok(page) => {
                debug!("page with {} events", page.items.len());
                self.page_was_empty = page.items.is_empty();
                self.items = page.items.into_iter();
                self.paging = page.paging;
                true
            }
            Err(e) => {
                warn!("event log stream stopped: {e:#}");
                false
            }
        }
    }
}

impl Iterator for EventStream<'_> {
    type Item = StoredMessage;

    fn next(&mut self) -> Option<StoredMessage> {
        while !self.finished {
            if self.client.cancelled() {
                debug!("event log stream cancelled");
                self.finished = true;
                break;
            }

            let Some(event) = self.items.next() else {
                if !self.advance_page() {
                    self.finished = true;
                }
                continue;
            };

            match self.client.fetch_message(&event, self.want_raw) {
                Ok(Some(message)) => {
                    if self.yielded.insert(message.message_id.clone()) {
                        return Some(StoredMessage { event, message });
                    }
                    debug!("{} already yielded", message.message_id);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("event log stream stopped: {e:#}");
                    self.finished = true;
                }
            }
        }
        None
    }
}
