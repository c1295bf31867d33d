use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, as reported by the provider.
pub type Timestamp = f64;

/// One "stored" entry of the provider's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub storage: Option<StorageRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRef {
    pub url: String,
}

impl Event {
    pub fn storage_url(&self) -> Option<&str> {
        self.storage.as_ref().map(|s| s.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    pub next: String,
    pub last: String,
}

impl Paging {
    /// The provider signals end-of-data by pointing both cursors at the same page.
    pub fn is_exhausted(&self) -> bool {
        self.next == self.last
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Event>,
    pub paging: Paging,
}

/// Payload returned by an event's storage URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "Message-Id")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(rename = "body-mime", default)]
    pub body_mime: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub message_id: String,
    pub subject: String,
    /// Full MIME source; empty when fetched in structured mode.
    pub raw_body: Vec<u8>,
}

impl MessagePayload {
    /// Returns `None` when the payload carries no message identifier.
    pub fn into_message(self) -> Option<Message> {
        let message_id = self.message_id?;
        Some(Message {
            message_id,
            subject: self.subject.unwrap_or_default(),
            raw_body: self.body_mime.map(String::into_bytes).unwrap_or_default(),
        })
    }
}

/// An event paired with the message it references.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub event: Event,
    pub message: Message,
}
