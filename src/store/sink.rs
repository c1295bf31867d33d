use anyhow::Result;

/// Local destination for fetched messages. Append-only.
pub trait MailSink {
    /// Store one raw RFC 2822 message and return its local identifier.
    fn add(&mut self, raw: &[u8]) -> Result<String>;
}

/// Keeps messages in memory, for callers that need no files on disk.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MailSink for MemorySink {
    fn add(&mut self, raw: &[u8]) -> Result<String> {
        self.messages.push(raw.to_vec());
        Ok(self.messages.len().to_string())
    }
}
