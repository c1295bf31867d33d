use anyhow::Result;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::domain::event::{Message, Timestamp};
use crate::mail::events_client::EventSource;
use crate::store::checkpoint::{self, Checkpoint};
use crate::store::sink::MailSink;

pub struct ImportOptions {
    /// Stop after this many messages not yet in the checkpoint; `None` or
    /// `Some(0)` means no limit. Already imported messages do not count.
    pub limit: Option<usize>,
    /// Save the checkpoint after every stored message, not only at the end.
    pub checkpoint_each: bool,
    /// Cleared by [`request_stop`] to stop after the current message.
    pub running: Arc<AtomicBool>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            limit: None,
            checkpoint_each: false,
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Ask a running import to stop.
///
/// Returns `true` if a stop had already been requested, so a second Ctrl-C
/// can exit outright while a request is stuck.
pub fn request_stop(running: &AtomicBool) -> bool {
    !running.swap(false, Ordering::SeqCst)
}

/// Statistics from one import run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportStats {
    /// Stream items inspected before the run stopped
    pub processed: usize,
    /// Messages written to the sink
    pub stored: usize,
    /// Messages already present in the checkpoint
    pub skipped: usize,
    /// Whether the run stopped because of the limit
    pub limit_reached: bool,
    /// Checkpoint position after the run
    pub last_timestamp: Timestamp,
    /// Wall time from loading the checkpoint to saving it
    pub duration_ms: u64,
}

/// Fetch everything new since the last run into `sink`.
///
/// The checkpoint in `store` is saved once the stream has been opened, even
/// if the loop ends early. If opening the stream fails nothing is saved.
pub fn run_import(
    source: &dyn EventSource,
    sink: &mut dyn MailSink,
    store: &Path,
    opts: &ImportOptions,
    mut on_stored: impl FnMut(&Message),
) -> Result<ImportStats> {
    let start = Instant::now();
    let mut cp = checkpoint::load(store)?;
    let begin = cp.last;
    debug!("resuming from {begin} with {} known messages", cp.messages.len());

    let stream = source.stream(begin, true)?;

    let mut stats = ImportStats::default();
    let outcome = import_loop(stream, sink, store, &mut cp, opts, &mut stats, &mut on_stored);

    checkpoint::save(store, &cp)?;
    outcome?;

    stats.last_timestamp = cp.last;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "import done: {} processed, {} stored, {} skipped, last={}",
        stats.processed, stats.stored, stats.skipped, stats.last_timestamp
    );
    Ok(stats)
}

fn import_loop(
    stream: impl Iterator<Item = crate::domain::event::StoredMessage>,
    sink: &mut dyn MailSink,
    store: &Path,
    cp: &mut Checkpoint,
    opts: &ImportOptions,
    stats: &mut ImportStats,
    on_stored: &mut dyn FnMut(&Message),
) -> Result<()> {
    let limit = opts.limit.filter(|&n| n > 0);
    let mut fresh = 0;

    for item in stream {
        // progress tracks log position, so it moves even for duplicates
        cp.advance(item.event.timestamp);
        stats.processed += 1;

        let message = item.message;
        if cp.is_seen(&message.message_id) {
            debug!("{} already imported", message.message_id);
            stats.skipped += 1;
        } else if limit.is_some_and(|n| fresh >= n) {
            stats.limit_reached = true;
            break;
        } else if message.raw_body.is_empty() {
            fresh += 1;
            warn!("{} has no MIME body; not stored", message.message_id);
        } else {
            fresh += 1;
            sink.add(&message.raw_body)?;
            on_stored(&message);
            cp.mark_seen(message.message_id);
            stats.stored += 1;

            if opts.checkpoint_each {
                checkpoint::save(store, cp)?;
            }
        }

        if !opts.running.load(Ordering::SeqCst) {
            info!("import interrupted");
            break;
        }
    }
    Ok(())
}
