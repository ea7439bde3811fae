//! Ordered, seq-numbered record of every applied intent for one match.
//!
//! The log is the replay surface: feeding its entries back through
//! `engine::replay` with the original config reproduces the final state
//! bit-for-bit. An optional background file writer persists entries as
//! JSONL.

pub mod persistence;

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::intent::Intent;
use persistence::FileWriter;

/// One applied intent with its sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct IntentEntry {
    pub seq: u64,
    pub intent: Intent,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct IntentLog {
    entries: Arc<Mutex<Vec<IntentEntry>>>,
    seq: AtomicU64,
    writer: Option<FileWriter>,
}

impl Clone for IntentLog {
    fn clone(&self) -> Self {
        let snapshot = self.entries();
        let log = IntentLog::new();
        match log.entries.lock() {
            Ok(mut g) => *g = snapshot,
            Err(e) => *e.into_inner() = snapshot,
        }
        log.seq.store(self.seq.load(Ordering::SeqCst), Ordering::SeqCst);
        Self {
            entries: log.entries,
            seq: log.seq,
            writer: self.writer.clone(),
        }
    }
}

impl Default for IntentLog {
    fn default() -> Self {
        IntentLog::new()
    }
}

impl IntentLog {
    pub fn new() -> Self {
        IntentLog {
            entries: Arc::new(Mutex::new(Vec::new())),
            seq: AtomicU64::new(0),
            writer: None,
        }
    }

    pub fn set_writer(&mut self, writer: Option<FileWriter>) {
        self.writer = writer;
    }

    /// Append an applied intent, assigning the next sequence number. Entries
    /// land in memory synchronously; the file writer is best-effort.
    pub fn append(&self, intent: Intent) -> IntentEntry {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let timestamp = match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(dur) => format!("{}", dur.as_millis()),
            Err(_) => "0".to_string(),
        };
        let entry = IntentEntry {
            seq,
            intent,
            timestamp,
        };
        match self.entries.lock() {
            Ok(mut g) => g.push(entry.clone()),
            Err(e) => e.into_inner().push(entry.clone()),
        }
        if let Some(writer) = &self.writer {
            writer.send(entry.clone());
        }
        entry
    }

    /// Cloned snapshot of all entries for replay/inspection.
    pub fn entries(&self) -> Vec<IntentEntry> {
        match self.entries.lock() {
            Ok(g) => g.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    /// The applied intents in order, stripped of log metadata.
    pub fn intents(&self) -> Vec<Intent> {
        self.entries().into_iter().map(|e| e.intent).collect()
    }

    /// Load a log from a JSONL file written by the file writer.
    pub fn load_from_file(path: &str) -> Result<IntentLog, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut max_seq = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: IntentEntry = serde_json::from_str(&line).map_err(|e| e.to_string())?;
            if entry.seq > max_seq {
                max_seq = entry.seq;
            }
            entries.push(entry);
        }
        let log = IntentLog::new();
        match log.entries.lock() {
            Ok(mut g) => *g = entries,
            Err(e) => *e.into_inner() = entries,
        }
        log.seq.store(max_seq, Ordering::SeqCst);
        Ok(log)
    }

    /// Flush and close the background writer, if any.
    pub fn shutdown(&self) {
        if let Some(writer) = &self.writer {
            writer.close();
        }
    }
}
