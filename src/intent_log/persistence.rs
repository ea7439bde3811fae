use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use super::IntentEntry;

/// Background JSONL appender for intent entries. One entry per line, flushed
/// after each write so a crash loses at most the in-flight entry.
#[derive(Clone, Debug)]
pub struct FileWriter {
    // Shared optional sender so close() can take the sender and drop it.
    sender: Arc<Mutex<Option<Sender<IntentEntry>>>>,
    // Keep a handle to the writer thread so it doesn't get dropped
    _handle: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl FileWriter {
    pub fn new(path: PathBuf) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<IntentEntry>();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let handle = thread::spawn(move || {
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(e) => {
                    log::error!("IntentLog FileWriter: failed to open file {path:?}: {e}");
                    return;
                }
            };
            let mut writer = BufWriter::new(file);
            for entry in rx {
                match serde_json::to_vec(&entry) {
                    Ok(mut bytes) => {
                        bytes.push(b'\n');
                        if let Err(e) = writer.write_all(&bytes) {
                            log::error!("IntentLog FileWriter: write_all failed: {e}");
                        }
                        if let Err(e) = writer.flush() {
                            log::error!("IntentLog FileWriter: flush failed: {e}");
                        }
                    }
                    Err(e) => {
                        log::error!("IntentLog FileWriter: serialization failed: {e}");
                    }
                }
            }
            // rx closed, flush and exit
            let _ = writer.flush();
        });

        Ok(FileWriter {
            sender,
            _handle: Arc::new(Mutex::new(Some(handle))),
        })
    }

    pub fn send(&self, entry: IntentEntry) {
        // best-effort send; ignore failures (e.g., receiver dropped)
        let guard = match self.sender.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if let Some(tx) = &*guard {
            let _ = tx.send(entry);
        }
    }

    /// Close the writer: drop the sender and join the writer thread so all
    /// pending writes hit disk.
    pub fn close(&self) {
        {
            let mut guard = match self.sender.lock() {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            *guard = None;
        }
        let handle_opt = {
            let mut h = match self._handle.lock() {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            h.take()
        };
        if let Some(h) = handle_opt {
            let _ = h.join();
        }
    }
}
