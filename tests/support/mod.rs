//! Shared fixtures for pipeline integration tests.
//!
//! [`ScriptedExtractor`] answers each entry id from a script and records how
//! many calls it received and how many ran at once.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use playlist_grabber_core::extractor::{ExtractError, Extraction, Extractor, ResolvedMedia};
use playlist_grabber_core::playlist::PlaylistEntry;
use playlist_grabber_core::quality::QualityPreference;
use playlist_grabber_core::resolve::SkipReason;

/// What the extractor does for one id.
#[derive(Debug, Clone)]
pub enum Script {
    /// Resolve on every call.
    Resolve,
    /// Fail transiently this many times, then resolve.
    FailTimes(u32),
    /// Fail transiently on every call.
    AlwaysFail,
    /// Report a known unavailability.
    Unavailable(SkipReason),
    /// Panic inside the call.
    Panic,
    /// Never return within any reasonable timeout.
    Hang,
}

/// Deterministic stub extractor.
pub struct ScriptedExtractor {
    scripts: HashMap<String, Script>,
    latencies: HashMap<String, Duration>,
    default_latency: Duration,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedExtractor {
    /// Every id not scripted resolves.
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            latencies: HashMap::new(),
            default_latency: Duration::from_millis(10),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn script(mut self, id: &str, script: Script) -> Self {
        self.scripts.insert(id.to_string(), script);
        self
    }

    pub fn latency(mut self, id: &str, latency: Duration) -> Self {
        self.latencies.insert(id.to_string(), latency);
        self
    }

    pub fn default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Calls received for `id`.
    pub fn calls(&self, id: &str) -> u32 {
        self.calls
            .lock()
            .map(|calls| calls.get(id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total calls received.
    pub fn total_calls(&self) -> u32 {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    /// Highest number of calls that were running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn url_for(id: &str) -> String {
        format!("https://media.example/{id}.mp4")
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn resolve(
        &self,
        entry_id: &str,
        _quality: QualityPreference,
    ) -> Result<Extraction, ExtractError> {
        let call = {
            let mut calls = self.calls.lock().map_err(|_| {
                ExtractError::upstream(entry_id, "call log poisoned")
            })?;
            let count = calls.entry(entry_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let latency = self
            .latencies
            .get(entry_id)
            .copied()
            .unwrap_or(self.default_latency);
        tokio::time::sleep(latency).await;

        let script = self.scripts.get(entry_id).cloned().unwrap_or(Script::Resolve);
        let resolved = || {
            Ok(Extraction::Resolved(ResolvedMedia::new(
                Self::url_for(entry_id),
                "1280x720",
                Some(10 * 1024 * 1024),
            )))
        };
        match script {
            Script::Resolve => resolved(),
            Script::FailTimes(n) if call > n => resolved(),
            Script::FailTimes(_) | Script::AlwaysFail => {
                Err(ExtractError::upstream(entry_id, "HTTP Error 503: Service Unavailable"))
            }
            Script::Unavailable(reason) => Ok(Extraction::Unavailable(reason)),
            Script::Panic => panic!("scripted fault for {entry_id}"),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                resolved()
            }
        }
    }
}

/// Entries with ids `v0..vN` at positions `0..N`.
pub fn numbered_entries(n: usize) -> Vec<PlaylistEntry> {
    (0..n)
        .map(|i| PlaylistEntry::new(format!("v{i}"), format!("Video {i}"), i))
        .collect()
}

/// Entries with the given ids in order.
pub fn entries(ids: &[&str]) -> Vec<PlaylistEntry> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| PlaylistEntry::new(*id, format!("Title {id}"), i))
        .collect()
}
