//! Mock source and sink for collector tests

use async_trait::async_trait;
use cdnpulse_core::{
    Category, ChannelId, FetchError, MetricKind, MetricSink, MetricSource, Observation, Payload,
    QueryWindow, SinkError, Snapshot,
};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn channel(id: &str) -> ChannelId {
    ChannelId::new(id).unwrap()
}

pub fn window() -> QueryWindow {
    QueryWindow::ending_at(
        Utc.with_ymd_and_hms(2024, 3, 1, 16, 2, 0).unwrap(),
        Duration::from_secs(300),
    )
}

/// Canonical ordering for set comparison of observations
pub fn canonical(observations: &[Observation]) -> Vec<(MetricKind, Vec<String>, u64)> {
    let mut keyed: Vec<_> = observations
        .iter()
        .map(|o| (o.metric(), o.labels().to_vec(), o.value().to_bits()))
        .collect();
    keyed.sort();
    keyed
}

/// Metric source answering from a fixed table; unknown keys fail with a transport error
#[derive(Default)]
pub struct MockSource {
    responses: HashMap<(Category, String), Result<Payload, FetchError>>,
    delays: HashMap<String, Duration>,
    panics: Vec<(Category, String)>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, category: Category, channel: &str, payload: impl Into<Payload>) -> Self {
        self.responses
            .insert((category, channel.to_string()), Ok(payload.into()));
        self
    }

    pub fn fail(mut self, category: Category, channel: &str, error: FetchError) -> Self {
        self.responses
            .insert((category, channel.to_string()), Err(error));
        self
    }

    /// Delay every fetch for `channel`
    pub fn delay(mut self, channel: &str, delay: Duration) -> Self {
        self.delays.insert(channel.to_string(), delay);
        self
    }

    /// Panic inside the fetch for this key
    pub fn panic_on(mut self, category: Category, channel: &str) -> Self {
        self.panics.push((category, channel.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricSource for MockSource {
    async fn fetch(
        &self,
        category: Category,
        channel: &ChannelId,
        _window: &QueryWindow,
    ) -> Result<Payload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(channel.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        let key = (category, channel.to_string());
        if self.panics.contains(&key) {
            panic!("mock source panic for {category} on {channel}");
        }
        self.responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Transport("no mock response".into())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Sink recording every published snapshot
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<Snapshot>>,
    reject: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        if self.reject {
            return Err(SinkError::Rejected {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
