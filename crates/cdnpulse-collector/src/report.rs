//! Structured per-task results merged at each join barrier

use cdnpulse_core::{
    Category, ChannelId, FailureKind, FetchError, FieldError, Observation, QueryWindow, SinkError,
    Snapshot,
};
use std::time::Duration;
use tracing::warn;

/// A category that produced no observations for a channel
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFailure {
    pub category: Category,
    pub channel: ChannelId,
    pub error: FetchError,
}

impl CollectionFailure {
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

/// A single field that was dropped from an otherwise collected category
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiagnostic {
    pub category: Category,
    pub channel: ChannelId,
    /// Entry the field belongs to, e.g. an HTTP status code or region name
    pub subject: String,
    pub error: FieldError,
}

/// Outcome of one (channel, category) collection
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: Category,
    pub channel: ChannelId,
    pub observations: Vec<Observation>,
    pub diagnostics: Vec<FieldDiagnostic>,
    pub failure: Option<CollectionFailure>,
}

impl CategoryReport {
    pub fn empty(category: Category, channel: ChannelId) -> Self {
        Self {
            category,
            channel,
            observations: Vec::new(),
            diagnostics: Vec::new(),
            failure: None,
        }
    }

    pub fn failed(category: Category, channel: ChannelId, error: FetchError) -> Self {
        let failure = CollectionFailure {
            category,
            channel: channel.clone(),
            error,
        };
        Self {
            failure: Some(failure),
            ..Self::empty(category, channel)
        }
    }

    /// Keep a built observation, or record why it was dropped
    pub fn push(&mut self, observation: Result<Observation, FieldError>, subject: &str) {
        match observation {
            Ok(obs) => self.observations.push(obs),
            Err(error) => self.diagnose(subject, error),
        }
    }

    /// Record and log a dropped field
    pub fn diagnose(&mut self, subject: &str, error: FieldError) {
        warn!(
            channel = %self.channel,
            category = %self.category,
            subject,
            kind = %error.kind(),
            error = %error,
            "Dropping field"
        );
        self.diagnostics.push(FieldDiagnostic {
            category: self.category,
            channel: self.channel.clone(),
            subject: subject.to_string(),
            error,
        });
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Observations and problems accumulated across several categories or channels
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub observations: Vec<Observation>,
    pub failures: Vec<CollectionFailure>,
    pub diagnostics: Vec<FieldDiagnostic>,
}

impl CollectionReport {
    pub fn absorb(&mut self, category: CategoryReport) {
        self.observations.extend(category.observations);
        self.diagnostics.extend(category.diagnostics);
        self.failures.extend(category.failure);
    }

    pub fn merge(&mut self, other: CollectionReport) {
        self.observations.extend(other.observations);
        self.failures.extend(other.failures);
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.diagnostics.is_empty()
    }
}

impl FromIterator<CategoryReport> for CollectionReport {
    fn from_iter<I: IntoIterator<Item = CategoryReport>>(iter: I) -> Self {
        let mut report = CollectionReport::default();
        for category in iter {
            report.absorb(category);
        }
        report
    }
}

/// Everything that happened in one collection cycle
#[derive(Debug)]
pub struct CycleReport {
    pub window: QueryWindow,
    pub channels: usize,
    pub snapshot: Snapshot,
    pub failures: Vec<CollectionFailure>,
    pub diagnostics: Vec<FieldDiagnostic>,
    pub elapsed: Duration,
    /// Set when the sink did not accept the snapshot
    pub publish_error: Option<SinkError>,
}

impl CycleReport {
    pub fn published(&self) -> bool {
        self.publish_error.is_none()
    }
}
