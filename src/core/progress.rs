// ─── Progress ───
// Progress records consumed by whatever front end drives the pipeline.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Pipeline step a progress record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Java,
    Extract,
    Version,
    Client,
    Library,
    Assets,
    Loader,
    Bundle,
    Launch,
}

/// Wire shape: `{"type": "ASSETS", "name": "Assets (100/4000)", "current": 54, "total": 100}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub phase: Phase,
    #[serde(rename = "name")]
    pub label: String,
    pub current: u32,
    pub total: u32,
}

impl ProgressEvent {
    /// Event on the default 0..=100 scale.
    pub fn new(phase: Phase, label: impl Into<String>, current: u32) -> Self {
        Self {
            phase,
            label: label.into(),
            current: current.min(100),
            total: 100,
        }
    }
}

/// Receiver of progress records.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards everything.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events to a channel; a closed receiver is ignored.
pub struct ChannelProgress(pub UnboundedSender<ProgressEvent>);

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

/// Map `done/total` into `start..=start+span`.
pub fn scaled(done: usize, total: usize, start: u32, span: u32) -> u32 {
    if total == 0 {
        return start + span;
    }
    let fraction = done.min(total) as f64 / total as f64;
    start + (fraction * f64::from(span)).round() as u32
}

/// Map a percentage into `start..=start+span`.
pub fn scaled_percent(percent: f64, start: u32, span: u32) -> u32 {
    let percent = percent.clamp(0.0, 100.0);
    start + (percent * f64::from(span) / 100.0).round() as u32
}
