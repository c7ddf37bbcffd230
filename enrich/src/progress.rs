//! Reporting the progress of a run.
use crate::error::PeakCallError;
use definitions::PeakSet;
use std::sync::mpsc::Sender;

/// Receives the progress of a run. Called on the worker thread, so it should return quickly.
/// Exactly one of `on_cancelled`, `on_exception`, and `on_complete` is called per run.
pub trait ProgressListener {
    fn on_progress(&mut self, message: &str, current: usize, total: usize);
    fn on_cancelled(&mut self) {}
    fn on_exception(&mut self, _error: &PeakCallError) {}
    fn on_complete(&mut self, _peaks: &PeakSet) {}
}

/// Writes the progress into the log.
#[derive(Debug, Clone, Default)]
pub struct LogListener;

impl ProgressListener for LogListener {
    fn on_progress(&mut self, message: &str, current: usize, total: usize) {
        info!("PROGRESS\t{}\t{}\t{}", message, current, total);
    }
    fn on_cancelled(&mut self) {
        warn!("PROGRESS\tCancelled");
    }
    fn on_exception(&mut self, error: &PeakCallError) {
        error!("PROGRESS\tFailed\t{}", error);
    }
    fn on_complete(&mut self, peaks: &PeakSet) {
        info!("PROGRESS\tComplete\t{}", peaks.len());
    }
}

/// Messages sent from a background run.
#[derive(Debug)]
pub enum Event {
    Progress {
        message: String,
        current: usize,
        total: usize,
    },
    Cancelled,
    /// The error message of a failed run.
    Failed(String),
    Complete(PeakSet),
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Progress { .. })
    }
}

/// Forwards everything into a channel. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: Sender<Event>,
}

impl ChannelListener {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }
}

impl ProgressListener for ChannelListener {
    fn on_progress(&mut self, message: &str, current: usize, total: usize) {
        let message = message.to_string();
        let event = Event::Progress {
            message,
            current,
            total,
        };
        self.sender.send(event).ok();
    }
    fn on_cancelled(&mut self) {
        self.sender.send(Event::Cancelled).ok();
    }
    fn on_exception(&mut self, error: &PeakCallError) {
        self.sender.send(Event::Failed(error.to_string())).ok();
    }
    fn on_complete(&mut self, peaks: &PeakSet) {
        self.sender.send(Event::Complete(peaks.clone())).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn channel_forwarding() {
        let (sender, receiver) = std::sync::mpsc::channel();
        let mut listener = ChannelListener::new(sender);
        listener.on_progress("Scanning chr1", 0, 2);
        listener.on_complete(&PeakSet::default());
        drop(listener);
        let events: Vec<_> = receiver.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_terminal());
        assert!(matches!(events[1], Event::Complete(_)));
    }
}
