//! Event sinks.
//!
//! The pipeline pushes every [`LifecycleEvent`] into an [`EventSink`]. The
//! embedding application decides where events go: a UI connection, a
//! channel, a log, or a buffer for assertions.

use std::sync::mpsc::Sender;

use super::LifecycleEvent;

/// Observer receiving lifecycle events in emission order.
pub trait EventSink {
    /// Receive one event.
    fn emit(&mut self, event: LifecycleEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: LifecycleEvent) {
        (**self).emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: LifecycleEvent) {
        (**self).emit(event);
    }
}

/// Captures events for later assertion.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<LifecycleEvent>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Wire names of the received events, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(LifecycleEvent::name).collect()
    }

    /// Wire names with consecutive duplicates collapsed.
    ///
    /// Handy for asserting stage order without counting progress events.
    pub fn stages(&self) -> Vec<&'static str> {
        let mut names = self.names();
        names.dedup();
        names
    }

    /// Consume the sink and return the captured events.
    pub fn into_events(self) -> Vec<LifecycleEvent> {
        self.events
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: LifecycleEvent) {
        self.events.push(event);
    }
}

/// Forwards events over an mpsc channel.
///
/// A disconnected receiver is not an error for the pipeline; events are
/// dropped once nobody listens.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<LifecycleEvent>,
}

impl ChannelSink {
    /// Wrap a channel sender.
    pub fn new(sender: Sender<LifecycleEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: LifecycleEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Event receiver disconnected, dropping event");
        }
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F: FnMut(LifecycleEvent)> EventSink for FnSink<F> {
    fn emit(&mut self, event: LifecycleEvent) {
        (self.0)(event);
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: LifecycleEvent) {
        match &event {
            LifecycleEvent::Error { message } => tracing::error!("{}", message),
            LifecycleEvent::Downloading { .. } => tracing::debug!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.emit(LifecycleEvent::Checking);
        sink.emit(LifecycleEvent::Found {
            version: "2.0.0".into(),
        });
        sink.emit(LifecycleEvent::Extracting);

        assert_eq!(sink.names(), vec!["checking", "found", "extracting"]);
        assert_eq!(sink.events().len(), 3);
    }

    #[test]
    fn stages_collapses_progress() {
        let mut sink = RecordingSink::new();
        sink.emit(LifecycleEvent::Checking);
        sink.emit(LifecycleEvent::downloading(1, 3));
        sink.emit(LifecycleEvent::downloading(2, 3));
        sink.emit(LifecycleEvent::downloading(3, 3));
        sink.emit(LifecycleEvent::Extracting);

        assert_eq!(sink.stages(), vec!["checking", "downloading", "extracting"]);
    }

    #[test]
    fn channel_sink_forwards() {
        let (tx, rx) = mpsc::channel();
        let mut sink = ChannelSink::new(tx);
        sink.emit(LifecycleEvent::Installing);

        assert_eq!(rx.recv().unwrap(), LifecycleEvent::Installing);
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        sink.emit(LifecycleEvent::Checking);
    }

    #[test]
    fn fn_sink_calls_closure() {
        let mut seen = Vec::new();
        {
            let mut sink = FnSink(|event: LifecycleEvent| seen.push(event.name()));
            sink.emit(LifecycleEvent::UpToDate);
        }
        assert_eq!(seen, vec!["uptodate"]);
    }

    #[test]
    fn mutable_reference_is_a_sink() {
        fn emit_twice(mut sink: impl EventSink) {
            sink.emit(LifecycleEvent::Checking);
            sink.emit(LifecycleEvent::UpToDate);
        }

        let mut sink = RecordingSink::new();
        emit_twice(&mut sink);
        assert_eq!(sink.names(), vec!["checking", "uptodate"]);
    }

    #[test]
    fn boxed_sink_forwards() {
        let mut sink: Box<dyn EventSink> = Box::new(RecordingSink::new());
        sink.emit(LifecycleEvent::Extracting);
    }
}
