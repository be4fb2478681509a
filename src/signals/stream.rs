use tokio::sync::broadcast;

/// Broadcast channel carrying a signal's arguments to stream observers
pub struct SignalStream<A> {
    sender: broadcast::Sender<A>,
}

impl<A: Clone + Send + 'static> SignalStream<A> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to current subscribers; nothing is buffered without one.
    pub fn publish(&self, args: A) {
        let _ = self.sender.send(args);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<A> {
        self.sender.subscribe()
    }

    pub fn has_observers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}
