/// Engine event stream
///
/// Chain-driven notifications surface here as a broadcast stream that any
/// number of consumers may subscribe to. Height changes are batched to one
/// event per wallet per update, never one per transaction.
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Chain tip moved; emitted once per wallet per height update.
    HeightChanged { wallet_id: String, height: u64 },
    /// An active receive request was credited by an observed transaction.
    RequestCredited {
        wallet_id: String,
        request_id: String,
        amount_satoshi: u64,
    },
    /// A new ledger entry was created from a chain observation or sweep.
    TransactionReceived {
        wallet_id: String,
        internal_id: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Send with no subscribers is not an error; events are advisory.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
