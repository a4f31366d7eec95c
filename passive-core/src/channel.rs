//! Transport channel between the main context and the background worker
//!
//! Two unbounded queues, one per direction. Payloads are owned JSON values,
//! so nothing is shared by reference across the boundary. Sending never
//! blocks and never waits for the other side; per-sender order is
//! preserved.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ChannelError;

/// Handler invoked once per arriving payload
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Create a connected pair of ports
pub fn channel() -> (MainPort, WorkerPort) {
    let (to_worker, worker_rx) = mpsc::unbounded_channel();
    let (to_main, main_rx) = mpsc::unbounded_channel();

    let main = MainPort {
        sender: PortSender { tx: to_worker },
        inbound: Arc::new(Inbound {
            rx: Mutex::new(Some(main_rx)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }),
    };
    let worker = WorkerPort {
        sender: PortSender { tx: to_main },
        rx: worker_rx,
    };
    (main, worker)
}

/// Fire-and-forget sending half
#[derive(Debug, Clone)]
pub struct PortSender {
    tx: mpsc::UnboundedSender<Value>,
}

impl PortSender {
    /// Queue `payload` for the other context
    ///
    /// Fails only when the receiving context is gone.
    pub fn send(&self, payload: Value) -> Result<(), ChannelError> {
        self.tx.send(payload).map_err(|_| ChannelError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Inbound {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    callbacks: Arc<Mutex<Vec<MessageCallback>>>,
}

/// Main-context end of the channel
#[derive(Clone)]
pub struct MainPort {
    sender: PortSender,
    inbound: Arc<Inbound>,
}

impl MainPort {
    pub fn sender(&self) -> PortSender {
        self.sender.clone()
    }

    pub fn send(&self, payload: Value) -> Result<(), ChannelError> {
        self.sender.send(payload)
    }

    /// Register a handler for payloads arriving from the worker
    ///
    /// Handlers run on a dedicated task, never inside the sender's call,
    /// in arrival order. The first registration made inside a Tokio runtime
    /// starts that task; until then payloads stay queued. A handler that
    /// panics is logged and skipped, the others keep receiving.
    pub fn on_message(&self, callback: MessageCallback) {
        self.inbound
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);

        let mut pending = self
            .inbound
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if pending.is_none() {
            return;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Response pump not started, no runtime: {}", e);
                return;
            }
        };
        if let Some(rx) = pending.take() {
            runtime.spawn(pump(rx, Arc::clone(&self.inbound.callbacks)));
        }
    }

    pub fn callback_count(&self) -> usize {
        self.inbound
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<Value>,
    callbacks: Arc<Mutex<Vec<MessageCallback>>>,
) {
    while let Some(payload) = rx.recv().await {
        let snapshot = callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in snapshot {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| callback(payload.clone())));
            if delivered.is_err() {
                warn!("Message callback panicked");
            }
        }
    }
    debug!("Worker side of channel closed");
}

impl std::fmt::Debug for MainPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainPort")
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

/// Background-context end of the channel
#[derive(Debug)]
pub struct WorkerPort {
    sender: PortSender,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl WorkerPort {
    /// Next payload from the main context; `None` once it is gone
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    pub fn sender(&self) -> PortSender {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn main_to_worker_preserves_order() {
        let (main, mut worker) = channel();
        for i in 0..5 {
            main.send(json!({ "n": i })).unwrap();
        }
        for i in 0..5 {
            assert_eq!(worker.recv().await.unwrap()["n"], i);
        }
    }

    #[tokio::test]
    async fn worker_to_main_invokes_callback_in_order() {
        let (main, worker) = channel();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        main.on_message(Arc::new(move |payload| {
            let _ = seen_tx.send(payload);
        }));

        let reply = worker.sender();
        reply.send(json!(1)).unwrap();
        reply.send(json!(2)).unwrap();

        assert_eq!(seen_rx.recv().await.unwrap(), json!(1));
        assert_eq!(seen_rx.recv().await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn callback_never_runs_inside_send() {
        let (main, worker) = channel();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        main.on_message(Arc::new(move |_| *flag.lock().unwrap() = true));

        worker.sender().send(json!("x")).unwrap();
        assert!(!*ran.lock().unwrap());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn every_registered_callback_fires_once_per_payload() {
        let (main, worker) = channel();
        let count = Arc::new(Mutex::new(0));
        for _ in 0..2 {
            let count = Arc::clone(&count);
            main.on_message(Arc::new(move |_| *count.lock().unwrap() += 1));
        }
        assert_eq!(main.callback_count(), 2);

        worker.sender().send(json!({})).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn panicking_callback_does_not_stop_the_others() {
        let (main, worker) = channel();
        main.on_message(Arc::new(|payload: Value| {
            if payload.is_number() {
                panic!("callback failure");
            }
        }));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        main.on_message(Arc::new(move |payload| {
            let _ = seen_tx.send(payload);
        }));

        let reply = worker.sender();
        reply.send(json!(1)).unwrap();
        reply.send(json!(2)).unwrap();

        for expected in [json!(1), json!(2)] {
            let got = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn registering_outside_runtime_defers_the_pump() {
        let (main, worker) = channel();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        main.on_message(Arc::new(move |payload| {
            let _ = seen_tx.send(payload);
        }));
        assert_eq!(main.callback_count(), 1);
        worker.sender().send(json!("queued")).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            main.on_message(Arc::new(|_| {}));
            let got = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, json!("queued"));
        });
    }

    #[tokio::test]
    async fn send_after_worker_dropped_reports_closed() {
        let (main, worker) = channel();
        drop(worker);
        assert!(main.sender().is_closed());
        assert_eq!(main.send(json!({})), Err(ChannelError::Closed));
    }

    #[tokio::test]
    async fn recv_returns_none_when_main_dropped() {
        let (main, mut worker) = channel();
        drop(main);
        assert!(worker.recv().await.is_none());
    }
}
