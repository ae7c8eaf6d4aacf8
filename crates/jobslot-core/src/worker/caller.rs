use jobslot_model::WorkerReply;
use tokio::sync::mpsc;
use tracing::debug;

/// Opaque reply handle of whoever sent a request.
#[derive(Debug, Clone)]
pub struct Caller {
    tx: mpsc::UnboundedSender<WorkerReply>,
}

impl Caller {
    pub fn new(tx: mpsc::UnboundedSender<WorkerReply>) -> Self {
        Self { tx }
    }

    /// Caller plus the receiving end of its reply stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkerReply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a reply; a caller that went away is not an error.
    pub fn send(&self, reply: WorkerReply) {
        if let Err(e) = self.tx.send(reply) {
            debug!(target: "jobslot.worker", job_id = %e.0.id(), "caller gone; reply dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
