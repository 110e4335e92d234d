// 📡 Progress - status channel and cooperative cancellation
//
// The worker never blocks on the observer: updates go through an unbounded
// channel and are dropped if nobody is listening anymore.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    pub current: usize,
    pub total: usize,
    /// Terminal update carrying the error that ended the run
    #[serde(default)]
    pub failed: bool,
}

impl ProgressUpdate {
    /// 0.0..=1.0; an empty run counts as done
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.current as f64 / self.total as f64).min(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Option<UnboundedSender<ProgressUpdate>>,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn new(tx: UnboundedSender<ProgressUpdate>, cancel: CancellationToken) -> Self {
        ProgressReporter {
            tx: Some(tx),
            cancel,
        }
    }

    /// Reporter plus the receiving end for an observer
    pub fn channel() -> (Self, UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, CancellationToken::new()), rx)
    }

    /// No observer, never cancelled
    pub fn silent() -> Self {
        ProgressReporter {
            tx: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn report(&self, message: impl Into<String>, current: usize, total: usize) {
        self.send(ProgressUpdate {
            message: message.into(),
            current,
            total,
            failed: false,
        });
    }

    /// Surface the error that ended the run
    pub fn fail(&self, message: impl Into<String>) {
        self.send(ProgressUpdate {
            message: message.into(),
            current: 0,
            total: 0,
            failed: true,
        });
    }

    fn send(&self, update: ProgressUpdate) {
        if let Some(tx) = &self.tx {
            // Observer gone: the run carries on without it
            let _ = tx.send(update);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
