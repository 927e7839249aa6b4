//! Single-slot handoff between a handler task and the task owning the
//! synchronous acknowledgment cycle.
//!
//! Each interaction gets one [`ResponseSink`] (handed to its context) and
//! one [`ResponseReceiver`] (kept by the acknowledgment owner). The sink
//! carries two one-shot slots: the initial response and one edit of the
//! original message. A delivery waits until the owner has performed the
//! platform call and reports its outcome back. If the owner has already
//! gone, the payload is handed back so the caller can degrade to a follow-up.
//!
//! The owner also publishes an `acknowledged` flag once the initial
//! acknowledgment (or its own fallback deferral) has completed, so that
//! follow-ups never overtake it.

use tokio::sync::{oneshot, watch};

use wicket_core::{ApiError, ApiResult, InitialResponse, MessageResponse};

/// A payload in flight, with the channel its outcome is reported on.
#[derive(Debug)]
pub struct Handoff<T> {
    payload: T,
    done: oneshot::Sender<ApiResult<()>>,
}

impl<T> Handoff<T> {
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Reports the outcome of the platform call to the waiting handler.
    pub fn complete(self, result: ApiResult<()>) {
        // The handler may have stopped waiting.
        let _ = self.done.send(result);
    }
}

/// Outcome of a delivery attempt.
#[derive(Debug)]
pub enum Delivery<T> {
    /// The owner performed the call.
    Completed(ApiResult<()>),
    /// The owner was gone before accepting; the payload is returned.
    Undelivered(T),
}

/// Sending half of one handoff slot.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: oneshot::Sender<Handoff<T>>,
}

impl<T> HandoffSender<T> {
    /// Delivers `payload` and waits for the owner to report the outcome.
    pub async fn deliver(self, payload: T) -> Delivery<T> {
        let (done, outcome) = oneshot::channel();
        if let Err(rejected) = self.tx.send(Handoff { payload, done }) {
            return Delivery::Undelivered(rejected.payload);
        }
        match outcome.await {
            Ok(result) => Delivery::Completed(result),
            // Accepted but never reported: the owner task died mid-call.
            Err(_) => Delivery::Completed(Err(ApiError::Other(
                "acknowledgment owner dropped the response".into(),
            ))),
        }
    }

    /// Returns `true` if the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of one handoff slot.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: Option<oneshot::Receiver<Handoff<T>>>,
}

impl<T> HandoffReceiver<T> {
    /// Waits for a handoff. `None` once the sender is dropped or the slot
    /// has already been consumed.
    pub async fn recv(&mut self) -> Option<Handoff<T>> {
        let rx = self.rx.as_mut()?;
        let received = rx.await.ok();
        self.rx = None;
        received
    }

    /// Refuses further deliveries and returns one that raced the close.
    pub fn close(&mut self) -> Option<Handoff<T>> {
        let mut rx = self.rx.take()?;
        rx.close();
        rx.try_recv().ok()
    }
}

fn slot<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = oneshot::channel();
    (HandoffSender { tx }, HandoffReceiver { rx: Some(rx) })
}

/// Context side of the response channel.
#[derive(Debug)]
pub struct ResponseSink {
    pub initial: HandoffSender<InitialResponse>,
    pub edit: HandoffSender<MessageResponse>,
    pub acknowledged: watch::Receiver<bool>,
}

/// Owner side of the response channel.
#[derive(Debug)]
pub struct ResponseReceiver {
    pub initial: HandoffReceiver<InitialResponse>,
    pub edit: HandoffReceiver<MessageResponse>,
    acknowledged: watch::Sender<bool>,
}

impl ResponseReceiver {
    /// Marks the initial acknowledgment as done, releasing waiting follow-ups.
    pub fn mark_acknowledged(&self) {
        self.acknowledged.send_replace(true);
    }
}

/// Creates the response channel for one interaction.
pub fn response_channel() -> (ResponseSink, ResponseReceiver) {
    let (initial_tx, initial_rx) = slot();
    let (edit_tx, edit_rx) = slot();
    let (ack_tx, ack_rx) = watch::channel(false);
    (
        ResponseSink {
            initial: initial_tx,
            edit: edit_tx,
            acknowledged: ack_rx,
        },
        ResponseReceiver {
            initial: initial_rx,
            edit: edit_rx,
            acknowledged: ack_tx,
        },
    )
}
