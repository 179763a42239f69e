use std::{collections::VecDeque, fmt, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{
    oneshot::{self, error::TryRecvError},
    Notify,
};

use crate::{
    connection::ClientIdentity,
    forms::{Cancelled, FormRequest, FormResponse},
};

/// Creates a connected producer/consumer pair for one render.
#[must_use]
pub fn pending<T>() -> (Responder<T>, PendingResult<T>) {
    let (tx, rx) = oneshot::channel();
    (Responder { tx }, PendingResult { rx })
}

/// Producer side of a [`PendingResult`]. Consumed by the first resolution.
pub struct Responder<T> {
    tx: oneshot::Sender<Result<T, Cancelled>>,
}

impl<T> Responder<T> {
    /// Fulfils the pending result with a value.
    pub fn resolve(self, value: T) {
        let _ = self.tx.send(Ok(value));
    }

    /// Fulfils the pending result with [`Cancelled`].
    pub fn cancel(self) {
        let _ = self.tx.send(Err(Cancelled));
    }
}

impl<T> fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Handle returned by a render; resolves exactly once.
pub struct PendingResult<T> {
    rx: oneshot::Receiver<Result<T, Cancelled>>,
}

impl<T> PendingResult<T> {
    /// A result that is already resolved.
    #[must_use]
    pub fn ready(value: T) -> Self {
        let (responder, pending) = pending();
        responder.resolve(value);
        pending
    }

    /// A result that is already cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        let (responder, pending) = pending();
        responder.cancel();
        pending
    }

    /// Non-blocking check. `None` while the client has not answered.
    ///
    /// Once this returns `Some`, the handle is spent.
    pub fn try_outcome(&mut self) -> Option<Result<T, Cancelled>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Cancelled)),
        }
    }

    /// Awaits the resolution. A producer dropped without answering counts as cancelled.
    pub async fn outcome(self) -> Result<T, Cancelled> {
        self.rx.await.unwrap_or(Err(Cancelled))
    }
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult").finish_non_exhaustive()
    }
}

/// What the transport observed for a rendered form.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The client submitted the form.
    Submitted(FormResponse),
    /// The client closed the form.
    Closed,
}

/// One-shot callback a transport invokes when the client answers.
///
/// Both entry points consume the callback, so at most one fires per render.
pub struct FormCallback {
    handler: Box<dyn FnOnce(Submission) + Send>,
}

impl FormCallback {
    /// Wraps a handler.
    #[must_use]
    pub fn new(handler: impl FnOnce(Submission) + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Delivers a submission. Shape validation happens in the handler.
    pub fn submit(self, response: FormResponse) {
        (self.handler)(Submission::Submitted(response));
    }

    /// Reports that the client closed the form.
    pub fn close(self) {
        (self.handler)(Submission::Closed);
    }
}

impl fmt::Debug for FormCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormCallback").finish_non_exhaustive()
    }
}

/// Renders forms on a remote client.
pub trait FormTransport: Send + Sync {
    /// Sends the form and returns immediately; the callback fires later.
    fn send_form(&self, identity: &ClientIdentity, form: FormRequest, callback: FormCallback);
}

/// Form parked by [`LoopbackTransport`] until a driver answers it.
#[derive(Debug)]
pub struct PendingForm {
    /// Recipient.
    pub identity: ClientIdentity,
    /// Rendered request.
    pub form: FormRequest,
    callback: FormCallback,
}

impl PendingForm {
    /// Answers the form.
    pub fn submit(self, response: FormResponse) {
        self.callback.submit(response);
    }

    /// Closes the form.
    pub fn close(self) {
        self.callback.close();
    }
}

/// In-memory transport queuing forms in send order (tests and local tooling).
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    outbox: Arc<Mutex<VecDeque<PendingForm>>>,
    notify: Arc<Notify>,
}

impl LoopbackTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the oldest unanswered form.
    #[must_use]
    pub fn next_form(&self) -> Option<PendingForm> {
        self.outbox.lock().pop_front()
    }

    /// Waits until a form is sent, then pops it.
    pub async fn recv_form(&self) -> PendingForm {
        loop {
            if let Some(form) = self.next_form() {
                return form;
            }
            self.notify.notified().await;
        }
    }

    /// Number of unanswered forms.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }
}

impl FormTransport for LoopbackTransport {
    fn send_form(&self, identity: &ClientIdentity, form: FormRequest, callback: FormCallback) {
        self.outbox.lock().push_back(PendingForm {
            identity: identity.clone(),
            form,
            callback,
        });
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_once_with_value() {
        let (responder, pending) = pending();
        responder.resolve(7);
        assert_eq!(pending.outcome().await, Ok(7));
    }

    #[tokio::test]
    async fn dropped_responder_counts_as_cancelled() {
        let (responder, pending) = pending::<u8>();
        drop(responder);
        assert_eq!(pending.outcome().await, Err(Cancelled));
    }

    #[test]
    fn try_outcome_is_none_until_answered() {
        let (responder, mut pending) = pending::<&str>();
        assert!(pending.try_outcome().is_none());
        responder.cancel();
        assert_eq!(pending.try_outcome(), Some(Err(Cancelled)));

        let mut ready = PendingResult::ready(3);
        assert_eq!(ready.try_outcome(), Some(Ok(3)));
        let mut cancelled = PendingResult::<u8>::cancelled();
        assert_eq!(cancelled.try_outcome(), Some(Err(Cancelled)));
    }

    #[test]
    fn callback_fires_exactly_one_handler() {
        let (responder, mut pending) = pending();
        let callback = FormCallback::new(move |submission| match submission {
            Submission::Submitted(_) => responder.resolve("submitted"),
            Submission::Closed => responder.cancel(),
        });
        callback.close();
        assert_eq!(pending.try_outcome(), Some(Err(Cancelled)));
    }

    #[tokio::test]
    async fn loopback_parks_forms_until_answered() {
        let transport = LoopbackTransport::new();
        let (responder, pending) = pending();
        transport.send_form(
            &ClientIdentity::new("alex"),
            FormRequest::Menu {
                title: "Main".into(),
                content: None,
                buttons: Vec::new(),
            },
            FormCallback::new(move |submission| {
                if let Submission::Submitted(FormResponse::Menu(label)) = submission {
                    responder.resolve(label);
                }
            }),
        );
        assert_eq!(transport.pending(), 1);

        let parked = transport.recv_form().await;
        assert_eq!(parked.identity.username, "alex");
        parked.submit(FormResponse::Menu("Spawn".into()));
        assert_eq!(pending.outcome().await, Ok("Spawn".to_string()));
        assert_eq!(transport.pending(), 0);
    }
}
