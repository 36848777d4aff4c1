//! Per-entity actors
//!
//! Every stateful game entity owns its state inside a tokio task. Callers
//! never touch that state directly:
//! - Mutations are scheduled as exclusive operations, run one at a time in
//!   submission order
//! - Reads observe the copy the task publishes after each operation, so a
//!   reader never sees a half-applied operation
//! - Outbound notifications are queued for the host and never delivered on
//!   the caller's context

mod notify;

pub use notify::{HostContext, Notification, Notifications, Notifier, host_channel};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Process-unique actor identity, used to tag notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Failure captured from an exclusive operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorFault {
    #[error("actor operation panicked: {0}")]
    Panicked(String),
    #[error("actor is no longer running")]
    Stopped,
}

impl ActorFault {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ActorFault::Panicked(message)
    }
}

/// Response of an exclusive operation: its value, or the fault it raised
pub type ActorResponse<T> = Result<T, ActorFault>;

type Deferred = Pin<Box<dyn Future<Output = ActorResponse<()>> + Send + 'static>>;

/// Operation result together with sub-operations scheduled on other actors.
///
/// The owning actor waits for every joined sub-operation before it publishes
/// its state, replies, or starts its next operation.
pub struct Joined<R> {
    value: R,
    deferred: Vec<Deferred>,
}

impl<R> Joined<R> {
    /// A result with nothing to wait for
    pub fn ready(value: R) -> Self {
        Self {
            value,
            deferred: Vec::new(),
        }
    }

    /// Wait for `pending` before the operation completes. Its value is
    /// discarded; its fault becomes the operation's fault.
    pub fn join<T: Send + 'static>(&mut self, pending: Pending<T>) {
        self.deferred
            .push(Box::pin(async move { pending.await.map(|_| ()) }));
    }

    async fn settle(self) -> ActorResponse<R> {
        let Joined { value, deferred } = self;
        let mut fault = None;
        for sub_operation in deferred {
            if let Err(err) = sub_operation.await {
                fault.get_or_insert(err);
            }
        }
        match fault {
            Some(fault) => Err(fault),
            None => Ok(value),
        }
    }
}

/// Handle to the response of a scheduled operation.
///
/// Dropping it does not cancel the operation.
pub struct Pending<R> {
    reply: oneshot::Receiver<ActorResponse<R>>,
}

impl<R> Future for Pending<R> {
    type Output = ActorResponse<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ActorFault::Stopped)))
    }
}

impl<R> fmt::Debug for Pending<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

type Reply = Box<dyn FnOnce() + Send>;
type Settlement = Pin<Box<dyn Future<Output = Reply> + Send>>;

trait Operation<S>: Send {
    fn apply(self: Box<Self>, state: &mut S, notifier: &Notifier) -> Settlement;
}

struct Exclusive<F, R> {
    op: F,
    reply: oneshot::Sender<ActorResponse<R>>,
}

impl<S, F, R> Operation<S> for Exclusive<F, R>
where
    F: FnOnce(&mut S, &Notifier) -> Joined<R> + Send,
    R: Send + 'static,
{
    fn apply(self: Box<Self>, state: &mut S, notifier: &Notifier) -> Settlement {
        let Exclusive { op, reply } = *self;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(state, notifier)));
        Box::pin(async move {
            let response = match outcome {
                Ok(joined) => joined.settle().await,
                Err(payload) => Err(ActorFault::from_panic(payload)),
            };
            Box::new(move || {
                // The caller may have dropped its handle
                let _ = reply.send(response);
            }) as Reply
        })
    }
}

type Job<S> = Box<dyn Operation<S>>;

/// Handle to an actor owning a value of type `S`.
///
/// Handles are cheap to clone; the actor task ends once every handle is
/// dropped and its queue has drained.
pub struct Actor<S> {
    jobs: mpsc::UnboundedSender<Job<S>>,
    published: watch::Receiver<S>,
    notifier: Notifier,
}

impl<S> Clone for Actor<S> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            published: self.published.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S> fmt::Debug for Actor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.notifier.source())
            .finish_non_exhaustive()
    }
}

impl<S> Actor<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Spawn the actor task. Must be called from within a tokio runtime.
    pub fn spawn(state: S, host: &HostContext) -> Self {
        let id = ActorId::next();
        let notifier = host.bind(id);
        let (jobs, queue) = mpsc::unbounded_channel();
        let (publisher, published) = watch::channel(state.clone());

        tokio::spawn(drive(state, queue, publisher, notifier.clone()));

        Self {
            jobs,
            published,
            notifier,
        }
    }

    /// Schedule an operation with exclusive access to the actor's state
    pub fn exclusive<R, F>(&self, op: F) -> Pending<R>
    where
        F: FnOnce(&mut S, &Notifier) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.exclusive_joined(move |state, notifier| Joined::ready(op(state, notifier)))
    }

    /// Schedule an operation that also waits on sub-operations of other actors
    pub fn exclusive_joined<R, F>(&self, op: F) -> Pending<R>
    where
        F: FnOnce(&mut S, &Notifier) -> Joined<R> + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        if self.jobs.send(Box::new(Exclusive { op, reply })).is_err() {
            log::debug!("{} rejected an operation after shutdown", self.id());
        }
        Pending { reply: response }
    }

    /// Read the state published after the latest completed operation
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.published.borrow())
    }

    /// Copy of the state published after the latest completed operation
    pub fn snapshot(&self) -> S {
        self.published.borrow().clone()
    }
}

impl<S> Actor<S> {
    pub fn id(&self) -> ActorId {
        self.notifier.source()
    }

    /// Notification sender bound to this actor
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

async fn drive<S>(
    mut state: S,
    mut queue: mpsc::UnboundedReceiver<Job<S>>,
    publisher: watch::Sender<S>,
    notifier: Notifier,
) where
    S: Clone + Send + Sync + 'static,
{
    while let Some(job) = queue.recv().await {
        let reply = job.apply(&mut state, &notifier).await;
        publisher.send_replace(state.clone());
        reply();
    }
    log::trace!("{} stopped", notifier.source());
}
