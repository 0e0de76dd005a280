//! Single-flight FIFO request queue.
//!
//! Every enqueued action runs on one consumer task, strictly one after another in enqueue
//! order. A slow or retrying request therefore delays everything queued behind it.

// std
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
// crates.io
use tokio::{
	runtime::Handle,
	sync::{mpsc, oneshot},
};
// self
use crate::_prelude::*;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Default)]
struct QueueState {
	busy: AtomicBool,
	pending: AtomicUsize,
}

/// FIFO of pending request actions drained by a single consumer.
///
/// The consumer task starts on the first [`RequestQueue::enqueue`] and is restarted if it ever
/// stops (for example after its runtime shut down). Dropping the queue lets the consumer finish
/// the actions already queued and exit.
#[derive(Debug, Default)]
pub struct RequestQueue {
	sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
	state: Arc<QueueState>,
}
impl RequestQueue {
	/// Creates an idle queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `action` and returns a future settled with its outcome.
	///
	/// The action is queued immediately, before the returned future is first polled, so call
	/// order defines execution order. Resolves to [`Error::QueueClosed`] when no Tokio runtime
	/// is available or the consumer stopped before settling the action.
	pub fn enqueue<F, Fut, T>(
		&self,
		action: F,
	) -> impl Future<Output = Result<T>> + Send + use<F, Fut, T>
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<T>>,
		T: 'static + Send,
	{
		let (tx, rx) = oneshot::channel();
		let job: Job = Box::pin(async move {
			let _ = tx.send(action().await);
		});
		let accepted = self.submit(job);

		async move {
			if !accepted {
				return Err(Error::QueueClosed);
			}

			rx.await.unwrap_or(Err(Error::QueueClosed))
		}
	}

	/// Returns `true` while an action is executing.
	pub fn is_busy(&self) -> bool {
		self.state.busy.load(Ordering::Acquire)
	}

	/// Returns the number of actions waiting to start.
	pub fn pending(&self) -> usize {
		self.state.pending.load(Ordering::Acquire)
	}

	fn submit(&self, job: Job) -> bool {
		let mut sender = self.sender.lock();

		if sender.as_ref().is_none_or(|tx| tx.is_closed()) {
			let Ok(handle) = Handle::try_current() else {
				return false;
			};
			let (tx, rx) = mpsc::unbounded_channel();

			handle.spawn(drain(rx, self.state.clone()));
			*sender = Some(tx);
		}

		let Some(tx) = sender.as_ref() else {
			return false;
		};

		self.state.pending.fetch_add(1, Ordering::AcqRel);

		if tx.send(job).is_err() {
			self.state.pending.fetch_sub(1, Ordering::AcqRel);

			return false;
		}

		true
	}
}

async fn drain(mut rx: mpsc::UnboundedReceiver<Job>, state: Arc<QueueState>) {
	while let Some(job) = rx.recv().await {
		state.pending.fetch_sub(1, Ordering::AcqRel);
		state.busy.store(true, Ordering::Release);
		job.await;
		state.busy.store(false, Ordering::Release);
	}
}
