use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio::{
	sync::{Semaphore, mpsc, oneshot},
	time::{self, Instant},
};

use crate::{Error, Result};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// FIFO task queue with a concurrency ceiling and a minimum gap between task starts.
///
/// The gap is measured start to start. A finishing task frees its slot immediately, so the next
/// queued task starts as soon as both the slot and the gap allow.
#[derive(Clone)]
pub struct TaskLimiter {
	queue: mpsc::UnboundedSender<Job>,
}
impl TaskLimiter {
	/// Spawns the dispatcher onto the current Tokio runtime.
	pub fn new(concurrency: usize, min_delay: Duration) -> Self {
		let (queue, jobs) = mpsc::unbounded_channel();

		tokio::spawn(dispatch(jobs, concurrency.max(1), min_delay));

		Self { queue }
	}

	pub async fn enqueue<F, T>(&self, task: F) -> Result<T>
	where
		F: Future<Output = T> + Send + 'static,
		T: Send + 'static,
	{
		let (done, outcome) = oneshot::channel();
		let job: Job = Box::pin(async move {
			let _ = done.send(task.await);
		});

		self.queue
			.send(job)
			.map_err(|_| Error::Internal { message: "Task limiter is closed.".to_string() })?;

		outcome.await.map_err(|_| Error::Internal {
			message: "Queued task ended without a result.".to_string(),
		})
	}
}

async fn dispatch(mut jobs: mpsc::UnboundedReceiver<Job>, concurrency: usize, gap: Duration) {
	let slots = Arc::new(Semaphore::new(concurrency));
	let mut last_start: Option<Instant> = None;

	while let Some(job) = jobs.recv().await {
		let Ok(slot) = Arc::clone(&slots).acquire_owned().await else {
			break;
		};

		if let Some(last) = last_start {
			time::sleep_until(last + gap).await;
		}

		last_start = Some(Instant::now());

		tokio::spawn(async move {
			job.await;

			drop(slot);
		});
	}
}
