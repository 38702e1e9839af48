//! Per-attempt deadlines and caller cancellation.
//!
//! [`bounded`] runs one physical attempt under a fresh deadline and aborts it early when the
//! caller's [`CancellationToken`] fires; cancellation wins over an expiring deadline. [`pause`]
//! is the cancellation-aware sleep used between retry attempts. Neither helper keeps state
//! across calls, so every retry starts with the full timeout window.

// self
use crate::_prelude::*;

/// Reason an attempt ended before its future resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
	/// The deadline expired; carries the timeout that was applied.
	TimedOut(Duration),
	/// The caller's cancellation token fired.
	Cancelled,
}

/// Drives `fut` to completion unless `timeout` elapses or `signal` is cancelled first.
///
/// The future is dropped on interruption, which aborts any in-flight network operation it owns.
pub async fn bounded<F>(
	timeout: Duration,
	signal: Option<&CancellationToken>,
	fut: F,
) -> Result<F::Output, Interrupt>
where
	F: Future,
{
	let deadline = tokio::time::timeout(timeout, fut);

	match signal {
		Some(signal) => {
			if signal.is_cancelled() {
				return Err(Interrupt::Cancelled);
			}

			tokio::select! {
				biased;
				_ = signal.cancelled() => Err(Interrupt::Cancelled),
				outcome = deadline => outcome.map_err(|_| Interrupt::TimedOut(timeout)),
			}
		},
		None => deadline.await.map_err(|_| Interrupt::TimedOut(timeout)),
	}
}

/// Sleeps for `delay`, returning [`Interrupt::Cancelled`] as soon as `signal` fires.
pub async fn pause(delay: Duration, signal: Option<&CancellationToken>) -> Result<(), Interrupt> {
	match signal {
		Some(signal) => tokio::select! {
			biased;
			_ = signal.cancelled() => Err(Interrupt::Cancelled),
			_ = tokio::time::sleep(delay) => Ok(()),
		},
		None => {
			tokio::time::sleep(delay).await;

			Ok(())
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn completes_before_deadline() {
		let outcome = bounded(Duration::from_millis(100), None, async { 7 }).await;

		assert_eq!(outcome, Ok(7));
	}

	#[tokio::test(start_paused = true)]
	async fn expires_with_applied_timeout() {
		let outcome = bounded(
			Duration::from_millis(100),
			None,
			tokio::time::sleep(Duration::from_secs(5)),
		)
		.await;

		assert_eq!(outcome, Err(Interrupt::TimedOut(Duration::from_millis(100))));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_wins_over_deadline() {
		let signal = CancellationToken::new();
		let trigger = signal.clone();

		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(10)).await;
			trigger.cancel();
		});

		let outcome = bounded(
			Duration::from_secs(30),
			Some(&signal),
			tokio::time::sleep(Duration::from_secs(60)),
		)
		.await;

		assert_eq!(outcome, Err(Interrupt::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn already_cancelled_signal_short_circuits() {
		let signal = CancellationToken::new();

		signal.cancel();

		assert_eq!(
			bounded(Duration::from_secs(1), Some(&signal), async { 1 }).await,
			Err(Interrupt::Cancelled)
		);
		assert_eq!(pause(Duration::from_secs(1), Some(&signal)).await, Err(Interrupt::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn pause_waits_full_delay() {
		let started = tokio::time::Instant::now();

		pause(Duration::from_millis(250), None).await.expect("Uncancelled pause should finish.");

		assert!(started.elapsed() >= Duration::from_millis(250));
	}
}
