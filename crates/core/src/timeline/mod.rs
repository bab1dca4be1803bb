use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{select, Sender};

use crate::{Result, SoundPainterError};

/// Outcome of a loop once it has been stopped.
#[derive(Debug)]
pub struct LoopReport<S> {
    /// State the loop owned, handed back to the caller.
    pub state: S,
    pub ticks: u64,
    pub failures: u64,
}

/// Runs a callback at a fixed rate on its own thread until told to stop.
///
/// Every received tick performs exactly one call. A failing call is logged
/// and counted, and the loop carries on; errors never leave the loop's
/// thread.
#[derive(Debug, Clone)]
pub struct FixedRateLoop {
    name: String,
    period: Duration,
}

impl FixedRateLoop {
    pub fn new(name: impl Into<String>, rate_hz: f32) -> Result<Self> {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(SoundPainterError::InvalidInput("loop rate must be positive"));
        }
        Ok(Self {
            name: name.into(),
            period: Duration::from_secs_f32(1.0 / rate_hz),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn spawn<S, F>(self, state: S, mut tick: F) -> Result<LoopHandle<S>>
    where
        S: Send + 'static,
        F: FnMut(&mut S) -> Result<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let name = self.name.clone();
        let period = self.period;

        let join = thread::Builder::new().name(name.clone()).spawn(move || {
            let ticker = crossbeam_channel::tick(period);
            let mut state = state;
            let mut ticks = 0u64;
            let mut failures = 0u64;

            tracing::debug!(loop_name = %name, ?period, "loop started");
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        ticks += 1;
                        if let Err(err) = tick(&mut state) {
                            failures += 1;
                            tracing::warn!(loop_name = %name, ticks, %err, "tick failed");
                        }
                    }
                }
            }
            tracing::debug!(loop_name = %name, ticks, failures, "loop stopped");

            LoopReport {
                state,
                ticks,
                failures,
            }
        })?;

        Ok(LoopHandle {
            name: self.name,
            stop: Some(stop_tx),
            join: Some(join),
        })
    }
}

/// Owner of a running [`FixedRateLoop`]. Dropping it stops the loop.
#[derive(Debug)]
pub struct LoopHandle<S> {
    name: String,
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<LoopReport<S>>>,
}

impl<S> LoopHandle<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop thread is still alive.
    pub fn is_running(&self) -> bool {
        self.join
            .as_ref()
            .map(|join| !join.is_finished())
            .unwrap_or(false)
    }

    /// Signals the loop, waits for its current tick to finish and returns
    /// its report.
    pub fn stop(mut self) -> Result<LoopReport<S>> {
        self.signal();
        let join = self
            .join
            .take()
            .ok_or(SoundPainterError::InvalidInput("loop already stopped"))?;
        join.join()
            .map_err(|_| SoundPainterError::msg(format!("loop `{}` panicked", self.name)))
    }

    fn signal(&mut self) {
        if let Some(stop) = self.stop.take() {
            // A closed channel means the thread is already gone.
            let _ = stop.try_send(());
        }
    }
}

impl<S> Drop for LoopHandle<S> {
    fn drop(&mut self) {
        self.signal();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!(loop_name = %self.name, "loop panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_rates() {
        assert!(FixedRateLoop::new("bad", 0.0).is_err());
        assert!(FixedRateLoop::new("bad", f32::NAN).is_err());
    }

    #[test]
    fn ticks_until_stopped_and_returns_state() {
        let handle = FixedRateLoop::new("counter", 500.0)
            .unwrap()
            .spawn(0u32, |count| {
                *count += 1;
                Ok(())
            })
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(handle.is_running());

        let report = handle.stop().unwrap();
        assert!(report.ticks > 0);
        assert_eq!(u64::from(report.state), report.ticks);
        assert_eq!(report.failures, 0);
    }

    #[test]
    fn failing_ticks_do_not_end_the_loop() {
        let handle = FixedRateLoop::new("flaky", 500.0)
            .unwrap()
            .spawn(0u32, |count| {
                *count += 1;
                if *count % 2 == 0 {
                    Err(SoundPainterError::msg("even tick"))
                } else {
                    Ok(())
                }
            })
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        let report = handle.stop().unwrap();
        assert!(report.ticks >= 2);
        assert_eq!(report.failures, report.ticks / 2);
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = FixedRateLoop::new("dropped", 500.0)
            .unwrap()
            .spawn(tx, |tx| {
                let _ = tx.send(());
                Ok(())
            })
            .unwrap();

        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        drop(handle);

        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
