//! Countdown scheduler background task

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::{
    state::{AppState, TimerState},
    timer::{CountdownCore, Tick},
};

/// A request to restart the countdown from a fresh duration spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmRequest {
    pub spec: String,
    pub running: bool,
}

/// Tick-loop tuning, taken from the widget configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub interval_ms: u64,
    pub show_minutes: bool,
    pub show_hours: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            interval_ms: crate::timer::DEFAULT_INTERVAL_MS,
            show_minutes: true,
            show_hours: false,
        }
    }
}

/// Background task that runs the drift-corrected countdown loop.
///
/// The optional deadline below is the scheduler's single pending timeout
/// handle: re-arming clears it before anything else, so no two deferred
/// ticks can ever be live at once. Completion sends on `complete_tx`
/// exactly once per armed run and leaves the loop idle until the next arm.
pub async fn countdown_task(
    state: Arc<AppState>,
    mut arm_rx: mpsc::Receiver<ArmRequest>,
    complete_tx: mpsc::Sender<()>,
    options: SchedulerOptions,
) {
    info!("Starting countdown scheduler task");

    let mut core = CountdownCore::new(options.interval_ms, options.show_minutes, options.show_hours);
    let mut deadline: Option<Instant> = None;

    loop {
        let pending_tick = {
            let deadline = deadline;
            async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            }
        };

        tokio::select! {
            request = arm_rx.recv() => match request {
                Some(request) => {
                    // Cancel any outstanding tick before touching the core.
                    deadline = None;
                    let remaining = core.arm(&request.spec);
                    debug!(
                        "Re-armed countdown: spec={:?} running={} remaining={}ms",
                        request.spec, request.running, remaining
                    );
                    if request.running {
                        // First tick fires immediately, with zero elapsed.
                        deadline = Some(Instant::now());
                    }
                    state.publish_timer_state(TimerState {
                        remaining_ms: remaining,
                        running: request.running,
                        display: core.render(),
                    });
                }
                None => {
                    info!("Arm channel closed, stopping countdown task");
                    break;
                }
            },
            _ = pending_tick => {
                let now = Instant::now();
                match core.tick(now.into_std()) {
                    Tick::Complete => {
                        deadline = None;
                        info!("Countdown complete");
                        state.publish_timer_state(TimerState {
                            remaining_ms: 0,
                            running: false,
                            display: core.render(),
                        });
                        if complete_tx.send(()).await.is_err() {
                            warn!("No consumer for completion signal");
                        }
                    }
                    Tick::Continue { remaining_ms, next_wait } => {
                        deadline = Some(now + next_wait);
                        state.publish_timer_state(TimerState {
                            remaining_ms,
                            running: true,
                            display: core.render(),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ControlState;
    use std::time::Duration;

    fn arm(spec: &str, running: bool) -> ArmRequest {
        ArmRequest {
            spec: spec.to_string(),
            running,
        }
    }

    async fn next_snapshot(rx: &mut tokio::sync::watch::Receiver<TimerState>) -> TimerState {
        rx.changed().await.unwrap();
        rx.borrow_and_update().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_down_and_completes_once() {
        let state = Arc::new(AppState::new(ControlState::new()));
        let (arm_tx, arm_rx) = mpsc::channel(16);
        let (complete_tx, mut complete_rx) = mpsc::channel(16);
        let mut timer_rx = state.subscribe_timer();
        timer_rx.borrow_and_update();

        tokio::spawn(countdown_task(
            Arc::clone(&state),
            arm_rx,
            complete_tx,
            SchedulerOptions::default(),
        ));

        arm_tx.send(arm("2", true)).await.unwrap();

        // Collect snapshots until the terminal (non-running) one. The arm
        // snapshot and the immediate first tick may coalesce on the watch
        // channel; both carry the full 2000ms.
        let mut seen = Vec::new();
        loop {
            let snapshot = next_snapshot(&mut timer_rx).await;
            let done = !snapshot.is_running();
            seen.push(snapshot);
            if done {
                break;
            }
        }

        assert_eq!(seen.first().unwrap().remaining_ms, 2000);
        let penultimate = &seen[seen.len() - 2];
        assert_eq!(penultimate.remaining_ms, 1000);
        assert_eq!(penultimate.display, "00:01");
        let terminal = seen.last().unwrap();
        assert_eq!(terminal.remaining_ms, 0);
        assert_eq!(terminal.display, "00:00");

        complete_rx.recv().await.unwrap();
        // No further ticks or completions after the terminal one.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(complete_rx.try_recv().is_err());
        assert!(!timer_rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_cancels_the_pending_tick() {
        let state = Arc::new(AppState::new(ControlState::new()));
        let (arm_tx, arm_rx) = mpsc::channel(16);
        let (complete_tx, mut complete_rx) = mpsc::channel(16);
        let mut timer_rx = state.subscribe_timer();
        timer_rx.borrow_and_update();

        tokio::spawn(countdown_task(
            Arc::clone(&state),
            arm_rx,
            complete_tx,
            SchedulerOptions::default(),
        ));

        // Two arms back to back leave exactly one pending tick.
        arm_tx.send(arm("1", true)).await.unwrap();
        arm_tx.send(arm("30", true)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        // The one-second run was cancelled before it could complete.
        assert!(complete_rx.try_recv().is_err());
        let snapshot = state.get_timer_state();
        assert!(snapshot.is_running());
        assert!(snapshot.remaining_ms > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn arming_stopped_schedules_nothing() {
        let state = Arc::new(AppState::new(ControlState::new()));
        let (arm_tx, arm_rx) = mpsc::channel(16);
        let (complete_tx, mut complete_rx) = mpsc::channel(16);

        tokio::spawn(countdown_task(
            Arc::clone(&state),
            arm_rx,
            complete_tx,
            SchedulerOptions::default(),
        ));

        arm_tx.send(arm("2", false)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snapshot = state.get_timer_state();
        assert_eq!(snapshot.remaining_ms, 2000);
        assert!(!snapshot.is_running());
        assert!(complete_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_completes_after_one_real_tick() {
        let state = Arc::new(AppState::new(ControlState::new()));
        let (arm_tx, arm_rx) = mpsc::channel(16);
        let (complete_tx, mut complete_rx) = mpsc::channel(16);

        tokio::spawn(countdown_task(
            Arc::clone(&state),
            arm_rx,
            complete_tx,
            SchedulerOptions::default(),
        ));

        arm_tx.send(arm("0", true)).await.unwrap();
        // Completion only fires once a real tick has elapsed, never
        // synchronously on arm.
        tokio::task::yield_now().await;
        assert!(complete_rx.try_recv().is_err());

        complete_rx.recv().await.unwrap();
        assert_eq!(state.get_timer_state().display, "00:00");
    }
}
