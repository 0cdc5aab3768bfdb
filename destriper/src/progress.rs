//! Progress and event reporting for pipeline runs.

use common::SharedFn;
use parking_lot::Mutex;
use strum_macros::Display;

/// Sub-task of one band, each carrying a fixed share of the band's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    ForwardScan,
    BackwardScan,
    Consensus,
    Outputs,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::ForwardScan,
        Phase::BackwardScan,
        Phase::Consensus,
        Phase::Outputs,
    ];

    /// Share of the band in percent. The weights add up to 100.
    pub fn weight(self) -> u32 {
        match self {
            Phase::ForwardScan => 30,
            Phase::BackwardScan => 30,
            Phase::Consensus => 10,
            Phase::Outputs => 30,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Integer percentages of the current band and of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub band: u8,
    pub run: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PipelineState {
    Idle,
    Scanning { band: usize },
    Correcting { band: usize },
    WritingOutputs { band: usize },
    Done,
    Stopped { band: usize },
}

/// Everything a run reports to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateChanged(PipelineState),
    BandStarted { band: usize },
    BandFinished { band: usize, faults: usize },
    Progress(Progress),
    /// Human-readable log line.
    Log(String),
}

/// Callback receiving pipeline events. May be called from worker threads.
pub type EventCallback = SharedFn<dyn Fn(&PipelineEvent) + Send + Sync>;

#[derive(Debug, Default)]
struct TrackerState {
    completed_bands: usize,
    /// Completed fraction of each phase of the current band.
    phases: [f64; 4],
    reported: Progress,
}

/// Combines phase progress into band and run percentages.
///
/// Shared by reference with both scanners. Updates may arrive out of order;
/// reported percentages never go down, except the band percentage restarting
/// at the next band. Events are emitted under the lock so they reach the
/// callback in order, which means the callback must not call back into the
/// tracker.
#[derive(Debug)]
pub struct ProgressTracker {
    band_count: usize,
    events: EventCallback,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(band_count: usize, events: EventCallback) -> Self {
        Self {
            band_count,
            events,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn current(&self) -> Progress {
        self.state.lock().reported
    }

    /// Resets phase progress for the next band.
    pub fn start_band(&self) {
        let mut state = self.state.lock();
        state.phases = [0.0; 4];
        state.reported.band = 0;
    }

    /// Records `done` of `total` steps of `phase`. An empty phase is complete.
    pub fn update(&self, phase: Phase, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };

        let mut state = self.state.lock();
        let slot = &mut state.phases[phase.index()];
        *slot = slot.max(fraction);
        self.publish(&mut state);
    }

    pub fn complete(&self, phase: Phase) {
        self.update(phase, 1, 1);
    }

    /// Marks the current band as done.
    pub fn finish_band(&self) {
        let mut state = self.state.lock();
        state.phases = [1.0; 4];
        self.publish(&mut state);
        state.completed_bands += 1;
        state.phases = [0.0; 4];
    }

    /// Reports the run as fully done.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        state.completed_bands = self.band_count;
        state.phases = [1.0; 4];
        self.publish(&mut state);
    }

    fn publish(&self, state: &mut TrackerState) {
        let band_value: f64 = Phase::ALL
            .iter()
            .map(|&p| p.weight() as f64 * state.phases[p.index()])
            .sum();
        let run_value = if self.band_count == 0 {
            100.0
        } else {
            (state.completed_bands as f64 * 100.0 + band_value) / self.band_count as f64
        };

        let next = Progress {
            band: state.reported.band.max(to_percent(band_value)),
            run: state.reported.run.max(to_percent(run_value)),
        };
        if next != state.reported {
            state.reported = next;
            self.events.emit(&PipelineEvent::Progress(next));
        }
    }
}

fn to_percent(value: f64) -> u8 {
    value.floor().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recording() -> (EventCallback, Arc<Mutex<Vec<Progress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: EventCallback = SharedFn::new(Arc::new(move |event: &PipelineEvent| {
            if let PipelineEvent::Progress(p) = event {
                sink.lock().push(*p);
            }
        }));
        (callback, seen)
    }

    #[test]
    fn weights_add_up_to_one_hundred() {
        let total: u32 = Phase::ALL.iter().map(|p| p.weight()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn phases_combine_into_band_and_run() {
        let (callback, _) = recording();
        let tracker = ProgressTracker::new(2, callback);

        tracker.start_band();
        tracker.update(Phase::ForwardScan, 5, 10);
        assert_eq!(tracker.current(), Progress { band: 15, run: 7 });

        tracker.complete(Phase::ForwardScan);
        tracker.complete(Phase::BackwardScan);
        tracker.complete(Phase::Consensus);
        assert_eq!(tracker.current(), Progress { band: 70, run: 35 });

        tracker.finish_band();
        assert_eq!(tracker.current(), Progress { band: 100, run: 50 });
    }

    #[test]
    fn late_updates_never_lower_progress() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(1, callback);

        tracker.start_band();
        tracker.update(Phase::BackwardScan, 8, 10);
        tracker.update(Phase::BackwardScan, 3, 10);
        assert_eq!(tracker.current().band, 24);

        let emitted = seen.lock().clone();
        assert_eq!(emitted, vec![Progress { band: 24, run: 24 }]);
    }

    #[test]
    fn events_only_on_increase() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(4, callback);

        tracker.start_band();
        // 30 * 1/1000 rounds down to zero
        tracker.update(Phase::ForwardScan, 1, 1000);
        assert!(seen.lock().is_empty());

        tracker.update(Phase::ForwardScan, 100, 1000);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn band_restarts_while_run_keeps_growing() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(2, callback);

        tracker.start_band();
        tracker.finish_band();
        tracker.start_band();
        assert_eq!(tracker.current(), Progress { band: 0, run: 50 });

        tracker.update(Phase::ForwardScan, 1, 1);
        assert_eq!(tracker.current(), Progress { band: 30, run: 65 });

        tracker.finish();
        assert_eq!(tracker.current(), Progress { band: 100, run: 100 });

        let runs: Vec<u8> = seen.lock().iter().map(|p| p.run).collect();
        assert!(runs.windows(2).all(|w| w[0] <= w[1]), "{runs:?}");
        assert_eq!(runs.last(), Some(&100));
    }

    #[test]
    fn empty_phase_counts_as_complete() {
        let tracker = ProgressTracker::new(1, EventCallback::default());
        tracker.start_band();
        tracker.update(Phase::Consensus, 0, 0);
        assert_eq!(tracker.current().band, 10);
    }

    #[test]
    fn concurrent_scanners_report_monotonic_run() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(1, callback);
        tracker.start_band();

        std::thread::scope(|s| {
            for phase in [Phase::ForwardScan, Phase::BackwardScan] {
                let tracker = &tracker;
                s.spawn(move || {
                    for done in 1..=200 {
                        tracker.update(phase, done, 200);
                    }
                });
            }
        });

        assert_eq!(tracker.current(), Progress { band: 60, run: 60 });
        let emitted = seen.lock().clone();
        assert!(emitted.windows(2).all(|w| w[0].run < w[1].run || w[0].band < w[1].band));
        assert!(emitted.windows(2).all(|w| w[0].run <= w[1].run));
    }
}
