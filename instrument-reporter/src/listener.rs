// Copyright (c) The instrument-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-run protocol state machine.

use crate::{
    device::DeviceInfo,
    errors::{ConfigurationError, HandleEventError},
    events::{RunEvent, TestIdentifier},
    results::{RunResult, SuiteResult, TestOutcome, TestResult},
    stopwatch::{StopwatchStart, stopwatch},
    writer::ReportSink,
};
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static MISSING_START_TRACE: &str = "missing start event";
static RUN_ENDED_EARLY_TRACE: &str = "test run ended before test completed";

/// Consumes the ordered event stream of one device/run pair.
///
/// Driven synchronously by the event source; a listener is never shared
/// between devices. Protocol violations are downgraded to warnings plus
/// best-effort synthetic records so a malformed stream never aborts the run;
/// the synthesized records stay visible in the report.
///
/// When the run-ended event arrives the aggregate is sealed into a
/// [`RunResult`] and pushed into the injected [`ReportSink`].
#[derive(Debug)]
pub struct RunListener<S> {
    device: DeviceInfo,
    sink: S,
    state: RunState,
}

#[derive(Debug)]
enum RunState {
    Idle,
    Running(RunInProgress),
    Ended(RunResult),
}

#[derive(Debug)]
struct RunInProgress {
    name: String,
    expected_count: usize,
    stopwatch: StopwatchStart,
    suites: IndexMap<String, SuiteInProgress>,
    run_error: Option<String>,
}

impl RunInProgress {
    fn new(name: String, expected_count: usize) -> Self {
        Self {
            name,
            expected_count,
            stopwatch: stopwatch(),
            suites: IndexMap::new(),
            run_error: None,
        }
    }

    /// Looks up the started-but-not-finalized case for `id`, if any.
    fn open_case_mut(&mut self, id: &TestIdentifier) -> Option<&mut CaseInProgress> {
        self.suites
            .get_mut(&id.class_name)?
            .cases
            .iter_mut()
            .rev()
            .find(|case| &case.id == id && !case.is_finalized())
    }

    fn recorded_cases(&self) -> usize {
        self.suites.values().map(|suite| suite.cases.len()).sum()
    }
}

#[derive(Debug, Default)]
struct SuiteInProgress {
    cases: Vec<CaseInProgress>,
}

#[derive(Debug)]
struct CaseInProgress {
    id: TestIdentifier,
    outcome: TestOutcome,
    trace: Option<String>,
    started_at: Instant,
    // Some once the case is finalized.
    elapsed: Option<Duration>,
    metrics: IndexMap<String, String>,
}

impl CaseInProgress {
    fn started(id: TestIdentifier) -> Self {
        Self {
            id,
            outcome: TestOutcome::Passed,
            trace: None,
            started_at: Instant::now(),
            elapsed: None,
            metrics: IndexMap::new(),
        }
    }

    /// A finalized failure standing in for a case that was never started.
    fn missing_start(id: TestIdentifier, metrics: IndexMap<String, String>) -> Self {
        Self {
            id,
            outcome: TestOutcome::Failed,
            trace: Some(MISSING_START_TRACE.to_owned()),
            started_at: Instant::now(),
            elapsed: Some(Duration::ZERO),
            metrics,
        }
    }

    fn is_finalized(&self) -> bool {
        self.elapsed.is_some()
    }

    fn into_result(self) -> TestResult {
        TestResult {
            id: self.id,
            outcome: self.outcome,
            trace: self.trace,
            elapsed: self.elapsed.unwrap_or(Duration::ZERO),
            metrics: self.metrics,
        }
    }
}

impl<S: ReportSink> RunListener<S> {
    /// Creates a listener for one run on the given device, reporting into
    /// `sink` when the run ends.
    pub fn new(device: DeviceInfo, sink: S) -> Self {
        Self {
            device,
            sink,
            state: RunState::Idle,
        }
    }

    /// The device this listener is bound to.
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// The sealed result of the most recently finished run, if any.
    pub fn finished_run(&self) -> Option<&RunResult> {
        match &self.state {
            RunState::Ended(run) => Some(run),
            _ => None,
        }
    }

    /// Feeds one event through the state machine.
    ///
    /// Returns an error only for rejected run parameters and for report-write
    /// failures; protocol violations are logged and recovered from locally.
    pub fn handle_event(&mut self, event: RunEvent) -> Result<(), HandleEventError> {
        match event {
            RunEvent::RunStarted {
                name,
                expected_count,
            } => self.run_started(name, expected_count)?,
            RunEvent::TestStarted { id } => self.test_started(id),
            RunEvent::TestFailed { id, trace } => {
                self.record_outcome(id, TestOutcome::Failed, trace);
            }
            RunEvent::TestAssumptionFailed { id, trace } => {
                self.record_outcome(id, TestOutcome::AssumptionFailed, trace);
            }
            RunEvent::TestIgnored { id } => self.test_ignored(id),
            RunEvent::TestEnded { id, metrics } => self.test_ended(id, metrics),
            RunEvent::RunFailed { message } => self.run_failed(message),
            RunEvent::RunEnded { elapsed, metrics } => self.run_ended(elapsed, metrics)?,
        }
        Ok(())
    }

    fn run_started(&mut self, name: String, expected_count: i64) -> Result<(), ConfigurationError> {
        if expected_count < 0 {
            return Err(ConfigurationError::new(name, expected_count));
        }
        match &self.state {
            RunState::Running(run) => {
                warn!(
                    "run `{name}` started while run `{}` is still in progress; \
                     keeping the original run",
                    run.name
                );
            }
            RunState::Idle | RunState::Ended(_) => {
                self.state = RunState::Running(RunInProgress::new(name, expected_count as usize));
            }
        }
        Ok(())
    }

    fn test_started(&mut self, id: TestIdentifier) {
        let Some(run) = self.running_mut("test start") else {
            return;
        };
        let suite = run.suites.entry(id.class_name.clone()).or_default();
        let open_slot = suite
            .cases
            .iter()
            .rposition(|case| case.id == id && !case.is_finalized());
        match open_slot {
            Some(slot) => {
                // Duplicate start: the prior incomplete case is discarded in
                // favor of the new one, keeping its arrival position.
                warn!("test {id} started twice without ending; discarding the incomplete case");
                suite.cases[slot] = CaseInProgress::started(id);
            }
            None => suite.cases.push(CaseInProgress::started(id)),
        }
    }

    fn record_outcome(&mut self, id: TestIdentifier, outcome: TestOutcome, trace: String) {
        let Some(run) = self.running_mut("test outcome") else {
            return;
        };
        match run.open_case_mut(&id) {
            // Last outcome event wins if several arrive before the end event.
            Some(case) => {
                case.outcome = outcome;
                case.trace = Some(trace);
            }
            None => {
                warn!("outcome {outcome:?} reported for test {id}, which is not running; ignoring");
            }
        }
    }

    fn test_ignored(&mut self, id: TestIdentifier) {
        let Some(run) = self.running_mut("test ignored") else {
            return;
        };
        match run.open_case_mut(&id) {
            Some(case) if case.outcome == TestOutcome::Passed => {
                case.outcome = TestOutcome::Ignored;
            }
            Some(case) => {
                // A reported failure is not erased by a later ignore.
                debug!(
                    "test {id} already has outcome {:?}; not marking it ignored",
                    case.outcome
                );
            }
            None => warn!("test {id} reported ignored but is not running; dropping the event"),
        }
    }

    fn test_ended(&mut self, id: TestIdentifier, metrics: IndexMap<String, String>) {
        let Some(run) = self.running_mut("test end") else {
            return;
        };
        match run.open_case_mut(&id) {
            Some(case) => {
                case.elapsed = Some(case.started_at.elapsed());
                case.metrics.extend(metrics);
            }
            None => {
                warn!("test {id} ended without a start event; recording a synthetic failure");
                run.suites
                    .entry(id.class_name.clone())
                    .or_default()
                    .cases
                    .push(CaseInProgress::missing_start(id, metrics));
            }
        }
    }

    fn run_failed(&mut self, message: String) {
        let Some(run) = self.running_mut("run failure") else {
            return;
        };
        run.run_error = Some(message);
    }

    fn run_ended(
        &mut self,
        elapsed: Duration,
        metrics: IndexMap<String, String>,
    ) -> Result<(), HandleEventError> {
        // An end event on an idle listener opens an implicit run, which is
        // then immediately sealed; an end event after the run already ended
        // is dropped here.
        if self.running_mut("run end").is_none() {
            return Ok(());
        }
        let mut run = match std::mem::replace(&mut self.state, RunState::Idle) {
            RunState::Running(run) => run,
            state => {
                self.state = state;
                return Ok(());
            }
        };

        for suite in run.suites.values_mut() {
            for case in &mut suite.cases {
                if !case.is_finalized() {
                    warn!("test {} was still running when the run ended", case.id);
                    case.outcome = TestOutcome::Failed;
                    case.trace = Some(RUN_ENDED_EARLY_TRACE.to_owned());
                    case.elapsed = Some(case.started_at.elapsed());
                }
            }
        }

        let recorded = run.recorded_cases();
        if recorded != run.expected_count {
            debug!(
                "run `{}`: harness declared {} test(s) but {recorded} were recorded",
                run.name, run.expected_count
            );
        }
        debug!(
            "run `{}` ended after {:?} (harness reported {elapsed:?})",
            run.name,
            run.stopwatch.elapsed()
        );

        // Every suite gets the same property snapshot: device identity
        // followed by the run-level metrics.
        let mut properties: IndexMap<String, String> =
            self.device.report_properties().into_iter().collect();
        properties.extend(
            metrics
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        let suites = run
            .suites
            .into_iter()
            .map(|(class_name, suite)| SuiteResult {
                class_name,
                cases: suite
                    .cases
                    .into_iter()
                    .map(CaseInProgress::into_result)
                    .collect(),
                elapsed,
                properties: properties.clone(),
            })
            .collect();

        let result = RunResult {
            name: run.name,
            expected_count: run.expected_count,
            device: self.device.clone(),
            start_time: run.stopwatch.start_time().fixed_offset(),
            suites,
            elapsed,
            run_error: run.run_error,
            metrics,
        };

        // Seal before writing: a failed write must not lose the aggregate.
        self.state = RunState::Ended(result);
        if let RunState::Ended(result) = &self.state {
            self.sink.write_run(result)?;
        }
        Ok(())
    }

    /// Returns the in-progress run, opening an implicit one for events that
    /// arrive while idle and dropping events that arrive after the end.
    fn running_mut(&mut self, context: &str) -> Option<&mut RunInProgress> {
        match &self.state {
            RunState::Running(_) => {}
            RunState::Idle => {
                warn!("{context} event received before any run started; opening an implicit run");
                self.state = RunState::Running(RunInProgress::new(String::new(), 0));
            }
            RunState::Ended(_) => {
                warn!("{context} event received after the run ended; dropping it");
                return None;
            }
        }
        match &mut self.state {
            RunState::Running(run) => Some(run),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WriteFailures;
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    /// Sink that records every sealed run it receives.
    #[derive(Debug, Default)]
    struct RecordingSink {
        runs: Vec<RunResult>,
    }

    impl ReportSink for RecordingSink {
        fn write_run(&mut self, run: &RunResult) -> Result<(), WriteFailures> {
            self.runs.push(run.clone());
            Ok(())
        }
    }

    /// Sink that always fails, for exercising write-error propagation.
    #[derive(Debug, Default)]
    struct FailingSink;

    impl ReportSink for FailingSink {
        fn write_run(&mut self, _run: &RunResult) -> Result<(), WriteFailures> {
            Err(WriteFailures::new(vec![]))
        }
    }

    fn device() -> DeviceInfo {
        let mut device = DeviceInfo::new("emulator-5554", "Pixel_6_API_33", "Google", "Pixel 6");
        device.add_property("ro.build.version.sdk", "33");
        device
    }

    fn listener() -> RunListener<RecordingSink> {
        RunListener::new(device(), RecordingSink::default())
    }

    fn id(method: &str) -> TestIdentifier {
        TestIdentifier::new("com.example.FooTest", method)
    }

    fn feed(listener: &mut RunListener<RecordingSink>, events: Vec<RunEvent>) {
        for event in events {
            listener.handle_event(event).expect("event accepted");
        }
    }

    fn metrics(entries: std::collections::BTreeMap<&str, &str>) -> IndexMap<String, String> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn pass_fail_ignore_scenario() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 3,
                },
                RunEvent::TestStarted { id: id("passes") },
                RunEvent::TestEnded {
                    id: id("passes"),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestStarted { id: id("fails") },
                RunEvent::TestFailed {
                    id: id("fails"),
                    trace: "boom".to_owned(),
                },
                RunEvent::TestEnded {
                    id: id("fails"),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestStarted { id: id("skips") },
                RunEvent::TestIgnored { id: id("skips") },
                RunEvent::TestEnded {
                    id: id("skips"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(123),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(run.name, "suite");
        assert_eq!(run.expected_count, 3);
        assert_eq!(run.elapsed, Duration::from_millis(123));
        assert_eq!(run.suites.len(), 1);

        let suite = &run.suites[0];
        assert_eq!(suite.class_name, "com.example.FooTest");
        assert_eq!(suite.elapsed, Duration::from_millis(123));
        assert_eq!(suite.tests(), 3);
        assert_eq!(suite.failures(), 1);
        assert_eq!(suite.skipped(), 1);

        let outcomes: Vec<_> = suite
            .cases
            .iter()
            .map(|case| (case.id.method_name.as_str(), case.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ("passes", TestOutcome::Passed),
                ("fails", TestOutcome::Failed),
                ("skips", TestOutcome::Ignored),
            ]
        );
        assert_eq!(suite.cases[1].trace.as_deref(), Some("boom"));

        // The sealed run was pushed into the sink.
        assert_eq!(listener.sink.runs.len(), 1);
    }

    #[test]
    fn end_without_start_synthesizes_failure() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 2,
                },
                RunEvent::TestEnded {
                    id: id("ghost"),
                    metrics: IndexMap::new(),
                },
                // The run keeps processing events normally afterwards.
                RunEvent::TestStarted { id: id("real") },
                RunEvent::TestEnded {
                    id: id("real"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        let suite = &run.suites[0];
        assert_eq!(suite.tests(), 2);
        assert_eq!(suite.cases[0].outcome, TestOutcome::Failed);
        assert_eq!(suite.cases[0].trace.as_deref(), Some("missing start event"));
        assert_eq!(suite.cases[1].outcome, TestOutcome::Passed);
    }

    #[test]
    fn duplicate_start_discards_incomplete_case() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 2,
                },
                RunEvent::TestStarted { id: id("dup") },
                RunEvent::TestFailed {
                    id: id("dup"),
                    trace: "first attempt".to_owned(),
                },
                RunEvent::TestStarted { id: id("other") },
                // Duplicate start: the incomplete first case is replaced in
                // place, so arrival order is preserved.
                RunEvent::TestStarted { id: id("dup") },
                RunEvent::TestEnded {
                    id: id("dup"),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestEnded {
                    id: id("other"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        let suite = &run.suites[0];
        assert_eq!(suite.tests(), 2);
        assert_eq!(suite.cases[0].id.method_name, "dup");
        assert_eq!(suite.cases[1].id.method_name, "other");
        // The replacement case carries none of the discarded attempt's state.
        assert_eq!(suite.cases[0].outcome, TestOutcome::Passed);
        assert_eq!(suite.cases[0].trace, None);
    }

    #[test]
    fn outcome_for_finalized_case_is_ignored() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 1,
                },
                RunEvent::TestStarted { id: id("done") },
                RunEvent::TestEnded {
                    id: id("done"),
                    metrics: IndexMap::new(),
                },
                // Arrives too late to attach to the finalized case.
                RunEvent::TestFailed {
                    id: id("done"),
                    trace: "late".to_owned(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        let case = &run.suites[0].cases[0];
        assert_eq!(case.outcome, TestOutcome::Passed);
        assert_eq!(case.trace, None);
    }

    #[test]
    fn run_end_force_finalizes_open_cases() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 1,
                },
                RunEvent::TestStarted { id: id("hung") },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        let case = &run.suites[0].cases[0];
        assert_eq!(case.outcome, TestOutcome::Failed);
        assert_eq!(
            case.trace.as_deref(),
            Some("test run ended before test completed")
        );
    }

    #[test]
    fn last_outcome_event_wins() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 2,
                },
                RunEvent::TestStarted { id: id("flaky") },
                RunEvent::TestFailed {
                    id: id("flaky"),
                    trace: "hard failure".to_owned(),
                },
                RunEvent::TestAssumptionFailed {
                    id: id("flaky"),
                    trace: "assumed wifi".to_owned(),
                },
                RunEvent::TestEnded {
                    id: id("flaky"),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestStarted { id: id("reversed") },
                RunEvent::TestAssumptionFailed {
                    id: id("reversed"),
                    trace: "assumed sdcard".to_owned(),
                },
                RunEvent::TestFailed {
                    id: id("reversed"),
                    trace: "hard failure".to_owned(),
                },
                RunEvent::TestEnded {
                    id: id("reversed"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        let suite = &run.suites[0];
        assert_eq!(suite.cases[0].outcome, TestOutcome::AssumptionFailed);
        assert_eq!(suite.cases[0].trace.as_deref(), Some("assumed wifi"));
        assert_eq!(suite.cases[1].outcome, TestOutcome::Failed);
        assert_eq!(suite.cases[1].trace.as_deref(), Some("hard failure"));
    }

    #[test]
    fn ignore_does_not_override_failure() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 1,
                },
                RunEvent::TestStarted { id: id("failed") },
                RunEvent::TestFailed {
                    id: id("failed"),
                    trace: "boom".to_owned(),
                },
                RunEvent::TestIgnored { id: id("failed") },
                RunEvent::TestEnded {
                    id: id("failed"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(run.suites[0].cases[0].outcome, TestOutcome::Failed);
    }

    #[test]
    fn negative_expected_count_is_rejected() {
        let mut listener = listener();
        let err = listener
            .handle_event(RunEvent::RunStarted {
                name: "bad".to_owned(),
                expected_count: -1,
            })
            .expect_err("negative count rejected");
        assert!(matches!(err, HandleEventError::Config(_)));

        // The listener is still idle and accepts a well-formed run.
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "good".to_owned(),
                    expected_count: 0,
                },
                RunEvent::RunEnded {
                    elapsed: Duration::ZERO,
                    metrics: IndexMap::new(),
                },
            ],
        );
        assert_eq!(listener.finished_run().expect("run sealed").name, "good");
    }

    #[test]
    fn run_failure_message_is_recorded() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 0,
                },
                RunEvent::RunFailed {
                    message: "Instrumentation run failed due to 'Process crashed.'".to_owned(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(
            run.run_error.as_deref(),
            Some("Instrumentation run failed due to 'Process crashed.'")
        );
    }

    #[test]
    fn events_after_run_end_are_dropped() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 0,
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestStarted { id: id("late") },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(99),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(run.total_tests(), 0);
        assert_eq!(run.elapsed, Duration::from_millis(10));
        assert_eq!(listener.sink.runs.len(), 1);
    }

    #[test]
    fn second_run_start_keeps_original_run() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "first".to_owned(),
                    expected_count: 0,
                },
                RunEvent::RunStarted {
                    name: "second".to_owned(),
                    expected_count: 5,
                },
                RunEvent::RunEnded {
                    elapsed: Duration::ZERO,
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(run.name, "first");
        assert_eq!(run.expected_count, 0);
    }

    #[test]
    fn events_before_run_start_open_implicit_run() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::TestStarted { id: id("early") },
                RunEvent::TestEnded {
                    id: id("early"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(run.name, "");
        assert_eq!(run.total_tests(), 1);
        assert_eq!(run.suites[0].cases[0].outcome, TestOutcome::Passed);
    }

    #[test]
    fn metrics_are_merged_and_snapshotted() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 1,
                },
                RunEvent::TestStarted { id: id("measured") },
                RunEvent::TestEnded {
                    id: id("measured"),
                    metrics: metrics(btreemap! {"frames_dropped" => "2"}),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: metrics(btreemap! {"coverage_file" => "/sdcard/coverage.ec"}),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(
            run.suites[0].cases[0].metrics.get("frames_dropped"),
            Some(&"2".to_owned())
        );
        assert_eq!(
            run.metrics.get("coverage_file"),
            Some(&"/sdcard/coverage.ec".to_owned())
        );

        // The suite property snapshot holds device identity plus run metrics.
        let properties = &run.suites[0].properties;
        assert_eq!(
            properties.get("device.serial"),
            Some(&"emulator-5554".to_owned())
        );
        assert_eq!(
            properties.get("ro.build.version.sdk"),
            Some(&"33".to_owned())
        );
        assert_eq!(
            properties.get("coverage_file"),
            Some(&"/sdcard/coverage.ec".to_owned())
        );
    }

    #[test]
    fn suites_group_by_class_in_first_seen_order() {
        let a = |method: &str| TestIdentifier::new("com.example.ATest", method);
        let b = |method: &str| TestIdentifier::new("com.example.BTest", method);

        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "suite".to_owned(),
                    expected_count: 3,
                },
                RunEvent::TestStarted { id: b("first") },
                RunEvent::TestEnded {
                    id: b("first"),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestStarted { id: a("second") },
                RunEvent::TestEnded {
                    id: a("second"),
                    metrics: IndexMap::new(),
                },
                RunEvent::TestStarted { id: b("third") },
                RunEvent::TestEnded {
                    id: b("third"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(10),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        let classes: Vec<_> = run
            .suites
            .iter()
            .map(|suite| suite.class_name.as_str())
            .collect();
        assert_eq!(classes, vec!["com.example.BTest", "com.example.ATest"]);
        assert_eq!(run.suites[0].tests(), 2);
        assert_eq!(run.suites[1].tests(), 1);
    }

    #[test]
    fn new_run_can_start_after_previous_run_ended() {
        let mut listener = listener();
        feed(
            &mut listener,
            vec![
                RunEvent::RunStarted {
                    name: "first".to_owned(),
                    expected_count: 0,
                },
                RunEvent::RunEnded {
                    elapsed: Duration::ZERO,
                    metrics: IndexMap::new(),
                },
                RunEvent::RunStarted {
                    name: "second".to_owned(),
                    expected_count: 1,
                },
                RunEvent::TestStarted { id: id("again") },
                RunEvent::TestEnded {
                    id: id("again"),
                    metrics: IndexMap::new(),
                },
                RunEvent::RunEnded {
                    elapsed: Duration::from_millis(5),
                    metrics: IndexMap::new(),
                },
            ],
        );

        let run = listener.finished_run().expect("run is sealed");
        assert_eq!(run.name, "second");
        assert_eq!(run.total_tests(), 1);
        assert_eq!(listener.sink.runs.len(), 2);
    }

    #[test]
    fn write_failure_surfaces_but_run_stays_sealed() {
        let mut listener = RunListener::new(device(), FailingSink);
        listener
            .handle_event(RunEvent::RunStarted {
                name: "suite".to_owned(),
                expected_count: 0,
            })
            .expect("start accepted");
        let err = listener
            .handle_event(RunEvent::RunEnded {
                elapsed: Duration::ZERO,
                metrics: IndexMap::new(),
            })
            .expect_err("write failure surfaces");
        assert!(matches!(err, HandleEventError::Write(_)));
        // The aggregate survives the failed write.
        assert!(listener.finished_run().is_some());
    }
}
