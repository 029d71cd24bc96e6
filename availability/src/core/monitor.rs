//! Monitor groups and the per-worker probe loop
//!
//! A [`MonitorGroup`] runs `instance_count` workers of one monitor type. Every
//! worker owns its own probe instance and shares a result channel and a stop
//! signal with its siblings. Workers stop on whichever comes first: the stop
//! signal, or `max_time` of wall clock since their first probe.
//!
//! `outage_time` in a [`MonitorRecord`] is the span between the start of the
//! first failed probe and the end of the last one. The summed duration of the
//! failed probes is reported separately as `downtime`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{process_debug, process_error, process_info, process_warn, ActorConfig, ProcessId, WorkerId};
use std::iter::Sum;
use std::ops::Add;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, timeout_at, Instant};

use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::registry::{type_tag, ActorRegistry};
use crate::traits::Monitor;
use shared::ActionType;

/// Extra time granted on top of the worker bounds before a worker is abandoned
const JOIN_GRACE: Duration = Duration::from_secs(5);

/// What one worker reports when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorRecord {
    /// Seconds from the first probe until the loop exited
    pub total_time: f64,
    /// Seconds between the first and the last observed failure
    pub outage_time: f64,
    /// Summed duration of the failed probes
    pub downtime: f64,
    pub total_count: u64,
    pub outage_count: u64,
    /// Unix timestamps in seconds, 0 when no outage was observed
    pub first_outage: f64,
    pub last_outage: f64,
}

/// Aggregated monitor statistics
///
/// Fields are `f64` because the group reduction averages over instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorResult {
    pub total_time: f64,
    pub outage_time: f64,
    pub total_count: f64,
    pub outage_count: f64,
}

impl MonitorResult {
    pub fn new(total_time: f64, outage_time: f64, total_count: f64, outage_count: f64) -> Self {
        Self {
            total_time,
            outage_time,
            total_count,
            outage_count,
        }
    }

    pub fn from_record(record: &MonitorRecord) -> Self {
        Self {
            total_time: record.total_time,
            outage_time: record.outage_time,
            total_count: record.total_count as f64,
            outage_count: record.outage_count as f64,
        }
    }

    /// Group reduction: sum every field, then divide each by `instance_count`
    ///
    /// The divisor is the configured instance count even when fewer workers
    /// reported. Across groups the manager sums without dividing.
    pub fn reduce_group(records: &[MonitorRecord], instance_count: u32) -> Self {
        let sum: MonitorResult = records.iter().map(MonitorResult::from_record).sum();
        let divisor = f64::from(instance_count.max(1));
        Self {
            total_time: sum.total_time / divisor,
            outage_time: sum.outage_time / divisor,
            total_count: sum.total_count / divisor,
            outage_count: sum.outage_count / divisor,
        }
    }
}

impl Sum for MonitorResult {
    fn sum<I: Iterator<Item = MonitorResult>>(iter: I) -> Self {
        iter.fold(MonitorResult::default(), Add::add)
    }
}

impl Add for MonitorResult {
    type Output = MonitorResult;

    fn add(self, rhs: MonitorResult) -> MonitorResult {
        MonitorResult {
            total_time: self.total_time + rhs.total_time,
            outage_time: self.outage_time + rhs.outage_time,
            total_count: self.total_count + rhs.total_count,
            outage_count: self.outage_count + rhs.outage_count,
        }
    }
}

/// SLA threshold declared under the monitor's `sla` key
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sla {
    MaxOutageTime(f64),
    MaxRecoverTime(f64),
    MaxOutageCount(f64),
    Unbounded,
}

impl Sla {
    pub fn from_config(cfg: &ActorConfig) -> Self {
        if let Some(limit) = cfg.nested_f64("sla", "max_outage_time") {
            Sla::MaxOutageTime(limit)
        } else if let Some(limit) = cfg.nested_f64("sla", "max_recover_time") {
            Sla::MaxRecoverTime(limit)
        } else if let Some(limit) = cfg.nested_f64("sla", "max_outage_count") {
            Sla::MaxOutageCount(limit)
        } else {
            Sla::Unbounded
        }
    }

    pub fn verify(&self, result: &MonitorResult) -> bool {
        match *self {
            Sla::MaxOutageTime(limit) | Sla::MaxRecoverTime(limit) => result.outage_time <= limit,
            Sla::MaxOutageCount(limit) => result.outage_count <= limit,
            Sla::Unbounded => true,
        }
    }
}

fn seconds(cfg: &ActorConfig, field: &str) -> HaResult<Option<Duration>> {
    match cfg.f64_field(field) {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(Duration::from_secs_f64(v))),
        Some(v) => Err(HaError::invalid(field, v)),
        None if cfg.contains(field) => Err(HaError::invalid(field, format!("{:?}", cfg.value(field)))),
        None => Ok(None),
    }
}

/// Worker timing knobs read from the monitor config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorTiming {
    /// Settle delay before the first probe
    pub wait_time: Duration,
    /// Pause between probes
    pub duration: Duration,
    /// Wall clock bound on the probe loop
    pub max_time: Duration,
    /// Optional bound on one probe; a timed out probe counts as an outage
    pub probe_timeout: Option<Duration>,
    /// How long `stop_monitor` waits for the workers to report
    pub join_timeout: Duration,
}

impl MonitorTiming {
    pub fn from_config(cfg: &ActorConfig) -> HaResult<Self> {
        let wait_time = seconds(cfg, "wait_time")?.unwrap_or_default();
        let duration = seconds(cfg, "duration")?.unwrap_or_default();
        let max_time = match seconds(cfg, "max_time")? {
            Some(t) => t,
            None => seconds(cfg, "monitor_time")?.unwrap_or_default(),
        };
        let probe_timeout = seconds(cfg, "probe_timeout")?;
        let join_timeout = match seconds(cfg, "join_timeout")? {
            Some(t) => t,
            None => {
                let probe = probe_timeout.unwrap_or_default();
                wait_time + max_time + duration + probe + JOIN_GRACE
            }
        };
        Ok(Self {
            wait_time,
            duration,
            max_time,
            probe_timeout,
            join_timeout,
        })
    }
}

fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Stop raised, or the owning group went away
fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}

async fn probe_once(worker: &WorkerId, probe: &mut dyn Monitor, probe_timeout: Option<Duration>) -> bool {
    let outcome = match probe_timeout {
        Some(limit) => match timeout(limit, probe.one_request()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                process_warn!(ProcessId::current(), worker = %worker, "⏱️ Probe exceeded {:?}", limit);
                return false;
            }
        },
        None => probe.one_request().await,
    };

    match outcome {
        Ok(healthy) => healthy,
        Err(e) => {
            process_debug!(ProcessId::current(), worker = %worker, "Probe error counted as outage: {}", e);
            false
        }
    }
}

/// Probe loop of one monitor worker
pub async fn run_worker(
    worker: WorkerId,
    mut probe: Box<dyn Monitor>,
    timing: MonitorTiming,
    mut stop: watch::Receiver<bool>,
) -> MonitorRecord {
    if !timing.wait_time.is_zero() {
        sleep(timing.wait_time).await;
    }

    let mut record = MonitorRecord::default();
    let mut first_outage_at: Option<Instant> = None;
    let mut last_outage_at: Option<Instant> = None;

    let begin = Instant::now();
    loop {
        let check_begin = Instant::now();
        let check_begin_wall = unix_now();
        let healthy = probe_once(&worker, probe.as_mut(), timing.probe_timeout).await;
        let check_end = Instant::now();

        if !healthy {
            record.outage_count += 1;
            record.downtime += (check_end - check_begin).as_secs_f64();
            if first_outage_at.is_none() {
                first_outage_at = Some(check_begin);
                record.first_outage = check_begin_wall;
            }
            last_outage_at = Some(check_end);
            record.last_outage = unix_now();
        }
        record.total_count += 1;

        if stop_requested(&stop) {
            process_debug!(ProcessId::current(), worker = %worker, "the monitor worker stop");
            break;
        }

        // >= so that max_time = 0 exits after exactly one probe
        if check_end - begin >= timing.max_time {
            process_debug!(ProcessId::current(), worker = %worker, "the monitor max_time finished and exit");
            break;
        }

        if timing.duration.is_zero() {
            tokio::task::yield_now().await;
        } else {
            let interrupted = tokio::select! {
                _ = sleep(timing.duration) => false,
                _ = stop.changed() => true,
            };
            if interrupted && stop_requested(&stop) {
                break;
            }
        }
    }

    record.total_time = begin.elapsed().as_secs_f64();
    if let (Some(first), Some(last)) = (first_outage_at, last_outage_at) {
        record.outage_time = (last - first).as_secs_f64();
    }
    record
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Prepared,
    Running,
    Stopped,
}

/// N concurrently running workers of one monitor type
pub struct MonitorGroup {
    key: String,
    label: String,
    instance_count: u32,
    timing: MonitorTiming,
    sla: Sla,
    usable: bool,
    state: GroupState,
    pending: Vec<Box<dyn Monitor>>,
    stop_tx: watch::Sender<bool>,
    results_tx: Option<mpsc::UnboundedSender<MonitorRecord>>,
    results_rx: mpsc::UnboundedReceiver<MonitorRecord>,
    workers: Vec<(WorkerId, JoinHandle<()>)>,
    records: Vec<MonitorRecord>,
}

impl MonitorGroup {
    /// Resolve the monitor type and prepare `instance_count` probes
    ///
    /// Unknown types and invalid timing are configuration errors. A probe
    /// whose own setup fails only marks this group unusable.
    pub async fn setup(
        key: &str,
        cfg: &ActorConfig,
        ctx: &HaContext,
        registry: &ActorRegistry,
    ) -> HaResult<Self> {
        let factory = registry.monitor(type_tag(ActionType::Monitor, cfg)?)?;
        let timing = MonitorTiming::from_config(cfg)?;
        let instance_count = cfg
            .u64_field("instance_count")
            .or_else(|| cfg.u64_field("monitor_number"))
            .unwrap_or(1)
            .clamp(1, u64::from(u32::MAX)) as u32;

        let mut pending = Vec::with_capacity(instance_count as usize);
        let mut usable = true;
        for instance in 0..instance_count {
            let mut probe = factory(cfg, ctx)?;
            if let Err(e) = probe.setup().await {
                process_error!(
                    ProcessId::current(),
                    "❌ Monitor {}#{} setup failed: {}",
                    key,
                    instance,
                    e
                );
                usable = false;
            }
            pending.push(probe);
        }

        let label = pending
            .first()
            .and_then(|probe| probe.result_label())
            .unwrap_or_else(|| key.to_string());

        let (stop_tx, _) = watch::channel(false);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        Ok(Self {
            key: key.to_string(),
            label,
            instance_count,
            timing,
            sla: Sla::from_config(cfg),
            usable,
            state: GroupState::Prepared,
            pending,
            stop_tx,
            results_tx: Some(results_tx),
            results_rx,
            workers: Vec::new(),
            records: Vec::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn timing(&self) -> MonitorTiming {
        self.timing
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub fn records(&self) -> &[MonitorRecord] {
        &self.records
    }

    /// Spawn every worker; returns without waiting for them
    pub fn start_monitor(&mut self) {
        if !self.usable {
            process_warn!(ProcessId::current(), "⚠️ Monitor {} unusable, not starting", self.key);
            return;
        }
        if self.state != GroupState::Prepared {
            process_warn!(ProcessId::current(), "⚠️ Monitor {} already started", self.key);
            return;
        }
        let Some(results_tx) = self.results_tx.take() else {
            return;
        };

        for (instance, probe) in std::mem::take(&mut self.pending).into_iter().enumerate() {
            let worker = WorkerId::new(self.key.clone(), instance as u32);
            let stop = self.stop_tx.subscribe();
            let tx = results_tx.clone();
            let timing = self.timing;
            let id = worker.clone();
            let handle = tokio::spawn(async move {
                let record = run_worker(id, probe, timing, stop).await;
                // receiver gone means the group was dropped; nothing to report to
                let _ = tx.send(record);
            });
            self.workers.push((worker, handle));
        }
        // only the workers hold senders now, so recv() ends once all of them exit

        self.state = GroupState::Running;
        process_info!(
            ProcessId::current(),
            "👀 Monitor {} started with {} workers",
            self.key,
            self.workers.len()
        );
    }

    /// Raise the stop signal, collect one record per worker, then reap them
    ///
    /// Waiting is bounded by `join_timeout`; workers still alive afterwards are
    /// aborted and their records are missing from the result. The group ends
    /// up `Stopped` either way, and `MonitorJoin` names the first aborted worker.
    pub async fn stop_monitor(&mut self) -> HaResult<()> {
        if self.state != GroupState::Running {
            return Ok(());
        }
        let _ = self.stop_tx.send(true);

        let deadline = Instant::now() + self.timing.join_timeout;
        for _ in 0..self.workers.len() {
            match timeout_at(deadline, self.results_rx.recv()).await {
                Ok(Some(record)) => self.records.push(record),
                Ok(None) => break,
                Err(_) => {
                    process_warn!(
                        ProcessId::current(),
                        "⏱️ Monitor {} workers did not all report within {:?}",
                        self.key,
                        self.timing.join_timeout
                    );
                    break;
                }
            }
        }

        let join_timeout = self.timing.join_timeout;
        let mut abandoned = None;
        for (worker, mut handle) in self.workers.drain(..) {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    process_error!(ProcessId::current(), worker = %worker, "❌ Monitor worker crashed: {}", e);
                }
                Err(_) => {
                    handle.abort();
                    process_warn!(ProcessId::current(), worker = %worker, "🔪 Aborted monitor worker past its deadline");
                    abandoned.get_or_insert_with(|| HaError::MonitorJoin {
                        worker: worker.to_string(),
                        timeout: join_timeout,
                    });
                }
            }
        }

        self.state = GroupState::Stopped;
        process_debug!(
            ProcessId::current(),
            "Monitor {} collected {}/{} records",
            self.key,
            self.records.len(),
            self.instance_count
        );
        abandoned.map_or(Ok(()), Err)
    }

    pub fn get_result(&self) -> MonitorResult {
        MonitorResult::reduce_group(&self.records, self.instance_count)
    }

    /// An unusable group, or one that was never started, fails its SLA
    pub fn verify_sla(&self) -> bool {
        if !self.usable {
            process_warn!(ProcessId::current(), "⚠️ Monitor {} never ran, SLA failed", self.key);
            return false;
        }
        if self.state == GroupState::Prepared {
            process_warn!(ProcessId::current(), "⚠️ Monitor {} was never started, SLA failed", self.key);
            return false;
        }
        let result = self.get_result();
        let passed = self.sla.verify(&result);
        if passed {
            process_info!(ProcessId::current(), "✅ Monitor {} SLA passed", self.key);
        } else {
            process_info!(
                ProcessId::current(),
                "SLA failure for {}: {:?} with outage_time {:.3}s",
                self.key,
                self.sla,
                result.outage_time
            );
        }
        passed
    }
}

impl Drop for MonitorGroup {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        for (_, handle) in &self.workers {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockMonitor;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn record(total_time: f64, outage_time: f64, total_count: u64, outage_count: u64) -> MonitorRecord {
        MonitorRecord {
            total_time,
            outage_time,
            total_count,
            outage_count,
            ..Default::default()
        }
    }

    fn config(value: serde_json::Value) -> ActorConfig {
        ActorConfig::from_value(value).unwrap()
    }

    fn registry_with(healthy: bool, calls: Arc<AtomicU64>) -> ActorRegistry {
        ActorRegistry::empty().with_monitor("MonitorForTest", move |_, _| {
            let calls = calls.clone();
            let mut probe = MockMonitor::new();
            probe.expect_setup().returning(|| Ok(()));
            probe.expect_result_label().returning(|| None);
            probe.expect_one_request().returning(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(healthy)
            });
            Ok(Box::new(probe))
        })
    }

    /// Monitor that blocks far longer than any test waits and never sees the stop signal
    struct Hanging;

    #[async_trait::async_trait]
    impl Monitor for Hanging {
        async fn setup(&mut self) -> HaResult<()> {
            Ok(())
        }
        async fn one_request(&mut self) -> HaResult<bool> {
            sleep(Duration::from_secs(30)).await;
            Ok(true)
        }
        fn result_label(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_reduce_identical_workers_is_identity() {
        let records = vec![record(2.0, 1.0, 4, 2); 3];
        let result = MonitorResult::reduce_group(&records, 3);
        assert_eq!(result, MonitorResult::new(2.0, 1.0, 4.0, 2.0));
    }

    #[test]
    fn test_reduce_heterogeneous_workers_averages() {
        let records = vec![record(1.0, 0.0, 5, 2), record(1.0, 0.0, 5, 4)];
        let result = MonitorResult::reduce_group(&records, 2);
        assert_eq!(result.outage_count, 3.0);
        assert_eq!(result.total_count, 5.0);
    }

    #[test]
    fn test_reduce_divides_by_configured_count() {
        let result = MonitorResult::reduce_group(&[record(4.0, 2.0, 8, 2)], 2);
        assert_eq!(result, MonitorResult::new(2.0, 1.0, 4.0, 1.0));
    }

    #[test]
    fn test_sum_does_not_divide() {
        let group = MonitorResult::new(2.0, 0.0, 2.0, 0.0);
        let total: MonitorResult = [group, group].into_iter().sum();
        assert_eq!(total, MonitorResult::new(4.0, 0.0, 4.0, 0.0));
    }

    #[test]
    fn test_sla_from_config() {
        let sla = Sla::from_config(&config(json!({"sla": {"max_outage_time": 5}})));
        assert_eq!(sla, Sla::MaxOutageTime(5.0));
        assert!(sla.verify(&MonitorResult::new(10.0, 5.0, 1.0, 1.0)));
        assert!(!sla.verify(&MonitorResult::new(10.0, 5.5, 1.0, 1.0)));

        let sla = Sla::from_config(&config(json!({"sla": {"max_recover_time": 20}})));
        assert_eq!(sla, Sla::MaxRecoverTime(20.0));
        assert_eq!(Sla::from_config(&ActorConfig::new()), Sla::Unbounded);
    }

    #[test]
    fn test_timing_defaults_and_fallbacks() {
        let timing = MonitorTiming::from_config(&config(json!({"monitor_time": 10, "duration": 1}))).unwrap();
        assert_eq!(timing.wait_time, Duration::ZERO);
        assert_eq!(timing.max_time, Duration::from_secs(10));
        assert_eq!(timing.duration, Duration::from_secs(1));
        assert!(timing.probe_timeout.is_none());
        assert!(timing.join_timeout > timing.max_time);

        assert!(MonitorTiming::from_config(&config(json!({"max_time": -1}))).is_err());
        assert!(MonitorTiming::from_config(&config(json!({"duration": "soon"}))).is_err());
    }

    #[tokio::test]
    async fn test_worker_zero_bounds_runs_one_request() {
        let mut probe = MockMonitor::new();
        probe.expect_one_request().times(1).returning(|| Ok(false));
        let timing = MonitorTiming::from_config(&config(json!({"wait_time": 0, "duration": 0, "max_time": 0}))).unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let record = run_worker(WorkerId::new("t", 0), Box::new(probe), timing, stop_rx).await;

        assert_eq!(record.total_count, 1);
        assert_eq!(record.outage_count, 1);
        assert!(record.first_outage > 0.0);
        assert!(record.last_outage >= record.first_outage);
        assert!(record.outage_time >= 0.0);
    }

    #[tokio::test]
    async fn test_worker_without_outage_reports_zero_timestamps() {
        let mut probe = MockMonitor::new();
        probe.expect_one_request().returning(|| Ok(true));
        let timing = MonitorTiming::from_config(&config(json!({"max_time": 0}))).unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let record = run_worker(WorkerId::new("t", 0), Box::new(probe), timing, stop_rx).await;

        assert_eq!(record.outage_count, 0);
        assert_eq!(record.first_outage, 0.0);
        assert_eq!(record.last_outage, 0.0);
        assert_eq!(record.outage_time, 0.0);
    }

    #[tokio::test]
    async fn test_worker_errors_count_as_outage() {
        let mut probe = MockMonitor::new();
        probe
            .expect_one_request()
            .returning(|| Err(HaError::invalid("probe", "unreachable")));
        let timing = MonitorTiming::from_config(&config(json!({"max_time": 0}))).unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let record = run_worker(WorkerId::new("t", 0), Box::new(probe), timing, stop_rx).await;
        assert_eq!(record.outage_count, 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_signal() {
        let mut probe = MockMonitor::new();
        probe.expect_one_request().returning(|| Ok(true));
        let timing = MonitorTiming::from_config(&config(json!({"duration": 0.01, "max_time": 60}))).unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_worker(WorkerId::new("t", 0), Box::new(probe), timing, stop_rx));
        sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();

        let record = timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(record.total_count >= 1);
        assert!(record.total_time < 60.0);
    }

    #[tokio::test]
    async fn test_worker_request_timeout_counts_outage() {
        let timing =
            MonitorTiming::from_config(&config(json!({"max_time": 0, "probe_timeout": 0.05}))).unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let record = timeout(
            Duration::from_secs(5),
            run_worker(WorkerId::new("t", 0), Box::new(Hanging), timing, stop_rx),
        )
        .await
        .unwrap();
        assert_eq!(record.outage_count, 1);
    }

    #[tokio::test]
    async fn test_group_collects_one_record_per_worker() {
        let calls = Arc::new(AtomicU64::new(0));
        let registry = registry_with(false, calls.clone());
        let cfg = config(json!({
            "monitor_type": "MonitorForTest",
            "key": "service-status",
            "instance_count": 3,
            "duration": 0.01,
            "max_time": 30,
            "sla": {"max_outage_count": 0}
        }));

        let mut group = MonitorGroup::setup("service-status", &cfg, &HaContext::default(), &registry)
            .await
            .unwrap();
        assert_eq!(group.state(), GroupState::Prepared);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "setup must not start probing");

        group.start_monitor();
        sleep(Duration::from_millis(50)).await;
        group.stop_monitor().await.unwrap();

        assert_eq!(group.state(), GroupState::Stopped);
        assert_eq!(group.records().len(), 3);
        let result = group.get_result();
        assert!(result.outage_count >= 1.0);
        assert!(!group.verify_sla());
    }

    #[tokio::test]
    async fn test_group_setup_failure_marks_unusable() {
        let registry = ActorRegistry::empty().with_monitor("Broken", |_, _| {
            let mut probe = MockMonitor::new();
            probe
                .expect_setup()
                .returning(|| Err(HaError::invalid("host", "unreachable")));
            probe.expect_result_label().returning(|| None);
            Ok(Box::new(probe))
        });
        let cfg = config(json!({"monitor_type": "Broken", "key": "m"}));

        let mut group = MonitorGroup::setup("m", &cfg, &HaContext::default(), &registry)
            .await
            .unwrap();
        assert!(!group.is_usable());
        group.start_monitor();
        assert_eq!(group.state(), GroupState::Prepared);
        group.stop_monitor().await.unwrap();
        assert!(!group.verify_sla());
    }

    #[tokio::test]
    async fn test_group_unknown_type_is_error() {
        let cfg = config(json!({"monitor_type": "MonitorNotExist", "key": "m"}));
        let result = MonitorGroup::setup("m", &cfg, &HaContext::default(), &ActorRegistry::empty()).await;
        assert!(matches!(result, Err(HaError::UnknownActorType { .. })));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let calls = Arc::new(AtomicU64::new(0));
        let registry = registry_with(true, calls);
        let cfg = config(json!({"monitor_type": "MonitorForTest"}));
        let mut group = MonitorGroup::setup("m", &cfg, &HaContext::default(), &registry)
            .await
            .unwrap();
        group.stop_monitor().await.unwrap();
        assert_eq!(group.state(), GroupState::Prepared);
        assert_eq!(group.get_result(), MonitorResult::default());
    }

    #[tokio::test]
    async fn test_unstarted_group_fails_sla() {
        let registry = registry_with(true, Arc::new(AtomicU64::new(0)));
        let cfg = config(json!({"monitor_type": "MonitorForTest", "sla": {"max_outage_time": 5}}));
        let mut group = MonitorGroup::setup("m", &cfg, &HaContext::default(), &registry)
            .await
            .unwrap();

        group.stop_monitor().await.unwrap();

        assert!(group.is_usable());
        assert_eq!(group.get_result(), MonitorResult::default());
        assert!(!group.verify_sla());
    }

    #[tokio::test]
    async fn test_stop_aborts_workers_past_join_timeout() {
        let registry = ActorRegistry::empty().with_monitor("Hanging", |_, _| Ok(Box::new(Hanging)));
        let cfg = config(json!({
            "monitor_type": "Hanging",
            "instance_count": 2,
            "max_time": 60,
            "join_timeout": 0.1
        }));
        let mut group = MonitorGroup::setup("m", &cfg, &HaContext::default(), &registry)
            .await
            .unwrap();
        group.start_monitor();

        let stopped = timeout(Duration::from_secs(5), group.stop_monitor()).await.unwrap();

        assert!(matches!(stopped, Err(HaError::MonitorJoin { .. })));
        assert_eq!(group.state(), GroupState::Stopped);
        assert!(group.records().len() < group.instance_count() as usize);
    }
}
