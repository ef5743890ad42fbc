//! Collection pass orchestration.
//!
//! A pass always starts with `knot_build_info`, then opens a control
//! session. The server handles one command per session reliably, so every
//! phase after the first runs on a session of its own. A failed phase is
//! logged and skipped; a failed reconnect ends the pass. Either way the
//! samples gathered so far are kept.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use knot_ctl::{CtlConnector, CtlResult, CtlSession};
use tracing::{debug, warn};

use crate::descriptor::{KnotDescriptors, MetricDesc};
use crate::phases::{self, PhaseSummary, ZoneStatusOptions};
use crate::process::ProcessMemory;
use crate::prometheus::{MetricBuffer, MetricSink, Sample};

/// What to collect and where the server is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub socket_path: PathBuf,
    /// Per-call timeout on the control socket. `None` waits forever.
    pub timeout: Option<Duration>,
    pub collect_memory: bool,
    pub collect_global_stats: bool,
    pub collect_zone_stats: bool,
    pub collect_zone_status: bool,
    pub collect_zone_serial: bool,
    pub collect_zone_timers: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/run/knot/knot.sock"),
            timeout: Some(Duration::from_millis(2000)),
            collect_memory: true,
            collect_global_stats: true,
            collect_zone_stats: true,
            collect_zone_status: true,
            collect_zone_serial: true,
            collect_zone_timers: false,
        }
    }
}

/// Identity of the running exporter, exported as `knot_build_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub build_time: String,
    pub git_commit: String,
    pub ctl_version: String,
    pub platform: String,
}

impl BuildInfo {
    /// Build info of this binary. Build time and commit come from the
    /// `KNOT_EXPORTER_BUILD_TIME` / `KNOT_EXPORTER_GIT_COMMIT` env vars at
    /// compile time.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_time: option_env!("KNOT_EXPORTER_BUILD_TIME")
                .unwrap_or("unknown")
                .to_string(),
            git_commit: option_env!("KNOT_EXPORTER_GIT_COMMIT")
                .unwrap_or("unknown")
                .to_string(),
            ctl_version: knot_ctl::ctl_version().to_string(),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

/// One command/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GlobalStats,
    ZoneStatus,
    ZoneStats,
    ZoneTimers,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::GlobalStats => "global-stats",
            Phase::ZoneStatus => "zone-status",
            Phase::ZoneStats => "zone-stats",
            Phase::ZoneTimers => "zone-timers",
        };
        f.write_str(name)
    }
}

/// Collects Knot DNS metrics, one pass at a time.
pub struct KnotCollector {
    config: CollectorConfig,
    connector: Arc<dyn CtlConnector>,
    memory: Arc<dyn ProcessMemory>,
    descriptors: Arc<KnotDescriptors>,
    build: BuildInfo,
    /// Held for the whole pass so concurrent scrapes queue up.
    pass: Mutex<()>,
}

impl KnotCollector {
    pub fn new(
        config: CollectorConfig,
        connector: Arc<dyn CtlConnector>,
        memory: Arc<dyn ProcessMemory>,
        descriptors: Arc<KnotDescriptors>,
    ) -> Self {
        Self {
            config,
            connector,
            memory,
            descriptors,
            build: BuildInfo::current(),
            pass: Mutex::new(()),
        }
    }

    /// Builder method: override the exported build info.
    pub fn with_build_info(mut self, build: BuildInfo) -> Self {
        self.build = build;
        self
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build
    }

    /// Run one pass into a fresh buffer.
    pub fn scrape(&self) -> MetricBuffer {
        let mut buffer = MetricBuffer::new();
        self.collect(&mut buffer);
        buffer
    }

    /// Run one full collection pass into `sink`.
    pub fn collect(&self, sink: &mut dyn MetricSink) {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);

        self.emit_build_info(sink);

        let Some(session) = self.open_session() else {
            return;
        };

        if self.config.collect_memory {
            self.emit_memory_usage(sink);
        }

        let mut fresh = Some(session);
        for phase in self.enabled_phases() {
            let mut session = match fresh.take() {
                Some(session) => session,
                None => match self.open_session() {
                    Some(session) => session,
                    None => {
                        debug!(%phase, "remaining phases skipped after reconnect failure");
                        return;
                    }
                },
            };

            match self.run_phase(phase, session.as_mut(), sink) {
                Ok(summary) => debug!(%phase, records = summary.records, emitted = summary.emitted, "phase complete"),
                Err(e) => warn!(%phase, error = %e, timed_out = e.is_timeout(), "collection phase failed"),
            }
            session.close();
        }
    }

    /// Connect, send `status` and wait for the first unit of the answer.
    pub fn probe(&self) -> CtlResult<()> {
        let mut session = self.connector.connect(&self.config.socket_path)?;
        session.set_timeout(self.config.timeout);
        let result = session.send_command("status").and_then(|()| session.receive());
        session.close();
        result.map(|_| ())
    }

    /// Every descriptor this collector can currently emit.
    ///
    /// Statistic descriptors are included once they have been seen.
    pub fn describe(&self) -> Vec<Arc<MetricDesc>> {
        let d = &self.descriptors;
        let mut pairs = Vec::new();
        if self.config.collect_memory {
            pairs.push(&d.memory_usage);
        }
        if self.config.collect_zone_serial {
            pairs.push(&d.zone_serial);
        }
        if self.config.collect_zone_status {
            pairs.push(&d.zone_status_refresh);
            pairs.push(&d.zone_status_expiration);
        }
        if self.config.collect_zone_timers {
            pairs.extend([&d.zone_refresh, &d.zone_retry, &d.zone_expiration]);
        }

        let mut descs = vec![Arc::clone(&d.build_info)];
        for pair in pairs {
            descs.push(Arc::clone(&pair.value));
            descs.push(Arc::clone(&pair.total));
        }
        for pair in d.global_stats.pairs().into_iter().chain(d.zone_stats.pairs()) {
            descs.push(Arc::clone(&pair.value));
            descs.push(Arc::clone(&pair.total));
        }
        descs
    }

    fn enabled_phases(&self) -> Vec<Phase> {
        let c = &self.config;
        let mut phases = Vec::with_capacity(4);
        if c.collect_global_stats {
            phases.push(Phase::GlobalStats);
        }
        if c.collect_zone_status || c.collect_zone_serial {
            phases.push(Phase::ZoneStatus);
        }
        if c.collect_zone_stats {
            phases.push(Phase::ZoneStats);
        }
        if c.collect_zone_timers {
            phases.push(Phase::ZoneTimers);
        }
        phases
    }

    fn run_phase(
        &self,
        phase: Phase,
        session: &mut dyn CtlSession,
        sink: &mut dyn MetricSink,
    ) -> CtlResult<PhaseSummary> {
        let d = &self.descriptors;
        match phase {
            Phase::GlobalStats => phases::global_stats(session, d, sink),
            Phase::ZoneStatus => {
                let options = ZoneStatusOptions {
                    serial: self.config.collect_zone_serial,
                    timers: self.config.collect_zone_status,
                };
                phases::zone_status(session, d, options, sink)
            }
            Phase::ZoneStats => phases::zone_stats(session, d, sink),
            Phase::ZoneTimers => phases::zone_timers(session, d, sink),
        }
    }

    fn open_session(&self) -> Option<Box<dyn CtlSession>> {
        match self.connector.connect(&self.config.socket_path) {
            Ok(mut session) => {
                session.set_timeout(self.config.timeout);
                Some(session)
            }
            Err(e) => {
                warn!(
                    path = %self.config.socket_path.display(),
                    error = %e,
                    "failed to connect to control socket"
                );
                None
            }
        }
    }

    fn emit_build_info(&self, sink: &mut dyn MetricSink) {
        let b = &self.build;
        sink.observe(Sample::new(
            &self.descriptors.build_info,
            1.0,
            &[
                b.version.as_str(),
                b.build_time.as_str(),
                b.git_commit.as_str(),
                b.ctl_version.as_str(),
                b.platform.as_str(),
            ],
        ));
    }

    fn emit_memory_usage(&self, sink: &mut dyn MetricSink) {
        for pid in self.memory.list_monitored_process_ids() {
            let bytes = self.memory.resident_memory_bytes(pid);
            if bytes == 0 {
                continue;
            }
            let pid = pid.to_string();
            sink.emit_pair(&self.descriptors.memory_usage, bytes as f64, &[pid.as_str()]);
        }
    }
}

impl fmt::Debug for KnotCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnotCollector")
            .field("config", &self.config)
            .field("build", &self.build)
            .finish_non_exhaustive()
    }
}
