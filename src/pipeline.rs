//! Parse, build and layout as one rebuild, plus the state an interactive
//! caller keeps between rebuilds
//!
//! Every rebuild is a pure function of the query text and the config. The
//! only state lives in [`LineageSession`], which callers own and pass around
//! explicitly. When rebuilds can overlap, the newest request wins: results
//! for superseded tickets are dropped instead of displayed.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlparser::dialect::Dialect;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LineageConfig;
use crate::error::{LineageError, Result};
use crate::graph::{LayoutEngine, LineageGraph};
use crate::sql_engine::lineage_from_sql;

/// A failed rebuild, with the un-positioned topology when it is still usable
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RebuildFailure {
    #[source]
    pub error: LineageError,
    pub topology: Option<LineageGraph>,
}

impl From<LineageError> for RebuildFailure {
    fn from(error: LineageError) -> Self {
        Self {
            error,
            topology: None,
        }
    }
}

pub type RebuildResult = std::result::Result<LineageGraph, RebuildFailure>;

/// Dialect plus layout engine, resolved once from a [`LineageConfig`]
#[derive(Debug)]
pub struct Pipeline {
    dialect: Box<dyn Dialect>,
    engine: LayoutEngine,
}

impl Pipeline {
    pub fn new(dialect: Box<dyn Dialect>, engine: LayoutEngine) -> Self {
        Self { dialect, engine }
    }

    pub fn from_config(config: &LineageConfig) -> Result<Self> {
        Ok(Self::new(
            config.sql_dialect()?,
            LayoutEngine::new(config.layout.clone())?,
        ))
    }

    /// Parse and build only, without layout
    pub fn build(&self, sql: &str) -> Result<LineageGraph> {
        lineage_from_sql(sql, self.dialect.as_ref())
    }

    /// Parse, build and lay out.
    ///
    /// A cycle keeps the raw topology in the failure so it can be shown as a
    /// degraded view.
    pub fn rebuild(&self, sql: &str) -> RebuildResult {
        let topology = self.build(sql)?;
        self.lay_out(topology)
    }

    /// Like [`Pipeline::rebuild`], but gives up before layout when `ticket`
    /// has been superseded in the meantime. Returns `None` in that case.
    pub fn rebuild_if_current(
        &self,
        sql: &str,
        ticket: RebuildTicket,
        coordinator: &RebuildCoordinator,
    ) -> Option<RebuildResult> {
        let topology = match self.build(sql) {
            Ok(topology) => topology,
            Err(err) => return Some(Err(err.into())),
        };

        if !coordinator.is_current(ticket) {
            debug!(ticket = ticket.0, "rebuild superseded before layout");
            return None;
        }

        Some(self.lay_out(topology))
    }

    fn lay_out(&self, topology: LineageGraph) -> RebuildResult {
        match self.engine.layout(topology.clone()) {
            Ok(graph) => Ok(graph),
            Err(error) if error.allows_degraded_view() => Err(RebuildFailure {
                error,
                topology: Some(topology),
            }),
            Err(error) => Err(error.into()),
        }
    }
}

/// Run one full rebuild with the given config
pub fn rebuild(sql: &str, config: &LineageConfig) -> Result<LineageGraph> {
    Pipeline::from_config(config)?
        .rebuild(sql)
        .map_err(|failure| failure.error)
}

/// Identifies one rebuild request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RebuildTicket(u64);

/// Hands out tickets; only the most recent one is current
#[derive(Debug, Default)]
pub struct RebuildCoordinator {
    latest: AtomicU64,
}

impl RebuildCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket
    pub fn begin(&self) -> RebuildTicket {
        RebuildTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RebuildTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// What happened to the view after a rebuild result came in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// A fully laid out graph replaced the previous one
    Displayed,
    /// Layout failed on a cycle; the raw topology is shown instead
    Degraded,
    /// The rebuild failed and the previous graph stays on screen
    Rejected,
    /// A newer request was issued, so this result was discarded
    Superseded,
}

/// View state of an interactive caller: the graph on display and the last error
#[derive(Debug)]
pub struct LineageSession {
    pipeline: Pipeline,
    coordinator: Arc<RebuildCoordinator>,
    current: Option<LineageGraph>,
    degraded: bool,
    last_error: Option<LineageError>,
}

impl LineageSession {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            coordinator: Arc::new(RebuildCoordinator::new()),
            current: None,
            degraded: false,
            last_error: None,
        }
    }

    pub fn from_config(config: &LineageConfig) -> Result<Self> {
        Ok(Self::new(Pipeline::from_config(config)?))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Shared handle for callers that compute rebuilds elsewhere
    pub fn coordinator(&self) -> Arc<RebuildCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn begin(&self) -> RebuildTicket {
        self.coordinator.begin()
    }

    /// Rebuild synchronously and apply the result
    pub fn submit(&mut self, sql: &str) -> RebuildOutcome {
        let ticket = self.begin();
        match self
            .pipeline
            .rebuild_if_current(sql, ticket, &self.coordinator)
        {
            Some(result) => self.apply(ticket, result),
            None => RebuildOutcome::Superseded,
        }
    }

    /// Apply the result of the rebuild started with `ticket`
    pub fn apply(&mut self, ticket: RebuildTicket, result: RebuildResult) -> RebuildOutcome {
        if !self.coordinator.is_current(ticket) {
            debug!(ticket = ticket.0, "discarding result of superseded rebuild");
            return RebuildOutcome::Superseded;
        }

        match result {
            Ok(graph) => {
                info!(
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    "displaying lineage graph"
                );
                self.current = Some(graph);
                self.degraded = false;
                self.last_error = None;
                RebuildOutcome::Displayed
            }
            Err(RebuildFailure {
                error,
                topology: Some(topology),
            }) => {
                warn!(%error, "layout failed, showing raw topology");
                self.current = Some(topology);
                self.degraded = true;
                self.last_error = Some(error);
                RebuildOutcome::Degraded
            }
            Err(RebuildFailure { error, .. }) => {
                warn!(%error, "rebuild failed, keeping previous graph");
                self.last_error = Some(error);
                RebuildOutcome::Rejected
            }
        }
    }

    pub fn current(&self) -> Option<&LineageGraph> {
        self.current.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn last_error(&self) -> Option<&LineageError> {
        self.last_error.as_ref()
    }
}
