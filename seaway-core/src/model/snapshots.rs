//! Raw, pruned and refined snapshots of one network-generation run

use crate::{
    Error,
    algo::{
        LabeledPath, PruneConfig, PruneReport, RefinementReport, prune_network, refine_network,
    },
    matching::{
        MatchConfig, MatchResult,
        evaluation::{Evaluation, evaluate_network},
        match_trajectory,
    },
    model::{NetworkSummary, SnapshotKind, TrafficNetwork, Trajectory, WaypointTable},
};

/// Snapshots are never mutated in place, each derived stage replaces its slot
#[derive(Debug, Clone)]
pub struct NetworkSnapshots {
    waypoints: WaypointTable,
    raw: TrafficNetwork,
    pruned: Option<TrafficNetwork>,
    refined: Option<TrafficNetwork>,
}

impl NetworkSnapshots {
    pub fn new(waypoints: WaypointTable, raw: TrafficNetwork) -> Self {
        Self {
            waypoints,
            raw,
            pruned: None,
            refined: None,
        }
    }

    pub fn waypoints(&self) -> &WaypointTable {
        &self.waypoints
    }

    pub fn raw(&self) -> &TrafficNetwork {
        &self.raw
    }

    pub fn pruned(&self) -> Option<&TrafficNetwork> {
        self.pruned.as_ref()
    }

    pub fn refined(&self) -> Option<&TrafficNetwork> {
        self.refined.as_ref()
    }

    /// # Errors
    ///
    /// Returns `MissingSnapshot` if `kind` was never computed
    pub fn snapshot(&self, kind: SnapshotKind) -> Result<&TrafficNetwork, Error> {
        match kind {
            SnapshotKind::Raw => Some(&self.raw),
            SnapshotKind::Pruned => self.pruned.as_ref(),
            SnapshotKind::Refined => self.refined.as_ref(),
        }
        .ok_or(Error::MissingSnapshot(kind))
    }

    /// Prunes the raw or refined snapshot and stores the result as the pruned one
    ///
    /// # Errors
    ///
    /// Returns `MissingSnapshot` if `from` was never computed and `InvalidConfig`
    /// for a pruned source or an invalid `config`
    pub fn prune(
        &mut self,
        from: SnapshotKind,
        config: &PruneConfig,
    ) -> Result<PruneReport, Error> {
        if from == SnapshotKind::Pruned {
            return Err(Error::InvalidConfig(
                "pruning starts from the raw or the refined snapshot".to_string(),
            ));
        }
        let outcome = prune_network(self.snapshot(from)?, config)?;
        self.pruned = Some(outcome.network);
        Ok(outcome.report)
    }

    /// Recomputes edge statistics of the raw snapshot from `paths`
    pub fn refine(&mut self, paths: &[LabeledPath<'_>]) -> RefinementReport {
        let outcome = refine_network(&self.raw, paths);
        self.refined = Some(outcome.network);
        outcome.report
    }

    /// # Errors
    ///
    /// Returns `MissingSnapshot` until the network has been pruned, or
    /// `InvalidConfig` if `config` fails validation
    pub fn match_trajectory(
        &self,
        trajectory: &Trajectory,
        config: &MatchConfig,
    ) -> Result<MatchResult, Error> {
        config.validate()?;
        let pruned = self.snapshot(SnapshotKind::Pruned)?;
        Ok(match_trajectory(pruned, &self.waypoints, trajectory, config))
    }

    /// # Errors
    ///
    /// Returns `MissingSnapshot` until the network has been pruned, or
    /// `InvalidConfig` if `config` fails validation
    pub fn evaluate(
        &self,
        trajectories: &[Trajectory],
        config: &MatchConfig,
    ) -> Result<Evaluation, Error> {
        let pruned = self.snapshot(SnapshotKind::Pruned)?;
        evaluate_network(pruned, &self.waypoints, trajectories, config)
    }

    /// Summaries of every computed snapshot
    pub fn summaries(&self) -> Vec<NetworkSummary> {
        std::iter::once(&self.raw)
            .chain(self.pruned.as_ref())
            .chain(self.refined.as_ref())
            .map(TrafficNetwork::summary)
            .collect()
    }
}
