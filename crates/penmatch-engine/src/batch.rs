use std::collections::BTreeMap;

use anyhow::{Context, Result};
use penmatch_contracts::events::{EventWriter, RejectReason, RunEvent};
use penmatch_contracts::{Dataset, PairRecord};
use rayon::prelude::*;

use crate::config::{EngineConfig, ExecutionMode, UnknownPolicy};
use crate::evaluator::{PairEvaluator, PairOutcome};
use crate::images::ImageEncoder;
use crate::model::ChatModel;
use crate::pacing::{pacer_for_millis, Pacer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Accepted,
    Indeterminate,
    Failed,
}

/// Everything a batch produced. `results` holds the records to merge, keyed
/// by source index; `outcomes` covers every evaluated pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub results: BTreeMap<usize, PairRecord>,
    pub outcomes: BTreeMap<usize, OutcomeKind>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes.values().filter(|value| **value == kind).count()
    }

    pub fn accepted_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|(_, kind)| **kind == OutcomeKind::Accepted)
            .map(|(index, _)| *index)
            .collect()
    }
}

struct Settled {
    index: usize,
    kind: OutcomeKind,
    record: Option<PairRecord>,
}

/// Evaluates every pair of a dataset and merges the accepted ones back.
///
/// Pairs never see each other's state. In concurrent mode each worker
/// returns its settled pairs and the runner assembles the result map only
/// after the whole pool has finished, so no two workers ever touch the same
/// entry.
pub struct BatchRunner {
    model: Box<dyn ChatModel>,
    images: Box<dyn ImageEncoder>,
    pacer: Box<dyn Pacer>,
    config: EngineConfig,
    events: Option<EventWriter>,
}

impl BatchRunner {
    pub fn new(
        model: Box<dyn ChatModel>,
        images: Box<dyn ImageEncoder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            model,
            images,
            pacer: pacer_for_millis(config.pacing_ms),
            config,
            events: None,
        }
    }

    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates and merges in one step.
    pub fn run(&self, dataset: &mut Dataset) -> Result<BatchReport> {
        let report = self.evaluate(dataset)?;
        let merged = dataset.merge(&report.results);
        tracing::info!(merged, total = report.total(), "merged batch results");
        Ok(report)
    }

    /// Evaluates every row without touching `dataset`.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<BatchReport> {
        let rows: Vec<(usize, &PairRecord)> = dataset.iter().collect();
        self.emit(RunEvent::RunStarted {
            pairs: rows.len(),
            mode: mode_label(self.config.mode).to_string(),
            model: self.config.model.clone(),
            provider: self.model.name().to_string(),
        });

        let settled: Vec<Settled> = match self.config.mode {
            ExecutionMode::Sequential => rows
                .iter()
                .map(|(index, record)| self.settle(*index, record))
                .collect(),
            ExecutionMode::Concurrent => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.workers)
                    .thread_name(|idx| format!("penmatch-worker-{idx}"))
                    .build()
                    .context("failed building evaluation worker pool")?;
                pool.install(|| {
                    rows.par_iter()
                        .with_max_len(1)
                        .map(|(index, record)| self.settle(*index, record))
                        .collect()
                })
            }
        };

        let mut report = BatchReport::default();
        for entry in settled {
            report.outcomes.insert(entry.index, entry.kind);
            if let Some(record) = entry.record {
                report.results.insert(entry.index, record);
            }
        }

        tracing::info!(
            total = report.total(),
            accepted = report.count(OutcomeKind::Accepted),
            indeterminate = report.count(OutcomeKind::Indeterminate),
            failed = report.count(OutcomeKind::Failed),
            "batch finished"
        );
        self.emit(RunEvent::RunFinished {
            pairs: report.total(),
            accepted: report.count(OutcomeKind::Accepted),
            indeterminate: report.count(OutcomeKind::Indeterminate),
            failed: report.count(OutcomeKind::Failed),
        });
        Ok(report)
    }

    fn settle(&self, index: usize, record: &PairRecord) -> Settled {
        let evaluator = PairEvaluator::new(
            self.model.as_ref(),
            self.images.as_ref(),
            self.pacer.as_ref(),
            &self.config,
        );
        match evaluator.evaluate(index, record) {
            PairOutcome::Accepted(updated) => {
                if let Some(decision) = updated.decision {
                    tracing::info!(index, decision = decision.as_str(), "pair accepted");
                    self.emit(RunEvent::PairAccepted { index, decision });
                }
                Settled {
                    index,
                    kind: OutcomeKind::Accepted,
                    record: Some(updated),
                }
            }
            PairOutcome::Indeterminate { explanation, .. } => {
                tracing::debug!(index, "decision indeterminate; pair not recorded");
                self.emit(RunEvent::PairRejected {
                    index,
                    reason: RejectReason::Indeterminate,
                    stage: None,
                    error: None,
                });
                let record = match self.config.unknown_policy {
                    UnknownPolicy::Discard => None,
                    UnknownPolicy::KeepExplanation => {
                        let mut kept = record.clone();
                        kept.explanation = Some(explanation);
                        kept.decision = None;
                        Some(kept)
                    }
                };
                Settled {
                    index,
                    kind: OutcomeKind::Indeterminate,
                    record,
                }
            }
            PairOutcome::Failed(err) => {
                let stage = err.stage().map(|stage| stage.as_str()).unwrap_or("prepare");
                tracing::warn!(index, stage, error = %err, "pair abandoned");
                self.emit(RunEvent::PairRejected {
                    index,
                    reason: RejectReason::Failed,
                    stage: Some(stage.to_string()),
                    error: Some(err.to_string()),
                });
                Settled {
                    index,
                    kind: OutcomeKind::Failed,
                    record: None,
                }
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit(event) {
            tracing::warn!(run_id = events.run_id(), error = %err, "failed to emit run event");
        }
    }
}

fn mode_label(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::Concurrent => "concurrent",
        ExecutionMode::Sequential => "sequential",
    }
}
