// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Epoch / step / validation loop as an explicit state machine:
//
//   EpochStart ──► TrainStep ──► CheckLoss ──► Validate ─┐
//       ▲              │  ▲                               │
//       │              │  └───────────────────────────────┘
//       │              ▼
//   TestEval ◄──── EpochEnd
//
//   EpochStart → Stopped   when the epochs are used up or the
//                          learning rate fell to min_lr
//
// Loss checks and validations are keyed on the global step
// count, so they fire across epoch boundaries. The step
// counter is advanced before either check runs.
//
// Reference: Burn Book §5

use anyhow::Result;
use std::{fmt, time::Instant};

use crate::data::data_source::DataSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{ClassificationMetrics, MetricScores},
    run_log::RunLog,
    stats_reporter::StatisticsReporter,
};
use crate::ml::{
    learner::Learner,
    scheduler::{PlateauStep, ReduceLrOnPlateau},
};

/// Loop limits and cadences, taken from the run configuration.
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub n_epochs:                usize,
    pub batch_size:              usize,
    pub eval_batch_size:         usize,
    /// 0 disables loss checks
    pub check_loss_after_n_step: usize,
    /// 0 disables validation
    pub validate_after_n_step:   usize,
    pub min_lr:                  f64,
    pub save_model:              bool,
}

pub struct DataSplits {
    pub train: DataSource,
    pub dev:   DataSource,
    pub test:  DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EpochsExhausted,
    LrBelowMin,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EpochsExhausted => f.write_str("all epochs done"),
            Self::LrBelowMin => f.write_str("learning rate reached min_lr"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    EpochStart,
    TrainStep,
    CheckLoss,
    Validate,
    EpochEnd,
    TestEval,
    Stopped(StopReason),
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub epochs_started:   usize,
    pub n_step:           usize,
    pub validations:      usize,
    pub test_evaluations: usize,
    pub lr_decays:        usize,
    pub final_lr:         f64,
    pub stop_reason:      StopReason,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} epoch(s), {} step(s), {} validation(s), {} test pass(es), \
             {} learning rate decay(s), final learning rate {})",
            self.stop_reason,
            self.epochs_started,
            self.n_step,
            self.validations,
            self.test_evaluations,
            self.lr_decays,
            self.final_lr
        )
    }
}

pub struct Trainer<'a, L: Learner> {
    learner:        L,
    splits:         DataSplits,
    scheduler:      ReduceLrOnPlateau,
    metrics:        ClassificationMetrics,
    checkpoint:     CheckpointManager,
    log:            &'a RunLog,
    settings:       TrainerSettings,
    train_reporter: StatisticsReporter,
    dev_reporter:   StatisticsReporter,
}

fn every(n_step: usize, period: usize) -> bool {
    period > 0 && n_step % period == 0
}

fn score_line(tag: &str, scores: &MetricScores) -> String {
    format!(
        "{tag} F1 macro: {:.2}, F1 micro: {:.2}, F1 weighted: {:.2}, accuracy: {:.2}",
        scores.f1_macro * 100.0,
        scores.f1_micro * 100.0,
        scores.f1_weighted * 100.0,
        scores.accuracy * 100.0,
    )
}

/// One sequential pass over `source`; returns (gold, predicted).
fn evaluate_split<L: Learner>(
    learner:    &L,
    source:     &mut DataSource,
    batch_size: usize,
    reporter:   &mut StatisticsReporter,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut y_true = Vec::with_capacity(source.len());
    let mut y_pred = Vec::with_capacity(source.len());

    source.epoch_init(false);
    while let Some(batch) = source.next(batch_size) {
        let output = learner.evaluate_step(&batch)?;
        reporter.update_data(&output.stats);
        y_true.extend_from_slice(&batch.labels);
        y_pred.extend(output.predictions);
    }
    Ok((y_true, y_pred))
}

impl<'a, L: Learner> Trainer<'a, L> {
    pub fn new(
        learner:    L,
        splits:     DataSplits,
        scheduler:  ReduceLrOnPlateau,
        metrics:    ClassificationMetrics,
        checkpoint: CheckpointManager,
        log:        &'a RunLog,
        settings:   TrainerSettings,
    ) -> Self {
        Self {
            learner,
            splits,
            scheduler,
            metrics,
            checkpoint,
            log,
            settings,
            train_reporter: StatisticsReporter::new(),
            dev_reporter:   StatisticsReporter::new(),
        }
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary {
            epochs_started:   0,
            n_step:           0,
            validations:      0,
            test_evaluations: 0,
            lr_decays:        0,
            final_lr:         self.scheduler.lr(),
            stop_reason:      StopReason::EpochsExhausted,
        };
        let mut epoch = 0usize;
        let mut batch_in_epoch = 0usize;
        let mut phase = Phase::EpochStart;

        loop {
            phase = match phase {
                Phase::EpochStart => {
                    epoch += 1;
                    if epoch > self.settings.n_epochs {
                        Phase::Stopped(StopReason::EpochsExhausted)
                    } else if self.scheduler.lr() <= self.settings.min_lr {
                        self.log.log(format!(
                            "Learning rate {} reached min_lr {}, stopping",
                            self.scheduler.lr(),
                            self.settings.min_lr
                        ))?;
                        Phase::Stopped(StopReason::LrBelowMin)
                    } else {
                        tracing::info!("Epoch {} started", epoch);
                        self.splits.train.epoch_init(true);
                        batch_in_epoch = 0;
                        summary.epochs_started += 1;
                        Phase::TrainStep
                    }
                }

                Phase::TrainStep => match self.splits.train.next(self.settings.batch_size) {
                    None => Phase::EpochEnd,
                    Some(batch) => {
                        let stats = self.learner.train_step(&batch, self.scheduler.lr())?;
                        self.train_reporter.update_data(&stats);
                        summary.n_step += 1;
                        batch_in_epoch += 1;
                        Phase::CheckLoss
                    }
                },

                Phase::CheckLoss => {
                    if every(summary.n_step, self.settings.check_loss_after_n_step) {
                        self.log.log(format!(
                            "{:.2}s Epoch {} batch {} - {}",
                            start.elapsed().as_secs_f64(),
                            epoch,
                            batch_in_epoch,
                            self.train_reporter
                        ))?;
                        self.train_reporter.clear();
                    }
                    Phase::Validate
                }

                Phase::Validate => {
                    if every(summary.n_step, self.settings.validate_after_n_step) {
                        if self.validate()? {
                            summary.lr_decays += 1;
                        }
                        summary.validations += 1;
                    }
                    Phase::TrainStep
                }

                Phase::EpochEnd => {
                    tracing::info!("Epoch {} finished after {} batch(es)", epoch, batch_in_epoch);
                    Phase::TestEval
                }

                Phase::TestEval => {
                    self.test(epoch)?;
                    summary.test_evaluations += 1;
                    Phase::EpochStart
                }

                Phase::Stopped(reason) => {
                    summary.stop_reason = reason;
                    break;
                }
            };
        }

        summary.final_lr = self.scheduler.lr();
        Ok(summary)
    }

    /// Dev pass, report, save, scheduler step. Returns true when the LR decayed.
    fn validate(&mut self) -> Result<bool> {
        self.log.log(format!("<Dev> learning rate: {}", self.scheduler.lr()))?;

        let (y_true, y_pred) = evaluate_split(
            &self.learner,
            &mut self.splits.dev,
            self.settings.eval_batch_size,
            &mut self.dev_reporter,
        )?;
        self.log.log(format!("<Dev> {}", self.dev_reporter))?;
        self.log.log(self.metrics.classification_report(&y_true, &y_pred))?;
        self.log.log(score_line("<Dev>", &self.metrics.classification_metrics(&y_true, &y_pred)))?;

        if self.settings.save_model {
            self.checkpoint.save(&self.learner)?;
            self.log.log(format!("model saved to {}", self.checkpoint.path().display()))?;
        }

        let mut decayed = false;
        match self.dev_reporter.get_value("monitor") {
            Ok(monitor) => {
                if let PlateauStep::Decayed { from, to } = self.scheduler.step(monitor) {
                    self.log.log(format!("<Dev> learning rate decayed from {from} to {to}"))?;
                    decayed = true;
                }
            }
            Err(e) => tracing::warn!("Scheduler not stepped, dev split gave no batches: {}", e),
        }
        self.dev_reporter.clear();
        Ok(decayed)
    }

    /// Full pass over the test split after an epoch.
    fn test(&mut self, epoch: usize) -> Result<()> {
        let mut reporter = StatisticsReporter::new();
        let (y_true, y_pred) = evaluate_split(
            &self.learner,
            &mut self.splits.test,
            self.settings.eval_batch_size,
            &mut reporter,
        )?;

        self.log.log(format!("<Test> Epoch {epoch} - {reporter}"))?;
        self.log.log(self.metrics.classification_report(&y_true, &y_pred))?;
        self.log.log(score_line("<Test>", &self.metrics.classification_metrics(&y_true, &y_pred)))?;
        Ok(())
    }
}
