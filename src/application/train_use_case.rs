// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Resolve config + selectors   (Layer 2 - config)
//   Step 2: Name the run, open the log   (Layer 6 - infra)
//   Step 3: Build the tokenizer          (Layer 6 - infra)
//   Step 4: Load the dialog corpus       (Layer 3 - domain)
//   Step 5: Build train/dev/test sources (Layer 4 - data)
//   Step 6: Log the hyper-parameters     (Layer 6 - infra)
//   Step 7: Seed the backend RNG         (Layer 5 - ml)
//   Step 8: Build model + AdamW          (Layer 5 - ml)
//   Step 9: Run the training loop        (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    backend::Autodiff,
    module::AutodiffModule,
    optim::AdamWConfig,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::config::{RunConfig, Selectors};
use crate::cli::commands::TrainArgs;
use crate::data::data_source::{DataSource, SourceSettings};
use crate::domain::{
    dialog::DialogCorpus,
    selectors::{ModelKind, OptimizerKind},
};
use crate::infra::{
    checkpoint::{log_path, run_name, CheckpointManager, TIMESTAMP_FORMAT},
    metrics::ClassificationMetrics,
    run_log::RunLog,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    hre::HreConfig,
    learner::BurnLearner,
    scheduler::ReduceLrOnPlateau,
    trainer::{DataSplits, RunSummary, Trainer, TrainerSettings},
    transformer::TransformerClassifierConfig,
    DialogActClassifier,
};

// CPU by default; `--features wgpu` opts into the GPU backend
#[cfg(feature = "wgpu")]
type TrainBackend = Autodiff<burn::backend::Wgpu>;
#[cfg(feature = "wgpu")]
const BACKEND_NAME: &str = "wgpu";
#[cfg(not(feature = "wgpu"))]
type TrainBackend = Autodiff<burn::backend::NdArray>;
#[cfg(not(feature = "wgpu"))]
const BACKEND_NAME: &str = "ndarray (CPU)";

type InnerBackend = <TrainBackend as AutodiffBackend>::InnerBackend;

/// Everything a run needs besides the model itself.
struct Session {
    config:    RunConfig,
    optimizer: OptimizerKind,
    run_name:  String,
    log:       RunLog,
    splits:    DataSplits,
    metrics:   ClassificationMetrics,
    device:    <TrainBackend as Backend>::Device,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the resolved config and runs the full training pipeline.
pub struct TrainUseCase {
    config:    RunConfig,
    selectors: Selectors,
}

impl TrainUseCase {
    /// Fails on an unknown corpus or selector before touching any file.
    pub fn from_args(args: TrainArgs) -> Result<Self> {
        let config = RunConfig::resolve(args)?;
        let selectors = config.selectors()?;
        Ok(Self { config, selectors })
    }

    /// Execute the full training pipeline end to end
    pub fn execute(self) -> Result<RunSummary> {
        let Self { config, selectors } = self;
        let args = &config.args;
        let corpus = &config.corpus;

        // ── Step 2: Run name and log file ────────────────────────────────────
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let run_name = run_name(
            selectors.model.as_str(),
            selectors.floor_encoder.as_str(),
            args.seed,
            &timestamp,
            args.filename_note.as_deref(),
        );
        let log = if args.enable_log {
            RunLog::to_file(log_path(&corpus.log_dir, &run_name))?
        } else {
            RunLog::disabled()
        };
        tracing::info!("Run name: {}", run_name);
        if let Some(path) = log.path() {
            tracing::info!("Logging to '{}'", path.display());
        }

        // ── Step 3: Tokenizer ────────────────────────────────────────────────
        let tokenizer = TokenizerStore::load(
            selectors.tokenizer,
            &corpus.word_count_path,
            args.vocab_size,
            &args.pretrained_dir,
            selectors.model_size,
        )?;

        // ── Step 4: Corpus ───────────────────────────────────────────────────
        tracing::info!("Loading dataset from '{}'", corpus.dataset_path);
        let dialogs = DialogCorpus::load(&corpus.dataset_path)?;

        // ── Step 5: Data sources ─────────────────────────────────────────────
        let settings = SourceSettings {
            history_len:  args.history_len,
            max_uttr_len: args.max_uttr_len,
            dialog_acts:  corpus.dialog_acts.clone(),
            floors:       corpus.floors.clone(),
        };
        let train = DataSource::new(&dialogs.train, &tokenizer, &settings, args.seed)?;
        let dev = DataSource::new(&dialogs.dev, &tokenizer, &settings, args.seed)?;
        let test = DataSource::new(&dialogs.test, &tokenizer, &settings, args.seed)?;
        log.log(format!("Train data statistics: {}", train.statistics))?;
        log.log(format!("Dev data statistics: {}", dev.statistics))?;
        log.log(format!("Test data statistics: {}", test.statistics))?;
        if dev.is_empty() {
            tracing::warn!("Dev split is empty, the learning rate will never decay");
        }

        // ── Step 6: Hyper-parameters ─────────────────────────────────────────
        log.log("----- Hyper-parameters -----")?;
        for line in config.hyperparameter_lines() {
            log.log(line)?;
        }

        // ── Step 7: Seeding and device ───────────────────────────────────────
        <TrainBackend as Backend>::seed(args.seed);
        let device = <TrainBackend as Backend>::Device::default();
        tracing::info!("Using backend {} on device {:?}", BACKEND_NAME, device);

        // ── Step 8: Model ────────────────────────────────────────────────────
        let vocab_size = tokenizer.vocab_size();
        let pad_id = tokenizer.pad_id() as usize;
        let n_labels = corpus.dialog_acts.len();
        let n_floors = corpus.floors.len();

        let hre = |separate: bool| {
            HreConfig::new(
                vocab_size,
                n_labels,
                n_floors,
                pad_id,
                args.word_embedding_dim,
                args.attr_embedding_dim,
                args.sent_encoder_hidden_dim,
                args.n_sent_encoder_layers,
                args.dial_encoder_hidden_dim,
                args.n_dial_encoder_layers,
                selectors.rnn_type,
                selectors.floor_encoder,
                args.dropout,
            )
            .with_separate_target_encoder(separate)
        };

        let session = Session {
            metrics: ClassificationMetrics::new(corpus.dialog_acts.clone()),
            splits: DataSplits { train, dev, test },
            run_name,
            log,
            device: device.clone(),
            config: config.clone(),
            optimizer: selectors.optimizer,
        };

        // ── Step 9: Train ────────────────────────────────────────────────────
        match selectors.model {
            ModelKind::Hre => fit(session, hre(false).init::<TrainBackend>(&device)),
            ModelKind::HreSepUttrEnc => fit(session, hre(true).init::<TrainBackend>(&device)),
            ModelKind::Transformer => {
                let model = TransformerClassifierConfig::from_shape(
                    selectors.model_size.shape(),
                    vocab_size,
                    n_labels,
                    n_floors,
                    pad_id,
                    args.history_len.max(1) * args.max_uttr_len.max(1),
                    selectors.floor_encoder,
                    args.dropout,
                )
                .init::<TrainBackend>(&device);
                fit(session, model)
            }
        }
    }
}

/// Wrap `model` in a learner with AdamW and run the training loop.
fn fit<M>(session: Session, model: M) -> Result<RunSummary>
where
    M: AutodiffModule<TrainBackend> + DialogActClassifier<TrainBackend>,
    M::InnerModule: DialogActClassifier<InnerBackend>,
{
    let Session { config, optimizer, run_name, log, splits, metrics, device } = session;
    let args = &config.args;

    tracing::info!("Model ready: {} parameters", model.num_params());

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    // θ = θ - lr * (m / (√v + ε) + λ·θ)     λ = l2_penalty
    // Gradient clipping happens in the learner, over all parameters at once.
    tracing::info!(
        "Optimizer '{}': AdamW, weight decay {}, gradient clip {}",
        optimizer,
        args.l2_penalty,
        args.gradient_clip
    );
    let optim = AdamWConfig::new()
        .with_weight_decay(args.l2_penalty as f32)
        .init::<TrainBackend, M>();
    let mut learner = BurnLearner::new(model, optim, device, args.gradient_clip);

    if let Some(path) = &args.model_path {
        CheckpointManager::load(path, &mut learner)?;
    }

    let settings = TrainerSettings {
        n_epochs:                args.n_epochs,
        batch_size:              args.batch_size,
        eval_batch_size:         args.eval_batch_size,
        check_loss_after_n_step: args.check_loss_after_n_step,
        validate_after_n_step:   args.validate_after_n_step,
        min_lr:                  args.min_lr,
        save_model:              args.save_model,
    };

    let mut trainer = Trainer::new(
        learner,
        splits,
        ReduceLrOnPlateau::new(args.init_lr, args.lr_decay_rate),
        metrics,
        CheckpointManager::new(&config.corpus.model_dir, &run_name),
        &log,
        settings,
    );
    let summary = trainer.run()?;
    log.log(format!("Training stopped: {summary}"))?;
    Ok(summary)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: TrainArgs,
    }

    fn use_case(flags: &[&str]) -> Result<TrainUseCase> {
        let mut argv = vec!["da-recog"];
        argv.extend_from_slice(flags);
        TrainUseCase::from_args(Harness::parse_from(argv).args)
    }

    #[test]
    fn test_selectors_resolved_up_front() {
        let uc = use_case(&["--model", "hre_sep_uttr_enc", "--floor_encoder", "abs"]).unwrap();
        assert_eq!(uc.selectors.model, ModelKind::HreSepUttrEnc);
        assert_eq!(uc.selectors.floor_encoder.as_str(), "abs");
    }

    #[test]
    fn test_unknown_model_fails_before_loading_data() {
        let err = use_case(&["--model", "bert"]).err().unwrap();
        assert!(err.to_string().contains("unknown model 'bert'"));
    }

    #[test]
    fn test_missing_dataset_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let word_counts = dir.path().join("word_count.txt");
        std::fs::write(&word_counts, "hello 3\nworld 2\n").unwrap();

        let mut uc = use_case(&["--tokenizer", "ws", "--corpus", "dailydialog"]).unwrap();
        uc.config.corpus.word_count_path = word_counts.display().to_string();
        uc.config.corpus.dataset_path = dir.path().join("dataset.txt").display().to_string();

        let err = uc.execute().err().unwrap();
        assert!(err.to_string().contains("Cannot read dataset"), "{err:#}");
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_default_build_trains_on_cpu() {
        let device: burn::backend::ndarray::NdArrayDevice =
            <TrainBackend as Backend>::Device::default();
        assert_eq!(device, burn::backend::ndarray::NdArrayDevice::Cpu);
        assert_eq!(BACKEND_NAME, "ndarray (CPU)");
    }
}
