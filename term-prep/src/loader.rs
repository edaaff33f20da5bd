//! Loading a table into a dataset sink.
//!
//! The chain is always built in the same order:
//!
//! ```text
//! TableEncoder -> [balancing] -> [shuffle] -> [split] -> sink
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::diagnostics::DiagnosticSink;
use crate::encoding::config::{BalancingMode, LoadConfig};
use crate::encoding::plan::EncodingPlanBuilder;
use crate::encoding::table::TableEncoder;
use crate::error::{PrepError, Result};
use crate::log_stage;
use crate::logging::LogConfig;
use crate::pipeline::sampling::{ClassSampler, SamplingStrategy, DEFAULT_BUFFER_SIZE};
use crate::pipeline::shuffle::Shuffle;
use crate::pipeline::source::RecordSource;
use crate::pipeline::split::Split;
use crate::sink::DatasetSink;
use crate::sources::TableSource;

/// Default rows per pull when draining the pipeline.
pub const DEFAULT_DRAIN_BATCH: usize = 1000;

/// Runtime knobs of the loading pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Rows the balancing stage pulls from upstream at a time
    pub buffer_size: usize,
    /// Rows requested from the last stage per pull
    pub drain_batch: usize,
    /// Seed for reproducible shuffling, OS entropy when absent
    pub shuffle_seed: Option<u64>,
    pub log: LogConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            drain_batch: DEFAULT_DRAIN_BATCH,
            shuffle_seed: None,
            log: LogConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_drain_batch(mut self, rows: usize) -> Self {
        self.drain_batch = rows.max(1);
        self
    }
}

/// What a load run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_written: u64,
    pub input_width: usize,
    pub output_width: usize,
    /// Rows the table encoder accepted, before resampling
    pub valid_rows: u64,
    pub empty_rows: u64,
    pub invalid_rows: u64,
    /// Stage names from source to sink
    pub stages: Vec<&'static str>,
    pub time_ms: u64,
}

fn sampling_strategy(mode: BalancingMode) -> Option<SamplingStrategy> {
    match mode {
        BalancingMode::None => None,
        BalancingMode::Uniform => Some(SamplingStrategy::Uniform),
        BalancingMode::Undersample => Some(SamplingStrategy::Undersample),
        BalancingMode::Oversample => Some(SamplingStrategy::Oversample),
    }
}

/// Encodes `source` per `config` and writes every resulting row to `sink`.
///
/// `sink.append` is called once per row and `sink.flush` once at the end.
#[instrument(skip_all, fields(source = %source.description()))]
pub fn load_table(
    source: &dyn TableSource,
    config: &LoadConfig,
    pipeline: &PipelineConfig,
    sink: &mut dyn DatasetSink,
    diagnostics: Arc<dyn DiagnosticSink>,
) -> Result<LoadSummary> {
    let start_time = Instant::now();
    let plan = EncodingPlanBuilder::new()
        .normalization(config.normalization)
        .build(&config.fields)?;
    let input_width = plan.input_width();
    let output_width = plan.output_width();
    let label_index = plan.label_index();

    let mut encoder = TableEncoder::new(source, plan, Arc::clone(&diagnostics))?;
    let mut stages = vec![encoder.name()];
    let mut chain: Box<dyn RecordSource + '_> = Box::new(&mut encoder);

    if let Some(strategy) = sampling_strategy(config.effective_balancing()) {
        let label = label_index.ok_or_else(|| {
            PrepError::invalid_config(format!(
                "balancing needs an output encoded to one value, got width {output_width}"
            ))
        })?;
        chain = Box::new(ClassSampler::new(
            chain,
            strategy,
            label,
            &config.output_class_counts,
            pipeline.buffer_size,
        )?);
        log_stage!(pipeline.log, stage = strategy.name(), label, "Added balancing stage");
        stages.push(strategy.name());
    }
    if config.shuffle {
        chain = match pipeline.shuffle_seed {
            Some(seed) => Box::new(Shuffle::with_seed(chain, seed)),
            None => Box::new(Shuffle::new(chain)),
        };
        log_stage!(pipeline.log, seed = ?pipeline.shuffle_seed, "Added shuffle stage");
        stages.push("shuffle");
    }
    if let Some(bounds) = config.split {
        chain = Box::new(Split::new(chain, bounds.start, bounds.end)?);
        log_stage!(pipeline.log, start = bounds.start, end = bounds.end, "Added split stage");
        stages.push("split");
    }

    diagnostics.info("Encoding data...");
    let mut rows_written = 0u64;
    while let Some(batch) = chain.get_next(pipeline.drain_batch.max(1))? {
        for row in &batch {
            let (inputs, outputs) = row.split_at(input_width);
            sink.append(inputs, outputs)?;
        }
        rows_written += batch.len() as u64;
    }
    sink.flush()?;
    drop(chain);

    let counts = encoder.row_counts();
    let time_ms = start_time.elapsed().as_millis() as u64;
    info!(
        rows_written,
        valid_rows = counts.valid_rows,
        invalid_rows = counts.invalid_rows,
        empty_rows = counts.empty_rows,
        stages = ?stages,
        time_ms,
        "Completed table load"
    );

    Ok(LoadSummary {
        rows_written,
        input_width,
        output_width,
        valid_rows: counts.valid_rows,
        empty_rows: counts.empty_rows,
        invalid_rows: counts.invalid_rows,
        stages,
        time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::encoding::config::{FieldSpec, SplitBounds};
    use crate::sink::MemorySink;
    use crate::sources::InMemorySource;

    fn config() -> LoadConfig {
        LoadConfig {
            fields: vec![
                FieldSpec::numeric(2.0, 1.0, 1.0, 3.0),
                FieldSpec::categorical(["a", "b"]).output(),
            ],
            ..LoadConfig::default()
        }
    }

    fn run(text: &str, config: &LoadConfig) -> (LoadSummary, MemorySink) {
        let mut sink = MemorySink::new();
        let summary = load_table(
            &InMemorySource::new(text),
            config,
            &PipelineConfig::default().with_shuffle_seed(3),
            &mut sink,
            Arc::new(CollectingDiagnostics::new()),
        )
        .unwrap();
        (summary, sink)
    }

    #[test]
    fn test_plain_load() {
        let (summary, sink) = run("x,y\n1,a\n2,b\n3\n", &config());
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.invalid_rows, 1);
        assert_eq!(summary.stages, vec!["table_encoder"]);
        assert_eq!(sink.inputs, vec![vec![1.0], vec![2.0]]);
        assert_eq!(sink.outputs, vec![vec![1.0], vec![2.0]]);
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn test_full_chain() {
        let mut text = String::from("x,y\n");
        for i in 0..30 {
            text.push_str(&format!("{},{}\n", 1 + i % 3, if i < 10 { "a" } else { "b" }));
        }
        let config = LoadConfig {
            balancing: BalancingMode::Oversample,
            output_class_counts: vec![0, 10, 20],
            shuffle: true,
            split: Some(SplitBounds {
                start: 0.0,
                end: 50.0,
            }),
            ..config()
        };
        let (summary, sink) = run(&text, &config);
        assert_eq!(
            summary.stages,
            vec!["table_encoder", "oversample", "shuffle", "split"]
        );
        // oversampled to 40 rows, first half kept
        assert_eq!(summary.rows_written, 20);
        assert_eq!(sink.len(), 20);
    }

    #[test]
    fn test_balancing_dropped_without_categorical_output() {
        let config = LoadConfig {
            fields: vec![
                FieldSpec::numeric(2.0, 1.0, 1.0, 3.0).output(),
                FieldSpec::categorical(["a", "b"]),
            ],
            balancing: BalancingMode::Undersample,
            ..LoadConfig::default()
        };
        let (summary, _) = run("x,y\n1,a\n2,b\n", &config);
        assert_eq!(summary.stages, vec!["table_encoder"]);
    }
}
