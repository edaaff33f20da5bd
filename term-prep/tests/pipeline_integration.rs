//! End-to-end tests: profile a table, derive a load configuration and run
//! it through the pipeline into a sink.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use serde_json::json;
use term_prep::encoding::SplitBounds;
use term_prep::prelude::*;

const TOLERANCE: f64 = 1e-12;

fn profile_report(source: &InMemorySource) -> ProfileReport {
    ProfileReport::from(&TableProfiler::default().profile(source).unwrap())
}

fn load(
    source: &InMemorySource,
    config: &LoadConfig,
    diagnostics: Arc<CollectingDiagnostics>,
) -> (LoadSummary, MemorySink) {
    let mut sink = MemorySink::new();
    let summary = load_table(
        source,
        config,
        &PipelineConfig::default().with_shuffle_seed(7),
        &mut sink,
        diagnostics,
    )
    .unwrap();
    (summary, sink)
}

fn numbered_table(rows: usize) -> InMemorySource {
    let mut text = String::from("x,y\n");
    for i in 0..rows {
        text.push_str(&format!("{i},{}\n", i * 2));
    }
    InMemorySource::new(text)
}

fn numbered_config(split: Option<SplitBounds>) -> LoadConfig {
    LoadConfig {
        fields: vec![
            FieldSpec::numeric(50.0, 10.0, 0.0, 100.0),
            FieldSpec::numeric(100.0, 20.0, 0.0, 200.0).output(),
        ],
        split,
        ..LoadConfig::default()
    }
}

fn class_table(first: usize, second: usize) -> InMemorySource {
    let mut text = String::from("v,label\n");
    for i in 0..first {
        text.push_str(&format!("{}.5,a\n", i % 4));
    }
    for i in 0..second {
        text.push_str(&format!("{}.5,b\n", i % 4));
    }
    InMemorySource::new(text)
}

fn output_histogram(sink: &MemorySink) -> BTreeMap<u64, usize> {
    let mut counts = BTreeMap::new();
    for row in &sink.outputs {
        *counts.entry(row[0] as u64).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_profile_then_load_with_filters() {
    let source = InMemorySource::new(
        "size,color,label\n1.5,red,yes\n2.5,blue,no\n3.5,red,yes\n4.5,blue,yes\n",
    );
    let report = profile_report(&source);

    // a report document plus filters is a valid load document
    let mut document = serde_json::to_value(&report).unwrap();
    document["filters"] = json!([
        {"name": "outputs", "columns": [2]},
        {"name": "normalize"},
    ]);
    let config = LoadConfig::from_value(document).unwrap();
    assert_eq!(config.normalization, NormalizationMode::MinMax);
    assert_eq!(config.output_columns(), vec![2]);

    let (summary, sink) = load(&source, &config, Arc::new(CollectingDiagnostics::new()));
    assert_eq!(summary.rows_written, 4);
    assert_eq!(summary.input_width, 2);
    assert_eq!(summary.output_width, 1);

    let expected_inputs = [[0.0, 1.0], [1.0 / 3.0, 0.0], [2.0 / 3.0, 1.0], [1.0, 0.0]];
    for (row, expected) in sink.inputs.iter().zip(expected_inputs.iter()) {
        for (value, want) in row.iter().zip(expected.iter()) {
            assert!((value - want).abs() < TOLERANCE, "{row:?} != {expected:?}");
        }
    }
    // ordinal output: "no" is class 1, "yes" class 2
    assert_eq!(sink.outputs, vec![vec![2.0], vec![1.0], vec![2.0], vec![2.0]]);
}

#[test]
fn test_truncated_row_is_excluded_from_encoding() {
    let source = InMemorySource::new("a,b\n1,x\n1\n2,y\n");
    let report = profile_report(&source);
    assert_eq!(report.invalid_rows, 1);

    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let config = LoadConfig::from_report(&report);
    let (summary, sink) = load(&source, &config, diagnostics.clone());

    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.valid_rows, 2);
    assert_eq!(summary.invalid_rows, 1);
    assert_eq!(sink.len(), 2);
    assert_eq!(diagnostics.data_errors(), vec![(2, 1)]);
}

#[test]
fn test_unknown_class_invalidates_row() {
    let train = InMemorySource::new("n,c\n1,a\n2,b\n3,a\n");
    let config = LoadConfig::from_report(&profile_report(&train));

    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let other = InMemorySource::new("n,c\n1,a\n2,z\n\n3,b\n");
    let (summary, sink) = load(&other, &config, diagnostics.clone());

    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.invalid_rows, 1);
    assert_eq!(summary.empty_rows, 1);
    assert_eq!(sink.outputs, vec![vec![1.0], vec![2.0]]);
    assert_eq!(diagnostics.data_errors(), vec![(2, 1)]);
}

#[test]
fn test_adjacent_splits_partition_rows() {
    let source = numbered_table(101);
    let diagnostics = Arc::new(CollectingDiagnostics::new());

    let (_, all) = load(&source, &numbered_config(None), diagnostics.clone());
    let (_, head) = load(
        &source,
        &numbered_config(Some(SplitBounds {
            start: 0.0,
            end: 50.0,
        })),
        diagnostics.clone(),
    );
    let (_, tail) = load(
        &source,
        &numbered_config(Some(SplitBounds {
            start: 50.0,
            end: 100.0,
        })),
        diagnostics,
    );

    assert_eq!(all.len(), 101);
    assert_eq!(head.len(), 50);
    assert_eq!(tail.len(), 51);

    let mut joined = head.inputs.clone();
    joined.extend(tail.inputs.iter().cloned());
    assert_eq!(joined, all.inputs);
}

#[test]
fn test_invalid_split_is_rejected() {
    let config = numbered_config(Some(SplitBounds {
        start: 60.0,
        end: 40.0,
    }));
    let mut sink = MemorySink::new();
    let err = load_table(
        &numbered_table(10),
        &config,
        &PipelineConfig::default(),
        &mut sink,
        Arc::new(CollectingDiagnostics::new()),
    )
    .unwrap_err();

    assert!(matches!(err, PrepError::InvalidConfiguration(_)));
    assert!(sink.is_empty());
}

#[test]
fn test_undersample_and_oversample_counts() {
    let source = class_table(10, 30);
    let report = profile_report(&source);
    assert_eq!(report.last_column_info.classes.get("a"), Some(&10));

    let mut config = LoadConfig::from_report(&report);
    assert_eq!(config.output_class_counts, vec![0, 10, 30]);

    config.balancing = BalancingMode::Undersample;
    let (summary, sink) = load(&source, &config, Arc::new(CollectingDiagnostics::new()));
    assert_eq!(summary.rows_written, 20);
    assert_eq!(summary.stages, vec!["table_encoder", "undersample"]);
    assert_eq!(output_histogram(&sink), BTreeMap::from([(1, 10), (2, 10)]));

    config.balancing = BalancingMode::Oversample;
    let (summary, sink) = load(&source, &config, Arc::new(CollectingDiagnostics::new()));
    assert_eq!(summary.rows_written, 60);
    assert_eq!(output_histogram(&sink), BTreeMap::from([(1, 30), (2, 30)]));
}

#[test]
fn test_balancing_from_load_document() {
    let source = class_table(8, 12);
    let mut document = serde_json::to_value(profile_report(&source)).unwrap();
    document["filters"] = json!([
        {"name": "outputs", "columns": [1]},
        {"name": "balance", "sample": "uniform"},
        {"name": "shuffle"},
    ]);
    document["output_class_counts"] = json!({"1": 8, "2": "12"});

    let config = LoadConfig::from_value(document).unwrap();
    assert_eq!(config.effective_balancing(), BalancingMode::Uniform);

    let (summary, sink) = load(&source, &config, Arc::new(CollectingDiagnostics::new()));
    assert_eq!(summary.stages, vec!["table_encoder", "uniform", "shuffle"]);
    assert_eq!(output_histogram(&sink), BTreeMap::from([(1, 10), (2, 10)]));
}

#[test]
fn test_shuffle_with_seed_is_reproducible() {
    let source = numbered_table(200);
    let config = LoadConfig {
        shuffle: true,
        ..numbered_config(None)
    };
    let diagnostics = Arc::new(CollectingDiagnostics::new());

    let (_, first) = load(&source, &config, diagnostics.clone());
    let (_, second) = load(&source, &config, diagnostics.clone());
    let (_, plain) = load(&source, &numbered_config(None), diagnostics);

    assert_eq!(first, second);
    assert_ne!(first.inputs, plain.inputs);

    let mut sorted = first.inputs.clone();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]));
    assert_eq!(sorted, plain.inputs);
}

#[test]
fn test_load_into_delimited_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    let source = InMemorySource::new("n,c\n1,a\n2,b\n3,a\n");
    let config = LoadConfig::from_report(&profile_report(&source));

    let mut sink = DelimitedSink::with_delimiter(fs::File::create(&path).unwrap(), ';');
    let summary = load_table(
        &source,
        &config,
        &PipelineConfig::default(),
        &mut sink,
        Arc::new(CollectingDiagnostics::new()),
    )
    .unwrap();
    sink.into_inner().unwrap();

    assert_eq!(summary.rows_written, 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), "1;1\n2;2\n3;1\n");
}

#[test]
fn test_encoding_reports_progress() {
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    load(&numbered_table(3), &numbered_config(None), diagnostics.clone());

    let infos: Vec<String> = diagnostics
        .messages()
        .into_iter()
        .filter_map(|d| match d {
            Diagnostic::Info(msg) => Some(msg),
            _ => None,
        })
        .collect();
    assert_eq!(infos, vec!["Scanning data...", "Encoding data..."]);
}
