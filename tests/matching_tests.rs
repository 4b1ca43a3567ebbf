//! Integration tests for name matching, dataset runs and index swaps

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use clap::ValueEnum;

use nub_matcher::catalog::handle::{BackboneListener, IndexHandle, IndexReloader};
use nub_matcher::catalog::snapshot::BackboneSource;
use nub_matcher::catalog::store::CatalogError;
use nub_matcher::core::classification::{Classification, HigherRank};
use nub_matcher::core::normalize::normalize;
use nub_matcher::core::types::{DatasetKey, Rank, SourceId, TaxonomicStatus, UsageKey};
use nub_matcher::matching::dataset::{
    DatasetMatchError, DatasetMatcher, MatchControl, MemoryRecordProvider, MemoryRelationSink,
    RecordError, Relation, SourceRecord,
};
use nub_matcher::matching::engine::NoMatchReason;
use nub_matcher::similarity::{convert_edit_distance_to_similarity, Metric};
use nub_matcher::{CandidateIndex, CandidateUsage, MatchOutcome, MatchingEngine, NameQuery};

fn species(key: u64, name: &str, author: &str) -> CandidateUsage {
    CandidateUsage::new(UsageKey(key), name, Rank::Species, TaxonomicStatus::Accepted)
        .with_authorship(author)
}

fn backbone() -> Vec<CandidateUsage> {
    vec![
        species(1, "Abies alba", "Mill.").with_classification(
            Classification::new()
                .with(HigherRank::Kingdom, "Plantae")
                .with(HigherRank::Family, "Pinaceae"),
        ),
        species(2, "Pinus nigra", "J.F.Arnold"),
        CandidateUsage::new(UsageKey(10), "Oenanthe", Rank::Genus, TaxonomicStatus::Accepted)
            .with_authorship("L."),
        CandidateUsage::new(UsageKey(11), "Oenanthe", Rank::Genus, TaxonomicStatus::Accepted)
            .with_authorship("Vieillot"),
    ]
}

fn index() -> CandidateIndex {
    CandidateIndex::build(backbone()).unwrap()
}

#[test]
fn test_similarity_bounds_for_every_metric() {
    let pairs = [
        ("Abies alba", "Abies alba"),
        ("Abies alba", "Abies olba"),
        ("Linaria pedunculata", "Lunaria pedunculata"),
        ("", "Abies"),
        ("Quercus", "Puma concolor"),
    ];
    for metric in Metric::value_variants() {
        let sim = metric.build();
        for (a, b) in pairs {
            let score = sim.similarity(a, b);
            assert!((0.0..=100.0).contains(&score), "{} {a} {b}: {score}", sim.name());
            assert!((sim.similarity(a, a) - 100.0).abs() < 0.001, "{} {a}", sim.name());
        }
    }
}

#[test]
fn test_edit_distance_conversion() {
    assert!((convert_edit_distance_to_similarity(0, "1234567890", "1234567890") - 100.0).abs() < 0.001);
    assert!(convert_edit_distance_to_similarity(10, "1234567", "123456789").abs() < 0.001);
}

#[test]
fn test_normalize_is_idempotent_and_case_insensitive() {
    for s in ["Abies alba", "Céphalanthera RUBRA", "  Puma   concolor ", "Abies × borisii-regis"] {
        let n = normalize(s);
        assert_eq!(normalize(&n), n);
        assert_eq!(normalize(&s.to_uppercase()), n);
    }
}

#[test]
fn test_every_indexed_name_is_found() {
    let index = index();
    for usage in backbone() {
        assert!(!index.lookup(&normalize(&usage.canonical_name)).is_empty());
    }
    assert!(index.lookup(&normalize("Xyzzy plugh")).is_empty());
}

#[test]
fn test_unknown_name_is_no_match() {
    let index = index();
    let result = MatchingEngine::new(&index)
        .match_name(&NameQuery::new("Quercus robur"))
        .unwrap();
    assert!(matches!(
        result.outcome,
        MatchOutcome::NoMatch(NoMatchReason::NoCandidates)
    ));
}

#[test]
fn test_single_compatible_candidate_is_match() {
    let index = index();
    let query = NameQuery::new("Abies alba")
        .with_authorship("Mill.")
        .with_classification(Classification::new().with(HigherRank::Family, "Pinaceae"));
    let result = MatchingEngine::new(&index).match_name(&query).unwrap();
    match result.outcome {
        MatchOutcome::Match(c) => assert_eq!(c.key(), UsageKey(1)),
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn test_homonyms_with_different_authors_are_ambiguous() {
    let index = index();
    let result = MatchingEngine::new(&index)
        .match_name(&NameQuery::new("Oenanthe"))
        .unwrap();
    match result.outcome {
        MatchOutcome::Ambiguous(candidates) => {
            let keys: Vec<UsageKey> = candidates.iter().map(|c| c.key()).collect();
            assert_eq!(keys, vec![UsageKey(10), UsageKey(11)]);
        }
        other => panic!("expected ambiguous, got {other:?}"),
    }
}

/// Alternates between two backbones that give "Abies alba" a different key
struct AlternatingSource {
    generation: AtomicU64,
}

impl BackboneSource for AlternatingSource {
    fn load(&self) -> Result<Vec<CandidateUsage>, CatalogError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let key = if generation % 2 == 0 { 100 } else { 1 };
        Ok(vec![species(key, "Abies alba", "Mill.")])
    }

    fn describe(&self) -> String {
        "alternating test backbone".to_string()
    }
}

#[test]
fn test_readers_never_see_a_partial_index() {
    let handle = IndexHandle::from_index(index());
    let reloader = IndexReloader::new(
        handle.clone(),
        AlternatingSource {
            generation: AtomicU64::new(0),
        },
    );
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut matched = 0;
                while !done.load(Ordering::Relaxed) || matched == 0 {
                    let index = handle.current().unwrap();
                    let result = MatchingEngine::new(&index)
                        .match_name(&NameQuery::new("Abies alba Mill."))
                        .unwrap();
                    let key = result.outcome.selected().map(|c| c.key());
                    assert!(
                        key == Some(UsageKey(1)) || key == Some(UsageKey(100)),
                        "unexpected {key:?}"
                    );
                    matched += 1;
                }
                matched
            })
        })
        .collect();

    for _ in 0..20 {
        assert_eq!(reloader.backbone_changed().unwrap(), 1);
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_reload_failure_keeps_current_index() {
    struct BrokenSource;

    impl BackboneSource for BrokenSource {
        fn load(&self) -> Result<Vec<CandidateUsage>, CatalogError> {
            Err(CatalogError::InvalidRow {
                line: 2,
                message: "broken".to_string(),
            })
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    let handle = IndexHandle::from_index(index());
    let reloader = IndexReloader::new(handle.clone(), BrokenSource);
    assert!(reloader.backbone_changed().is_err());
    assert_eq!(handle.current().unwrap().len(), 4);
}

fn dataset_matcher(
    datasets: Vec<(DatasetKey, Vec<Result<SourceRecord, RecordError>>)>,
) -> DatasetMatcher<MemoryRecordProvider, MemoryRelationSink> {
    let provider = datasets
        .into_iter()
        .fold(MemoryRecordProvider::new(), |p, (key, records)| {
            p.with_dataset(key, records)
        });
    DatasetMatcher::new(
        IndexHandle::from_index(index()),
        provider,
        MemoryRelationSink::new(),
    )
}

#[test]
fn test_dataset_counts_and_relations() {
    let key = DatasetKey::new("checklist");
    let matcher = dataset_matcher(vec![(
        key.clone(),
        vec![
            Ok(SourceRecord::new("r1", "Abies alba Mill.")),
            Ok(SourceRecord::new("r2", "Oenanthe").with_rank(Rank::Genus)),
            Ok(SourceRecord::new("r3", "Quercus robur")),
            Ok(SourceRecord::new("r4", "incertae sedis")),
            Err(RecordError::InvalidRow {
                line: 6,
                message: "missing scientific name".to_string(),
            }),
            Ok(SourceRecord::new("r6", "Pinus nigra")),
        ],
    )]);

    let summary = matcher.match_dataset(&key, &MatchControl::new()).unwrap();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.ambiguous, 1);
    assert_eq!(summary.no_match, 1);
    assert_eq!(summary.parse_failed, 1);
    assert_eq!(summary.failed_records, 1);
    assert_eq!(summary.perc_matched(), 33);

    let relations = matcher.sink().relations(&key);
    let keys: Vec<(String, UsageKey)> = relations
        .iter()
        .map(|r| (r.source_id.0.clone(), r.usage_key))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("r1".to_string(), UsageKey(1)),
            ("r6".to_string(), UsageKey(2))
        ]
    );
}

#[test]
fn test_parallel_datasets() {
    let a = DatasetKey::new("a");
    let b = DatasetKey::new("b");
    let matcher = dataset_matcher(vec![
        (a.clone(), vec![Ok(SourceRecord::new("1", "Abies alba"))]),
        (b.clone(), vec![Ok(SourceRecord::new("1", "Quercus robur"))]),
    ]);

    let results = matcher.match_datasets(&[a.clone(), b.clone()], &MatchControl::new());
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, a);
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, b);
    assert!(matches!(results[1].1, Err(DatasetMatchError::EmptyResult { .. })));
}

#[test]
fn test_cancelled_run_keeps_previous_relations() {
    let key = DatasetKey::new("checklist");
    let matcher = dataset_matcher(vec![(
        key.clone(),
        vec![Ok(SourceRecord::new("r1", "Abies alba"))],
    )]);
    let previous = vec![Relation {
        source_id: SourceId::new("old"),
        usage_key: UsageKey(2),
        doubtful: false,
        confidence: 100.0,
    }];
    matcher.sink().seed(key.clone(), previous.clone());

    let control = MatchControl::new();
    control.cancel();
    let err = matcher.match_dataset(&key, &control).unwrap_err();
    assert!(matches!(err, DatasetMatchError::Cancelled { .. }));
    assert_eq!(err.summary().map(|s| s.total), Some(0));
    assert_eq!(matcher.sink().relations(&key), previous);
}

#[test]
fn test_unknown_dataset_is_structural_error() {
    let matcher = dataset_matcher(Vec::new());
    let err = matcher
        .match_dataset(&DatasetKey::new("missing"), &MatchControl::new())
        .unwrap_err();
    assert!(matches!(err, DatasetMatchError::Source(_)));
    assert!(err.summary().is_none());
}
