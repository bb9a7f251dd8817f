//! End-to-end classification runs against mocked services.

mod common;

use std::sync::Arc;

use serde_json::Value;
use tmkp_edge_qc::QcPipeline;

use common::{
    CHEMICAL_PAF_EDGE, EDGES, GENE_PAF_EDGE, MockServices, biomedical_services, read_output,
    shared_name_services, spawn, test_config, write_corpus, write_edges,
};

const BUCKETS: [&str; 3] = ["passed", "unresolved", "ambiguous"];

/// (subject, object, classification, debug trace) for every output row.
fn assignments(dir: &std::path::Path) -> Vec<(String, String, String, Value)> {
    let mut rows: Vec<_> = BUCKETS
        .iter()
        .flat_map(|bucket| read_output(dir, bucket))
        .map(|row| {
            (
                row["subject"].as_str().unwrap_or_default().to_string(),
                row["object"].as_str().unwrap_or_default().to_string(),
                row["qc_classification"].as_str().unwrap_or_default().to_string(),
                row["qc_debug"].clone(),
            )
        })
        .collect();
    rows.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));
    rows
}

#[tokio::test]
async fn test_full_run_classifies_fixture_corpus() {
    let services = Arc::new(biomedical_services());
    let base_url = spawn(Arc::clone(&services).router()).await;
    let work = tempfile::tempdir().unwrap();
    let (edges, nodes) = write_corpus(work.path());
    let out = work.path().join("out");

    let pipeline = QcPipeline::from_config(&test_config(&base_url, &out)).unwrap();
    let summary = pipeline.run(&edges, &nodes).await.unwrap();

    assert_eq!(summary.edges_processed, EDGES.len());
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.ambiguous, 1);
    assert_eq!(summary.unresolved, 3);
    assert_eq!(summary.unique_entities, 7);
    assert_eq!(summary.normalized_entities, 6);
    assert!(summary.lookup_calls > 0);

    // Only bulk lookups are used and each batch re-fetches its synonyms.
    assert_eq!(MockServices::calls(&services.lookup_calls), 0);
    assert_eq!(
        MockServices::calls(&services.bulk_calls),
        summary.lookup_calls
    );

    let passed = read_output(&out, "passed");
    assert_eq!(passed.len(), 2);
    let first = &passed[0];
    assert_eq!(first["subject_name"], "doxorubicin");
    assert_eq!(first["object_name"], "XRCC1");
    assert_eq!(first["qc_phase"], "phase1_entity_identification");
    assert_eq!(first["publications"][0], "PMID:1");
    assert_eq!(first["qc_debug"]["object_preferred"], "NCBIGene:7515");
    assert_eq!(
        first["qc_debug"]["subject"]["lookup_data"]["doxorubicin"][0]["curie"],
        "CHEBI:28748"
    );
    assert!(first["edge_id"].as_str().is_some_and(|id| id.len() == 36));

    // The gene-only edge passes because the mouse homolog is filtered out.
    assert_eq!(passed[1]["subject"], "NCBIGene:8788");

    let ambiguous = read_output(&out, "ambiguous");
    assert_eq!(ambiguous[0]["subject"], "CHEBI:81569");
    assert_eq!(
        ambiguous[0]["qc_debug"]["reason"],
        "Multiple entities have \"FSH\" as preferred label"
    );

    let unresolved = read_output(&out, "unresolved");
    let reasons: Vec<&str> = unresolved
        .iter()
        .map(|row| row["qc_debug"]["reason"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "No supporting text available",
            "Subject synonym \"insulin\" resolves to UNII:DIFFERENT but expected CHEBI:5931",
            "Missing normalized data for subject",
        ]
    );
    // Name falls back to the normalized label, then the CURIE.
    assert_eq!(unresolved[1]["subject_name"], "insulin");
    assert_eq!(unresolved[2]["subject_name"], "MONDO:0000001");
}

#[tokio::test]
async fn test_every_edge_lands_in_its_expected_bucket() {
    let services = Arc::new(biomedical_services());
    let base_url = spawn(services.router()).await;
    let work = tempfile::tempdir().unwrap();
    let (edges, nodes) = write_corpus(work.path());
    let out = work.path().join("out");

    QcPipeline::from_config(&test_config(&base_url, &out))
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap();

    for (line, expected) in EDGES {
        let edge: Value = serde_json::from_str(line).unwrap();
        let found = read_output(&out, expected).into_iter().any(|row| {
            row["subject"] == edge["subject"]
                && row["object"] == edge["object"]
                && row["sentences"] == edge["sentences"]
        });
        assert!(found, "edge {line} not in {expected}");
    }
}

#[tokio::test]
async fn test_repeated_runs_assign_identically() {
    let services = Arc::new(biomedical_services());
    let base_url = spawn(services.router()).await;
    let work = tempfile::tempdir().unwrap();
    let (edges, nodes) = write_corpus(work.path());
    let first = work.path().join("first");
    let second = work.path().join("second");

    for out in [&first, &second] {
        QcPipeline::from_config(&test_config(&base_url, out))
            .unwrap()
            .run(&edges, &nodes)
            .await
            .unwrap();
    }

    assert_eq!(assignments(&first), assignments(&second));
}

#[tokio::test]
async fn test_cross_batch_cache_does_not_change_results() {
    let services = Arc::new(biomedical_services());
    let base_url = spawn(Arc::clone(&services).router()).await;
    let work = tempfile::tempdir().unwrap();
    let (edges, nodes) = write_corpus(work.path());
    let per_batch = work.path().join("per_batch");
    let retained = work.path().join("retained");

    QcPipeline::from_config(&test_config(&base_url, &per_batch))
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap();

    let mut config = test_config(&base_url, &retained);
    config.pipeline.retain_lookup_cache = true;
    let summary = QcPipeline::from_config(&config)
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap();

    assert_eq!(assignments(&per_batch), assignments(&retained));
    // doxorubicin and DLK1 are fetched once instead of once per batch.
    assert_eq!(summary.synonyms_looked_up, 6);
}

/// Run `edge_lines` in batches of `batch_size` and return the assignments.
async fn run_edges(
    base_url: &str,
    dir: &std::path::Path,
    edge_lines: &[&str],
    batch_size: usize,
    retain_lookup_cache: bool,
) -> Vec<(String, String, String, Value)> {
    let (edges, nodes) = write_edges(dir, edge_lines);
    let out = dir.join("out");
    let mut config = test_config(base_url, &out);
    config.pipeline.batch_size = batch_size;
    config.pipeline.retain_lookup_cache = retain_lookup_cache;
    QcPipeline::from_config(&config)
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap();
    assignments(&out)
}

#[tokio::test]
async fn test_shared_name_resolves_per_entity_type() {
    let services = Arc::new(shared_name_services());
    let base_url = spawn(Arc::clone(&services).router()).await;
    let work = tempfile::tempdir().unwrap();
    let both = [GENE_PAF_EDGE, CHEMICAL_PAF_EDGE];

    let alone = run_edges(
        &base_url,
        &work.path().join("alone"),
        &[CHEMICAL_PAF_EDGE],
        2,
        false,
    )
    .await;
    assert_eq!(alone.len(), 1);
    assert_eq!(alone[0].2, "passed", "{}", alone[0].3);
    let chemical = alone[0].clone();

    let runs = [
        ("same_batch", 2, false),
        ("split_retained", 1, true),
        ("split_per_batch", 1, false),
    ];
    for (name, batch_size, retain) in runs {
        let rows = run_edges(&base_url, &work.path().join(name), &both, batch_size, retain).await;
        let classes: Vec<&str> = rows.iter().map(|r| r.2.as_str()).collect();
        assert_eq!(classes, vec!["passed", "passed"], "{name}: {rows:?}");

        let row = rows.iter().find(|r| r.0 == "CHEBI:1").unwrap();
        assert_eq!(row, &chemical, "{name}");
        assert_eq!(row.3["subject"]["lookup_data"]["PAF"][0]["curie"], "CHEBI:1");

        let gene = rows.iter().find(|r| r.0 == "NCBIGene:1").unwrap();
        assert_eq!(gene.3["subject"]["lookup_data"]["PAF"][0]["curie"], "NCBIGene:1");
    }
}

#[tokio::test]
async fn test_max_edges_limits_the_run() {
    let services = Arc::new(biomedical_services());
    let base_url = spawn(services.router()).await;
    let work = tempfile::tempdir().unwrap();
    let (edges, nodes) = write_corpus(work.path());
    let out = work.path().join("out");

    let mut config = test_config(&base_url, &out);
    config.pipeline.max_edges = Some(3);
    let summary = QcPipeline::from_config(&config)
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap();

    assert_eq!(summary.edges_processed, 3);
    assert_eq!(summary.passed + summary.unresolved + summary.ambiguous, 3);
}

#[tokio::test]
async fn test_malformed_edge_aborts_run() {
    let services = Arc::new(biomedical_services());
    let base_url = spawn(services.router()).await;
    let work = tempfile::tempdir().unwrap();
    let (_, nodes) = write_corpus(work.path());
    let edges = work.path().join("broken.jsonl");
    std::fs::write(&edges, format!("{}\n{{oops\n", EDGES[0].0)).unwrap();

    let err = QcPipeline::from_config(&test_config(&base_url, &work.path().join("out")))
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("broken.jsonl:2"));
}

#[tokio::test]
async fn test_service_failure_aborts_run() {
    let mut services = biomedical_services();
    services.synonym_status = Some(400);
    let base_url = spawn(Arc::new(services).router()).await;
    let work = tempfile::tempdir().unwrap();
    let (edges, nodes) = write_corpus(work.path());

    let err = QcPipeline::from_config(&test_config(&base_url, &work.path().join("out")))
        .unwrap()
        .run(&edges, &nodes)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("synonym retrieval stage failed"));
}
