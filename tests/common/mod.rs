//! In-process stand-ins for the normalization and name-resolution services.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Map, Value, json};

use tmkp_edge_qc::config::{AppConfig, RetryConfig};

#[derive(Debug, Default)]
pub struct MockServices {
    pub normalized: HashMap<String, Value>,
    pub synonyms: HashMap<String, Value>,
    pub lookups: HashMap<String, Value>,
    /// Answer the next N normalizer calls with 503.
    pub normalize_failures: AtomicUsize,
    /// Fixed error status for every synonym call.
    pub synonym_status: Option<u16>,
    pub normalize_calls: AtomicUsize,
    pub synonym_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub bulk_calls: AtomicUsize,
}

impl MockServices {
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Stored candidates for `query` that satisfy the filters.
    fn answer(&self, query: &str, biolink_type: Option<&str>, taxa: Option<&str>) -> Vec<Value> {
        let wanted_taxa: Vec<&str> = taxa.map(|t| t.split('|').collect()).unwrap_or_default();
        let Some(candidates) = self.lookups.get(query).and_then(Value::as_array) else {
            return Vec::new();
        };
        candidates
            .iter()
            .filter(|c| {
                let type_ok = biolink_type.is_none_or(|t| {
                    c["types"]
                        .as_array()
                        .is_some_and(|types| types.iter().any(|x| x.as_str() == Some(t)))
                });
                let taxa_ok = wanted_taxa.is_empty()
                    || c["taxa"].as_array().is_none_or(|have| {
                        have.is_empty()
                            || have
                                .iter()
                                .any(|x| x.as_str().is_some_and(|x| wanted_taxa.contains(&x)))
                    });
                type_ok && taxa_ok
            })
            .cloned()
            .collect()
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/get_normalized_nodes", post(normalize))
            .route("/synonyms", post(synonyms))
            .route("/lookup", get(lookup))
            .route("/bulk-lookup", post(bulk_lookup))
            .with_state(self)
    }
}

async fn normalize(State(s): State<Arc<MockServices>>, Json(body): Json<Value>) -> Response {
    s.normalize_calls.fetch_add(1, Ordering::SeqCst);
    let failing = s
        .normalize_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response();
    }

    let mut out = Map::new();
    for curie in body["curies"].as_array().into_iter().flatten() {
        let curie = curie.as_str().unwrap_or_default();
        out.insert(
            curie.to_string(),
            s.normalized.get(curie).cloned().unwrap_or(Value::Null),
        );
    }
    Json(Value::Object(out)).into_response()
}

async fn synonyms(State(s): State<Arc<MockServices>>, Json(body): Json<Value>) -> Response {
    s.synonym_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(code) = s.synonym_status {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "rejected").into_response();
    }

    let mut out = Map::new();
    for curie in body["preferred_curies"].as_array().into_iter().flatten() {
        let curie = curie.as_str().unwrap_or_default();
        if let Some(set) = s.synonyms.get(curie) {
            out.insert(curie.to_string(), set.clone());
        }
    }
    Json(Value::Object(out)).into_response()
}

async fn lookup(
    State(s): State<Arc<MockServices>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    s.lookup_calls.fetch_add(1, Ordering::SeqCst);
    let query = params.get("string").map(String::as_str).unwrap_or_default();
    Json(s.answer(
        query,
        params.get("biolink_type").map(String::as_str),
        params.get("only_taxa").map(String::as_str),
    ))
}

async fn bulk_lookup(
    State(s): State<Arc<MockServices>>,
    Json(body): Json<Value>,
) -> Json<Map<String, Value>> {
    s.bulk_calls.fetch_add(1, Ordering::SeqCst);
    let biolink_type = body["biolink_types"]
        .as_array()
        .and_then(|types| types.first())
        .and_then(Value::as_str);
    let taxa = body["only_taxa"].as_str();

    let mut out = Map::new();
    for query in body["strings"].as_array().into_iter().flatten() {
        let query = query.as_str().unwrap_or_default();
        out.insert(
            query.to_string(),
            Value::Array(s.answer(query, biolink_type, taxa)),
        );
    }
    Json(out)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Configuration pointing every service at `base_url`, with fast retries and
/// no pacing.
pub fn test_config(base_url: &str, output_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.services.node_normalizer_url = base_url.to_string();
    config.services.name_resolver_url = base_url.to_string();
    config.services.timeout_secs = 5;
    config.retry = RetryConfig {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
        jitter_ms: 0,
    };
    config.resilience.requests_per_second = 0;
    config.pipeline.batch_pause_ms = 0;
    config.pipeline.batch_size = 2;
    config.pipeline.output_dir = output_dir.to_path_buf();
    config
}

fn candidate(curie: &str, label: &str, synonyms: &[&str], types: &[&str], taxa: &[&str]) -> Value {
    json!({
        "curie": curie,
        "label": label,
        "synonyms": synonyms,
        "score": 100.0,
        "types": types,
        "taxa": taxa,
    })
}

fn entity(input: &str, preferred: &str, label: &str, types: &[&str]) -> (String, Value) {
    (
        input.to_string(),
        json!({
            "id": {"identifier": preferred, "label": label},
            "equivalent_identifiers": [
                {"identifier": preferred, "label": label},
                {"identifier": input}
            ],
            "type": types,
        }),
    )
}

fn synonym_set(curie: &str, names: &[&str], types: &[&str], taxa: &[&str]) -> (String, Value) {
    (
        curie.to_string(),
        json!({
            "curie": curie,
            "preferred_name": names.first(),
            "names": names,
            "types": types,
            "taxa": taxa,
        }),
    )
}

const CHEMICAL: &str = "biolink:SmallMolecule";
const GENE: &str = "biolink:Gene";
const HUMAN: &str = "NCBITaxon:9606";
const MOUSE: &str = "NCBITaxon:10090";

/// Service answers for the fixture corpus.
pub fn biomedical_services() -> MockServices {
    let normalized = [
        entity("CHEBI:28748", "CHEBI:28748", "Doxorubicin", &[CHEMICAL]),
        entity("UniProtKB:P18887", "NCBIGene:7515", "XRCC1", &[GENE]),
        entity("CHEBI:81569", "CHEBI:81569", "Follitropin", &[CHEMICAL]),
        entity("NCBIGene:8788", "NCBIGene:8788", "DLK1", &[GENE]),
        entity("CHEBI:5931", "CHEBI:5931", "insulin", &[CHEMICAL]),
        entity("NCBIGene:3630", "NCBIGene:3630", "INS", &[GENE]),
    ]
    .into_iter()
    .collect();

    let synonyms = [
        synonym_set("CHEBI:28748", &["doxorubicin", "Adriamycin"], &["SmallMolecule"], &[]),
        synonym_set("NCBIGene:7515", &["XRCC1", "RCC"], &["Gene"], &[HUMAN]),
        synonym_set("CHEBI:81569", &["FSH", "Follitropin"], &["SmallMolecule"], &[]),
        synonym_set("NCBIGene:8788", &["DLK1", "pG2"], &["Gene"], &[HUMAN]),
        synonym_set("CHEBI:5931", &["insulin"], &["SmallMolecule"], &[]),
        synonym_set("NCBIGene:3630", &["INS"], &["Gene"], &[HUMAN]),
    ]
    .into_iter()
    .collect();

    let lookups = [
        (
            "doxorubicin",
            vec![
                candidate("CHEBI:28748", "Doxorubicin", &["doxorubicin", "Adriamycin"], &[CHEMICAL], &[]),
                candidate("UNII:80168379AG", "Doxorubicin hydrochloride", &["doxorubicin"], &[CHEMICAL], &[]),
            ],
        ),
        ("XRCC1", vec![candidate("NCBIGene:7515", "XRCC1", &["XRCC1"], &[GENE], &[HUMAN])]),
        (
            "FSH",
            vec![
                candidate("GTOPDB:4386", "FSH", &["FSH", "4384", "4377"], &[CHEMICAL], &[]),
                candidate("GTOPDB:4387", "FSH", &["FSH", "4385", "4378"], &[CHEMICAL], &[]),
                candidate("CHEBI:81569", "Follitropin", &["FSH", "Bravelle"], &[CHEMICAL], &[]),
            ],
        ),
        (
            "DLK1",
            vec![
                candidate("NCBIGene:8788", "DLK1", &["DLK1", "pG2"], &[GENE], &[HUMAN]),
                candidate("NCBIGene:13386", "Dlk1", &["Dlk1"], &[GENE], &[MOUSE]),
            ],
        ),
        (
            "insulin",
            vec![
                candidate("UNII:DIFFERENT", "insulin", &[], &[CHEMICAL], &[]),
                candidate("CHEBI:5931", "insulin human", &["insulin"], &[CHEMICAL], &[]),
            ],
        ),
        ("INS", vec![candidate("NCBIGene:3630", "INS", &["INS"], &[GENE], &[HUMAN])]),
    ]
    .into_iter()
    .map(|(query, candidates)| (query.to_string(), Value::Array(candidates)))
    .collect();

    MockServices {
        normalized,
        synonyms,
        lookups,
        ..MockServices::default()
    }
}

/// Edges (with expected classification) and nodes for the fixture corpus.
pub const EDGES: &[(&str, &str)] = &[
    (
        r#"{"subject":"CHEBI:28748","object":"UniProtKB:P18887","predicate":"biolink:affects","sentences":"XRCC1 levels increased after doxorubicin treatment.|NA","publications":["PMID:1"]}"#,
        "passed",
    ),
    (
        r#"{"subject":"CHEBI:81569","object":"NCBIGene:8788","predicate":"biolink:affects","sentences":"FSH stimulation increased DLK1"}"#,
        "ambiguous",
    ),
    (
        r#"{"subject":"CHEBI:28748","object":"UniProtKB:P18887","predicate":"biolink:affects","sentences":"NA"}"#,
        "unresolved",
    ),
    (
        r#"{"subject":"CHEBI:5931","object":"NCBIGene:3630","predicate":"biolink:affects","sentences":"insulin binds INS receptors"}"#,
        "unresolved",
    ),
    (
        r#"{"subject":"MONDO:0000001","object":"NCBIGene:8788","predicate":"biolink:affects","sentences":"DLK1 in disease"}"#,
        "unresolved",
    ),
    (
        r#"{"subject":"NCBIGene:8788","object":"CHEBI:28748","predicate":"biolink:affects","sentences":"DLK1 expression fell after doxorubicin exposure."}"#,
        "passed",
    ),
];

pub const NODES: &[&str] = &[
    r#"{"id":"CHEBI:28748","name":"doxorubicin"}"#,
    r#"{"id":"UniProtKB:P18887","name":"XRCC1"}"#,
    r#"{"id":"CHEBI:81569","name":"follitropin"}"#,
    r#"{"id":"NCBIGene:8788","name":"DLK1"}"#,
];

/// Write the fixture corpus into `dir`, returning (edges, nodes) paths.
pub fn write_corpus(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let edges = dir.join("edges.jsonl");
    let nodes = dir.join("nodes.jsonl");
    let edge_lines: Vec<&str> = EDGES.iter().map(|(line, _)| *line).collect();
    std::fs::write(&edges, edge_lines.join("\n") + "\n").unwrap();
    std::fs::write(&nodes, NODES.join("\n") + "\n").unwrap();
    (edges, nodes)
}

/// Parsed rows of one output file, in write order.
pub fn read_output(dir: &Path, classification: &str) -> Vec<Value> {
    let path = dir.join(format!("{classification}_edges.jsonl"));
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

const DISEASE: &str = "biolink:Disease";

/// A chemical and a human gene that are both called "PAF", each linked to
/// asthma.
pub fn shared_name_services() -> MockServices {
    let normalized = [
        entity("CHEBI:1", "CHEBI:1", "PAF", &[CHEMICAL]),
        entity("NCBIGene:1", "NCBIGene:1", "PAF", &[GENE]),
        entity("MONDO:0004979", "MONDO:0004979", "asthma", &[DISEASE]),
    ]
    .into_iter()
    .collect();

    let synonyms = [
        synonym_set("CHEBI:1", &["PAF", "platelet-activating factor"], &["SmallMolecule"], &[]),
        synonym_set("NCBIGene:1", &["PAF"], &["Gene"], &[HUMAN]),
        synonym_set("MONDO:0004979", &["asthma"], &["Disease"], &[]),
    ]
    .into_iter()
    .collect();

    let lookups = [
        (
            "PAF",
            vec![
                candidate("CHEBI:1", "PAF", &["PAF"], &[CHEMICAL], &[]),
                candidate("NCBIGene:1", "PAF", &["PAF"], &[GENE], &[HUMAN]),
            ],
        ),
        ("asthma", vec![candidate("MONDO:0004979", "asthma", &["asthma"], &[DISEASE], &[])]),
    ]
    .into_iter()
    .map(|(query, candidates)| (query.to_string(), Value::Array(candidates)))
    .collect();

    MockServices {
        normalized,
        synonyms,
        lookups,
        ..MockServices::default()
    }
}

pub const GENE_PAF_EDGE: &str = r#"{"subject":"NCBIGene:1","object":"MONDO:0004979","predicate":"biolink:contributes_to","sentences":"PAF expression rises in asthma"}"#;
pub const CHEMICAL_PAF_EDGE: &str = r#"{"subject":"CHEBI:1","object":"MONDO:0004979","predicate":"biolink:contributes_to","sentences":"PAF worsens asthma"}"#;

/// Write `edge_lines` and an empty node file into `dir`, returning
/// (edges, nodes) paths.
pub fn write_edges(dir: &Path, edge_lines: &[&str]) -> (std::path::PathBuf, std::path::PathBuf) {
    std::fs::create_dir_all(dir).unwrap();
    let edges = dir.join("edges.jsonl");
    let nodes = dir.join("nodes.jsonl");
    std::fs::write(&edges, edge_lines.join("\n") + "\n").unwrap();
    std::fs::write(&nodes, "").unwrap();
    (edges, nodes)
}
