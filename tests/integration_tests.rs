//! # Testes de Integração
//!
//! Validam o fluxo completo do sistema com o provedor estático:
//! - Arquivo de execução → árvore de containers → sementes
//! - Pipeline completo com histórico, rodadas, retries e livro de remoções
//! - Relatórios de âncoras e tópicos gravados em JSON

use std::collections::HashMap;
use std::sync::Arc;

use keyword_clusterer::prelude::*;
use keyword_clusterer::report::GroupRange;
use keyword_clusterer::search::SearchError;
use keyword_clusterer::PipelineError;

const RUN_FILE: &str = r#"{
    "containers": [
        {
            "id": "r",
            "name": "диваны цена",
            "domain": "https://mebel.by",
            "path": "/divany",
            "extract_name": "Диваны",
            "anchor_names": ["диван недорого"]
        },
        {
            "id": "c1",
            "parent_id": "r",
            "name": "диваны в минске",
            "domain": "https://mebel.by",
            "path": "/divany/minsk",
            "extract_geo": "в Минске"
        }
    ],
    "root": "r",
    "lemmas": {
        "диваны": "диван",
        "минске": "минск",
        "угловые": "угловой"
    },
    "search": {
        "historical": {
            "https://mebel.by/divany": [
                {"query": "угловые диваны цена", "clicks": 4, "impressions": 120},
                {"query": "диваны цена купить", "clicks": 0, "impressions": 10},
                {"query": "угловые диваны цена", "clicks": 1, "impressions": 60}
            ]
        },
        "responses": {
            "диваны в минске": {
                "matched_urls": ["https://mebel.by/divany/minsk"]
            },
            "диваны цена": {
                "matched_urls": ["u1", "u2", "u3"],
                "related_keywords": ["диваны стоимость", "диван недорого"],
                "related_questions": ["сколько стоит диван"]
            },
            "угловые диваны цена": {
                "matched_urls": ["u1", "u2", "u3"],
                "related_keywords": ["диваны стоимость"]
            },
            "диваны стоимость": {
                "matched_urls": ["u1", "u2", "u4"]
            }
        },
        "failing": ["сколько стоит диван"]
    }
}"#;

fn geo_normalizer(lemmas: HashMap<String, String>) -> Arc<dyn GeoNormalizer> {
    let tokenizer = DictionaryTokenizer::new(lemmas, Arc::new(LemmaCache::new()));
    Arc::new(PrefixGeoNormalizer::new(Arc::new(tokenizer)))
}

fn temp_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("keyword-clusterer-it-{}", uuid::Uuid::new_v4()))
}

async fn run_discovery(run_file: &RunFile) -> (Result<(), PipelineError>, DiscoveryOutcome) {
    let geo = geo_normalizer(run_file.lemmas.clone());
    let tree = ContainerTree::new(run_file.containers.clone());
    let root = run_file.root.as_deref().unwrap();
    let seeds = SeedSet::from_containers(tree.seed_cluster(root), geo.as_ref());

    let provider = Arc::new(run_file.search.clone());
    let mut pipeline = DiscoveryPipeline::new(
        PipelineConfig::default(),
        seeds,
        provider.clone(),
        provider,
        geo,
    );
    let result = pipeline.run().await;
    (result, pipeline.into_outcome())
}

// ============================================================================
// TESTE 1: Arquivo de execução → Sementes
// ============================================================================

#[test]
fn test_run_file_to_seed_set() {
    let run_file: RunFile = serde_json::from_str(RUN_FILE).unwrap();
    run_file.validate().unwrap();

    let geo = geo_normalizer(run_file.lemmas.clone());
    let tree = ContainerTree::new(run_file.containers.clone());
    let seeds = SeedSet::from_containers(tree.seed_cluster("r"), geo.as_ref());

    assert_eq!(seeds.source_urls.len(), 2);
    assert_eq!(seeds.source_urls[1].full(), "https://mebel.by/divany/minsk");
    assert_eq!(seeds.main_names, vec!["диваны цена"]);
    assert_eq!(seeds.geo_names, vec!["диваны в минске"]);
    assert!(seeds.clear_geos.contains("минск"));
    assert_eq!(seeds.old_anchors, vec!["диван недорого"]);
}

// ============================================================================
// TESTE 2: Pipeline completo
// Histórico filtrado, duas rodadas, uma query falhando em todos os retries
// ============================================================================

#[tokio::test]
async fn test_full_discovery_pipeline() {
    let run_file: RunFile = serde_json::from_str(RUN_FILE).unwrap();
    let (result, outcome) = run_discovery(&run_file).await;

    assert!(result.is_ok());
    assert_eq!(outcome.state, PipelineState::Done { rounds: 2 });

    // Resultados: apenas queries main bem-sucedidas, em ordem
    let texts: Vec<&str> = outcome.results.iter().map(|r| r.record.text.as_str()).collect();
    assert_eq!(texts, vec!["диваны цена", "угловые диваны цена", "диваны стоимость"]);
    assert_eq!(outcome.results[0].record.clicks, -1);
    assert_eq!(outcome.results[1].record.clicks, 4);
    assert_eq!(outcome.results[2].record.clicks, -32);

    // Geo fica fora dos resultados mas entra nas queries feitas
    assert_eq!(outcome.geo_queries.len(), 1);
    assert_eq!(outcome.made_queries.len(), 5);

    // Estatísticas
    assert_eq!(outcome.stats.rounds_completed, 2);
    assert_eq!(outcome.stats.queries_issued, 5);
    assert_eq!(outcome.stats.queries_failed, 1);
    assert_eq!(outcome.stats.failed_queries, vec!["сколько стоит диван"]);
    assert_eq!(outcome.stats.urls_without_stats, vec!["https://mebel.by/divany/minsk"]);
    assert_eq!(outcome.stats.candidates_per_round, vec![3, 2]);

    // Livro de remoções
    let ledger = &outcome.ledger;
    assert_eq!(
        ledger.removed_for(DeletionReason::BelowTrafficThreshold),
        vec!["диваны цена купить"]
    );
    assert_eq!(
        ledger.removed_for(DeletionReason::HistoricalDuplicate),
        vec!["угловые диваны цена"]
    );
    assert_eq!(
        ledger.removed_for(DeletionReason::RelatedDuplicate { stage: 2 }),
        vec!["диваны стоимость"]
    );
    assert_eq!(
        ledger.removed_for(DeletionReason::AlreadySeen { stage: 3 }),
        vec!["диван недорого"]
    );
    assert_eq!(
        ledger.removed_for(DeletionReason::SearchFailed { stage: 5 }),
        vec!["сколько стоит диван"]
    );
}

// ============================================================================
// TESTE 3: Pipeline → Relatórios → JSON
// ============================================================================

#[tokio::test]
async fn test_reports_written_as_json() {
    let run_file: RunFile = serde_json::from_str(RUN_FILE).unwrap();
    let (result, mut outcome) = run_discovery(&run_file).await;
    result.unwrap();

    let geo = geo_normalizer(run_file.lemmas.clone());
    let assembler = ReportAssembler::new(geo, LabelTable::default());
    let mut ledger = std::mem::take(&mut outcome.ledger);

    // 0.8: "диваны стоимость" (u1 u2 u4) fica sozinho e não é emitido
    let anchors = assembler
        .assemble(&outcome, ReportMode::Anchors, 0.8, &mut ledger)
        .unwrap();
    assert_eq!(anchors.groups, vec![GroupRange { start: 2, end: 3 }]);
    assert_eq!(anchors.rows[0].label, "диваны цена");
    assert_eq!(anchors.rows[1].label, "");
    assert_eq!(anchors.rows[1].clicks, Some(4));
    assert!(anchors.rows[2].is_blank());

    // 0.6: os três formam um cluster com semente, então tópicos só lista geo
    let topics = assembler
        .assemble(&outcome, ReportMode::Topics, 0.6, &mut ledger)
        .unwrap();
    assert!(topics.groups.is_empty());
    assert_eq!(topics.rows.len(), 1);
    assert_eq!(topics.rows[0].query, "диваны в минске");

    let summary = ReportAssembler::summary(&outcome, 0.6).unwrap();
    assert_eq!(summary.clusters.len(), 1);
    assert_eq!(summary.clusters[0].keys.len(), 3);

    let dir = temp_dir();
    let sink = JsonFileSink::new(&dir);
    sink.write_report(&ReportMode::Anchors.sheet_name("mebel"), &anchors).unwrap();
    sink.write_summary("mebel_clusters", &summary).unwrap();
    sink.write_ledger("mebel_ledger", &ledger).unwrap();
    sink.write_stats("mebel_stats", &outcome.stats).unwrap();

    let raw = std::fs::read_to_string(sink.path_for("mebel_clusters_anchors")).unwrap();
    let parsed: ClusterReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, anchors);

    let raw = std::fs::read_to_string(sink.path_for("mebel_ledger")).unwrap();
    let parsed: DeletionLedger = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.len(), ledger.len());

    let raw = std::fs::read_to_string(sink.path_for("mebel_clusters")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["clusters"][0]["urls"][0][0], "u1");

    std::fs::remove_dir_all(&dir).unwrap();
}

// ============================================================================
// TESTE 4: Planilha + autenticação rejeitada
// ============================================================================

#[tokio::test]
async fn test_sheet_import_with_rejected_auth() {
    let rows: Vec<Vec<String>> = vec![
        vec!["https://mebel.by/divany", "диваны цена", "", "", "", "Минск", "диван недорого"],
        vec!["https://fake.by/x", "диваны в минске", "", "", "в Минске", "", ""],
    ]
    .into_iter()
    .map(|row| row.into_iter().map(String::from).collect())
    .collect();

    let lemmas = HashMap::from([("минске".to_string(), "минск".to_string())]);
    let geo = geo_normalizer(lemmas);
    let seeds = SheetImport::from_rows(&rows, 0).seed_set(geo.as_ref());

    assert_eq!(seeds.source_urls.len(), 1);
    assert_eq!(seeds.main_names, vec!["диваны цена"]);
    assert_eq!(seeds.geo_names, vec!["диваны в минске"]);

    let provider = Arc::new(StaticSearchProvider {
        reject_auth: true,
        ..StaticSearchProvider::default()
    });
    let mut pipeline =
        DiscoveryPipeline::new(PipelineConfig::default(), seeds, provider.clone(), provider, geo);

    let result = pipeline.run().await;
    assert!(matches!(result, Err(PipelineError::Auth(SearchError::Auth(_)))));
    assert!(matches!(pipeline.state(), PipelineState::Failed { .. }));
    assert!(pipeline.results().is_empty());
}
