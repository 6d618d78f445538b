// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PIPELINE DE DESCOBERTA DE QUERIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Orquestrador em estágios:
//   Seed → Filter → {Classify → Query → Expand} × rodadas → Done
//
// O pipeline é dono de todos os acumuladores (queries feitas, resultados,
// queries geo, livro de remoções). Os workers de busca são puros: recebem
// uma query e devolvem a resposta; a agregação acontece aqui, depois que
// todos terminam.
//
// Contador de estágio: começa em 1 e avança +1 depois de Classify, Query e
// Expand. Os códigos de proveniência usam o valor no Expand:
// rodada 1 → -32/-33, rodada 2 → -62/-63, rodada 3 → -92/-93.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod setup;
mod state;
mod stats;

pub use setup::{ContainerTree, SeedSet, SheetImport, SheetRow};
pub use state::PipelineState;
pub use stats::RunStats;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::classifier::{ClassifierVocabulary, QueryClassifier, SortedQueries};
use crate::clustering::{dedup_exact, SimilarityClusterer, EXACT_DUPLICATE};
use crate::config::PipelineConfig;
use crate::geo::{GeoNormalizer, GeoVocabulary};
use crate::ledger::{DeletionLedger, DeletionReason};
use crate::performance::ClusterError;
use crate::search::{HistoricalSource, SearchError, SearchProvider, SearchResponse};
use crate::types::{Bucket, DiscoveredQuery, Provenance, QueryRecord, RelatedKind};
use crate::utils::{is_blank, retry, StageTimer};

/// Erros fatais do pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Authentication failed: {0}")]
    Auth(SearchError),

    #[error("Clustering failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Invalid vocabulary: {0}")]
    Vocabulary(#[from] regex::Error),
}

/// Itens relacionados coletados em uma rodada
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RelatedItems {
    keywords: Vec<String>,
    questions: Vec<String>,
}

/// Resultado de uma execução, consumido pelo relatório
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Queries main pesquisadas com suas URLs
    pub results: Vec<DiscoveredQuery>,
    /// Queries geo aceitas em todas as rodadas
    pub geo_queries: Vec<QueryRecord>,
    /// Queries enviadas ao provedor
    pub made_queries: Vec<QueryRecord>,
    /// Lemas geográficos
    pub clear_geos: GeoVocabulary,
    /// Lemas de cidades
    pub clear_cities: GeoVocabulary,
    /// Livro de remoções
    pub ledger: DeletionLedger,
    /// Estatísticas
    pub stats: RunStats,
    /// Estado final
    pub state: PipelineState,
}

impl DiscoveryOutcome {
    /// Vocabulário usado para remover frases geográficas do relatório
    pub fn geo_and_cities(&self) -> GeoVocabulary {
        self.clear_geos.union(&self.clear_cities).cloned().collect()
    }
}

/// Pipeline de descoberta
///
/// Usado uma vez: `run()` e depois `into_outcome()`. Em falha fatal o estado
/// parcial continua acessível pelos getters.
pub struct DiscoveryPipeline {
    config: PipelineConfig,
    provider: Arc<dyn SearchProvider>,
    historical: Arc<dyn HistoricalSource>,
    geo: Arc<dyn GeoNormalizer>,
    seeds: SeedSet,
    stop_lemmas: Vec<String>,
    inclusion_lemmas: Vec<String>,
    state: PipelineState,
    made_queries: Vec<QueryRecord>,
    results: Vec<DiscoveredQuery>,
    geo_queries: Vec<QueryRecord>,
    ledger: DeletionLedger,
    stats: RunStats,
}

impl DiscoveryPipeline {
    /// Cria pipeline; stop words e palavras de inclusão são lematizadas aqui
    pub fn new(
        config: PipelineConfig,
        seeds: SeedSet,
        provider: Arc<dyn SearchProvider>,
        historical: Arc<dyn HistoricalSource>,
        geo: Arc<dyn GeoNormalizer>,
    ) -> Self {
        let lemmatize = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|word| geo.lemma_of_query(word))
                .filter(|lemma| !lemma.is_empty())
                .collect()
        };
        let stop_lemmas = lemmatize(&config.stop_words);
        let inclusion_lemmas = lemmatize(&config.inclusion_words);

        Self {
            config,
            provider,
            historical,
            geo,
            seeds,
            stop_lemmas,
            inclusion_lemmas,
            state: PipelineState::Seed,
            made_queries: Vec::new(),
            results: Vec::new(),
            geo_queries: Vec::new(),
            ledger: DeletionLedger::new(),
            stats: RunStats::new(),
        }
    }

    /// Estado atual
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Livro de remoções até aqui
    pub fn ledger(&self) -> &DeletionLedger {
        &self.ledger
    }

    /// Resultados até aqui
    pub fn results(&self) -> &[DiscoveredQuery] {
        &self.results
    }

    /// Queries enviadas até aqui
    pub fn made_queries(&self) -> &[QueryRecord] {
        &self.made_queries
    }

    /// Queries geo acumuladas
    pub fn geo_queries(&self) -> &[QueryRecord] {
        &self.geo_queries
    }

    /// Estatísticas até aqui
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Consome o pipeline e devolve o resultado
    pub fn into_outcome(self) -> DiscoveryOutcome {
        DiscoveryOutcome {
            results: self.results,
            geo_queries: self.geo_queries,
            made_queries: self.made_queries,
            clear_geos: self.seeds.clear_geos,
            clear_cities: self.seeds.clear_cities,
            ledger: self.ledger,
            stats: self.stats,
            state: self.state,
        }
    }

    /// Executa o pipeline completo
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        log::info!(
            "🚀 Iniciando descoberta: {} rodada(s), {} worker(s), run {}",
            self.config.rounds,
            self.config.workers,
            self.stats.run_id
        );

        if let Err(e) = self.authenticate().await {
            log::error!("❌ Autenticação falhou: {}", e);
            self.transition(PipelineState::Failed {
                reason: e.to_string(),
            });
            self.stats.finish();
            return Err(PipelineError::Auth(e));
        }

        let seeds = self.seeds.seed_queries();
        log::info!("🌱 {} semente(s) de containers", seeds.len());

        self.transition(PipelineState::Filter);
        let timer = StageTimer::start("filter");
        let historical = self.fetch_historical().await;
        let filtered = self.filter_historical(historical)?;
        timer.stop_into(&mut self.stats.timings);

        let mut candidates = seeds;
        candidates.extend(filtered);

        let classifier = QueryClassifier::new(
            Arc::clone(&self.geo),
            &ClassifierVocabulary {
                stop_words: self.stop_lemmas.clone(),
                geo: self.seeds.clear_geos.clone(),
                cities: self.seeds.clear_cities.clone(),
                inclusion_words: self.inclusion_lemmas.clone(),
            },
        )?;

        let mut stage: u32 = 1;
        let mut rounds = 0;
        for round in 1..=self.config.rounds {
            self.stats.candidates_per_round.push(candidates.len());

            self.transition(PipelineState::Classify { round, stage });
            let timer = StageTimer::start("classify");
            let sorted = classifier.sort_queries(candidates, stage, &mut self.ledger);
            self.geo_queries.extend(sorted.geo.iter().cloned());
            timer.stop_into(&mut self.stats.timings);
            stage += 1;

            self.transition(PipelineState::Query { round, stage });
            let timer = StageTimer::start("query");
            let related = self.query_round(sorted, stage).await;
            timer.stop_into(&mut self.stats.timings);
            stage += 1;

            self.transition(PipelineState::Expand { round, stage });
            let timer = StageTimer::start("expand");
            candidates = self.expand(related, stage)?;
            timer.stop_into(&mut self.stats.timings);
            stage += 1;

            rounds = round;
            self.stats.rounds_completed = round;
            log::info!("🔄 Rodada {} concluída: {} novo(s) candidato(s)", round, candidates.len());

            if candidates.is_empty() {
                log::info!("🏁 Nenhum candidato novo, encerrando antes do limite");
                break;
            }
        }

        self.transition(PipelineState::Done { rounds });
        self.stats.finish();
        log::info!(
            "✅ Descoberta concluída: {} resultado(s), {} query(s) geo, {} removido(s)",
            self.results.len(),
            self.geo_queries.len(),
            self.ledger.total_removed()
        );
        Ok(())
    }

    fn transition(&mut self, next: PipelineState) {
        if !self.state.can_transition_to(&next) {
            log::warn!("⚠️ Transição inesperada: {:?} → {:?}", self.state, next);
        }
        log::debug!("➡️  {} → {}", self.state.name(), next.name());
        self.state = next;
    }

    async fn authenticate(&self) -> Result<(), SearchError> {
        self.provider.authenticate().await?;
        self.historical.authenticate().await
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // FILTER
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn fetch_historical(&mut self) -> Vec<QueryRecord> {
        let mut queries = Vec::new();
        let policy = self.config.retry;

        for url in &self.seeds.source_urls {
            let historical = &self.historical;
            let fetched = retry(policy, SearchError::is_retryable, |_| {
                historical.queries_for_url(url)
            })
            .await;

            match fetched {
                Ok(records) if !records.is_empty() => queries.extend(records),
                Ok(_) => {
                    log::warn!("⚠️ Sem estatísticas para {}", url.full());
                    self.stats.urls_without_stats.push(url.full());
                }
                Err(e) => {
                    log::warn!("⚠️ Estatísticas de {} ignoradas: {}", url.full(), e);
                    self.stats.urls_without_stats.push(url.full());
                }
            }
        }

        log::info!(
            "📊 {} query(s) históricas de {} URL(s)",
            queries.len(),
            self.seeds.source_urls.len()
        );
        queries
    }

    /// Mantém o primeiro membro qualificado de cada cluster exato
    fn filter_historical(&mut self, queries: Vec<QueryRecord>) -> Result<Vec<QueryRecord>, PipelineError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = queries.iter().map(|query| query.text.as_str()).collect();
        let assignment = SimilarityClusterer::cluster(&texts, EXACT_DUPLICATE)?;

        let mut taken: HashSet<usize> = HashSet::new();
        let mut kept = Vec::new();
        let mut below = Vec::new();
        let mut duplicates = Vec::new();

        for (i, query) in queries.into_iter().enumerate() {
            let cluster = assignment.cluster_of(i);
            if taken.contains(&cluster) {
                duplicates.push(query.text);
            } else if query.passes_traffic(self.config.min_clicks, self.config.min_impressions) {
                taken.insert(cluster);
                kept.push(query);
            } else {
                below.push(query.text);
            }
        }

        self.ledger.record(below, DeletionReason::BelowTrafficThreshold);
        self.ledger.record(duplicates, DeletionReason::HistoricalDuplicate);
        log::info!("🔎 {} query(s) históricas aprovadas no filtro", kept.len());
        Ok(kept)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // QUERY
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn query_round(&mut self, sorted: SortedQueries, stage: u32) -> RelatedItems {
        let jobs: Vec<(Bucket, QueryRecord)> = sorted
            .geo
            .into_iter()
            .map(|query| (Bucket::Geo, query))
            .chain(sorted.main.into_iter().map(|query| (Bucket::Main, query)))
            .collect();

        log::info!("🌐 Estágio {}: {} busca(s)", stage, jobs.len());

        let policy = self.config.retry;
        let workers = self.config.workers.max(1);
        let outcomes: Vec<(Bucket, QueryRecord, Result<SearchResponse, SearchError>)> =
            stream::iter(jobs)
                .map(|(bucket, query)| {
                    let provider = Arc::clone(&self.provider);
                    async move {
                        let response = retry(policy, SearchError::is_retryable, |_| {
                            provider.search(&query.text)
                        })
                        .await;
                        (bucket, query, response)
                    }
                })
                .buffered(workers)
                .collect()
                .await;

        let mut related = RelatedItems::default();
        let mut failed = Vec::new();

        for (bucket, query, response) in outcomes {
            self.made_queries.push(query.clone());

            match response {
                Ok(response) => {
                    self.stats.record_query(true);
                    related.keywords.extend(response.related_keywords);
                    related.questions.extend(response.related_questions);
                    if bucket == Bucket::Main {
                        self.results.push(DiscoveredQuery {
                            record: query,
                            matched_urls: response.matched_urls,
                        });
                    }
                }
                Err(e) => {
                    log::warn!("⚠️ Query '{}' descartada: {}", query.text, e);
                    self.stats.record_query(false);
                    self.stats.failed_queries.push(query.text.clone());
                    failed.push(query.text);
                }
            }
        }
        self.ledger.record(failed, DeletionReason::SearchFailed { stage });

        let (keywords, keyword_duplicates) = dedup_related(related.keywords);
        let (questions, question_duplicates) = dedup_related(related.questions);
        let mut duplicates = keyword_duplicates;
        duplicates.extend(question_duplicates);
        self.ledger.record(duplicates, DeletionReason::RelatedDuplicate { stage });

        RelatedItems {
            keywords,
            questions,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // EXPAND
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Novos candidatos que não repetem âncoras antigas nem queries feitas
    fn expand(&mut self, related: RelatedItems, stage: u32) -> Result<Vec<QueryRecord>, PipelineError> {
        let geo = &self.geo;
        let synthesize = |texts: Vec<String>, kind: RelatedKind| -> Vec<QueryRecord> {
            texts
                .into_iter()
                .map(|text| {
                    let lemma = geo.lemma_of_query(&text);
                    QueryRecord::synthetic(text, Provenance::related(kind, stage)).with_lemma(lemma)
                })
                .collect()
        };

        let mut new_queries = synthesize(related.keywords, RelatedKind::Keyword);
        new_queries.extend(synthesize(related.questions, RelatedKind::Question));

        if new_queries.is_empty() {
            self.ledger.record(Vec::new(), DeletionReason::AlreadySeen { stage });
            return Ok(new_queries);
        }

        let offset = self.seeds.old_anchors.len() + self.made_queries.len();
        let keys: Vec<&str> = self
            .seeds
            .old_anchors
            .iter()
            .map(String::as_str)
            .chain(self.made_queries.iter().map(|query| query.lemma.as_str()))
            .chain(new_queries.iter().map(|query| query.lemma.as_str()))
            .collect();
        let assignment = SimilarityClusterer::cluster(&keys, EXACT_DUPLICATE)?;

        let mut unique = Vec::new();
        let mut seen = Vec::new();
        for (i, query) in new_queries.into_iter().enumerate() {
            if assignment.is_representative(offset + i) {
                unique.push(query);
            } else {
                seen.push(query.text);
            }
        }

        self.ledger.record(seen, DeletionReason::AlreadySeen { stage });
        Ok(unique)
    }
}

/// Remove vazios e duplicatas exatas (texto cru), preservando a ordem
fn dedup_related(items: Vec<String>) -> (Vec<String>, Vec<String>) {
    let items: Vec<String> = items
        .into_iter()
        .filter(|item| !is_blank(item))
        .collect();
    dedup_exact(items, |item| item.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::PrefixGeoNormalizer;
    use crate::search::{HistoricalRow, StaticSearchProvider};
    use crate::tokenizer::{DictionaryTokenizer, LemmaCache};
    use crate::types::SourceUrl;
    use async_trait::async_trait;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    mock! {
        pub Provider {}

        #[async_trait]
        impl SearchProvider for Provider {
            async fn authenticate(&self) -> Result<(), SearchError>;
            async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;
        }
    }

    /// Provedor lento que registra o pico de buscas simultâneas
    #[derive(Default)]
    struct TrackingProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for TrackingProvider {
        async fn authenticate(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn search(&self, _query: &str) -> Result<SearchResponse, SearchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(SearchResponse::default())
        }
    }

    fn geo() -> Arc<dyn GeoNormalizer> {
        let dictionary = HashMap::from([
            ("диваны".to_string(), "диван".to_string()),
            ("минске".to_string(), "минск".to_string()),
        ]);
        let tokenizer = DictionaryTokenizer::new(dictionary, Arc::new(LemmaCache::new()));
        Arc::new(PrefixGeoNormalizer::new(Arc::new(tokenizer)))
    }

    fn seeds() -> SeedSet {
        SeedSet {
            source_urls: vec![SourceUrl::parse("https://a.by/divany").unwrap()],
            main_names: vec!["диван цена".into()],
            geo_names: vec![],
            clear_geos: ["минск".to_string()].into_iter().collect(),
            clear_cities: GeoVocabulary::new(),
            old_anchors: vec![],
        }
    }

    fn pipeline(
        config: PipelineConfig,
        provider: Arc<dyn SearchProvider>,
        historical: StaticSearchProvider,
    ) -> DiscoveryPipeline {
        DiscoveryPipeline::new(config, seeds(), provider, Arc::new(historical), geo())
    }

    fn response(urls: &[&str], keywords: &[&str], questions: &[&str]) -> SearchResponse {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        SearchResponse {
            matched_urls: owned(urls),
            related_keywords: owned(keywords),
            related_questions: owned(questions),
        }
    }

    #[tokio::test]
    async fn test_no_related_items_ends_after_first_round() {
        let mut mock = MockProvider::new();
        mock.expect_authenticate().times(1).returning(|| Ok(()));
        mock.expect_search()
            .times(1)
            .returning(|_| Ok(response(&["https://a.by/divany"], &[], &[])));

        let mut pipeline = pipeline(PipelineConfig::default(), Arc::new(mock), StaticSearchProvider::new());
        pipeline.run().await.unwrap();

        assert_eq!(pipeline.state(), &PipelineState::Done { rounds: 1 });
        assert_eq!(pipeline.stats().rounds_completed, 1);
        assert_eq!(pipeline.results().len(), 1);
        assert_eq!(pipeline.results()[0].matched_urls, vec!["https://a.by/divany"]);
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let mut mock = MockProvider::new();
        mock.expect_authenticate()
            .returning(|| Err(SearchError::Auth("bad token".into())));
        mock.expect_search().never();

        let mut pipeline = pipeline(PipelineConfig::default(), Arc::new(mock), StaticSearchProvider::new());
        let result = pipeline.run().await;

        assert!(matches!(result, Err(PipelineError::Auth(_))));
        assert!(matches!(pipeline.state(), PipelineState::Failed { .. }));
        assert!(pipeline.made_queries().is_empty());
    }

    #[tokio::test]
    async fn test_failing_query_retried_then_dropped() {
        let mut mock = MockProvider::new();
        mock.expect_authenticate().returning(|| Ok(()));
        mock.expect_search()
            .times(3)
            .returning(|_| Err(SearchError::Network("timeout".into())));

        let mut pipeline = pipeline(PipelineConfig::default(), Arc::new(mock), StaticSearchProvider::new());
        pipeline.run().await.unwrap();

        assert!(pipeline.results().is_empty());
        assert_eq!(pipeline.made_queries().len(), 1);
        assert_eq!(pipeline.stats().queries_failed, 1);
        assert_eq!(
            pipeline.ledger().removed_for(DeletionReason::SearchFailed { stage: 2 }),
            vec!["диван цена"]
        );
    }

    #[tokio::test]
    async fn test_related_items_carry_round_codes() {
        let provider = StaticSearchProvider::new()
            .with_response("диван цена", response(&["https://a.by/"], &["диван стоимость"], &["сколько диван цена"]))
            .with_response("диван стоимость", response(&["https://a.by/"], &["диван стоимость цена"], &[]));

        let mut config = PipelineConfig::default();
        config.rounds = 2;
        let mut pipeline = pipeline(config, Arc::new(provider), StaticSearchProvider::new());
        pipeline.run().await.unwrap();

        let codes: Vec<(String, i64)> = pipeline
            .made_queries()
            .iter()
            .map(|query| (query.text.clone(), query.clicks))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("диван цена".to_string(), -1),
                ("диван стоимость".to_string(), -32),
                ("сколько диван цена".to_string(), -33),
            ]
        );
        assert_eq!(pipeline.state(), &PipelineState::Done { rounds: 2 });
        assert_eq!(pipeline.stats().candidates_per_round, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_codes_step_by_thirty_per_round() {
        let provider = StaticSearchProvider::new()
            .with_response("диван цена", response(&[], &["диван цена недорого"], &["сколько стоит диван"]))
            .with_response("диван цена недорого", response(&[], &["диван цена оптом"], &[]))
            .with_response("сколько стоит диван", response(&[], &[], &["сколько стоит диван угловой"]))
            .with_response("диван цена оптом", response(&[], &["диван цена доставка"], &[]))
            .with_response(
                "сколько стоит диван угловой",
                response(&[], &[], &["сколько стоит диван кожаный"]),
            );

        let mut config = PipelineConfig::default();
        config.rounds = 4;
        let mut pipeline = pipeline(config, Arc::new(provider), StaticSearchProvider::new());
        pipeline.run().await.unwrap();

        let codes: Vec<(&str, i64, i64)> = pipeline
            .made_queries()
            .iter()
            .map(|query| (query.text.as_str(), query.clicks, query.impressions))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("диван цена", -1, -1),
                ("диван цена недорого", -32, -32),
                ("сколько стоит диван", -33, -33),
                ("диван цена оптом", -62, -62),
                ("сколько стоит диван угловой", -63, -63),
                ("диван цена доставка", -92, -92),
                ("сколько стоит диван кожаный", -93, -93),
            ]
        );
        assert_eq!(
            pipeline.made_queries()[5].provenance().unwrap(),
            Provenance::related(RelatedKind::Keyword, 9)
        );
        assert_eq!(pipeline.state(), &PipelineState::Done { rounds: 4 });
        assert_eq!(pipeline.stats().candidates_per_round, vec![1, 2, 2, 2]);
    }

    #[tokio::test]
    async fn test_query_step_respects_worker_limit() {
        for workers in [1, 4] {
            let provider = Arc::new(TrackingProvider::default());
            let mut seeds = seeds();
            seeds.main_names = (0..20).map(|i| format!("товар{} цена", i)).collect();

            let mut config = PipelineConfig::default();
            config.workers = workers;
            config.rounds = 1;
            let mut pipeline = DiscoveryPipeline::new(
                config,
                seeds,
                provider.clone(),
                Arc::new(StaticSearchProvider::new()),
                geo(),
            );
            pipeline.run().await.unwrap();

            assert_eq!(pipeline.made_queries().len(), 20);
            assert_eq!(pipeline.results().len(), 20);
            assert_eq!(provider.peak.load(Ordering::SeqCst), workers);
            assert_eq!(provider.in_flight.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_expand_discards_made_queries_and_anchors() {
        let provider = StaticSearchProvider::new().with_response(
            "диван цена",
            response(&[], &["цена диван", "старая цена", "  "], &[]),
        );

        let mut seeds = seeds();
        seeds.old_anchors = vec!["старая цена".into()];
        let mut pipeline = DiscoveryPipeline::new(
            PipelineConfig::default(),
            seeds,
            Arc::new(provider),
            Arc::new(StaticSearchProvider::new()),
            geo(),
        );
        pipeline.run().await.unwrap();

        assert_eq!(
            pipeline.ledger().removed_for(DeletionReason::AlreadySeen { stage: 3 }),
            vec!["цена диван", "старая цена"]
        );
        assert_eq!(pipeline.state(), &PipelineState::Done { rounds: 1 });
    }

    #[tokio::test]
    async fn test_historical_filter_and_missing_urls() {
        let historical = StaticSearchProvider::new().with_historical(
            "https://a.by/divany",
            vec![
                HistoricalRow { query: "диваны в минске".into(), clicks: 0, impressions: 10 },
                HistoricalRow { query: "диваны в минске".into(), clicks: 5, impressions: 100 },
                HistoricalRow { query: "минске диваны в".into(), clicks: 1, impressions: 1 },
            ],
        );

        let mut seeds = seeds();
        seeds.source_urls.push(SourceUrl::parse("https://a.by/empty").unwrap());
        let mut pipeline = DiscoveryPipeline::new(
            PipelineConfig::default(),
            seeds,
            Arc::new(StaticSearchProvider::new()),
            Arc::new(historical),
            geo(),
        );
        pipeline.run().await.unwrap();

        assert_eq!(
            pipeline.ledger().removed_for(DeletionReason::BelowTrafficThreshold),
            vec!["диваны в минске"]
        );
        assert_eq!(
            pipeline.ledger().removed_for(DeletionReason::HistoricalDuplicate),
            vec!["минске диваны в"]
        );
        assert_eq!(pipeline.stats().urls_without_stats, vec!["https://a.by/empty"]);
        assert_eq!(pipeline.geo_queries().len(), 1);
        assert_eq!(pipeline.geo_queries()[0].clicks, 5);
    }

    #[tokio::test]
    async fn test_into_outcome_keeps_vocabularies() {
        let mut pipeline = pipeline(
            PipelineConfig::default(),
            Arc::new(StaticSearchProvider::new()),
            StaticSearchProvider::new(),
        );
        pipeline.run().await.unwrap();

        let outcome = pipeline.into_outcome();
        assert!(outcome.clear_geos.contains("минск"));
        assert!(outcome.geo_and_cities().contains("минск"));
        assert!(outcome.stats.finished_at.is_some());
    }
}
