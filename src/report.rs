// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RELATÓRIO DE CLUSTERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Agrupa os resultados pelas URLs que ranqueiam para cada query e monta as
// linhas da planilha `[rótulo, query, cliques, impressões]`:
// - cabeçalho na linha 1, primeiro bloco começa na linha 2
// - cada cluster com mais de um membro vira um bloco contíguo + linha vazia
// - cada bloco gera um intervalo de agrupamento (início, fim)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clustering::{dedup_exact, ClusterAssignment, SimilarityClusterer};
use crate::geo::{GeoNormalizer, GeoVocabulary};
use crate::ledger::{DeletionLedger, DeletionReason};
use crate::performance::ClusterError;
use crate::pipeline::{DiscoveryOutcome, RunStats};
use crate::types::{DiscoveredQuery, QueryRecord, Url};

/// Cabeçalho da planilha
pub const REPORT_HEADER: [&str; 4] = ["id", "query", "clicks", "impressions"];

/// Primeira linha de dados (1-based, depois do cabeçalho)
const FIRST_DATA_ROW: usize = 2;

/// Tipo de relatório
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportMode {
    /// Apenas clusters que contêm um nome de container
    Anchors,
    /// Apenas clusters sem nome de container, seguidos das queries geo
    Topics,
}

impl ReportMode {
    /// Nome da aba/arquivo
    pub fn sheet_name(&self, list_name: &str) -> String {
        match self {
            ReportMode::Anchors => format!("{}_clusters_anchors", list_name),
            ReportMode::Topics => format!("{}_clusters_topics", list_name),
        }
    }

    fn accepts(&self, has_container_seed: bool) -> bool {
        match self {
            ReportMode::Anchors => has_container_seed,
            ReportMode::Topics => !has_container_seed,
        }
    }
}

/// Rótulos por código de proveniência
///
/// Por padrão cobre apenas as rodadas 1 e 2; códigos sem entrada ficam com
/// rótulo vazio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: BTreeMap<i64, String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        let labels = [(-32, "ПЗ_rs_1"), (-33, "ПЗ_rq_1"), (-62, "ПЗ_rs_2"), (-63, "ПЗ_rq_2")]
            .into_iter()
            .map(|(code, label)| (code, label.to_string()))
            .collect();
        Self { labels }
    }
}

impl LabelTable {
    /// Tabela vazia
    pub fn empty() -> Self {
        Self {
            labels: BTreeMap::new(),
        }
    }

    /// Adiciona ou substitui um rótulo
    pub fn with_label(mut self, code: i64, label: impl Into<String>) -> Self {
        self.labels.insert(code, label.into());
        self
    }

    /// Rótulo de um código (vazio se desconhecido)
    pub fn label_for(&self, code: i64) -> &str {
        self.labels.get(&code).map(String::as_str).unwrap_or("")
    }
}

/// Linha do relatório (linha vazia separa blocos)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Nome do container ou rótulo da proveniência
    pub label: String,
    /// Query sem trechos geográficos
    pub query: String,
    /// Cliques (ou código de proveniência)
    pub clicks: Option<i64>,
    /// Impressões (ou código de proveniência)
    pub impressions: Option<i64>,
}

impl ReportRow {
    fn from_record(label: impl Into<String>, query: impl Into<String>, record: &QueryRecord) -> Self {
        Self {
            label: label.into(),
            query: query.into(),
            clicks: Some(record.clicks),
            impressions: Some(record.impressions),
        }
    }

    /// Linha separadora
    pub fn blank() -> Self {
        Self::default()
    }

    /// Verifica se é separadora
    pub fn is_blank(&self) -> bool {
        self.label.is_empty() && self.query.is_empty() && self.clicks.is_none()
    }

    /// Células como texto, na ordem do cabeçalho
    pub fn cells(&self) -> [String; 4] {
        let number = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
        [
            self.label.clone(),
            self.query.clone(),
            number(self.clicks),
            number(self.impressions),
        ]
    }
}

/// Intervalo de agrupamento de linhas (1-based, inclusivo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRange {
    /// Primeira linha do bloco
    pub start: usize,
    /// Última linha do bloco
    pub end: usize,
}

/// Relatório pronto para o sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Modo que gerou o relatório
    pub mode: ReportMode,
    /// Cabeçalho (linha 1)
    pub header: Vec<String>,
    /// Linhas a partir da linha 2
    pub rows: Vec<ReportRow>,
    /// Intervalos de agrupamento
    pub groups: Vec<GroupRange>,
}

impl ClusterReport {
    fn new(mode: ReportMode) -> Self {
        Self {
            mode,
            header: REPORT_HEADER.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn push_block(&mut self, block: Vec<ReportRow>) {
        let start = self.rows.len() + FIRST_DATA_ROW;
        let end = start + block.len() - 1;
        self.rows.extend(block);
        self.rows.push(ReportRow::blank());
        self.groups.push(GroupRange { start, end });
    }
}

/// Cluster do resumo JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEntry {
    /// Queries do cluster
    pub keys: Vec<String>,
    /// URLs de cada query, na mesma ordem
    pub urls: Vec<Vec<Url>>,
}

/// Resumo de todos os clusters: `{clusters: [{keys, urls}]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Clusters em ordem de representante
    pub clusters: Vec<ClusterEntry>,
}

/// Montador de relatórios
pub struct ReportAssembler {
    geo: Arc<dyn GeoNormalizer>,
    labels: LabelTable,
}

impl ReportAssembler {
    /// Cria montador
    pub fn new(geo: Arc<dyn GeoNormalizer>, labels: LabelTable) -> Self {
        Self { geo, labels }
    }

    /// Agrupa resultados pelas URLs (None se não há resultados)
    pub fn cluster_results(
        results: &[DiscoveredQuery],
        threshold: f32,
    ) -> Result<Option<ClusterAssignment>, ClusterError> {
        if results.is_empty() {
            return Ok(None);
        }
        let urls: Vec<String> = results.iter().map(DiscoveredQuery::joined_urls).collect();
        SimilarityClusterer::cluster(&urls, threshold).map(Some)
    }

    /// Monta o relatório de um modo
    ///
    /// Duplicatas dentro de um cluster (mesmo texto exibido) vão para o livro.
    pub fn assemble(
        &self,
        outcome: &DiscoveryOutcome,
        mode: ReportMode,
        threshold: f32,
        ledger: &mut DeletionLedger,
    ) -> Result<ClusterReport, ClusterError> {
        let vocabulary = outcome.geo_and_cities();
        let mut report = ClusterReport::new(mode);
        let mut in_cluster_duplicates = Vec::new();

        if let Some(assignment) = Self::cluster_results(&outcome.results, threshold)? {
            for members in assignment.groups() {
                let has_seed = members
                    .iter()
                    .any(|&i| outcome.results[i].record.is_container_seed());

                let rows: Vec<ReportRow> = members
                    .iter()
                    .map(|&i| self.row_for(&outcome.results[i].record, &vocabulary))
                    .collect();
                let (rows, duplicates) = dedup_exact(rows, |row| row.query.as_str());
                in_cluster_duplicates.extend(duplicates.into_iter().map(|row| row.query));

                if rows.len() > 1 && mode.accepts(has_seed) {
                    report.push_block(rows);
                }
            }
        }

        ledger.record(in_cluster_duplicates, DeletionReason::ClusterDuplicate);

        if mode == ReportMode::Topics {
            let geo_rows = self.geo_rows(&outcome.geo_queries, &vocabulary);
            report.rows.extend(geo_rows);
        }

        log::info!(
            "📝 Relatório {:?}: {} linha(s), {} bloco(s)",
            mode,
            report.rows.len(),
            report.groups.len()
        );
        Ok(report)
    }

    /// Resumo JSON de todos os clusters
    pub fn summary(outcome: &DiscoveryOutcome, threshold: f32) -> Result<ClusterSummary, ClusterError> {
        let mut summary = ClusterSummary::default();
        if let Some(assignment) = Self::cluster_results(&outcome.results, threshold)? {
            for members in assignment.groups() {
                let results = members.iter().map(|&i| &outcome.results[i]);
                summary.clusters.push(ClusterEntry {
                    keys: results.clone().map(|r| r.record.text.clone()).collect(),
                    urls: results.map(|r| r.matched_urls.clone()).collect(),
                });
            }
        }
        Ok(summary)
    }

    fn row_for(&self, record: &QueryRecord, vocabulary: &GeoVocabulary) -> ReportRow {
        let display = self.geo.remove_geo_span(&record.text, vocabulary);
        let label = if record.is_container_seed() {
            display.clone()
        } else if record.clicks < 0 {
            self.labels.label_for(record.clicks).to_string()
        } else {
            String::new()
        };
        ReportRow::from_record(label, display, record)
    }

    /// Queries geo impressas no relatório de tópicos
    ///
    /// Uma query entra se for representante do seu cluster exato (texto sem
    /// geo, lematizado) ou se for nome de container.
    fn geo_rows(&self, geo_queries: &[QueryRecord], vocabulary: &GeoVocabulary) -> Vec<ReportRow> {
        if geo_queries.is_empty() {
            return Vec::new();
        }

        let keys: Vec<String> = geo_queries
            .iter()
            .map(|query| {
                self.geo
                    .lemma_of_query(&self.geo.remove_geo_span(&query.text, vocabulary))
            })
            .collect();

        let assignment = match SimilarityClusterer::cluster(&keys, 1.0) {
            Ok(assignment) => assignment,
            Err(e) => {
                log::warn!("⚠️ Queries geo sem deduplicação: {}", e);
                return Vec::new();
            }
        };

        geo_queries
            .iter()
            .enumerate()
            .filter(|(i, query)| assignment.is_representative(*i) || query.is_container_seed())
            .map(|(_, query)| ReportRow::from_record("", query.text.as_str(), query))
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SINKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Erros de escrita de relatórios
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destino dos relatórios
pub trait ReportSink {
    /// Grava um relatório de clusters
    fn write_report(&self, name: &str, report: &ClusterReport) -> Result<(), SinkError>;

    /// Grava o livro de remoções
    fn write_ledger(&self, name: &str, ledger: &DeletionLedger) -> Result<(), SinkError>;

    /// Grava o resumo de clusters
    fn write_summary(&self, name: &str, summary: &ClusterSummary) -> Result<(), SinkError>;

    /// Grava as estatísticas da execução
    fn write_stats(&self, name: &str, stats: &RunStats) -> Result<(), SinkError>;
}

/// Sink que grava JSON UTF-8 formatado em um diretório
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// Cria sink para um diretório (criado na primeira escrita)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Diretório de saída
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Caminho do arquivo de um nome
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json)?;
        log::info!("💾 Gravado: {}", path.display());
        Ok(())
    }
}

impl ReportSink for JsonFileSink {
    fn write_report(&self, name: &str, report: &ClusterReport) -> Result<(), SinkError> {
        self.write_json(name, report)
    }

    fn write_ledger(&self, name: &str, ledger: &DeletionLedger) -> Result<(), SinkError> {
        self.write_json(name, ledger)
    }

    fn write_summary(&self, name: &str, summary: &ClusterSummary) -> Result<(), SinkError> {
        self.write_json(name, summary)
    }

    fn write_stats(&self, name: &str, stats: &RunStats) -> Result<(), SinkError> {
        self.write_json(name, stats)
    }
}
