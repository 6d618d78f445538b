// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO PIPELINE E DO RUNTIME
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Parâmetros do pipeline de descoberta, do runtime Tokio e o arquivo de
// execução (JSON) consumido pelo CLI. Tudo pode ser definido via .env
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::report::LabelTable;
use crate::search::StaticSearchProvider;
use crate::types::Container;
use crate::utils::{split_list, RetryPolicy};

/// Stop words padrão (queries com elas são rejeitadas)
pub const DEFAULT_STOP_WORDS: &[&str] = &["купить", "отзывы", "бесплатно", "спб", "форум"];

/// Palavras de inclusão padrão (intenção comercial)
pub const DEFAULT_INCLUSION_WORDS: &[&str] = &[
    "стоимость",
    "цена",
    "прайс",
    "заказать",
    "заказ",
    "стоит",
    "цены",
    "на дом",
    "на час",
    "услуги",
];

/// Erros de configuração e do arquivo de execução
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed run file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid run file: {0}")]
    Invalid(String),
}

/// Configuração do pipeline de descoberta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Máximo de rodadas classify → query → expand
    pub rounds: u32,
    /// Largura do grupo de tarefas de busca
    pub workers: usize,
    /// Política de retry para provedores externos
    pub retry: RetryPolicy,
    /// Cliques mínimos de uma query histórica
    pub min_clicks: i64,
    /// Impressões mínimas de uma query histórica
    pub min_impressions: i64,
    /// Limite de URLs importadas da planilha (0 = ilimitado)
    pub max_urls: usize,
    /// Threshold do relatório de âncoras
    pub anchor_threshold: f32,
    /// Threshold do relatório de tópicos
    pub topic_threshold: f32,
    /// Stop words (texto cru, lematizado no setup)
    pub stop_words: Vec<String>,
    /// Palavras de inclusão (texto cru, lematizado no setup)
    pub inclusion_words: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            workers: 8,
            retry: RetryPolicy::default(),
            min_clicks: 1,
            min_impressions: 50,
            max_urls: 1000,
            anchor_threshold: 0.8,
            topic_threshold: 0.6,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            inclusion_words: DEFAULT_INCLUSION_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Cria configuração padrão.
    pub fn new() -> Self {
        Self::default()
    }

    /// Monta a configuração a partir de uma função de consulta de variáveis.
    ///
    /// Valores inválidos são ignorados com warning (o padrão é mantido).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(rounds) = parse_var::<u32, _>(&lookup, "CLUSTER_ROUNDS", |v| *v > 0) {
            config.rounds = rounds;
        }
        if let Some(workers) = parse_var::<usize, _>(&lookup, "CLUSTER_WORKERS", |v| *v > 0) {
            config.workers = workers;
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "CLUSTER_RETRY_ATTEMPTS", |v| *v > 0) {
            config.retry.max_attempts = attempts;
        }
        if let Some(backoff) = parse_var::<u64, _>(&lookup, "CLUSTER_RETRY_BACKOFF_MS", |_| true) {
            config.retry.backoff_ms = backoff;
        }
        if let Some(clicks) = parse_var::<i64, _>(&lookup, "CLUSTER_MIN_CLICKS", |v| *v >= 0) {
            config.min_clicks = clicks;
        }
        if let Some(impressions) = parse_var::<i64, _>(&lookup, "CLUSTER_MIN_IMPRESSIONS", |v| *v >= 0) {
            config.min_impressions = impressions;
        }
        if let Some(max_urls) = parse_var::<usize, _>(&lookup, "CLUSTER_MAX_URLS", |_| true) {
            config.max_urls = max_urls;
        }
        if let Some(t) = parse_var::<f32, _>(&lookup, "CLUSTER_ANCHOR_THRESHOLD", valid_threshold) {
            config.anchor_threshold = t;
        }
        if let Some(t) = parse_var::<f32, _>(&lookup, "CLUSTER_TOPIC_THRESHOLD", valid_threshold) {
            config.topic_threshold = t;
        }

        if let Some(raw) = lookup("CLUSTER_STOP_WORDS") {
            config.stop_words = split_list(&raw);
            log::info!("📦 CLUSTER_STOP_WORDS={} palavra(s)", config.stop_words.len());
        }
        if let Some(raw) = lookup("CLUSTER_INCLUSION_WORDS") {
            config.inclusion_words = split_list(&raw);
            log::info!("📦 CLUSTER_INCLUSION_WORDS={} palavra(s)", config.inclusion_words.len());
        }

        config
    }
}

fn valid_threshold(value: &f32) -> bool {
    (0.0..=1.0).contains(value)
}

fn parse_var<T, F>(lookup: &F, name: &str, valid: fn(&T) -> bool) -> Option<T>
where
    T: FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => {
            log::info!("📦 {}={}", name, value);
            Some(value)
        }
        _ => {
            log::warn!("⚠️ {}={} inválido, usando padrão", name, raw);
            None
        }
    }
}

/// Carrega configuração do pipeline a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `CLUSTER_ROUNDS`: Máximo de rodadas (padrão: 3)
/// - `CLUSTER_WORKERS`: Buscas simultâneas (padrão: 8)
/// - `CLUSTER_RETRY_ATTEMPTS` / `CLUSTER_RETRY_BACKOFF_MS`: Retry (padrão: 3 / 0)
/// - `CLUSTER_MIN_CLICKS` / `CLUSTER_MIN_IMPRESSIONS`: Filtro histórico (padrão: 1 / 50)
/// - `CLUSTER_MAX_URLS`: Limite de URLs da planilha (padrão: 1000, 0 = ilimitado)
/// - `CLUSTER_ANCHOR_THRESHOLD` / `CLUSTER_TOPIC_THRESHOLD`: (padrão: 0.8 / 0.6)
/// - `CLUSTER_STOP_WORDS` / `CLUSTER_INCLUSION_WORDS`: Listas separadas por vírgula
pub fn load_pipeline_config() -> PipelineConfig {
    PipelineConfig::from_lookup(|name| std::env::var(name).ok())
}

/// Configuração do runtime Tokio.
///
/// Controla número de threads e comportamento do async runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Número de worker threads do Tokio.
    /// Se None, usa cálculo dinâmico: min(cpu_cores, max_threads).
    pub worker_threads: Option<usize>,

    /// Número máximo de threads (limite superior para cálculo dinâmico).
    /// Padrão: 16
    pub max_threads: usize,

    /// Número máximo de blocking threads.
    /// Padrão: 512 (padrão do Tokio)
    pub max_blocking_threads: usize,

    /// Nome das threads do runtime.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_threads: 16,
            max_blocking_threads: 512,
            thread_name: "keyword-clusterer".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Cria configuração padrão.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calcula número efetivo de worker threads.
    ///
    /// Se `worker_threads` está definido, usa esse valor.
    /// Senão, calcula: min(cpu_cores, max_threads)
    pub fn effective_worker_threads(&self) -> usize {
        if let Some(threads) = self.worker_threads {
            threads
        } else {
            std::cmp::min(num_cpus::get(), self.max_threads)
        }
    }

    /// Monta a configuração a partir de uma função de consulta de variáveis.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(threads) = parse_var::<usize, _>(&lookup, "TOKIO_THREADS", |v| *v > 0) {
            config.worker_threads = Some(threads);
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, "TOKIO_MAX_THREADS", |v| *v > 0) {
            config.max_threads = max;
        }
        if let Some(blocking) = parse_var::<usize, _>(&lookup, "TOKIO_MAX_BLOCKING", |v| *v > 0) {
            config.max_blocking_threads = blocking;
        }

        if config.worker_threads.is_none() {
            log::info!(
                "🔧 Tokio: {} threads (dinâmico: min({} cores, {} max))",
                config.effective_worker_threads(),
                num_cpus::get(),
                config.max_threads
            );
        }

        config
    }
}

/// Carrega configuração do runtime a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `TOKIO_THREADS`: Número fixo de threads (opcional)
/// - `TOKIO_MAX_THREADS`: Máximo de threads para cálculo dinâmico (padrão: 16)
/// - `TOKIO_MAX_BLOCKING`: Máximo de blocking threads (padrão: 512)
pub fn load_runtime_config() -> RuntimeConfig {
    RuntimeConfig::from_lookup(|name| std::env::var(name).ok())
}

/// Cria o runtime Tokio com configuração customizada.
///
/// Deve ser chamada no início do programa, antes de qualquer código async.
pub fn create_tokio_runtime(config: &RuntimeConfig) -> std::io::Result<tokio::runtime::Runtime> {
    let worker_threads = config.effective_worker_threads();

    log::info!(
        "🚀 Criando runtime Tokio: {} workers, {} blocking max",
        worker_threads,
        config.max_blocking_threads
    );

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(config.max_blocking_threads)
        .thread_name(&config.thread_name)
        .enable_all()
        .build()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ARQUIVO DE EXECUÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Entrada completa de uma execução do CLI
///
/// Os containers vêm da planilha (`sheet_rows`) ou da árvore de containers
/// (`containers` + `root`). O provedor estático substitui as APIs externas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunFile {
    /// Linhas da planilha: `[url, nome, _, _, geo, cidade, âncoras]`
    #[serde(default)]
    pub sheet_rows: Vec<Vec<String>>,
    /// Containers da árvore
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Raiz da subárvore a processar
    #[serde(default)]
    pub root: Option<String>,
    /// Respostas de busca e estatísticas históricas
    #[serde(default)]
    pub search: StaticSearchProvider,
    /// Dicionário palavra → lema
    #[serde(default)]
    pub lemmas: HashMap<String, String>,
    /// Rótulos por código de proveniência
    #[serde(default)]
    pub labels: Option<LabelTable>,
}

impl RunFile {
    /// Lê e valida um arquivo de execução
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let run: RunFile = serde_json::from_str(&raw)?;
        run.validate()?;
        log::info!("📂 Arquivo de execução carregado: {}", path.display());
        Ok(run)
    }

    /// Verifica que existe uma origem de containers utilizável
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheet_rows.is_empty() && self.containers.is_empty() {
            return Err(ConfigError::Invalid(
                "either sheet_rows or containers must be provided".into(),
            ));
        }
        if self.sheet_rows.is_empty() && self.root.is_none() {
            return Err(ConfigError::Invalid("containers require a root id".into()));
        }
        Ok(())
    }
}
