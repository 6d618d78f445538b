// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROVEDORES DE BUSCA E ESTATÍSTICAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Traits consumidos pelo pipeline:
// - SearchProvider: URLs ranqueadas + buscas/perguntas relacionadas
// - HistoricalSource: queries históricas (Search Console) por URL
//
// Transporte HTTP e autenticação real ficam fora do crate. Aqui vive apenas
// um provedor estático, alimentado por JSON, usado pelo CLI e pelos testes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{QueryRecord, SourceUrl, Url};

/// Erros dos provedores externos
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Search API error: {0}")]
    Api(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl SearchError {
    /// Erros de autenticação são fatais; os demais podem ser repetidos
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SearchError::Auth(_))
    }
}

/// Resposta de uma busca
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// URLs que ranqueiam para a query, em ordem
    #[serde(default)]
    pub matched_urls: Vec<Url>,
    /// Buscas relacionadas
    #[serde(default)]
    pub related_keywords: Vec<String>,
    /// Perguntas relacionadas
    #[serde(default)]
    pub related_questions: Vec<String>,
}

impl SearchResponse {
    /// Verifica se não há itens relacionados
    pub fn has_no_related(&self) -> bool {
        self.related_keywords.is_empty() && self.related_questions.is_empty()
    }
}

/// Provedor de busca (SERP)
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Autentica no provedor (falha é fatal para a execução)
    async fn authenticate(&self) -> Result<(), SearchError>;

    /// Executa uma busca
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;
}

/// Fonte de estatísticas históricas por URL
#[async_trait]
pub trait HistoricalSource: Send + Sync {
    /// Autentica na fonte (falha é fatal para a execução)
    async fn authenticate(&self) -> Result<(), SearchError>;

    /// Queries históricas com cliques e impressões da URL
    async fn queries_for_url(&self, url: &SourceUrl) -> Result<Vec<QueryRecord>, SearchError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO ESTÁTICA (OFFLINE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Estatística histórica no formato do arquivo de execução
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRow {
    pub query: String,
    pub clicks: i64,
    pub impressions: i64,
}

/// Provedor offline: respostas e estatísticas pré-gravadas
///
/// Queries sem resposta gravada devolvem resposta vazia; URLs sem
/// estatísticas devolvem lista vazia. Queries em `failing` sempre falham
/// com erro de rede (útil para exercitar retries).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticSearchProvider {
    #[serde(default)]
    pub responses: HashMap<String, SearchResponse>,
    #[serde(default)]
    pub historical: HashMap<String, Vec<HistoricalRow>>,
    #[serde(default)]
    pub failing: HashSet<String>,
    #[serde(default)]
    pub reject_auth: bool,
}

impl StaticSearchProvider {
    /// Cria provedor vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Grava resposta para uma query
    pub fn with_response(mut self, query: impl Into<String>, response: SearchResponse) -> Self {
        self.responses.insert(query.into(), response);
        self
    }

    /// Grava estatísticas para uma URL completa
    pub fn with_historical(mut self, url: impl Into<String>, rows: Vec<HistoricalRow>) -> Self {
        self.historical.insert(url.into(), rows);
        self
    }

    /// Marca uma query como sempre falhando
    pub fn with_failing(mut self, query: impl Into<String>) -> Self {
        self.failing.insert(query.into());
        self
    }

    fn check_auth(&self) -> Result<(), SearchError> {
        if self.reject_auth {
            Err(SearchError::Auth("credentials rejected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    async fn authenticate(&self) -> Result<(), SearchError> {
        self.check_auth()
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        if self.failing.contains(query) {
            return Err(SearchError::Network(format!("connection reset for '{}'", query)));
        }
        Ok(self.responses.get(query).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl HistoricalSource for StaticSearchProvider {
    async fn authenticate(&self) -> Result<(), SearchError> {
        self.check_auth()
    }

    async fn queries_for_url(&self, url: &SourceUrl) -> Result<Vec<QueryRecord>, SearchError> {
        let rows = match self.historical.get(&url.full()) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match QueryRecord::observed(row.query.as_str(), row.clicks, row.impressions) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("⚠️ Linha histórica ignorada ({}): {}", url.full(), e),
            }
        }
        Ok(records)
    }
}
