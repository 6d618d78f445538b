// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Registros de query, códigos de proveniência e descritores de containers.
// Cliques e impressões negativos são sentinelas: a query foi sintetizada
// internamente e não tem tráfego real.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

/// Tipo de URL (alias para String)
pub type Url = String;

/// Sentinela de nomes derivados de containers (tópico/geo, não é query real)
pub const CONTAINER_SEED_CODE: i64 = -1;

/// Erros de validação de registros de query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Query text is empty")]
    EmptyText,

    #[error("Unknown provenance sentinel: {0}")]
    UnknownSentinel(i64),

    #[error("Mismatched sentinel pair: clicks={clicks}, impressions={impressions}")]
    MismatchedSentinel { clicks: i64, impressions: i64 },
}

/// Tipo de item relacionado devolvido pelo buscador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelatedKind {
    /// Buscas relacionadas ("related searches")
    Keyword,
    /// Perguntas relacionadas ("people also ask")
    Question,
}

impl RelatedKind {
    fn offset(self) -> i64 {
        match self {
            RelatedKind::Keyword => 2,
            RelatedKind::Question => 3,
        }
    }
}

/// Proveniência de uma query - por que ela existe no pipeline
///
/// Codificada nos campos `clicks`/`impressions` de [`QueryRecord`]:
/// - `>= 0`: tráfego real (Search Console)
/// - `-1`: nome de container
/// - `-(2 + 10·s)`: keyword relacionada gerada no contador de rodada `s`
/// - `-(3 + 10·s)`: pergunta relacionada gerada no contador de rodada `s`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Query observada com métricas reais
    Observed,
    /// Nome de container (tópico ou geo)
    ContainerSeed,
    /// Item relacionado sintetizado durante uma rodada
    Related { kind: RelatedKind, stage: u32 },
}

impl Provenance {
    /// Cria proveniência de item relacionado
    pub fn related(kind: RelatedKind, stage: u32) -> Self {
        Self::Related { kind, stage }
    }

    /// Código sentinela (None para queries observadas)
    pub fn sentinel(&self) -> Option<i64> {
        match self {
            Provenance::Observed => None,
            Provenance::ContainerSeed => Some(CONTAINER_SEED_CODE),
            Provenance::Related { kind, stage } => Some(-(kind.offset() + 10 * *stage as i64)),
        }
    }

    /// Decodifica um valor de cliques/impressões
    pub fn decode(code: i64) -> Result<Self, ValidationError> {
        if code >= 0 {
            return Ok(Provenance::Observed);
        }
        if code == CONTAINER_SEED_CODE {
            return Ok(Provenance::ContainerSeed);
        }

        let magnitude = code
            .checked_neg()
            .ok_or(ValidationError::UnknownSentinel(code))?;
        let stage = u32::try_from(magnitude / 10).map_err(|_| ValidationError::UnknownSentinel(code))?;
        match magnitude % 10 {
            2 => Ok(Provenance::related(RelatedKind::Keyword, stage)),
            3 => Ok(Provenance::related(RelatedKind::Question, stage)),
            _ => Err(ValidationError::UnknownSentinel(code)),
        }
    }
}

/// Registro de query: texto, métricas (ou sentinela) e lema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Texto original da query
    pub text: String,
    /// Cliques (ou sentinela de proveniência)
    pub clicks: i64,
    /// Impressões (ou sentinela de proveniência)
    pub impressions: i64,
    /// Forma lematizada (preenchida na classificação)
    #[serde(default)]
    pub lemma: String,
}

impl QueryRecord {
    /// Cria query observada com métricas reais
    pub fn observed(
        text: impl Into<String>,
        clicks: i64,
        impressions: i64,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            text: text.into(),
            clicks,
            impressions,
            lemma: String::new(),
        };
        record.validate()?;
        if record.provenance()? != Provenance::Observed {
            return Err(ValidationError::MismatchedSentinel { clicks, impressions });
        }
        Ok(record)
    }

    /// Cria query sintética a partir de uma proveniência
    pub fn synthetic(text: impl Into<String>, provenance: Provenance) -> Self {
        let code = provenance.sentinel().unwrap_or(0);
        Self {
            text: text.into(),
            clicks: code,
            impressions: code,
            lemma: String::new(),
        }
    }

    /// Cria semente a partir de nome de container
    pub fn container_seed(text: impl Into<String>) -> Self {
        Self::synthetic(text, Provenance::ContainerSeed)
    }

    /// Define o lema
    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = lemma.into();
        self
    }

    /// Verifica texto não vazio e par sentinela consistente
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if (self.clicks < 0 || self.impressions < 0) && self.clicks != self.impressions {
            return Err(ValidationError::MismatchedSentinel {
                clicks: self.clicks,
                impressions: self.impressions,
            });
        }
        Provenance::decode(self.clicks).map(|_| ())
    }

    /// Decodifica a proveniência
    pub fn provenance(&self) -> Result<Provenance, ValidationError> {
        Provenance::decode(self.clicks)
    }

    /// Verifica se é nome de container
    pub fn is_container_seed(&self) -> bool {
        self.clicks == CONTAINER_SEED_CODE
    }

    /// Regra de tráfego mínimo: cliques OU impressões
    pub fn passes_traffic(&self, min_clicks: i64, min_impressions: i64) -> bool {
        self.clicks >= min_clicks || self.impressions >= min_impressions
    }
}

/// Query classificada e pesquisada, com as URLs que ranqueiam para ela
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredQuery {
    /// Registro da query
    pub record: QueryRecord,
    /// URLs encontradas no buscador, em ordem de ranking
    pub matched_urls: Vec<Url>,
}

impl DiscoveredQuery {
    /// URLs unidas por espaço (entrada da clusterização por URLs)
    pub fn joined_urls(&self) -> String {
        self.matched_urls.join(" ")
    }
}

/// Balde de intenção de uma query aceita
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// Intenção geográfica
    Geo,
    /// Intenção principal (cidade ou palavra de inclusão)
    Main,
}

/// URL de origem para estatísticas históricas
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceUrl {
    /// Domínio com esquema (ex: `https://site.by`)
    pub domain: String,
    /// Caminho (ex: `/remont`)
    pub path: String,
}

impl SourceUrl {
    /// Cria nova URL de origem
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
        }
    }

    /// Separa uma URL completa em domínio e caminho
    ///
    /// O esquema é sempre normalizado para `https://`; query string e
    /// fragmento são descartados. Retorna None se não houver host.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let parsed = if raw.contains("://") {
            url::Url::parse(raw)
        } else {
            url::Url::parse(&format!("https://{}", raw))
        }
        .ok()?;

        let host = parsed.host_str()?;
        Some(Self::new(format!("https://{}", host), parsed.path()))
    }

    /// URL completa
    pub fn full(&self) -> String {
        format!("{}{}", self.domain, self.path)
    }
}

/// Descritor de container (página/seção do site)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Identificador único
    pub id: String,
    /// Container pai (None na raiz)
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Nome exibido
    pub name: String,
    /// Domínio com esquema
    pub domain: String,
    /// Caminho da página
    pub path: String,
    /// Nome do tópico principal
    #[serde(default)]
    pub extract_name: Option<String>,
    /// Nome geográfico (ex: "в Минске")
    #[serde(default)]
    pub extract_geo: Option<String>,
    /// Cidade
    #[serde(default)]
    pub extract_city: Option<String>,
    /// Âncoras já usadas no site
    #[serde(default)]
    pub anchor_names: Vec<String>,
}
