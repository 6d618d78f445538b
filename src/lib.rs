//! # Keyword Clusterer
//!
//! Este crate descobre e agrupa queries de busca para uma árvore de
//! containers (categorias de um site) e gera relatórios de clusters por
//! similaridade de URLs.
//!
//! ## O que o pipeline faz?
//!
//! 1. Monta as sementes a partir dos containers (nomes, geo, âncoras antigas)
//! 2. Busca o histórico de queries das URLs e filtra por tráfego
//! 3. Classifica candidatos em **geo** ou **main**
//! 4. Consulta o provedor de busca e coleta URLs e itens relacionados
//! 5. Expande os relacionados em novos candidatos, por até N rodadas
//! 6. Agrupa os resultados pelas URLs e monta os relatórios
//!
//! ## Arquitetura Principal
//!
//! ### 1. Clusterização (`clustering`, `performance`)
//! Clusterização gulosa por quase-clique sobre similaridade cosseno
//! arredondada em 2 casas:
//! - Vetorização bag-of-tokens por lote
//! - Matriz all-pairs com SIMD (AVX2) e linhas paralelas via Rayon
//!
//! ### 2. Normalização de texto (`tokenizer`, `geo`, `classifier`)
//! - Lematização com cache compartilhado
//! - Remoção de prefixos e trechos geográficos
//! - Regras geo/main com stop words e palavras de inclusão
//!
//! ### 3. Pipeline de descoberta (`pipeline`)
//! Máquina de estados `Seed → Filter → {Classify → Query → Expand}* → Done`,
//! com buscas concorrentes limitadas e livro de remoções append-only.
//!
//! ### 4. Relatórios (`report`)
//! Linhas de planilha com intervalos de agrupamento e resumo JSON.
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use keyword_clusterer::prelude::*;
//!
//! let mut pipeline = DiscoveryPipeline::new(config, seeds, search, historical, geo);
//! pipeline.run().await?;
//! let outcome = pipeline.into_outcome();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tipos fundamentais compartilhados por todo o sistema.
///
/// - [`QueryRecord`]: Query com cliques, impressões e lema
/// - [`Provenance`]: Origem codificada no campo de cliques
/// - [`DiscoveredQuery`]: Query consultada com as URLs encontradas
/// - [`Container`]: Nó da árvore de categorias
pub mod types;

/// Otimizações de performance de baixo nível.
///
/// - Similaridade cosseno com SIMD (AVX2)
/// - Vetorização por lote
/// - Matriz de similaridade paralela
pub mod performance;

/// Clusterização gulosa por quase-clique e deduplicação exata.
pub mod clustering;

/// Lematização de palavras com cache compartilhado.
pub mod tokenizer;

/// Normalização geográfica de queries.
pub mod geo;

/// Livro de remoções: o que foi descartado, onde e por quê.
pub mod ledger;

/// Classificação de queries em geo/main.
pub mod classifier;

/// Provedores de busca e de histórico.
///
/// Define as traits `SearchProvider` e `HistoricalSource` e um provedor
/// estático para execuções offline e testes.
pub mod search;

/// Pipeline de descoberta de queries.
///
/// Contém:
/// - `DiscoveryPipeline`: coordenador das rodadas
/// - `PipelineState`: estados e transições
/// - `SeedSet`, `ContainerTree`, `SheetImport`: montagem das sementes
/// - `RunStats`: estatísticas da execução
pub mod pipeline;

/// Montagem e gravação dos relatórios de clusters.
pub mod report;

/// Configuração do pipeline, do runtime e do arquivo de execução.
///
/// Fornece configuração dinâmica via variáveis de ambiente:
///
/// **Runtime Tokio:**
/// - `TOKIO_THREADS`: Número de threads do runtime (padrão: dinâmico)
/// - `TOKIO_MAX_THREADS`: Máximo de threads (padrão: 16)
/// - `TOKIO_MAX_BLOCKING`: Máximo de blocking threads (padrão: 512)
///
/// **Pipeline:**
/// - `CLUSTER_ROUNDS`: Rodadas de expansão (padrão: 3)
/// - `CLUSTER_WORKERS`: Buscas concorrentes (padrão: 8)
/// - `CLUSTER_MIN_CLICKS` / `CLUSTER_MIN_IMPRESSIONS`: Filtro histórico
/// - `CLUSTER_ANCHOR_THRESHOLD` / `CLUSTER_TOPIC_THRESHOLD`: Thresholds dos relatórios
pub mod config;

/// Utilitários diversos.
///
/// - Retry limitado
/// - Formatação de texto
/// - Timing por etapa
pub mod utils;

// Re-exports principais
pub use clustering::{ClusterAssignment, SimilarityClusterer};
pub use config::{
    create_tokio_runtime, load_pipeline_config, load_runtime_config, PipelineConfig, RunFile,
    RuntimeConfig,
};
pub use pipeline::{DiscoveryOutcome, DiscoveryPipeline, PipelineError, PipelineState};
pub use report::{ClusterReport, ReportAssembler, ReportMode};
pub use types::*;

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
///
/// ```rust,ignore
/// use keyword_clusterer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::classifier::{ClassifierVocabulary, QueryClassifier};
    pub use crate::clustering::{dedup_exact, ClusterAssignment, SimilarityClusterer};
    pub use crate::config::{PipelineConfig, RunFile};
    pub use crate::geo::{GeoNormalizer, GeoVocabulary, PrefixGeoNormalizer};
    pub use crate::ledger::{DeletionLedger, DeletionReason};
    pub use crate::pipeline::{
        ContainerTree, DiscoveryOutcome, DiscoveryPipeline, PipelineState, RunStats, SeedSet,
        SheetImport,
    };
    pub use crate::report::{
        ClusterReport, ClusterSummary, JsonFileSink, LabelTable, ReportAssembler, ReportMode,
        ReportSink,
    };
    pub use crate::search::{HistoricalSource, SearchProvider, SearchResponse, StaticSearchProvider};
    pub use crate::tokenizer::{DictionaryTokenizer, LemmaCache, Tokenizer};
    pub use crate::types::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
