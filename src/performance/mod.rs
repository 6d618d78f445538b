//! Módulo de otimizações de performance.
//!
//! Base numérica da clusterização de queries e URLs.
//!
//! ## Por que otimizar?
//!
//! Cada rodada do pipeline de descoberta compara todo o histórico de queries
//! contra os candidatos novos. Com milhares de queries, a matriz de
//! similaridade O(n²) é o gargalo.
//!
//! ## Técnicas Utilizadas
//!
//! - **SIMD (AVX2)**: Processa 8 floats por instrução
//! - **Paralelismo**: Linhas da matriz distribuídas via Rayon

/// Operações vetoriais otimizadas com SIMD.
///
/// - [`cosine_similarity`]: Similaridade entre dois vetores
/// - [`SimilarityMatrix`]: Matriz all-pairs arredondada em 2 casas
pub mod simd;

/// Vetorização bag-of-tokens por lote.
pub mod vectorizer;

pub use simd::{cosine_similarity, round_similarity, SimilarityMatrix};
pub use vectorizer::{ClusterError, TokenVectors, Vectorizer};
