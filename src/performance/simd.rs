// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SIMD - SINGLE INSTRUCTION, MULTIPLE DATA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Similaridade cosseno entre vetores de tokens e matriz de similaridade.
//
// Os vetores vêm do `Vectorizer` e têm a largura do vocabulário do lote.
// Com centenas de queries a matriz é O(n²) comparações, então:
// - AVX2 (256-bit): 8 floats por instrução em cada comparação
// - Rayon: linhas da matriz calculadas em paralelo
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use rayon::prelude::*;

/// Casas decimais usadas no arredondamento da matriz
const SIMILARITY_DECIMALS: f32 = 100.0;

/// Similaridade cosseno - implementação simples (fallback)
///
/// # Fórmula
/// ```text
/// cos(θ) = (A · B) / (||A|| × ||B||)
/// ```
///
/// Vetor nulo tem similaridade 0.0 com qualquer outro vetor.
pub fn cosine_similarity_scalar(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have the same length");

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot_product += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    finish_cosine(dot_product, norm_a, norm_b)
}

#[inline]
fn finish_cosine(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

/// Similaridade cosseno com AVX2 (256-bit SIMD)
///
/// # Safety
///
/// Esta função é `unsafe` porque usa instruções SIMD diretamente.
/// O caller deve garantir que a CPU suporta AVX2 e FMA.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn cosine_similarity_avx2(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have the same length");
    let len = a.len();

    let mut dot_acc = _mm256_setzero_ps();
    let mut norm_a_acc = _mm256_setzero_ps();
    let mut norm_b_acc = _mm256_setzero_ps();

    let chunks = len / 8;
    for i in 0..chunks {
        let offset = i * 8;

        let va = _mm256_loadu_ps(a.as_ptr().add(offset));
        let vb = _mm256_loadu_ps(b.as_ptr().add(offset));

        dot_acc = _mm256_fmadd_ps(va, vb, dot_acc);
        norm_a_acc = _mm256_fmadd_ps(va, va, norm_a_acc);
        norm_b_acc = _mm256_fmadd_ps(vb, vb, norm_b_acc);
    }

    let mut dot = hsum_avx2(dot_acc);
    let mut norm_a = hsum_avx2(norm_a_acc);
    let mut norm_b = hsum_avx2(norm_b_acc);

    // Resto (len % 8) com loop escalar
    for i in (chunks * 8)..len {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    finish_cosine(dot, norm_a, norm_b)
}

/// Soma horizontal de 8 floats em um registro AVX2
#[cfg(target_arch = "x86_64")]
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum_avx2(v: __m256) -> f32 {
    let sum1 = _mm256_hadd_ps(v, v);
    let sum2 = _mm256_hadd_ps(sum1, sum1);
    let low = _mm256_castps256_ps128(sum2);
    let high = _mm256_extractf128_ps(sum2, 1);
    let final_sum = _mm_add_ss(low, high);
    _mm_cvtss_f32(final_sum)
}

/// Seleciona automaticamente a melhor implementação disponível
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { cosine_similarity_avx2(a, b) };
        }
    }

    cosine_similarity_scalar(a, b)
}

/// Arredonda uma similaridade para 2 casas decimais (half-to-even)
///
/// O arredondamento define a granularidade efetiva do threshold e absorve
/// ruído de ponto flutuante (ex: 0.99999994 vira 1.0).
pub fn round_similarity(value: f32) -> f32 {
    (value * SIMILARITY_DECIMALS).round_ties_even() / SIMILARITY_DECIMALS
}

/// Matriz simétrica de similaridade já arredondada
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<f32>>,
}

impl SimilarityMatrix {
    /// Calcula a matriz completa para um conjunto de vetores
    ///
    /// Linhas calculadas em paralelo com Rayon; a diagonal é fixada em 1.0,
    /// inclusive para vetores nulos.
    pub fn compute(vectors: &[Vec<f32>]) -> Self {
        let rows = vectors
            .par_iter()
            .enumerate()
            .map(|(i, a)| {
                vectors
                    .iter()
                    .enumerate()
                    .map(|(j, b)| {
                        if i == j {
                            1.0
                        } else {
                            round_similarity(cosine_similarity(a, b))
                        }
                    })
                    .collect()
            })
            .collect();

        Self { rows }
    }

    /// Cria matriz a partir de valores prontos (útil em testes)
    ///
    /// Os valores são arredondados como em [`SimilarityMatrix::compute`].
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(round_similarity).collect())
            .collect();
        Self { rows }
    }

    /// Número de itens
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Verifica se a matriz está vazia
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Similaridade entre os itens `i` e `j`
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.rows[i][j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = a.clone();

        let similarity = cosine_similarity(&a, &b);
        assert!((similarity - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        let similarity = cosine_similarity(&a, &b);
        assert!(similarity.abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0; 12];
        let b = vec![1.0; 12];

        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity_scalar(&a, &a), 0.0);
    }

    #[test]
    fn test_cosine_similarity_large_vectors() {
        // Vocabulário grande com presença esparsa
        let a: Vec<f32> = (0..300).map(|i| (i % 3 == 0) as u8 as f32).collect();
        let b: Vec<f32> = (0..300).map(|i| (i % 5 == 0) as u8 as f32).collect();

        let scalar = cosine_similarity_scalar(&a, &b);
        let auto = cosine_similarity(&a, &b);

        assert!((scalar - auto).abs() < 0.0001);
    }

    #[test]
    fn test_round_similarity() {
        assert_eq!(round_similarity(0.99999994), 1.0);
        assert_eq!(round_similarity(0.8049), 0.8);
        assert_eq!(round_similarity(0.57735), 0.58);
    }

    #[test]
    fn test_matrix_diagonal_and_symmetry() {
        let vectors = vec![
            vec![1.0, 1.0, 0.0],
            vec![1.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0],
        ];

        let matrix = SimilarityMatrix::compute(&vectors);

        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
        assert_eq!(matrix.get(0, 1), 0.5);
        assert_eq!(matrix.get(0, 2), 0.0);
    }
}
