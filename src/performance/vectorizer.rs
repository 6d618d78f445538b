// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VETORIZAÇÃO BAG-OF-TOKENS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Transforma um lote de strings em vetores de contagem de tokens.
// O vocabulário é construído apenas a partir do lote (não é global).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeMap;

/// Separador de tokens (textos já lematizados, um espaço entre tokens)
const TOKEN_SEPARATOR: char = ' ';

/// Erros da vetorização e clusterização
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    #[error("Cannot vectorize an empty batch")]
    EmptyBatch,

    #[error("Similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),
}

/// Resultado da vetorização de um lote
#[derive(Debug, Clone, PartialEq)]
pub struct TokenVectors {
    /// Vocabulário do lote em ordem lexicográfica (índice = coluna)
    pub vocabulary: Vec<String>,
    /// Uma linha por texto de entrada
    pub rows: Vec<Vec<f32>>,
}

/// Vetorizador de contagem de tokens
///
/// Tokens são separados por um único espaço e convertidos para minúsculas.
/// O token vazio (separadores duplicados, no início ou no fim) nunca entra
/// no vocabulário: ele inflaria a similaridade entre strings esparsas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vectorizer;

impl Vectorizer {
    /// Vetoriza um lote não vazio
    pub fn vectorize<S: AsRef<str>>(batch: &[S]) -> Result<TokenVectors, ClusterError> {
        if batch.is_empty() {
            return Err(ClusterError::EmptyBatch);
        }

        let tokenized: Vec<Vec<String>> = batch
            .iter()
            .map(|text| {
                text.as_ref()
                    .split(TOKEN_SEPARATOR)
                    .filter(|token| !token.is_empty())
                    .map(str::to_lowercase)
                    .collect()
            })
            .collect();

        let mut columns: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                columns.entry(token.as_str()).or_insert(0);
            }
        }
        for (column, index) in columns.values_mut().enumerate() {
            *index = column;
        }

        let width = columns.len();
        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut row = vec![0.0f32; width];
                for token in tokens {
                    row[columns[token.as_str()]] += 1.0;
                }
                row
            })
            .collect();

        Ok(TokenVectors {
            vocabulary: columns.keys().map(|token| token.to_string()).collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_is_batch_local_and_sorted() {
        let vectors = Vectorizer::vectorize(&["ремонт телефон", "телефон цена"]).unwrap();

        assert_eq!(vectors.vocabulary, vec!["ремонт", "телефон", "цена"]);
        assert_eq!(vectors.rows[0], vec![1.0, 1.0, 0.0]);
        assert_eq!(vectors.rows[1], vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_token_excluded() {
        let vectors = Vectorizer::vectorize(&[" диван  цена ", "", "диван"]).unwrap();

        assert!(!vectors.vocabulary.iter().any(|t| t.is_empty()));
        assert_eq!(vectors.vocabulary.len(), 2);
        assert_eq!(vectors.rows[1], vec![0.0, 0.0]);
    }

    #[test]
    fn test_tokens_are_counted_and_lowercased() {
        let vectors = Vectorizer::vectorize(&["Диван диван"]).unwrap();

        assert_eq!(vectors.vocabulary, vec!["диван"]);
        assert_eq!(vectors.rows[0], vec![2.0]);
    }

    #[test]
    fn test_empty_batch_fails() {
        let batch: Vec<String> = vec![];
        assert_eq!(Vectorizer::vectorize(&batch), Err(ClusterError::EmptyBatch));
    }
}
