// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NORMALIZAÇÃO GEOGRÁFICA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Remoção de prefixos locativos ("в", "г.", "мкр.", ...), lema de queries
// sem preposições locativas e detecção/remoção de frases geográficas.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::tokenizer::Tokenizer;

/// Vocabulário de lemas geográficos ("clear geos")
///
/// Cada entrada é uma frase já lematizada (ex: "минск", "нижний новгород").
pub type GeoVocabulary = BTreeSet<String>;

/// Prefixos de nomes geográficos, testados na ordem (o primeiro vence)
const GEO_PREFIXES: &[&str] = &[
    "д.",
    "п.",
    "аг.",
    "ст.",
    "гп.",
    "м.",
    "р-н",
    "мкр.",
    "деревне",
    "посёлке",
    "агрогородке",
    "садоводческом товариществе",
    "городском посёлке",
    "районе",
    "микрорайоне",
    "у метро",
    "у м.",
    "городе",
    "г.",
];

/// Preposições que podem abrir um nome geográfico
const LEADING_PREPOSITIONS: &[&str] = &["в ", "во "];

/// Lemas removidos de queries normalizadas
const LOCATIONAL_LEMMAS: &[&str] = &[
    "город",
    "метро",
    "район",
    "посёлок",
    "микрорайон",
    "деревня",
    "агрогородок",
    "в",
    "во",
];

/// Palavras que caem junto com a frase geográfica que as segue
const SPAN_PREFIX_WORDS: &[&str] = &[
    "город",
    "метро",
    "район",
    "посёлок",
    "микрорайон",
    "деревня",
    "агрогородок",
    "в",
    "во",
    "на",
    "г.",
    "г",
];

fn is_one_of(word: &str, list: &[&str]) -> bool {
    list.iter().any(|candidate| *candidate == word)
}

/// Normalizador geográfico consumido pelo classificador e pelo relatório
pub trait GeoNormalizer: Send + Sync {
    /// Remove preposição e prefixo locativo do início (texto em minúsculas)
    fn strip_geo_prefix(&self, text: &str) -> String;

    /// Lema da query sem prefixos/preposições locativas, espaços colapsados
    fn lemma_of_query(&self, text: &str) -> String;

    /// Remove da query as frases do vocabulário (e o prefixo que as precede)
    fn remove_geo_span(&self, query: &str, vocabulary: &GeoVocabulary) -> String;

    /// Verifica se alguma frase do vocabulário aparece na query
    fn contains_geo_phrase(&self, query: &str, vocabulary: &GeoVocabulary) -> bool;

    /// Lema "limpo" de um nome geográfico (ex: "в Минске" → "минск")
    fn clear_geo_name(&self, text: &str) -> String {
        self.lemma_of_query(&self.strip_geo_prefix(text))
    }
}

/// Normalizador baseado em tabelas de prefixos sobre qualquer [`Tokenizer`]
pub struct PrefixGeoNormalizer {
    tokenizer: Arc<dyn Tokenizer>,
}

impl PrefixGeoNormalizer {
    /// Cria normalizador sobre um tokenizer compartilhado
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    fn phrase_tokens(vocabulary: &GeoVocabulary) -> Vec<Vec<&str>> {
        let mut phrases: Vec<Vec<&str>> = vocabulary
            .iter()
            .map(|phrase| phrase.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect();
        // Frases mais longas primeiro: "нижний новгород" antes de "новгород"
        phrases.sort_by(|a, b| b.len().cmp(&a.len()));
        phrases
    }

    fn match_len_at(lemmas: &[String], start: usize, phrases: &[Vec<&str>]) -> Option<usize> {
        phrases
            .iter()
            .find(|phrase| {
                start + phrase.len() <= lemmas.len()
                    && phrase
                        .iter()
                        .zip(&lemmas[start..])
                        .all(|(token, lemma)| *token == lemma.as_str())
            })
            .map(|phrase| phrase.len())
    }
}

impl GeoNormalizer for PrefixGeoNormalizer {
    fn strip_geo_prefix(&self, text: &str) -> String {
        let mut result = text.trim().to_lowercase();

        for preposition in LEADING_PREPOSITIONS {
            if let Some(rest) = result.strip_prefix(preposition) {
                result = rest.trim_start().to_string();
            }
        }

        if let Some(rest) = GEO_PREFIXES
            .iter()
            .find_map(|prefix| result.strip_prefix(prefix))
        {
            result = rest.trim_start().to_string();
        }

        result
    }

    fn lemma_of_query(&self, text: &str) -> String {
        self.tokenizer
            .lemma(text)
            .split_whitespace()
            .filter(|token| !is_one_of(token, LOCATIONAL_LEMMAS))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn remove_geo_span(&self, query: &str, vocabulary: &GeoVocabulary) -> String {
        let phrases = Self::phrase_tokens(vocabulary);
        let words: Vec<&str> = query.split_whitespace().collect();
        let lemmas: Vec<String> = words.iter().map(|word| self.tokenizer.lemma(word)).collect();

        let mut kept: Vec<usize> = Vec::with_capacity(words.len());
        let mut i = 0;
        while i < words.len() {
            match Self::match_len_at(&lemmas, i, &phrases) {
                Some(len) => {
                    if let Some(&previous) = kept.last() {
                        let raw = words[previous].to_lowercase();
                        if is_one_of(&raw, SPAN_PREFIX_WORDS)
                            || is_one_of(&lemmas[previous], SPAN_PREFIX_WORDS)
                        {
                            kept.pop();
                        }
                    }
                    i += len;
                }
                None => {
                    kept.push(i);
                    i += 1;
                }
            }
        }

        kept.into_iter()
            .map(|index| words[index])
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn contains_geo_phrase(&self, query: &str, vocabulary: &GeoVocabulary) -> bool {
        let lemma = self.lemma_of_query(query);
        let lemmas: Vec<String> = lemma.split_whitespace().map(str::to_string).collect();
        let phrases = Self::phrase_tokens(vocabulary);

        (0..lemmas.len()).any(|start| Self::match_len_at(&lemmas, start, &phrases).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{DictionaryTokenizer, LemmaCache};
    use std::collections::HashMap;

    fn normalizer() -> PrefixGeoNormalizer {
        let dictionary = HashMap::from([
            ("минске".to_string(), "минск".to_string()),
            ("бресте".to_string(), "брест".to_string()),
            ("городе".to_string(), "город".to_string()),
            ("нижнем".to_string(), "нижний".to_string()),
            ("новгороде".to_string(), "новгород".to_string()),
            ("диваны".to_string(), "диван".to_string()),
        ]);
        let tokenizer = DictionaryTokenizer::new(dictionary, Arc::new(LemmaCache::new()));
        PrefixGeoNormalizer::new(Arc::new(tokenizer))
    }

    fn vocabulary(items: &[&str]) -> GeoVocabulary {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strip_geo_prefix() {
        let geo = normalizer();
        assert_eq!(geo.strip_geo_prefix("в г. Минске"), "минске");
        assert_eq!(geo.strip_geo_prefix("во мкр. Сухарево"), "сухарево");
        assert_eq!(geo.strip_geo_prefix("Брест"), "брест");
    }

    #[test]
    fn test_clear_geo_name() {
        let geo = normalizer();
        assert_eq!(geo.clear_geo_name("в Минске"), "минск");
        assert_eq!(geo.clear_geo_name("в городе Бресте"), "брест");
    }

    #[test]
    fn test_lemma_of_query_drops_locational_words() {
        let geo = normalizer();
        assert_eq!(geo.lemma_of_query("диваны  в городе Минске"), "диван минск");
    }

    #[test]
    fn test_remove_geo_span_with_prefix() {
        let geo = normalizer();
        let vocab = vocabulary(&["минск", "нижний новгород"]);

        assert_eq!(geo.remove_geo_span("диваны в Минске", &vocab), "диваны");
        assert_eq!(geo.remove_geo_span("Минске диваны", &vocab), "диваны");
        assert_eq!(
            geo.remove_geo_span("диваны в Нижнем Новгороде недорого", &vocab),
            "диваны недорого"
        );
        assert_eq!(geo.remove_geo_span("диваны", &vocab), "диваны");
    }

    #[test]
    fn test_contains_geo_phrase() {
        let geo = normalizer();
        let vocab = vocabulary(&["брест", "нижний новгород"]);

        assert!(geo.contains_geo_phrase("диваны в Бресте", &vocab));
        assert!(geo.contains_geo_phrase("Нижнем Новгороде диваны", &vocab));
        assert!(!geo.contains_geo_phrase("диваны Новгороде", &vocab));
        assert!(!geo.contains_geo_phrase("диваны", &GeoVocabulary::new()));
    }
}
