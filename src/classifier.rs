// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLASSIFICADOR DE QUERIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Decide, por query candidata, entre intenção geo, intenção main ou rejeição.
// Ordem das regras (a primeira que casar vence):
//   1. stop word        → rejeitada
//   2. lema geo         → geo
//   3. cidade/inclusão  → main
//   4. nada             → rejeitada
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Arc;

use regex::Regex;

use crate::clustering::dedup_exact;
use crate::geo::{GeoNormalizer, GeoVocabulary};
use crate::ledger::{DeletionLedger, DeletionReason};
use crate::types::{Bucket, QueryRecord};

/// Letras que contam como parte de palavra (latim e cirílico)
const WORD_LETTERS: &str = "A-Za-zА-ЯЁа-яё";

/// Casamento de palavra inteira contra um vocabulário
///
/// As fronteiras são não-letras (latinas ou cirílicas) ou início/fim do
/// texto. O vocabulário inteiro é compilado em uma única alternação.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    regex: Option<Regex>,
}

impl WordMatcher {
    /// Compila o vocabulário (palavras vazias são ignoradas)
    pub fn new<I, S>(words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .map(|word| regex::escape(&word))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { regex: None });
        }

        let pattern = format!(
            "(?:^|[^{letters}])(?:{words})(?:[^{letters}]|$)",
            letters = WORD_LETTERS,
            words = alternatives.join("|")
        );
        Ok(Self {
            regex: Some(Regex::new(&pattern)?),
        })
    }

    /// Verifica se alguma palavra do vocabulário aparece inteira no texto
    pub fn is_match(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&text.to_lowercase()),
            None => false,
        }
    }
}

/// Vocabulários do classificador (todos já lematizados)
#[derive(Debug, Clone, Default)]
pub struct ClassifierVocabulary {
    /// Lemas de stop words
    pub stop_words: Vec<String>,
    /// Lemas geográficos ("clear geos")
    pub geo: GeoVocabulary,
    /// Lemas de cidades ("clear cities")
    pub cities: GeoVocabulary,
    /// Lemas de palavras de inclusão
    pub inclusion_words: Vec<String>,
}

/// Resultado da classificação de uma query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Aceita em um balde
    Accepted(Bucket),
    /// Rejeitada (stop word ou sem intenção reconhecida)
    Rejected,
}

/// Queries aceitas, separadas por balde e sem duplicatas
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedQueries {
    /// Balde geo
    pub geo: Vec<QueryRecord>,
    /// Balde main
    pub main: Vec<QueryRecord>,
}

/// Classificador de queries
pub struct QueryClassifier {
    normalizer: Arc<dyn GeoNormalizer>,
    stop: WordMatcher,
    geo: WordMatcher,
    main: WordMatcher,
}

impl QueryClassifier {
    /// Compila os vocabulários
    pub fn new(
        normalizer: Arc<dyn GeoNormalizer>,
        vocabulary: &ClassifierVocabulary,
    ) -> Result<Self, regex::Error> {
        let main_words = vocabulary
            .cities
            .iter()
            .chain(vocabulary.inclusion_words.iter());

        Ok(Self {
            stop: WordMatcher::new(&vocabulary.stop_words)?,
            geo: WordMatcher::new(&vocabulary.geo)?,
            main: WordMatcher::new(main_words)?,
            normalizer,
        })
    }

    /// Classifica um texto já normalizado (lema)
    pub fn classify_lemma(&self, lemma: &str) -> Classification {
        if self.stop.is_match(lemma) {
            Classification::Rejected
        } else if self.geo.is_match(lemma) {
            Classification::Accepted(Bucket::Geo)
        } else if self.main.is_match(lemma) {
            Classification::Accepted(Bucket::Main)
        } else {
            Classification::Rejected
        }
    }

    /// Normaliza e classifica uma query; devolve também o lema
    pub fn classify(&self, query: &str) -> (Classification, String) {
        let lemma = self.normalizer.lemma_of_query(query);
        (self.classify_lemma(&lemma), lemma)
    }

    /// Separa candidatos em geo/main, removendo duplicatas de cada balde
    ///
    /// Rejeitadas e duplicatas vão para o livro de remoções com a etapa.
    pub fn sort_queries(
        &self,
        queries: Vec<QueryRecord>,
        stage: u32,
        ledger: &mut DeletionLedger,
    ) -> SortedQueries {
        let mut geo = Vec::new();
        let mut main = Vec::new();
        let mut rejected = Vec::new();

        for query in queries {
            let (classification, lemma) = self.classify(&query.text);
            match classification {
                Classification::Accepted(Bucket::Geo) => geo.push(query.with_lemma(lemma)),
                Classification::Accepted(Bucket::Main) => main.push(query.with_lemma(lemma)),
                Classification::Rejected => rejected.push(query.text),
            }
        }
        ledger.record(rejected, DeletionReason::Unclassified { stage });

        let (geo, geo_duplicates) = dedup_exact(geo, |query| query.lemma.as_str());
        ledger.record(texts(geo_duplicates), DeletionReason::GeoDuplicate { stage });

        let (main, main_duplicates) = dedup_exact(main, |query| query.lemma.as_str());
        ledger.record(texts(main_duplicates), DeletionReason::MainDuplicate { stage });

        log::info!(
            "🧭 Estágio {}: {} geo, {} main",
            stage,
            geo.len(),
            main.len()
        );

        SortedQueries { geo, main }
    }
}

fn texts(queries: Vec<QueryRecord>) -> Vec<String> {
    queries.into_iter().map(|query| query.text).collect()
}
