// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TOKENIZER E CACHE DE LEMAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait do lematizador externo e um adaptador baseado em dicionário.
// O cache de lemas é um objeto explícito, criado uma vez por execução e
// compartilhado via Arc (nunca uma tabela global do processo).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Lematizador: converte um texto para a forma normalizada de cada palavra
///
/// Deve ser determinístico e puro (mesma entrada, mesma saída).
pub trait Tokenizer: Send + Sync {
    /// Lema de um texto (palavras separadas por espaço simples)
    fn lemma(&self, text: &str) -> String;
}

/// Estatísticas do cache de lemas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LemmaCacheStats {
    /// Total de hits
    pub hits: u64,
    /// Total de misses
    pub misses: u64,
    /// Palavras armazenadas
    pub entries: usize,
}

impl LemmaCacheStats {
    /// Taxa de hit (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Cache thread-safe de lemas por palavra
///
/// # Exemplo
///
/// ```rust
/// use keyword_clusterer::tokenizer::LemmaCache;
///
/// let cache = LemmaCache::new();
/// let lemma = cache.get_or_insert_with("диваны", || "диван".to_string());
/// assert_eq!(lemma, "диван");
/// assert_eq!(cache.stats().misses, 1);
/// ```
#[derive(Debug, Default)]
pub struct LemmaCache {
    store: RwLock<HashMap<String, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LemmaCache {
    /// Cria cache vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Recupera lema de uma palavra
    pub fn get(&self, word: &str) -> Option<String> {
        let found = self
            .store
            .read()
            .ok()
            .and_then(|store| store.get(word).cloned());

        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Recupera lema ou calcula e armazena
    pub fn get_or_insert_with<F>(&self, word: &str, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        if let Some(lemma) = self.get(word) {
            return lemma;
        }

        let lemma = compute();
        if let Ok(mut store) = self.store.write() {
            store.insert(word.to_string(), lemma.clone());
        }
        lemma
    }

    /// Número de palavras armazenadas
    pub fn len(&self) -> usize {
        self.store.read().map(|store| store.len()).unwrap_or(0)
    }

    /// Verifica se está vazio
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estatísticas atuais
    pub fn stats(&self) -> LemmaCacheStats {
        LemmaCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Substituições aplicadas após a lematização (sinônimos de serviço)
const DEFAULT_REPLACEMENTS: &[(&str, &str)] = &[
    ("сделать", "делать"),
    ("смонтировать", "монтаж"),
    ("сборка", "установить"),
    ("собрать", "установить"),
    ("установка", "установить"),
    ("поставить", "установить"),
    ("подключить", "установить"),
    ("подключение", "установить"),
    ("демонтаж", "демонтировать"),
    ("замена", "заменить"),
    ("ремонт", "починить"),
    ("отремонтировать", "починить"),
    ("починка", "починить"),
    ("покраска", "покрасить"),
    ("восстановление", "восстановить"),
    ("удаление", "удалить"),
    ("реставрация", "реставрировать"),
    ("диагностика", "диагностировать"),
    ("изготовление", "заказать"),
    ("изготовить", "заказать"),
    ("заказывать", "заказать"),
    ("шкафчик", "шкаф"),
    ("столик", "стол"),
    ("фотосъемка", "фотосъёмка"),
    ("съемка", "фотосъёмка"),
    ("штукатурка", "штукатурить"),
];

/// Lematizador baseado em dicionário palavra → lema
///
/// Palavras fora do dicionário ficam como estão (em minúsculas). Depois da
/// consulta ao dicionário, a tabela de substituições unifica sinônimos
/// ("ремонт" e "починка" viram "починить").
pub struct DictionaryTokenizer {
    dictionary: HashMap<String, String>,
    replacements: HashMap<String, String>,
    cache: Arc<LemmaCache>,
}

impl DictionaryTokenizer {
    /// Cria tokenizer com dicionário e cache compartilhado
    pub fn new(dictionary: HashMap<String, String>, cache: Arc<LemmaCache>) -> Self {
        let dictionary = dictionary
            .into_iter()
            .map(|(word, lemma)| (word.to_lowercase(), lemma.to_lowercase()))
            .collect();
        let replacements = DEFAULT_REPLACEMENTS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            dictionary,
            replacements,
            cache,
        }
    }

    /// Tokenizer sem dicionário (apenas minúsculas e substituições)
    pub fn identity(cache: Arc<LemmaCache>) -> Self {
        Self::new(HashMap::new(), cache)
    }

    /// Substitui a tabela de sinônimos
    pub fn with_replacements(mut self, replacements: HashMap<String, String>) -> Self {
        self.replacements = replacements;
        self
    }

    /// Cache compartilhado
    pub fn cache(&self) -> &Arc<LemmaCache> {
        &self.cache
    }

    fn lemma_of_word(&self, word: &str) -> String {
        let base = self
            .dictionary
            .get(word)
            .map(String::as_str)
            .unwrap_or(word);
        self.replacements
            .get(base)
            .cloned()
            .unwrap_or_else(|| base.to_string())
    }
}

impl Tokenizer for DictionaryTokenizer {
    fn lemma(&self, text: &str) -> String {
        text.to_lowercase()
            .split_whitespace()
            .map(|word| {
                self.cache
                    .get_or_insert_with(word, || self.lemma_of_word(word))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> DictionaryTokenizer {
        let dictionary = HashMap::from([
            ("диваны".to_string(), "диван".to_string()),
            ("Минске".to_string(), "минск".to_string()),
        ]);
        DictionaryTokenizer::new(dictionary, Arc::new(LemmaCache::new()))
    }

    #[test]
    fn test_dictionary_lookup_and_lowercase() {
        let tokenizer = tokenizer();
        assert_eq!(tokenizer.lemma("Диваны в  Минске"), "диван в минск");
    }

    #[test]
    fn test_replacements_unify_synonyms() {
        let tokenizer = tokenizer();
        assert_eq!(tokenizer.lemma("ремонт телефона"), "починить телефона");
        assert_eq!(tokenizer.lemma("починка"), "починить");
    }

    #[test]
    fn test_cache_is_shared_between_tokenizers() {
        let cache = Arc::new(LemmaCache::new());
        let first = DictionaryTokenizer::identity(cache.clone());
        let second = DictionaryTokenizer::identity(cache.clone());

        first.lemma("диван цена");
        second.lemma("диван");

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert!((stats.hit_rate() - 1.0 / 3.0).abs() < 1e-9);
    }
}
