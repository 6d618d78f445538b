// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SETUP: CONTAINERS, PLANILHA E SEMENTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Duas origens de containers:
// - árvore de containers (subárvore a partir de uma raiz)
// - linhas de planilha `[url, nome, _, _, geo, cidade, âncoras]`
//
// Ambas produzem um SeedSet: URLs de origem, nomes de containers, vocabulários
// geográficos e âncoras antigas.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::{HashMap, HashSet};

use crate::clustering::dedup_exact;
use crate::geo::{GeoNormalizer, GeoVocabulary};
use crate::types::{Container, QueryRecord, SourceUrl};
use crate::utils::{non_blank, split_list};

/// Marcador de URLs de teste na planilha
const FAKE_URL_MARKER: &str = "fake";

/// Árvore de containers indexada por id
pub struct ContainerTree {
    containers: HashMap<String, Container>,
    children: HashMap<String, Vec<String>>,
}

impl ContainerTree {
    /// Indexa containers; filhos ficam na ordem de entrada
    pub fn new(containers: Vec<Container>) -> Self {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for container in &containers {
            if let Some(parent) = &container.parent_id {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(container.id.clone());
            }
        }

        let containers = containers
            .into_iter()
            .map(|container| (container.id.clone(), container))
            .collect();

        Self {
            containers,
            children,
        }
    }

    /// Número de containers
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Verifica se está vazia
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Container por id
    pub fn get(&self, id: &str) -> Option<&Container> {
        self.containers.get(id)
    }

    /// Subárvore da raiz em pré-ordem
    ///
    /// Pilha explícita + conjunto de visitados: profundidade arbitrária e
    /// ciclos não estouram a pilha nem repetem containers. Raiz desconhecida
    /// devolve lista vazia.
    pub fn seed_cluster(&self, root: &str) -> Vec<&Container> {
        let mut ordered = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let container = match self.containers.get(id) {
                Some(container) => container,
                None => {
                    log::warn!("⚠️ Container desconhecido: {}", id);
                    continue;
                }
            };
            ordered.push(container);

            if let Some(children) = self.children.get(id) {
                // Reverso para que o primeiro filho saia primeiro da pilha
                for child in children.iter().rev() {
                    if !visited.contains(child.as_str()) {
                        stack.push(child.as_str());
                    }
                }
            }
        }

        log::info!("🌳 Subárvore de {}: {} container(s)", root, ordered.len());
        ordered
    }
}

/// Sementes e vocabulários produzidos pelo setup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSet {
    /// URLs para estatísticas históricas
    pub source_urls: Vec<SourceUrl>,
    /// Nomes de containers de tópico
    pub main_names: Vec<String>,
    /// Nomes de containers geográficos
    pub geo_names: Vec<String>,
    /// Lemas geográficos
    pub clear_geos: GeoVocabulary,
    /// Lemas de cidades
    pub clear_cities: GeoVocabulary,
    /// Lemas de âncoras já usadas, sem duplicatas
    pub old_anchors: Vec<String>,
}

impl SeedSet {
    /// Monta sementes a partir de containers
    pub fn from_containers<'a, I>(containers: I, geo: &dyn GeoNormalizer) -> Self
    where
        I: IntoIterator<Item = &'a Container>,
    {
        let mut seeds = SeedSet::default();
        let mut anchors = Vec::new();

        for container in containers {
            seeds
                .source_urls
                .push(SourceUrl::new(container.domain.as_str(), container.path.as_str()));

            if let Some(city) = &container.extract_city {
                insert_clear(&mut seeds.clear_cities, geo.clear_geo_name(city));
            }
            if container.extract_name.is_some() {
                push_unique(&mut seeds.main_names, &container.name);
            }
            if let Some(extract_geo) = &container.extract_geo {
                push_unique(&mut seeds.geo_names, &container.name);
                insert_clear(&mut seeds.clear_geos, geo.clear_geo_name(extract_geo));
            }
            anchors.extend(
                container
                    .anchor_names
                    .iter()
                    .map(|anchor| geo.lemma_of_query(anchor)),
            );
        }

        seeds.old_anchors = dedup_anchors(anchors);
        seeds
    }

    /// Candidatos iniciais: nomes main, depois nomes geo (proveniência -1)
    pub fn seed_queries(&self) -> Vec<QueryRecord> {
        self.main_names
            .iter()
            .chain(self.geo_names.iter())
            .map(|name| QueryRecord::container_seed(name.as_str()))
            .collect()
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !name.trim().is_empty() && !names.iter().any(|existing| existing == name) {
        names.push(name.to_string());
    }
}

fn insert_clear(vocabulary: &mut GeoVocabulary, lemma: String) {
    if !lemma.is_empty() {
        vocabulary.insert(lemma);
    }
}

fn dedup_anchors(anchors: Vec<String>) -> Vec<String> {
    let anchors: Vec<String> = anchors.into_iter().filter(|a| !a.is_empty()).collect();
    dedup_exact(anchors, |anchor| anchor.as_str()).0
}

/// Linha da planilha já interpretada
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub url: String,
    pub name: String,
    pub extract_geo: Option<String>,
    pub extract_city: Option<String>,
    pub anchors: Vec<String>,
}

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(String::as_str).unwrap_or("")
}

/// Importação de containers a partir de linhas de planilha
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetImport {
    rows: Vec<SheetRow>,
}

impl SheetImport {
    /// Interpreta as linhas (colunas faltantes contam como vazias)
    ///
    /// `max_urls` limita o número de linhas consideradas (0 = ilimitado).
    pub fn from_rows(rows: &[Vec<String>], max_urls: usize) -> Self {
        let limit = if max_urls == 0 { rows.len() } else { max_urls.min(rows.len()) };
        let rows = rows[..limit]
            .iter()
            .map(|row| SheetRow {
                url: cell(row, 0).trim().to_string(),
                name: cell(row, 1).trim().to_string(),
                extract_geo: non_blank(cell(row, 4)),
                extract_city: non_blank(cell(row, 5)),
                anchors: split_list(cell(row, 6)),
            })
            .collect();

        Self { rows }
    }

    /// Linhas interpretadas
    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    /// Monta sementes: linhas com cidade são main, as demais são geo
    pub fn seed_set(&self, geo: &dyn GeoNormalizer) -> SeedSet {
        let mut seeds = SeedSet::default();
        let mut anchors = Vec::new();

        for row in &self.rows {
            if !row.url.is_empty() && !row.url.contains(FAKE_URL_MARKER) {
                match SourceUrl::parse(&row.url) {
                    Some(url) => seeds.source_urls.push(url),
                    None => log::warn!("⚠️ URL inválida ignorada: {}", row.url),
                }
            }

            anchors.extend(row.anchors.iter().map(|anchor| geo.lemma_of_query(anchor)));

            match &row.extract_city {
                Some(city) => {
                    push_unique(&mut seeds.main_names, &row.name);
                    insert_clear(&mut seeds.clear_cities, geo.clear_geo_name(city));
                }
                None => {
                    push_unique(&mut seeds.geo_names, &row.name);
                    if let Some(extract_geo) = &row.extract_geo {
                        insert_clear(&mut seeds.clear_geos, geo.clear_geo_name(extract_geo));
                    }
                }
            }
        }

        seeds.old_anchors = dedup_anchors(anchors);
        log::info!(
            "📋 Planilha: {} URL(s), {} main, {} geo, {} âncora(s)",
            seeds.source_urls.len(),
            seeds.main_names.len(),
            seeds.geo_names.len(),
            seeds.old_anchors.len()
        );
        seeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::PrefixGeoNormalizer;
    use crate::tokenizer::{DictionaryTokenizer, LemmaCache};
    use std::sync::Arc;

    fn geo() -> PrefixGeoNormalizer {
        let dictionary = HashMap::from([
            ("минске".to_string(), "минск".to_string()),
            ("бресте".to_string(), "брест".to_string()),
            ("диваны".to_string(), "диван".to_string()),
        ]);
        PrefixGeoNormalizer::new(Arc::new(DictionaryTokenizer::new(
            dictionary,
            Arc::new(LemmaCache::new()),
        )))
    }

    fn container(id: &str, parent: Option<&str>) -> Container {
        Container {
            id: id.into(),
            parent_id: parent.map(String::from),
            name: format!("name {}", id),
            domain: "https://a.by".into(),
            path: format!("/{}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_seed_cluster_preorder() {
        let tree = ContainerTree::new(vec![
            container("root", None),
            container("a", Some("root")),
            container("a1", Some("a")),
            container("b", Some("root")),
            container("other", None),
        ]);

        let ids: Vec<&str> = tree
            .seed_cluster("root")
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_seed_cluster_survives_cycles_and_depth() {
        let mut containers = vec![container("n0", Some("n4999"))];
        for i in 1..5000 {
            containers.push(container(&format!("n{}", i), Some(&format!("n{}", i - 1))));
        }
        let tree = ContainerTree::new(containers);

        assert_eq!(tree.seed_cluster("n0").len(), 5000);
        assert!(tree.seed_cluster("missing").is_empty());
    }

    #[test]
    fn test_seed_set_from_containers() {
        let mut minsk = container("minsk", None);
        minsk.name = "Диваны в Минске".into();
        minsk.extract_geo = Some("в Минске".into());
        minsk.anchor_names = vec!["диваны".into(), "Диваны".into()];

        let mut sofas = container("sofas", None);
        sofas.name = "Диваны".into();
        sofas.extract_name = Some("Диваны".into());
        sofas.extract_city = Some("Бресте".into());

        let seeds = SeedSet::from_containers([&minsk, &sofas], &geo());

        assert_eq!(seeds.source_urls.len(), 2);
        assert_eq!(seeds.main_names, vec!["Диваны"]);
        assert_eq!(seeds.geo_names, vec!["Диваны в Минске"]);
        assert!(seeds.clear_geos.contains("минск"));
        assert!(seeds.clear_cities.contains("брест"));
        assert_eq!(seeds.old_anchors, vec!["диван"]);

        let queries = seeds.seed_queries();
        assert_eq!(queries[0].text, "Диваны");
        assert_eq!(queries[1].text, "Диваны в Минске");
        assert!(queries.iter().all(QueryRecord::is_container_seed));
    }

    #[test]
    fn test_sheet_import() {
        let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let rows = vec![
            row(&["https://a.by/divany", "Диваны", "", "", "", "Минск", "диваны, кресла"]),
            row(&["https://a.by/divany-minsk", "Диваны в Минске", "", "", "в Минске"]),
            row(&["https://fake.a.by/x", "Тест", "", "", "в Бресте", "", ""]),
            row(&["https://a.by/over-limit", "Лишнее"]),
        ];

        let import = SheetImport::from_rows(&rows, 3);
        assert_eq!(import.rows().len(), 3);
        assert_eq!(import.rows()[0].anchors, vec!["диваны", "кресла"]);

        let seeds = import.seed_set(&geo());
        assert_eq!(seeds.source_urls.len(), 2);
        assert_eq!(seeds.source_urls[0].path, "/divany");
        assert_eq!(seeds.main_names, vec!["Диваны"]);
        assert_eq!(seeds.geo_names, vec!["Диваны в Минске", "Тест"]);
        assert!(seeds.clear_cities.contains("минск"));
        assert!(seeds.clear_geos.contains("брест"));
        assert_eq!(seeds.old_anchors, vec!["диван", "кресла"]);
    }

    #[test]
    fn test_sheet_import_normalizes_source_urls() {
        let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let rows = vec![
            row(&["HTTPS://a.by/divany", "Диваны"]),
            row(&["https://a.by?utm=1", "Главная"]),
            row(&["https://", "Пустая"]),
        ];

        let seeds = SheetImport::from_rows(&rows, 0).seed_set(&geo());
        let urls: Vec<String> = seeds.source_urls.iter().map(SourceUrl::full).collect();
        assert_eq!(urls, vec!["https://a.by/divany", "https://a.by/"]);
    }

    #[test]
    fn test_sheet_import_unlimited() {
        let rows = vec![vec!["https://a.by/".to_string()]; 5];
        assert_eq!(SheetImport::from_rows(&rows, 0).rows().len(), 5);
    }
}
