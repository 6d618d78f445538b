// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLUSTERIZAÇÃO POR QUASE-CLIQUES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Agrupamento guloso e determinístico sobre a matriz de similaridade cosseno.
//
// Regra: cada item ainda livre, em ordem de índice, vira semente de um
// clique. Um item `j` entra no clique apenas se for similar à semente E a
// todos os membros já aceitos (não há encadeamento transitivo). Itens já
// atribuídos nunca são reatribuídos, mesmo que uma semente posterior forme
// um clique melhor: a ordem de entrada define os representantes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::performance::{ClusterError, SimilarityMatrix, Vectorizer};

/// Threshold de duplicata exata
pub const EXACT_DUPLICATE: f32 = 1.0;

/// Atribuição de clusters: índice do item → índice do representante
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    ids: Vec<usize>,
}

impl ClusterAssignment {
    /// IDs de cluster, na ordem dos itens de entrada
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Número de itens
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Verifica se não há itens
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Representante do item `i`
    pub fn cluster_of(&self, i: usize) -> usize {
        self.ids[i]
    }

    /// Verifica se o item `i` é representante do próprio cluster
    pub fn is_representative(&self, i: usize) -> bool {
        self.ids[i] == i
    }

    /// Membros de cada cluster, ordenados pelo índice do representante
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut slot_of = vec![usize::MAX; self.ids.len()];

        for (i, &cluster) in self.ids.iter().enumerate() {
            if slot_of[cluster] == usize::MAX {
                slot_of[cluster] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot_of[cluster]].push(i);
        }

        groups
    }

    /// Número de clusters distintos
    pub fn cluster_count(&self) -> usize {
        (0..self.ids.len()).filter(|&i| self.is_representative(i)).count()
    }
}

impl From<ClusterAssignment> for Vec<usize> {
    fn from(assignment: ClusterAssignment) -> Self {
        assignment.ids
    }
}

/// Motor de clusterização por similaridade
///
/// # Exemplo
///
/// ```rust
/// use keyword_clusterer::clustering::SimilarityClusterer;
///
/// let items = ["ремонт телефон", "телефон ремонт", "диван цена"];
/// let clusters = SimilarityClusterer::cluster(&items, 1.0).unwrap();
///
/// assert_eq!(clusters.ids(), &[0, 0, 2]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityClusterer;

impl SimilarityClusterer {
    /// Vetoriza os itens e agrupa com o threshold dado
    pub fn cluster<S: AsRef<str>>(
        items: &[S],
        threshold: f32,
    ) -> Result<ClusterAssignment, ClusterError> {
        validate_threshold(threshold)?;
        let vectors = Vectorizer::vectorize(items)?;
        let matrix = SimilarityMatrix::compute(&vectors.rows);
        Ok(Self::cluster_matrix(&matrix, threshold))
    }

    /// Agrupa a partir de uma matriz de similaridade já calculada
    ///
    /// Complexidade O(n² · k), com k o tamanho do maior clique.
    pub fn cluster_matrix(matrix: &SimilarityMatrix, threshold: f32) -> ClusterAssignment {
        let n = matrix.len();
        let mut assigned: Vec<Option<usize>> = vec![None; n];
        let mut accepted: Vec<usize> = Vec::new();

        for seed in 0..n {
            if assigned[seed].is_some() {
                continue;
            }

            accepted.clear();
            for candidate in 0..n {
                if assigned[candidate].is_some() || matrix.get(seed, candidate) < threshold {
                    continue;
                }
                if accepted
                    .iter()
                    .all(|&member| matrix.get(member, candidate) >= threshold)
                {
                    accepted.push(candidate);
                }
            }

            for &member in &accepted {
                assigned[member].get_or_insert(seed);
            }
        }

        // A diagonal é 1.0, então toda semente aceita a si mesma
        let ids = assigned
            .into_iter()
            .enumerate()
            .map(|(i, cluster)| cluster.unwrap_or(i))
            .collect();

        ClusterAssignment { ids }
    }
}

fn validate_threshold(threshold: f32) -> Result<(), ClusterError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ClusterError::InvalidThreshold(threshold))
    }
}

/// Remove duplicatas exatas por uma chave textual
///
/// Mantém o representante de cada cluster (primeira ocorrência) e devolve
/// `(mantidos, removidos)`, ambos na ordem original. Entrada vazia devolve
/// duas listas vazias.
pub fn dedup_exact<T, F>(items: Vec<T>, key: F) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> &str,
{
    if items.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let keys: Vec<&str> = items.iter().map(&key).collect();
    let assignment = match SimilarityClusterer::cluster(&keys, EXACT_DUPLICATE) {
        Ok(assignment) => assignment,
        // Lote não vazio e threshold constante: inalcançável
        Err(_) => return (items, Vec::new()),
    };

    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if assignment.is_representative(i) {
            kept.push(item);
        } else {
            removed.push(item);
        }
    }

    (kept, removed)
}
