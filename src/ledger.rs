// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LIVRO DE REMOÇÕES (DELETION LEDGER)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trilha de auditoria append-only: cada item descartado em cada etapa,
// com o motivo. Serializa como `[[itens...], "motivo"]`.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;

use serde::{Deserialize, Serialize};

/// Motivo de remoção
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionReason {
    /// Query histórica abaixo do tráfego mínimo
    BelowTrafficThreshold,
    /// Duplicata entre queries históricas
    HistoricalDuplicate,
    /// Nem geo nem main (ou contém stop word)
    Unclassified { stage: u32 },
    /// Duplicata no balde geo
    GeoDuplicate { stage: u32 },
    /// Duplicata no balde main
    MainDuplicate { stage: u32 },
    /// Duplicata entre itens relacionados
    RelatedDuplicate { stage: u32 },
    /// Candidato já consultado ou igual a uma âncora antiga
    AlreadySeen { stage: u32 },
    /// Busca falhou em todas as tentativas
    SearchFailed { stage: u32 },
    /// Duplicata dentro de um cluster do relatório
    ClusterDuplicate,
}

impl fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowTrafficThreshold => write!(f, "below traffic threshold (historical filter)"),
            Self::HistoricalDuplicate => write!(f, "duplicate historical query"),
            Self::Unclassified { stage } => write!(f, "neither geo nor main, stage {}", stage),
            Self::GeoDuplicate { stage } => write!(f, "geo duplicates, stage {}", stage),
            Self::MainDuplicate { stage } => write!(f, "main duplicates, stage {}", stage),
            Self::RelatedDuplicate { stage } => write!(f, "related duplicates, stage {}", stage),
            Self::AlreadySeen { stage } => write!(f, "already issued or anchored, stage {}", stage),
            Self::SearchFailed { stage } => write!(f, "search failed after retries, stage {}", stage),
            Self::ClusterDuplicate => write!(f, "duplicates inside cluster"),
        }
    }
}

/// Entrada do livro: itens removidos e motivo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry(Vec<String>, String);

impl LedgerEntry {
    /// Itens removidos
    pub fn removed(&self) -> &[String] {
        &self.0
    }

    /// Motivo legível
    pub fn reason(&self) -> &str {
        &self.1
    }
}

/// Livro append-only de remoções
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeletionLedger {
    entries: Vec<LedgerEntry>,
}

impl DeletionLedger {
    /// Cria livro vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra uma remoção (listas vazias também ficam registradas)
    pub fn record(&mut self, removed: Vec<String>, reason: DeletionReason) {
        if !removed.is_empty() {
            log::debug!("🗑️  {} item(s) removidos: {}", removed.len(), reason);
        }
        self.entries.push(LedgerEntry(removed, reason.to_string()));
    }

    /// Entradas na ordem de registro
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Número de entradas
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Verifica se está vazio
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total de itens removidos em todas as entradas
    pub fn total_removed(&self) -> usize {
        self.entries.iter().map(|entry| entry.removed().len()).sum()
    }

    /// Itens removidos com um motivo específico
    pub fn removed_for(&self, reason: DeletionReason) -> Vec<&str> {
        let reason = reason.to_string();
        self.entries
            .iter()
            .filter(|entry| entry.reason() == reason)
            .flat_map(|entry| entry.removed().iter().map(String::as_str))
            .collect()
    }
}
