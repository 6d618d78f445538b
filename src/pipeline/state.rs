// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADOS DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

/// Estado do pipeline - transições explícitas
///
/// `Seed → Filter → {Classify → Query → Expand} × rodadas → Done`, com
/// `Failed` alcançável a partir de qualquer estado não terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Montando as sementes a partir dos containers
    Seed,

    /// Buscando e filtrando estatísticas históricas
    Filter,

    /// Classificando candidatos em geo/main
    Classify {
        /// Rodada atual (começa em 1)
        round: u32,
        /// Contador de estágio
        stage: u32,
    },

    /// Consultando o provedor de busca
    Query { round: u32, stage: u32 },

    /// Gerando novos candidatos a partir dos relacionados
    Expand { round: u32, stage: u32 },

    /// Execução concluída
    ///
    /// Estado terminal.
    Done {
        /// Rodadas efetivamente executadas
        rounds: u32,
    },

    /// Falha fatal (autenticação)
    ///
    /// Estado terminal - o estado parcial continua disponível no pipeline.
    Failed {
        /// Motivo da falha
        reason: String,
    },
}

impl PipelineState {
    /// Verifica se o estado é terminal (Done ou Failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done { .. } | PipelineState::Failed { .. })
    }

    /// Rodada atual, se aplicável
    pub fn round(&self) -> Option<u32> {
        match self {
            PipelineState::Classify { round, .. }
            | PipelineState::Query { round, .. }
            | PipelineState::Expand { round, .. } => Some(*round),
            _ => None,
        }
    }

    /// Verifica se uma transição é válida
    pub fn can_transition_to(&self, target: &PipelineState) -> bool {
        if matches!(target, PipelineState::Failed { .. }) {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            (PipelineState::Seed, PipelineState::Filter)
                | (PipelineState::Filter, PipelineState::Classify { .. })
                | (PipelineState::Filter, PipelineState::Done { .. })
                | (PipelineState::Classify { .. }, PipelineState::Query { .. })
                | (PipelineState::Query { .. }, PipelineState::Expand { .. })
                | (PipelineState::Expand { .. }, PipelineState::Classify { .. })
                | (PipelineState::Expand { .. }, PipelineState::Done { .. })
        )
    }

    /// Nome curto para logs e timings
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Seed => "seed",
            PipelineState::Filter => "filter",
            PipelineState::Classify { .. } => "classify",
            PipelineState::Query { .. } => "query",
            PipelineState::Expand { .. } => "expand",
            PipelineState::Done { .. } => "done",
            PipelineState::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let classify = PipelineState::Classify { round: 1, stage: 1 };
        let query = PipelineState::Query { round: 1, stage: 2 };
        let expand = PipelineState::Expand { round: 1, stage: 3 };
        let done = PipelineState::Done { rounds: 1 };
        let failed = PipelineState::Failed { reason: "auth".into() };

        // Transições válidas
        assert!(PipelineState::Seed.can_transition_to(&PipelineState::Filter));
        assert!(PipelineState::Filter.can_transition_to(&classify));
        assert!(classify.can_transition_to(&query));
        assert!(query.can_transition_to(&expand));
        assert!(expand.can_transition_to(&PipelineState::Classify { round: 2, stage: 4 }));
        assert!(expand.can_transition_to(&done));
        assert!(PipelineState::Seed.can_transition_to(&failed));

        // Transições inválidas
        assert!(!classify.can_transition_to(&expand));
        assert!(!done.can_transition_to(&classify));
        assert!(!failed.can_transition_to(&failed));
    }

    #[test]
    fn test_is_terminal_and_round() {
        assert!(!PipelineState::Seed.is_terminal());
        assert!(PipelineState::Done { rounds: 3 }.is_terminal());
        assert!(PipelineState::Failed { reason: "x".into() }.is_terminal());

        assert_eq!(PipelineState::Query { round: 2, stage: 5 }.round(), Some(2));
        assert_eq!(PipelineState::Filter.round(), None);
    }
}
