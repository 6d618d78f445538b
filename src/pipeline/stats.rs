// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTATÍSTICAS DA EXECUÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Contadores agregados pelo coordenador depois de cada etapa. Os workers de
// busca nunca tocam aqui: só devolvem resultados.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::StageTimings;

/// Estatísticas de uma execução do pipeline
///
/// # Exemplo
///
/// ```rust
/// use keyword_clusterer::pipeline::RunStats;
///
/// let mut stats = RunStats::new();
/// stats.record_query(true);
/// stats.record_query(false);
/// assert_eq!(stats.failure_rate(), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// ID único da execução
    pub run_id: Uuid,
    /// Início da execução
    pub started_at: DateTime<Utc>,
    /// Fim da execução (None enquanto roda)
    pub finished_at: Option<DateTime<Utc>>,
    /// Rodadas completadas
    pub rounds_completed: u32,
    /// Queries enviadas ao provedor
    pub queries_issued: u64,
    /// Queries que falharam em todas as tentativas
    pub queries_failed: u64,
    /// Texto das queries que falharam
    pub failed_queries: Vec<String>,
    /// URLs sem estatísticas históricas (falha ou vazio)
    pub urls_without_stats: Vec<String>,
    /// Candidatos na entrada de cada rodada
    pub candidates_per_round: Vec<usize>,
    /// Tempos por etapa
    pub timings: StageTimings,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Cria estatísticas de uma nova execução
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            rounds_completed: 0,
            queries_issued: 0,
            queries_failed: 0,
            failed_queries: Vec::new(),
            urls_without_stats: Vec::new(),
            candidates_per_round: Vec::new(),
            timings: StageTimings::new(),
        }
    }

    /// Registra uma query enviada
    pub fn record_query(&mut self, success: bool) {
        self.queries_issued += 1;
        if !success {
            self.queries_failed += 1;
        }
    }

    /// Taxa de falha (0.0 - 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.queries_issued > 0 {
            self.queries_failed as f64 / self.queries_issued as f64
        } else {
            0.0
        }
    }

    /// Marca o fim da execução
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Duração total em ms (até agora, se ainda rodando)
    pub fn duration_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }

    /// Formata um resumo
    pub fn summary(&self) -> String {
        format!(
            "Run {}:\n\
             - Rodadas: {}\n\
             - Queries: {} enviadas, {} falharam ({:.1}%)\n\
             - URLs sem estatísticas: {}\n\
             - Candidatos por rodada: {:?}\n\
             - Duração: {}ms",
            self.run_id,
            self.rounds_completed,
            self.queries_issued,
            self.queries_failed,
            self.failure_rate() * 100.0,
            self.urls_without_stats.len(),
            self.candidates_per_round,
            self.duration_ms()
        )
    }
}
