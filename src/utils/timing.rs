// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIMING UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Medição de tempo das etapas do pipeline.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Timer para medir duração de uma etapa
pub struct StageTimer {
    start: Instant,
    stage: String,
}

impl StageTimer {
    /// Inicia um novo timer para uma etapa
    pub fn start(stage: &str) -> Self {
        Self {
            start: Instant::now(),
            stage: stage.to_string(),
        }
    }

    /// Retorna o tempo decorrido em milissegundos
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Retorna o tempo decorrido como Duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Para o timer, loga e registra o tempo nas estatísticas
    pub fn stop_into(self, timings: &mut StageTimings) -> u128 {
        let elapsed = self.elapsed_ms();
        log::info!("⏱️  {} completado em {}ms", self.stage, elapsed);
        timings.record(&self.stage, elapsed);
        elapsed
    }

    /// Para o timer e retorna o tempo sem logar
    pub fn stop(self) -> u128 {
        self.elapsed_ms()
    }
}

/// Tempo de uma etapa
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub ms: u128,
}

/// Tempos agregados por etapa, na ordem de execução
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    entries: Vec<StageTiming>,
}

impl StageTimings {
    /// Cria coleção vazia
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra o tempo de uma etapa
    pub fn record(&mut self, stage: &str, ms: u128) {
        self.entries.push(StageTiming {
            stage: stage.to_string(),
            ms,
        });
    }

    /// Entradas registradas
    pub fn entries(&self) -> &[StageTiming] {
        &self.entries
    }

    /// Tempo total de uma etapa (somando repetições)
    pub fn total_for(&self, stage: &str) -> u128 {
        self.entries
            .iter()
            .filter(|entry| entry.stage == stage)
            .map(|entry| entry.ms)
            .sum()
    }

    /// Tempo total
    pub fn total_time(&self) -> u128 {
        self.entries.iter().map(|entry| entry.ms).sum()
    }

    /// Formata um resumo
    pub fn summary(&self) -> String {
        let mut lines = vec!["Timing Stats:".to_string()];
        for entry in &self.entries {
            lines.push(format!("- {}: {}ms", entry.stage, entry.ms));
        }
        lines.push(format!("- Total: {}ms", self.total_time()));
        lines.join("\n")
    }
}
