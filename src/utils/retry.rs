// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RETRY LIMITADO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Combinador genérico: repete uma operação assíncrona até `max_attempts`
// vezes e devolve o último erro. Erros não repetíveis encerram na hora.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Política de repetição
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Tentativas totais (mínimo efetivo: 1)
    pub max_attempts: u32,
    /// Espera base entre tentativas, multiplicada pelo número da tentativa
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Cria política
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Tentativas efetivas
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn backoff(&self, attempt: u32) -> Option<Duration> {
        if self.backoff_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.backoff_ms * attempt as u64))
        }
    }
}

/// Executa `operation` com repetição limitada
///
/// A closure recebe o número da tentativa (começando em 1). Devolve o
/// primeiro sucesso ou o último erro.
pub async fn retry<T, E, F, Fut, P>(policy: RetryPolicy, is_retryable: P, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                log::warn!("🔁 Tentativa {}/{} falhou: {}", attempt, attempts, e);
                if let Some(delay) = policy.backoff(attempt) {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_returns_last_error_after_all_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = tokio_test::block_on(retry(
            RetryPolicy::default(),
            |_| true,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("falha {}", attempt)) }
            },
        ));

        assert_eq!(result, Err("falha 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);

        let result = tokio_test::block_on(retry(
            RetryPolicy::new(3, 0),
            |_: &String| true,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("instável".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            },
        ));

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = tokio_test::block_on(retry(
            RetryPolicy::new(5, 0),
            |e: &String| e != "fatal",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            },
        ));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0, 0).attempts(), 1);
    }

    #[tokio::test]
    async fn test_backoff_waits_between_attempts() {
        let start = std::time::Instant::now();
        let _: Result<(), String> = retry(RetryPolicy::new(2, 5), |_| true, |_| async {
            Err("x".to_string())
        })
        .await;

        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
