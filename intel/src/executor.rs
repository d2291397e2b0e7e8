//! Resilient request executor.
//!
//! Runs one [`GenerationRequest`] against a [`TextGenerator`], absorbing
//! rate-limit failures with a fixed backoff for up to `max_attempts` calls.
//! Any other failure ends the request immediately.
//!
//! ```text
//! Idle -> Attempting(1) -> Succeeded
//!                       -> Failed
//!                       -> Backoff(1) -> Attempting(2) -> ... -> Exhausted
//! ```

use crate::analyzer::TextGenerator;
use crate::config::Config;
use crate::error::GenerationError;
use crate::prompt::GenerationRequest;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_attempts, Duration::from_secs(config.retry_delay_secs))
    }

    /// A cap of zero still allows the initial call.
    fn attempt_cap(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Result of a single call to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success(String),
    RateLimited(u32),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Attempting(u32),
    Backoff(u32),
    Succeeded { attempts: u32, text: String },
    Exhausted { attempts: u32 },
    Failed { attempts: u32, message: String },
}

/// Emitted before each backoff sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryNotice {
    /// The attempt that was rate limited (1-based).
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
}

/// Raw text plus how many calls it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub text: String,
    pub attempts: u32,
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock backoff via the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct ResilientExecutor<G, S = TokioSleeper> {
    generator: G,
    sleeper: S,
    policy: RetryPolicy,
}

impl<G: TextGenerator> ResilientExecutor<G, TokioSleeper> {
    pub fn new(generator: G, policy: RetryPolicy) -> Self {
        Self::with_sleeper(generator, policy, TokioSleeper)
    }
}

impl<G: TextGenerator, S: Sleeper> ResilientExecutor<G, S> {
    pub fn with_sleeper(generator: G, policy: RetryPolicy, sleeper: S) -> Self {
        Self { generator, sleeper, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn attempt(&self, request: &GenerationRequest, attempt: u32) -> GenerationOutcome {
        match self.generator.generate(request.prompt_text()).await {
            Ok(text) => GenerationOutcome::Success(text),
            Err(GenerationError::RateLimited(msg)) => {
                warn!("Attempt {attempt}: rate limited ({msg})");
                GenerationOutcome::RateLimited(attempt)
            }
            Err(e) => GenerationOutcome::Failed(e.to_string()),
        }
    }

    /// Drive the request to a terminal state. `on_retry` is called once per
    /// backoff, before the sleep.
    pub async fn execute<F>(
        &self,
        request: &GenerationRequest,
        mut on_retry: F,
    ) -> Result<Execution, GenerationError>
    where
        F: FnMut(&RetryNotice) + Send,
    {
        let cap = self.policy.attempt_cap();
        let mut state = RequestState::Idle;

        loop {
            state = match state {
                RequestState::Idle => RequestState::Attempting(1),

                RequestState::Attempting(n) => match self.attempt(request, n).await {
                    GenerationOutcome::Success(text) => RequestState::Succeeded { attempts: n, text },
                    GenerationOutcome::RateLimited(n) if n < cap => RequestState::Backoff(n),
                    GenerationOutcome::RateLimited(n) => RequestState::Exhausted { attempts: n },
                    GenerationOutcome::Failed(message) => RequestState::Failed { attempts: n, message },
                },

                RequestState::Backoff(n) => {
                    let notice = RetryNotice {
                        attempt: n,
                        max_attempts: cap,
                        delay: self.policy.delay,
                    };
                    warn!(
                        "Retrying in {}s (attempt {}/{})",
                        notice.delay.as_secs(),
                        n + 1,
                        cap
                    );
                    on_retry(&notice);
                    self.sleeper.sleep(self.policy.delay).await;
                    RequestState::Attempting(n + 1)
                }

                RequestState::Succeeded { attempts, text } => {
                    info!("Generation succeeded after {attempts} attempt(s), {} chars", text.chars().count());
                    return Ok(Execution { text, attempts });
                }

                RequestState::Exhausted { attempts } => {
                    error!("Rate limit persisted through {attempts} attempt(s), giving up");
                    return Err(GenerationError::Exhausted { attempts });
                }

                RequestState::Failed { attempts, message } => {
                    error!("Generation failed on attempt {attempts}: {message}");
                    return Err(GenerationError::Other(message));
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replays scripted results; repeats the last one when the script runs out.
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<String, GenerationError>>>,
        last: Result<String, GenerationError>,
        calls: AtomicU32,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<String, GenerationError>>) -> Self {
            let last = script
                .last()
                .cloned()
                .unwrap_or_else(|| Err(GenerationError::Other("empty script".into())));
            Self {
                script: Mutex::new(script.into()),
                last,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.last.clone())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> Result<String, GenerationError> {
        Err(GenerationError::RateLimited("429 RESOURCE_EXHAUSTED".into()))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("prompt", ["[A]", "[B]"])
    }

    const DELAY: Duration = Duration::from_secs(30);

    fn executor(
        script: Vec<Result<String, GenerationError>>,
        max_attempts: u32,
    ) -> (
        ResilientExecutor<Arc<ScriptedGenerator>, RecordingSleeper>,
        Arc<ScriptedGenerator>,
        RecordingSleeper,
    ) {
        let generator = Arc::new(ScriptedGenerator::new(script));
        let sleeper = RecordingSleeper::default();
        let exec = ResilientExecutor::with_sleeper(
            generator.clone(),
            RetryPolicy::new(max_attempts, DELAY),
            sleeper.clone(),
        );
        (exec, generator, sleeper)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (exec, generator, sleeper) = executor(vec![Ok("report".into())], 3);
        let result = exec.execute(&request(), |_| {}).await.unwrap();
        assert_eq!(result, Execution { text: "report".into(), attempts: 1 });
        assert_eq!(generator.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_always_rate_limited_exhausts() {
        for n in 1..=5 {
            let (exec, generator, sleeper) = executor(vec![rate_limited()], n);
            let mut notices = Vec::new();
            let err = exec
                .execute(&request(), |notice| notices.push(*notice))
                .await
                .unwrap_err();
            assert_eq!(err, GenerationError::Exhausted { attempts: n });
            assert_eq!(generator.calls(), n);
            assert_eq!(sleeper.sleeps(), vec![DELAY; (n - 1) as usize]);
            assert_eq!(notices.len(), (n - 1) as usize);
        }
    }

    #[tokio::test]
    async fn test_recovers_on_third_attempt() {
        let (exec, generator, sleeper) =
            executor(vec![rate_limited(), rate_limited(), Ok("done".into())], 3);
        let mut notices = Vec::new();
        let result = exec
            .execute(&request(), |notice| notices.push(*notice))
            .await
            .unwrap();
        assert_eq!(result.text, "done");
        assert_eq!(result.attempts, 3);
        assert_eq!(generator.calls(), 3);
        assert_eq!(sleeper.sleeps(), vec![DELAY, DELAY]);
        assert_eq!(
            notices,
            vec![
                RetryNotice { attempt: 1, max_attempts: 3, delay: DELAY },
                RetryNotice { attempt: 2, max_attempts: 3, delay: DELAY },
            ]
        );
    }

    #[tokio::test]
    async fn test_other_error_is_fatal_regardless_of_cap() {
        for n in [1, 3, 10] {
            let (exec, generator, sleeper) =
                executor(vec![Err(GenerationError::Other("403 API key not valid".into()))], n);
            let err = exec.execute(&request(), |_| {}).await.unwrap_err();
            assert_eq!(err, GenerationError::Other("403 API key not valid".into()));
            assert_eq!(generator.calls(), 1);
            assert!(sleeper.sleeps().is_empty());
        }
    }

    #[tokio::test]
    async fn test_other_error_after_rate_limit_stops() {
        let (exec, generator, sleeper) = executor(
            vec![rate_limited(), Err(GenerationError::Other("network down".into())), Ok("x".into())],
            5,
        );
        let err = exec.execute(&request(), |_| {}).await.unwrap_err();
        assert_eq!(err, GenerationError::Other("network down".into()));
        assert_eq!(generator.calls(), 2);
        assert_eq!(sleeper.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_cap_still_makes_one_attempt() {
        let (exec, generator, sleeper) = executor(vec![rate_limited()], 0);
        let err = exec.execute(&request(), |_| {}).await.unwrap_err();
        assert_eq!(err, GenerationError::Exhausted { attempts: 1 });
        assert_eq!(generator.calls(), 1);
        assert!(sleeper.sleeps().is_empty());

        let (exec, _, _) = executor(vec![Ok("ok".into())], 0);
        assert_eq!(exec.execute(&request(), |_| {}).await.unwrap().attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_waits_full_delay() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(45)).await;
        assert!(start.elapsed() >= Duration::from_secs(45));
    }
}
