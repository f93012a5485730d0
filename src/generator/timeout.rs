//! Deadline wrapper for any generator

use super::types::{GenerationRequest, Generation, GeneratorError, TextGenerator};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Wrapper that bounds every generation by a deadline
pub struct TimeoutGenerator<T: TextGenerator> {
    inner: T,
    deadline: Duration,
}

impl<T: TextGenerator> TimeoutGenerator<T> {
    pub fn new(inner: T, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

#[async_trait]
impl<T: TextGenerator> TextGenerator for TimeoutGenerator<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
        let start = Instant::now();

        match tokio::time::timeout(self.deadline, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    generator = %self.inner.name(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Generation exceeded deadline"
                );
                Err(GeneratorError::timeout(start.elapsed()))
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }
}

/// Wrap a generator with a deadline
pub fn with_timeout<T: TextGenerator>(generator: T, deadline: Duration) -> TimeoutGenerator<T> {
    TimeoutGenerator::new(generator, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGenerator {
        delay: Duration,
    }

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
            tokio::time::sleep(self.delay).await;
            Ok(Generation::new(request.prompt.clone()))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_fast_generation_passes_through() {
        let generator = with_timeout(
            SlowGenerator {
                delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        );

        let generation = generator
            .generate(&GenerationRequest::new("hi", "m", 0.7))
            .await
            .unwrap();
        assert_eq!(generation.text, "hi");
        assert_eq!(generator.name(), "slow");
    }

    #[tokio::test]
    async fn test_slow_generation_times_out() {
        let generator = with_timeout(
            SlowGenerator {
                delay: Duration::from_secs(10),
            },
            Duration::from_millis(50),
        );

        let result = generator
            .generate(&GenerationRequest::new("hi", "m", 0.7))
            .await;
        assert!(matches!(result, Err(GeneratorError::Timeout { .. })));
    }
}
