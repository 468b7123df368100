//! Dialogue Generation Client: at most one generation call per room at a time.
use crate::cooldown::CooldownGate;
use livecast_domain::{DialogueGenerator, DialogueRequest, DialogueTurn, GenerationError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct DialogueClient {
    generator: Arc<dyn DialogueGenerator>,
    cooldown: Arc<CooldownGate>,
    in_flight: Arc<Mutex<()>>,
    timeout: Duration,
}

impl DialogueClient {
    pub fn new(
        generator: Arc<dyn DialogueGenerator>,
        cooldown: Arc<CooldownGate>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            cooldown,
            in_flight: Arc::new(Mutex::new(())),
            timeout,
        }
    }

    /// Generate unless another call is already running, in which case
    /// `GenerationError::Busy` is returned immediately.
    pub async fn try_generate(
        &self,
        request: &DialogueRequest,
    ) -> Result<Vec<DialogueTurn>, GenerationError> {
        let _guard = self.in_flight.try_lock().map_err(|_| GenerationError::Busy)?;
        self.call(request).await
    }

    /// Generate, queueing behind any call already in flight.
    pub async fn generate(
        &self,
        request: &DialogueRequest,
    ) -> Result<Vec<DialogueTurn>, GenerationError> {
        let _guard = self.in_flight.lock().await;
        self.call(request).await
    }

    async fn call(&self, request: &DialogueRequest) -> Result<Vec<DialogueTurn>, GenerationError> {
        if let Some(remaining) = self.cooldown.remaining() {
            return Err(GenerationError::RateLimited {
                retry_after: Some(remaining),
            });
        }

        let result = tokio::time::timeout(self.timeout, self.generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout)
            .and_then(|r| r);

        match result {
            Ok(turns) if turns.is_empty() => Err(GenerationError::MalformedOutput(
                "generator returned no turns".to_string(),
            )),
            Ok(turns) => {
                debug!(
                    turns = turns.len(),
                    comment_response = request.is_comment_response,
                    "dialogue generated"
                );
                Ok(turns)
            }
            Err(e) => {
                if e.is_rate_limited() {
                    let pause = self.cooldown.trip(e.retry_after());
                    warn!(?pause, "dialogue generator rate limited");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use livecast_domain::{HostLineup, SpeakerSlot};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Slow {
        delay: Duration,
        calls: AtomicUsize,
        reply: Result<usize, GenerationError>,
    }

    #[async_trait]
    impl DialogueGenerator for Slow {
        async fn generate(
            &self,
            request: &DialogueRequest,
        ) -> Result<Vec<DialogueTurn>, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let hosts = HostLineup::default();
            let count = self.reply.clone()?.min(request.turn_count);
            Ok((0..count)
                .map(|i| {
                    let slot = SpeakerSlot::for_position(i);
                    DialogueTurn::spoken_by(slot, hosts.host(slot), format!("line {i}"))
                })
                .collect())
        }
    }

    fn client(reply: Result<usize, GenerationError>, delay: Duration) -> (DialogueClient, Arc<Slow>) {
        let generator = Arc::new(Slow {
            delay,
            calls: AtomicUsize::new(0),
            reply,
        });
        let gate = Arc::new(CooldownGate::new(Duration::from_secs(30)));
        (
            DialogueClient::new(generator.clone(), gate, Duration::from_secs(10)),
            generator,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fill_calls_are_rejected() {
        let (dialogue, generator) = client(Ok(6), Duration::from_secs(1));
        let request = DialogueRequest::continuation(3, None, None);

        let (first, second) = tokio::join!(
            dialogue.try_generate(&request),
            dialogue.try_generate(&request)
        );
        assert_eq!(first.unwrap().len(), 3);
        assert_eq!(second.unwrap_err(), GenerationError::Busy);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_calls_run_one_after_another() {
        let (dialogue, generator) = client(Ok(2), Duration::from_secs(1));
        let request = DialogueRequest::continuation(2, None, None);
        let started = tokio::time::Instant::now();

        let (a, b) = tokio::join!(dialogue.generate(&request), dialogue.generate(&request));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out() {
        let (dialogue, _) = client(Ok(2), Duration::from_secs(60));
        let err = dialogue
            .generate(&DialogueRequest::continuation(2, None, None))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_blocks_later_calls() {
        let (dialogue, generator) = client(
            Err(GenerationError::RateLimited { retry_after: None }),
            Duration::ZERO,
        );
        let request = DialogueRequest::continuation(2, None, None);
        assert!(dialogue.generate(&request).await.unwrap_err().is_rate_limited());
        assert!(dialogue.generate(&request).await.unwrap_err().is_rate_limited());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let _ = dialogue.generate(&request).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_output_is_malformed() {
        let (dialogue, _) = client(Ok(0), Duration::ZERO);
        let err = dialogue
            .generate(&DialogueRequest::continuation(2, None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedOutput(_)));
    }
}
