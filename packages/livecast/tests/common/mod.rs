//! Collaborator fakes for engine tests. All timing runs on tokio's paused clock.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use livecast::{BroadcastEvent, Collaborators, EngineConfig};
use livecast_domain::{
    AudioOutput, CommentStore, DialogueGenerator, DialogueRequest, DialogueTurn, GenerationError, HostLineup,
    LocalAudioSignal, MediaTransport, PcmAudio, RoomId, SpeakerSlot, SpeechSynthesizer,
    SynthesisError, TrackHandle, TransportError, VoiceId,
};
use livecast_supabase::MemoryStore;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

pub const DEVICE_RATE: u32 = 48_000;

/// Shared, ordered record of what every fake did.
#[derive(Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }
}

/// Plays back scripted batches, then endless filler.
pub struct ScriptedGenerator {
    hosts: HostLineup,
    batches: Mutex<VecDeque<Vec<String>>>,
    comment_replies: Vec<String>,
    requests: Mutex<Vec<(DialogueRequest, Instant)>>,
    filler: AtomicUsize,
    /// Failures keyed by 1-based call number, counting every call.
    failures: Mutex<HashMap<usize, GenerationError>>,
    comment_failures: AtomicUsize,
    /// Calls from this 1-based number on take `slow_by` before answering.
    slow_from: Mutex<Option<(usize, Duration)>>,
}

impl ScriptedGenerator {
    pub fn new(batches: Vec<Vec<String>>) -> Arc<Self> {
        Arc::new(Self {
            hosts: HostLineup::default(),
            batches: Mutex::new(batches.into_iter().collect()),
            comment_replies: vec![
                "Great question from the chat, let us dig in.".to_string(),
                "Thanks everyone for writing in, keep them coming.".to_string(),
            ],
            requests: Mutex::new(Vec::new()),
            filler: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
            comment_failures: AtomicUsize::new(0),
            slow_from: Mutex::new(None),
        })
    }

    pub fn fail_call(&self, call: usize, error: GenerationError) {
        self.failures.lock().insert(call, error);
    }

    /// The next `count` comment-response requests fail with `MalformedOutput`.
    pub fn fail_comment_responses(&self, count: usize) {
        self.comment_failures.store(count, Ordering::SeqCst);
    }

    pub fn slow_from_call(&self, call: usize, delay: Duration) {
        *self.slow_from.lock() = Some((call, delay));
    }

    pub fn requests(&self) -> Vec<DialogueRequest> {
        self.requests.lock().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.requests.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn comment_replies(&self) -> &[String] {
        &self.comment_replies
    }

    fn turns(&self, texts: Vec<String>) -> Vec<DialogueTurn> {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let slot = SpeakerSlot::for_position(i);
                DialogueTurn::spoken_by(slot, self.hosts.host(slot), text)
            })
            .collect()
    }
}

#[async_trait]
impl DialogueGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &DialogueRequest,
    ) -> Result<Vec<DialogueTurn>, GenerationError> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push((request.clone(), Instant::now()));
            requests.len()
        };
        let slow = *self.slow_from.lock();
        if let Some((from, delay)) = slow {
            if call >= from {
                tokio::time::sleep(delay).await;
            }
        }
        if let Some(error) = self.failures.lock().remove(&call) {
            return Err(error);
        }
        if request.is_comment_response {
            let failing = self
                .comment_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(GenerationError::MalformedOutput("not a turn list".into()));
            }
            return Ok(self.turns(self.comment_replies.clone()));
        }
        let scripted = self.batches.lock().pop_front();
        let texts = scripted.unwrap_or_else(|| {
            (0..request.turn_count)
                .map(|_| {
                    let n = self.filler.fetch_add(1, Ordering::SeqCst);
                    format!("Filler line number {n:03} keeps the show going.")
                })
                .collect()
        });
        Ok(self.turns(texts))
    }
}

/// Produces silence whose length is proportional to the text length.
pub struct ProportionalSynthesizer {
    per_char: Duration,
    latency: Duration,
    timeline: Timeline,
    calls: Mutex<Vec<(String, Instant)>>,
    /// 1-based call number that answers with a rate limit.
    rate_limit_on_call: Option<usize>,
    /// Calls whose text contains this fail with `NoAudioProduced`.
    fail_text: Option<String>,
}

impl ProportionalSynthesizer {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            per_char: Duration::from_millis(50),
            latency: Duration::from_millis(100),
            timeline,
            calls: Mutex::new(Vec::new()),
            rate_limit_on_call: None,
            fail_text: None,
        }
    }

    pub fn rate_limited_on_call(mut self, call: usize) -> Self {
        self.rate_limit_on_call = Some(call);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_text = Some(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|(t, _)| t == text).count()
    }
}

#[async_trait]
impl SpeechSynthesizer for ProportionalSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceId) -> Result<PcmAudio, SynthesisError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push((text.to_string(), Instant::now()));
            calls.len()
        };
        self.timeline.push(format!("synth:{text}"));
        tokio::time::sleep(self.latency).await;

        if self.rate_limit_on_call == Some(call) {
            return Err(SynthesisError::RateLimited { retry_after: None });
        }
        if self.fail_text.as_deref().is_some_and(|f| text.contains(f)) {
            return Err(SynthesisError::NoAudioProduced);
        }
        let frames = (self.per_char * text.chars().count() as u32).as_millis() as usize
            * (DEVICE_RATE as usize / 1000);
        Ok(PcmAudio::mono(vec![0; frames], DEVICE_RATE))
    }
}

/// Audio device that takes exactly as long as the audio to play it.
pub struct RecordingOutput {
    timeline: Timeline,
    played: Arc<AtomicUsize>,
}

impl RecordingOutput {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            played: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    fn sample_rate(&self) -> u32 {
        DEVICE_RATE
    }

    async fn open(&mut self) -> Result<LocalAudioSignal, TransportError> {
        self.timeline.push("open");
        Ok(LocalAudioSignal {
            name: "podcast-audio".into(),
            sample_rate: DEVICE_RATE,
            channels: 1,
        })
    }

    async fn play(&mut self, audio: &PcmAudio) -> Result<(), TransportError> {
        let n = self.played.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(audio.duration()).await;
        self.timeline.push(format!("played:{n}"));
        Ok(())
    }

    async fn close(&mut self) {
        self.timeline.push("close");
    }
}

pub struct RecordingTransport {
    timeline: Timeline,
    participants: AtomicUsize,
    published: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(timeline: Timeline, participants: usize) -> Self {
        Self {
            timeline,
            participants: AtomicUsize::new(participants),
            published: AtomicUsize::new(0),
        }
    }

    pub fn set_participants(&self, count: usize) {
        self.participants.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaTransport for RecordingTransport {
    async fn publish(&self, signal: &LocalAudioSignal) -> Result<TrackHandle, TransportError> {
        let n = self.published.fetch_add(1, Ordering::SeqCst);
        self.timeline.push(format!("publish:{}", signal.name));
        Ok(TrackHandle {
            sid: format!("TR_{n}"),
        })
    }

    async fn unpublish(&self, track: TrackHandle) -> Result<(), TransportError> {
        self.timeline.push(format!("unpublish:{}", track.sid));
        Ok(())
    }

    fn participant_count(&self) -> usize {
        self.participants.load(Ordering::SeqCst)
    }
}


/// A full set of fakes for one room.
pub struct Fixture {
    pub room: RoomId,
    pub timeline: Timeline,
    pub generator: Arc<ScriptedGenerator>,
    pub synthesizer: Arc<ProportionalSynthesizer>,
    pub store: MemoryStore,
    pub transport: Arc<RecordingTransport>,
}

impl Fixture {
    pub async fn new(batches: Vec<Vec<String>>) -> Self {
        Self::with_synthesizer(batches, ProportionalSynthesizer::new).await
    }

    pub async fn with_synthesizer(
        batches: Vec<Vec<String>>,
        synthesizer: impl FnOnce(Timeline) -> ProportionalSynthesizer,
    ) -> Self {
        let timeline = Timeline::default();
        let room = RoomId::from("room-1");
        let store = MemoryStore::new();
        store.create_room(&room, Some("Home espresso".into()));
        // Comments created from here on are unprocessed.
        store
            .advance_checkpoint(&room, Utc::now() - ChronoDuration::hours(1))
            .await
            .expect("seed checkpoint");

        Self {
            generator: ScriptedGenerator::new(batches),
            synthesizer: Arc::new(synthesizer(timeline.clone())),
            transport: Arc::new(RecordingTransport::new(timeline.clone(), 3)),
            store,
            room,
            timeline,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            generator: self.generator.clone(),
            synthesizer: self.synthesizer.clone(),
            store: Arc::new(self.store.clone()),
            transport: self.transport.clone(),
            output: Box::new(RecordingOutput::new(self.timeline.clone())),
        }
    }

    pub fn add_comment(&self, id: &str, text: &str) {
        self.store.add_comment(
            &self.room,
            livecast_domain::Comment::new(id, format!("listener-{id}"), text, Utc::now()),
        );
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        tick_interval: Duration::from_millis(500),
        buffer_target_depth: 3,
        generation_batch_size: 5,
        comment_response_turns: 2,
        cooldown: Duration::from_secs(30),
        retry_backoff: Duration::from_millis(100),
        ..EngineConfig::default()
    }
}

/// Next event, skipping any lag.
pub async fn next_event(events: &mut broadcast::Receiver<BroadcastEvent>) -> BroadcastEvent {
    loop {
        match events.recv().await {
            Ok(event) => return event,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
        }
    }
}

/// A line of `chars` characters, tagged so it can be told apart.
pub fn line(tag: &str, chars: usize) -> String {
    let mut text = format!("{tag} ");
    while text.len() < chars {
        text.push('x');
    }
    text
}
