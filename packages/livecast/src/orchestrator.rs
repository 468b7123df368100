//! Broadcast Orchestrator: one engine per broadcasting room.
//!
//! The engine owns the turn queue, the prefetch buffer and the comment
//! checkpoint of its room. A recurring tick and the playback driver's segment
//! signals kick two kinds of background work:
//!
//! - the fill loop, which keeps the prefetch buffer at its target depth by
//!   generating and synthesizing normal turns;
//! - the comment task, which polls for a comment batch and splices a fully
//!   synthesized response ahead of the pending normal audio.
//!
//! Each kind has its own lock, so at most one of each runs per room. Every
//! state change that follows an awaited call first checks that the room is
//! still broadcasting.
use crate::comment_bridge::CommentIntakeBridge;
use crate::config::EngineConfig;
use crate::cooldown::CooldownGate;
use crate::dialogue::DialogueClient;
use crate::events::{BroadcastEvent, EnginePhase, StatusBoard};
use crate::history::RollingHistory;
use crate::playback::{DriverSignal, PlaybackDriver, stopped};
use crate::prefetch_buffer::PrefetchBuffer;
use crate::speech::{RetryPolicy, SpeechClient};
use crate::turn_queue::{QueuedTurn, TurnQueue};
use livecast_domain::{
    AudioOutput, AudioSegment, CommentBatch, CommentStore, DialogueGenerator, DialogueRequest,
    GenerationError, MediaTransport, RoomId, SpeechSynthesizer, SynthesisError, TransportError,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::{Mutex as AsyncMutex, Notify, OwnedMutexGuard, mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument as _, debug, error, info, info_span, warn};

/// The external services one broadcast runs against.
pub struct Collaborators {
    pub generator: Arc<dyn DialogueGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub store: Arc<dyn CommentStore>,
    pub transport: Arc<dyn MediaTransport>,
    pub output: Box<dyn AudioOutput>,
}

/// One room's engine, ready to run.
pub struct BroadcastEngine {
    room: RoomId,
    config: EngineConfig,
    collaborators: Collaborators,
    board: StatusBoard,
}

impl BroadcastEngine {
    pub fn new(
        room: RoomId,
        collaborators: Collaborators,
        config: EngineConfig,
        board: StatusBoard,
    ) -> Self {
        Self {
            room,
            config,
            collaborators,
            board,
        }
    }

    /// Drive the broadcast until `stop` flips to true, then tear it down.
    pub async fn run(self, stop: watch::Receiver<bool>) {
        let span = info_span!("broadcast", room = %self.room);
        self.run_inner(stop).instrument(span).await
    }

    async fn run_inner(self, mut stop: watch::Receiver<bool>) {
        let Self {
            room,
            config,
            collaborators,
            board,
        } = self;
        let Collaborators {
            generator,
            synthesizer,
            store,
            transport,
            output,
        } = collaborators;

        info!("broadcast starting");
        board.update(|s| s.phase = EnginePhase::Initializing);

        // Playback starts right away so the first segment plays as soon as it is ready.
        let buffer = Arc::new(PrefetchBuffer::new(config.buffer_target_depth));
        let (signal_tx, mut signals) = mpsc::unbounded_channel();
        let device_rate = match output.sample_rate() {
            0 => config.output_sample_rate,
            rate => rate,
        };
        let driver = PlaybackDriver::new(
            room.clone(),
            output,
            transport.clone(),
            buffer.clone(),
            board.clone(),
            signal_tx,
            stop.clone(),
        );
        let mut driver = tokio::spawn(driver.run().in_current_span());
        let mut driver_done = false;

        let setup = async {
            let topic = store
                .room_topic_prompt(&room)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "room topic unavailable; using the default topic");
                    None
                });
            let bridge = CommentIntakeBridge::open(
                store.clone(),
                room.clone(),
                config.comment_count_threshold,
                config.comment_interval,
            )
            .await;
            (topic, bridge)
        };
        let setup = tokio::select! {
            biased;
            _ = stopped(&mut stop) => None,
            setup = setup => Some(setup),
        };

        let mut tasks = JoinSet::new();
        if let Some((topic, bridge)) = setup {
            let cooldown = Arc::new(CooldownGate::new(config.cooldown));
            let engine = Arc::new(Engine {
                queue: Mutex::new(TurnQueue::new()),
                history: Mutex::new(RollingHistory::new(config.history_len)),
                speech: SpeechClient::new(
                    synthesizer,
                    cooldown.clone(),
                    device_rate,
                    RetryPolicy {
                        max_retries: config.synthesis_max_retries,
                        backoff: config.retry_backoff,
                        timeout: config.synthesis_timeout,
                    },
                ),
                dialogue: DialogueClient::new(generator, cooldown.clone(), config.generation_timeout),
                bridge: Arc::new(AsyncMutex::new(bridge)),
                fill_lock: Arc::new(AsyncMutex::new(())),
                broadcasting: AtomicBool::new(true),
                handling_comments: AtomicBool::new(false),
                next_comment_index: AtomicI64::new(-1),
                cooldown,
                buffer,
                transport,
                topic,
                board: board.clone(),
                refill: Notify::new(),
                config,
            });

            engine.kick_fill(&mut tasks);
            board.update(|s| s.phase = EnginePhase::Running);
            driver_done = engine
                .run_loop(&mut stop, &mut signals, &mut tasks, &mut driver)
                .await;
            engine.broadcasting.store(false, Ordering::SeqCst);
        }

        // In-flight generation and synthesis results are dropped unused.
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        if !driver_done {
            log_driver_exit(driver.await);
        }
        board.update(|s| {
            s.phase = EnginePhase::Stopped;
            s.cooldown_remaining = None;
        });
        board.emit(BroadcastEvent::Stopped { room });
        info!("broadcast stopped");
    }
}

struct Engine {
    config: EngineConfig,
    queue: Mutex<TurnQueue>,
    buffer: Arc<PrefetchBuffer>,
    history: Mutex<RollingHistory>,
    cooldown: Arc<CooldownGate>,
    speech: SpeechClient,
    dialogue: DialogueClient,
    bridge: Arc<AsyncMutex<CommentIntakeBridge>>,
    fill_lock: Arc<AsyncMutex<()>>,
    transport: Arc<dyn MediaTransport>,
    topic: Option<String>,
    broadcasting: AtomicBool,
    handling_comments: AtomicBool,
    next_comment_index: AtomicI64,
    board: StatusBoard,
    /// Signalled when the fill loop should run outside the tick.
    refill: Notify,
}

impl Engine {
    /// Returns whether the broadcast ended because the playback driver exited.
    async fn run_loop(
        self: &Arc<Self>,
        stop: &mut watch::Receiver<bool>,
        signals: &mut mpsc::UnboundedReceiver<DriverSignal>,
        tasks: &mut JoinSet<()>,
        driver: &mut JoinHandle<Result<(), TransportError>>,
    ) -> bool {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = stopped(stop) => return false,
                exit = &mut *driver => {
                    error!("playback driver exited; ending the broadcast");
                    log_driver_exit(exit);
                    return true;
                }
                Some(signal) = signals.recv() => self.on_driver_signal(signal, tasks),
                _ = self.refill.notified() => self.kick_fill(tasks),
                _ = ticker.tick() => self.on_tick(tasks),
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "engine task panicked");
                        }
                    }
                }
            }
        }
    }

    fn is_broadcasting(&self) -> bool {
        self.broadcasting.load(Ordering::SeqCst)
    }

    /// A pop from the buffer leaves room to prefetch while the segment plays.
    fn on_driver_signal(self: &Arc<Self>, signal: DriverSignal, tasks: &mut JoinSet<()>) {
        if let DriverSignal::SegmentFinished(index) = signal {
            debug!(turn = index, "segment finished");
        }
        self.refresh_counts();
        self.kick_fill(tasks);
    }

    fn on_tick(self: &Arc<Self>, tasks: &mut JoinSet<()>) {
        if self.cooldown.take_expired() {
            info!("cooldown over; resuming outbound calls");
            self.board.update(|s| s.cooldown_remaining = None);
            self.board.emit(BroadcastEvent::Resumed);
        }
        let listeners = self.transport.participant_count();
        self.board.update(|s| s.listener_count = listeners);
        if let Some(remaining) = self.cooldown.remaining() {
            self.board.update(|s| s.cooldown_remaining = Some(remaining));
            return;
        }

        self.kick_fill(tasks);
        self.kick_comments(tasks);
    }

    /// Start the fill loop unless one is already running.
    fn kick_fill(self: &Arc<Self>, tasks: &mut JoinSet<()>) {
        if self.handling_comments.load(Ordering::SeqCst) || self.buffer.is_full() {
            return;
        }
        let Ok(guard) = self.fill_lock.clone().try_lock_owned() else {
            return;
        };
        let engine = self.clone();
        tasks.spawn(async move { engine.fill(guard).await }.in_current_span());
    }

    /// Start a comment poll unless a batch is already being handled.
    fn kick_comments(self: &Arc<Self>, tasks: &mut JoinSet<()>) {
        let Ok(bridge) = self.bridge.clone().try_lock_owned() else {
            return;
        };
        let engine = self.clone();
        tasks.spawn(async move { engine.handle_comments(bridge).await }.in_current_span());
    }

    /// Generate and synthesize normal turns until the buffer is at depth.
    async fn fill(self: Arc<Self>, _guard: OwnedMutexGuard<()>) {
        loop {
            if !self.is_broadcasting()
                || self.handling_comments.load(Ordering::SeqCst)
                || self.cooldown.is_active()
                || self.buffer.is_full()
            {
                break;
            }

            let next = self.queue.lock().next();
            let Some(queued) = next else {
                if self.extend_queue().await {
                    continue;
                }
                break;
            };
            self.refresh_counts();

            match self.speech.synthesize(&queued.turn, queued.index).await {
                Ok(segment) => {
                    if !self.is_broadcasting() {
                        break;
                    }
                    self.history.lock().record(queued.index, &queued.turn);
                    if let Err(segment) = self.buffer.try_push(segment) {
                        self.queue.lock().requeue([requeued(segment)]);
                        break;
                    }
                    self.refresh_counts();
                }
                Err(SynthesisError::NoAudioProduced) => {
                    warn!(turn = queued.index, "no audio produced; skipping turn");
                    self.skip(queued.index, SynthesisError::NoAudioProduced);
                }
                Err(e) if e.is_rate_limited() => {
                    if self.is_broadcasting() {
                        self.queue.lock().requeue([queued]);
                        self.announce_cooldown();
                    }
                    break;
                }
                Err(e) => {
                    warn!(turn = queued.index, error = %e, "synthesis failed; skipping turn");
                    self.skip(queued.index, e);
                    // Retried on the next tick.
                    break;
                }
            }
        }
        self.refresh_counts();
    }

    /// Ask the generator for the next stretch of the show. Returns whether
    /// turns were added.
    async fn extend_queue(&self) -> bool {
        let request = DialogueRequest::continuation(
            self.config.generation_batch_size,
            self.history.lock().prior_context(),
            self.topic.clone(),
        );
        match self.dialogue.try_generate(&request).await {
            Ok(turns) => {
                if !self.is_broadcasting() || self.handling_comments.load(Ordering::SeqCst) {
                    // Keep the turns; they play after the comment response.
                    self.queue.lock().append(turns);
                    return false;
                }
                debug!(turns = turns.len(), "dialogue batch queued");
                self.queue.lock().append(turns);
                self.refresh_counts();
                true
            }
            Err(GenerationError::Busy) => false,
            Err(e) if e.is_rate_limited() => {
                self.announce_cooldown();
                false
            }
            Err(e) => {
                warn!(error = %e, "dialogue generation failed; retrying next tick");
                false
            }
        }
    }

    async fn handle_comments(self: Arc<Self>, mut bridge: OwnedMutexGuard<CommentIntakeBridge>) {
        let batch = match bridge.poll().await {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "comment poll failed");
                return;
            }
        };
        if !self.is_broadcasting() {
            bridge.release(batch);
            return;
        }

        self.handling_comments.store(true, Ordering::SeqCst);
        self.board.update(|s| s.phase = EnginePhase::HandlingComments);
        self.board.emit(BroadcastEvent::CommentsDetected { count: batch.len() });

        if let Err(reason) = self.respond_to(&mut bridge, batch).await {
            warn!(%reason, "comment response discarded");
            self.board.emit(BroadcastEvent::CommentResponseDiscarded { reason });
        }

        self.handling_comments.store(false, Ordering::SeqCst);
        if self.is_broadcasting() {
            self.board.update(|s| s.phase = EnginePhase::Running);
            self.refill.notify_one();
        }
    }

    /// Generate, acknowledge, synthesize and splice the response to `batch`.
    /// Nothing reaches the buffer unless every turn synthesized.
    async fn respond_to(
        &self,
        bridge: &mut CommentIntakeBridge,
        batch: CommentBatch,
    ) -> Result<(), String> {
        let request = DialogueRequest::comment_response(
            self.config.comment_response_turns,
            self.history.lock().prior_context(),
            batch.comments.clone(),
            self.topic.clone(),
        );
        let turns = match self.dialogue.generate(&request).await {
            Ok(turns) => turns,
            Err(e) => {
                bridge.release(batch);
                if e.is_rate_limited() {
                    self.announce_cooldown();
                }
                return Err(e.to_string());
            }
        };
        if !self.is_broadcasting() {
            bridge.release(batch);
            return Ok(());
        }

        if let Err(e) = bridge.acknowledge(&batch).await {
            warn!(error = %e, "comment checkpoint write failed; continuing");
            self.board.emit(BroadcastEvent::CheckpointWriteFailed {
                reason: e.to_string(),
            });
        }

        let mut segments = Vec::with_capacity(turns.len());
        for turn in &turns {
            let index = self.next_comment_index.fetch_sub(1, Ordering::SeqCst);
            match self.speech.synthesize(turn, index).await {
                Ok(segment) => segments.push(segment),
                Err(e) => {
                    if e.is_rate_limited() {
                        self.announce_cooldown();
                    }
                    return Err(e.to_string());
                }
            }
            if !self.is_broadcasting() {
                return Ok(());
            }
        }

        // Wait out any fill loop so the splice sees a settled buffer and queue.
        let _fill = self.fill_lock.lock().await;
        if !self.is_broadcasting() {
            return Ok(());
        }
        {
            let mut history = self.history.lock();
            for segment in &segments {
                history.record(segment.source_turn_index, &segment.turn);
            }
        }
        let response_turns = segments.len();
        let discarded = self.buffer.replace_pending(segments);
        let requeued_turns = discarded.len();
        self.queue
            .lock()
            .requeue(discarded.into_iter().map(requeued));
        self.refresh_counts();

        info!(
            comments = batch.len(),
            turns = response_turns,
            requeued_turns,
            "comment response spliced"
        );
        self.board.emit(BroadcastEvent::CommentsAddressed {
            comments: batch.len(),
            turns: response_turns,
            requeued_turns,
        });
        Ok(())
    }

    fn skip(&self, index: i64, reason: SynthesisError) {
        self.board.emit(BroadcastEvent::TurnSkipped {
            source_turn_index: index,
            reason: reason.to_string(),
        });
    }

    fn announce_cooldown(&self) {
        if let Some(remaining) = self.cooldown.remaining() {
            info!(?remaining, "rate limited; pausing outbound calls");
            self.board.update(|s| s.cooldown_remaining = Some(remaining));
            self.board.emit(BroadcastEvent::CoolingDown { remaining });
        }
    }

    fn refresh_counts(&self) {
        let queued = self.queue.lock().remaining();
        let buffered = self.buffer.len();
        self.board.update(|s| {
            s.queued_turns = queued;
            s.buffered_segments = buffered;
        });
    }
}

fn log_driver_exit(exit: Result<Result<(), TransportError>, JoinError>) {
    match exit {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "audio output unavailable"),
        Err(e) => error!(error = %e, "playback driver panicked"),
    }
}

/// The turn behind a discarded segment, back in queue form.
fn requeued(segment: AudioSegment) -> QueuedTurn {
    QueuedTurn {
        index: segment.source_turn_index,
        turn: segment.turn,
    }
}
