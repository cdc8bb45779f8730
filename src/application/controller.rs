// ============================================================
// Layer 2 — Interaction Controller
// ============================================================
// Owns the request lifecycle for ONE passage:
//
//   UI thread                         worker thread
//   ─────────                         ─────────────
//   submit_question(text)
//     normalise, generation += 1
//     slot.pending = job  ──────────▶ take job, mark running
//                                     engine.answer_cancellable()
//   pump()            ◀── mpsc ────── Finished { generation, .. }
//     stale generation → dropped
//     current          → presenter
//
// The slot holds at most ONE queued job. Submitting while a job
// is queued replaces it, so the replaced question never reaches
// the engine. A job that is already running either finishes and
// is discarded by the generation check (InFlightPolicy::Finish),
// or has its cancel flag raised (InFlightPolicy::Abandon).
//
// The worker owns the engine for its whole life: load() when
// the thread starts, unload() when it stops.
//
// Reference: Rust Book §16 (Fearless Concurrency)
//            parking_lot documentation (Mutex + Condvar)

use anyhow::{Context, Result};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::{mpsc, Arc},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crate::application::question::normalize_question;
use crate::application::session::SessionState;
use crate::domain::answer::{AnswerCandidate, AnswerSet, Highlight, QueryRequest};
use crate::domain::errors::{EmptyQuestion, EngineError};
use crate::domain::traits::{AnswerEngine, CancelFlag};

// ─── Configuration ────────────────────────────────────────────────────────────
/// What happens to a running query when a newer one is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InFlightPolicy {
    /// Let it run to completion; its result is dropped as stale.
    #[default]
    Finish,
    /// Raise its cancel flag so a cancellable engine stops early.
    Abandon,
}

#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    pub policy: InFlightPolicy,
}

// ─── Presentation boundary ────────────────────────────────────────────────────
/// The top answer of the latest request, ready to display.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub question:  String,
    pub candidate: AnswerCandidate,
    /// Where the answer text first occurs in the passage, if it does
    pub highlight: Option<Highlight>,
    /// Time spent inside the engine
    pub elapsed:   Duration,
}

/// Callbacks into whatever displays the passage. Always invoked
/// on the thread that calls `submit_question` / `pump`.
pub trait Presenter {
    /// Replace the text in the question input.
    fn set_question_text(&mut self, text: &str);

    /// A question was dispatched and its answer is on the way.
    fn looking_up(&mut self, _question: &str) {}

    /// Result of the latest request. `None` dismisses the
    /// "looking up" state without showing an answer.
    fn on_answer_ready(&mut self, presentation: Option<&Presentation>);

    /// The engine failed to load. Reported at most once.
    fn on_engine_unavailable(&mut self, error: &EngineError) {
        tracing::warn!("{error}");
    }
}

/// Outcome of `submit_question`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Rejected(EmptyQuestion),
    Dispatched { generation: u64, question: String },
}

// ─── Worker plumbing ──────────────────────────────────────────────────────────
struct Job {
    generation: u64,
    request:    QueryRequest,
    cancel:     CancelFlag,
}

#[derive(Default)]
struct SlotState {
    pending:  Option<Job>,
    running:  Option<CancelFlag>,
    shutdown: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

enum WorkerEvent {
    Unavailable(EngineError),
    Finished {
        generation: u64,
        question:   String,
        outcome:    Result<AnswerSet, EngineError>,
        elapsed:    Duration,
    },
}

// ─── QaController ─────────────────────────────────────────────────────────────
pub struct QaController {
    content:      Arc<str>,
    config:       ControllerConfig,
    slot:         Arc<Slot>,
    events:       mpsc::Receiver<WorkerEvent>,
    worker:       Option<JoinHandle<()>>,
    state:        SessionState,
    generation:   u64,
    reported:     bool,
    disconnected: bool,
}

impl QaController {
    /// Start the worker thread; it loads `engine` immediately.
    pub fn new(
        engine:  Box<dyn AnswerEngine>,
        content: impl Into<Arc<str>>,
        config:  ControllerConfig,
    ) -> Result<Self> {
        let slot = Arc::new(Slot::default());
        let (tx, events) = mpsc::channel();

        let worker_slot = Arc::clone(&slot);
        let worker = std::thread::Builder::new()
            .name(format!("qa-{}", engine.name()))
            .spawn(move || run_worker(engine, worker_slot, tx))
            .context("Cannot start the answer worker thread")?;

        Ok(Self {
            content: content.into(),
            config,
            slot,
            events,
            worker: Some(worker),
            state: SessionState::default(),
            generation: 0,
            reported: false,
            disconnected: false,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn should_clear_input(&self) -> bool {
        self.state.should_clear_input()
    }

    /// Normalise `text` and queue it, replacing any queued question.
    pub fn submit_question(&mut self, text: &str, presenter: &mut dyn Presenter) -> Submission {
        let question = match normalize_question(text) {
            Ok(q) => q,
            Err(e) => {
                presenter.set_question_text("");
                tracing::debug!("Rejected blank submission");
                return Submission::Rejected(e);
            }
        };

        presenter.set_question_text(&question);
        self.generation += 1;
        let generation = self.generation;
        self.state.begin(generation);
        presenter.looking_up(&question);

        let job = Job {
            generation,
            request: QueryRequest::new(Arc::clone(&self.content), question.clone()),
            cancel:  CancelFlag::new(),
        };
        {
            let mut slot = self.slot.state.lock();
            if let Some(replaced) = slot.pending.replace(job) {
                tracing::debug!(
                    "Discarded queued question #{} '{}'",
                    replaced.generation,
                    replaced.request.question_text
                );
            }
            if self.config.policy == InFlightPolicy::Abandon {
                if let Some(running) = &slot.running {
                    tracing::debug!("Abandoning the running question");
                    running.cancel();
                }
            }
        }
        self.slot.ready.notify_one();

        tracing::debug!("Dispatched question #{generation} '{question}'");
        Submission::Dispatched { generation, question }
    }

    /// Apply worker results on this thread. Waits up to `timeout`
    /// for the first event, then drains whatever else is ready.
    /// Returns the number of events handled.
    pub fn pump(&mut self, presenter: &mut dyn Presenter, timeout: Duration) -> usize {
        let first = match self.events.recv_timeout(timeout) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => return 0,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.mark_disconnected();
                return 0;
            }
        };

        let mut handled = 1;
        self.apply(first, presenter);
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    handled += 1;
                    self.apply(event, presenter);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.mark_disconnected();
                    break;
                }
            }
        }
        handled
    }

    /// Pump until the latest request is answered. `false` if
    /// `timeout` ran out or the worker is gone first.
    pub fn await_answer(&mut self, presenter: &mut dyn Presenter, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state.is_pending() {
            if self.disconnected {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.pump(presenter, remaining);
        }
        true
    }

    /// Stop the worker: queued work is dropped, the running query
    /// is allowed to finish (or cancelled under Abandon), then the
    /// engine is unloaded and the thread joined.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        {
            let mut slot = self.slot.state.lock();
            slot.shutdown = true;
            slot.pending  = None;
            if self.config.policy == InFlightPolicy::Abandon {
                if let Some(running) = &slot.running {
                    running.cancel();
                }
            }
        }
        self.slot.ready.notify_all();
        if worker.join().is_err() {
            tracing::warn!("Answer worker panicked");
        }
    }

    fn apply(&mut self, event: WorkerEvent, presenter: &mut dyn Presenter) {
        match event {
            WorkerEvent::Unavailable(error) => {
                if !self.reported {
                    self.reported = true;
                    presenter.on_engine_unavailable(&error);
                }
            }
            WorkerEvent::Finished { generation, question, outcome, elapsed } => {
                if !self.state.is_current(generation) {
                    tracing::debug!("Dropped stale result for question #{generation}");
                    return;
                }
                let set = match outcome {
                    Ok(set) => set,
                    Err(EngineError::Cancelled) => {
                        tracing::debug!("Question #{generation} was cancelled");
                        return;
                    }
                    Err(EngineError::Unavailable(reason)) => {
                        tracing::debug!("No answer for question #{generation}: {reason}");
                        AnswerSet::empty()
                    }
                    Err(error) => {
                        tracing::warn!("Question #{generation} failed: {error}");
                        AnswerSet::empty()
                    }
                };
                self.state.complete(generation);

                let presentation = set.top().map(|candidate| Presentation {
                    question,
                    candidate: candidate.clone(),
                    highlight: Highlight::locate(&self.content, &candidate.text),
                    elapsed,
                });
                presenter.on_answer_ready(presentation.as_ref());
            }
        }
    }

    fn mark_disconnected(&mut self) {
        if !self.disconnected {
            tracing::warn!("Answer worker stopped unexpectedly");
            self.disconnected = true;
        }
    }
}

impl Drop for QaController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(mut engine: Box<dyn AnswerEngine>, slot: Arc<Slot>, events: mpsc::Sender<WorkerEvent>) {
    let available = match engine.load() {
        Ok(()) => {
            tracing::info!("{} engine ready", engine.name());
            true
        }
        Err(error) => {
            tracing::warn!("{} engine failed to load: {error}", engine.name());
            let _ = events.send(WorkerEvent::Unavailable(error));
            false
        }
    };

    loop {
        let job = {
            let mut state = slot.state.lock();
            loop {
                if state.shutdown {
                    break None;
                }
                if let Some(job) = state.pending.take() {
                    state.running = Some(job.cancel.clone());
                    break Some(job);
                }
                slot.ready.wait(&mut state);
            }
        };
        let Some(job) = job else {
            break;
        };

        let started = Instant::now();
        let outcome = if available {
            engine.answer_cancellable(
                &job.request.passage_content,
                &job.request.question_text,
                &job.cancel,
            )
        } else {
            Err(EngineError::Unavailable(format!("{} engine is not loaded", engine.name())))
        };
        let elapsed = started.elapsed();
        slot.state.lock().running = None;

        let event = WorkerEvent::Finished {
            generation: job.generation,
            question:   job.request.question_text,
            outcome,
            elapsed,
        };
        if events.send(event).is_err() {
            break;
        }
    }

    engine.unload();
    tracing::info!("{} engine stopped", engine.name());
}
