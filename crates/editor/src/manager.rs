//! Open documents and their background analysis.
//!
//! Edits mutate the document synchronously; analysis runs later on the
//! blocking pool and is installed only if no newer edit arrived meanwhile.
//! Each document publishes its latest analysis through an [`ArcSwap`], so
//! readers always see one consistent generation without locking.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use quill_language::{Grammar, LanguageLoader};
use quill_primitives::{Document, DocumentId, EditError, EditEvent, Generation, LineSplice, Position};
use quill_syntax::lexer::{lex_document, relex};
use quill_syntax::{
	Cancelled, CompletionCandidate, HighlightSpan, LineCache, QualitySummary, SymbolIndex, complete, diagnostics,
};
use quill_worker::{GenerationToken, TaskClass, TaskCollector};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::EditorConfig;
use crate::payload::{AssistantContext, RunRequest, Selection};
use crate::scheduler::{AnalysisScheduler, AnalysisState, Disposition, Poll};

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("document {0} is not open")]
	UnknownDocument(DocumentId),

	#[error("document {0} is already open")]
	AlreadyOpen(DocumentId),

	#[error(transparent)]
	Edit(#[from] EditError),
}

/// Analysis results for one generation of a document.
///
/// `document` is the text the results were computed from, which may lag the
/// live document while an analysis is pending.
#[derive(Debug, Clone)]
pub struct Published {
	pub generation: Generation,
	pub document: Document,
	pub cache: LineCache,
	pub index: SymbolIndex,
}

/// Counts of what one [`AnalysisManager::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
	pub started: usize,
	pub published: usize,
	pub discarded: usize,
}

struct Session {
	/// Distinguishes a reopened document from the session it replaced.
	epoch: u64,
	document: Document,
	grammar: Arc<Grammar>,
	published: ArcSwap<Published>,
	scheduler: AnalysisScheduler,
	/// Line splice from the published lines to the live document, composed
	/// over every edit since the last publish.
	pending: Option<LineSplice>,
	inflight: Option<GenerationToken>,
	/// A job for this session is still held by the collector, possibly
	/// cancelled but not yet reaped.
	job_running: bool,
}

struct JobDone {
	doc_id: DocumentId,
	epoch: u64,
	generation: Generation,
	result: Result<Published, Cancelled>,
	elapsed: Duration,
}

/// Owns the open documents and drives their analysis.
pub struct AnalysisManager {
	loader: Arc<LanguageLoader>,
	debounce: Duration,
	max_candidates: usize,
	next_epoch: u64,
	sessions: FxHashMap<DocumentId, Session>,
	tasks: TaskCollector<JobDone>,
}

impl AnalysisManager {
	pub fn new(loader: Arc<LanguageLoader>, config: &EditorConfig) -> Self {
		Self {
			loader,
			debounce: config.analysis.debounce(),
			max_candidates: config.completion.max_candidates,
			next_epoch: 0,
			sessions: FxHashMap::default(),
			tasks: TaskCollector::new(),
		}
	}

	pub fn loader(&self) -> &Arc<LanguageLoader> {
		&self.loader
	}

	/// Opens a document and analyzes it synchronously.
	///
	/// An unknown `language` degrades to plain text; `None` detects the
	/// language from the text.
	pub fn open(&mut self, id: DocumentId, text: &str, language: Option<&str>) -> Result<Arc<Grammar>, SessionError> {
		if self.sessions.contains_key(&id) {
			return Err(SessionError::AlreadyOpen(id));
		}
		let grammar = match language {
			Some(tag) => self.loader.grammar_or_plain(tag),
			None => self.loader.detect_or_plain(text),
		};
		let document = Document::new(text);
		let cache = lex_document(&grammar, &document);
		let index = SymbolIndex::build(&grammar, &document, &cache);
		let published = Published {
			generation: document.generation(),
			document: document.clone(),
			cache,
			index,
		};

		self.next_epoch += 1;
		debug!(doc_id = id.0, language = grammar.name(), lines = document.line_count(), "session.opened");
		self.sessions.insert(
			id,
			Session {
				epoch: self.next_epoch,
				document,
				grammar: Arc::clone(&grammar),
				published: ArcSwap::from_pointee(published),
				scheduler: AnalysisScheduler::new(self.debounce),
				pending: None,
				inflight: None,
				job_running: false,
			},
		);
		Ok(grammar)
	}

	/// Drops all state of a document. An in-flight pass is cancelled and its
	/// result discarded.
	pub fn close(&mut self, id: DocumentId) -> bool {
		let Some(session) = self.sessions.remove(&id) else {
			return false;
		};
		if let Some(token) = session.inflight {
			token.cancel();
		}
		debug!(doc_id = id.0, "session.closed");
		true
	}

	/// Applies an edit to the live document and re-arms its debounce window.
	pub fn apply_edit(&mut self, id: DocumentId, edit: &EditEvent, now: Instant) -> Result<Generation, SessionError> {
		let session = self.sessions.get_mut(&id).ok_or(SessionError::UnknownDocument(id))?;
		let splice = session.document.apply(edit)?;
		session.pending = Some(match session.pending {
			Some(pending) => pending.compose(splice),
			None => splice,
		});

		if let Some(cancelled) = session.scheduler.note_edit(now)
			&& let Some(token) = session.inflight.take()
		{
			token.cancel();
			debug!(doc_id = id.0, generation = %cancelled, "analysis.cancelled");
		}
		Ok(edit.generation)
	}

	/// Installs finished passes and starts passes whose debounce has elapsed.
	pub fn tick(&mut self, now: Instant) -> TickReport {
		self.pump(now, TaskClass::CpuBlocking)
	}

	fn pump(&mut self, now: Instant, class: TaskClass) -> TickReport {
		let mut report = TickReport::default();
		for done in self.tasks.drain_finished() {
			self.install(done, now, &mut report);
		}

		for (&id, session) in &mut self.sessions {
			if session.job_running {
				continue;
			}
			if session.scheduler.poll(now) == Poll::Ready && start_analysis(id, session, &mut self.tasks, class, now) {
				report.started += 1;
			}
		}
		report
	}

	/// Waits for every in-flight pass and installs the results.
	pub async fn wait_inflight(&mut self) -> TickReport {
		let mut report = TickReport::default();
		let done = self.tasks.join_all().await;
		let now = Instant::now();
		for done in done {
			self.install(done, now, &mut report);
		}
		report
	}

	/// Analyzes a document without waiting out the debounce window and
	/// returns the generation now published.
	///
	/// A cancelled pass still running for the document is awaited before the
	/// next one starts.
	pub async fn analyze_now(&mut self, id: DocumentId) -> Result<Generation, SessionError> {
		loop {
			let session = self.sessions.get_mut(&id).ok_or(SessionError::UnknownDocument(id))?;
			if session.scheduler.state() == AnalysisState::Idle {
				break;
			}
			session.scheduler.force();
			let started = self.pump(Instant::now(), TaskClass::Interactive).started;
			let settled = self.wait_inflight().await;
			if started == 0 && settled == TickReport::default() {
				break;
			}
		}
		self.snapshot(id).map(|p| p.generation).ok_or(SessionError::UnknownDocument(id))
	}

	fn install(&mut self, done: JobDone, now: Instant, report: &mut TickReport) {
		let Some(session) = self.sessions.get_mut(&done.doc_id).filter(|s| s.epoch == done.epoch) else {
			trace!(doc_id = done.doc_id.0, generation = %done.generation, "analysis.orphaned");
			report.discarded += 1;
			return;
		};
		session.job_running = false;

		match (session.scheduler.finish(done.generation), done.result) {
			(Disposition::Publish, Ok(published)) => {
				session.published.store(Arc::new(published));
				session.pending = None;
				session.inflight = None;
				report.published += 1;
				debug!(
					doc_id = done.doc_id.0,
					generation = %done.generation,
					elapsed_us = done.elapsed.as_micros() as u64,
					"analysis.published"
				);
			}
			(Disposition::Publish, Err(Cancelled)) => {
				session.scheduler.retry(done.generation, now);
				session.inflight = None;
				report.discarded += 1;
			}
			(Disposition::Discard, _) => {
				report.discarded += 1;
				trace!(doc_id = done.doc_id.0, generation = %done.generation, "analysis.discarded");
			}
		}
	}

	fn session(&self, id: DocumentId) -> Result<&Session, SessionError> {
		self.sessions.get(&id).ok_or(SessionError::UnknownDocument(id))
	}

	/// Latest published analysis of a document.
	pub fn snapshot(&self, id: DocumentId) -> Option<Arc<Published>> {
		self.sessions.get(&id).map(|s| s.published.load_full())
	}

	/// Live document text, including edits not yet analyzed.
	pub fn document(&self, id: DocumentId) -> Option<&Document> {
		self.sessions.get(&id).map(|s| &s.document)
	}

	pub fn grammar(&self, id: DocumentId) -> Option<&Arc<Grammar>> {
		self.sessions.get(&id).map(|s| &s.grammar)
	}

	/// Whether a pass is in flight for the document.
	pub fn is_analyzing(&self, id: DocumentId) -> bool {
		self.sessions.get(&id).is_some_and(|s| s.scheduler.is_analyzing())
	}

	/// Highlight spans for `lines` from the latest published generation.
	pub fn highlights(&self, id: DocumentId, lines: Range<usize>) -> Result<Vec<HighlightSpan>, SessionError> {
		Ok(self.session(id)?.published.load().cache.highlights(lines))
	}

	/// Completion candidates from the latest published index.
	///
	/// Never waits for analysis: while an edit is pending the candidates
	/// reflect the previous generation.
	pub fn complete(&self, id: DocumentId, cursor: Position, prefix: &str) -> Result<Vec<CompletionCandidate>, SessionError> {
		let session = self.session(id)?;
		let published = session.published.load();
		Ok(complete(&published.index, &session.grammar, cursor, prefix, self.max_candidates))
	}

	pub fn run_request(&self, id: DocumentId) -> Result<RunRequest, SessionError> {
		let session = self.session(id)?;
		Ok(RunRequest {
			language: session.grammar.name().to_string(),
			extension: session.grammar.primary_extension().to_string(),
			text: session.document.text(),
		})
	}

	/// Context for the assistant: live text, the selection, and optionally
	/// the published symbol summary, diagnostics and quality rating.
	pub fn assistant_context(
		&self,
		id: DocumentId,
		selection: Option<Selection>,
		include_summary: bool,
	) -> Result<AssistantContext, SessionError> {
		let session = self.session(id)?;
		let selected_text = selection
			.map(|s| session.document.slice(s.start, s.end))
			.transpose()?;

		let (symbols, diagnostics, quality) = if include_summary {
			let published = session.published.load();
			let found = diagnostics::scan(&session.grammar, &published.document, &published.cache);
			let quality = QualitySummary::assess(&published.document, &published.cache, &found);
			(Some(published.index.summary()), Some(found), Some(quality))
		} else {
			(None, None, None)
		};

		Ok(AssistantContext {
			language: session.grammar.name().to_string(),
			text: session.document.text(),
			selection,
			selected_text,
			symbols,
			diagnostics,
			quality,
		})
	}
}

fn start_analysis(
	id: DocumentId,
	session: &mut Session,
	tasks: &mut TaskCollector<JobDone>,
	class: TaskClass,
	now: Instant,
) -> bool {
	let generation = session.document.generation();
	if !session.scheduler.begin(generation) {
		return false;
	}

	let prev = session.published.load_full();
	let splice = session
		.pending
		.unwrap_or_else(|| LineSplice::new(0, prev.cache.len(), session.document.line_count()));
	let token = GenerationToken::new(generation);
	let job = {
		let token = token.clone();
		let grammar = Arc::clone(&session.grammar);
		let document = session.document.clone();
		let epoch = session.epoch;
		move || {
			let t0 = Instant::now();
			let result = analyze(&grammar, document, &prev, splice, &token);
			JobDone {
				doc_id: id,
				epoch,
				generation,
				result,
				elapsed: t0.elapsed(),
			}
		}
	};

	match tasks.spawn_blocking(class, job) {
		Ok(_) => {
			debug!(doc_id = id.0, %generation, ?splice, class = class.as_str(), "analysis.started");
			session.inflight = Some(token);
			session.job_running = true;
			true
		}
		Err(error) => {
			warn!(doc_id = id.0, %generation, %error, "analysis.spawn_failed");
			session.scheduler.retry(generation, now);
			false
		}
	}
}

fn analyze(
	grammar: &Grammar,
	document: Document,
	prev: &Published,
	splice: LineSplice,
	token: &GenerationToken,
) -> Result<Published, Cancelled> {
	let checkpoint = || token.is_cancelled();
	let relexed = relex(grammar, &document, &prev.cache, splice, &checkpoint)?;
	let index = prev
		.index
		.update(grammar, &document, &relexed.cache, splice, relexed.dirty.clone(), &checkpoint)?;
	trace!(
		generation = %token.generation(),
		dirty = ?relexed.dirty,
		lines_lexed = relexed.lines_lexed,
		"analysis.pass"
	);
	Ok(Published {
		generation: token.generation(),
		document,
		cache: relexed.cache,
		index,
	})
}
