use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use quill_language::LanguageLoader;
use quill_primitives::{DocumentId, EditEvent, Generation, Position};
use quill_syntax::StyleTag;
use quill_syntax::lexer::lex_document;

use super::*;

static LOADER: LazyLock<Arc<LanguageLoader>> = LazyLock::new(|| Arc::new(LanguageLoader::from_embedded()));

const DEBOUNCE: Duration = Duration::from_millis(80);
const DOC: DocumentId = DocumentId(1);

fn manager() -> AnalysisManager {
	AnalysisManager::new(Arc::clone(&LOADER), &EditorConfig::default())
}

fn insert(line: usize, column: usize, text: &str, generation: u64) -> EditEvent {
	EditEvent::insert(Position::new(line, column), text, Generation(generation))
}

fn texts(candidates: &[CompletionCandidate]) -> Vec<&str> {
	candidates.iter().map(|c| c.text.as_str()).collect()
}

/// Published tokens must match a from-scratch lex of the published text.
fn assert_published_is_fresh(mgr: &AnalysisManager, id: DocumentId) {
	let published = mgr.snapshot(id).unwrap();
	let grammar = mgr.grammar(id).unwrap();
	assert!(published.cache.same_tokens(&lex_document(grammar, &published.document)));
	assert_eq!(published.document.text(), mgr.document(id).unwrap().text());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn open_publishes_immediately() {
	let mut mgr = manager();
	let grammar = mgr.open(DOC, "def foo():\n    return 1", Some("python")).unwrap();
	assert_eq!(grammar.name(), "python");
	assert_eq!(mgr.snapshot(DOC).unwrap().generation, Generation::INITIAL);
	assert!(!mgr.is_analyzing(DOC));

	let spans = mgr.highlights(DOC, 0..1).unwrap();
	assert_eq!(spans[0].style, StyleTag::Keyword);
	assert!(matches!(mgr.open(DOC, "", None), Err(SessionError::AlreadyOpen(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_language_and_detection_fall_back_sensibly() {
	let mut mgr = manager();
	assert!(mgr.open(DocumentId(1), "whatever", Some("cobol")).unwrap().is_plain_text());
	let detected = mgr.open(DocumentId(2), "package main\n\nfunc main() {\n\tx := 1\n}", None).unwrap();
	assert_eq!(detected.name(), "go");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burst_of_edits_publishes_only_the_last_generation() {
	let mut mgr = manager();
	mgr.open(DOC, "", Some("python")).unwrap();
	let t0 = Instant::now();

	for (i, ch) in "abc = 1".chars().enumerate() {
		let at = t0 + Duration::from_millis(10 * i as u64);
		mgr.apply_edit(DOC, &insert(0, i, &ch.to_string(), i as u64 + 1), at).unwrap();
		assert_eq!(mgr.tick(at), TickReport::default());
	}
	let last_edit = t0 + Duration::from_millis(60);
	assert_eq!(mgr.tick(last_edit + DEBOUNCE - Duration::from_millis(1)).started, 0);

	let report = mgr.tick(last_edit + DEBOUNCE);
	assert_eq!(report.started, 1);
	assert!(mgr.is_analyzing(DOC));

	let report = mgr.wait_inflight().await;
	assert_eq!(report.published, 1);
	assert_eq!(mgr.snapshot(DOC).unwrap().generation, Generation(7));
	assert!(!mgr.is_analyzing(DOC));
	assert_published_is_fresh(&mgr, DOC);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edit_during_analysis_discards_the_stale_pass() {
	let mut mgr = manager();
	mgr.open(DOC, "x = 1\n", Some("python")).unwrap();
	let t0 = Instant::now();

	mgr.apply_edit(DOC, &insert(1, 0, "alpha = 2\n", 1), t0).unwrap();
	assert_eq!(mgr.tick(t0 + DEBOUNCE).started, 1);

	let t1 = t0 + DEBOUNCE;
	mgr.apply_edit(DOC, &insert(2, 0, "beta = 3", 2), t1).unwrap();
	assert!(!mgr.is_analyzing(DOC));

	let report = mgr.wait_inflight().await;
	assert_eq!(
		report,
		TickReport {
			started: 0,
			published: 0,
			discarded: 1
		}
	);
	assert_eq!(mgr.snapshot(DOC).unwrap().generation, Generation::INITIAL);

	assert_eq!(mgr.tick(t1 + DEBOUNCE).started, 1);
	assert_eq!(mgr.wait_inflight().await.published, 1);
	assert_eq!(mgr.snapshot(DOC).unwrap().generation, Generation(2));
	assert_published_is_fresh(&mgr, DOC);

	let cursor = Position::new(2, 8);
	assert_eq!(texts(&mgr.complete(DOC, cursor, "al").unwrap()), ["alpha"]);
	assert_eq!(texts(&mgr.complete(DOC, cursor, "be").unwrap()), ["beta"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_pass_is_reaped_before_the_next_one_starts() {
	let mut mgr = manager();
	let source: String = (0..2000).map(|i| format!("value{i} = {i}\n")).collect();
	mgr.open(DOC, &source, Some("python")).unwrap();
	let t0 = Instant::now();

	mgr.apply_edit(DOC, &insert(0, 0, "# head\n", 1), t0).unwrap();
	assert_eq!(mgr.tick(t0 + DEBOUNCE).started, 1);

	let t1 = t0 + DEBOUNCE;
	mgr.apply_edit(DOC, &insert(0, 0, "# again\n", 2), t1).unwrap();
	let report = mgr.tick(t1 + DEBOUNCE);
	// A replacement starts only once the cancelled job has been installed.
	assert_eq!(report.started, report.discarded);
	assert!(mgr.tasks.len() <= 1);

	assert_eq!(mgr.analyze_now(DOC).await.unwrap(), Generation(2));
	assert!(mgr.tasks.is_empty());
	assert!(!mgr.is_analyzing(DOC));
	assert_published_is_fresh(&mgr, DOC);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn analyze_now_right_after_a_cancelling_edit_publishes_the_latest_text() {
	let mut mgr = manager();
	mgr.open(DOC, "x = 1", Some("python")).unwrap();
	let t0 = Instant::now();
	mgr.apply_edit(DOC, &insert(0, 5, "\ny = 2", 1), t0).unwrap();
	assert_eq!(mgr.tick(t0 + DEBOUNCE).started, 1);
	mgr.apply_edit(DOC, &insert(1, 5, "\nz = 3", 2), t0 + DEBOUNCE).unwrap();

	assert_eq!(mgr.analyze_now(DOC).await.unwrap(), Generation(2));
	let published = mgr.snapshot(DOC).unwrap();
	assert_eq!(published.index.symbols_named("y").len(), 1);
	assert_eq!(published.index.symbols_named("z").len(), 1);
	assert_published_is_fresh(&mgr, DOC);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completion_reads_the_published_index_until_analysis_lands() {
	let mut mgr = manager();
	mgr.open(DOC, "def foo():\n    pass", Some("python")).unwrap();
	mgr.apply_edit(DOC, &insert(1, 8, "\n    counter = 1\n    co", 1), Instant::now()).unwrap();

	let cursor = Position::new(3, 6);
	assert_eq!(texts(&mgr.complete(DOC, cursor, "co").unwrap()), ["continue"]);

	assert_eq!(mgr.analyze_now(DOC).await.unwrap(), Generation(1));
	assert_eq!(texts(&mgr.complete(DOC, cursor, "co").unwrap()), ["counter", "continue"]);
	assert!(mgr.complete(DOC, cursor, "").unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn opening_block_comment_recolors_following_lines() {
	let mut mgr = manager();
	let source: String = (0..10).map(|i| format!("int v{i} = {i};\n")).collect();
	mgr.open(DOC, source.trim_end(), Some("c")).unwrap();

	mgr.apply_edit(DOC, &insert(2, 0, "/* ", 1), Instant::now()).unwrap();
	mgr.analyze_now(DOC).await.unwrap();
	let spans = mgr.highlights(DOC, 3..9).unwrap();
	assert!(spans.iter().all(|s| s.style == StyleTag::Comment));
	let last = mgr.highlights(DOC, 9..10).unwrap();
	assert_eq!(last[0].style, StyleTag::Unterminated);

	mgr.apply_edit(DOC, &EditEvent::delete(Position::new(2, 0), Position::new(2, 3), Generation(2)), Instant::now())
		.unwrap();
	mgr.analyze_now(DOC).await.unwrap();
	let spans = mgr.highlights(DOC, 3..4).unwrap();
	assert_eq!(spans[0].style, StyleTag::Keyword);
	assert_published_is_fresh(&mgr, DOC);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closing_discards_inflight_results() {
	let mut mgr = manager();
	mgr.open(DOC, "a = 1", Some("python")).unwrap();
	let t0 = Instant::now();
	mgr.apply_edit(DOC, &insert(0, 5, "\nb = 2", 1), t0).unwrap();
	assert_eq!(mgr.tick(t0 + DEBOUNCE).started, 1);
	assert!(mgr.close(DOC));
	assert!(!mgr.close(DOC));

	// Reopened under the same id; the old pass must not land here.
	mgr.open(DOC, "fresh = 1", Some("python")).unwrap();
	assert_eq!(mgr.wait_inflight().await.discarded, 1);
	let published = mgr.snapshot(DOC).unwrap();
	assert_eq!(published.generation, Generation::INITIAL);
	assert_eq!(published.document.text(), "fresh = 1");

	mgr.close(DOC);
	assert!(matches!(mgr.highlights(DOC, 0..1), Err(SessionError::UnknownDocument(_))));
	assert!(!mgr.is_analyzing(DOC));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn documents_are_analyzed_independently() {
	let mut mgr = manager();
	let a = DocumentId(1);
	let b = DocumentId(2);
	mgr.open(a, "x = 1", Some("python")).unwrap();
	mgr.open(b, "let y = 1;", Some("rust")).unwrap();
	let t0 = Instant::now();

	mgr.apply_edit(a, &insert(0, 5, "\nxs = 2", 1), t0).unwrap();
	mgr.apply_edit(b, &insert(0, 10, "\nlet ys = 2;", 1), t0 + Duration::from_millis(40)).unwrap();

	assert_eq!(mgr.tick(t0 + DEBOUNCE).started, 1);
	assert!(mgr.is_analyzing(a));
	assert!(!mgr.is_analyzing(b));
	assert_eq!(mgr.tick(t0 + DEBOUNCE + Duration::from_millis(40)).started, 1);
	mgr.wait_inflight().await;

	assert_eq!(mgr.snapshot(a).unwrap().generation, Generation(1));
	assert_eq!(mgr.snapshot(b).unwrap().generation, Generation(1));
	assert_published_is_fresh(&mgr, a);
	assert_published_is_fresh(&mgr, b);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_edit_leaves_the_session_untouched() {
	let mut mgr = manager();
	mgr.open(DOC, "short", Some("python")).unwrap();
	let err = mgr.apply_edit(DOC, &insert(3, 0, "x", 1), Instant::now()).unwrap_err();
	assert!(matches!(err, SessionError::Edit(_)));
	assert_eq!(mgr.tick(Instant::now() + DEBOUNCE), TickReport::default());
	assert!(matches!(
		mgr.apply_edit(DocumentId(9), &insert(0, 0, "x", 1), Instant::now()),
		Err(SessionError::UnknownDocument(_))
	));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_request_carries_live_text_and_extension() {
	let mut mgr = manager();
	mgr.open(DOC, "print('hi')", Some("py")).unwrap();
	mgr.apply_edit(DOC, &insert(0, 11, "\nprint('bye')", 1), Instant::now()).unwrap();

	let request = mgr.run_request(DOC).unwrap();
	assert_eq!(
		request,
		RunRequest {
			language: "python".into(),
			extension: "py".into(),
			text: "print('hi')\nprint('bye')".into(),
		}
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn assistant_context_serializes_selection_and_summary() {
	let mut mgr = manager();
	let source = "# TODO: cache results\ndef load(path):\n    api_key = \"sk-0123456789abcdef\"\n    return path";
	mgr.open(DOC, source, Some("python")).unwrap();

	let selection = Selection {
		start: Position::new(1, 4),
		end: Position::new(1, 8),
	};
	let context = mgr.assistant_context(DOC, Some(selection), true).unwrap();
	assert_eq!(context.selected_text.as_deref(), Some("load"));
	let symbols = context.symbols.as_ref().unwrap();
	assert_eq!(symbols.functions, ["load"]);
	assert_eq!(symbols.variables, ["api_key"]);
	assert_eq!(context.diagnostics.as_ref().map(Vec::len), Some(2));

	let json = serde_json::to_value(&context).unwrap();
	assert_eq!(json["language"], "python");
	assert_eq!(json["selection"]["start"]["line"], 1);
	assert_eq!(json["diagnostics"][1]["severity"], "security");
	assert_eq!(json["quality"]["complexity"], 1);
	assert_eq!(json["quality"]["maintainability"], "excellent");

	let bare = serde_json::to_value(mgr.assistant_context(DOC, None, false).unwrap()).unwrap();
	assert!(bare.get("symbols").is_none());
	assert!(bare.get("quality").is_none());
	assert!(bare.get("selected_text").is_none());

	let out_of_range = Selection {
		start: Position::new(0, 0),
		end: Position::new(9, 0),
	};
	assert!(matches!(
		mgr.assistant_context(DOC, Some(out_of_range), false),
		Err(SessionError::Edit(_))
	));
}
