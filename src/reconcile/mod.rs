mod choices;
mod report;
mod rewrite;
mod state;

use tracing::{debug, info, warn};

use crate::corpus::{Corpus, CorpusSources, LinkChoiceIndex, PassageMatch};
use crate::markup::object_base;
use crate::resolver::Resolver;

pub use choices::{resolve_choices, ChoiceResolution, DialogueChoice, UnresolvedChoice};
pub use report::{
    write_report_file, ObjectReport, PassageReport, ReconcileReport, ResolutionTier,
};
pub use rewrite::{ordered_speakers, rewrite_lines, SpeakerRemap};
pub use state::{InstanceId, ReconciliationState};

/// What the engine needs from a live dialogue object owned by the host.
pub trait DialogueObject {
    fn instance_id(&self) -> InstanceId;
    fn name(&self) -> &str;
    fn passage_count(&self) -> usize;
    fn passage_title(&self, passage: usize) -> Option<&str>;
    fn passage_lines(&self, passage: usize) -> Vec<String>;
    fn set_passage_lines(&mut self, passage: usize, lines: Vec<String>);
    fn choices(&self, passage: usize) -> Vec<DialogueChoice>;
    fn set_choices(&mut self, passage: usize, choices: Vec<DialogueChoice>);
}

/// One passage of one dialogue object, as the host currently holds it.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileRequest<'r> {
    pub identity: InstanceId,
    pub object_name: &'r str,
    pub object_base: &'r str,
    pub title: &'r str,
    pub lines: &'r [String],
    pub choices: &'r [DialogueChoice],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub lines: Vec<String>,
    pub choices: Vec<DialogueChoice>,
    pub report: PassageReport,
}

/// Corpus plus reconciliation state. Everything that mutates takes `&mut self`; hosts that call
/// in from several threads put the engine behind a `Mutex`.
#[derive(Debug, Default)]
pub struct Engine {
    corpus: Corpus,
    state: ReconciliationState,
}

impl Engine {
    #[must_use]
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            state: ReconciliationState::new(),
        }
    }

    #[must_use]
    pub fn from_sources(sources: &CorpusSources) -> Self {
        Self::new(Corpus::build(sources))
    }

    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[must_use]
    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    #[must_use]
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.corpus)
    }

    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<String> {
        self.resolver().resolve(text)
    }

    #[must_use]
    pub fn resolve_key(&self, key: &str) -> Option<String> {
        self.resolver().resolve_key(key)
    }

    #[must_use]
    pub fn resolve_keyed(&self, key: Option<&str>, text: &str) -> Option<String> {
        self.resolver().resolve_keyed(key, text)
    }

    /// Reconciles a single passage. A repeated identity returns the input untouched.
    pub fn reconcile(&mut self, request: ReconcileRequest<'_>) -> Reconciled {
        if !self.state.mark_processed(request.identity) {
            debug!(object = request.object_name, title = request.title, "identity already processed");
            return unchanged(&request, ResolutionTier::AlreadyProcessed);
        }
        reconcile_passage(&self.corpus, &mut self.state, &request)
    }

    /// Reconciles every passage of `object` and writes the results back through the adapter.
    pub fn reconcile_object<O: DialogueObject + ?Sized>(&mut self, object: &mut O) -> ObjectReport {
        let instance = object.instance_id();
        let name = object.name().to_string();
        if !self.state.mark_processed(instance) {
            debug!(object = %name, instance, "object already processed");
            return ObjectReport {
                object: name,
                instance,
                skipped: true,
                passages: Vec::new(),
            };
        }

        let base = object_base(&name).to_string();
        let mut passages = Vec::with_capacity(object.passage_count());
        for idx in 0..object.passage_count() {
            let Some(title) = object.passage_title(idx).map(str::to_string) else {
                continue;
            };
            let lines = object.passage_lines(idx);
            let choices = object.choices(idx);
            let request = ReconcileRequest {
                identity: instance,
                object_name: &name,
                object_base: &base,
                title: &title,
                lines: &lines,
                choices: &choices,
            };
            let out = reconcile_passage(&self.corpus, &mut self.state, &request);
            if out.report.tier.is_translated() {
                object.set_passage_lines(idx, out.lines);
                if out.choices != choices {
                    object.set_choices(idx, out.choices);
                }
            }
            passages.push(out.report);
        }

        let report = ObjectReport {
            object: name,
            instance,
            skipped: false,
            passages,
        };
        info!(
            object = %report.object,
            translated = report.translated_passages(),
            passages = report.passages.len(),
            "reconciled dialogue object"
        );
        report
    }
}

/// Runs the tier chain for one passage without touching the processed set.
pub fn reconcile_passage(
    corpus: &Corpus,
    state: &mut ReconciliationState,
    request: &ReconcileRequest<'_>,
) -> Reconciled {
    let object = request.object_name;
    let title = request.title;

    let (tier, lines) = if let Some((matched, replacement)) =
        corpus.passages().lines_for(request.object_base, title)
    {
        let tier = match matched {
            PassageMatch::Qualified => ResolutionTier::Qualified,
            PassageMatch::Title => ResolutionTier::GlobalTitle,
        };
        (tier, rewrite_lines(request.lines, replacement, corpus.speakers()))
    } else if let Some(block) = take_sequential_block(corpus, state, object) {
        (
            ResolutionTier::SequentialBlock,
            rewrite_lines(request.lines, &block, corpus.speakers()),
        )
    } else if let Some(lines) = translate_line_by_line(corpus, request.lines) {
        (ResolutionTier::LineByLine, lines)
    } else {
        warn!(object, title, lines = request.lines.len(), "passage left unresolved");
        return unchanged(request, ResolutionTier::Unresolved);
    };
    debug!(object, title, tier = %tier, lines = lines.len(), "passage resolved");

    let local = LinkChoiceIndex::from_choices(
        corpus.passages().choices_for(request.object_base, title),
    );
    let mut choices = request.choices.to_vec();
    let resolution = resolve_choices(title, &mut choices, &local, corpus.links());

    Reconciled {
        report: PassageReport {
            title: title.to_string(),
            tier,
            lines_in: request.lines.len(),
            lines_out: lines.len(),
            choices_resolved: resolution.resolved,
            unresolved_choices: resolution.unresolved,
        },
        lines,
        choices,
    }
}

fn take_sequential_block(
    corpus: &Corpus,
    state: &mut ReconciliationState,
    object_name: &str,
) -> Option<Vec<String>> {
    let blocks = corpus.blocks();
    let key = if blocks.contains(object_name) {
        object_name
    } else {
        let base = object_base(object_name);
        blocks.contains(base).then_some(base)?
    };
    let all = blocks.blocks(key)?;
    let (idx, block) = state.take_block(key, all)?;
    debug!(object = object_name, base = key, block = idx, of = all.len(), "sequential block");
    Some(block.to_vec())
}

fn translate_line_by_line(corpus: &Corpus, lines: &[String]) -> Option<Vec<String>> {
    let resolver = Resolver::new(corpus);
    let mut hits = 0usize;
    let out: Vec<String> = lines
        .iter()
        .map(|line| match resolver.resolve_line(line) {
            Some(t) => {
                hits += 1;
                t
            }
            None => line.clone(),
        })
        .collect();
    (hits > 0).then_some(out)
}

fn unchanged(request: &ReconcileRequest<'_>, tier: ResolutionTier) -> Reconciled {
    Reconciled {
        lines: request.lines.to_vec(),
        choices: request.choices.to_vec(),
        report: PassageReport {
            title: request.title.to_string(),
            tier,
            lines_in: request.lines.len(),
            lines_out: request.lines.len(),
            choices_resolved: 0,
            unresolved_choices: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SourceFile;

    fn engine() -> Engine {
        Engine::from_sources(&CorpusSources {
            ui_map: Some(r#"{"Hello.": "Привет.", "PATRICIA": "ПАТРИСИЯ"}"#.to_string()),
            key_map: None,
            passage_files: vec![
                SourceFile::new(
                    "001_patricia",
                    "=== intro\nПАТРИСИЯ: \"Привет.\"\n* Да -> yes\n=== shared\nОбщий текст.\n",
                ),
                SourceFile::new("002_bob", "=== shared\nТекст Боба.\n"),
            ],
            raw_files: vec![SourceFile::new("003_ann", "Блок один\nintro\nБлок два\n")],
            known_titles: Vec::new(),
        })
    }

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn request<'r>(
        id: InstanceId,
        name: &'r str,
        title: &'r str,
        lines: &'r [String],
        choices: &'r [DialogueChoice],
    ) -> ReconcileRequest<'r> {
        ReconcileRequest {
            identity: id,
            object_name: name,
            object_base: object_base(name),
            title,
            lines,
            choices,
        }
    }

    #[test]
    fn qualified_and_global_title_tiers() {
        let mut e = engine();
        let lines = owned(&["PATRICIA: \"Hello.\""]);
        let choices = vec![DialogueChoice::new("Yes", "yes")];

        let out = e.reconcile(request(1, "001_patricia_01", "intro", &lines, &choices));
        assert_eq!(out.report.tier, ResolutionTier::Qualified);
        assert_eq!(out.lines, owned(&["PATRICIA: \"Привет.\""]));
        assert_eq!(out.choices[0].text, "Да");

        let out = e.reconcile(request(2, "002_bob", "shared", &lines, &[]));
        assert_eq!(out.report.tier, ResolutionTier::Qualified);
        assert_eq!(out.lines, owned(&["<i>Текст Боба.</i>"]));

        let out = e.reconcile(request(3, "009_zed", "shared", &lines, &[]));
        assert_eq!(out.report.tier, ResolutionTier::GlobalTitle);
        assert_eq!(out.lines, owned(&["<i>Общий текст.</i>"]));
    }

    #[test]
    fn sequential_blocks_then_line_fallback_then_unresolved() {
        let mut e = engine();
        let lines = owned(&["Hello.", "Unknown line"]);
        let first = e.reconcile(request(10, "003_ann_02", "missing", &lines, &[]));
        assert_eq!(first.report.tier, ResolutionTier::SequentialBlock);
        assert_eq!(first.lines, owned(&["<i>Блок один</i>"]));
        let second = e.reconcile(request(11, "003_ann_02", "missing", &lines, &[]));
        assert_eq!(second.lines, owned(&["<i>Блок два</i>"]));

        let third = e.reconcile(request(12, "003_ann_02", "missing", &lines, &[]));
        assert_eq!(third.report.tier, ResolutionTier::LineByLine);
        assert_eq!(third.lines, owned(&["Привет.", "Unknown line"]));

        let untouched = owned(&["Nothing here"]);
        let choices = vec![DialogueChoice::new("Go", "yes")];
        let fourth = e.reconcile(request(13, "003_ann_02", "missing", &untouched, &choices));
        assert_eq!(fourth.report.tier, ResolutionTier::Unresolved);
        assert_eq!(fourth.lines, untouched);
        assert_eq!(fourth.choices, choices);
    }

    #[test]
    fn repeated_identity_is_a_no_op() {
        let mut e = engine();
        let lines = owned(&["x"]);
        let first = e.reconcile(request(5, "002_bob", "shared", &lines, &[]));
        assert_eq!(first.report.tier, ResolutionTier::Qualified);
        let again = e.reconcile(request(5, "002_bob", "shared", &lines, &[]));
        assert_eq!(again.report.tier, ResolutionTier::AlreadyProcessed);
        assert_eq!(again.lines, lines);
    }
}
