use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::reconcile::choices::UnresolvedChoice;
use crate::reconcile::state::InstanceId;

pub const REPORT_SCHEMA: &str = "dialogue-overlay.report.v1";

/// Which fallback tier produced a passage's lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Qualified,
    GlobalTitle,
    SequentialBlock,
    LineByLine,
    Unresolved,
    AlreadyProcessed,
}

impl ResolutionTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qualified => "qualified",
            Self::GlobalTitle => "global_title",
            Self::SequentialBlock => "sequential_block",
            Self::LineByLine => "line_by_line",
            Self::Unresolved => "unresolved",
            Self::AlreadyProcessed => "already_processed",
        }
    }

    /// Tiers that replaced the passage text.
    #[must_use]
    pub fn is_translated(self) -> bool {
        matches!(
            self,
            Self::Qualified | Self::GlobalTitle | Self::SequentialBlock | Self::LineByLine
        )
    }
}

impl std::fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PassageReport {
    pub title: String,
    pub tier: ResolutionTier,
    pub lines_in: usize,
    pub lines_out: usize,
    pub choices_resolved: usize,
    pub unresolved_choices: Vec<UnresolvedChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub object: String,
    pub instance: InstanceId,
    pub skipped: bool,
    pub passages: Vec<PassageReport>,
}

impl ObjectReport {
    #[must_use]
    pub fn translated_passages(&self) -> usize {
        self.passages.iter().filter(|p| p.tier.is_translated()).count()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ReconcileReport {
    #[serde(rename = "schema")]
    pub schema_version: String,
    pub objects: Vec<ObjectReport>,
    pub tiers: BTreeMap<ResolutionTier, usize>,
    pub unresolved_choices: usize,
}

impl ReconcileReport {
    #[must_use]
    pub fn new(objects: Vec<ObjectReport>) -> Self {
        let mut tiers = BTreeMap::new();
        let mut unresolved_choices = 0usize;
        for passage in objects.iter().flat_map(|o| o.passages.iter()) {
            *tiers.entry(passage.tier).or_insert(0usize) += 1;
            unresolved_choices += passage.unresolved_choices.len();
        }
        Self {
            schema_version: REPORT_SCHEMA.to_string(),
            objects,
            tiers,
            unresolved_choices,
        }
    }
}

pub fn write_report_file(path: &Path, report: &ReconcileReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize reconcile report")?;
    let mut buf = String::new();
    buf.push('\u{FEFF}');
    buf.push_str(&json);
    std::fs::write(path, buf).with_context(|| format!("write report: {}", path.display()))?;
    Ok(())
}
