pub mod config;
pub mod corpus;
pub mod dump;
pub mod markup;
pub mod reconcile;
pub mod resolver;
pub mod sources;
pub mod textutil;

pub use corpus::{Corpus, CorpusSources, SourceFile};
pub use reconcile::{DialogueChoice, DialogueObject, Engine, ObjectReport, ReconcileRequest, ResolutionTier};
pub use resolver::Resolver;
