//! Statement store collaborator
//!
//! Bundles treat graph content as opaque statements. The store only has to
//! enumerate its contexts, read every statement of one context and write a
//! set of statements into a context. Terms are kept in their N-Triples
//! lexical form (`<iri>`, `_:b0`, `"literal"@en`) and never interpreted.

pub mod nquads;

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::ContextId;
use crate::error::Result;

/// A single subject/predicate/object statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Statement {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// Access to named graphs in some statement store
pub trait GraphStore {
    /// All context identifiers with at least one statement, sorted
    fn contexts(&self) -> Result<Vec<ContextId>>;

    /// Every statement in `context`; empty if the context is unknown
    fn read_context(&self, context: &str) -> Result<Vec<Statement>>;

    /// Add `statements` to `context`
    fn write_context(&mut self, context: &str, statements: &[Statement]) -> Result<()>;
}

/// In-memory store keyed by context
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    graphs: BTreeMap<ContextId, BTreeSet<Statement>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, context: &str, statement: Statement) {
        self.graphs
            .entry(context.to_string())
            .or_default()
            .insert(statement);
    }

    /// Total number of statements across all contexts
    pub fn len(&self) -> usize {
        self.graphs.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All `(context, statement)` pairs in context order
    pub fn quads(&self) -> impl Iterator<Item = (&str, &Statement)> {
        self.graphs
            .iter()
            .flat_map(|(ctx, stmts)| stmts.iter().map(move |s| (ctx.as_str(), s)))
    }
}

impl GraphStore for MemoryStore {
    fn contexts(&self) -> Result<Vec<ContextId>> {
        Ok(self
            .graphs
            .iter()
            .filter(|(_, stmts)| !stmts.is_empty())
            .map(|(ctx, _)| ctx.clone())
            .collect())
    }

    fn read_context(&self, context: &str) -> Result<Vec<Statement>> {
        Ok(self
            .graphs
            .get(context)
            .map(|stmts| stmts.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn write_context(&mut self, context: &str, statements: &[Statement]) -> Result<()> {
        let graph = self.graphs.entry(context.to_string()).or_default();
        graph.extend(statements.iter().cloned());
        Ok(())
    }
}
