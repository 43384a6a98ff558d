use crate::relation::Relation;
use crate::session::Session;
use crate::{AttrNumber, AuxResult, Oid};

pub mod pipeline;
pub mod synthesize;

/// A possibly schema-qualified relation name as written by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn bare(name: &str) -> Self {
        QualifiedName {
            schema: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(schema: &str, name: &str) -> Self {
        QualifiedName {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One column of a create-table payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub type_oid: Oid,
    pub typmod: i32,
    pub collation: Oid,
}

/// Embedded create-table payload of a "create auxiliary table" statement.
/// `relation` may be empty on input; the pipeline fills it in together with
/// the column list. `master_oid`/`aux_attnum` are stamped on by the pipeline
/// so the generic relation-creation path can write the catalog record.
#[derive(Debug, Clone, Default)]
pub struct CreateTableStmt {
    pub relation: Option<QualifiedName>,
    pub columns: Vec<ColumnDef>,
    pub master_oid: Option<Oid>,
    pub aux_attnum: Option<AttrNumber>,
}

/// Embedded create-index payload, executed as the final stage.
#[derive(Debug, Clone)]
pub struct CreateIndexStmt {
    pub relation: Option<QualifiedName>,
    pub index_name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
    pub can_set_tag: bool,
    pub source: QuerySource,
}

impl CreateIndexStmt {
    pub fn on_columns(columns: Vec<String>) -> Self {
        CreateIndexStmt {
            relation: None,
            index_name: None,
            columns,
            unique: false,
            can_set_tag: true,
            source: QuerySource::Original,
        }
    }
}

/// The user-level composite statement: create an auxiliary table shadowing
/// `aux_column` of `master_relation`.
#[derive(Debug, Clone)]
pub struct CreateAuxStmt {
    pub master_relation: QualifiedName,
    pub aux_column: String,
    pub create_stmt: CreateTableStmt,
    pub index_stmt: CreateIndexStmt,
}

/// Where a statement came from. Internally generated sub-statements are
/// parser-sourced so downstream stages never treat them as user SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Original,
    Parser,
}

/// A raw statement produced by the parse service, not yet analyzed.
#[derive(Debug, Clone)]
pub struct RawStmt {
    pub sql: String,
}

/// A fully analyzed and rewritten sub-statement. `can_set_tag` controls
/// whether it contributes to the command's user-visible row-count tag.
#[derive(Debug, Clone)]
pub struct Query {
    pub sql: String,
    pub can_set_tag: bool,
    pub source: QuerySource,
}

/// External services the pipeline consumes, kept behind one narrow seam so
/// the nested create-table execution is an explicit interface call rather
/// than a re-entrant jump into the dispatcher.
pub trait DdlServices {
    /// Resolve a relation reference to a descriptor snapshot.
    fn resolve_relation(&self, name: &QualifiedName) -> Option<Relation>;

    /// Whether a relation by this name already exists in the namespace.
    fn relation_name_exists(&self, namespace: Oid, name: &str) -> bool;

    /// Execute a create-table payload synchronously as a nested top-level
    /// utility action. All of its side effects, the auxiliary catalog
    /// record included, are complete when this returns.
    fn execute_utility(&mut self, stmt: &CreateTableStmt, sql: &str) -> AuxResult<()>;

    /// Parse raw SQL text into raw statements.
    fn parse(&self, sql: &str) -> AuxResult<Vec<RawStmt>>;

    /// Analyze and rewrite one raw statement into fully resolved
    /// sub-statements. Implementations consult `session` for the
    /// auxiliary-DML permission flag.
    fn analyze_and_rewrite(
        &mut self,
        raw: &RawStmt,
        source_text: &str,
        session: &Session,
    ) -> AuxResult<Vec<Query>>;
}

/// One stage of a rewritten "create auxiliary table" statement.
#[derive(Debug, Clone)]
pub enum Stage {
    CreateTable(CreateTableStmt),
    Populate(Query),
    CreateIndex(CreateIndexStmt),
}

/// Ordered output of the rewrite pipeline: create, populate (possibly more
/// than one sub-statement after rewrite expansion), index. The create stage
/// has already been executed through [`DdlServices::execute_utility`] by the
/// time this is returned; the remaining stages run in order inside the same
/// originating transaction.
#[derive(Debug)]
pub struct RewriteTransaction {
    stages: Vec<Stage>,
}

impl RewriteTransaction {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages the caller still has to execute (everything but the create).
    pub fn pending(&self) -> &[Stage] {
        &self.stages[1..]
    }

    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}
