use std::fmt::{Display, Formatter, Write};

const INDENT: &str = "  ";

/// A statement of a group graph pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// A triple pattern. All terms are already serialized.
    Triple {
        subject: String,
        predicate: String,
        object: String,
    },
    /// An inline data block binding a single variable.
    Values { variable: String, values: Vec<String> },
    /// A `FILTER` with the given expression.
    Filter(String),
    /// A `FILTER EXISTS` or `FILTER NOT EXISTS` with the given pattern.
    Exists {
        negated: bool,
        pattern: Vec<Statement>,
    },
    /// Alternative patterns joined with `UNION`.
    Union(Vec<Vec<Statement>>),
    /// An `OPTIONAL` pattern.
    Optional(Vec<Statement>),
}

impl Statement {
    pub fn triple(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Statement::Triple {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn values(variable: impl Into<String>, values: Vec<String>) -> Self {
        Statement::Values {
            variable: variable.into(),
            values,
        }
    }

    pub fn filter(expression: impl Into<String>) -> Self {
        Statement::Filter(expression.into())
    }

    fn write(&self, f: &mut impl Write, depth: usize) -> std::fmt::Result {
        let indent = INDENT.repeat(depth);
        match self {
            Statement::Triple {
                subject,
                predicate,
                object,
            } => writeln!(f, "{indent}{subject} {predicate} {object} ."),
            Statement::Values { variable, values } if values.is_empty() => {
                writeln!(f, "{indent}VALUES {variable} {{ }}")
            }
            Statement::Values { variable, values } => {
                writeln!(f, "{indent}VALUES {variable} {{ {} }}", values.join(" "))
            }
            Statement::Filter(expression) => writeln!(f, "{indent}FILTER ({expression})"),
            Statement::Exists { negated, pattern } => {
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                writeln!(f, "{indent}FILTER {keyword} {{")?;
                write_statements(f, pattern, depth + 1)?;
                writeln!(f, "{indent}}}")
            }
            Statement::Union(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        writeln!(f, "{indent}UNION")?;
                    }
                    writeln!(f, "{indent}{{")?;
                    write_statements(f, branch, depth + 1)?;
                    writeln!(f, "{indent}}}")?;
                }
                Ok(())
            }
            Statement::Optional(pattern) => {
                writeln!(f, "{indent}OPTIONAL {{")?;
                write_statements(f, pattern, depth + 1)?;
                writeln!(f, "{indent}}}")
            }
        }
    }
}

pub(crate) fn write_statements(
    f: &mut impl Write,
    statements: &[Statement],
    depth: usize,
) -> std::fmt::Result {
    statements.iter().try_for_each(|s| s.write(f, depth))
}

/// The compiled form of a condition tree: a group graph pattern without the enclosing braces.
///
/// A fragment *anchors* the subject if it restricts `?entity` to the types of the entity type's
/// bundles. Unanchored fragments need a default pattern before they can be evaluated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryFragment {
    statements: Vec<Statement>,
    anchored: bool,
}

impl QueryFragment {
    pub fn new(statements: Vec<Statement>, anchored: bool) -> Self {
        Self {
            statements,
            anchored,
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<Statement> {
        self.statements
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Appends the statements of `other`. The result is anchored if either fragment is.
    pub fn append(&mut self, other: QueryFragment) {
        self.statements.extend(other.statements);
        self.anchored |= other.anchored;
    }

    /// Prepends `pattern` and marks the fragment as anchored.
    pub fn anchor_with(&mut self, mut pattern: Vec<Statement>) {
        pattern.append(&mut self.statements);
        self.statements = pattern;
        self.anchored = true;
    }
}

impl Display for QueryFragment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_statements(f, &self.statements, 0)
    }
}
