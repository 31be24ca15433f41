use oxrdf::{NamedNode, Term};

/// A single statement returned by a multi-graph load query.
///
/// Rows are ephemeral. They only live until the entities they describe have been reconstructed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleRow {
    /// The named graph that holds the statement.
    pub graph: NamedNode,
    pub subject: NamedNode,
    pub predicate: NamedNode,
    /// The lexical form of the object (the IRI for resources).
    pub object: String,
    /// The language tag of a language-tagged literal.
    pub language: Option<String>,
    /// The datatype of a literal.
    pub datatype: Option<NamedNode>,
    /// Whether the object is a resource rather than a literal.
    pub is_resource: bool,
}

impl TripleRow {
    /// Creates a row from RDF terms.
    pub fn new(graph: NamedNode, subject: NamedNode, predicate: NamedNode, object: Term) -> Self {
        let (object, language, datatype, is_resource) = match object {
            Term::NamedNode(node) => (node.into_string(), None, None, true),
            Term::BlankNode(node) => (node.to_string(), None, None, true),
            Term::Literal(literal) => {
                let language = literal.language().map(str::to_owned);
                let datatype = literal.datatype().into_owned();
                (literal.value().to_owned(), language, Some(datatype), false)
            }
            #[allow(unreachable_patterns, reason = "Depends on enabled oxrdf features")]
            _ => (object.to_string(), None, None, true),
        };
        Self {
            graph,
            subject,
            predicate,
            object,
            language,
            datatype,
            is_resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::Literal;

    #[test]
    fn language_tagged_object() {
        let node = NamedNode::new_unchecked("http://example.com/a");
        let row = TripleRow::new(
            node.clone(),
            node.clone(),
            node,
            Literal::new_language_tagged_literal_unchecked("Apfel", "de").into(),
        );
        assert_eq!(row.object, "Apfel");
        assert_eq!(row.language.as_deref(), Some("de"));
        assert!(!row.is_resource);
    }
}
