use crate::error::StorageError;
use async_trait::async_trait;
use rdf_entity_model::{NamedNode, Term, TripleRow};
use sparesults::QuerySolution;
use std::fmt::Debug;

/// The client of a SPARQL triple store.
///
/// Every method is a single round trip to the store. Implementations must not retry on their
/// own; retry policies belong to the transport that backs the client.
#[async_trait]
pub trait TripleStore: Debug + Send + Sync {
    /// Evaluates a `SELECT` query and returns all solutions.
    async fn query(&self, query: &str) -> Result<Vec<QuerySolution>, StorageError>;

    /// Executes a SPARQL update (e.g., `INSERT DATA` or `DELETE WHERE`).
    async fn update(&self, update: &str) -> Result<(), StorageError>;

    /// Evaluates an `ASK` query.
    async fn ask(&self, query: &str) -> Result<bool, StorageError>;
}

/// Extracts the IRI bound to `variable`.
pub fn named_node(solution: &QuerySolution, variable: &str) -> Result<NamedNode, StorageError> {
    match solution.get(variable) {
        Some(Term::NamedNode(node)) => Ok(node.clone()),
        Some(term) => Err(StorageError::unexpected(format!(
            "?{variable} is bound to {term}, expected an IRI"
        ))),
        None => Err(StorageError::unexpected(format!("?{variable} is unbound"))),
    }
}

/// Converts a solution of a multi-graph load query into a [TripleRow].
///
/// The solution must bind `graph`, `subject`, `predicate` and `object` to the given variables.
pub fn triple_row(
    solution: &QuerySolution,
    [graph, subject, predicate, object]: [&str; 4],
) -> Result<TripleRow, StorageError> {
    let object_term = solution
        .get(object)
        .cloned()
        .ok_or_else(|| StorageError::unexpected(format!("?{object} is unbound")))?;
    Ok(TripleRow::new(
        named_node(solution, graph)?,
        named_node(solution, subject)?,
        named_node(solution, predicate)?,
        object_term,
    ))
}

/// Reads the integer bound to `variable` of a count query.
///
/// An empty result is a count of zero.
pub fn count(solutions: &[QuerySolution], variable: &str) -> Result<u64, StorageError> {
    let Some(solution) = solutions.first() else {
        return Ok(0);
    };
    match solution.get(variable) {
        Some(Term::Literal(literal)) => literal.value().parse().map_err(|_| {
            StorageError::unexpected(format!("?{variable} is not a count: {literal}"))
        }),
        Some(term) => Err(StorageError::unexpected(format!(
            "?{variable} is bound to {term}, expected a literal"
        ))),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_entity_model::{Literal, Variable};

    fn solution(bindings: &[(&str, Term)]) -> QuerySolution {
        let variables = bindings
            .iter()
            .map(|(name, _)| Variable::new_unchecked(*name))
            .collect::<Vec<_>>();
        let values = bindings
            .iter()
            .map(|(_, term)| Some(term.clone()))
            .collect::<Vec<_>>();
        QuerySolution::from((variables, values))
    }

    #[test]
    fn count_of_empty_result_is_zero() {
        assert_eq!(count(&[], "count").unwrap(), 0);
    }

    #[test]
    fn count_reads_integer_literal() {
        let solution = solution(&[("count", Literal::from(42).into())]);
        assert_eq!(count(&[solution], "count").unwrap(), 42);
    }

    #[test]
    fn triple_row_requires_iri_graph() {
        let node: Term = NamedNode::new_unchecked("http://example.com/a").into();
        let solution = solution(&[
            ("graph", Literal::new_simple_literal("g").into()),
            ("entity", node.clone()),
            ("predicate", node.clone()),
            ("value", node),
        ]);
        let result = triple_row(&solution, ["graph", "entity", "predicate", "value"]);
        assert!(matches!(result, Err(StorageError::UnexpectedResult(_))));
    }
}
