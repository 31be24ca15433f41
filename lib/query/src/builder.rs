use crate::compiler::{ConditionCompiler, BUNDLE_VARIABLE, ENTITY_VARIABLE};
use crate::fragment::{write_statements, Statement};
use crate::serializer::to_variable;
use rdf_entity_model::{
    ConditionNode, GraphId, NamedNode, Paging, QueryError, SortDirection, SortKey,
    VARIABLE_SEPARATOR,
};
use rdf_entity_schema::EntityTypeDefinition;
use std::fmt::{Display, Formatter};

/// The variable that holds the result of a count query.
pub const COUNT_VARIABLE: &str = "count";

/// An entity query ready to be sent to the triple store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectQuery {
    is_count: bool,
    graphs: Vec<NamedNode>,
    pattern: Vec<Statement>,
    order: Vec<(SortDirection, String)>,
    paging: Option<Paging>,
}

impl SelectQuery {
    pub fn is_count(&self) -> bool {
        self.is_count
    }

    /// The graphs whose union forms the default graph of the query.
    pub fn graphs(&self) -> &[NamedNode] {
        &self.graphs
    }
}

impl Display for SelectQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_count {
            writeln!(
                f,
                "SELECT (COUNT(DISTINCT {ENTITY_VARIABLE}) AS ?{COUNT_VARIABLE})"
            )?;
        } else {
            writeln!(f, "SELECT DISTINCT {ENTITY_VARIABLE}")?;
        }
        for graph in &self.graphs {
            writeln!(f, "FROM {graph}")?;
        }
        writeln!(f, "WHERE {{")?;
        write_statements(f, &self.pattern, 1)?;
        writeln!(f, "}}")?;
        if !self.order.is_empty() {
            let keys = self
                .order
                .iter()
                .map(|(direction, variable)| format!("{}({variable})", direction.keyword()))
                .collect::<Vec<_>>();
            writeln!(f, "ORDER BY {}", keys.join(" "))?;
        }
        if let Some(paging) = self.paging {
            writeln!(f, "LIMIT {}", paging.limit)?;
            writeln!(f, "OFFSET {}", paging.offset)?;
        }
        Ok(())
    }
}

/// Builds entity queries of one entity type.
#[derive(Clone, Copy, Debug)]
pub struct QueryBuilder<'a> {
    definition: &'a EntityTypeDefinition,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(definition: &'a EntityTypeDefinition) -> Self {
        Self { definition }
    }

    /// Builds the query that selects (or counts) the entities matching `conditions`.
    ///
    /// Without explicit `graphs`, the default graph set of the entity type is queried. If the
    /// top level of `conditions` restricts the bundle, only the graphs of these bundles are part
    /// of the dataset. Count queries ignore `sorts` and `paging`.
    pub fn build(
        &self,
        conditions: &ConditionNode,
        sorts: &[SortKey],
        paging: Option<Paging>,
        is_count: bool,
        graphs: Option<&[GraphId]>,
    ) -> Result<SelectQuery, QueryError> {
        let compiler = ConditionCompiler::new(self.definition);
        let catalog = self.definition.catalog();

        let graph_ids = catalog.resolve(graphs)?;
        let bundles = compiler.top_level_bundles(conditions);
        let graph_uris = catalog.graph_uris(&graph_ids, bundles.as_deref());

        let mut pattern = Vec::new();
        if graph_uris.is_empty() {
            tracing::debug!("No graph hosts the requested bundles, the query has no results");
            pattern.push(Statement::values(ENTITY_VARIABLE, Vec::new()));
        }
        pattern.extend(compiler.compile(conditions)?.into_statements());

        let mut order = Vec::new();
        if !is_count {
            for sort in sorts {
                if let Some((variable, sort_pattern)) = self.sort_variable(sort) {
                    pattern.extend(sort_pattern);
                    order.push((sort.direction, variable));
                }
            }
        }

        Ok(SelectQuery {
            is_count,
            graphs: graph_uris,
            pattern,
            order,
            paging: paging.filter(|_| !is_count),
        })
    }

    /// Returns the variable to order by and the pattern that binds it.
    ///
    /// Entities without a value for the sort field are kept. Sort keys on unmapped fields are
    /// ignored.
    fn sort_variable(&self, sort: &SortKey) -> Option<(String, Vec<Statement>)> {
        let schema = self.definition.schema();
        if sort.field == schema.id_key {
            return Some((ENTITY_VARIABLE.to_owned(), Vec::new()));
        }
        if sort.field == schema.bundle_key {
            return Some((BUNDLE_VARIABLE.to_owned(), Vec::new()));
        }

        let mapping = match self.definition.mappings().resolve(
            &sort.field,
            sort.column.as_ref(),
            None,
        ) {
            Ok(mapping) => mapping,
            Err(error) => {
                tracing::debug!("Ignoring sort key: {error}");
                return None;
            }
        };
        let variable = format!(
            "{}{VARIABLE_SEPARATOR}sort",
            to_variable(&mapping.field_column.variable_name(), false)
        );
        let optional = match mapping.single_predicate() {
            Some(predicate) => vec![Statement::triple(
                ENTITY_VARIABLE,
                predicate.to_string(),
                variable.clone(),
            )],
            None => {
                let predicate_variable = format!("{variable}{VARIABLE_SEPARATOR}predicate");
                vec![
                    Statement::triple(
                        ENTITY_VARIABLE,
                        predicate_variable.clone(),
                        variable.clone(),
                    ),
                    Statement::values(
                        predicate_variable,
                        mapping.predicates.iter().map(ToString::to_string).collect(),
                    ),
                ]
            }
        };
        Some((variable, vec![Statement::Optional(optional)]))
    }
}

#[cfg(test)]
#[allow(clippy::non_ascii_literal, reason = "Variables use the middle dot separator")]
mod tests {
    use super::*;
    use crate::test_fixtures::fruit_schema;
    use insta::assert_snapshot;
    use rdf_entity_model::{Condition, ConditionGroup, ConditionValue, Operator};

    fn fruit_tree() -> ConditionNode {
        ConditionGroup::and()
            .condition(Condition::new("type", "fruit", Operator::Eq))
            .condition(Condition::new("text", "p", Operator::Contains))
            .into()
    }

    #[test]
    fn select_with_sort_and_paging() {
        let schema = fruit_schema();
        let builder = QueryBuilder::new(schema.entity_type("rdf_entity").unwrap());
        let sorts = [
            SortKey::new("id", SortDirection::Ascending),
            SortKey::new("label", SortDirection::Descending),
            SortKey::new("price", SortDirection::Ascending),
        ];
        let query = builder
            .build(&fruit_tree(), &sorts, Some(Paging::range(0, 2)), false, None)
            .unwrap();
        assert_snapshot!(query, @r#"
        SELECT DISTINCT ?entity
        FROM <http://example.com/fruit/published>
        FROM <http://example.com/fruit/draft>
        WHERE {
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/fruit> }
          ?entity <http://example.com/text> ?text·value .
          FILTER (CONTAINS(LCASE(STR(?text·value)), LCASE(STR("p"))))
          OPTIONAL {
            ?entity <http://www.w3.org/2000/01/rdf-schema#label> ?label·value·sort .
          }
        }
        ORDER BY ASC(?entity) DESC(?label·value·sort)
        LIMIT 2
        OFFSET 0
        "#);
        spargebra::Query::parse(&query.to_string(), None).unwrap();
    }

    #[test]
    fn count_ignores_sort_and_paging() {
        let schema = fruit_schema();
        let builder = QueryBuilder::new(schema.entity_type("rdf_entity").unwrap());
        let sorts = [SortKey::new("id", SortDirection::Ascending)];
        let query = builder
            .build(
                &ConditionGroup::and().into(),
                &sorts,
                Some(Paging::page(3, 10)),
                true,
                Some(&[GraphId::new("foo")]),
            )
            .unwrap();
        assert_snapshot!(query, @r"
        SELECT (COUNT(DISTINCT ?entity) AS ?count)
        FROM <http://example.com/fruit/foo>
        WHERE {
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        }
        ");
        spargebra::Query::parse(&query.to_string(), None).unwrap();
    }

    #[test]
    fn pruned_graph_set_yields_empty_result() {
        let schema = fruit_schema();
        let builder = QueryBuilder::new(schema.entity_type("rdf_entity").unwrap());
        let tree = Condition::new("type", "vegetable", Operator::Eq).into();
        let query = builder
            .build(&tree, &[], None, false, Some(&[GraphId::new("foo")]))
            .unwrap();
        assert!(query.graphs().is_empty());
        assert_snapshot!(query, @r"
        SELECT DISTINCT ?entity
        WHERE {
          VALUES ?entity { }
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/vegetable> }
        }
        ");
        spargebra::Query::parse(&query.to_string(), None).unwrap();
    }

    #[test]
    fn ambiguous_sort_key() {
        let schema = fruit_schema();
        let builder = QueryBuilder::new(schema.entity_type("rdf_entity").unwrap());
        let sorts = [SortKey::new("color", SortDirection::Ascending)];
        let query = builder
            .build(&ConditionGroup::and().into(), &sorts, None, false, None)
            .unwrap();
        assert_snapshot!(query, @r"
        SELECT DISTINCT ?entity
        FROM <http://example.com/fruit/published>
        FROM <http://example.com/vegetable/published>
        FROM <http://example.com/fruit/draft>
        FROM <http://example.com/vegetable/draft>
        WHERE {
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
          OPTIONAL {
            ?entity ?color·value·sort·predicate ?color·value·sort .
            VALUES ?color·value·sort·predicate { <http://example.com/color> <http://example.com/vegetable_color> }
          }
        }
        ORDER BY ASC(?color·value·sort)
        ");
        spargebra::Query::parse(&query.to_string(), None).unwrap();
    }

    #[test]
    fn unknown_graph() {
        let schema = fruit_schema();
        let builder = QueryBuilder::new(schema.entity_type("rdf_entity").unwrap());
        let result = builder.build(
            &ConditionGroup::and().into(),
            &[],
            None,
            false,
            Some(&[GraphId::new("archive")]),
        );
        assert!(matches!(result, Err(QueryError::GraphNotFound { .. })));
    }

    #[test]
    fn compiled_conditions_parse() {
        let schema = fruit_schema();
        let builder = QueryBuilder::new(schema.entity_type("rdf_entity").unwrap());
        let tree = ConditionGroup::or()
            .condition(Condition::new("label", "%pp%", Operator::NotLike).with_language("en"))
            .group(
                ConditionGroup::and()
                    .condition(Condition::new("type", ["fruit"], Operator::NotIn))
                    .condition(Condition::new("weight", ["1", "5"], Operator::Between))
                    .condition(Condition::new("origin", ConditionValue::Null, Operator::Exists)),
            )
            .condition(Condition::new("id", "http://example.com/apple", Operator::GtEq))
            .into();
        let query = builder.build(&tree, &[], None, false, None).unwrap();
        spargebra::Query::parse(&query.to_string(), None).unwrap();
    }
}
