use rdf_entity_model::{
    Condition, ConditionGroup, ConditionNode, ConditionValue, EntityTypeId, FieldName, GraphId,
    Operator, Paging, QueryError, SortKey,
};
use rdf_entity_query::{QueryBuilder, SelectQuery};
use rdf_entity_schema::Schema;

/// An entity query: conditions, sort keys, paging and the graphs to query.
///
/// Top-level conditions are joined with `AND`. Use [ConditionGroup] and
/// [EntityQuery::group] for nested or alternative conditions.
///
/// ```
/// use rdf_entity::model::{Operator, SortDirection};
/// use rdf_entity::EntityQuery;
///
/// let query = EntityQuery::new("rdf_entity")
///     .matches("type", "fruit")
///     .condition("text", "p", Operator::Contains)
///     .sort("id", "ASC")?
///     .range(0, 2);
/// assert_eq!(query.sorts()[0].direction, SortDirection::Ascending);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityQuery {
    entity_type: EntityTypeId,
    conditions: ConditionGroup,
    sorts: Vec<SortKey>,
    paging: Option<Paging>,
    graphs: Option<Vec<GraphId>>,
}

impl EntityQuery {
    /// Creates a query that matches all entities of `entity_type`.
    pub fn new(entity_type: impl Into<EntityTypeId>) -> Self {
        Self {
            entity_type: entity_type.into(),
            conditions: ConditionGroup::and(),
            sorts: Vec::new(),
            paging: None,
            graphs: None,
        }
    }

    /// Adds a condition with an explicit operator.
    #[must_use]
    pub fn condition(
        self,
        field: impl Into<FieldName>,
        value: impl Into<ConditionValue>,
        operator: Operator,
    ) -> Self {
        self.push(Condition::new(field, value, operator))
    }

    /// Adds a condition that uses `IN` for lists and `=` otherwise.
    #[must_use]
    pub fn matches(self, field: impl Into<FieldName>, value: impl Into<ConditionValue>) -> Self {
        self.push(Condition::implicit(field, value))
    }

    /// Requires the field to have a value.
    #[must_use]
    pub fn exists(self, field: impl Into<FieldName>) -> Self {
        self.push(Condition::new(field, ConditionValue::Null, Operator::Exists))
    }

    /// Requires the field to have no value.
    #[must_use]
    pub fn not_exists(self, field: impl Into<FieldName>) -> Self {
        self.push(Condition::new(field, ConditionValue::Null, Operator::NotExists))
    }

    /// Adds a nested group.
    #[must_use]
    pub fn group(self, group: ConditionGroup) -> Self {
        self.push(group)
    }

    /// Adds any condition node.
    #[must_use]
    pub fn push(mut self, node: impl Into<ConditionNode>) -> Self {
        self.conditions.push(node);
        self
    }

    /// Sorts by the main column of `field`. The direction must be `ASC` or `DESC`.
    pub fn sort(self, field: impl Into<FieldName>, direction: &str) -> Result<Self, QueryError> {
        let direction = direction.parse()?;
        Ok(self.sort_by(SortKey::new(field, direction)))
    }

    /// Appends a sort key.
    #[must_use]
    pub fn sort_by(mut self, sort: SortKey) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Returns `length` results starting at `start`.
    #[must_use]
    pub fn range(mut self, start: u64, length: u64) -> Self {
        self.paging = Some(Paging::range(start, length));
        self
    }

    /// Returns the 0-based `page` of `length` results.
    #[must_use]
    pub fn pager(mut self, page: u64, length: u64) -> Self {
        self.paging = Some(Paging::page(page, length));
        self
    }

    /// Queries the given graphs instead of the default graph set.
    #[must_use]
    pub fn graphs<G: Into<GraphId>>(mut self, graphs: impl IntoIterator<Item = G>) -> Self {
        self.graphs = Some(graphs.into_iter().map(Into::into).collect());
        self
    }

    pub fn entity_type(&self) -> &EntityTypeId {
        &self.entity_type
    }

    pub fn conditions(&self) -> &ConditionGroup {
        &self.conditions
    }

    pub fn sorts(&self) -> &[SortKey] {
        &self.sorts
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    /// Returns the explicitly requested graphs.
    pub fn requested_graphs(&self) -> Option<&[GraphId]> {
        self.graphs.as_deref()
    }

    /// Compiles the query against `schema`.
    pub fn compile(&self, schema: &Schema, is_count: bool) -> Result<SelectQuery, QueryError> {
        let definition = schema.entity_type(self.entity_type.as_str())?;
        QueryBuilder::new(definition).build(
            &ConditionNode::Group(self.conditions.clone()),
            &self.sorts,
            self.paging,
            is_count,
            self.requested_graphs(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::non_ascii_literal, reason = "Variables use the middle dot separator")]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use rdf_entity_model::SortDirection;

    fn schema() -> Schema {
        Schema::from_json(include_str!("../../schema/testdata/fruit.json"), 1).unwrap()
    }

    #[test]
    fn invalid_sort_direction() {
        let result = EntityQuery::new("rdf_entity").sort("id", "UP");
        assert!(matches!(result, Err(QueryError::InvalidSortDirection(_))));
    }

    #[test]
    fn implicit_operators() {
        let query = EntityQuery::new("rdf_entity")
            .matches("type", ["fruit", "vegetable"])
            .matches("label", "Apple");
        let operators = query
            .conditions()
            .children
            .iter()
            .map(|node| match node {
                ConditionNode::Leaf(condition) => condition.operator,
                ConditionNode::Group(_) => Operator::Exists,
            })
            .collect::<Vec<_>>();
        assert_eq!(operators, [Operator::In, Operator::Eq]);
    }

    #[test]
    fn compile_with_explicit_graphs() {
        let query = EntityQuery::new("rdf_entity")
            .exists("origin")
            .sort_by(SortKey::new("type", SortDirection::Descending))
            .pager(1, 5)
            .graphs(["foo"]);
        assert_snapshot!(query.compile(&schema(), false).unwrap(), @r"
        SELECT DISTINCT ?entity
        FROM <http://example.com/fruit/foo>
        WHERE {
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
          FILTER EXISTS {
            ?entity <http://example.com/origin> ?origin·value·exists .
          }
        }
        ORDER BY DESC(?bundle)
        LIMIT 5
        OFFSET 5
        ");
    }

    #[test]
    fn unknown_entity_type() {
        let result = EntityQuery::new("node").compile(&schema(), true);
        assert!(matches!(result, Err(QueryError::UnknownEntityType(_))));
    }
}
