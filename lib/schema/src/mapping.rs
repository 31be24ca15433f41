use crate::schema::{ColumnMapping, EntityTypeDefinition, FieldDefinition};
use rdf_entity_model::{
    BundleId, ColumnName, FieldColumn, FieldName, FieldType, NamedNode, QueryError, ValueFormat,
};
use std::collections::BTreeSet;

/// The storage mapping of a `(field, column)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub field_column: FieldColumn,
    /// The candidate predicates. Never empty.
    pub predicates: BTreeSet<NamedNode>,
    pub format: ValueFormat,
    pub field_type: FieldType,
}

impl ResolvedMapping {
    /// Returns the predicate if there is exactly one candidate.
    pub fn single_predicate(&self) -> Option<&NamedNode> {
        if self.predicates.len() == 1 {
            self.predicates.first()
        } else {
            None
        }
    }
}

/// Maps fields of an entity type to predicates and back.
#[derive(Clone, Copy, Debug)]
pub struct FieldMappingResolver<'a> {
    definition: &'a EntityTypeDefinition,
}

impl<'a> FieldMappingResolver<'a> {
    pub(crate) fn new(definition: &'a EntityTypeDefinition) -> Self {
        Self { definition }
    }

    /// Resolves the predicates that store `field.column`.
    ///
    /// Without a `column`, the main column of the field is used. If `bundles` is given, only
    /// predicates used by these bundles are candidates.
    ///
    /// Fails with [QueryError::UnmappedField] if the field or the column is unknown or if none of
    /// the bundles stores the column.
    pub fn resolve(
        &self,
        field: &FieldName,
        column: Option<&ColumnName>,
        bundles: Option<&[BundleId]>,
    ) -> Result<ResolvedMapping, QueryError> {
        let unmapped = |column: ColumnName| QueryError::UnmappedField {
            entity_type: self.definition.id().clone(),
            field: field.clone(),
            column,
        };

        let Some(definition) = self.definition.field(field.as_str()) else {
            return Err(unmapped(
                column.cloned().unwrap_or_else(|| ColumnName::new("value")),
            ));
        };
        let column = column.unwrap_or(&definition.main_column);
        let Some(mapping) = definition.columns.get(column) else {
            return Err(unmapped(column.clone()));
        };

        let predicates = match bundles {
            None => self
                .definition
                .bundles()
                .filter_map(|bundle| mapping.predicate_for(&bundle.id))
                .cloned()
                .collect::<BTreeSet<_>>(),
            Some(bundles) => bundles
                .iter()
                .filter_map(|bundle| mapping.predicate_for(bundle))
                .cloned()
                .collect(),
        };
        if predicates.is_empty() {
            return Err(unmapped(column.clone()));
        }

        Ok(ResolvedMapping {
            field_column: FieldColumn::new(field.clone(), column.clone()),
            predicates,
            format: mapping.format.clone(),
            field_type: definition.field_type,
        })
    }

    /// Maps bundle ids to the objects of the type predicate.
    pub fn bundles_to_uris(&self, bundles: &[BundleId]) -> Result<BTreeSet<NamedNode>, QueryError> {
        bundles
            .iter()
            .map(|bundle| Ok(self.definition.bundle(bundle.as_str())?.uri.clone()))
            .collect()
    }

    /// Returns the type URIs of all bundles of the entity type.
    pub fn all_bundle_uris(&self) -> BTreeSet<NamedNode> {
        self.definition
            .bundles()
            .map(|bundle| bundle.uri.clone())
            .collect()
    }

    /// Returns the columns that `predicate` stores for `bundle`.
    ///
    /// A predicate may store multiple columns (e.g., if two fields share a predicate).
    pub fn inverse(&self, bundle: &BundleId, predicate: &NamedNode) -> &'a [FieldColumn] {
        self.definition.inverse_mapping(bundle, predicate)
    }

    pub fn field(&self, field: &str) -> Option<&'a FieldDefinition> {
        self.definition.field(field)
    }

    pub fn column(&self, field_column: &FieldColumn) -> Option<&'a ColumnMapping> {
        self.definition
            .field(field_column.field.as_str())?
            .columns
            .get(&field_column.column)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::fruit_schema;
    use rdf_entity_model::{BundleId, ColumnName, FieldColumn, FieldName, NamedNode, QueryError};

    fn names(mapping: &super::ResolvedMapping) -> Vec<&str> {
        mapping.predicates.iter().map(NamedNode::as_str).collect()
    }

    #[test]
    fn resolves_main_column() {
        let schema = fruit_schema();
        let mappings = schema.entity_type("rdf_entity").unwrap().mappings();
        let mapping = mappings.resolve(&FieldName::new("label"), None, None).unwrap();
        assert_eq!(mapping.field_column, FieldColumn::new("label", "value"));
        assert_eq!(names(&mapping), ["http://www.w3.org/2000/01/rdf-schema#label"]);
        assert!(mapping.single_predicate().is_some());
    }

    #[test]
    fn bundle_overrides_create_ambiguity() {
        let schema = fruit_schema();
        let mappings = schema.entity_type("rdf_entity").unwrap().mappings();
        let mapping = mappings.resolve(&FieldName::new("color"), None, None).unwrap();
        assert_eq!(
            names(&mapping),
            ["http://example.com/color", "http://example.com/vegetable_color"]
        );
        assert!(mapping.single_predicate().is_none());

        let restricted = mappings
            .resolve(&FieldName::new("color"), None, Some(&[BundleId::new("vegetable")]))
            .unwrap();
        assert_eq!(names(&restricted), ["http://example.com/vegetable_color"]);
    }

    #[test]
    fn unmapped_fields() {
        let schema = fruit_schema();
        let mappings = schema.entity_type("rdf_entity").unwrap().mappings();
        let missing_field = mappings.resolve(&FieldName::new("price"), None, None);
        assert!(matches!(missing_field, Err(QueryError::UnmappedField { .. })));

        let missing_column =
            mappings.resolve(&FieldName::new("text"), Some(&ColumnName::new("summary")), None);
        assert!(matches!(missing_column, Err(QueryError::UnmappedField { .. })));

        let other_bundle =
            mappings.resolve(&FieldName::new("origin"), None, Some(&[BundleId::new("vegetable")]));
        assert!(matches!(other_bundle, Err(QueryError::UnmappedField { .. })));
    }

    #[test]
    fn inverse_mapping_is_per_bundle() {
        let schema = fruit_schema();
        let mappings = schema.entity_type("rdf_entity").unwrap().mappings();
        let color = NamedNode::new_unchecked("http://example.com/color");
        assert_eq!(
            mappings.inverse(&BundleId::new("fruit"), &color),
            [FieldColumn::new("color", "value")]
        );
        assert!(mappings.inverse(&BundleId::new("vegetable"), &color).is_empty());
    }

    #[test]
    fn bundles_to_uris() {
        let schema = fruit_schema();
        let mappings = schema.entity_type("rdf_entity").unwrap().mappings();
        let uris = mappings.bundles_to_uris(&[BundleId::new("fruit")]).unwrap();
        assert_eq!(
            uris.iter().map(NamedNode::as_str).collect::<Vec<_>>(),
            ["http://example.com/fruit"]
        );
        let unknown = mappings.bundles_to_uris(&[BundleId::new("mineral")]);
        assert!(matches!(unknown, Err(QueryError::UnknownBundle { .. })));
    }
}
