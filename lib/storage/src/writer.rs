use chrono::{DateTime, SecondsFormat};
use rdf_entity_model::vocab::xsd;
use rdf_entity_model::{
    EntityRecord, GraphId, Literal, NamedNode, Quad, QueryError, StoredValue, Term, ValueFormat,
};
use rdf_entity_schema::EntityTypeDefinition;

/// Converts entity records into quads through the forward field mapping.
///
/// Every column value becomes an independent triple. The item a value belonged to is not
/// recorded, so multi-column items of the same field are paired again by position on load.
#[derive(Clone, Copy, Debug)]
pub struct EntityWriter<'a> {
    definition: &'a EntityTypeDefinition,
}

impl<'a> EntityWriter<'a> {
    pub fn new(definition: &'a EntityTypeDefinition) -> Self {
        Self { definition }
    }

    /// Returns the backing graph of the record's bundle in `graph`.
    pub fn graph_uri(&self, record: &EntityRecord, graph: &GraphId) -> Result<NamedNode, QueryError> {
        let bundle = self.definition.bundle(record.bundle.as_str())?;
        bundle
            .graphs
            .get(graph)
            .cloned()
            .ok_or_else(|| QueryError::GraphNotFound {
                entity_type: self.definition.id().clone(),
                graph: graph.clone(),
            })
    }

    /// Returns the quads that store `record` in `graph`.
    ///
    /// Key fields and columns without a mapping for the record's bundle are skipped.
    pub fn quads(&self, record: &EntityRecord, graph: &GraphId) -> Result<Vec<Quad>, QueryError> {
        let schema = self.definition.schema();
        let graph_uri = self.graph_uri(record, graph)?;
        let bundle = self.definition.bundle(record.bundle.as_str())?;
        let subject = NamedNode::new(record.id.as_str()).map_err(|error| QueryError::InvalidUri {
            iri: record.id.clone(),
            error,
        })?;

        let mut quads = schema
            .type_predicates
            .first()
            .map(|predicate| {
                Quad::new(
                    subject.clone(),
                    predicate.clone(),
                    bundle.uri.clone(),
                    graph_uri.clone(),
                )
            })
            .into_iter()
            .collect::<Vec<_>>();

        let mappings = self.definition.mappings();
        for (field, translations) in &record.fields {
            if schema.is_key(field) {
                continue;
            }
            for (langcode, items) in translations {
                for item in items {
                    for (column, value) in item {
                        let mapping = match mappings.resolve(
                            field,
                            Some(column),
                            Some(std::slice::from_ref(&record.bundle)),
                        ) {
                            Ok(mapping) => mapping,
                            Err(error) => {
                                tracing::debug!("Not writing {field}.{column}: {error}");
                                continue;
                            }
                        };
                        let Some(predicate) = mapping.single_predicate() else {
                            continue;
                        };
                        let object = object(value, &mapping.format, langcode)?;
                        quads.push(Quad::new(
                            subject.clone(),
                            predicate.clone(),
                            object,
                            graph_uri.clone(),
                        ));
                    }
                }
            }
        }
        Ok(quads)
    }
}

fn object(value: &StoredValue, format: &ValueFormat, langcode: &str) -> Result<Term, QueryError> {
    let lexical = match (value, format) {
        (StoredValue::Timestamp { unix, .. }, ValueFormat::TypedLiteral(datatype))
            if *datatype == xsd::DATE_TIME =>
        {
            DateTime::from_timestamp(*unix, 0).map_or_else(
                || unix.to_string(),
                |date_time| date_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
        }
        _ => value.lexical().into_owned(),
    };

    let term = match format {
        ValueFormat::Resource => NamedNode::new(lexical.as_str())
            .map_err(|error| QueryError::InvalidUri {
                iri: lexical.clone(),
                error,
            })?
            .into(),
        ValueFormat::PlainLiteral => Literal::new_simple_literal(lexical).into(),
        ValueFormat::LanguageTaggedLiteral => {
            let language = match value {
                StoredValue::Literal {
                    language: Some(language),
                    ..
                } => language.as_str(),
                _ => langcode,
            };
            Literal::new_language_tagged_literal(lexical, language)
                .map_err(|error| QueryError::InvalidLanguageTag {
                    tag: language.to_owned(),
                    error,
                })?
                .into()
        }
        ValueFormat::TypedLiteral(datatype) => {
            Literal::new_typed_literal(lexical, datatype.clone()).into()
        }
    };
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::fruit_schema;
    use rdf_entity_model::{FieldItem, GraphName};

    fn objects(quads: &[Quad]) -> Vec<String> {
        quads.iter().map(|quad| format!("{} {}", quad.predicate, quad.object)).collect()
    }

    #[test]
    fn record_to_quads() {
        let schema = fruit_schema();
        let writer = EntityWriter::new(schema.entity_type("rdf_entity").unwrap());
        let record = EntityRecord::new("http://fruit.example.com/001", "fruit")
            .with_value("id", "value", "en", "http://fruit.example.com/002")
            .with_value("label", "value", "en", "Apple")
            .with_value("label", "value", "de", "Apfel")
            .with_item(
                "text",
                "en",
                FieldItem::from([
                    ("value".into(), "<p>Crunchy</p>".into()),
                    ("format".into(), "basic_html".into()),
                ]),
            )
            .with_value("weight", "value", "en", "150")
            .with_value("created", "value", "en", StoredValue::Timestamp {
                unix: 1_483_228_800,
                display: "2017-01-01T00:00:00".to_owned(),
            })
            .with_value("price", "value", "en", "3");

        let quads = writer.quads(&record, &GraphId::new("draft")).unwrap();
        assert!(quads.iter().all(|quad| quad.graph_name
            == GraphName::from(NamedNode::new_unchecked("http://example.com/fruit/draft"))));
        assert_eq!(
            objects(&quads),
            [
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/fruit>",
                "<http://purl.org/dc/terms/created> \"2017-01-01T00:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>",
                "<http://www.w3.org/2000/01/rdf-schema#label> \"Apfel\"@de",
                "<http://www.w3.org/2000/01/rdf-schema#label> \"Apple\"@en",
                "<http://example.com/text_format> \"basic_html\"",
                "<http://example.com/text> \"<p>Crunchy</p>\"@en",
                "<http://example.com/weight> \"150\"^^<http://www.w3.org/2001/XMLSchema#integer>",
            ]
        );
    }

    #[test]
    fn bundle_specific_predicates_are_used() {
        let schema = fruit_schema();
        let writer = EntityWriter::new(schema.entity_type("rdf_entity").unwrap());
        let record = EntityRecord::new("http://example.com/carrot", "vegetable")
            .with_value("color", "value", "en", StoredValue::resource("http://example.com/orange"))
            .with_value("origin", "value", "en", "Austria");
        let quads = writer.quads(&record, &GraphId::new("default")).unwrap();
        assert_eq!(
            objects(&quads),
            [
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/vegetable>",
                "<http://example.com/vegetable_color> <http://example.com/orange>",
            ]
        );
    }

    #[test]
    fn graph_must_host_bundle() {
        let schema = fruit_schema();
        let writer = EntityWriter::new(schema.entity_type("rdf_entity").unwrap());
        let record = EntityRecord::new("http://example.com/carrot", "vegetable");
        let result = writer.quads(&record, &GraphId::new("foo"));
        assert!(matches!(result, Err(QueryError::GraphNotFound { .. })));
    }

    #[test]
    fn invalid_resources_are_rejected() {
        let schema = fruit_schema();
        let writer = EntityWriter::new(schema.entity_type("rdf_entity").unwrap());
        let record = EntityRecord::new("http://example.com/apple", "fruit")
            .with_value("color", "value", "en", StoredValue::resource("red"));
        let result = writer.quads(&record, &GraphId::new("default"));
        assert!(matches!(result, Err(QueryError::InvalidUri { .. })));
    }
}
