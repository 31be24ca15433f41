//! Query and update text for loading and writing entities.

use crate::compiler::ENTITY_VARIABLE;
use crate::serializer::serialize_resource;
use rdf_entity_model::{GraphName, NamedNode, Quad, QueryError};
use std::fmt::{Display, Formatter};

/// The variables bound by [load_query].
pub const LOAD_VARIABLES: [&str; 4] = ["graph", "entity", "predicate", "field_value"];

/// Selects all triples of `entity_ids` in `graphs` and their type assertions in `type_graphs`.
///
/// Each solution binds `?graph`, `?entity`, `?predicate` and `?field_value`.
pub fn load_query(
    entity_ids: &[&str],
    graphs: &[NamedNode],
    type_graphs: &[NamedNode],
    type_predicates: &[NamedNode],
) -> Result<String, QueryError> {
    Ok(LoadQuery {
        entities: serialize_resources(entity_ids)?,
        graphs,
        type_graphs,
        type_predicates,
    }
    .to_string())
}

struct LoadQuery<'a> {
    entities: String,
    graphs: &'a [NamedNode],
    type_graphs: &'a [NamedNode],
    type_predicates: &'a [NamedNode],
}

impl Display for LoadQuery<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let triples = format!("GRAPH ?graph {{ {ENTITY_VARIABLE} ?predicate ?field_value }}");
        writeln!(
            f,
            "SELECT DISTINCT ?graph {ENTITY_VARIABLE} ?predicate ?field_value"
        )?;
        writeln!(f, "WHERE {{")?;
        writeln!(f, "  VALUES {ENTITY_VARIABLE} {{ {} }}", self.entities)?;
        if self.type_graphs.is_empty() || self.type_predicates.is_empty() {
            writeln!(f, "  VALUES ?graph {{ {} }}", join_terms(self.graphs))?;
            writeln!(f, "  {triples}")?;
        } else {
            writeln!(f, "  {{")?;
            writeln!(f, "    VALUES ?graph {{ {} }}", join_terms(self.graphs))?;
            writeln!(f, "    {triples}")?;
            writeln!(f, "  }}")?;
            writeln!(f, "  UNION")?;
            writeln!(f, "  {{")?;
            writeln!(f, "    VALUES ?graph {{ {} }}", join_terms(self.type_graphs))?;
            writeln!(
                f,
                "    VALUES ?predicate {{ {} }}",
                join_terms(self.type_predicates)
            )?;
            writeln!(f, "    {triples}")?;
            writeln!(f, "  }}")?;
        }
        writeln!(f, "}}")
    }
}

/// Asks whether `entity_id` is the subject of any triple in the given graphs.
pub fn exists_query(entity_id: &str, graphs: &[NamedNode]) -> Result<String, QueryError> {
    let entity = serialize_resource(entity_id)?;
    Ok(format!(
        "ASK\n\
         WHERE {{\n\
         \x20 VALUES ?graph {{ {} }}\n\
         \x20 GRAPH ?graph {{ {entity} ?predicate ?object }}\n\
         }}\n",
        join_terms(graphs)
    ))
}

/// Inserts `quads`. Quads are grouped by graph in the order of first appearance.
pub fn insert_data(quads: &[Quad]) -> String {
    InsertData(quads).to_string()
}

struct InsertData<'a>(&'a [Quad]);

impl Display for InsertData<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut graphs: Vec<(&GraphName, Vec<&Quad>)> = Vec::new();
        for quad in self.0 {
            match graphs.iter_mut().find(|(graph, _)| **graph == quad.graph_name) {
                Some((_, group)) => group.push(quad),
                None => graphs.push((&quad.graph_name, vec![quad])),
            }
        }

        writeln!(f, "INSERT DATA {{")?;
        for (graph, quads) in graphs {
            let indent = match graph {
                GraphName::DefaultGraph => "  ",
                graph => {
                    writeln!(f, "  GRAPH {graph} {{")?;
                    "    "
                }
            };
            for quad in quads {
                writeln!(
                    f,
                    "{indent}{} {} {} .",
                    quad.subject, quad.predicate, quad.object
                )?;
            }
            if !graph.is_default_graph() {
                writeln!(f, "  }}")?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Deletes all triples of `entity_ids` from the given graphs.
pub fn delete_entities(entity_ids: &[&str], graphs: &[NamedNode]) -> Result<String, QueryError> {
    let entities = serialize_resources(entity_ids)?;
    Ok(format!(
        "DELETE {{\n\
         \x20 GRAPH ?graph {{ {ENTITY_VARIABLE} ?predicate ?object }}\n\
         }}\n\
         WHERE {{\n\
         \x20 VALUES {ENTITY_VARIABLE} {{ {entities} }}\n\
         \x20 VALUES ?graph {{ {} }}\n\
         \x20 GRAPH ?graph {{ {ENTITY_VARIABLE} ?predicate ?object }}\n\
         }}\n",
        join_terms(graphs)
    ))
}

fn serialize_resources(iris: &[&str]) -> Result<String, QueryError> {
    let iris = iris
        .iter()
        .map(|iri| serialize_resource(iri))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(iris.join(" "))
}

fn join_terms(terms: &[NamedNode]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
