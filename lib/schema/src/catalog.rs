use crate::schema::{EntityTypeDefinition, GraphDefinition};
use rdf_entity_model::{BundleId, GraphId, NamedNode, QueryError};

/// A graph partition as it is seen by one bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphDescriptor {
    pub id: GraphId,
    /// The named graph that holds the triples of the bundle in this partition.
    pub backing_uri: NamedNode,
    /// Lower weights take precedence.
    pub weight: i32,
    pub enabled: bool,
    pub is_default_candidate: bool,
}

/// The graph partitions of an entity type and their backing graphs.
///
/// The default graph set is the ordered list of enabled default candidates. Other graphs are
/// only used when they are requested explicitly.
#[derive(Clone, Copy, Debug)]
pub struct GraphCatalog<'a> {
    definition: &'a EntityTypeDefinition,
}

impl<'a> GraphCatalog<'a> {
    pub(crate) fn new(definition: &'a EntityTypeDefinition) -> Self {
        Self { definition }
    }

    /// Returns all graph ids in priority order.
    pub fn graph_ids(&self) -> impl Iterator<Item = &'a GraphId> {
        self.definition.graph_definitions().iter().map(|g| &g.id)
    }

    /// Returns the default graph set in priority order.
    pub fn default_graph_ids(&self) -> Vec<GraphId> {
        self.definition
            .graph_definitions()
            .iter()
            .filter(|g| g.enabled && g.default_candidate)
            .map(|g| g.id.clone())
            .collect()
    }

    /// Returns whether `graph` is part of the catalog.
    pub fn contains(&self, graph: &GraphId) -> bool {
        self.definition
            .graph_definitions()
            .iter()
            .any(|g| g.id == *graph)
    }

    /// Resolves the graph set of an operation.
    ///
    /// Without explicit graphs, the default graph set is used. Explicit graphs keep their order
    /// (which is their priority), duplicates are removed.
    pub fn resolve(&self, explicit: Option<&[GraphId]>) -> Result<Vec<GraphId>, QueryError> {
        let Some(explicit) = explicit else {
            return Ok(self.default_graph_ids());
        };
        let mut result = Vec::with_capacity(explicit.len());
        for graph in explicit {
            if !self.contains(graph) {
                return Err(QueryError::GraphNotFound {
                    entity_type: self.definition.id().clone(),
                    graph: graph.clone(),
                });
            }
            if !result.contains(graph) {
                result.push(graph.clone());
            }
        }
        Ok(result)
    }

    /// Returns the descriptors of the graphs that host `bundle`, in priority order.
    pub fn descriptors(&self, bundle: &BundleId) -> Result<Vec<GraphDescriptor>, QueryError> {
        let bundle = self.definition.bundle(bundle.as_str())?;
        Ok(self
            .definition
            .graph_definitions()
            .iter()
            .filter_map(|graph: &GraphDefinition| {
                let backing_uri = bundle.graphs.get(&graph.id)?;
                Some(GraphDescriptor {
                    id: graph.id.clone(),
                    backing_uri: backing_uri.clone(),
                    weight: graph.weight,
                    enabled: graph.enabled,
                    is_default_candidate: graph.default_candidate,
                })
            })
            .collect())
    }

    /// Returns the backing graph of `bundle` in `graph`.
    pub fn backing_uri(&self, bundle: &BundleId, graph: &GraphId) -> Option<&'a NamedNode> {
        self.definition.bundle(bundle.as_str()).ok()?.graphs.get(graph)
    }

    /// Returns the backing graphs of `graphs`, restricted to `bundles` if given.
    ///
    /// The result follows the order of `graphs` and contains no duplicates.
    pub fn graph_uris(&self, graphs: &[GraphId], bundles: Option<&[BundleId]>) -> Vec<NamedNode> {
        let mut result = Vec::new();
        for graph in graphs {
            for bundle in self.definition.bundles() {
                if bundles.is_some_and(|bundles| !bundles.contains(&bundle.id)) {
                    continue;
                }
                if let Some(uri) = bundle.graphs.get(graph) {
                    if !result.contains(uri) {
                        result.push(uri.clone());
                    }
                }
            }
        }
        result
    }

    /// Returns the graph partition that `uri` backs.
    pub fn graph_of(&self, uri: &NamedNode) -> Option<&'a GraphId> {
        self.definition.graph_by_uri(uri)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::fruit_schema;
    use rdf_entity_model::{BundleId, GraphId, NamedNode, QueryError};

    #[test]
    fn default_graphs_exclude_non_candidates() {
        let schema = fruit_schema();
        let catalog = schema.entity_type("rdf_entity").unwrap().catalog();
        assert_eq!(catalog.default_graph_ids(), ["default", "draft"]);
        assert_eq!(
            catalog.graph_ids().map(GraphId::as_str).collect::<Vec<_>>(),
            ["default", "draft", "foo"]
        );
    }

    #[test]
    fn explicit_graphs_keep_their_order() {
        let schema = fruit_schema();
        let catalog = schema.entity_type("rdf_entity").unwrap().catalog();
        let resolved = catalog
            .resolve(Some(&[GraphId::new("foo"), GraphId::new("default"), GraphId::new("foo")]))
            .unwrap();
        assert_eq!(resolved, ["foo", "default"]);
    }

    #[test]
    fn unknown_explicit_graph() {
        let schema = fruit_schema();
        let catalog = schema.entity_type("rdf_entity").unwrap().catalog();
        let result = catalog.resolve(Some(&[GraphId::new("archive")]));
        assert!(matches!(result, Err(QueryError::GraphNotFound { graph, .. }) if graph == "archive"));
    }

    #[test]
    fn graph_uris_respect_bundles() {
        let schema = fruit_schema();
        let catalog = schema.entity_type("rdf_entity").unwrap().catalog();
        let graphs = [GraphId::new("default"), GraphId::new("foo")];

        let all = catalog.graph_uris(&graphs, None);
        assert_eq!(
            all.iter().map(NamedNode::as_str).collect::<Vec<_>>(),
            [
                "http://example.com/fruit/published",
                "http://example.com/vegetable/published",
                "http://example.com/fruit/foo",
            ]
        );

        let vegetables = catalog.graph_uris(&graphs, Some(&[BundleId::new("vegetable")]));
        assert_eq!(
            vegetables.iter().map(NamedNode::as_str).collect::<Vec<_>>(),
            ["http://example.com/vegetable/published"]
        );
    }

    #[test]
    fn descriptors_and_reverse_lookup() {
        let schema = fruit_schema();
        let catalog = schema.entity_type("rdf_entity").unwrap().catalog();
        let descriptors = catalog.descriptors(&BundleId::new("fruit")).unwrap();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[2].id, "foo");
        assert_eq!(descriptors[2].weight, 10);
        assert!(!descriptors[2].is_default_candidate);

        let uri = NamedNode::new_unchecked("http://example.com/vegetable/draft");
        assert_eq!(catalog.graph_of(&uri).map(GraphId::as_str), Some("draft"));
    }
}
