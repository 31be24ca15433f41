use crate::fragment::{QueryFragment, Statement};
use crate::serializer::{serialize_literal, serialize_resource, serialize_string, to_variable};
use chrono::{DateTime, SecondsFormat};
use itertools::Itertools;
use rdf_entity_model::vocab::xsd;
use rdf_entity_model::{
    BundleId, Condition, ConditionGroup, ConditionNode, ConditionValue, Conjunction, FieldType,
    Operator, QueryError, ValueFormat, VARIABLE_SEPARATOR,
};
use rdf_entity_schema::{EntityTypeDefinition, ResolvedMapping};
use std::borrow::Cow;

/// The variable that binds the entities of a query.
pub const ENTITY_VARIABLE: &str = "?entity";
/// The variable that binds the type URI of an entity.
pub const BUNDLE_VARIABLE: &str = "?bundle";
/// Binds the type predicate if there are several. The empty middle part keeps it apart from the
/// variables of fields.
const TYPE_PREDICATE_VARIABLE: &str = "?bundle\u{B7}\u{B7}predicate";

/// Compiles condition trees of one entity type into [QueryFragment]s.
///
/// Compilation is a pure function of the tree and the schema snapshot. The compiler holds no
/// state between calls.
#[derive(Clone, Copy, Debug)]
pub struct ConditionCompiler<'a> {
    definition: &'a EntityTypeDefinition,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(definition: &'a EntityTypeDefinition) -> Self {
        Self { definition }
    }

    /// Compiles `tree` into a fragment that binds `?entity`.
    ///
    /// If no condition of the tree restricts the bundle, the fragment starts with the default
    /// pattern that binds `?entity` to any bundle of the entity type.
    pub fn compile(&self, tree: &ConditionNode) -> Result<QueryFragment, QueryError> {
        let mut fragment = self.compile_node(tree)?;
        if !fragment.is_anchored() {
            fragment.anchor_with(self.default_pattern());
        }
        Ok(fragment)
    }

    /// Returns the bundles that a top-level `=` or `IN` condition on the bundle key restricts
    /// the result to. Multiple such conditions intersect.
    pub fn top_level_bundles(&self, tree: &ConditionNode) -> Option<Vec<BundleId>> {
        let leaves = match tree {
            ConditionNode::Leaf(condition) => vec![condition],
            ConditionNode::Group(group) if group.conjunction == Conjunction::And => group
                .children
                .iter()
                .filter_map(|child| match child {
                    ConditionNode::Leaf(condition) => Some(condition),
                    ConditionNode::Group(_) => None,
                })
                .collect(),
            ConditionNode::Group(_) => Vec::new(),
        };

        let bundle_key = &self.definition.schema().bundle_key;
        let mut result: Option<Vec<BundleId>> = None;
        for condition in leaves {
            if condition.field != *bundle_key
                || !matches!(condition.operator, Operator::Eq | Operator::In)
            {
                continue;
            }
            let bundles = match &condition.value {
                ConditionValue::Null => continue,
                ConditionValue::Scalar(value) => vec![BundleId::new(value.as_str())],
                ConditionValue::List(values) => {
                    values.iter().map(|v| BundleId::new(v.as_str())).collect()
                }
            };
            result = Some(match result {
                None => bundles,
                Some(previous) => previous
                    .into_iter()
                    .filter(|bundle| bundles.contains(bundle))
                    .collect(),
            });
        }
        result
    }

    fn compile_node(&self, node: &ConditionNode) -> Result<QueryFragment, QueryError> {
        match node {
            ConditionNode::Leaf(condition) => self.compile_leaf(condition),
            ConditionNode::Group(group) => self.compile_group(group),
        }
    }

    fn compile_group(&self, group: &ConditionGroup) -> Result<QueryFragment, QueryError> {
        let mut children = group
            .children
            .iter()
            .map(|child| self.compile_node(child))
            .filter_ok(|fragment| !fragment.is_empty())
            .collect::<Result<Vec<_>, _>>()?;

        match group.conjunction {
            Conjunction::And => {
                let mut result = QueryFragment::default();
                for child in children {
                    result.append(child);
                }
                Ok(result)
            }
            Conjunction::Or if children.len() <= 1 => Ok(children.pop().unwrap_or_default()),
            Conjunction::Or => {
                // Every branch must bind ?entity on its own.
                let branches = children
                    .into_iter()
                    .map(|mut branch| {
                        if !branch.is_anchored() {
                            branch.anchor_with(self.default_pattern());
                        }
                        branch.into_statements()
                    })
                    .collect();
                Ok(QueryFragment::new(vec![Statement::Union(branches)], true))
            }
        }
    }

    fn compile_leaf(&self, condition: &Condition) -> Result<QueryFragment, QueryError> {
        let schema = self.definition.schema();
        if condition.field == schema.id_key {
            return self.compile_id_condition(condition);
        }
        if condition.field == schema.bundle_key {
            return self.compile_bundle_condition(condition);
        }

        let mapping = match self.definition.mappings().resolve(
            &condition.field,
            condition.column.as_ref(),
            None,
        ) {
            Ok(mapping) => mapping,
            Err(QueryError::UnmappedField { field, column, .. }) => {
                tracing::debug!("Ignoring condition on unmapped field {field}.{column}");
                return Ok(QueryFragment::default());
            }
            Err(error) => return Err(error),
        };
        check_value(condition.operator, &condition.value)?;
        FieldConditionCompiler::new(condition, &mapping).compile()
    }

    fn compile_id_condition(&self, condition: &Condition) -> Result<QueryFragment, QueryError> {
        let statement = match key_comparison(condition)? {
            KeyComparison::In(ids) => {
                let ids = ids
                    .into_iter()
                    .map(serialize_resource)
                    .collect::<Result<Vec<_>, _>>()?;
                Statement::values(ENTITY_VARIABLE, ids)
            }
            KeyComparison::NotIn(ids) => {
                let ids = ids
                    .into_iter()
                    .map(serialize_resource)
                    .collect::<Result<Vec<_>, _>>()?;
                Statement::filter(format!("{ENTITY_VARIABLE} NOT IN ({})", ids.join(", ")))
            }
            KeyComparison::Relational(symbol, id) => Statement::filter(format!(
                "STR({ENTITY_VARIABLE}) {symbol} {}",
                serialize_string(id)
            )),
        };
        Ok(QueryFragment::new(vec![statement], false))
    }

    fn compile_bundle_condition(&self, condition: &Condition) -> Result<QueryFragment, QueryError> {
        let mut statements = self.type_pattern();
        match key_comparison(condition)? {
            KeyComparison::In(bundles) => {
                let uris = self.bundle_uris(&bundles)?;
                statements.push(Statement::values(BUNDLE_VARIABLE, uris));
            }
            KeyComparison::NotIn(bundles) => {
                let uris = self.bundle_uris(&bundles)?;
                statements.push(Statement::values(BUNDLE_VARIABLE, self.all_bundle_uris()));
                if !uris.is_empty() {
                    statements.push(Statement::filter(format!(
                        "{BUNDLE_VARIABLE} NOT IN ({})",
                        uris.join(", ")
                    )));
                }
            }
            KeyComparison::Relational(symbol, bundle) => {
                let uri = self.definition.bundle(bundle)?.uri.as_str();
                statements.push(Statement::values(BUNDLE_VARIABLE, self.all_bundle_uris()));
                statements.push(Statement::filter(format!(
                    "STR({BUNDLE_VARIABLE}) {symbol} {}",
                    serialize_string(uri)
                )));
            }
        }
        Ok(QueryFragment::new(statements, true))
    }

    fn bundle_uris(&self, bundles: &[&str]) -> Result<Vec<String>, QueryError> {
        let bundles = bundles.iter().map(|b| BundleId::new(*b)).collect::<Vec<_>>();
        Ok(self
            .definition
            .mappings()
            .bundles_to_uris(&bundles)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    fn all_bundle_uris(&self) -> Vec<String> {
        self.definition
            .mappings()
            .all_bundle_uris()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Binds `?bundle` to the objects of the type predicates of `?entity`.
    fn type_pattern(&self) -> Vec<Statement> {
        match self.definition.schema().type_predicates.as_slice() {
            [predicate] => vec![Statement::triple(
                ENTITY_VARIABLE,
                predicate.to_string(),
                BUNDLE_VARIABLE,
            )],
            predicates => {
                vec![
                    Statement::triple(ENTITY_VARIABLE, TYPE_PREDICATE_VARIABLE, BUNDLE_VARIABLE),
                    Statement::values(
                        TYPE_PREDICATE_VARIABLE,
                        predicates.iter().map(ToString::to_string).collect(),
                    ),
                ]
            }
        }
    }

    /// The pattern that restricts `?entity` to the bundles of the entity type.
    pub fn default_pattern(&self) -> Vec<Statement> {
        let mut pattern = self.type_pattern();
        pattern.push(Statement::values(BUNDLE_VARIABLE, self.all_bundle_uris()));
        pattern
    }
}

/// Checks that the shape of `value` fits `operator`.
pub fn check_value(operator: Operator, value: &ConditionValue) -> Result<(), QueryError> {
    if operator.is_existence_check() {
        return Ok(());
    }
    match value {
        ConditionValue::Null => QueryError::unsupported_value(operator, "a value is required"),
        ConditionValue::Scalar(_) if operator.requires_list() => {
            QueryError::unsupported_value(operator, "a list of values is required")
        }
        ConditionValue::List(_) if !operator.requires_list() => {
            QueryError::unsupported_value(operator, "lists of values are not supported")
        }
        ConditionValue::List(values)
            if matches!(operator, Operator::Between | Operator::NotBetween) && values.len() != 2 =>
        {
            QueryError::unsupported_value(operator, "exactly two values are required")
        }
        ConditionValue::Scalar(_) | ConditionValue::List(_) => Ok(()),
    }
}

/// A condition on the id or the bundle key after `=` has been rewritten to `IN` and `!=` to
/// `NOT IN`.
enum KeyComparison<'c> {
    In(Vec<&'c str>),
    NotIn(Vec<&'c str>),
    Relational(&'static str, &'c str),
}

fn key_comparison(condition: &Condition) -> Result<KeyComparison<'_>, QueryError> {
    let operator = condition.operator;
    if !operator.is_key_operator() {
        return Err(QueryError::InvalidKeyOperator {
            field: condition.field.clone(),
            operator,
        });
    }
    if condition.value.is_null() {
        return Err(QueryError::NullKeyValue {
            field: condition.field.clone(),
        });
    }
    check_value(operator, &condition.value)?;

    let values = match &condition.value {
        ConditionValue::Scalar(value) => vec![value.as_str()],
        ConditionValue::List(values) => values.iter().map(String::as_str).collect(),
        ConditionValue::Null => Vec::new(),
    };
    let comparison = match operator {
        Operator::Eq | Operator::In => KeyComparison::In(values),
        Operator::NotEq | Operator::NotIn => KeyComparison::NotIn(values),
        _ => {
            let symbol =
                operator
                    .relational_symbol()
                    .ok_or_else(|| QueryError::InvalidKeyOperator {
                        field: condition.field.clone(),
                        operator,
                    })?;
            let value = values.first().copied().unwrap_or_default();
            KeyComparison::Relational(symbol, value)
        }
    };
    Ok(comparison)
}

/// Compiles a single condition on a mapped field.
struct FieldConditionCompiler<'c> {
    condition: &'c Condition,
    mapping: &'c ResolvedMapping,
    /// The language of the condition if the column is language-tagged.
    language: Option<&'c str>,
    variable: String,
}

impl<'c> FieldConditionCompiler<'c> {
    fn new(condition: &'c Condition, mapping: &'c ResolvedMapping) -> Self {
        let language = match mapping.format {
            ValueFormat::LanguageTaggedLiteral => condition.language.as_deref(),
            _ => None,
        };
        Self {
            condition,
            mapping,
            language,
            variable: to_variable(&mapping.field_column.variable_name(), false),
        }
    }

    fn compile(&self) -> Result<QueryFragment, QueryError> {
        let variable = self.variable.as_str();
        let mut statements = Vec::new();
        match self.condition.operator {
            Operator::Eq if !self.compares_lexical_form() => {
                let value = self.term(self.scalar())?;
                statements.extend(self.field_pattern(variable, value));
            }
            Operator::In if !self.compares_lexical_form() => {
                statements.extend(self.field_pattern(variable, variable.to_owned()));
                statements.push(Statement::values(variable, self.terms()?));
            }
            Operator::Eq | Operator::NotEq => {
                let symbol = if self.condition.operator == Operator::Eq {
                    "="
                } else {
                    "!="
                };
                let (left, right) = self.comparison(self.compares_lexical_form(), self.scalar())?;
                statements.extend(self.field_pattern(variable, variable.to_owned()));
                statements.push(Statement::filter(format!("{left} {symbol} {right}")));
            }
            Operator::In | Operator::NotIn => {
                let keyword = if self.condition.operator == Operator::In {
                    "IN"
                } else {
                    "NOT IN"
                };
                let lexical = self.compares_lexical_form();
                let left = self.operand(lexical);
                let values = if lexical {
                    self.values().iter().map(|v| serialize_string(v)).collect()
                } else {
                    self.terms()?
                };
                statements.extend(self.field_pattern(variable, variable.to_owned()));
                statements.push(Statement::filter(format!(
                    "{left} {keyword} ({})",
                    values.join(", ")
                )));
            }
            Operator::Lt | Operator::Gt | Operator::LtEq | Operator::GtEq => {
                let symbol = self.condition.operator.relational_symbol().unwrap_or("=");
                let (left, right) = self.comparison(self.compares_string_form(), self.scalar())?;
                statements.extend(self.field_pattern(variable, variable.to_owned()));
                statements.push(Statement::filter(format!("{left} {symbol} {right}")));
            }
            Operator::Between | Operator::NotBetween => {
                let values = self.values();
                let (low, high) = match values.as_slice() {
                    [low, high] => (*low, *high),
                    _ => {
                        return QueryError::unsupported_value(
                            self.condition.operator,
                            "exactly two values are required",
                        )
                    }
                };
                let string_form = self.compares_string_form();
                let (left, low) = self.comparison(string_form, low)?;
                let (_, high) = self.comparison(string_form, high)?;
                let expression = if self.condition.operator == Operator::Between {
                    format!("{left} >= {low} && {left} <= {high}")
                } else {
                    format!("{left} < {low} || {left} > {high}")
                };
                statements.extend(self.field_pattern(variable, variable.to_owned()));
                statements.push(Statement::filter(expression));
            }
            Operator::Contains
            | Operator::Like
            | Operator::NotLike
            | Operator::StartsWith
            | Operator::EndsWith => {
                let (function, needle) = match self.condition.operator {
                    Operator::Contains => ("CONTAINS", self.scalar()),
                    Operator::StartsWith => ("STRSTARTS", self.scalar()),
                    Operator::EndsWith => ("STRENDS", self.scalar()),
                    _ => like_function(self.scalar()),
                };
                let negation = if self.condition.operator == Operator::NotLike {
                    "!"
                } else {
                    ""
                };
                statements.extend(self.field_pattern(variable, variable.to_owned()));
                statements.push(Statement::filter(format!(
                    "{negation}{function}(LCASE(STR({variable})), LCASE(STR({})))",
                    serialize_string(needle)
                )));
            }
            Operator::Exists | Operator::NotExists => {
                let exists_variable = format!("{variable}{VARIABLE_SEPARATOR}exists");
                let mut pattern = self.field_pattern(&exists_variable, exists_variable.clone());
                if let Some(language) = self.language {
                    pattern.push(language_filter(&exists_variable, language));
                }
                statements.push(Statement::Exists {
                    negated: self.condition.operator == Operator::NotExists,
                    pattern,
                });
                return Ok(QueryFragment::new(statements, false));
            }
        }

        // `=` and `IN` embed the language in the literals.
        let embeds_language = matches!(self.condition.operator, Operator::Eq | Operator::In);
        if let (Some(language), false) = (self.language, embeds_language) {
            statements.push(language_filter(variable, language));
        }
        Ok(QueryFragment::new(statements, false))
    }

    /// Binds `object` to the column of `?entity`. Ambiguous mappings bind the predicate through
    /// a `VALUES` block.
    fn field_pattern(&self, variable: &str, object: String) -> Vec<Statement> {
        match self.mapping.single_predicate() {
            Some(predicate) => vec![Statement::triple(
                ENTITY_VARIABLE,
                predicate.to_string(),
                object,
            )],
            None => {
                let predicate_variable = format!("{variable}{VARIABLE_SEPARATOR}predicate");
                vec![
                    Statement::triple(ENTITY_VARIABLE, predicate_variable.clone(), object),
                    Statement::values(
                        predicate_variable,
                        self.mapping
                            .predicates
                            .iter()
                            .map(ToString::to_string)
                            .collect(),
                    ),
                ]
            }
        }
    }

    /// Language-tagged columns compared without a language match on the lexical form.
    fn compares_lexical_form(&self) -> bool {
        self.mapping.format == ValueFormat::LanguageTaggedLiteral && self.language.is_none()
    }

    /// Ordering comparisons on IRIs and language-tagged literals use the string form.
    fn compares_string_form(&self) -> bool {
        matches!(
            self.mapping.format,
            ValueFormat::Resource | ValueFormat::LanguageTaggedLiteral
        )
    }

    fn operand(&self, string_form: bool) -> String {
        if string_form {
            format!("STR({})", self.variable)
        } else {
            self.variable.clone()
        }
    }

    fn comparison(&self, string_form: bool, value: &str) -> Result<(String, String), QueryError> {
        let right = if string_form {
            serialize_string(&self.normalize(value))
        } else {
            self.term(value)?
        };
        Ok((self.operand(string_form), right))
    }

    fn term(&self, value: &str) -> Result<String, QueryError> {
        serialize_literal(&self.normalize(value), &self.mapping.format, self.language)
    }

    fn terms(&self) -> Result<Vec<String>, QueryError> {
        self.values().into_iter().map(|v| self.term(v)).collect()
    }

    fn scalar(&self) -> &'c str {
        match &self.condition.value {
            ConditionValue::Scalar(value) => value,
            ConditionValue::List(_) | ConditionValue::Null => "",
        }
    }

    fn values(&self) -> Vec<&'c str> {
        match &self.condition.value {
            ConditionValue::List(values) => values.iter().map(String::as_str).collect(),
            ConditionValue::Scalar(value) => vec![value.as_str()],
            ConditionValue::Null => Vec::new(),
        }
    }

    /// Converts Unix timestamps compared against `xsd:dateTime` columns.
    fn normalize<'v>(&self, value: &'v str) -> Cow<'v, str> {
        let is_date_time = self
            .mapping
            .format
            .datatype()
            .is_some_and(|datatype| datatype.as_ref() == xsd::DATE_TIME);
        if self.mapping.field_type != FieldType::Timestamp || !is_date_time {
            return Cow::Borrowed(value);
        }
        value
            .parse::<i64>()
            .ok()
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
            .map_or(Cow::Borrowed(value), |date_time| {
                Cow::Owned(date_time.to_rfc3339_opts(SecondsFormat::Secs, true))
            })
    }
}

fn language_filter(variable: &str, language: &str) -> Statement {
    Statement::filter(format!(
        "LANG({variable}) = {}",
        serialize_string(&language.to_ascii_lowercase())
    ))
}

/// Maps a `LIKE` pattern with leading and/or trailing `%` wildcards to a string function.
fn like_function(pattern: &str) -> (&'static str, &str) {
    let leading = pattern.starts_with('%');
    let inner = pattern.strip_prefix('%').unwrap_or(pattern);
    let trailing = inner.ends_with('%');
    let inner = inner.strip_suffix('%').unwrap_or(inner);
    let function = match (leading, trailing) {
        (false, true) => "STRSTARTS",
        (true, false) => "STRENDS",
        (true, true) | (false, false) => "CONTAINS",
    };
    (function, inner)
}

#[cfg(test)]
#[allow(clippy::non_ascii_literal, reason = "Variables use the middle dot separator")]
mod tests {
    use super::*;
    use crate::test_fixtures::fruit_schema;
    use insta::assert_snapshot;
    use rdf_entity_schema::Schema;

    fn compile(schema: &Schema, tree: impl Into<ConditionNode>) -> Result<String, QueryError> {
        let definition = schema.entity_type("rdf_entity").unwrap();
        ConditionCompiler::new(definition)
            .compile(&tree.into())
            .map(|fragment| fragment.to_string())
    }

    #[test]
    fn empty_tree_is_anchored() {
        let schema = fruit_schema();
        let fragment = compile(&schema, ConditionGroup::and()).unwrap();
        assert_snapshot!(fragment, @r"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ");
    }

    #[test]
    fn id_equality_is_rewritten_to_in() {
        let schema = fruit_schema();
        let equality = compile(
            &schema,
            Condition::new("id", "http://fruit.example.com/001", Operator::Eq),
        )
        .unwrap();
        let membership = compile(
            &schema,
            Condition::new("id", ["http://fruit.example.com/001"], Operator::In),
        )
        .unwrap();
        assert_eq!(equality, membership);
        assert_snapshot!(equality, @r"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        VALUES ?entity { <http://fruit.example.com/001> }
        ");
    }

    #[test]
    fn id_not_equal_and_relational() {
        let schema = fruit_schema();
        let tree = ConditionGroup::and()
            .condition(Condition::new("id", "http://fruit.example.com/001", Operator::NotEq))
            .condition(Condition::new("id", "http://fruit.example.com/005", Operator::Lt));
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        FILTER (?entity NOT IN (<http://fruit.example.com/001>))
        FILTER (STR(?entity) < "http://fruit.example.com/005")
        "#);
    }

    #[test]
    fn bundle_condition_anchors_subject() {
        let schema = fruit_schema();
        let tree = ConditionGroup::and()
            .condition(Condition::new("type", "fruit", Operator::Eq))
            .condition(Condition::new("text", "p", Operator::Contains));
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> }
        ?entity <http://example.com/text> ?text·value .
        FILTER (CONTAINS(LCASE(STR(?text·value)), LCASE(STR("p"))))
        "#);
    }

    #[test]
    fn type_predicate_variable_is_reserved() {
        let json = include_str!("../../schema/testdata/fruit.json")
            .replace(
                r#""type_predicates": ["http://www.w3.org/1999/02/22-rdf-syntax-ns#type"]"#,
                r#""type_predicates": ["http://www.w3.org/1999/02/22-rdf-syntax-ns#type", "http://schema.org/additionalType"]"#,
            )
            .replace(
                r#""fields": {"#,
                r#""fields": { "bundle": { "columns": { "predicate": { "format": "literal", "predicate": "http://example.com/bundle_predicate" } } },"#,
            );
        let schema = Schema::from_json(&json, 1).unwrap();
        let tree = Condition::new("bundle", "p", Operator::Contains).with_column("predicate");
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity ?bundle··predicate ?bundle .
        VALUES ?bundle··predicate { <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/additionalType> }
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ?entity <http://example.com/bundle_predicate> ?bundle·predicate .
        FILTER (CONTAINS(LCASE(STR(?bundle·predicate)), LCASE(STR("p"))))
        "#);
    }

    #[test]
    fn bundle_not_in_keeps_known_bundles() {
        let schema = fruit_schema();
        let tree = Condition::new("type", "fruit", Operator::NotEq);
        assert_snapshot!(compile(&schema, tree).unwrap(), @r"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        FILTER (?bundle NOT IN (<http://example.com/fruit>))
        ");
    }

    #[test]
    fn ambiguous_mapping_uses_values() {
        let schema = fruit_schema();
        let tree = Condition::new("color", "http://example.com/red", Operator::Eq);
        let fragment = compile(&schema, tree).unwrap();
        assert!(!fragment.contains("?entity <http://example.com/color>"));
        assert!(!fragment.contains("?entity <http://example.com/vegetable_color>"));
        assert_snapshot!(fragment, @r"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ?entity ?color·value·predicate <http://example.com/red> .
        VALUES ?color·value·predicate { <http://example.com/color> <http://example.com/vegetable_color> }
        ");
    }

    #[test]
    fn or_branches_anchor_independently() {
        let schema = fruit_schema();
        let tree = ConditionGroup::or()
            .condition(Condition::new("type", "vegetable", Operator::Eq))
            .condition(Condition::new("label", "Apple", Operator::Eq).with_language("en"));
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        {
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/vegetable> }
        }
        UNION
        {
          ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
          VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
          ?entity <http://www.w3.org/2000/01/rdf-schema#label> "Apple"@en .
        }
        "#);
    }

    #[test]
    fn unmapped_fields_are_dropped() {
        let schema = fruit_schema();
        let tree = ConditionGroup::and()
            .condition(Condition::new("price", "5", Operator::Eq))
            .condition(Condition::new("weight", "100", Operator::Gt));
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ?entity <http://example.com/weight> ?weight·value .
        FILTER (?weight·value > "100"^^<http://www.w3.org/2001/XMLSchema#integer>)
        "#);
    }

    #[test]
    fn language_tagged_columns() {
        let schema = fruit_schema();
        let tree = ConditionGroup::and()
            .condition(Condition::new("label", "Apple", Operator::Eq))
            .condition(Condition::new("label", "A", Operator::StartsWith).with_language("EN"));
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ?entity <http://www.w3.org/2000/01/rdf-schema#label> ?label·value .
        FILTER (STR(?label·value) = "Apple")
        ?entity <http://www.w3.org/2000/01/rdf-schema#label> ?label·value .
        FILTER (STRSTARTS(LCASE(STR(?label·value)), LCASE(STR("A"))))
        FILTER (LANG(?label·value) = "en")
        "#);
    }

    #[test]
    fn in_between_and_exists() {
        let schema = fruit_schema();
        let tree = ConditionGroup::and()
            .condition(Condition::implicit("origin", ["Spain", "Italy"]))
            .condition(Condition::new("weight", ["100", "200"], Operator::NotBetween))
            .condition(Condition::new("text", ConditionValue::Null, Operator::NotExists));
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ?entity <http://example.com/origin> ?origin·value .
        VALUES ?origin·value { "Spain" "Italy" }
        ?entity <http://example.com/weight> ?weight·value .
        FILTER (?weight·value < "100"^^<http://www.w3.org/2001/XMLSchema#integer> || ?weight·value > "200"^^<http://www.w3.org/2001/XMLSchema#integer>)
        FILTER NOT EXISTS {
          ?entity <http://example.com/text> ?text·value·exists .
        }
        "#);
    }

    #[test]
    fn like_patterns() {
        assert_eq!(like_function("%pe%"), ("CONTAINS", "pe"));
        assert_eq!(like_function("pe%"), ("STRSTARTS", "pe"));
        assert_eq!(like_function("%pe"), ("STRENDS", "pe"));
        assert_eq!(like_function("pe"), ("CONTAINS", "pe"));
    }

    #[test]
    fn timestamps_are_converted_for_date_time_columns() {
        let schema = fruit_schema();
        let tree = Condition::new("created", 1_483_228_800_i64, Operator::GtEq);
        assert_snapshot!(compile(&schema, tree).unwrap(), @r#"
        ?entity <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?bundle .
        VALUES ?bundle { <http://example.com/fruit> <http://example.com/vegetable> }
        ?entity <http://purl.org/dc/terms/created> ?created·value .
        FILTER (?created·value >= "2017-01-01T00:00:00Z"^^<http://www.w3.org/2001/XMLSchema#dateTime>)
        "#);
    }

    #[test]
    fn key_errors() {
        let schema = fruit_schema();
        let invalid_operator = compile(&schema, Condition::new("id", "x", Operator::Contains));
        assert!(matches!(
            invalid_operator,
            Err(QueryError::InvalidKeyOperator { operator: Operator::Contains, .. })
        ));

        let null = compile(&schema, Condition::new("type", ConditionValue::Null, Operator::Eq));
        assert!(matches!(null, Err(QueryError::NullKeyValue { .. })));

        let scalar_in = compile(&schema, Condition::new("id", "x", Operator::In));
        assert!(matches!(
            scalar_in,
            Err(QueryError::UnsupportedOperatorValue { operator: Operator::In, .. })
        ));

        let invalid_iri = compile(&schema, Condition::new("id", "not an iri", Operator::Eq));
        assert!(matches!(invalid_iri, Err(QueryError::InvalidUri { .. })));
    }

    #[test]
    fn value_shape_errors() {
        let schema = fruit_schema();
        let list = compile(&schema, Condition::new("label", ["a", "b"], Operator::Eq));
        assert!(matches!(list, Err(QueryError::UnsupportedOperatorValue { .. })));

        let between = compile(&schema, Condition::new("weight", ["1"], Operator::Between));
        assert!(matches!(between, Err(QueryError::UnsupportedOperatorValue { .. })));

        let null = compile(&schema, Condition::new("label", ConditionValue::Null, Operator::Lt));
        assert!(matches!(null, Err(QueryError::UnsupportedOperatorValue { .. })));
    }

    #[test]
    fn top_level_bundles_intersect() {
        let schema = fruit_schema();
        let definition = schema.entity_type("rdf_entity").unwrap();
        let compiler = ConditionCompiler::new(definition);
        let tree = ConditionGroup::and()
            .condition(Condition::implicit("type", ["fruit", "vegetable"]))
            .condition(Condition::implicit("type", "fruit"))
            .group(ConditionGroup::or().condition(Condition::implicit("type", "vegetable")));
        assert_eq!(
            compiler.top_level_bundles(&tree.into()),
            Some(vec![BundleId::new("fruit")])
        );
        let unrestricted = Condition::implicit("label", "Apple");
        assert_eq!(compiler.top_level_bundles(&unrestricted.into()), None);
    }
}
