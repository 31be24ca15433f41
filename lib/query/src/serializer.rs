use rdf_entity_model::{Literal, NamedNode, QueryError, ValueFormat, VARIABLE_SEPARATOR};

/// Serializes an absolute IRI as an IRI reference (`<...>`).
pub fn serialize_resource(iri: &str) -> Result<String, QueryError> {
    NamedNode::new(iri)
        .map(|node| node.to_string())
        .map_err(|error| QueryError::InvalidUri {
            iri: iri.to_owned(),
            error,
        })
}

/// Serializes a literal according to `format`.
///
/// Quotes, backslashes and line breaks are escaped, hence no value can terminate the literal
/// early. The `language` is only attached to [ValueFormat::LanguageTaggedLiteral] values; a
/// language-tagged column without a language yields a simple literal. A
/// [ValueFormat::Resource] is serialized as an IRI reference.
pub fn serialize_literal(
    value: &str,
    format: &ValueFormat,
    language: Option<&str>,
) -> Result<String, QueryError> {
    let literal = match (format, language) {
        (ValueFormat::Resource, _) => return serialize_resource(value),
        (ValueFormat::LanguageTaggedLiteral, Some(language)) => {
            Literal::new_language_tagged_literal(value, language).map_err(|error| {
                QueryError::InvalidLanguageTag {
                    tag: language.to_owned(),
                    error,
                }
            })?
        }
        (ValueFormat::TypedLiteral(datatype), _) => Literal::new_typed_literal(value, datatype.clone()),
        (ValueFormat::PlainLiteral | ValueFormat::LanguageTaggedLiteral, _) => {
            Literal::new_simple_literal(value)
        }
    };
    Ok(literal.to_string())
}

/// Serializes a simple string literal. Used for comparisons on the lexical form.
pub fn serialize_string(value: &str) -> String {
    Literal::new_simple_literal(value).to_string()
}

/// Maps an internal name to a query variable (`?name`) or a blank node label (`_:name`).
///
/// Dots (e.g., in `field.column`) are replaced with the [VARIABLE_SEPARATOR], which never occurs
/// in identifiers. Names that already carry a `?` or `_:` prefix are returned unchanged.
pub fn to_variable(name: &str, blank: bool) -> String {
    if name.starts_with('?') || name.starts_with("_:") {
        return name.to_owned();
    }
    let prefix = if blank { "_:" } else { "?" };
    let name = name.replace('.', &VARIABLE_SEPARATOR.to_string());
    format!("{prefix}{name}")
}
