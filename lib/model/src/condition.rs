use crate::{ColumnName, FieldName, QueryError};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A comparison operator of a [Condition].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    In,
    NotIn,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Exists,
    NotExists,
    Contains,
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    Between,
    NotBetween,
}

impl Operator {
    /// Returns whether the operator requires a list value.
    pub fn requires_list(self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::Between | Operator::NotBetween
        )
    }

    /// Returns whether the operator ignores the value of the condition.
    pub fn is_existence_check(self) -> bool {
        matches!(self, Operator::Exists | Operator::NotExists)
    }

    /// Returns whether the operator is allowed on the id or the bundle key.
    pub fn is_key_operator(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::In
                | Operator::NotIn
                | Operator::Lt
                | Operator::Gt
                | Operator::LtEq
                | Operator::GtEq
        )
    }

    /// Returns the SPARQL relational operator, if this is a plain comparison.
    pub fn relational_symbol(self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::NotEq => Some("!="),
            Operator::Lt => Some("<"),
            Operator::Gt => Some(">"),
            Operator::LtEq => Some("<="),
            Operator::GtEq => Some(">="),
            _ => None,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LtEq => "<=",
            Operator::GtEq => ">=",
            Operator::Exists => "EXISTS",
            Operator::NotExists => "NOT EXISTS",
            Operator::Contains => "CONTAINS",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        };
        f.write_str(name)
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let operator = match normalized.as_str() {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::LtEq,
            ">=" => Operator::GtEq,
            "EXISTS" | "IS NOT NULL" => Operator::Exists,
            "NOT EXISTS" | "IS NULL" => Operator::NotExists,
            "CONTAINS" => Operator::Contains,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "STARTS_WITH" | "STARTS WITH" => Operator::StartsWith,
            "ENDS_WITH" | "ENDS WITH" => Operator::EndsWith,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            _ => return Err(QueryError::UnknownOperator(value.to_owned())),
        };
        Ok(operator)
    }
}

/// The value a [Condition] compares against.
///
/// Values are kept in their lexical form. The storage mapping of the field decides how they are
/// serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConditionValue {
    /// No value. Only valid for existence checks.
    #[default]
    Null,
    /// A single value.
    Scalar(String),
    /// A list of values for operators such as `IN` or `BETWEEN`.
    List(Vec<String>),
}

impl ConditionValue {
    /// Returns whether the value is [ConditionValue::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, ConditionValue::Null)
    }

    /// Returns whether the value is [ConditionValue::List].
    pub fn is_list(&self) -> bool {
        matches!(self, ConditionValue::List(_))
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Scalar(value.to_owned())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::Scalar(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Scalar(value.to_string())
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        ConditionValue::Scalar(value.to_string())
    }
}

impl<T: Into<String>> From<Vec<T>> for ConditionValue {
    fn from(values: Vec<T>) -> Self {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<String>, const N: usize> From<[T; N]> for ConditionValue {
    fn from(values: [T; N]) -> Self {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ConditionValue>> From<Option<T>> for ConditionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ConditionValue::Null, Into::into)
    }
}

/// A leaf of a condition tree that compares one field against a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Condition {
    /// The field that is compared.
    pub field: FieldName,
    /// The column of the field. If `None`, the main column of the field is used.
    pub column: Option<ColumnName>,
    pub operator: Operator,
    pub value: ConditionValue,
    /// Restricts the comparison to values of a single language.
    pub language: Option<String>,
}

impl Condition {
    /// Creates a new [Condition].
    pub fn new(
        field: impl Into<FieldName>,
        value: impl Into<ConditionValue>,
        operator: Operator,
    ) -> Self {
        Self {
            field: field.into(),
            column: None,
            operator,
            value: value.into(),
            language: None,
        }
    }

    /// Creates a new [Condition] choosing the operator from the value: `IN` for lists and `=`
    /// otherwise.
    pub fn implicit(field: impl Into<FieldName>, value: impl Into<ConditionValue>) -> Self {
        let value = value.into();
        let operator = if value.is_list() {
            Operator::In
        } else {
            Operator::Eq
        };
        Self::new(field, value, operator)
    }

    /// Targets the given `column` instead of the main column of the field.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<ColumnName>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Restricts the condition to values in the given language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// How the children of a [ConditionGroup] are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Display for Conjunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Conjunction::And => f.write_str("AND"),
            Conjunction::Or => f.write_str("OR"),
        }
    }
}

/// A group of conditions joined by a [Conjunction].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConditionGroup {
    pub conjunction: Conjunction,
    pub children: Vec<ConditionNode>,
}

impl ConditionGroup {
    /// Creates an empty group that requires all children to match.
    pub fn and() -> Self {
        Self {
            conjunction: Conjunction::And,
            children: Vec::new(),
        }
    }

    /// Creates an empty group that requires any child to match.
    pub fn or() -> Self {
        Self {
            conjunction: Conjunction::Or,
            children: Vec::new(),
        }
    }

    /// Appends a [Condition] to the group.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.children.push(ConditionNode::Leaf(condition));
        self
    }

    /// Appends a nested group.
    #[must_use]
    pub fn group(mut self, group: ConditionGroup) -> Self {
        self.children.push(ConditionNode::Group(group));
        self
    }

    /// Appends any [ConditionNode].
    pub fn push(&mut self, node: impl Into<ConditionNode>) {
        self.children.push(node.into());
    }

    /// Returns whether the group has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A node of a condition tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConditionNode {
    Leaf(Condition),
    Group(ConditionGroup),
}

impl From<Condition> for ConditionNode {
    fn from(value: Condition) -> Self {
        ConditionNode::Leaf(value)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(value: ConditionGroup) -> Self {
        ConditionNode::Group(value)
    }
}

/// The direction of a [SortKey].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Returns the SPARQL order modifier.
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Ascending),
            "DESC" => Ok(SortDirection::Descending),
            _ => Err(QueryError::InvalidSortDirection(value.to_owned())),
        }
    }
}

/// Orders the results of an entity query by a field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: FieldName,
    pub column: Option<ColumnName>,
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates a new [SortKey] on the main column of `field`.
    pub fn new(field: impl Into<FieldName>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            column: None,
            direction,
        }
    }

    /// Sorts by the given `column` instead of the main column of the field.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<ColumnName>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// A window into the result sequence of an entity query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Paging {
    pub offset: u64,
    pub limit: u64,
}

impl Paging {
    /// Creates a window of `length` results starting at `start`.
    pub fn range(start: u64, length: u64) -> Self {
        Self {
            offset: start,
            limit: length,
        }
    }

    /// Creates a window for the 0-based `page` of `length` results each.
    pub fn page(page: u64, length: u64) -> Self {
        Self {
            offset: page.saturating_mul(length),
            limit: length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_operators() {
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!("not  in".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!("STARTS_WITH".parse::<Operator>().unwrap(), Operator::StartsWith);
        assert!(matches!(
            "~=".parse::<Operator>(),
            Err(QueryError::UnknownOperator(_))
        ));
    }

    #[test]
    fn parse_sort_direction() {
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert!(matches!(
            "UP".parse::<SortDirection>(),
            Err(QueryError::InvalidSortDirection(direction)) if direction == "UP"
        ));
    }

    #[test]
    fn implicit_operator() {
        assert_eq!(Condition::implicit("id", ["a", "b"]).operator, Operator::In);
        assert_eq!(Condition::implicit("id", "a").operator, Operator::Eq);
    }

    #[test]
    fn paging_from_page() {
        assert_eq!(Paging::page(3, 10), Paging::range(30, 10));
    }
}
