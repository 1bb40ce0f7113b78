use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::error::FilterError;

/// Comparison operators accepted in list filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "IS DISTINCT FROM",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }
}

impl FromStr for FilterOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "" | "eq" => FilterOp::Eq,
            "ne" | "neq" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }
}

/// How a set of conditions combines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub dir: SortDirection,
}

/// Wire shape of the `filter` list parameter:
/// `{"logic":"and","filters":[{"field":"name","operator":"eq","value":"x"}]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub logic: Option<String>,
    #[serde(default)]
    pub filters: FilterList,
}

/// `filters` may be a single condition or a list of them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterList {
    Many(Vec<FilterCondition>),
    One(FilterCondition),
}

impl Default for FilterList {
    fn default() -> Self {
        FilterList::Many(Vec::new())
    }
}

impl FilterList {
    pub fn into_vec(self) -> Vec<FilterCondition> {
        match self {
            FilterList::Many(v) => v,
            FilterList::One(c) => vec![c],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
