use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{Condition, FilterData, FilterOp, Logic, SortDirection, SortSpec};
use crate::database::document::{read_path, Document};
use crate::database::schema::ID_FIELD;

/// Store-agnostic query over one document kind
///
/// `base` holds equality conditions that always apply (foreign keys); the
/// caller-supplied `conditions` are combined with `logic` and ANDed onto it.
#[derive(Debug, Clone)]
pub struct Filter {
    kind: String,
    base: Map<String, Value>,
    conditions: Vec<Condition>,
    logic: Logic,
    skip: u64,
    limit: Option<u64>,
    sort: Vec<SortSpec>,
}

impl Filter {
    pub fn new(kind: impl Into<String>) -> Result<Self, FilterError> {
        let kind = kind.into();
        Self::validate_kind(&kind)?;
        Ok(Self {
            kind,
            base: Map::new(),
            conditions: vec![],
            logic: Logic::And,
            skip: 0,
            limit: None,
            sort: vec![],
        })
    }

    /// Equality on `_id`
    pub fn by_id(kind: impl Into<String>, id: uuid::Uuid) -> Result<Self, FilterError> {
        let mut filter = Self::new(kind)?;
        filter.base.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        Ok(filter)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn base(mut self, base: Map<String, Value>) -> Result<Self, FilterError> {
        for key in base.keys() {
            Self::validate_field(key)?;
        }
        self.base.extend(base);
        Ok(self)
    }

    pub fn and(self, conditions: Vec<Condition>) -> Result<Self, FilterError> {
        self.combine(Logic::And, conditions)
    }

    pub fn or(self, conditions: Vec<Condition>) -> Result<Self, FilterError> {
        self.combine(Logic::Or, conditions)
    }

    fn combine(mut self, logic: Logic, conditions: Vec<Condition>) -> Result<Self, FilterError> {
        for c in &conditions {
            Self::validate_field(&c.field)?;
        }
        self.logic = logic;
        self.conditions = conditions;
        Ok(self)
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: Vec<SortSpec>) -> Result<Self, FilterError> {
        for s in &sort {
            Self::validate_field(&s.field)?;
        }
        self.sort = sort;
        Ok(self)
    }

    /// Apply the `filter` list parameter
    pub fn assign(self, data: FilterData) -> Result<Self, FilterError> {
        let logic = match data.logic.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("and") => Logic::And,
            Some("or") => Logic::Or,
            Some(other) => return Err(FilterError::InvalidFilter(format!("unknown logic '{}'", other))),
        };

        let mut conditions = Vec::new();
        for condition in data.filters.into_vec() {
            match (condition.field, condition.value) {
                (Some(field), Some(value)) if !field.is_empty() && !value.is_null() => {
                    let op: FilterOp = condition.operator.as_deref().unwrap_or("eq").parse()?;
                    conditions.push(Condition::new(field, op, value));
                }
                _ => {
                    tracing::debug!("Ignoring filter condition without field or value");
                }
            }
        }

        if conditions.is_empty() {
            return Ok(self);
        }
        self.combine(logic, conditions)
    }

    /// Copy without paging or ordering, as used for counting
    pub fn unpaged(&self) -> Self {
        Self { skip: 0, limit: None, sort: vec![], ..self.clone() }
    }

    pub fn base_conditions(&self) -> &Map<String, Value> {
        &self.base
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn sort_specs(&self) -> &[SortSpec] {
        &self.sort
    }

    pub fn skip_count(&self) -> u64 {
        self.skip
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }

    /// Whether a stored document satisfies base and conditions
    pub fn matches(&self, doc: &Document) -> bool {
        let base_ok = self
            .base
            .iter()
            .all(|(field, value)| field_value(doc, field).as_ref() == Some(value));
        if !base_ok {
            return false;
        }
        if self.conditions.is_empty() {
            return true;
        }
        let mut results = self.conditions.iter().map(|c| condition_matches(doc, c));
        match self.logic {
            Logic::And => results.all(|r| r),
            Logic::Or => results.any(|r| r),
        }
    }

    /// Filter, order and page an in-memory candidate set
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if !self.sort.is_empty() {
            out.sort_by(|a, b| {
                for spec in &self.sort {
                    let ord = total_order(field_value(a, &spec.field).as_ref(), field_value(b, &spec.field).as_ref());
                    let ord = match spec.dir {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        let skipped = out.into_iter().skip(self.skip as usize);
        match self.limit {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        }
    }

    fn validate_kind(name: &str) -> Result<(), FilterError> {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidKind(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn validate_field(name: &str) -> Result<(), FilterError> {
        let ok = !name.is_empty()
            && name
                .split('.')
                .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
        if !ok {
            return Err(FilterError::InvalidField(name.to_string()));
        }
        Ok(())
    }
}

fn field_value(doc: &Document, field: &str) -> Option<Value> {
    if field == ID_FIELD {
        return Some(Value::String(doc.id().to_string()));
    }
    read_path(doc.body(), field).cloned()
}

fn condition_matches(doc: &Document, condition: &Condition) -> bool {
    let actual = field_value(doc, &condition.field);
    match condition.op {
        FilterOp::Eq => actual.as_ref() == Some(&condition.value),
        FilterOp::Ne => actual.as_ref() != Some(&condition.value),
        op => match actual.as_ref().and_then(|a| compare(a, &condition.value)) {
            Some(ord) => match op {
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Gte => ord != Ordering::Less,
                FilterOp::Lt => ord == Ordering::Less,
                FilterOp::Lte => ord != Ordering::Greater,
                FilterOp::Eq | FilterOp::Ne => unreachable!(),
            },
            None => false,
        },
    }
}

/// Comparison between values of the same type; None for mixed types
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Ordering used for sorting: nulls first, then by type, then by value
fn total_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b))),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
