use serde_json::Value;

use super::filter::Filter;
use super::types::{Condition, FilterOp, Logic};
use crate::database::schema::ID_FIELD;

/// Compiles a `Filter` into a WHERE clause over the `documents(kind, id, body)` table
///
/// Field names were validated by `Filter` and are embedded as JSONB path
/// literals; values are always bound as `jsonb` parameters.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns the clause (without `WHERE`) and its parameters, numbered after `starting_param_index`
    pub fn generate(filter: &Filter, starting_param_index: usize) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(starting_param_index);
        let clause = filter_where.build(filter);
        (clause, filter_where.param_values)
    }

    fn build(&mut self, filter: &Filter) -> String {
        let mut sql_conditions = vec![];

        for (field, value) in filter.base_conditions() {
            let condition = Condition::eq(field.clone(), value.clone());
            sql_conditions.push(self.build_sql_condition(&condition));
        }

        if !filter.conditions().is_empty() {
            let parts: Vec<String> = filter
                .conditions()
                .iter()
                .map(|c| self.build_sql_condition(c))
                .collect();
            let joined = parts.join(filter.logic().to_sql());
            sql_conditions.push(match filter.logic() {
                Logic::And => joined,
                Logic::Or => format!("({})", joined),
            });
        }

        if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        }
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> String {
        let column = Self::column(&condition.field);
        if condition.value.is_null() {
            return match condition.op {
                FilterOp::Eq => format!("({} IS NULL OR {} = 'null'::jsonb)", column, column),
                FilterOp::Ne => format!("({} IS NOT NULL AND {} <> 'null'::jsonb)", column, column),
                _ => "1=0".to_string(),
            };
        }
        let param = self.param(condition.value.clone());
        format!("{} {} {}", column, condition.op.to_sql(), param)
    }

    /// JSONB expression for a document field
    pub fn column(field: &str) -> String {
        if field == ID_FIELD {
            return "to_jsonb(id::text)".to_string();
        }
        format!("(body #> '{{{}}}')", field.split('.').collect::<Vec<_>>().join(","))
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}::jsonb", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_and_or_conditions() {
        let mut base = serde_json::Map::new();
        base.insert("owner".into(), json!("u1"));
        let filter = Filter::new("Item").unwrap()
            .base(base).unwrap()
            .or(vec![Condition::eq("name", "a"), Condition::new("rank", FilterOp::Gt, 2)])
            .unwrap();

        let (sql, params) = FilterWhere::generate(&filter, 1);
        assert_eq!(
            sql,
            "(body #> '{owner}') = $2::jsonb AND ((body #> '{name}') = $3::jsonb OR (body #> '{rank}') > $4::jsonb)"
        );
        assert_eq!(params, vec![json!("u1"), json!("a"), json!(2)]);
    }

    #[test]
    fn nested_paths_and_id() {
        assert_eq!(FilterWhere::column("complex.subdoc"), "(body #> '{complex,subdoc}')");
        assert_eq!(FilterWhere::column("_id"), "to_jsonb(id::text)");
    }

    #[test]
    fn empty_filter_matches_all() {
        let filter = Filter::new("Item").unwrap();
        let (sql, params) = FilterWhere::generate(&filter, 1);
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }
}
