use serde_json::Value;

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{SortDirection, SortSpec};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse the `sort` list parameter: `[{"field":"name","dir":"desc"}]` or a single object.
    /// Entries without both field and dir are skipped.
    pub fn validate_and_parse(sort: &Value) -> Result<Vec<SortSpec>, FilterError> {
        let entries = match sort {
            Value::Array(arr) => arr.iter().collect::<Vec<_>>(),
            Value::Object(_) => vec![sort],
            Value::Null => vec![],
            _ => return Err(FilterError::InvalidSort("sort must be an object or array".to_string())),
        };

        let mut out = Vec::new();
        for entry in entries {
            let field = entry.get("field").and_then(Value::as_str).unwrap_or("");
            let dir = entry.get("dir").and_then(Value::as_str).unwrap_or("");
            if field.is_empty() || dir.is_empty() {
                tracing::warn!("Ignoring sort entry without field and dir: {}", entry);
                continue;
            }
            let dir = if dir.eq_ignore_ascii_case("asc") { SortDirection::Asc } else { SortDirection::Desc };
            out.push(SortSpec { field: field.to_string(), dir });
        }
        Ok(out)
    }

    pub fn generate(specs: &[SortSpec]) -> String {
        if specs.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = specs
            .iter()
            .map(|s| format!("{} {}", FilterWhere::column(&s.field), s.dir.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_and_object() {
        let specs = FilterOrder::validate_and_parse(&json!([
            { "field": "name", "dir": "desc" },
            { "field": "rank", "dir": "ASC" },
            { "field": "skipped" }
        ]))
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].dir, SortDirection::Desc);
        assert_eq!(specs[1].dir, SortDirection::Asc);

        let one = FilterOrder::validate_and_parse(&json!({ "field": "name", "dir": "asc" })).unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn generates_order_by() {
        let specs = vec![SortSpec { field: "name".into(), dir: SortDirection::Desc }];
        assert_eq!(FilterOrder::generate(&specs), "ORDER BY (body #> '{name}') DESC");
        assert_eq!(FilterOrder::generate(&[]), "");
    }

    #[test]
    fn rejects_scalar_sort() {
        assert!(FilterOrder::validate_and_parse(&json!("name")).is_err());
    }
}
