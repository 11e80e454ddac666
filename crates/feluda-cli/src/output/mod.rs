use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// Objects render as `field | value` rows with nested fields flattened to
/// dotted paths. Lists of records render one row per record.
fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let options = table::TableOptions::from_env();
    let rendered = match serde_json::to_value(value)? {
        Value::Array(items) => render_rows(&items, options),
        other => {
            let mut rows = Vec::new();
            flatten("", &other, &mut rows);
            table::render_table(&["field", "value"], &rows, options)
        }
    };
    Ok(rendered)
}

/// Header comes from the first record; rows are homogeneous typed lists.
fn render_rows(items: &[Value], options: table::TableOptions) -> String {
    let Some(Value::Object(first)) = items.first() else {
        let rows: Vec<_> = items.iter().map(|item| vec![cell(item)]).collect();
        return table::render_table(&["value"], &rows, options);
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            headers
                .iter()
                .map(|h| item.get(*h).map_or_else(String::new, cell))
                .collect()
        })
        .collect();
    table::render_table(&headers, &rows, options)
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, rows);
            }
        }
        leaf => rows.push(vec![prefix.to_string(), cell(leaf)]),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::String(v) => v.clone(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(cell).collect::<Vec<_>>().join(", ")
        }
        Value::Array(items) => format!("<{} entries>", items.len()),
        Value::Object(map) => format!("<{} fields>", map.len()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::render;
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Area {
        area_ha: f64,
        vertices: usize,
    }

    #[test]
    fn json_render_is_valid_json() {
        let out = render(&Area { area_ha: 1.0, vertices: 4 }, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["vertices"], 4);
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let out = render(&Area { area_ha: 1.0, vertices: 4 }, OutputFormat::Raw).unwrap();
        assert!(!out.contains('\n'));
    }

    #[test]
    fn table_render_for_object_lists_fields() {
        let out = render(&Area { area_ha: 1.0, vertices: 4 }, OutputFormat::Table).unwrap();
        assert!(out.lines().next().is_some_and(|line| line.contains("field")));
        assert!(out.contains("area_ha"));
    }

    #[test]
    fn nested_fields_flatten_to_dotted_paths() {
        let result = serde_json::json!({
            "bounds": {"low": 0.8, "high": 1.15},
            "penalties": ["missing_ndvi", "missing_rain"],
            "samples": [{"t": 1}, {"t": 2}, {"t": 3}]
        });
        let out = render(&result, OutputFormat::Table).unwrap();
        assert!(out.contains("bounds.low"));
        assert!(out.contains("bounds.high"));
        assert!(out.contains("missing_ndvi, missing_rain"));
        assert!(out.contains("<3 entries>"));
    }

    #[test]
    fn table_render_for_rows_has_one_line_per_record() {
        let rows = serde_json::json!([
            {"name": "fine", "mass": 8000},
            {"name": "coarse", "mass": 5000}
        ]);
        let out = render(&rows, OutputFormat::Table).unwrap();
        let header = out.lines().next().unwrap();
        assert!(header.contains("mass") && header.contains("name"));
        assert_eq!(out.lines().count(), 4);
    }
}
