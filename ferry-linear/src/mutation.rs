//! Inline mutation text builder
//!
//! Mutations are sent with their arguments written into the document rather
//! than as variables. Objects become nested `key: { ... }` blocks, every
//! other value is written as its JSON literal, which is valid GraphQL for
//! strings, numbers, booleans, lists, and `null`.

use serde_json::{Map, Value};

/// Build `mutation { field(arguments) { return_fields } }`
///
/// `arguments` is expected to be a JSON object; any other value renders as
/// an empty argument list.
pub fn build_mutation(field: &str, arguments: &Value, return_fields: &[&str]) -> String {
    let arguments = match arguments {
        Value::Object(map) => render_arguments(map),
        _ => String::new(),
    };

    format!(
        "mutation {{\n  {field}(\n    {arguments}\n  ) {{\n    {fields}\n  }}\n}}\n",
        field = field,
        arguments = arguments,
        fields = return_fields.join("\n    "),
    )
}

fn render_arguments(map: &Map<String, Value>) -> String {
    map.iter()
        .map(|(key, value)| match value {
            Value::Object(inner) => format!("{}: {{ {} }}", key, render_arguments(inner)),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
