//! Tool definition → JSON Schema conversion shared by the HTTP providers.
//!
//! Handles param_type → JSON Schema type mapping:
//! - `"string"`, `"path"` → `"string"`
//! - `"number"` → `"number"`
//! - `"integer"` → `"integer"`
//! - `"boolean"` → `"boolean"`
//! - anything else → `"string"`

use serde_json::{Map, Value, json};
use stepwise_domain::ToolDefinition;

/// JSON Schema object describing the tool's arguments.
pub(crate) fn input_schema(tool: &ToolDefinition) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in &tool.parameters {
        let schema_type = match param.param_type.as_str() {
            "string" | "path" => "string",
            "number" => "number",
            "integer" => "integer",
            "boolean" => "boolean",
            _ => "string",
        };

        properties.insert(
            param.name.clone(),
            json!({ "type": schema_type, "description": param.description }),
        );

        if param.required {
            required.push(json!(param.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_domain::decision::decision_tools;
    use stepwise_domain::ToolParameter;

    #[test]
    fn test_input_schema() {
        let tool = ToolDefinition::new("report", "Report progress")
            .with_parameter(ToolParameter::new("count", "Items done", true).with_type("integer"))
            .with_parameter(ToolParameter::new("note", "Free text", false).with_type("custom"));

        let schema = input_schema(&tool);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["count"]["type"], "integer");
        assert_eq!(schema["properties"]["note"]["type"], "string");
        assert_eq!(schema["required"], json!(["count"]));
    }

    #[test]
    fn test_decision_tools_require_their_argument() {
        for tool in decision_tools() {
            let schema = input_schema(&tool);
            assert_eq!(schema["required"].as_array().map(Vec::len), Some(1));
        }
    }
}
