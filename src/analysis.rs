//! Structured plant analysis: the result type, the response schema declared to
//! the model, and validation of model output against that schema.

use crate::errors::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::OnceLock;

/// Instruction sent alongside the plant photo.
pub const ANALYSIS_PROMPT: &str = "You are a world-class botanist and gardening expert. \
Analyze the provided image of a plant. Based on the image, provide the following information \
in a structured JSON format:
1.  Identify the plant's common name.
2.  Provide detailed care instructions covering watering, sunlight, and soil requirements.
3.  Assess the plant's current condition as seen in the photo. Look for signs of health or \
distress (e.g., yellowing leaves, pests, wilting).
4.  Suggest a few actionable next steps to improve or maintain the plant's health.
5.  Estimate the typical market price for a plant of this type and size in Dubai, UAE, in AED.";

/// Watering, light, and soil guidance for one plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareInstructions {
    pub watering: String,
    pub sunlight: String,
    pub soil: String,
}

/// Identification and care advice for the plant in one photo.
///
/// Produced once per analysis and replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantAnalysis {
    pub plant_name: String,
    pub care_instructions: CareInstructions,
    pub current_condition: String,
    pub next_steps: Vec<String>,
    /// Free-form price text, e.g. "AED 45 - 80".
    #[serde(rename = "estimatedPriceAED")]
    pub estimated_price_aed: String,
}

/// Response schema declared on every analysis request.
///
/// Uses the Gemini OpenAPI-subset dialect (`OBJECT`, `STRING`, `ARRAY`).
pub fn response_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        json!({
            "type": "OBJECT",
            "properties": {
                "plantName": {"type": "STRING"},
                "careInstructions": {
                    "type": "OBJECT",
                    "properties": {
                        "watering": {"type": "STRING"},
                        "sunlight": {"type": "STRING"},
                        "soil": {"type": "STRING"}
                    },
                    "required": ["watering", "sunlight", "soil"]
                },
                "currentCondition": {"type": "STRING"},
                "nextSteps": {
                    "type": "ARRAY",
                    "items": {"type": "STRING"}
                },
                "estimatedPriceAED": {"type": "STRING"}
            },
            "required": [
                "plantName",
                "careInstructions",
                "currentCondition",
                "nextSteps",
                "estimatedPriceAED"
            ]
        })
    })
}

impl PlantAnalysis {
    /// Parses the model's raw JSON text, enforcing [`response_schema`].
    ///
    /// The provider is asked to honor the schema, but the result is still
    /// checked here; any violation is reported, never patched up.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedResponse`] if the text is not JSON or
    /// does not satisfy the schema.
    pub fn from_model_text(text: &str) -> Result<Self, GatewayError> {
        let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
            GatewayError::MalformedResponse(format!("analysis is not valid JSON: {e}"))
        })?;

        check_schema(&value, response_schema(), "$")
            .map_err(|e| GatewayError::MalformedResponse(format!("analysis {e}")))?;

        serde_json::from_value(value)
            .map_err(|e| GatewayError::MalformedResponse(format!("analysis: {e}")))
    }
}

/// Validates `value` against a schema using the subset of types declared above.
///
/// The typed decode that follows enforces the same shape; this pass exists for
/// its path-qualified messages (`$.careInstructions.soil`, `$.nextSteps[1]`).
fn check_schema(value: &Value, schema: &Value, path: &str) -> Result<(), String> {
    let expected = schema.get("type").and_then(Value::as_str).unwrap_or("");
    match expected {
        "OBJECT" => {
            let object = value
                .as_object()
                .ok_or_else(|| format!("field `{path}` must be an object"))?;
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    match object.get(name) {
                        None | Some(Value::Null) => {
                            return Err(format!("is missing required field `{path}.{name}`"));
                        }
                        Some(_) => {}
                    }
                }
            }
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (name, property) in properties {
                    if let Some(field) = object.get(name).filter(|v| !v.is_null()) {
                        check_schema(field, property, &format!("{path}.{name}"))?;
                    }
                }
            }
            Ok(())
        }
        "ARRAY" => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("field `{path}` must be an array"))?;
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check_schema(item, item_schema, &format!("{path}[{i}]"))?;
                }
            }
            Ok(())
        }
        "STRING" if value.is_string() => Ok(()),
        "STRING" => Err(format!("field `{path}` must be a string")),
        other => Err(format!("schema for `{path}` has unsupported type {other:?}")),
    }
}
