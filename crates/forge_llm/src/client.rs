//! The client trait every stage talks to, plus structured-output helpers.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{LlmError, LlmResult};
use crate::types::{ChatMessage, ChatResponse, StructuredMethod, StructuredRequest, ToolSpec};

/// A chat model that can return structured values and request tool calls.
///
/// Implementations are injected into the stages, so tests swap in
/// [`MockLlm`](crate::MockLlm) and runs can use differently configured
/// clients side by side.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Ask for a value conforming to `request.schema`.
    ///
    /// `Ok(None)` means the model produced no structured result (a refusal,
    /// an empty reply, or no function call).
    async fn structured(&self, request: StructuredRequest) -> LlmResult<Option<Value>>;

    /// One free-form chat turn, optionally offering tools.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> LlmResult<ChatResponse>;
}

/// JSON schema for `T` with all sub-schemas inlined.
pub fn schema_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
    }
    value
}

/// Request a `T` from the model and decode it.
///
/// Returns `Ok(None)` when the model gave no structured result and
/// [`LlmError::Decode`] when it gave one that does not fit `T`.
pub async fn structured_output<T>(
    client: &dyn LlmClient,
    messages: Vec<ChatMessage>,
    method: StructuredMethod,
) -> LlmResult<Option<T>>
where
    T: DeserializeOwned + JsonSchema,
{
    let name = T::schema_name();
    let request = StructuredRequest::new(name.clone(), schema_for::<T>(), messages).with_method(method);

    match client.structured(request).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| LlmError::decode(name, e.to_string())),
    }
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").ok())
        .as_ref()
}

/// Parse a JSON value out of model text.
///
/// Accepts bare JSON, JSON wrapped in a Markdown code fence, or JSON
/// surrounded by prose (first `{` to last `}`).
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let unfenced = fence_regex()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    if let Ok(value) = serde_json::from_str(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if start < end {
        serde_json::from_str(&unfenced[start..=end]).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLlm;
    use serde::Deserialize;
    use serde_json::json;

    /// A thing with a name.
    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Named {
        /// The name
        name: String,
        tags: Vec<Tag>,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Tag {
        label: String,
    }

    #[test]
    fn test_schema_is_inlined() {
        let schema = schema_for::<Named>();
        let text = schema.to_string();
        assert!(!text.contains("$ref"));
        assert!(!text.contains("$schema"));
        assert!(text.contains("label"));
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), Some(json!({"a": 1})));
        assert_eq!(
            extract_json("Here you go: {\"a\": {\"b\": 2}} hope it helps"),
            Some(json!({"a": {"b": 2}}))
        );
        assert_eq!(extract_json("   "), None);
        assert_eq!(extract_json("no json here"), None);
    }

    #[tokio::test]
    async fn test_structured_output_decodes() {
        let llm = MockLlm::new()
            .add_structured(Some(json!({"name": "x", "tags": [{"label": "t"}]})));

        let value: Option<Named> =
            structured_output(&llm, vec![ChatMessage::user("hi")], StructuredMethod::JsonSchema)
                .await
                .unwrap();

        assert_eq!(value.unwrap().tags[0].label, "t");
        let calls = llm.get_calls();
        assert_eq!(calls[0].name.as_deref(), Some("Named"));
    }

    #[tokio::test]
    async fn test_structured_output_none_and_mismatch() {
        let llm = MockLlm::new()
            .add_structured(None)
            .add_structured(Some(json!({"name": 3})));

        let none: Option<Named> =
            structured_output(&llm, vec![], StructuredMethod::JsonSchema).await.unwrap();
        assert!(none.is_none());

        let err = structured_output::<Named>(&llm, vec![], StructuredMethod::FunctionCalling)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Decode { .. }));
    }
}
