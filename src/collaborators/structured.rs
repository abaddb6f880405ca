//! Structured output through a forced "respond" tool
//!
//! The artifact's JSON schema becomes the input schema of a tool the model
//! has to call. Search tools may be offered for a few rounds first; the last
//! round always forces the respond tool.

use crate::artifacts::Artifact;
use crate::error::StepError;
use crate::llm::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, LlmService, SystemContent, ToolChoice,
    ToolDefinition,
};
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use schemars::gen::SchemaSettings;
use serde_json::Value;

/// Rounds in which the model may call search tools before it must respond.
pub(super) const MAX_SEARCH_ROUNDS: usize = 3;
/// Retries for transient provider errors. Malformed replies are never retried.
const MAX_RETRIES: u32 = 3;
const MAX_TOKENS: u32 = 8192;

/// Tool definition whose input schema is the artifact's schema.
pub(super) fn respond_tool<T: Artifact>() -> ToolDefinition {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();
    let mut schema = serde_json::to_value(root).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object
            .entry("type")
            .or_insert_with(|| Value::String("object".to_string()));
    }
    ToolDefinition {
        name: T::TOOL_NAME.to_string(),
        description: T::TOOL_DESCRIPTION.to_string(),
        input_schema: schema,
    }
}

/// Ask the model for one artifact.
pub(super) async fn request_artifact<T: Artifact>(
    llm: &dyn LlmService,
    system: &str,
    prompt: String,
    tools: &ToolRegistry,
    ctx: &ToolContext,
) -> Result<T, StepError> {
    let respond = respond_tool::<T>();
    let mut messages = vec![LlmMessage::user(vec![ContentBlock::text(prompt)])];
    let search_rounds = if tools.is_empty() { 0 } else { MAX_SEARCH_ROUNDS };

    for round in 0..=search_rounds {
        let final_round = round == search_rounds;
        let mut definitions = vec![respond.clone()];
        let tool_choice = if final_round {
            ToolChoice::tool(T::TOOL_NAME)
        } else {
            definitions.extend(tools.definitions());
            ToolChoice::Any
        };

        let request = LlmRequest {
            system: vec![SystemContent::cached(system)],
            messages: messages.clone(),
            tools: definitions,
            tool_choice: Some(tool_choice),
            max_tokens: Some(MAX_TOKENS),
        };
        let response = complete_with_retry(llm, &request).await?;

        let calls: Vec<(String, String, Value)> = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();

        if let Some((_, _, input)) = calls.iter().find(|(_, name, _)| name == T::TOOL_NAME) {
            return parse_artifact(input.clone());
        }
        if calls.is_empty() || final_round {
            break;
        }

        tracing::debug!(
            session_id = %ctx.session_id,
            artifact = T::NAME,
            round,
            calls = calls.len(),
            "Running research tools"
        );
        let mut results = Vec::with_capacity(calls.len());
        for (id, name, input) in calls {
            let output = tools
                .execute(&name, input, ctx.clone())
                .await
                .unwrap_or_else(|| ToolOutput::error(format!("Unknown tool: {name}")));
            results.push(ContentBlock::tool_result(id, output.output, !output.success));
        }
        messages.push(LlmMessage::assistant(response.content));
        messages.push(LlmMessage::user(results));
    }

    Err(StepError::validation(
        T::NAME,
        vec![format!("reply did not call {}", T::TOOL_NAME)],
    ))
}

fn parse_artifact<T: Artifact>(input: Value) -> Result<T, StepError> {
    serde_json::from_value(input).map_err(|e| StepError::validation(T::NAME, vec![e.to_string()]))
}

async fn complete_with_retry(
    llm: &dyn LlmService,
    request: &LlmRequest,
) -> Result<LlmResponse, StepError> {
    let mut retries = 0;
    loop {
        match llm.complete(request).await {
            Ok(response) => return Ok(response),
            Err(e) if e.kind.is_retryable() && retries < MAX_RETRIES => {
                retries += 1;
                let delay = e.backoff(retries);
                tracing::warn!(
                    model = %llm.model_id(),
                    error = %e,
                    retry = retries,
                    delay_ms = %delay.as_millis(),
                    "Retrying LLM request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
