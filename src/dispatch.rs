use tracing::{debug, error, warn};

use crate::error::{Result, ReviewError};
use crate::llm::{CompletionRequest, MessageContent, ReviewBackend};

#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub content: String,
    pub system_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    /// Review text followed by the model/cost trailer.
    pub text: String,
    pub cost: f64,
    pub model: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub chars_per_token: usize,
    pub max_estimated_tokens: usize,
    /// Log the full prompt and content.
    pub debug: bool,
}

pub fn estimate_tokens(content: &str, system_prompt: &str, chars_per_token: usize) -> usize {
    (content.chars().count() + system_prompt.chars().count()) / chars_per_token.max(1)
}

/// Send `request` to `backend` and validate what comes back.
///
/// Size and emptiness checks happen before any network traffic.
pub fn dispatch<B: ReviewBackend + ?Sized>(
    backend: &B,
    request: &ReviewRequest,
    options: &DispatchOptions,
) -> Result<ReviewResult> {
    if request.content.trim().is_empty() {
        return Err(ReviewError::EmptyRequest("content"));
    }
    if request.system_prompt.trim().is_empty() {
        return Err(ReviewError::EmptyRequest("system prompt"));
    }

    let estimated = estimate_tokens(
        &request.content,
        &request.system_prompt,
        options.chars_per_token,
    );
    debug!(
        model = %request.model,
        chars = request.content.len(),
        estimated_tokens = estimated,
        "sending review request"
    );
    if estimated > options.max_estimated_tokens {
        return Err(ReviewError::ContentTooLarge {
            estimated,
            limit: options.max_estimated_tokens,
        });
    }

    if options.debug {
        debug!("SYSTEM PROMPT:\n{}", request.system_prompt);
        debug!("CONTENT:\n{}", request.content);
    }

    let completion = CompletionRequest {
        model: &request.model,
        system_prompt: &request.system_prompt,
        user_content: &request.content,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };
    let response = backend.complete(&completion).map_err(|e| {
        error!("LLM API call failed: {e:#}");
        ReviewError::LlmDispatch(format!("{e:#}"))
    })?;

    let Some(choice) = response.choices.first() else {
        return Err(ReviewError::MalformedResponse("response has no choices"));
    };
    if choice.content == MessageContent::Missing {
        debug!(?choice, "choice without message content");
        return Err(ReviewError::MalformedResponse(
            "choice has no message content",
        ));
    }
    if choice.finish_reason.as_deref() == Some("length") {
        warn!(
            max_tokens = request.max_tokens,
            "LLM response was truncated due to token limit"
        );
        return Err(ReviewError::TruncatedResponse {
            max_tokens: request.max_tokens,
        });
    }
    let review = match &choice.content {
        MessageContent::Text(text) => text.trim(),
        _ => {
            warn!("LLM returned None content, possibly due to content filters or token limits");
            return Err(ReviewError::EmptyResponse(
                "no content (None). This may be due to content size, filters, or model limits.",
            ));
        }
    };
    if review.is_empty() {
        return Err(ReviewError::EmptyResponse(
            "content is empty after trimming",
        ));
    }

    debug!(chars = review.len(), cost = response.cost, "received review response");
    Ok(ReviewResult {
        text: format!(
            "{review}\n\nModel: {} -- Cost: US${:.4}\n",
            request.model, response.cost
        ),
        cost: response.cost,
        model: request.model.clone(),
    })
}
