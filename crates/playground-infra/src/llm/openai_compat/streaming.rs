//! OpenAI SSE stream to text chunk adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] to the
//! [`ChunkStream`] consumed by the chatbot: one item per non-empty content
//! delta, in arrival order. Role-only and finish chunks carry no text and
//! are skipped.

use futures_util::StreamExt;

use async_openai::types::chat::ChatCompletionResponseStream;

use playground_core::llm::backend::ChunkStream;
use playground_types::error::ChatError;

pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| ChatError::Generation(e.to_string()))?;

            let texts: Vec<String> = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .filter(|text| !text.is_empty())
                .collect();

            for text in texts {
                yield text;
            }
        }
    })
}
