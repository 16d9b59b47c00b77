use crate::error::AppError;
use crate::openai_types::{OpenAIPayload, OpenAIStreamResponse, OPENAI_CHAT_COMPLETIONS_URL};
use crate::sse::EventStreamParser;

use futures_util::stream::{Stream, StreamExt};
use tracing::{debug, error, warn};

const DONE_SENTINEL: &str = "[DONE]";

type DataFn = Box<dyn FnMut(&str) + Send>;
type EndFn = Box<dyn FnOnce() + Send>;

/// Bridges the chunked chat-completions response body to two callbacks:
/// `data`, once per decoded text fragment, and `end`, exactly once after the
/// final fragment on both the success and failure paths.
///
/// One instance drives one stream; it owns its decode buffer and shares
/// nothing.  There is no cancellation or retry: a failed stream surfaces its
/// error once and the caller may build a new adapter.
pub struct CompletionStream {
    payload: OpenAIPayload,
    on_data: Option<DataFn>,
    on_end: Option<EndFn>,
}

impl CompletionStream {
    pub fn new(mut payload: OpenAIPayload) -> Self {
        payload.stream = Some(true);
        Self {
            payload,
            on_data: None,
            on_end: None,
        }
    }

    pub fn on_data(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_data = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    /// Perform the request and pump the response body through the callbacks.
    /// Returns only after the stream has completed or failed; `end` has
    /// always fired by then.
    pub async fn start(self, client: &reqwest::Client, api_key: &str) -> Result<(), AppError> {
        let resp = client
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&self.payload)
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send request to OpenAI");
                AppError::Transport("failed to send request to OpenAI".to_string())
            });
        let resp = match resp.and_then(|r| {
            r.error_for_status().map_err(|e| {
                error!(error=%e, "OpenAI returned an error status");
                AppError::Transport("OpenAI returned an error status".to_string())
            })
        }) {
            Ok(resp) => resp,
            Err(e) => {
                // the request never produced a body; still owe the consumer
                // its end notification
                let mut this = self;
                this.finish();
                return Err(e);
            }
        };

        self.run(Box::pin(resp.bytes_stream())).await
    }

    /// Decode loop over any chunked body.  Factored from `start` so the
    /// ordering and failure contracts can be driven without a network.
    pub async fn run<B, E>(
        mut self,
        mut body: impl Stream<Item = Result<B, E>> + Unpin,
    ) -> Result<(), AppError>
    where
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let result = self.pump(&mut body).await;
        self.finish();

        result
    }

    async fn pump<B, E>(
        &mut self,
        body: &mut (impl Stream<Item = Result<B, E>> + Unpin),
    ) -> Result<(), AppError>
    where
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut parser = EventStreamParser::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                error!(error=%e, "failed to read chunk from completion stream");
                AppError::Transport("error reading completion stream".to_string())
            })?;
            let text = String::from_utf8_lossy(chunk.as_ref());
            for event in parser.feed(&text) {
                if event.data == DONE_SENTINEL {
                    debug!("completion stream finished");
                    return Ok(());
                }
                match serde_json::from_str::<OpenAIStreamResponse>(&event.data) {
                    Ok(frame) => {
                        let fragment = frame.fragment();
                        if fragment.is_empty() {
                            continue;
                        }
                        if let Some(on_data) = self.on_data.as_mut() {
                            on_data(fragment);
                        }
                    }
                    // a single malformed frame never aborts the stream
                    Err(e) => warn!(error=%e, data=%event.data, "skipping malformed stream frame"),
                }
            }
        }

        Ok(())
    }

    fn finish(&mut self) {
        if let Some(on_end) = self.on_end.take() {
            on_end();
        }
    }
}
