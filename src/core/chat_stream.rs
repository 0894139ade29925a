use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatResponse};
use crate::core::message::Message;
use crate::core::platform::{stream_from_channel, Fragment, FragmentStream, PlatformError};
use crate::utils::url::construct_api_url;

type FragmentSender = mpsc::UnboundedSender<Result<Fragment, PlatformError>>;

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Returns true when the stream is finished.
fn handle_data_payload(payload: &str, tx: &FragmentSender) -> bool {
    if payload == "[DONE]" {
        return true;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    if !content.is_empty() {
                        let _ = tx.send(Ok(Fragment::new(content.clone())));
                    }
                }
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }
            let _ = tx.send(Err(PlatformError::Stream(summarize_api_error(payload))));
            true
        }
    }
}

fn process_sse_line(line: &str, tx: &FragmentSender) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx))
        .unwrap_or(false)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// One-line description of an error body, suitable for a notice.
pub fn summarize_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "API error with an empty body".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            return format!("API error: {summary}");
        }
        return format!("API error: {json_value}");
    }

    format!(
        "API error: {}",
        trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
    )
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub token: Option<String>,
    pub model: String,
    pub messages: Vec<Message>,
    pub test_mode: bool,
    pub cancel_token: CancellationToken,
}

/// Start the completion request on a background task and hand back the
/// fragment stream. The task stops as soon as `cancel_token` fires.
pub fn spawn_stream(params: StreamParams) -> FragmentStream {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let StreamParams {
            client,
            base_url,
            token,
            model,
            messages,
            test_mode,
            cancel_token,
        } = params;

        tokio::select! {
            _ = run_request(&client, &base_url, token.as_deref(), &model, &messages, test_mode, &tx) => {}
            _ = cancel_token.cancelled() => {
                debug!(model = %model, "chat request cancelled");
            }
        }
    });
    stream_from_channel(rx)
}

async fn run_request(
    client: &reqwest::Client,
    base_url: &str,
    token: Option<&str>,
    model: &str,
    messages: &[Message],
    test_mode: bool,
    tx: &FragmentSender,
) {
    let request = ChatRequest {
        model,
        messages,
        stream: true,
        test_mode,
    };
    let chat_url = construct_api_url(base_url, "chat/completions");
    let http_request = client
        .post(chat_url)
        .header("Content-Type", "application/json");
    let http_request = crate::utils::auth::add_auth_headers(http_request, token);

    let response = match http_request.json(&request).send().await {
        Ok(response) => response,
        Err(err) => {
            let _ = tx.send(Err(PlatformError::from(err)));
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let _ = tx.send(Err(PlatformError::Api {
            status,
            message: summarize_api_error(&error_text),
        }));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = tx.send(Err(PlatformError::from(err)));
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => process_sse_line(line.trim(), tx),
                Err(err) => {
                    warn!(error = %err, "skipping invalid UTF-8 line in stream");
                    false
                }
            };
            buffer.drain(..=newline_pos);
            if should_end {
                return;
            }
        }
    }

    // A final line without a trailing newline still counts.
    if let Ok(line) = std::str::from_utf8(&buffer) {
        process_sse_line(line.trim(), tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_sse_line_handles_spacing_variants() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let variants = [
            (r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#, "Hel", "data: [DONE]"),
            (r#"data:{"choices":[{"delta":{"content":"lo"}}]}"#, "lo", "data:[DONE]"),
        ];

        for (chunk_line, expected, done_line) in variants {
            assert!(!process_sse_line(chunk_line, &tx));
            let fragment = rx.try_recv().expect("fragment").expect("ok fragment");
            assert_eq!(fragment.text, expected);
            assert!(process_sse_line(done_line, &tx));
        }

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn comments_and_empty_deltas_are_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(!process_sse_line(": keep-alive", &tx));
        assert!(!process_sse_line("", &tx));
        assert!(!process_sse_line(
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            &tx
        ));
        assert!(!process_sse_line(
            r#"data: {"choices":[{"delta":{"content":""},"finish_reason":"stop"}]}"#,
            &tx
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stream_errors_end_the_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let error_line = r#"data: {"error":{"message":"internal   server error"}}"#;

        assert!(process_sse_line(error_line, &tx));

        match rx.try_recv().expect("error item") {
            Err(PlatformError::Stream(text)) => {
                assert_eq!(text, "API error: internal server error")
            }
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[test]
    fn summaries_cover_json_and_plain_bodies() {
        assert_eq!(
            summarize_api_error(r#"{"error":"quota exceeded"}"#),
            "API error: quota exceeded"
        );
        assert_eq!(
            summarize_api_error(r#"{"status":"failed"}"#),
            r#"API error: {"status":"failed"}"#
        );
        assert_eq!(
            summarize_api_error("  bad\n gateway "),
            "API error: bad gateway"
        );
        assert_eq!(summarize_api_error(""), "API error with an empty body");
    }
}
