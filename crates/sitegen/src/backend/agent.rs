use futures::StreamExt;
use tracing::{debug, warn};

use crate::backend::Generator;
use crate::error::GeneratorError;
use crate::event::GenerationEvent;
use crate::options::GenerateOptions;
use crate::request::GenerationRequest;
use crate::stream::EventStream;

// ─── AgentGenerator ───────────────────────────────────────────────────────

/// Agent-mediated generation backend.
///
/// Streams JSONL generation events from a remote agent service over HTTP:
/// one `POST /v1/generate` per turn, the response body is a lazy sequence
/// of newline-delimited JSON events. A background task owns the response
/// stream and forwards parsed events through an mpsc channel until the
/// first terminal event, cancellation, or EOF.
pub struct AgentGenerator {
    client: reqwest::Client,
    base_url: String,
    model: Option<String>,
}

impl AgentGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/generate", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &GenerationRequest, opts: &GenerateOptions) -> serde_json::Value {
        serde_json::json!({
            "prompt": request.render_prompt(),
            "system_prompt": opts
                .system_prompt
                .clone()
                .unwrap_or_else(|| request.render_system_prompt()),
            "model": self.model,
            "history": request.history,
            "max_turns": opts.max_turns,
            "cwd": opts.cwd,
            "skip_plan": opts.skip_plan,
        })
    }
}

impl Generator for AgentGenerator {
    fn generate(&self, request: &GenerationRequest, opts: GenerateOptions) -> EventStream {
        let (tx, stream) = EventStream::channel();

        let client = self.client.clone();
        let url = self.endpoint();
        let body = self.request_body(request, &opts);
        let cancel = opts.cancel.clone();

        tokio::spawn(async move {
            let resp = match client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            };
            let resp = match resp.error_for_status() {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            };

            let mut bytes = resp.bytes_stream();
            let mut buf = String::new();

            'turn: loop {
                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        // Cancelled mid-stream: the sequence simply ends
                        // without a terminal event.
                        debug!("agent generation cancelled");
                        break 'turn;
                    }
                    chunk = bytes.next() => chunk,
                };

                let data = match chunk {
                    None => break 'turn, // EOF
                    Some(Err(e)) => {
                        let _ = tx.send(Err(e.into())).await;
                        break 'turn;
                    }
                    Some(Ok(b)) => b,
                };

                buf.push_str(&String::from_utf8_lossy(&data));
                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let event = match serde_json::from_str::<GenerationEvent>(line) {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!(error = %e, "unparseable agent event line");
                            let _ = tx
                                .send(Err(GeneratorError::Parse {
                                    line: line.to_owned(),
                                    source: e,
                                }))
                                .await;
                            break 'turn;
                        }
                    };

                    let terminal = event.is_terminal();
                    if tx.send(Ok(event)).await.is_err() {
                        break 'turn; // receiver dropped
                    }
                    if terminal {
                        break 'turn;
                    }
                }
            }
        });

        stream
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::classify::{PatternClassifier, PromptClassifier};
    use futures::StreamExt;
    use std::net::SocketAddr;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Serve one canned JSONL HTTP response on an ephemeral port.
    async fn jsonl_server(lines: Vec<&'static str>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
                let resp = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ncontent-length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                // Drain the request before replying so the client does not
                // see a reset.
                let mut drain = [0u8; 4096];
                use tokio::io::AsyncReadExt;
                let _ = sock.read(&mut drain).await;
                let _ = sock.write_all(resp.as_bytes()).await;
            }
        });
        addr
    }

    fn request() -> crate::request::GenerationRequest {
        PatternClassifier::default().classify("build a modern landing page")
    }

    #[tokio::test]
    async fn streams_events_until_terminal() {
        let addr = jsonl_server(vec![
            r#"{"type":"plan","items":["hero"]}"#,
            r#"{"type":"file_create","path":"app/page.tsx","content":"x"}"#,
            r#"{"type":"complete","text":"done"}"#,
            r#"{"type":"explanation","text":"never delivered"}"#,
        ])
        .await;

        let gen = AgentGenerator::new(format!("http://{addr}"));
        let events: Vec<_> = gen.generate(&request(), GenerateOptions::default()).collect().await;

        // The sequence stops at the terminal event; the trailing line is
        // never consumed.
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.is_ok()));
        assert!(events.last().unwrap().as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let addr = jsonl_server(vec![
            "",
            r#"{"type":"explanation","text":"hi"}"#,
            "   ",
            r#"{"type":"complete"}"#,
        ])
        .await;

        let gen = AgentGenerator::new(format!("http://{addr}"));
        let events: Vec<_> = gen.generate(&request(), GenerateOptions::default()).collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn malformed_line_surfaces_parse_error() {
        let addr = jsonl_server(vec!["this is not json"]).await;

        let gen = AgentGenerator::new(format!("http://{addr}"));
        let events: Vec<_> = gen.generate(&request(), GenerateOptions::default()).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(GeneratorError::Parse { .. })));
    }

    #[tokio::test]
    async fn connection_refused_surfaces_http_error() {
        // Nothing listens on this port (bound then dropped).
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gen = AgentGenerator::new(format!("http://{addr}"));
        let events: Vec<_> = gen.generate(&request(), GenerateOptions::default()).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(GeneratorError::Http(_))));
    }

    #[test]
    fn request_body_carries_conversation_history() {
        use crate::request::{ChatRole, HistoryMessage};

        let mut req = request();
        req.history = vec![
            HistoryMessage {
                role: ChatRole::User,
                content: "build a shop".into(),
            },
            HistoryMessage {
                role: ChatRole::Assistant,
                content: "created app/page.tsx".into(),
            },
        ];

        let gen = AgentGenerator::new("http://unused");
        let body = gen.request_body(&req, &GenerateOptions::default());

        assert_eq!(body["history"][0]["role"], "user");
        assert_eq!(body["history"][0]["content"], "build a shop");
        assert_eq!(body["history"][1]["role"], "assistant");
        assert!(body["history"][2].is_null());
    }

    #[tokio::test]
    async fn pre_cancelled_turn_produces_no_events() {
        let addr = jsonl_server(vec![r#"{"type":"complete"}"#]).await;

        let cancel = CancelToken::new();
        cancel.cancel();
        let opts = GenerateOptions {
            cancel,
            ..Default::default()
        };

        let gen = AgentGenerator::new(format!("http://{addr}"));
        let events: Vec<_> = gen.generate(&request(), opts).collect().await;
        // Sequence ends without a terminal event — abnormal termination is
        // the caller's to detect.
        assert!(events.is_empty());
    }
}
