//! Test doubles: an in-memory [`GenAiBackend`] that replays scripted
//! responses, and a loopback HTTP server for exercising the real client.

use crate::genai::client::{GenAiBackend, GenAiError};
use crate::genai::types::{
    Candidate, Content, DownloadedMedia, GenerateContentRequest, GenerateContentResponse,
    InlineData, Operation, OperationResponse, GenerateVideoResponse, GeneratedSample, Part,
    PredictLongRunningRequest, VideoRef,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct ScriptedBackend {
    content: Mutex<VecDeque<Result<GenerateContentResponse, GenAiError>>>,
    operations: Mutex<VecDeque<Result<Operation, GenAiError>>>,
    requests: Mutex<Vec<(String, GenerateContentRequest)>>,
    pub operation_checks: AtomicUsize,
    pub downloads: Mutex<Vec<String>>,
    hold_next: AtomicBool,
    /// Signalled when a held `generate_content` call has started.
    pub entered: Notify,
    /// Lets a held `generate_content` call finish.
    pub release: Notify,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_content(&self, response: Result<GenerateContentResponse, GenAiError>) -> &Self {
        self.content.lock().unwrap().push_back(response);
        self
    }

    pub fn push_text(&self, text: &str) -> &Self {
        self.push_content(Ok(text_response(text)))
    }

    /// Queue a response for `submit_video` (first) and `get_operation` (rest).
    pub fn push_operation(&self, operation: Result<Operation, GenAiError>) -> &Self {
        self.operations.lock().unwrap().push_back(operation);
        self
    }

    /// Make the next `generate_content` call wait for [`Self::release`].
    pub fn hold_next_call(&self) -> &Self {
        self.hold_next.store(true, Ordering::SeqCst);
        self
    }

    /// (model, request) pairs seen by `generate_content`, oldest first.
    pub fn requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn text_response(text: &str) -> GenerateContentResponse {
    parts_response(vec![Part::text(text)])
}

pub fn inline_response(mime_type: &str, data: &str) -> GenerateContentResponse {
    parts_response(vec![Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        }),
    }])
}

pub fn parts_response(parts: Vec<Part>) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some("model".to_string()),
                parts,
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        prompt_feedback: None,
    }
}

pub fn pending_operation(name: &str) -> Operation {
    Operation {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn finished_operation(name: &str, uri: &str) -> Operation {
    Operation {
        name: name.to_string(),
        done: true,
        error: None,
        response: Some(OperationResponse {
            generate_video_response: Some(GenerateVideoResponse {
                generated_samples: vec![GeneratedSample {
                    video: Some(VideoRef {
                        uri: Some(uri.to_string()),
                    }),
                }],
            }),
        }),
    }
}

#[async_trait]
impl GenAiBackend for ScriptedBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenAiError> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.content
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenAiError::Network("no scripted response".to_string())))
    }

    async fn submit_video(
        &self,
        _model: &str,
        _request: &PredictLongRunningRequest,
    ) -> Result<Operation, GenAiError> {
        self.next_operation()
    }

    async fn get_operation(&self, _name: &str) -> Result<Operation, GenAiError> {
        self.operation_checks.fetch_add(1, Ordering::SeqCst);
        self.next_operation()
    }

    async fn download(&self, uri: &str) -> Result<DownloadedMedia, GenAiError> {
        self.downloads.lock().unwrap().push(uri.to_string());
        Ok(DownloadedMedia {
            bytes: b"fake-mp4".to_vec(),
            content_type: "video/mp4".to_string(),
        })
    }
}

impl ScriptedBackend {
    fn next_operation(&self) -> Result<Operation, GenAiError> {
        self.operations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenAiError::Network("no scripted operation".to_string())))
    }
}

/// Loopback HTTP server that answers every request with the same JSON body.
pub struct StubServer {
    port: u16,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let body = body.to_string();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(respond(stream, body.clone()));
            }
        });
        Self { port, task }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/v1beta", self.port)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(mut stream: TcpStream, body: String) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        request.extend_from_slice(&chunk[..read]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(read) => request.extend_from_slice(&chunk[..read]),
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
