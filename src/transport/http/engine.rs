//! HTTP engine implementation over `reqwest`

use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::{Client, Response, Url};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::error::{LabError, Result};
use crate::transport::{Engine, RawStream};
use crate::types::identifiers::SessionId;
use crate::types::messages::{Frame, PreviewResponse, StartRequest, StartResponse, Topic};
use crate::types::options::LabOptions;
use crate::types::parameters::ParameterSchema;

use super::sse::{SseCodec, SseFrame};

/// Connect timeout for every request
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Remote engine reached over HTTP and server-sent events
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    stream_read_timeout: Duration,
}

impl HttpEngine {
    /// Create an engine client from controller options
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(options: &LabOptions) -> Result<Self> {
        let base_url = Url::parse(&options.base_url).map_err(|e| {
            LabError::invalid_config(format!("Invalid base_url '{}': {e}", options.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(LabError::invalid_config(format!(
                "base_url '{}' cannot carry a path",
                options.base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            request_timeout: options.request_timeout(),
            stream_read_timeout: options.stream_read_timeout(),
        })
    }

    /// Build an endpoint URL from path segments, percent-encoding each
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn stream_url(&self, session_id: &SessionId, topic: Topic) -> Url {
        match topic {
            Topic::Training => self.endpoint(&["api", "train", "stream", session_id.as_str()]),
            Topic::Playback => {
                self.endpoint(&["api", "play-policy", "stream", session_id.as_str()])
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Turn a non-success response into `LabError::Engine` with the engine's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body
        .get("error")
        .and_then(|v| v.as_str())
        .map_or_else(|| status.to_string(), String::from);

    Err(LabError::Engine {
        status: status.as_u16(),
        message,
    })
}

/// Stream the JSON payloads of a `text/event-stream` endpoint
///
/// Keep-alive comments count as activity for the silence limit. Events
/// whose data is not JSON are logged and skipped.
fn event_values(
    client: Client,
    url: Url,
    read_timeout: Duration,
) -> impl Stream<Item = Result<serde_json::Value>> {
    async_stream::try_stream! {
        let response = client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut frames = Box::pin(FramedRead::new(StreamReader::new(body), SseCodec::new()));

        loop {
            let next = tokio::time::timeout(read_timeout, frames.next())
                .await
                .map_err(|_| {
                    LabError::timeout(format!(
                        "No stream activity on {url} for {}s",
                        read_timeout.as_secs()
                    ))
                })?;

            let Some(frame) = next else {
                break;
            };

            match frame? {
                SseFrame::KeepAlive => continue,
                SseFrame::Event(data) => match serde_json::from_str(&data) {
                    Ok(value) => yield value,
                    Err(e) => {
                        log::warn!("Skipping non-JSON event on {url}: {e}");
                    }
                },
            }
        }
    }
}

/// Forward stream items until the first error, the end of the stream, or the
/// receiver going away
///
/// The receiver is watched while waiting, so a stream that only carries
/// keep-alives is dropped as soon as nobody listens.
async fn forward_events<S>(events: S, tx: mpsc::UnboundedSender<Result<serde_json::Value>>)
where
    S: Stream<Item = Result<serde_json::Value>>,
{
    let mut events = std::pin::pin!(events);
    loop {
        let item = tokio::select! {
            item = events.next() => item,
            () = tx.closed() => {
                log::debug!("Stream receiver dropped, closing connection");
                break;
            }
        };
        let Some(item) = item else {
            break;
        };

        let failed = item.is_err();
        if tx.send(item).is_err() || failed {
            break;
        }
    }
}

impl Engine for HttpEngine {
    async fn start_session(&self, request: StartRequest) -> Result<StartResponse> {
        let response = self
            .client
            .post(self.endpoint(&["api", "train"]))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    fn open_stream(&self, session_id: &SessionId, topic: Topic) -> RawStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = self.stream_url(session_id, topic);
        let events = event_values(self.client.clone(), url, self.stream_read_timeout);

        tokio::spawn(forward_events(events, tx));
        rx
    }

    async fn reset_session(&self) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&["api", "reset"]))
            .timeout(self.request_timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn preview_frame(&self, environment: &str) -> Result<Frame> {
        let url = self.endpoint(&["api", "environments", environment, "preview"]);
        let preview: PreviewResponse = self.get_json(url).await?;
        Ok(preview.frame)
    }

    async fn parameter_schema(&self, algorithm: &str, environment: &str) -> Result<ParameterSchema> {
        let mut url = self.endpoint(&["api", "parameters", algorithm]);
        url.query_pairs_mut().append_pair("environment", environment);
        self.get_json(url).await
    }

    async fn algorithms(&self) -> Result<Vec<String>> {
        self.get_json(self.endpoint(&["api", "algorithms"])).await
    }

    async fn environments(&self) -> Result<Vec<String>> {
        self.get_json(self.endpoint(&["api", "environments"])).await
    }
}
