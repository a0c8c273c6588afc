use std::io;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use relay_core::{JobId, JobResult, RemoteStatus};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

use crate::{
    Artifact, PollError, PollErrorKind, ProgressSink, StatusChannel, SubmitOptions,
    TransferChannel, TransferError, TransferFailureKind,
};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to the whole request, upload body included.
    pub request_timeout: Duration,
    pub max_upload_bytes: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            max_upload_bytes: 500 * 1024 * 1024,
        }
    }
}

impl HttpSettings {
    fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
    }

    /// `{base_url}/api/jobs[/{job_id}]`, with the id percent-encoded.
    fn jobs_url(&self, job_id: Option<&JobId>) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|err| err.to_string())?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| format!("{} cannot be a base url", self.base_url))?;
            segments.pop_if_empty().extend(["api", "jobs"]);
            if let Some(job_id) = job_id {
                segments.push(job_id.as_str());
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RemoteJobStatus {
    Queued,
    Processing,
    Complete,
    Failed,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: RemoteJobStatus,
    final_video_url: Option<String>,
    subtitle_url: Option<String>,
}

/// Uploads the artifact as `multipart/form-data` to `POST /api/jobs`.
#[derive(Debug, Clone)]
pub struct HttpTransferChannel {
    settings: HttpSettings,
}

impl HttpTransferChannel {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    async fn check_artifact(&self, artifact: &Artifact) -> Result<u64, TransferError> {
        let metadata = tokio::fs::metadata(artifact.path())
            .await
            .map_err(|err| io_error(artifact, err))?;
        if !metadata.is_file() {
            return Err(TransferError::new(
                TransferFailureKind::Io,
                format!("{} is not a regular file", artifact.path().display()),
            ));
        }
        let len = metadata.len();
        if len == 0 {
            return Err(TransferError::new(
                TransferFailureKind::Empty,
                format!("{} is empty", artifact.name()),
            ));
        }
        if len > self.settings.max_upload_bytes {
            return Err(TransferError::new(
                TransferFailureKind::TooLarge {
                    max_bytes: self.settings.max_upload_bytes,
                    actual: len,
                },
                "artifact too large",
            ));
        }
        Ok(len)
    }
}

#[async_trait::async_trait]
impl TransferChannel for HttpTransferChannel {
    async fn send(
        &self,
        artifact: &Artifact,
        options: &SubmitOptions,
        progress: &dyn ProgressSink,
    ) -> Result<JobId, TransferError> {
        let url = self
            .settings
            .jobs_url(None)
            .map_err(|message| TransferError::new(TransferFailureKind::InvalidUrl, message))?;
        let total = self.check_artifact(artifact).await?;
        let file = tokio::fs::File::open(artifact.path())
            .await
            .map_err(|err| io_error(artifact, err))?;
        let client = self
            .settings
            .build_client()
            .map_err(|err| TransferError::new(TransferFailureKind::Network, err.to_string()))?;

        // The body stream runs inside the client, so percentages travel back
        // over a channel and are reported from this task.
        let (percent_tx, mut percent_rx) = mpsc::unbounded_channel::<u32>();
        let sent = Arc::new(AtomicU64::new(0));
        let body = ReaderStream::new(file).inspect(move |chunk: &io::Result<Bytes>| {
            if let Ok(bytes) = chunk {
                let done = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
                let _ = percent_tx.send((done.min(total) * 100 / total) as u32);
            }
        });
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(artifact.name().to_string());
        let form = Form::new()
            .text("target_language", options.target_language.clone())
            .part("video", part);

        progress.report(0);
        let request = client.post(url).multipart(form).send();
        tokio::pin!(request);
        let response = loop {
            tokio::select! {
                Some(percent) = percent_rx.recv() => progress.report(percent),
                response = &mut request => break response,
            }
        };
        while let Ok(percent) = percent_rx.try_recv() {
            progress.report(percent);
        }

        let response = response.map_err(map_transfer_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                TransferFailureKind::Rejected {
                    status: status.as_u16(),
                },
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_transfer_error)?;
        let created: CreateJobResponse = serde_json::from_slice(&body).map_err(|err| {
            TransferError::new(TransferFailureKind::MalformedResponse, err.to_string())
        })?;
        if created.job_id.trim().is_empty() {
            return Err(TransferError::new(
                TransferFailureKind::MalformedResponse,
                "empty job id",
            ));
        }
        progress.report(100);
        Ok(JobId::new(created.job_id))
    }
}

/// Reads job status from `GET /api/jobs/{job_id}`.
#[derive(Debug, Clone)]
pub struct HttpStatusChannel {
    settings: HttpSettings,
}

impl HttpStatusChannel {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl StatusChannel for HttpStatusChannel {
    async fn poll(&self, job_id: &JobId) -> Result<RemoteStatus, PollError> {
        let url = self
            .settings
            .jobs_url(Some(job_id))
            .map_err(|message| PollError::new(PollErrorKind::InvalidUrl, message))?;
        let client = self
            .settings
            .build_client()
            .map_err(|err| PollError::new(PollErrorKind::Network, err.to_string()))?;

        let response = client.get(url).send().await.map_err(map_poll_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PollError::new(
                PollErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_poll_error)?;
        let reply: JobStatusResponse = serde_json::from_slice(&body)
            .map_err(|err| PollError::new(PollErrorKind::Malformed, err.to_string()))?;

        match reply.status {
            RemoteJobStatus::Queued | RemoteJobStatus::Processing => Ok(RemoteStatus::Processing),
            RemoteJobStatus::Failed => Ok(RemoteStatus::Failed),
            RemoteJobStatus::Complete => {
                let primary = reply.final_video_url.ok_or_else(|| {
                    PollError::new(PollErrorKind::Malformed, "complete job without final_video_url")
                })?;
                let mut result = JobResult::new(primary);
                result.auxiliary = reply.subtitle_url;
                Ok(RemoteStatus::Complete(result))
            }
        }
    }
}

fn io_error(artifact: &Artifact, err: io::Error) -> TransferError {
    TransferError::new(
        TransferFailureKind::Io,
        format!("{}: {}", artifact.path().display(), err),
    )
}

fn map_transfer_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(TransferFailureKind::Timeout, err.to_string());
    }
    TransferError::new(TransferFailureKind::Network, err.to_string())
}

fn map_poll_error(err: reqwest::Error) -> PollError {
    if err.is_timeout() {
        return PollError::new(PollErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return PollError::new(PollErrorKind::Malformed, err.to_string());
    }
    PollError::new(PollErrorKind::Network, err.to_string())
}
