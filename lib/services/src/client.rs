//! The centralized client for every outbound collaborator call.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use callflow_core::Result as CoreResult;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

const API_KEY_HEADER: &str = "X-Api-Key";

/// Processing stages marked as completed in the internal API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Audio transcription finished.
    Transcription,
    /// AI analysis finished.
    Analysis,
}

impl ProcessingStage {
    /// The wire value the internal API expects.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcription => "TRASCRIZIONE",
            Self::Analysis => "ANALISI",
        }
    }
}

/// Result of persisting a conversation record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveOutcome {
    /// Identifier of the stored record, when the API returns one.
    #[serde(default)]
    pub id: Option<String>,
    /// Status string reported by the API.
    #[serde(default = "default_save_status")]
    pub status: String,
}

fn default_save_status() -> String {
    "OK".to_string()
}

/// Usage reported by the reconstruction service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReconstructionUsage {
    #[serde(default)]
    pub tokens: u64,
    #[serde(rename = "costUsd", default)]
    pub cost_usd: f64,
}

/// A reconstructed conversation transcript with its usage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reconstruction {
    #[serde(rename = "reconstructedTranscript", default)]
    pub transcript: String,
    #[serde(default)]
    pub usage: ReconstructionUsage,
}

/// Output of an analysis call: the parsed analysis JSON plus token usage.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    /// The model's analysis, parsed from its JSON answer.
    pub analysis: JsonValue,
    /// Total tokens reported by the model.
    pub tokens_used: u64,
}

/// A named file to attach to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Centralized async client for all collaborator services.
///
/// One instance is built at startup and shared across pipeline runs; the
/// underlying `reqwest::Client` pools connections internally.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    config: ServiceConfig,
    http: reqwest::Client,
}

impl ServiceClient {
    /// Builds a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: ServiceConfig) -> CoreResult<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport {
                service: "http client",
                reason: e.to_string(),
            })?;
        tracing::info!(
            internal = %config.internal_api_url,
            analysis = %config.analysis_api_url,
            files = %config.file_api_url,
            email = %config.email_api_url,
            "service client configured"
        );
        Ok(Self { config, http })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.config.long_call_timeout_secs)
    }

    /// POSTs a JSON body and returns the JSON answer.
    ///
    /// # Errors
    ///
    /// Any non-200 status, timeout, transport fault, or unparseable body.
    pub async fn post_json(
        &self,
        service: &'static str,
        url: &str,
        body: &JsonValue,
    ) -> Result<JsonValue, ServiceError> {
        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service,
                reason: e.to_string(),
            })
    }

    /// GETs raw bytes from a URL.
    ///
    /// # Errors
    ///
    /// Any non-200 status, timeout, or transport fault.
    pub async fn get_bytes(
        &self,
        service: &'static str,
        url: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("Accept", "application/octet-stream")
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;
        Ok(bytes.to_vec())
    }

    /// Downloads one file from the file service.
    ///
    /// # Errors
    ///
    /// Propagates the underlying call failure.
    pub async fn download_file(
        &self,
        location: &str,
        file_name: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        let url = format!("{}/api/files/{location}/{file_name}", self.config.file_api_url);
        tracing::debug!(file = %file_name, "downloading file");
        self.get_bytes("file service", &url).await
    }

    /// Marks a processing stage completed for a conversation.
    ///
    /// # Errors
    ///
    /// Any non-200 status, timeout, or transport fault. Callers treat this
    /// as best-effort and usually log rather than fail the node.
    pub async fn mark_stage_completed(
        &self,
        conversation_id: &str,
        stage: ProcessingStage,
    ) -> Result<(), ServiceError> {
        let service = "internal api";
        let url = format!(
            "{}/api/InternalConversazione/UpdateConversazioneStretchCompleted",
            self.config.internal_api_url
        );
        let response = self
            .http
            .put(&url)
            .timeout(Duration::from_secs(self.config.marker_timeout_secs))
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(&[("convName", conversation_id), ("ind_type", stage.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        tracing::debug!(conversation = %conversation_id, stage = stage.as_str(), "stage marked completed");
        Ok(())
    }

    /// Persists a conversation record (transcript, analysis, suggestions).
    ///
    /// # Errors
    ///
    /// Any non-200 status, timeout, transport fault, or unparseable body.
    pub async fn save_conversation(
        &self,
        conversation_id: &str,
        content: &str,
        kind: &str,
    ) -> Result<SaveOutcome, ServiceError> {
        let service = "internal api";
        let url = format!("{}/api/internal/InternalRgConvTrs", self.config.internal_api_url);
        let payload = serde_json::json!({
            "convName": conversation_id,
            "transcribe": content,
            "type": kind,
        });
        let value = self.post_json(service, &url, &payload).await?;
        serde_json::from_value(value).map_err(|e| ServiceError::InvalidResponse {
            service,
            reason: e.to_string(),
        })
    }

    /// Fetches the stored transcript of a conversation.
    ///
    /// # Errors
    ///
    /// Any non-200 status, timeout, transport fault, or unparseable body.
    pub async fn fetch_transcript(&self, conversation_id: &str) -> Result<String, ServiceError> {
        let service = "internal api";
        let url = format!(
            "{}/api/internal/GetConversation/{conversation_id}",
            self.config.internal_api_url
        );
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout())
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service,
                reason: e.to_string(),
            })?;
        Ok(body
            .get("transcribe")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Sends an email-graph payload to the email service, returning the
    /// raw response text.
    ///
    /// # Errors
    ///
    /// Any non-200 status, timeout, or transport fault.
    pub async fn send_email_graph(&self, payload: &JsonValue) -> Result<String, ServiceError> {
        let service = "email service";
        let url = format!("{}/api/Graph/run", self.config.email_api_url);
        tracing::info!(url = %url, "sending email via graph endpoint");
        let response = self
            .http
            .post(&url)
            .timeout(self.long_timeout())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("Accept", "text/plain")
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))
    }

    /// Downloads both call legs concurrently and posts them to the audio
    /// reconstruction endpoint.
    ///
    /// # Errors
    ///
    /// A failed download of either leg, or any failure of the
    /// reconstruction call itself.
    pub async fn reconstruct_from_storage(
        &self,
        location: &str,
        inbound_file: &str,
        outbound_file: &str,
        project_name: &str,
    ) -> Result<Reconstruction, ServiceError> {
        let service = "analysis api";
        let (inbound_bytes, outbound_bytes) = futures::try_join!(
            self.download_file(location, inbound_file),
            self.download_file(location, outbound_file),
        )?;

        let form = reqwest::multipart::Form::new()
            .part(
                "files",
                reqwest::multipart::Part::bytes(inbound_bytes)
                    .file_name(inbound_file.to_string())
                    .mime_str("audio/mpeg")
                    .map_err(|e| ServiceError::InvalidResponse {
                        service,
                        reason: e.to_string(),
                    })?,
            )
            .part(
                "files",
                reqwest::multipart::Part::bytes(outbound_bytes)
                    .file_name(outbound_file.to_string())
                    .mime_str("audio/mpeg")
                    .map_err(|e| ServiceError::InvalidResponse {
                        service,
                        reason: e.to_string(),
                    })?,
            );

        let url = format!("{}/api/Audio/reconstruct", self.config.analysis_api_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.long_timeout())
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(&[("project_name", project_name)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service,
                reason: e.to_string(),
            })
    }

    /// Downloads every knowledge-base file concurrently.
    ///
    /// # Errors
    ///
    /// One failed download fails the whole fan-out with a single error.
    pub async fn download_knowledge_base(
        &self,
        files: &[(String, String)],
    ) -> Result<Vec<UploadFile>, ServiceError> {
        let downloads = files.iter().map(|(location, file_name)| async move {
            let bytes = self.download_file(location, file_name).await?;
            Ok::<_, ServiceError>(UploadFile {
                file_name: file_name.clone(),
                bytes,
            })
        });
        try_join_all(downloads).await
    }

    /// Runs the analysis with knowledge-base files attached.
    ///
    /// # Errors
    ///
    /// Any failure of the multipart call or of answer parsing.
    pub async fn analyze_with_knowledge_base(
        &self,
        prompt: &str,
        project_name: &str,
        knowledge_base: Vec<UploadFile>,
        transcript: &str,
    ) -> Result<AnalysisOutput, ServiceError> {
        let service = "analysis api";
        let mut form = analysis_form(prompt, project_name, transcript, service)?;
        for file in knowledge_base {
            form = form.part(
                "ListaKnowledgeBase",
                reqwest::multipart::Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str("application/pdf")
                    .map_err(|e| ServiceError::InvalidResponse {
                        service,
                        reason: e.to_string(),
                    })?,
            );
        }
        let url = format!(
            "{}/api/GeminiTextGeneration/analyze-file",
            self.config.analysis_api_url
        );
        self.run_analysis(service, &url, form).await
    }

    /// Runs the analysis on the transcript alone.
    ///
    /// # Errors
    ///
    /// Any failure of the multipart call or of answer parsing.
    pub async fn analyze_transcript_only(
        &self,
        prompt: &str,
        project_name: &str,
        transcript: &str,
    ) -> Result<AnalysisOutput, ServiceError> {
        let service = "analysis api";
        let form = analysis_form(prompt, project_name, transcript, service)?;
        let url = format!(
            "{}/api/GeminiTextGeneration/analyze-transcript-only",
            self.config.analysis_api_url
        );
        self.run_analysis(service, &url, form).await
    }

    async fn run_analysis(
        &self,
        service: &'static str,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> Result<AnalysisOutput, ServiceError> {
        let response = self
            .http
            .post(url)
            .timeout(self.long_timeout())
            .header(API_KEY_HEADER, &self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service,
                status: status.as_u16(),
            });
        }
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service,
                reason: e.to_string(),
            })?;
        parse_analysis_answer(service, &body)
    }
}

fn analysis_form(
    prompt: &str,
    project_name: &str,
    transcript: &str,
    service: &'static str,
) -> Result<reqwest::multipart::Form, ServiceError> {
    Ok(reqwest::multipart::Form::new()
        .text("prompt", prompt.to_string())
        .text("projectName", project_name.to_string())
        .text("geminiModelName", "gemini-2.5-pro")
        .part(
            "TrascrizioneFile",
            reqwest::multipart::Part::bytes(transcript.as_bytes().to_vec())
                .file_name("trascrizione.txt")
                .mime_str("text/plain")
                .map_err(|e| ServiceError::InvalidResponse {
                    service,
                    reason: e.to_string(),
                })?,
        ))
}

/// Extracts the analysis JSON and token count from the model answer.
///
/// The model wraps its JSON in the provider's candidates envelope and
/// sometimes in markdown code fences; both are stripped here.
fn parse_analysis_answer(
    service: &'static str,
    body: &JsonValue,
) -> Result<AnalysisOutput, ServiceError> {
    let text = body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ServiceError::InvalidResponse {
            service,
            reason: "missing candidates text".to_string(),
        })?;

    let analysis: JsonValue =
        serde_json::from_str(strip_code_fences(text)).map_err(|e| ServiceError::InvalidResponse {
            service,
            reason: format!("analysis is not valid JSON: {e}"),
        })?;

    let tokens_used = body
        .pointer("/usageMetadata/totalTokenCount")
        .and_then(JsonValue::as_u64)
        .unwrap_or(0);

    Ok(AnalysisOutput {
        analysis,
        tokens_used,
    })
}

/// Strips a surrounding ```json ... ``` or ``` ... ``` fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}
