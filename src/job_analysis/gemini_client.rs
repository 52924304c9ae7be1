// src/job_analysis/gemini_client.rs
use super::prompts;
use super::{CoverLetterRequest, LlmClient, LlmError};
use crate::core::LlmConfig;
use crate::types::response::{
    GeminiError, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    RequestContent, RequestPart, RequirementPayload, SafetySetting, ScorePayload,
};
use crate::types::{RequirementScore, ScoreResult};
use crate::utils::ellipsize;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

const SCORING_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.2,
    top_p: 0.9,
    top_k: 32,
    candidate_count: 1,
};

const COVER_LETTER_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.7,
    ..SCORING_CONFIG
};

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
    retry_base_delay: Duration,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            anyhow::bail!("Gemini API key is empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        info!("Using Gemini model {}", config.model);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    /// First backoff delay; doubles on every further attempt
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    /// Send one prompt and return the first candidate's text.
    /// 429 and 5xx responses are retried with exponential backoff.
    pub async fn generate(
        &self,
        context: &str,
        prompt: &str,
        generation_config: GenerationConfig,
    ) -> Result<String, LlmError> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
            safety_settings: SafetySetting::block_none(),
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "{}: attempt {} failed, retrying after {}ms",
                    context,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            debug!("Sending {} request to Gemini", context);

            let response = match self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Gemini API returned {}: {}", status, ellipsize(&body, 200));
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: GenerateContentResponse = response.json().await?;
            if body.candidates.is_empty() {
                if let Some(reason) = body
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref())
                {
                    warn!("{} prompt was blocked by Gemini: {}", context, reason);
                }
            }
            if let Some(reason) = body.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
                debug!("{} finished with reason {}", context, reason);
            }

            return body.text().ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
        scoring_guide: Option<&str>,
    ) -> Result<ScoreResult, LlmError> {
        let prompt = prompts::scoring_prompt(resume_text, job_description, scoring_guide);
        let text = self.generate("job scoring", &prompt, SCORING_CONFIG).await?;
        debug!("Raw scoring response: {}", ellipsize(&text, 200));

        let result = parse_score(&text)?;
        info!("LLM returned score: {:.1}", result.score);
        if result.score == 0.0 {
            warn!("LLM returned a score of 0, the response may be degenerate");
        }
        Ok(result)
    }

    async fn analyze_requirements(
        &self,
        requirements: &[String],
        core_skills: &[String],
    ) -> Result<Vec<RequirementScore>, LlmError> {
        if requirements.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = prompts::requirements_prompt(requirements, core_skills);
        let text = self
            .generate("requirement analysis", &prompt, SCORING_CONFIG)
            .await?;
        parse_requirement_table(&text)
    }

    async fn cover_letter(&self, request: &CoverLetterRequest<'_>) -> Result<String, LlmError> {
        let prompt = prompts::cover_letter_prompt(request);
        let text = self
            .generate("cover letter", &prompt, COVER_LETTER_CONFIG)
            .await?;
        Ok(strip_code_fences(&text).to_string())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

/// Locate the outermost `open ... close` span, tolerating prose around it
fn extract_json(text: &str, open: char, close: char) -> Option<&str> {
    let text = strip_code_fences(text);
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn number_from(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Parse the scoring JSON. The score is clamped to 0..=100.
pub fn parse_score(text: &str) -> Result<ScoreResult, LlmError> {
    let json = extract_json(text, '{', '}')
        .ok_or_else(|| LlmError::Parse(format!("no JSON object in: {}", ellipsize(text, 200))))?;

    let payload: ScorePayload =
        serde_json::from_str(json).map_err(|e| LlmError::Parse(e.to_string()))?;

    let raw = payload
        .score
        .as_ref()
        .ok_or_else(|| LlmError::Parse("'score' field missing".to_string()))?;
    let score = number_from(raw)
        .ok_or_else(|| LlmError::Parse(format!("score is not numeric: {}", raw)))?
        .clamp(0.0, 100.0);

    let rationale = payload
        .summary
        .or(payload.rationale)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("Match score: {:.1}", score));

    Ok(ScoreResult {
        score,
        rationale,
        strengths: payload.strengths,
        gaps: payload.gaps,
    })
}

/// Parse the requirement table array. Scores are rounded and clamped to 1..=10.
pub fn parse_requirement_table(text: &str) -> Result<Vec<RequirementScore>, LlmError> {
    let json = extract_json(text, '[', ']')
        .ok_or_else(|| LlmError::Parse(format!("no JSON array in: {}", ellipsize(text, 200))))?;

    let items: Vec<RequirementPayload> =
        serde_json::from_str(json).map_err(|e| LlmError::Parse(e.to_string()))?;

    Ok(items
        .into_iter()
        .filter(|item| !item.requirement.trim().is_empty())
        .map(|item| {
            let score = item
                .score
                .as_ref()
                .and_then(number_from)
                .map(|n| n.round().clamp(1.0, 10.0) as u8)
                .unwrap_or(1);
            RequirementScore {
                requirement: item.requirement.trim().to_string(),
                score,
                reason: item.reason.trim().to_string(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const OK_BODY: &str = r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}, "finishReason": "STOP"}]}"#;

    /// Local HTTP server answering each connection with the next canned response.
    /// Returns its base URL and the raw requests it received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (url, received)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client_for(url: &str) -> GeminiClient {
        let mut cfg = config();
        cfg.api_url = url.to_string();
        GeminiClient::new(&cfg)
            .unwrap()
            .with_retry_delay(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        let (url, received) = serve(vec![(503, "busy"), (503, "busy"), (200, OK_BODY)]).await;

        let text = client_for(&url)
            .generate("test", "prompt", SCORING_CONFIG)
            .await
            .unwrap();

        assert_eq!(text, "hello");
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 3);
        let first = received[0].to_lowercase();
        assert!(first.starts_with("post /models/gemini-test:generatecontent"));
        assert!(first.contains("x-goog-api-key: key"));
        assert!(received[0].contains("\"safetySettings\""));
        assert!(received[0].contains("BLOCK_NONE"));
    }

    #[tokio::test]
    async fn test_retries_stop_after_three_attempts() {
        let (url, received) = serve(vec![(503, "busy"), (503, "busy"), (503, "busy")]).await;

        let err = client_for(&url)
            .generate("test", "prompt", SCORING_CONFIG)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        assert_eq!(received.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (url, received) = serve(vec![(
            400,
            r#"{"error": {"message": "API key not valid"}}"#,
        )])
        .await;

        let err = client_for(&url)
            .generate("test", "prompt", SCORING_CONFIG)
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_empty_content() {
        let (url, _) = serve(vec![(200, r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)]).await;

        let err = client_for(&url)
            .generate("test", "prompt", SCORING_CONFIG)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::EmptyContent));
    }

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: "key".to_string(),
            model: "gemini-test".to_string(),
            api_url: "https://example.test/v1beta/".to_string(),
            scoring_guide: None,
        }
    }

    #[test]
    fn test_endpoint_format() {
        let client = GeminiClient::new(&config()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let mut cfg = config();
        cfg.api_key = "  ".to_string();
        assert!(GeminiClient::new(&cfg).is_err());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_parse_score_with_surrounding_prose() {
        let text = r#"Here you go: {"score": 82, "strengths": ["Rust"], "gaps": ["Go"], "summary": "Strong backend fit."} Thanks"#;
        let result = parse_score(text).unwrap();

        assert_eq!(result.score, 82.0);
        assert_eq!(result.rationale, "Strong backend fit.");
        assert_eq!(result.strengths, vec!["Rust"]);
        assert_eq!(result.gaps, vec!["Go"]);
    }

    #[test]
    fn test_parse_score_accepts_strings_and_clamps() {
        assert_eq!(parse_score(r#"{"score": "75.5"}"#).unwrap().score, 75.5);
        assert_eq!(parse_score(r#"{"score": 140}"#).unwrap().score, 100.0);
        assert_eq!(parse_score(r#"{"score": -3}"#).unwrap().score, 0.0);
    }

    #[test]
    fn test_parse_score_default_rationale() {
        let result = parse_score(r#"{"score": 64, "summary": "  "}"#).unwrap();
        assert_eq!(result.rationale, "Match score: 64.0");

        let result = parse_score(r#"{"score": 64, "rationale": "Fallback field"}"#).unwrap();
        assert_eq!(result.rationale, "Fallback field");
    }

    #[test]
    fn test_parse_score_failures() {
        assert!(matches!(parse_score("no json here"), Err(LlmError::Parse(_))));
        assert!(matches!(parse_score(r#"{"summary": "x"}"#), Err(LlmError::Parse(_))));
        assert!(matches!(parse_score(r#"{"score": "high"}"#), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_parse_requirement_table() {
        let text = "```json\n[\
            {\"requirement\": \"Python\", \"score\": 9.6, \"reason\": \"core skill\"},\
            {\"requirement\": \"Sales\", \"score\": 0, \"reason\": \"unrelated\"},\
            {\"requirement\": \"  \", \"score\": 5},\
            {\"requirement\": \"SQL\", \"score\": \"7\"}\
        ]\n```";
        let table = parse_requirement_table(text).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table[0].score, 10);
        assert_eq!(table[1].score, 1);
        assert_eq!(table[2].requirement, "SQL");
        assert_eq!(table[2].score, 7);
        assert_eq!(table[2].reason, "");
    }

    #[test]
    fn test_parse_requirement_table_rejects_objects() {
        assert!(parse_requirement_table(r#"{"score": 3}"#).is_err());
    }
}
