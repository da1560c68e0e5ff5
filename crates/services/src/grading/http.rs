use std::env;
use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GradeReport, GradeRequest, Grader};
use crate::error::GradingError;

/// Max points assumed when the mark scheme is empty and the model omits `max_points`.
const DEFAULT_MAX_POINTS: u32 = 10;

/// Per-request limit used unless `STUDY_AI_TIMEOUT_SECS` says otherwise.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct GraderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl GraderConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("STUDY_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("STUDY_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        let timeout = env::var("STUDY_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        Some(Self {
            base_url,
            api_key,
            model,
            timeout,
        })
    }
}

/// Grades free-response answers through an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct HttpGrader {
    client: Client,
    config: Option<GraderConfig>,
}

impl HttpGrader {
    /// Build a grader from `STUDY_AI_*`; disabled when no API key is set.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::Http` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, GradingError> {
        Self::new(GraderConfig::from_env())
    }

    /// Build a grader whose requests give up after the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::Http` if the HTTP client cannot be built.
    pub fn new(config: Option<GraderConfig>) -> Result<Self, GradingError> {
        let timeout = config.as_ref().map_or(DEFAULT_TIMEOUT, |c| c.timeout);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl Grader for HttpGrader {
    async fn grade_free_response(
        &self,
        request: &GradeRequest,
    ) -> Result<GradeReport, GradingError> {
        let config = self.config.as_ref().ok_or(GradingError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(request),
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GradingError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GradingError::EmptyResponse)?;

        parse_reply(&content, request.markscheme_points.len())
    }
}

const SYSTEM_PROMPT: &str = "You are a strict but fair examiner. Mark the student's answer \
against the model answer and mark scheme. Reply with a single JSON object: \
{\"score\": <integer>, \"max_points\": <integer>, \"feedback\": <string>}.";

fn build_prompt(request: &GradeRequest) -> String {
    let mut prompt = String::new();
    if let Some(subject) = &request.subject_hint {
        let _ = writeln!(prompt, "Subject: {subject}");
    }
    let _ = writeln!(prompt, "Question: {}", request.prompt);
    let _ = writeln!(prompt, "Model answer: {}", request.model_answer);
    if request.markscheme_points.is_empty() {
        let _ = writeln!(
            prompt,
            "No mark scheme given; mark out of {DEFAULT_MAX_POINTS}."
        );
    } else {
        prompt.push_str("Mark scheme (one point each):\n");
        for point in &request.markscheme_points {
            let _ = writeln!(prompt, "- {point}");
        }
    }
    let _ = writeln!(prompt, "Student answer: {}", request.user_answer);
    prompt
}

/// Parse the model's JSON verdict, tolerating a surrounding code fence.
fn parse_reply(content: &str, markscheme_len: usize) -> Result<GradeReport, GradingError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let verdict: Verdict =
        serde_json::from_str(json).map_err(|e| GradingError::Parse(e.to_string()))?;

    let fallback_max = match u32::try_from(markscheme_len) {
        Ok(0) | Err(_) => DEFAULT_MAX_POINTS,
        Ok(n) => n,
    };
    let max_points = verdict.max_points.unwrap_or(fallback_max);

    Ok(GradeReport {
        score: verdict.score.min(max_points),
        max_points,
        feedback: verdict.feedback.trim().to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct Verdict {
    score: u32,
    #[serde(default)]
    max_points: Option<u32>,
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(points: &[&str]) -> GradeRequest {
        GradeRequest {
            prompt: "Explain osmosis.".into(),
            model_answer: "Water moves across a membrane.".into(),
            markscheme_points: points.iter().map(|p| (*p).to_owned()).collect(),
            user_answer: "water diffuses".into(),
            subject_hint: Some("Biology".into()),
        }
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"score\": 2, \"max_points\": 3, \"feedback\": \" Good. \"}\n```";
        let report = parse_reply(reply, 3).unwrap();
        assert_eq!(
            report,
            GradeReport {
                score: 2,
                max_points: 3,
                feedback: "Good.".into()
            }
        );
    }

    #[test]
    fn missing_max_points_falls_back_to_markscheme() {
        let report = parse_reply(r#"{"score": 1}"#, 2).unwrap();
        assert_eq!(report.max_points, 2);

        let report = parse_reply(r#"{"score": 4}"#, 0).unwrap();
        assert_eq!(report.max_points, DEFAULT_MAX_POINTS);
    }

    #[test]
    fn score_is_capped_at_max_points() {
        let report = parse_reply(r#"{"score": 12, "max_points": 10}"#, 0).unwrap();
        assert_eq!(report.score, 10);
    }

    #[test]
    fn garbage_reply_is_parse_error() {
        let err = parse_reply("Great answer!", 1).unwrap_err();
        assert!(matches!(err, GradingError::Parse(_)));
    }

    #[test]
    fn prompt_lists_markscheme_and_subject() {
        let prompt = build_prompt(&request(&["water", "membrane"]));
        assert!(prompt.starts_with("Subject: Biology\n"));
        assert!(prompt.contains("- membrane\n"));
        assert!(prompt.ends_with("Student answer: water diffuses\n"));
    }

    #[tokio::test]
    async fn unconfigured_grader_is_disabled() {
        let grader = HttpGrader::new(None).unwrap();
        assert!(!grader.enabled());
        let err = grader
            .grade_free_response(&request(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, GradingError::Disabled));
    }

    #[tokio::test]
    async fn silent_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer them.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let grader = HttpGrader::new(Some(GraderConfig {
            base_url: format!("http://{addr}/v1"),
            api_key: "test-key".into(),
            model: "test-model".into(),
            timeout: Duration::from_millis(200),
        }))
        .unwrap();

        let err = grader
            .grade_free_response(&request(&["water"]))
            .await
            .unwrap_err();
        assert!(matches!(&err, GradingError::Http(e) if e.is_timeout()));
        server.abort();
    }
}
