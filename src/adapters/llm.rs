use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analysis::transcript::{self, FollowUpQuestion, InterviewAnalysis, QuestionKind, ResponseAnalysis};
use crate::auth::AuthSession;
use crate::error::ApiError;

pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

const INTERVIEW_PROMPT: &str = "You are an expert interview analyst. Analyze the interview \
transcript and reply with a JSON object with keys key_traits {confidence, clarity, \
technical_knowledge, communication, leadership} (each 0-1), behavioral_flags, risk_factors \
and recommendations (arrays of strings).";

const FOLLOW_UP_PROMPT: &str = "You are an expert interviewer. Based on the transcript, reply \
with a JSON object {\"questions\": [...]} where each question has keys question, intent, \
follow_ups and key_points.";

const RESPONSE_PROMPT: &str = "You are an expert interview evaluator. Evaluate the candidate \
answer and reply with a JSON object with keys score (0-1), strengths, weaknesses, \
communication_quality {overall_score, details {clarity, conciseness, specificity, \
professionalism}} and key_observations.";

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

/// Remote transcript analysis
#[async_trait::async_trait]
pub trait TranscriptAnalyzer: Send + Sync {
    async fn analyze_interview(&self, transcript: &str) -> Result<InterviewAnalysis, ApiError>;

    async fn follow_up_questions(
        &self,
        transcript: &str,
        kind: QuestionKind,
        count: usize,
    ) -> Result<Vec<FollowUpQuestion>, ApiError>;

    async fn analyze_response(
        &self,
        question: &str,
        response: &str,
        kind: QuestionKind,
    ) -> Result<ResponseAnalysis, ApiError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct QuestionList {
    questions: Vec<FollowUpQuestion>,
}

/// Client for the analysis proxy (`POST {base}/api/analyze`)
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    settings: LlmSettings,
    auth: Arc<AuthSession>,
}

impl LlmClient {
    pub fn new(base_url: &str, settings: LlmSettings, auth: Arc<AuthSession>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/analyze", base_url.trim_end_matches('/')),
            settings,
            auth,
        })
    }

    async fn complete<T: DeserializeOwned>(&self, system: &str, user: String) -> Result<T, ApiError> {
        let body = ChatRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: 0.7,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let request = self.auth.authorize(self.http.post(&self.endpoint).json(&body));
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.auth.force_logout();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), text));
        }

        let body: Value = response.json().await?;
        parse_completion(body)
    }
}

/// Decode the structured object from a chat-completion body
///
/// The proxy either forwards the provider's body (object JSON-encoded in
/// `choices[0].message.content`) or returns the object directly.
fn parse_completion<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    if let Some(choices) = body.get("choices") {
        let choices: Vec<ChatChoice> =
            serde_json::from_value(choices.clone()).map_err(|e| ApiError::Parse(e.to_string()))?;
        let content = choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ApiError::Parse("empty choices".to_string()))?;
        return serde_json::from_str(content).map_err(|e| ApiError::Parse(e.to_string()));
    }
    serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))
}

#[async_trait::async_trait]
impl TranscriptAnalyzer for LlmClient {
    async fn analyze_interview(&self, transcript: &str) -> Result<InterviewAnalysis, ApiError> {
        self.complete(INTERVIEW_PROMPT, format!("Transcript:\n{}", transcript))
            .await
    }

    async fn follow_up_questions(
        &self,
        transcript: &str,
        kind: QuestionKind,
        count: usize,
    ) -> Result<Vec<FollowUpQuestion>, ApiError> {
        let user = json!({ "transcript": transcript, "type": kind, "count": count }).to_string();
        let list: QuestionList = self.complete(FOLLOW_UP_PROMPT, user).await?;
        Ok(list.questions.into_iter().take(count).collect())
    }

    async fn analyze_response(
        &self,
        question: &str,
        response: &str,
        kind: QuestionKind,
    ) -> Result<ResponseAnalysis, ApiError> {
        let user = json!({ "question": question, "response": response, "type": kind }).to_string();
        self.complete(RESPONSE_PROMPT, user).await
    }
}

/// Which path produced an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analyzed<T> {
    pub value: T,
    pub source: AnalysisSource,
}

impl<T> Analyzed<T> {
    fn remote(value: T) -> Self {
        Self {
            value,
            source: AnalysisSource::Remote,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            source: AnalysisSource::Fallback,
        }
    }
}

/// Transcript analysis that always answers
///
/// Remote failures, timeouts and a missing analyzer all fall back to the
/// local heuristics.
#[derive(Clone)]
pub struct AnalysisService {
    analyzer: Option<Arc<dyn TranscriptAnalyzer>>,
    timeout: Duration,
}

impl AnalysisService {
    pub fn new(analyzer: Arc<dyn TranscriptAnalyzer>, timeout: Duration) -> Self {
        Self {
            analyzer: Some(analyzer),
            timeout,
        }
    }

    /// Heuristics only
    pub fn offline() -> Self {
        Self {
            analyzer: None,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub async fn analyze_interview(&self, transcript: &str) -> Analyzed<InterviewAnalysis> {
        let remote = match &self.analyzer {
            Some(analyzer) if !transcript.trim().is_empty() => {
                self.call("interview analysis", analyzer.analyze_interview(transcript))
                    .await
            }
            _ => None,
        };
        match remote {
            Some(analysis) => Analyzed::remote(analysis),
            None => Analyzed::fallback(transcript::fallback_interview_analysis(transcript)),
        }
    }

    pub async fn generate_follow_up_questions(
        &self,
        transcript: &str,
        kind: QuestionKind,
        count: usize,
    ) -> Analyzed<Vec<FollowUpQuestion>> {
        let remote = match &self.analyzer {
            Some(analyzer) if !transcript.trim().is_empty() => {
                self.call(
                    "follow-up questions",
                    analyzer.follow_up_questions(transcript, kind, count),
                )
                .await
            }
            _ => None,
        };
        match remote {
            Some(questions) if !questions.is_empty() => Analyzed::remote(questions),
            _ => Analyzed::fallback(transcript::fallback_follow_up_questions(kind, count)),
        }
    }

    pub async fn analyze_response(
        &self,
        question: &str,
        response: &str,
        kind: QuestionKind,
    ) -> Analyzed<ResponseAnalysis> {
        let remote = match &self.analyzer {
            Some(analyzer) => {
                self.call(
                    "response analysis",
                    analyzer.analyze_response(question, response, kind),
                )
                .await
            }
            None => None,
        };
        match remote {
            Some(analysis) => Analyzed::remote(analysis),
            None => Analyzed::fallback(transcript::fallback_response_analysis(response)),
        }
    }

    async fn call<T>(
        &self,
        task: &str,
        fut: impl Future<Output = Result<T, ApiError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => {
                debug!("Remote {} succeeded", task);
                Some(value)
            }
            Ok(Err(e)) => {
                warn!("Remote {} failed, using local heuristics: {}", task, e);
                None
            }
            Err(_) => {
                warn!(
                    "Remote {} timed out after {:?}, using local heuristics",
                    task, self.timeout
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_from_choices() {
        let content = json!({
            "key_traits": {
                "confidence": 0.9,
                "clarity": 0.8,
                "technical_knowledge": 0.7,
                "communication": 0.6,
                "leadership": 0.5
            },
            "behavioral_flags": ["calm"]
        })
        .to_string();
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] });

        let analysis: InterviewAnalysis = parse_completion(body).unwrap();
        assert_eq!(analysis.key_traits.confidence, 0.9);
        assert_eq!(analysis.behavioral_flags, vec!["calm".to_string()]);
        assert!(analysis.risk_factors.is_empty());
    }

    #[test]
    fn test_parse_completion_direct_object() {
        let body = json!({ "questions": [{ "question": "Why?", "intent": "probe" }] });
        let list: QuestionList = parse_completion(body).unwrap();
        assert_eq!(list.questions[0].question, "Why?");
    }

    #[test]
    fn test_parse_completion_rejects_prose() {
        let body = json!({ "choices": [{ "message": { "content": "Sure! Here is..." } }] });
        let result: Result<InterviewAnalysis, _> = parse_completion(body);
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }

    #[tokio::test]
    async fn test_offline_service_uses_fallback() {
        let service = AnalysisService::offline();
        let analyzed = service.analyze_interview("I am confident in my code.").await;
        assert_eq!(analyzed.source, AnalysisSource::Fallback);
        assert!(analyzed.value.key_traits.confidence > 0.5);

        let questions = service
            .generate_follow_up_questions("", QuestionKind::Hr, 2)
            .await;
        assert_eq!(questions.value.len(), 2);
    }
}
