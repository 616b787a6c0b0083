//! Transcript heuristics
//!
//! Keyword and sentence-shape scoring used for live voice confidence and as
//! the local stand-in whenever the remote analysis service is unreachable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const CONFIDENCE_WORDS: [&str; 4] = ["confident", "sure", "certainly", "definitely"];
const HESITATION_WORDS: [&str; 5] = ["maybe", "perhaps", "um", "uh", "like"];
const TECHNICAL_WORDS: [&str; 6] = [
    "code",
    "programming",
    "software",
    "development",
    "technical",
    "algorithm",
];
const LEADERSHIP_STEMS: [&str; 5] = ["lead", "team", "managed", "organized", "coordinated"];

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid regex"));
static FILLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(um|uh|like|you know|sort of|kind of)\b").expect("valid regex")
});
static EXAMPLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(example|instance|situation)\b").expect("valid regex"));
static STRUCTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(first|second|then|finally)\b").expect("valid regex"));
static PROFESSIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(algorithm|framework|methodology)\b").expect("valid regex"));
static VAGUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(kind of|sort of|maybe|possibly)\b").expect("valid regex"));

/// Trait scores (0-1) produced by transcript analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyTraits {
    pub confidence: f64,
    pub clarity: f64,
    pub technical_knowledge: f64,
    pub communication: f64,
    pub leadership: f64,
}

/// Structured interview analysis, remote or locally derived
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnalysis {
    pub key_traits: KeyTraits,
    #[serde(default)]
    pub behavioral_flags: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    pub intent: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommunicationDetails {
    pub clarity: f64,
    pub conciseness: f64,
    pub specificity: f64,
    pub professionalism: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommunicationQuality {
    pub overall_score: f64,
    pub details: CommunicationDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub communication_quality: CommunicationQuality,
    pub key_observations: Vec<String>,
}

/// Question bank selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Technical,
    Hr,
    Behavioral,
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

pub fn word_count(text: &str) -> usize {
    words(text).count()
}

/// Non-empty sentences split on `.`, `!` and `?`
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn confidence_trait(transcript: &str) -> f64 {
    let words: Vec<String> = words(transcript).collect();
    if words.is_empty() {
        return 0.5;
    }
    let confident = words.iter().filter(|w| CONFIDENCE_WORDS.contains(&w.as_str())).count();
    let hesitant = words.iter().filter(|w| HESITATION_WORDS.contains(&w.as_str())).count();
    let raw = (confident as f64 - hesitant as f64) / words.len() as f64 + 0.5;
    raw.clamp(0.1, 1.0)
}

pub fn clarity_trait(transcript: &str) -> f64 {
    let sentence_count = sentences(transcript).len();
    if sentence_count == 0 {
        return 0.4;
    }
    let average = word_count(transcript) as f64 / sentence_count as f64;
    if (8.0..=20.0).contains(&average) {
        0.8
    } else {
        0.4
    }
}

pub fn technical_trait(transcript: &str) -> f64 {
    let count = words(transcript)
        .filter(|w| TECHNICAL_WORDS.contains(&w.as_str()))
        .count();
    (count as f64 / 10.0).min(1.0)
}

pub fn communication_trait(transcript: &str) -> f64 {
    if sentences(transcript).is_empty() {
        0.4
    } else {
        0.7
    }
}

pub fn leadership_trait(transcript: &str) -> f64 {
    let count = words(transcript)
        .filter(|w| LEADERSHIP_STEMS.iter().any(|stem| w.contains(stem)))
        .count();
    (count as f64 / 5.0).min(1.0)
}

/// Local analysis used when the remote service is unavailable
pub fn fallback_interview_analysis(transcript: &str) -> InterviewAnalysis {
    InterviewAnalysis {
        key_traits: KeyTraits {
            confidence: confidence_trait(transcript),
            clarity: clarity_trait(transcript),
            technical_knowledge: technical_trait(transcript),
            communication: communication_trait(transcript),
            leadership: leadership_trait(transcript),
        },
        behavioral_flags: vec![
            "No detailed analysis available".to_string(),
            "Recommend manual review".to_string(),
        ],
        risk_factors: vec!["Limited data for comprehensive analysis".to_string()],
        recommendations: vec![
            "Conduct a manual interview review".to_string(),
            "Consider additional assessment methods".to_string(),
        ],
    }
}

pub fn fallback_follow_up_questions(kind: QuestionKind, count: usize) -> Vec<FollowUpQuestion> {
    let bank: &[&str] = match kind {
        QuestionKind::Technical => &[
            "Can you describe a challenging technical problem you've solved?",
            "What programming languages are you most comfortable with?",
            "How do you approach learning new technologies?",
        ],
        QuestionKind::Hr => &[
            "Tell me about a time you worked effectively in a team.",
            "How do you handle workplace conflicts?",
            "What motivates you in your professional career?",
        ],
        QuestionKind::Behavioral => &[
            "Describe a situation where you demonstrated leadership.",
            "How do you handle high-pressure situations?",
            "Give an example of a goal you achieved through persistent effort.",
        ],
    };

    bank.iter()
        .take(count)
        .map(|question| FollowUpQuestion {
            question: question.to_string(),
            intent: "Assess candidate skills and experience".to_string(),
            follow_ups: Vec::new(),
            key_points: vec![
                "Look for specific examples".to_string(),
                "Evaluate communication clarity".to_string(),
            ],
        })
        .collect()
}

/// Length-based score for a single answer
pub fn response_score(response: &str) -> f64 {
    match word_count(response) {
        0..=19 => 0.3,
        20..=49 => 0.5,
        50..=99 => 0.7,
        _ => 0.9,
    }
}

pub fn response_strengths(response: &str) -> Vec<String> {
    let mut strengths = Vec::new();
    if EXAMPLES.is_match(response) {
        strengths.push("Provides concrete examples".to_string());
    }
    if STRUCTURE.is_match(response) {
        strengths.push("Demonstrates structured communication".to_string());
    }
    if PROFESSIONAL.is_match(response) {
        strengths.push("Uses professional technical language".to_string());
    }
    strengths
}

pub fn response_weaknesses(response: &str) -> Vec<String> {
    let mut weaknesses = Vec::new();
    if FILLER.find_iter(response).count() > 2 {
        weaknesses.push("Excessive use of filler words".to_string());
    }
    if VAGUE.is_match(response) {
        weaknesses.push("Uses vague or noncommittal language".to_string());
    }
    if response.chars().count() < 50 {
        weaknesses.push("Provides insufficient detail".to_string());
    }
    weaknesses
}

pub fn communication_quality(response: &str) -> CommunicationQuality {
    let details = CommunicationDetails {
        clarity: clarity_trait(response),
        conciseness: response_score(response),
        specificity: if response_strengths(response).is_empty() { 0.4 } else { 0.8 },
        professionalism: if response_weaknesses(response).is_empty() { 0.9 } else { 0.5 },
    };
    let overall_score =
        (details.clarity + details.conciseness + details.specificity + details.professionalism) / 4.0;
    CommunicationQuality {
        overall_score,
        details,
    }
}

pub fn fallback_response_analysis(response: &str) -> ResponseAnalysis {
    ResponseAnalysis {
        score: response_score(response),
        strengths: response_strengths(response),
        weaknesses: response_weaknesses(response),
        communication_quality: communication_quality(response),
        key_observations: vec!["Preliminary assessment based on limited analysis".to_string()],
    }
}

/// Words per minute, with elapsed time floored at one minute
pub fn speaking_pace(transcript: &str, elapsed_secs: f64) -> f64 {
    let minutes = (elapsed_secs / 60.0).max(1.0);
    word_count(transcript) as f64 / minutes
}

pub fn filler_words_score(transcript: &str) -> f64 {
    let total = word_count(transcript);
    if total == 0 {
        return 1.0;
    }
    let fillers = FILLER.find_iter(transcript).count();
    (1.0 - fillers as f64 / total as f64 * 10.0).max(0.0)
}

/// Sentence-length rhythm score in [0.3, 1.0]
pub fn pause_pattern_score(transcript: &str) -> f64 {
    let sentences = sentences(transcript);
    if sentences.len() < 2 {
        return 0.5;
    }

    let mut score = 0.0;
    let mut previous = 0usize;
    for sentence in &sentences {
        let count = word_count(sentence);
        if previous > 0 {
            let variation =
                (count as f64 - previous as f64).abs() / count.max(previous) as f64;
            score += if variation <= 0.5 { 0.5 } else { 0.3 };
        }
        score += if (5..=15).contains(&count) { 0.5 } else { 0.3 };
        previous = count;
    }
    score / sentences.len() as f64
}

pub fn volume_score(volume: f64) -> f64 {
    let score = if volume < 20.0 {
        volume / 20.0
    } else if volume > 90.0 {
        1.0 - (volume - 90.0) / 10.0
    } else if (40.0..=80.0).contains(&volume) {
        1.0
    } else {
        0.7
    };
    score.clamp(0.0, 1.0)
}

pub fn pace_score(words_per_minute: f64) -> f64 {
    if words_per_minute < 80.0 {
        0.5
    } else if words_per_minute > 200.0 {
        0.6
    } else if (120.0..=160.0).contains(&words_per_minute) {
        1.0
    } else {
        0.8
    }
}

/// Weighted voice confidence in [0, 1]; 0 without a transcript
pub fn voice_confidence(transcript: &str, volume: f64, clarity: f64, words_per_minute: f64) -> f64 {
    if word_count(transcript) == 0 {
        return 0.0;
    }
    let score = volume_score(volume) * 0.2
        + pace_score(words_per_minute) * 0.2
        + (clarity / 100.0).clamp(0.0, 1.0) * 0.3
        + filler_words_score(transcript) * 0.15
        + pause_pattern_score(transcript) * 0.15;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_skip_empty() {
        assert_eq!(sentences("Hello there. How are you?!"), vec!["Hello there", "How are you"]);
        assert!(sentences("   ").is_empty());
    }

    #[test]
    fn test_confidence_trait_balance() {
        assert_eq!(confidence_trait(""), 0.5);
        // 1 confident word out of 2 -> 0.5 + 0.5
        assert_eq!(confidence_trait("definitely yes"), 1.0);
        // 2 hesitations out of 2 -> -1 + 0.5 clamps to 0.1
        assert_eq!(confidence_trait("um maybe"), 0.1);
    }

    #[test]
    fn test_technical_and_leadership() {
        assert_eq!(technical_trait("I write code and design an algorithm."), 0.2);
        assert_eq!(leadership_trait("I led the team and managed leadership."), 0.6);
    }

    #[test]
    fn test_fallback_analysis_shape() {
        let analysis = fallback_interview_analysis("I am sure I can write good code.");
        assert_eq!(analysis.behavioral_flags.len(), 2);
        assert_eq!(analysis.risk_factors.len(), 1);
        assert_eq!(analysis.recommendations.len(), 2);
        assert_eq!(analysis.key_traits.communication, 0.7);
        assert!(analysis.key_traits.confidence > 0.5);
    }

    #[test]
    fn test_fallback_questions_respect_count() {
        let questions = fallback_follow_up_questions(QuestionKind::Hr, 2);
        assert_eq!(questions.len(), 2);
        assert!(questions[0].question.contains("team"));
        assert_eq!(fallback_follow_up_questions(QuestionKind::Behavioral, 10).len(), 3);
    }

    #[test]
    fn test_response_scoring() {
        assert_eq!(response_score("short answer"), 0.3);
        let long = "word ".repeat(120);
        assert_eq!(response_score(&long), 0.9);
    }

    #[test]
    fn test_response_strengths_and_weaknesses() {
        let answer = "For example, first I profiled the service, then I rewrote the algorithm.";
        let strengths = response_strengths(answer);
        assert_eq!(strengths.len(), 3);

        let weak = response_weaknesses("um, like, um, maybe");
        assert!(weak.contains(&"Excessive use of filler words".to_string()));
        assert!(weak.contains(&"Uses vague or noncommittal language".to_string()));
        assert!(weak.contains(&"Provides insufficient detail".to_string()));
    }

    #[test]
    fn test_speaking_pace_floors_minutes() {
        assert_eq!(speaking_pace("one two three", 10.0), 3.0);
        assert_eq!(speaking_pace("one two three four", 120.0), 2.0);
    }

    #[test]
    fn test_filler_score() {
        assert_eq!(filler_words_score("I built the parser"), 1.0);
        assert_eq!(filler_words_score("um I uh"), 0.0);
    }

    #[test]
    fn test_pause_pattern() {
        assert_eq!(pause_pattern_score("Just one sentence"), 0.5);
        let text = "I built a parser for the team. It handled five formats well.";
        // both sentences 7 and 5 words: (0.5) + (0.5 + 0.5) over 2
        assert!((pause_pattern_score(text) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_volume_and_pace_scores() {
        assert_eq!(volume_score(10.0), 0.5);
        assert_eq!(volume_score(60.0), 1.0);
        assert_eq!(volume_score(30.0), 0.7);
        assert_eq!(volume_score(150.0), 0.0);
        assert_eq!(pace_score(140.0), 1.0);
        assert_eq!(pace_score(60.0), 0.5);
        assert_eq!(pace_score(250.0), 0.6);
        assert_eq!(pace_score(100.0), 0.8);
    }

    #[test]
    fn test_voice_confidence_bounds() {
        assert_eq!(voice_confidence("", 50.0, 90.0, 140.0), 0.0);
        let score = voice_confidence("I am confident in this design.", 60.0, 500.0, 140.0);
        assert!(score > 0.0 && score <= 1.0);
    }
}
