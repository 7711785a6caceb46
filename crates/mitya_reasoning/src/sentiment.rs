//! Advisory sentiment scoring, delegated to the completion endpoint.
//!
//! The score drives reputation only; it must never block or fail a turn.
//! Every failure path — transport error, timeout, an answer with no
//! integer in it — collapses to the neutral 0.

use crate::llm::{ChatModel, CompletionParams};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

pub const SCORE_MIN: i64 = -5;
pub const SCORE_MAX: i64 = 5;

fn rubric(lang: &str, text: &str) -> String {
    match lang {
        "en" => format!(
            "You are a chat moderator. Rate the tone of the message with one integer:\n\
             -5 — insults, threats or aggression;\n\
             -1 — rudeness or passive aggression;\n\
             0 — neutral tone (undirected profanity is also 0);\n\
             1 — politeness or constructive tone;\n\
             5 — gratitude, praise or support.\n\
             When unsure, answer 0. Answer with the number only.\n\
             Message: {text}\n\
             Answer:"
        ),
        _ => format!(
            "Ты — модератор чата. Оцени тон сообщения одним целым числом:\n\
             -5 — оскорбления, угрозы или агрессия;\n\
             -1 — грубость или пассивная агрессия;\n\
             0 — нейтральный тон (мат без адресата — тоже 0);\n\
             1 — вежливость или конструктив;\n\
             5 — благодарность, похвала или поддержка.\n\
             Если сомневаешься — ответь 0. Ответь только числом.\n\
             Сообщение: {text}\n\
             Ответ:"
        ),
    }
}

pub struct SentimentClassifier {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
    lang: String,
    int_pattern: Regex,
}

impl SentimentClassifier {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration, lang: &str) -> Self {
        Self {
            model,
            timeout,
            lang: lang.to_string(),
            int_pattern: Regex::new(r"-?\d+").expect("static pattern"),
        }
    }

    /// Score free text on the fixed rubric, in [-5, 5].
    pub async fn score(&self, text: &str) -> i64 {
        let prompt = rubric(&self.lang, text);
        let params = CompletionParams {
            max_tokens: 5,
            temperature: 0.0,
        };

        let answer = match tokio::time::timeout(self.timeout, self.model.generate(&prompt, &params))
            .await
        {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                tracing::debug!("Sentiment call failed: {}", e);
                return 0;
            }
            Err(_) => {
                tracing::debug!("Sentiment call timed out");
                return 0;
            }
        };

        self.parse_score(&answer).unwrap_or(0)
    }

    /// First signed integer token of the answer, clamped to the scale.
    fn parse_score(&self, answer: &str) -> Option<i64> {
        let found = self.int_pattern.find(answer)?;
        let n: i64 = found.as_str().parse().ok()?;
        Some(n.clamp(SCORE_MIN, SCORE_MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockModel;

    fn classifier(model: MockModel) -> SentimentClassifier {
        SentimentClassifier::new(Arc::new(model), Duration::from_millis(200), "ru")
    }

    #[tokio::test]
    async fn test_bare_integer_answer() {
        let c = classifier(MockModel::replying("-5"));
        assert_eq!(c.score("да пошёл ты").await, -5);
    }

    #[tokio::test]
    async fn test_integer_with_chatter_around_it() {
        let c = classifier(MockModel::replying("Оценка: 1."));
        assert_eq!(c.score("спасибо большое").await, 1);
    }

    #[tokio::test]
    async fn test_out_of_scale_answer_is_clamped() {
        let c = classifier(MockModel::replying("-12"));
        assert_eq!(c.score("...").await, -5);
    }

    #[tokio::test]
    async fn test_unparsable_answer_is_neutral() {
        let c = classifier(MockModel::replying("I don't know"));
        assert_eq!(c.score("что-то").await, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_neutral() {
        let c = classifier(MockModel::failing());
        assert_eq!(c.score("что-то").await, 0);
    }

    #[tokio::test]
    async fn test_timeout_is_neutral() {
        let slow = MockModel::replying("5").with_delay(Duration::from_secs(5));
        let c = SentimentClassifier::new(Arc::new(slow), Duration::from_millis(20), "ru");
        assert_eq!(c.score("что-то").await, 0);
    }

    #[tokio::test]
    async fn test_prompt_carries_the_message() {
        let model = Arc::new(MockModel::replying("0"));
        let c = SentimentClassifier::new(model.clone(), Duration::from_millis(200), "ru");
        c.score("проверка связи").await;

        let prompts = model.generate_calls.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("проверка связи"));
    }
}
