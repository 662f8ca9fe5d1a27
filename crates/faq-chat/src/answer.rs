/// Retrieval-augmented answers.
///
/// Retrieved FAQ entries are rendered into a fixed system instruction and the patient's
/// question is sent as the user turn. Generation sits behind [`AnswerGenerator`] so the
/// server can be exercised without a model.
use std::future::Future;

use faq_common::openai::{ChatCompletionRequest, Message, OpenAiClient};
use tracing::debug;

use crate::error::AppError;
use crate::model::FaqHit;

/// `{context}` is replaced with the rendered FAQ entries.
pub const SYSTEM_TEMPLATE: &str = "\
You are a medical FAQ assistant. Answer the patient's question using only the doctors' \
answers in the context below. Reply in the same language as the question. If the context \
does not contain the answer, say that no doctor has answered this question yet and \
recommend seeing a physician. Never invent diagnoses, drugs or dosages.

Context:
{context}";

pub trait AnswerGenerator: Send + Sync {
    fn generate_answer(
        &self,
        question: &str,
        context: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Render hits as numbered question/answers blocks separated by blank lines.
pub fn format_context(hits: &[FaqHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}\n{}", i + 1, hit.question, hit.answers))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_messages(question: &str, context: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_TEMPLATE.replace("{context}", context)),
        Message::user(question),
    ]
}

/// Render `hits` as context and ask `generator` to answer `question` from them.
///
/// Runs even with no hits: the instruction tells the model to say the answer is unknown.
pub async fn answer_from_hits<G: AnswerGenerator>(
    generator: &G,
    question: &str,
    hits: &[FaqHit],
) -> Result<String, AppError> {
    let context = format_context(hits);
    debug!(hits = hits.len(), context_chars = context.chars().count(), "generating answer");
    generator.generate_answer(question, &context).await
}

/// Generates answers through an OpenAI-compatible chat completions endpoint.
pub struct ChatAnswerGenerator {
    client: OpenAiClient,
    model: String,
    temperature: Option<f32>,
}

impl ChatAnswerGenerator {
    pub fn new(client: OpenAiClient, model: String, temperature: Option<f32>) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

impl AnswerGenerator for ChatAnswerGenerator {
    async fn generate_answer(&self, question: &str, context: &str) -> Result<String, AppError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_messages(question, context),
            temperature: self.temperature,
            max_tokens: None,
        };
        let response = self.client.chat_completions(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        response
            .first_content()
            .map(str::trim)
            .filter(|answer| !answer.is_empty())
            .map(str::to_string)
            .ok_or(AppError::EmptyAnswer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Echoes the context back and records what it was asked.
    #[derive(Default)]
    struct EchoGenerator {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl AnswerGenerator for EchoGenerator {
        async fn generate_answer(&self, question: &str, context: &str) -> Result<String, AppError> {
            self.seen
                .lock()
                .expect("seen lock")
                .push((question.to_string(), context.to_string()));
            Ok(format!("echo: {context}"))
        }
    }

    fn hit(id: &str, question: &str, answers: &str) -> FaqHit {
        FaqHit {
            id: id.to_string(),
            question: question.to_string(),
            answers: answers.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn context_numbers_each_entry() {
        let context = format_context(&[
            hit("faq-1", "سردرد", "دکتر الف متخصص: استراحت\nدکتر ب عمومی: مسکن"),
            hit("faq-2", "تب", "دکتر ج عمومی: آب"),
        ]);
        assert_eq!(
            context,
            "[1] سردرد\nدکتر الف متخصص: استراحت\nدکتر ب عمومی: مسکن\n\n[2] تب\nدکتر ج عمومی: آب"
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn messages_embed_context_in_the_system_turn() {
        let messages = build_messages("سردرد دارم", "[1] سردرد\nپاسخ");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.ends_with("Context:\n[1] سردرد\nپاسخ"));
        assert!(!messages[0].content.contains("{context}"));
        assert_eq!(messages[1], Message::user("سردرد دارم"));
    }

    #[tokio::test]
    async fn answers_are_generated_from_rendered_hits() {
        let generator = EchoGenerator::default();
        let answer = answer_from_hits(&generator, "تب دارم", &[hit("faq-2", "تب", "دکتر: آب")])
            .await
            .expect("stub never fails");
        assert_eq!(answer, "echo: [1] تب\nدکتر: آب");

        let answer = answer_from_hits(&generator, "سوال بی ربط", &[])
            .await
            .expect("stub never fails");
        assert_eq!(answer, "echo: ");

        let seen = generator.seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "تب دارم");
        assert_eq!(seen[1].1, "");
    }
}
