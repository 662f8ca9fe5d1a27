//! Thread-page extraction.
//!
//! A thread page carries one question and the doctors' answers to it:
//! - the first heading is the thread title
//! - the question container holds the patient's question, split over several text nodes
//! - each answer block holds the doctor's name, their credential line and the reply text
//!
//! Text fragments inside an element are trimmed, joined with single spaces and normalized.
use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{ExtractError, PipelineError};
use crate::model::{Answer, Record};
use crate::normalize::Normalizer;

/// CSS selectors for the parts of a thread page.
#[derive(Debug, Clone)]
pub struct ThreadSelectors {
    pub title: String,
    pub question: String,
    pub answer_block: String,
    pub author_name: String,
    pub author_credential: String,
    pub answer_text: String,
}

impl Default for ThreadSelectors {
    fn default() -> Self {
        Self {
            title: "h1".to_string(),
            question: "div.question-text".to_string(),
            answer_block: "div.answer".to_string(),
            author_name: ".dr-name".to_string(),
            author_credential: ".dr-exp".to_string(),
            answer_text: ".answer-text".to_string(),
        }
    }
}

pub(crate) fn compile(selector: &str) -> Result<Selector, PipelineError> {
    Selector::parse(selector).map_err(|e| PipelineError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Trim each fragment, drop empty ones, join the rest with single spaces.
pub fn join_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct Extractor {
    normalizer: Arc<Normalizer>,
    title: Selector,
    question: Selector,
    answer_block: Selector,
    author_name: Selector,
    author_credential: Selector,
    answer_text: Selector,
}

impl Extractor {
    pub fn new(
        normalizer: Arc<Normalizer>,
        selectors: &ThreadSelectors,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            normalizer,
            title: compile(&selectors.title)?,
            question: compile(&selectors.question)?,
            answer_block: compile(&selectors.answer_block)?,
            author_name: compile(&selectors.author_name)?,
            author_credential: compile(&selectors.author_credential)?,
            answer_text: compile(&selectors.answer_text)?,
        })
    }

    /// Build a record from one answered thread page.
    ///
    /// `fallback_question` is the already normalized preview from the listing page; it stands
    /// in when the thread page has no usable question. Fails when the title is missing or
    /// normalizes to nothing, or when neither source yields a question. Answer blocks
    /// without reply text are dropped; a missing name or credential becomes an empty string.
    pub fn extract_thread(
        &self,
        html: &str,
        link: Option<&str>,
        fallback_question: Option<&str>,
    ) -> Result<Record, ExtractError> {
        let document = Html::parse_document(html);

        let title = self.required(&document, &self.title, "title")?;
        let question = match self.required(&document, &self.question, "question") {
            Ok(question) => question,
            Err(e) => match fallback_question.filter(|q| !q.is_empty()) {
                Some(preview) => {
                    debug!(error = %e, "using listing preview as the question");
                    preview.to_string()
                }
                None => return Err(e),
            },
        };

        let mut answers = Vec::new();
        for (position, block) in document.select(&self.answer_block).enumerate() {
            let text = self.first_text(block, &self.answer_text);
            if text.is_empty() {
                debug!(position, "answer block without text, skipping");
                continue;
            }
            answers.push(Answer {
                author_name: self.first_text(block, &self.author_name),
                author_credential: self.first_text(block, &self.author_credential),
                text,
            });
        }

        Ok(Record {
            title,
            question,
            answers,
            link: link.map(str::to_string),
        })
    }

    /// Normalized text of `element`.
    pub fn field_text(&self, element: ElementRef<'_>) -> String {
        self.normalizer.normalize(&join_fragments(element.text()))
    }

    fn required(
        &self,
        document: &Html,
        selector: &Selector,
        name: &'static str,
    ) -> Result<String, ExtractError> {
        let element = document
            .select(selector)
            .next()
            .ok_or(ExtractError::MissingField(name))?;
        let text = self.field_text(element);
        if text.is_empty() {
            return Err(ExtractError::EmptyField(name));
        }
        Ok(text)
    }

    fn first_text(&self, scope: ElementRef<'_>, selector: &Selector) -> String {
        scope
            .select(selector)
            .next()
            .map(|el| self.field_text(el))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(Arc::new(Normalizer::new()), &ThreadSelectors::default())
            .expect("default selectors compile")
    }

    const THREAD: &str = r#"
        <html><body>
          <h1>  سردرد بعد از ورزش </h1>
          <div class="question-text">
            <p>سلام، بعد از دويدن</p>
            <p>سردرد شديد می‌گيرم.</p>
          </div>
          <div class="answer">
            <span class="dr-name">دكتر علي رضايي</span>
            <span class="dr-exp">متخصص مغز و اعصاب</span>
            <div class="answer-text"><p>فشار خون را</p><p>چک کنيد</p></div>
          </div>
          <div class="answer">
            <span class="dr-name">دکتر بدون پاسخ</span>
          </div>
          <div class="answer">
            <div class="answer-text">آب کافی بنوشید</div>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_and_normalizes_every_field() {
        let record = extractor()
            .extract_thread(THREAD, Some("https://example.org/faq/1"), Some("پیش نمایش"))
            .expect("thread extracts");

        assert_eq!(record.title, "سردرد بعد از ورزش");
        assert_eq!(record.question, "سلام، بعد از دویدن سردرد شدید می گیرم.");
        assert_eq!(record.link.as_deref(), Some("https://example.org/faq/1"));

        assert_eq!(record.answers.len(), 2);
        assert_eq!(record.answers[0].author_name, "دکتر علی رضایی");
        assert_eq!(record.answers[0].author_credential, "متخصص مغز و اعصاب");
        assert_eq!(record.answers[0].text, "فشار خون را چک کنید");

        assert_eq!(record.answers[1].author_name, "");
        assert_eq!(record.answers[1].author_credential, "");
        assert_eq!(record.answers[1].text, "آب کافی بنوشید");
    }

    #[test]
    fn missing_title_is_reported() {
        let html = r#"<div class="question-text">سوال</div>"#;
        assert_eq!(
            extractor().extract_thread(html, None, Some("سوال")),
            Err(ExtractError::MissingField("title"))
        );
    }

    #[test]
    fn blank_question_is_reported() {
        let html = "<h1>عنوان</h1><div class=\"question-text\"> \u{200c} </div>";
        assert_eq!(
            extractor().extract_thread(html, None, None),
            Err(ExtractError::EmptyField("question"))
        );
        assert_eq!(
            extractor().extract_thread(html, None, Some("")),
            Err(ExtractError::EmptyField("question"))
        );
    }

    #[test]
    fn listing_preview_stands_in_for_a_missing_question() {
        let html = r#"<h1>عنوان</h1><div class="answer"><div class="answer-text">پاسخ</div></div>"#;
        let record = extractor()
            .extract_thread(html, None, Some("سوال کوتاه"))
            .expect("preview fills the question");
        assert_eq!(record.question, "سوال کوتاه");
        assert_eq!(record.answers.len(), 1);

        assert_eq!(
            extractor().extract_thread(html, None, None),
            Err(ExtractError::MissingField("question"))
        );
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let selectors = ThreadSelectors {
            title: "h1[".to_string(),
            ..ThreadSelectors::default()
        };
        let err = Extractor::new(Arc::new(Normalizer::new()), &selectors)
            .err()
            .expect("selector should not compile");
        assert!(matches!(err, PipelineError::Selector { .. }));
    }

    #[test]
    fn join_fragments_collapses_blank_nodes() {
        assert_eq!(join_fragments(["  a ", "\n", "b", ""]), "a b");
        assert_eq!(join_fragments(Vec::<&str>::new()), "");
    }
}
