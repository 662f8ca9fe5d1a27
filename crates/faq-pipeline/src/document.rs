use crate::model::{Answer, Document, DocumentMetadata, MergedRecord};

/// `"{author_name} {author_credential}: {text}"`
pub fn format_answer(answer: &Answer) -> String {
    format!(
        "{} {}: {}",
        answer.author_name, answer.author_credential, answer.text
    )
}

/// One formatted answer per line, in answer order.
pub fn format_answers(answers: &[Answer]) -> String {
    answers
        .iter()
        .map(format_answer)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build(merged: &MergedRecord) -> Document {
    Document {
        content: merged.question.clone(),
        metadata: DocumentMetadata {
            answers: format_answers(&merged.answers),
        },
    }
}

pub fn build_all(merged: &[MergedRecord]) -> Vec<Document> {
    merged.iter().map(build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_answer_in_order() {
        let merged = MergedRecord {
            title: "کم خونی".to_string(),
            question: "علت کم خونی چیست".to_string(),
            answers: vec![
                Answer {
                    author_name: "دکتر احمدی".to_string(),
                    author_credential: "متخصص داخلی".to_string(),
                    text: "آزمایش خون بدهید".to_string(),
                },
                Answer {
                    author_name: "دکتر کریمی".to_string(),
                    author_credential: "پزشک عمومی".to_string(),
                    text: "آهن مصرف کنید".to_string(),
                },
            ],
            sources: vec![0, 3],
        };

        let document = build(&merged);
        assert_eq!(document.content, "علت کم خونی چیست");

        let lines: Vec<&str> = document.metadata.answers.lines().collect();
        assert_eq!(
            lines,
            [
                "دکتر احمدی متخصص داخلی: آزمایش خون بدهید",
                "دکتر کریمی پزشک عمومی: آهن مصرف کنید",
            ]
        );
    }

    #[test]
    fn record_without_answers_has_empty_metadata() {
        let merged = MergedRecord {
            title: String::new(),
            question: "سوال".to_string(),
            answers: vec![],
            sources: vec![7],
        };
        let documents = build_all(std::slice::from_ref(&merged));
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].metadata.answers, "");
    }
}
