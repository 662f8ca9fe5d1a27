use serde::{Deserialize, Serialize};

/// One doctor's reply inside a thread.
///
/// Field names on the wire follow the records file produced by the crawler
/// (`dr_name`, `dr_exp`, `answer_text`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Doctor's display name, e.g. "دکتر مریم احمدی"
    #[serde(rename = "dr_name")]
    pub author_name: String,
    /// Specialty or credential line, e.g. "متخصص زنان و زایمان"
    #[serde(rename = "dr_exp")]
    pub author_credential: String,
    #[serde(rename = "answer_text")]
    pub text: String,
}

/// A question thread as scraped from the forum, all text already normalized.
///
/// Before deduplication a record is identified by its position in the records file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub title: String,
    pub question: String,
    /// Empty unless the source thread was marked answered.
    #[serde(default)]
    pub answers: Vec<Answer>,
    /// Absolute URL of the thread page, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A cluster of near-duplicate records folded into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedRecord {
    /// Title of the cluster anchor.
    pub title: String,
    /// Question text of the cluster anchor.
    pub question: String,
    /// Anchor answers first, then each member's answers in discovery order.
    pub answers: Vec<Answer>,
    /// Positions of the merged records in the input, anchor first.
    pub sources: Vec<usize>,
}

impl MergedRecord {
    /// Wrap a record that has no duplicates.
    pub fn single(index: usize, record: Record) -> Self {
        Self {
            title: record.title,
            question: record.question,
            answers: record.answers,
            sources: vec![index],
        }
    }
}

/// The unit handed to the retrieval index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Searchable text: the canonical question.
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Every answer rendered as `"{name} {credential}: {text}"`, one per line.
    pub answers: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reads_upstream_field_names() {
        let json = r#"{
            "question": "سردرد مزمن دارم",
            "answers": [
                {"dr_name": "دکتر رضایی", "dr_exp": "متخصص مغز و اعصاب", "answer_text": "نوار مغز بگیرید"}
            ]
        }"#;
        let record: Record = serde_json::from_str(json).expect("valid record json");
        assert_eq!(record.title, "");
        assert_eq!(record.link, None);
        assert_eq!(record.answers.len(), 1);
        assert_eq!(record.answers[0].author_name, "دکتر رضایی");
        assert_eq!(record.answers[0].author_credential, "متخصص مغز و اعصاب");
        assert_eq!(record.answers[0].text, "نوار مغز بگیرید");
    }

    #[test]
    fn record_without_link_omits_the_field() {
        let record = Record {
            title: "t".to_string(),
            question: "q".to_string(),
            answers: vec![],
            link: None,
        };
        let json = serde_json::to_value(&record).expect("serializable");
        assert!(json.get("link").is_none());
        assert_eq!(json["answers"], serde_json::json!([]));
    }
}
