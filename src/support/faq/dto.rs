use serde::Deserialize;

use super::repo::{Faq, FaqCategory, FaqFields};
use crate::error::{AppError, AppResult};

const MAX_QUESTION_LEN: usize = 500;
const MAX_TAGS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ListFaqsQuery {
    pub category: Option<FaqCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SearchFaqsQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub helpful: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    pub category: Option<FaqCategory>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFaqRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<FaqCategory>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl CreateFaqRequest {
    pub fn into_fields(self) -> AppResult<FaqFields> {
        validate(FaqFields {
            question: self.question,
            answer: self.answer,
            category: self.category.unwrap_or(FaqCategory::General),
            tags: self.tags,
            is_active: true,
        })
    }
}

impl UpdateFaqRequest {
    pub fn apply(self, current: Faq) -> AppResult<FaqFields> {
        validate(FaqFields {
            question: self.question.unwrap_or(current.question),
            answer: self.answer.unwrap_or(current.answer),
            category: self.category.unwrap_or(current.category),
            tags: self.tags.unwrap_or(current.tags),
            is_active: self.is_active.unwrap_or(current.is_active),
        })
    }
}

/// Lowercased, trimmed, deduplicated tags in first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn validate(mut f: FaqFields) -> AppResult<FaqFields> {
    f.question = f.question.trim().to_string();
    f.answer = f.answer.trim().to_string();
    if f.question.is_empty() {
        return Err(AppError::bad_request("question is required"));
    }
    if f.question.chars().count() > MAX_QUESTION_LEN {
        return Err(AppError::bad_request(format!(
            "question must be at most {MAX_QUESTION_LEN} characters"
        )));
    }
    if f.answer.is_empty() {
        return Err(AppError::bad_request("answer is required"));
    }
    f.tags = normalize_tags(f.tags);
    if f.tags.len() > MAX_TAGS {
        return Err(AppError::bad_request(format!("at most {MAX_TAGS} tags are allowed")));
    }
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn create_defaults_to_general_and_cleans_tags() {
        let req: CreateFaqRequest = serde_json::from_str(
            r#"{"question":" How do I track my order? ","answer":"Use the tracking number.","tags":["Tracking"," orders ","tracking",""]}"#,
        )
        .unwrap();
        let f = req.into_fields().unwrap();
        assert_eq!(f.question, "How do I track my order?");
        assert_eq!(f.category, FaqCategory::General);
        assert_eq!(f.tags, vec!["tracking", "orders"]);
        assert!(f.is_active);
    }

    #[test]
    fn create_requires_question_and_answer() {
        let blank = CreateFaqRequest {
            question: "  ".into(),
            answer: "x".into(),
            category: None,
            tags: Vec::new(),
        };
        assert_eq!(
            blank.into_fields().unwrap_err().to_string(),
            "question is required"
        );
        let no_answer = CreateFaqRequest {
            question: "Returns?".into(),
            answer: "".into(),
            category: Some(FaqCategory::Returns),
            tags: Vec::new(),
        };
        assert!(matches!(no_answer.into_fields(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn update_can_retire_an_entry() {
        let now = OffsetDateTime::now_utc();
        let current = Faq {
            id: Uuid::new_v4(),
            question: "Do you ship abroad?".into(),
            answer: "Yes.".into(),
            category: FaqCategory::Shipping,
            tags: vec!["shipping".into()],
            is_active: true,
            views: 3,
            helpful_votes: 1,
            not_helpful_votes: 0,
            created_at: now,
            updated_at: now,
        };
        let patch = UpdateFaqRequest {
            is_active: Some(false),
            ..Default::default()
        };
        let f = patch.apply(current).unwrap();
        assert!(!f.is_active);
        assert_eq!(f.category, FaqCategory::Shipping);
        assert_eq!(f.tags, vec!["shipping"]);
    }

    #[test]
    fn unknown_category_is_rejected_at_parse() {
        assert!(serde_json::from_str::<ListFaqsQuery>(r#"{"category":"billing"}"#).is_err());
    }
}
