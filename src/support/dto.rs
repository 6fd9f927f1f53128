use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{NewTicket, Ticket, TicketMessage, TicketPriority, TicketStatus};
use crate::error::{AppError, AppResult};
use crate::params::{nullable, PageRequest};

const MAX_SUBJECT_LEN: usize = 200;
const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<TicketPriority>,
}

impl CreateTicketRequest {
    pub fn validate(self) -> AppResult<NewTicket> {
        let subject = self.subject.trim().to_string();
        let description = self.description.trim().to_string();
        if subject.is_empty() {
            return Err(AppError::bad_request("subject is required"));
        }
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(AppError::bad_request(format!(
                "subject must be at most {MAX_SUBJECT_LEN} characters"
            )));
        }
        if description.is_empty() {
            return Err(AppError::bad_request("description is required"));
        }
        Ok(NewTicket {
            subject,
            description,
            category: category_or_default(self.category),
            priority: self.priority.unwrap_or(TicketPriority::Medium),
        })
    }
}

pub fn category_or_default(category: Option<String>) -> String {
    category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<TicketStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdminTicketsQuery {
    pub status: Option<TicketStatus>,
    pub assigned_to: Option<Uuid>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl TicketPage {
    pub fn new(tickets: Vec<Ticket>, total: i64, req: PageRequest) -> Self {
        Self {
            tickets,
            total,
            page: req.page,
            per_page: req.per_page,
            total_pages: req.total_pages(total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub messages: Vec<TicketMessage>,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<String>,
    /// `null` unassigns the ticket.
    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to: Option<Option<Uuid>>,
}

impl UpdateTicketRequest {
    /// Assignee to store: the requested one, or `current` when the field was omitted.
    pub fn assignee(&self, current: Option<Uuid>) -> Option<Uuid> {
        self.assigned_to.unwrap_or(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(subject: &str, description: &str) -> CreateTicketRequest {
        CreateTicketRequest {
            subject: subject.into(),
            description: description.into(),
            category: None,
            priority: None,
        }
    }

    #[test]
    fn defaults_category_and_priority() {
        let t = request(" Where is my parcel? ", "Order hasn't arrived").validate().unwrap();
        assert_eq!(t.subject, "Where is my parcel?");
        assert_eq!(t.category, "general");
        assert_eq!(t.priority, TicketPriority::Medium);
    }

    #[test]
    fn rejects_blank_fields_and_long_subjects() {
        assert!(request("   ", "x").validate().is_err());
        assert!(request("Help", " ").validate().is_err());
        assert!(request(&"s".repeat(201), "x").validate().is_err());
    }

    #[test]
    fn category_is_normalized() {
        assert_eq!(category_or_default(Some(" Billing ".into())), "billing");
        assert_eq!(category_or_default(Some("".into())), "general");
    }

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        let s: TicketStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(s, TicketStatus::InProgress);
    }

    #[test]
    fn assignee_can_be_cleared_or_kept() {
        let admin = Uuid::new_v4();
        let keep: UpdateTicketRequest = serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(keep.assignee(Some(admin)), Some(admin));

        let clear: UpdateTicketRequest = serde_json::from_str(r#"{"assigned_to":null}"#).unwrap();
        assert_eq!(clear.assignee(Some(admin)), None);
    }
}
