use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Kinds of audited actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Join,
    Edit,
    Leave,
    Lock,
    Unlock,
}

impl AuditAction {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "create" => Ok(AuditAction::Create),
            "join" => Ok(AuditAction::Join),
            "edit" => Ok(AuditAction::Edit),
            "leave" => Ok(AuditAction::Leave),
            "lock" => Ok(AuditAction::Lock),
            "unlock" => Ok(AuditAction::Unlock),
            _ => Err(format!("Invalid audit action: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Join => "join",
            AuditAction::Edit => "edit",
            AuditAction::Leave => "leave",
            AuditAction::Lock => "lock",
            AuditAction::Unlock => "unlock",
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEvent {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub action: String, // Stored as TEXT, use AuditAction enum for type safety
    pub actor: String,
    pub details: Value,
    pub created_at: NaiveDateTime,
}

impl AuditEvent {
    pub fn new(
        competition_id: Uuid,
        action: AuditAction,
        actor: String,
        details: Value,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            competition_id,
            action: action.as_str().to_string(),
            actor,
            details,
            created_at,
        }
    }

    pub fn action_enum(&self) -> Option<AuditAction> {
        AuditAction::from_str(&self.action).ok()
    }
}
