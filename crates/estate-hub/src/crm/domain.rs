use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, Timestamps};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::New,
            Self::Contacted,
            Self::Qualified,
            Self::Converted,
            Self::Lost,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Call,
    Email,
    Meeting,
    Note,
    Whatsapp,
}

impl Channel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Meeting => "meeting",
            Self::Note => "note",
            Self::Whatsapp => "whatsapp",
        }
    }
}

/// One logged touchpoint with a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Communication {
    pub id: String,
    pub channel: Channel,
    pub summary: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// An inquiry from a prospective buyer or tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub communications: Vec<Communication>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for Lead {
    const COLLECTION: &'static str = "leads";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps(&self) -> &Timestamps {
        &self.stamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.stamps
    }
}

impl Lead {
    /// Logs a touchpoint; the first contact moves a new lead to contacted.
    pub fn record(&mut self, communication: Communication) {
        if self.status == LeadStatus::New {
            self.status = LeadStatus::Contacted;
        }
        self.communications.push(communication);
    }
}

#[derive(Debug, Deserialize)]
pub struct LeadInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Status change and (admin only) reassignment. An empty assignee clears it.
#[derive(Debug, Default, Deserialize)]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    pub assigned_agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommunicationInput {
    pub channel: Channel,
    pub summary: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub property_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
