use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, Timestamps};

/// Access level attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Agent,
    #[serde(alias = "buyer")]
    Customer,
    Builder,
}

impl Role {
    pub const fn ordered() -> [Self; 4] {
        [Self::Admin, Self::Agent, Self::Customer, Self::Builder]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::Customer => "customer",
            Self::Builder => "builder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "agent" => Some(Self::Agent),
            "customer" | "buyer" => Some(Self::Customer),
            "builder" => Some(Self::Builder),
            _ => None,
        }
    }

    /// Roles a visitor may pick for themselves at registration.
    pub const fn self_registrable(self) -> bool {
        !matches!(self, Self::Admin)
    }

    /// Roles that may publish property listings.
    pub const fn can_list_properties(self) -> bool {
        matches!(self, Self::Admin | Self::Agent | Self::Builder)
    }
}

/// Stored account document. Never serialized to clients directly; see [`UserView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    pub active: bool,
    /// Saved property ids, most recent last.
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

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

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: self.phone.clone(),
            active: self.active,
            favorites: self.favorites.len(),
            created_at: self.stamps.created_at,
        }
    }
}

/// Sanitized representation of an account exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub active: bool,
    pub favorites: usize,
    pub created_at: DateTime<Utc>,
}
