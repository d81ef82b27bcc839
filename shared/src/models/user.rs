//! Actor and role models

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

/// Role tiers, ordered from least to most privileged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppRole {
    #[default]
    Viewer,
    Staff,
    Manager,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Viewer => "VIEWER",
            AppRole::Staff => "STAFF",
            AppRole::Manager => "MANAGER",
        }
    }
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIEWER" => Ok(AppRole::Viewer),
            "STAFF" => Ok(AppRole::Staff),
            "MANAGER" => Ok(AppRole::Manager),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// The authenticated person behind an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: AppRole,
    /// The partner store a Viewer is pinned to
    #[serde(default)]
    pub store_id: Option<Uuid>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: AppRole) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
            store_id: None,
        }
    }

    pub fn with_store(mut self, store_id: Uuid) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// Whether the actor's role is at least `required`
    pub fn has_role(&self, required: AppRole) -> bool {
        self.role >= required
    }

    /// Staff see every store; a Viewer sees only the store it is pinned to
    pub fn can_view_store(&self, store_id: Uuid) -> bool {
        self.has_role(AppRole::Staff) || self.store_id == Some(store_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tiers_are_ordered() {
        let manager = Actor::new("u1", "Ana", AppRole::Manager);
        let staff = Actor::new("u2", "Ben", AppRole::Staff);
        let viewer = Actor::new("u3", "Cy", AppRole::Viewer);

        assert!(manager.has_role(AppRole::Staff));
        assert!(staff.has_role(AppRole::Staff));
        assert!(!staff.has_role(AppRole::Manager));
        assert!(!viewer.has_role(AppRole::Staff));
    }

    #[test]
    fn test_viewer_sees_only_its_store() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let partner = Actor::new("u4", "Dee", AppRole::Viewer).with_store(own);
        let unassigned = Actor::new("u5", "Eli", AppRole::Viewer);
        let staff = Actor::new("u2", "Ben", AppRole::Staff);

        assert!(partner.can_view_store(own));
        assert!(!partner.can_view_store(other));
        assert!(!unassigned.can_view_store(own));
        assert!(staff.can_view_store(other));
    }

    #[test]
    fn test_missing_role_defaults_to_viewer() {
        assert_eq!(AppRole::default(), AppRole::Viewer);
        assert_eq!("MANAGER".parse::<AppRole>().unwrap(), AppRole::Manager);
        assert!("ADMIN".parse::<AppRole>().is_err());
    }
}
