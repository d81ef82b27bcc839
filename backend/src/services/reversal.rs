//! Reversal engine
//!
//! A mistake is undone by appending a compensating row with the sides swapped
//! and stamping the original once. Reversals are never reversed themselves.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{validate_required_text, Actor, AppRole, Movement};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Reversal service
#[derive(Clone)]
pub struct ReversalService {
    store: Arc<dyn LedgerStore>,
}

/// Input for reversing a movement
#[derive(Debug, Clone, Deserialize)]
pub struct ReverseInput {
    pub reason: String,
}

impl ReversalService {
    /// Create a new ReversalService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Reverse a movement and return the reversal row.
    ///
    /// Activity of the product or locations is not re-checked; a reversal of
    /// a row at a since-deactivated shelf is still allowed.
    pub async fn reverse_movement(
        &self,
        actor: &Actor,
        movement_id: Uuid,
        input: ReverseInput,
    ) -> AppResult<Movement> {
        require_role(actor, AppRole::Manager, "Reversing movements")?;

        let reason = input.reason.trim();
        validate_required_text(reason)
            .map_err(|_| AppError::field("reason", "A reversal requires a reason"))?;

        let original = self
            .store
            .get_movement(movement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        if original.is_reversal {
            return Err(AppError::ReversalOfReversal(original.id));
        }
        if original.reversed_by_id.is_some() {
            return Err(AppError::AlreadyReversed(original.id));
        }

        let reversal = original.reversal(reason, &actor.user_id, Utc::now());

        // The store re-checks the stamp inside its transaction
        self.store.append_reversal(&reversal).await?;

        tracing::info!(
            movement_id = %original.id,
            reversal_id = %reversal.id,
            action = %original.action,
            performed_by = %actor.user_id,
            "Movement reversed"
        );

        Ok(reversal)
    }
}
