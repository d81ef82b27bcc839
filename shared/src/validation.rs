//! Validation utilities for the consignment ledger
//!
//! Pure checks shared by the backend validator and any client that wants to
//! pre-validate a movement before submitting it.

use crate::models::{LocationKind, MovementAction, SideArity, UnitType};

// ============================================================================
// Movement Rules
// ============================================================================

/// Check the location kinds on each side of a movement against the action's rule.
///
/// `same_location` reports whether `from` and `to` name the same location when
/// both are present. Fails closed with a message naming the violated side.
pub fn validate_location_kinds(
    action: MovementAction,
    from: Option<LocationKind>,
    to: Option<LocationKind>,
    same_location: bool,
) -> Result<(), String> {
    let rule = action.rule();

    if rule.sides == SideArity::ExactlyOne && from.is_some() == to.is_some() {
        return Err(format!(
            "{} requires exactly one of source or destination",
            action
        ));
    }

    check_side(action, "source", rule.from, from)?;
    check_side(action, "destination", rule.to, to)?;

    if rule.sides == SideArity::SameLocation && !same_location {
        return Err(format!(
            "{} must use the same location as source and destination",
            action
        ));
    }

    Ok(())
}

fn check_side(
    action: MovementAction,
    side: &str,
    rule: crate::models::SideRule,
    kind: Option<LocationKind>,
) -> Result<(), String> {
    use crate::models::SideRule;

    if rule.allows(kind) {
        return Ok(());
    }

    match (rule, kind) {
        (SideRule::Absent, _) => Err(format!("{} should not have a {} location", action, side)),
        (SideRule::Required(_), None) => Err(format!("{} requires a {} location", action, side)),
        (SideRule::Required(kinds), Some(kind)) | (SideRule::Optional(kinds), Some(kind)) => {
            Err(format!(
                "{}: {} must be {}, got {}",
                action,
                side,
                join_kinds(kinds),
                kind
            ))
        }
        (SideRule::Optional(_), None) => Ok(()),
    }
}

fn join_kinds(kinds: &[LocationKind]) -> String {
    kinds
        .iter()
        .map(LocationKind::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Check that the action moves this unit type
pub fn validate_unit_type(action: MovementAction, unit_type: UnitType) -> Result<(), String> {
    if action.rule().units.contains(&unit_type) {
        Ok(())
    } else {
        Err(format!("{} cannot move {} units", action, unit_type))
    }
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// SKUs are free-form but must not be blank
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.trim().is_empty() {
        return Err("SKU is required");
    }
    Ok(())
}

/// Validate a scanned or typed barcode value
pub fn validate_barcode_value(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Barcode value is required");
    }
    if value.chars().any(char::is_whitespace) {
        return Err("Barcode value cannot contain whitespace");
    }
    Ok(())
}

/// Required free text (reasons, names) must have non-whitespace content
pub fn validate_required_text(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Value is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds() -> Vec<Option<LocationKind>> {
        std::iter::once(None)
            .chain(LocationKind::ALL.into_iter().map(Some))
            .collect()
    }

    /// Allowed (from, to) pairs written out by hand for each action
    fn allowed(action: MovementAction, from: Option<LocationKind>, to: Option<LocationKind>) -> bool {
        use LocationKind::*;
        match action {
            MovementAction::Receive => from.is_none() && to == Some(Storage),
            MovementAction::PutOnShelf => from == Some(Storage) && to == Some(Shelf),
            MovementAction::TakeOffShelf => {
                from == Some(Shelf) && matches!(to, Some(Storage) | Some(Truck))
            }
            MovementAction::DeliverToStore => {
                matches!(from, Some(Storage) | Some(Shelf) | Some(Truck)) && to == Some(Store)
            }
            MovementAction::ReturnFromStore => {
                from == Some(Store) && matches!(to, Some(Storage) | Some(Truck))
            }
            MovementAction::ConvertBoxToPacks => {
                matches!(from, Some(Storage) | Some(Shelf)) && from == to
            }
            MovementAction::SaleRetailPack | MovementAction::SaleRetailBox => {
                matches!(from, Some(Shelf) | Some(Storage)) && to.is_none()
            }
            MovementAction::Adjustment => from.is_some() != to.is_some(),
        }
    }

    #[test]
    fn test_validator_accepts_exactly_the_allowed_pairs() {
        for action in MovementAction::ALL {
            for from in kinds() {
                for to in kinds() {
                    let same = from.is_some() && from == to;
                    let result = validate_location_kinds(action, from, to, same);
                    assert_eq!(
                        result.is_ok(),
                        allowed(action, from, to),
                        "{} from {:?} to {:?}: {:?}",
                        action,
                        from,
                        to,
                        result
                    );
                }
            }
        }
    }

    #[test]
    fn test_missing_source_message() {
        let err = validate_location_kinds(
            MovementAction::PutOnShelf,
            None,
            Some(LocationKind::Shelf),
            false,
        )
        .unwrap_err();
        assert_eq!(err, "PUT_ON_SHELF requires a source location");
    }

    #[test]
    fn test_forbidden_source_message() {
        let err = validate_location_kinds(
            MovementAction::Receive,
            Some(LocationKind::Truck),
            Some(LocationKind::Storage),
            false,
        )
        .unwrap_err();
        assert_eq!(err, "RECEIVE should not have a source location");
    }

    #[test]
    fn test_wrong_kind_message_lists_allowed_kinds() {
        let err = validate_location_kinds(
            MovementAction::DeliverToStore,
            Some(LocationKind::Store),
            Some(LocationKind::Store),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            "DELIVER_TO_STORE: source must be STORAGE or SHELF or TRUCK, got STORE"
        );
    }

    #[test]
    fn test_conversion_needs_one_location() {
        let err = validate_location_kinds(
            MovementAction::ConvertBoxToPacks,
            Some(LocationKind::Storage),
            Some(LocationKind::Shelf),
            false,
        )
        .unwrap_err();
        assert!(err.contains("same location"));
    }

    #[test]
    fn test_adjustment_with_both_sides_is_rejected() {
        let err = validate_location_kinds(
            MovementAction::Adjustment,
            Some(LocationKind::Storage),
            Some(LocationKind::Shelf),
            false,
        )
        .unwrap_err();
        assert!(err.contains("exactly one"));
    }

    #[test]
    fn test_unit_rules() {
        assert!(validate_unit_type(MovementAction::Receive, UnitType::Box).is_ok());
        assert!(validate_unit_type(MovementAction::Receive, UnitType::Pack).is_err());
        assert!(validate_unit_type(MovementAction::SaleRetailPack, UnitType::Box).is_err());
        assert!(validate_unit_type(MovementAction::PutOnShelf, UnitType::Pack).is_ok());
        assert!(validate_unit_type(MovementAction::DeliverToStore, UnitType::Pack).is_err());
    }

    #[test]
    fn test_sku_format() {
        assert!(validate_sku("MG-OG-001").is_ok());
        assert!(validate_sku("house blend 250g").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
    }

    #[test]
    fn test_barcode_value() {
        assert!(validate_barcode_value("012345678905").is_ok());
        assert!(validate_barcode_value("   ").is_err());
        assert!(validate_barcode_value("0123 4567").is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("damaged in transit").is_ok());
        assert!(validate_required_text("  ").is_err());
    }
}
