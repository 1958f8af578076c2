//! Per-operation-type validation.
//!
//! Validation is a pure function of `(type, data)` so that every honest
//! replica reaches the same decision for the same proposal. Anything that is
//! not explicitly well-formed is rejected; there is no partial approval.

use quorum_types::{Decision, OperationType, OrderStatus};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown operation type: {0}")]
    UnknownType(String),

    #[error("operation data must be a JSON object")]
    NotAnObject,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("field {0} must be a non-empty identifier")]
    InvalidIdentifier(&'static str),

    #[error("items must be a non-empty list")]
    EmptyItems,

    #[error("item {index} is invalid: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

/// Decide whether to approve an operation received over the wire.
///
/// Never fails: unknown types and malformed payloads are rejects.
pub fn validate(operation_type: &str, data: &Value) -> Decision {
    let result = operation_type
        .parse::<OperationType>()
        .map_err(|_| ValidationError::UnknownType(operation_type.to_string()))
        .and_then(|ty| check(ty, data));

    match result {
        Ok(()) => Decision::Approve,
        Err(e) => {
            warn!(operation_type, reason = %e, "validation rejected operation");
            Decision::Reject
        }
    }
}

/// Validate a typed operation, reporting the first rule it breaks.
pub fn check(operation_type: OperationType, data: &Value) -> Result<(), ValidationError> {
    let fields = data.as_object().ok_or(ValidationError::NotAnObject)?;
    match operation_type {
        OperationType::CreateOrder => check_create_order(fields),
        OperationType::UpdateStatus => check_update_status(fields),
        OperationType::CancelOrder => check_cancel_order(fields),
    }
}

fn check_create_order(fields: &Map<String, Value>) -> Result<(), ValidationError> {
    require_identifier(fields, "customer_id")?;

    let items = fields
        .get("items")
        .ok_or(ValidationError::MissingField("items"))?
        .as_array()
        .ok_or(ValidationError::EmptyItems)?;
    if items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }

    for (index, item) in items.iter().enumerate() {
        let item = item.as_object().ok_or_else(|| ValidationError::InvalidItem {
            index,
            reason: "not an object".into(),
        })?;
        if !item.get("product_id").is_some_and(is_identifier) {
            return Err(ValidationError::InvalidItem {
                index,
                reason: "missing product_id".into(),
            });
        }
        match item.get("quantity").and_then(Value::as_f64) {
            Some(quantity) if quantity > 0.0 => {}
            Some(quantity) => {
                return Err(ValidationError::InvalidItem {
                    index,
                    reason: format!("quantity {quantity} is not positive"),
                })
            }
            None => {
                return Err(ValidationError::InvalidItem {
                    index,
                    reason: "missing numeric quantity".into(),
                })
            }
        }
    }
    Ok(())
}

fn check_update_status(fields: &Map<String, Value>) -> Result<(), ValidationError> {
    require_identifier(fields, "order_id")?;
    let status = fields
        .get("status")
        .ok_or(ValidationError::MissingField("status"))?;
    let status = status
        .as_str()
        .ok_or_else(|| ValidationError::UnknownStatus(status.to_string()))?;
    status
        .parse::<OrderStatus>()
        .map_err(|_| ValidationError::UnknownStatus(status.to_string()))?;
    Ok(())
}

fn check_cancel_order(fields: &Map<String, Value>) -> Result<(), ValidationError> {
    require_identifier(fields, "order_id")
}

fn require_identifier(
    fields: &Map<String, Value>,
    name: &'static str,
) -> Result<(), ValidationError> {
    let value = fields.get(name).ok_or(ValidationError::MissingField(name))?;
    if is_identifier(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier(name))
    }
}

/// Non-blank strings and numbers both count as references.
fn is_identifier(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) => true,
        _ => false,
    }
}
