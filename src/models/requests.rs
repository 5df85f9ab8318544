//! Request DTOs for the sprite cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::favorites::ItemId;

/// Request body for POST /favorites/toggle
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleRequest {
    /// Catalog item to flip
    pub id: ItemId,
}

impl ToggleRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_item_id(self.id)
    }
}

/// Catalog ids start at 1.
pub fn validate_item_id(id: ItemId) -> Option<String> {
    if id == 0 {
        return Some("Item id must be at least 1".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_request_deserialize() {
        let req: ToggleRequest = serde_json::from_str(r#"{"id": 25}"#).unwrap();
        assert_eq!(req.id, 25);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_toggle_request_rejects_negative() {
        assert!(serde_json::from_str::<ToggleRequest>(r#"{"id": -1}"#).is_err());
    }

    #[test]
    fn test_validate_zero_id() {
        let req = ToggleRequest { id: 0 };
        assert!(req.validate().is_some());
    }
}
