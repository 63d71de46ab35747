//! Reference dataset records (USDA FoodData Central).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One food from a bulk reference dataset.
///
/// Serializes back to the object it was read from, `description` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub description: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ReferenceRecord {
    /// Build a record from a dataset item.
    ///
    /// Returns `None` unless the item is an object with a non-empty string
    /// `description`.
    pub fn from_value(item: &Value) -> Option<Self> {
        let object = item.as_object()?;
        let description = object.get("description")?.as_str()?;
        if description.is_empty() {
            return None;
        }

        let mut fields = object.clone();
        fields.remove("description");
        Some(Self {
            description: description.to_string(),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roundtrips_the_source_object() {
        let item = json!({ "fdcId": 1, "description": "Milk", "dataType": "Foundation" });
        let record = ReferenceRecord::from_value(&item).unwrap();

        assert_eq!(record.description, "Milk");
        assert!(!record.fields.contains_key("description"));
        assert_eq!(serde_json::to_value(&record).unwrap(), item);
    }

    #[test]
    fn requires_description() {
        assert!(ReferenceRecord::from_value(&json!({ "fdcId": 1 })).is_none());
        assert!(ReferenceRecord::from_value(&json!({ "description": "" })).is_none());
        assert!(ReferenceRecord::from_value(&json!({ "description": 5 })).is_none());
        assert!(ReferenceRecord::from_value(&json!("Milk")).is_none());
    }
}
