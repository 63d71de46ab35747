//! Registry records as decoded from the Livsmedelsverket API.
//!
//! Every record keeps the exact JSON it was decoded from (`raw`) next to the
//! few typed fields the pipeline needs. Decoding never fails: a field of the
//! wrong shape falls back to its default.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Registry language variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "sv")]
    Swedish,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Swedish, Language::English];

    /// Value of the `sprak` query parameter.
    pub fn selector(self) -> u8 {
        match self {
            Language::Swedish => 1,
            Language::English => 2,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Swedish => "sv",
            Language::English => "en",
        }
    }

    /// The other variant.
    pub fn other(self) -> Self {
        match self {
            Language::Swedish => Language::English,
            Language::English => Language::Swedish,
        }
    }
}

/// One food in the primary registry listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntity {
    pub id: u64,
    pub raw: Value,
}

impl RegistryEntity {
    /// Build an entity from a listing item, if it carries an integer `nummer`.
    pub fn from_listing(raw: Value) -> Option<Self> {
        let id = raw.get("nummer")?.as_u64()?;
        Some(Self { id, raw })
    }
}

/// Food details for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRecord {
    pub name: String,
    pub food_type: String,
    pub project: String,
    pub scientific_name: String,
    pub raw: Value,
}

#[derive(Debug, Default, Deserialize)]
struct DetailFields {
    #[serde(default, rename = "namn", deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, rename = "livsmedelsTyp", deserialize_with = "lenient_string")]
    food_type: String,
    #[serde(default, rename = "projekt", deserialize_with = "lenient_string")]
    project: String,
    #[serde(
        default,
        rename = "vetenskapligtNamn",
        deserialize_with = "lenient_string"
    )]
    scientific_name: String,
}

impl DetailRecord {
    /// Decode a detail response. Anything but a JSON object yields `None`.
    pub fn from_raw(raw: Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        let fields = DetailFields::deserialize(&raw).unwrap_or_default();
        Some(Self {
            name: fields.name,
            food_type: fields.food_type,
            project: fields.project,
            scientific_name: fields.scientific_name,
            raw,
        })
    }
}

impl Default for DetailRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            food_type: String::new(),
            project: String::new(),
            scientific_name: String::new(),
            raw: serde_json::json!({ "namn": "" }),
        }
    }
}

/// A nutrient value keyed by its EuroFIR code.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientRecord {
    pub code: String,
    pub raw: Value,
}

#[derive(Debug, Default, Deserialize)]
struct NutrientFields {
    #[serde(default, rename = "euroFIRkod", deserialize_with = "lenient_string")]
    code: String,
}

impl NutrientRecord {
    pub fn from_raw(raw: Value) -> Self {
        let fields = NutrientFields::deserialize(&raw).unwrap_or_default();
        Self {
            code: fields.code,
            raw,
        }
    }
}

/// A classification facet, keyed by `(type_tag, facet_code)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRecord {
    pub type_tag: String,
    pub facet_code: String,
    pub raw: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ClassificationFields {
    #[serde(default, rename = "typ", deserialize_with = "lenient_string")]
    type_tag: String,
    #[serde(default, rename = "fasettkod", deserialize_with = "lenient_string")]
    facet_code: String,
}

impl ClassificationRecord {
    pub fn from_raw(raw: Value) -> Self {
        let fields = ClassificationFields::deserialize(&raw).unwrap_or_default();
        Self {
            type_tag: fields.type_tag,
            facet_code: fields.facet_code,
            raw,
        }
    }
}

/// A raw material entry. Never reconciled across languages.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMaterialRecord {
    pub raw: Value,
}

impl RawMaterialRecord {
    pub fn from_raw(raw: Value) -> Self {
        Self { raw }
    }
}

// Sub-records serialize as the JSON received from the registry.
macro_rules! serialize_as_raw {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    self.raw.serialize(serializer)
                }
            }
        )*
    };
}

serialize_as_raw!(
    DetailRecord,
    NutrientRecord,
    ClassificationRecord,
    RawMaterialRecord
);

/// Accept strings, numbers and booleans as text; anything else becomes empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}
