//! Column layouts for the entities that can be moved in and out as CSV.

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Decimal,
    Bool,
    /// `;`-separated values
    List,
    /// One of a fixed set of lower-case labels
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
    /// Exported but ignored on import (ids, slugs, owners).
    pub derived: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        required: false,
        derived: false,
    }
}

const fn req(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        required: true,
        derived: false,
    }
}

const fn derived(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
        required: false,
        derived: true,
    }
}

use ColumnKind::{Bool, Decimal, Integer, List, Text};

pub(crate) const LISTING_TYPES: &[&str] = &["sale", "rent"];
pub(crate) const PROPERTY_STATUSES: &[&str] = &["draft", "published", "sold", "rented"];

const PROPERTY_COLUMNS: &[Column] = &[
    derived("id"),
    derived("slug"),
    req("title", Text),
    col("description", Text),
    req("listing_type", ColumnKind::Enum(LISTING_TYPES)),
    col("property_type", Text),
    col("status", ColumnKind::Enum(PROPERTY_STATUSES)),
    req("price", Decimal),
    col("area_sqft", Decimal),
    col("bedrooms", Integer),
    col("bathrooms", Integer),
    col("address", Text),
    req("city", Text),
    col("state", Text),
    col("location_id", Text),
    col("category_id", Text),
    col("developer_id", Text),
    col("amenity_ids", List),
    col("facility_ids", List),
    col("images", List),
    col("featured", Bool),
    derived("owner_id"),
];

const CATEGORY_COLUMNS: &[Column] = &[
    derived("id"),
    derived("slug"),
    req("name", Text),
    col("description", Text),
    col("active", Bool),
];

const FEATURE_COLUMNS: &[Column] = &[
    derived("id"),
    req("name", Text),
    col("icon", Text),
    col("active", Bool),
];

const STATE_COLUMNS: &[Column] = &[
    derived("id"),
    req("name", Text),
    req("code", Text),
    col("active", Bool),
];

const LOCATION_COLUMNS: &[Column] = &[
    derived("id"),
    derived("slug"),
    req("name", Text),
    req("city", Text),
    col("state", Text),
    col("active", Bool),
];

const DEVELOPER_COLUMNS: &[Column] = &[
    derived("id"),
    derived("slug"),
    req("name", Text),
    col("description", Text),
    col("website", Text),
    col("logo", Text),
    col("owner_id", Text),
    col("active", Bool),
];

/// Entities supported by import and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Properties,
    Categories,
    Amenities,
    Facilities,
    States,
    Locations,
    Developers,
}

impl EntityKind {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Properties,
            Self::Categories,
            Self::Amenities,
            Self::Facilities,
            Self::States,
            Self::Locations,
            Self::Developers,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Categories => "categories",
            Self::Amenities => "amenities",
            Self::Facilities => "facilities",
            Self::States => "states",
            Self::Locations => "locations",
            Self::Developers => "developers",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(value))
    }

    pub const fn schema(self) -> &'static [Column] {
        match self {
            Self::Properties => PROPERTY_COLUMNS,
            Self::Categories => CATEGORY_COLUMNS,
            Self::Amenities | Self::Facilities => FEATURE_COLUMNS,
            Self::States => STATE_COLUMNS,
            Self::Locations => LOCATION_COLUMNS,
            Self::Developers => DEVELOPER_COLUMNS,
        }
    }
}

/// Parses one trimmed cell. `Ok(None)` means blank.
pub fn parse_cell(column: &Column, raw: &str) -> Result<Option<Value>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return if column.required {
            Err("is required".to_string())
        } else {
            Ok(None)
        };
    }

    let value = match column.kind {
        Text => Value::String(raw.to_string()),
        Integer => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not a whole number", raw))?,
        Decimal => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("'{}' is not a number", raw))?,
        Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            _ => return Err(format!("'{}' is not true/false", raw)),
        },
        List => Value::Array(
            raw.split(';')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        ColumnKind::Enum(options) => {
            let lowered = raw.to_ascii_lowercase();
            if !options.contains(&lowered.as_str()) {
                return Err(format!("'{}' must be one of {}", raw, options.join(", ")));
            }
            Value::String(lowered)
        }
    };
    Ok(Some(value))
}

/// Renders a stored field back into a cell.
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| render_cell(Some(item)))
            .collect::<Vec<_>>()
            .join(";"),
        Some(other @ Value::Object(_)) => other.to_string(),
    }
}

/// Builds a JSON object from a row, collecting one message per bad cell.
pub fn row_to_object(
    columns: &[Column],
    cell: impl Fn(&str) -> Option<String>,
) -> Result<Map<String, Value>, Vec<(&'static str, String)>> {
    let mut object = Map::new();
    let mut errors = Vec::new();
    for column in columns.iter().filter(|column| !column.derived) {
        let raw = cell(column.name).unwrap_or_default();
        match parse_cell(column, &raw) {
            Ok(Some(value)) => {
                object.insert(column.name.to_string(), value);
            }
            Ok(None) => {}
            Err(message) => errors.push((column.name, message)),
        }
    }
    if errors.is_empty() {
        Ok(object)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{ListingType, PropertyStatus};

    #[test]
    fn enum_options_match_domain_labels() {
        let listing: Vec<_> = ListingType::ordered().iter().map(|k| k.label()).collect();
        assert_eq!(listing, LISTING_TYPES);
        let statuses: Vec<_> = PropertyStatus::ordered().iter().map(|s| s.label()).collect();
        assert_eq!(statuses, PROPERTY_STATUSES);
    }

    #[test]
    fn cells_are_typed() {
        let price = req("price", Decimal);
        assert_eq!(parse_cell(&price, " 12.5 ").unwrap(), Some(Value::from(12.5)));
        assert!(parse_cell(&price, "cheap").is_err());
        assert_eq!(parse_cell(&price, "").unwrap_err(), "is required");

        let tags = col("images", List);
        assert_eq!(
            parse_cell(&tags, "a.jpg; ;b.jpg").unwrap(),
            Some(serde_json::json!(["a.jpg", "b.jpg"]))
        );

        let flag = col("active", Bool);
        assert_eq!(parse_cell(&flag, "Yes").unwrap(), Some(Value::Bool(true)));
        assert_eq!(parse_cell(&flag, "").unwrap(), None);

        let status = col("status", ColumnKind::Enum(PROPERTY_STATUSES));
        assert_eq!(parse_cell(&status, "SOLD").unwrap(), Some(Value::from("sold")));
        assert!(parse_cell(&status, "archived").is_err());
    }

    #[test]
    fn render_joins_lists() {
        assert_eq!(render_cell(Some(&serde_json::json!(["a", "b"]))), "a;b");
        assert_eq!(render_cell(Some(&Value::Null)), "");
        assert_eq!(render_cell(Some(&serde_json::json!(3))), "3");
    }

    #[test]
    fn entity_names_parse() {
        assert_eq!(EntityKind::parse("States"), Some(EntityKind::States));
        assert_eq!(EntityKind::parse("users"), None);
    }
}
