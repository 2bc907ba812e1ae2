use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::geom::{multipolygon_to_value, serde_multipolygon};
use crate::region::RegionTags;

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl AttrValue {
    /// Text form of a name-like value; `None` for null.
    fn into_label(self) -> Option<String> {
        match self {
            AttrValue::Null => None,
            AttrValue::Bool(b) => Some(b.to_string()),
            AttrValue::Number(n) => Some(n.to_string()),
            AttrValue::Text(s) => Some(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self { AttrValue::Text(s.to_string()) }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self { AttrValue::Number(n) }
}

/// Feature attributes: the well-known fields typed, everything else in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, AttrValue>,
}

impl Attributes {
    /// Attributes of a raster-derived polygon.
    pub fn slope(value: f64) -> Self {
        Self { slope_value: Some(value), ..Self::default() }
    }

    /// Build from a free-form field map, lifting the well-known fields into their typed slots.
    /// Numeric or boolean district/sector names become text; nulls and
    /// non-numeric slope values are dropped so a well-known key never lands in `extra`.
    pub fn from_fields(fields: impl IntoIterator<Item = (String, AttrValue)>) -> Self {
        let mut attrs = Self::default();
        for (name, value) in fields {
            match name.as_str() {
                "slope_value" => attrs.slope_value = match value {
                    AttrValue::Number(n) => Some(n),
                    AttrValue::Text(s) => s.trim().parse().ok(),
                    _ => None,
                },
                "district" => attrs.district = value.into_label(),
                "sector" => attrs.sector = value.into_label(),
                _ => { attrs.extra.insert(name, value); }
            }
        }
        attrs
    }

    /// Overwrite district/sector with the tags that were found; missing tags keep the input values.
    pub fn apply_tags(&mut self, tags: RegionTags) {
        if tags.district.is_some() {
            self.extra.remove("district");
            self.district = tags.district;
        }
        if tags.sector.is_some() {
            self.extra.remove("sector");
            self.sector = tags.sector;
        }
    }

    /// The measured value: `slope_value`, else a numeric `value` field.
    pub fn value(&self) -> Option<f64> {
        self.slope_value.or_else(|| self.extra.get("value").and_then(AttrValue::as_f64))
    }

    /// Attributes as a GeoJSON `properties` object.
    pub fn to_properties(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

/// One polygon feature in the canonical CRS. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(with = "serde_multipolygon")]
    pub geometry: MultiPolygon<f64>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>, attributes: Attributes) -> Self {
        Self { id: id.into(), geometry, attributes }
    }

    /// GeoJSON Feature object.
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": multipolygon_to_value(&self.geometry),
            "properties": self.attributes.to_properties(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_fields_are_lifted() {
        let attrs = Attributes::from_fields([
            ("district".to_string(), AttrValue::from("Gasabo")),
            ("NAME_2".to_string(), AttrValue::from("Kimironko")),
            ("slope_value".to_string(), AttrValue::from(12.5)),
        ]);
        assert_eq!(attrs.district.as_deref(), Some("Gasabo"));
        assert_eq!(attrs.slope_value, Some(12.5));
        assert_eq!(attrs.extra.len(), 1);
    }

    #[test]
    fn non_text_names_never_stay_in_extra() {
        let attrs = Attributes::from_fields([
            ("district".to_string(), AttrValue::Null),
            ("sector".to_string(), AttrValue::from(12.0)),
            ("slope_value".to_string(), AttrValue::from(" 7.5")),
        ]);
        assert_eq!(attrs.district, None);
        assert_eq!(attrs.sector.as_deref(), Some("12"));
        assert_eq!(attrs.slope_value, Some(7.5));
        assert!(attrs.extra.is_empty());
    }

    #[test]
    fn tags_replace_names_and_survive_a_round_trip() {
        let mut attrs = Attributes::from_fields([("district".to_string(), AttrValue::Null)]);
        attrs.extra.insert("sector".to_string(), AttrValue::Null);
        attrs.apply_tags(RegionTags { district: Some("Gasabo".to_string()), sector: Some("Remera".to_string()) });
        assert!(attrs.extra.is_empty());

        let text = serde_json::to_string(&attrs).unwrap();
        let back: Attributes = serde_json::from_str(&text).unwrap();
        assert_eq!(back, attrs);
        assert_eq!(back.district.as_deref(), Some("Gasabo"));
    }

    #[test]
    fn missing_tags_keep_input_names() {
        let mut attrs = Attributes::from_fields([("district".to_string(), AttrValue::from("Kicukiro"))]);
        attrs.apply_tags(RegionTags::default());
        assert_eq!(attrs.district.as_deref(), Some("Kicukiro"));
    }

    #[test]
    fn value_falls_back_to_value_field() {
        let attrs = Attributes::from_fields([("value".to_string(), AttrValue::from(3.0))]);
        assert_eq!(attrs.value(), Some(3.0));
        assert_eq!(Attributes::default().value(), None);
        assert_eq!(Attributes::slope(7.0).value(), Some(7.0));
    }

    #[test]
    fn properties_are_flat() {
        let mut attrs = Attributes::slope(4.0);
        attrs.extra.insert("flag".to_string(), AttrValue::Bool(true));
        attrs.extra.insert("missing".to_string(), AttrValue::Null);
        let props = attrs.to_properties();
        assert_eq!(props, json!({ "slope_value": 4.0, "flag": true, "missing": null }));

        let back: Attributes = serde_json::from_value(props).unwrap();
        assert_eq!(back, attrs);
    }
}
