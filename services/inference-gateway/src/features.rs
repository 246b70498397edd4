//! Input validation for the four iris measurements.
//!
//! Bodies are parsed loosely (a JSON object of numbers) and then checked field
//! by field so every offending field is reported, not just the first one.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct FeatureBound {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Used when the field is absent from the body.
    pub default: f64,
}

pub const FEATURE_BOUNDS: [FeatureBound; 4] = [
    FeatureBound { name: "sepal_length", min: 0.0, max: 8.0, default: 1.1 },
    FeatureBound { name: "sepal_width", min: 0.0, max: 5.0, default: 1.0 },
    FeatureBound { name: "petal_length", min: 0.0, max: 7.0, default: 1.0 },
    FeatureBound { name: "petal_width", min: 0.0, max: 3.0, default: 1.0 },
];

/// One validation failure, shaped like `{"loc": [...], "msg": ..., "type": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl FieldError {
    fn field(name: &str, msg: String, kind: &'static str) -> Self {
        Self { loc: vec!["body".into(), name.into()], msg, kind }
    }

    pub fn body(msg: impl Into<String>, kind: &'static str) -> Self {
        Self { loc: vec!["body".into()], msg: msg.into(), kind }
    }

    pub fn field_name(&self) -> Option<&str> {
        self.loc.get(1).map(String::as_str)
    }
}

/// Validated measurements in centimetres. Only constructible through the
/// bound checks below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    sepal_length: f64,
    sepal_width: f64,
    petal_length: f64,
    petal_width: f64,
}

impl FeatureVector {
    pub fn new(sepal_length: f64, sepal_width: f64, petal_length: f64, petal_width: f64) -> Result<Self, Vec<FieldError>> {
        let values = [sepal_length, sepal_width, petal_length, petal_width];
        let errors: Vec<FieldError> = FEATURE_BOUNDS
            .iter()
            .zip(values)
            .filter_map(|(bound, v)| check_bound(bound, v))
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self { sepal_length, sepal_width, petal_length, petal_width })
    }

    pub fn from_json_slice(body: &[u8]) -> Result<Self, Vec<FieldError>> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| vec![FieldError::body(format!("JSON decode error: {e}"), "json_invalid")])?;
        match value {
            Value::Object(map) => Self::from_object(&map),
            _ => Err(vec![FieldError::body("Input should be a valid object", "model_attributes_type")]),
        }
    }

    /// Unknown keys are ignored; absent keys take their documented default.
    pub fn from_object(map: &Map<String, Value>) -> Result<Self, Vec<FieldError>> {
        let mut values = [0.0; 4];
        let mut errors = Vec::new();
        for (slot, bound) in values.iter_mut().zip(FEATURE_BOUNDS.iter()) {
            match map.get(bound.name) {
                None => *slot = bound.default,
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(v) => match check_bound(bound, v) {
                        Some(err) => errors.push(err),
                        None => *slot = v,
                    },
                    None => errors.push(not_a_number(bound.name)),
                },
                Some(_) => errors.push(not_a_number(bound.name)),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        let [sepal_length, sepal_width, petal_length, petal_width] = values;
        Ok(Self { sepal_length, sepal_width, petal_length, petal_width })
    }

    /// Feature order used by the model artifacts.
    pub fn as_array(&self) -> [f64; 4] {
        [self.sepal_length, self.sepal_width, self.petal_length, self.petal_width]
    }
}

fn not_a_number(name: &str) -> FieldError {
    FieldError::field(name, "Input should be a valid number".into(), "float_type")
}

fn check_bound(bound: &FeatureBound, v: f64) -> Option<FieldError> {
    if !v.is_finite() {
        return Some(FieldError::field(bound.name, "Input should be a finite number".into(), "finite_number"));
    }
    if v < bound.min {
        return Some(FieldError::field(
            bound.name,
            format!("Input should be greater than or equal to {}", bound.min),
            "greater_than_equal",
        ));
    }
    if v > bound.max {
        return Some(FieldError::field(
            bound.name,
            format!("Input should be less than or equal to {}", bound.max),
            "less_than_equal",
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_bound_body() {
        let fv = FeatureVector::from_json_slice(br#"{"sepal_length": 5.1, "sepal_width": 3.5, "petal_length": 1.4, "petal_width": 0.2}"#).unwrap();
        assert_eq!(fv.as_array(), [5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(FeatureVector::new(0.0, 0.0, 0.0, 0.0).is_ok());
        assert!(FeatureVector::new(8.0, 5.0, 7.0, 3.0).is_ok());
        let errs = FeatureVector::new(8.01, 5.0, 7.0, 3.0).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field_name(), Some("sepal_length"));
        assert_eq!(errs[0].kind, "less_than_equal");
        assert_eq!(errs[0].msg, "Input should be less than or equal to 8");
    }

    #[test]
    fn negative_value_rejected() {
        let errs = FeatureVector::from_json_slice(br#"{"sepal_length": -1, "sepal_width": 3.5, "petal_length": 1.4, "petal_width": 0.2}"#).unwrap_err();
        assert_eq!(errs, vec![FieldError {
            loc: vec!["body".into(), "sepal_length".into()],
            msg: "Input should be greater than or equal to 0".into(),
            kind: "greater_than_equal",
        }]);
    }

    #[test]
    fn reports_every_offending_field() {
        let errs = FeatureVector::from_json_slice(br#"{"sepal_length": "long", "sepal_width": null, "petal_length": 9, "petal_width": 0.2}"#).unwrap_err();
        let fields: Vec<_> = errs.iter().filter_map(FieldError::field_name).collect();
        assert_eq!(fields, ["sepal_length", "sepal_width", "petal_length"]);
        assert_eq!(errs[0].kind, "float_type");
        assert_eq!(errs[1].kind, "float_type");
    }

    #[test]
    fn absent_fields_take_defaults() {
        let fv = FeatureVector::from_json_slice(br#"{"petal_width": 2.0, "extra": true}"#).unwrap();
        assert_eq!(fv.as_array(), [1.1, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn malformed_or_non_object_body() {
        let errs = FeatureVector::from_json_slice(b"{not json").unwrap_err();
        assert_eq!(errs[0].kind, "json_invalid");
        assert_eq!(errs[0].loc, vec!["body".to_string()]);
        let errs = FeatureVector::from_json_slice(b"[1, 2, 3, 4]").unwrap_err();
        assert_eq!(errs[0].kind, "model_attributes_type");
    }

    #[test]
    fn non_finite_rejected() {
        let errs = FeatureVector::new(f64::NAN, 1.0, 1.0, 1.0).unwrap_err();
        assert_eq!(errs[0].kind, "finite_number");
    }
}
