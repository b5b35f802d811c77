// Declared parameter schemas for templates and their validation.

use crate::domain::errors::SimError;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Integer(i64),
    Interval([f64; 2]),
    Choice(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit {
    pub value: f64,
    pub inclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Number {
        min: Option<Limit>,
        max: Option<Limit>,
    },
    Integer {
        min: i64,
        max: i64,
    },
    /// Two finite numbers `[start, end]` with `start < end`.
    Interval,
    Choice(&'static [&'static str]),
}

/// One named option of a template with its default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub doc: &'static str,
}

impl ParamSpec {
    pub const fn positive(name: &'static str, default: f64, doc: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number {
                min: Some(Limit {
                    value: 0.0,
                    inclusive: false,
                }),
                max: None,
            },
            default: ParamValue::Number(default),
            doc,
        }
    }

    pub const fn non_negative(name: &'static str, default: f64, doc: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number {
                min: Some(Limit {
                    value: 0.0,
                    inclusive: true,
                }),
                max: None,
            },
            default: ParamValue::Number(default),
            doc,
        }
    }

    pub const fn between(
        name: &'static str,
        default: f64,
        min: f64,
        max: f64,
        doc: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Number {
                min: Some(Limit {
                    value: min,
                    inclusive: true,
                }),
                max: Some(Limit {
                    value: max,
                    inclusive: true,
                }),
            },
            default: ParamValue::Number(default),
            doc,
        }
    }

    pub const fn count(
        name: &'static str,
        default: i64,
        min: i64,
        max: i64,
        doc: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Integer { min, max },
            default: ParamValue::Integer(default),
            doc,
        }
    }

    pub const fn interval(name: &'static str, default: [f64; 2], doc: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Interval,
            default: ParamValue::Interval(default),
            doc,
        }
    }

    pub const fn choice(
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
        doc: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Choice(options),
            default: ParamValue::Choice(default),
            doc,
        }
    }

    fn parse(&self, raw: &Value) -> Result<ParamValue, SimError> {
        match self.kind {
            ParamKind::Number { min, max } => {
                let value = raw
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| self.invalid("expected a finite number"))?;
                if let Some(limit) = min {
                    if value < limit.value || (!limit.inclusive && value == limit.value) {
                        let op = if limit.inclusive { ">=" } else { ">" };
                        return Err(self.invalid(format!("must be {op} {}", limit.value)));
                    }
                }
                if let Some(limit) = max {
                    if value > limit.value || (!limit.inclusive && value == limit.value) {
                        let op = if limit.inclusive { "<=" } else { "<" };
                        return Err(self.invalid(format!("must be {op} {}", limit.value)));
                    }
                }
                Ok(ParamValue::Number(value))
            }
            ParamKind::Integer { min, max } => {
                let value = raw
                    .as_i64()
                    .or_else(|| {
                        raw.as_f64()
                            .filter(|v| v.is_finite() && v.fract() == 0.0)
                            .map(|v| v as i64)
                    })
                    .ok_or_else(|| self.invalid("expected an integer"))?;
                if !(min..=max).contains(&value) {
                    return Err(self.invalid(format!("must be within {min}..={max}")));
                }
                Ok(ParamValue::Integer(value))
            }
            ParamKind::Interval => {
                let bounds = raw
                    .as_array()
                    .filter(|items| items.len() == 2)
                    .and_then(|items| Some([items[0].as_f64()?, items[1].as_f64()?]))
                    .filter(|[a, b]| a.is_finite() && b.is_finite())
                    .ok_or_else(|| self.invalid("expected [start, end]"))?;
                if bounds[0] >= bounds[1] {
                    return Err(self.invalid("start must be less than end"));
                }
                Ok(ParamValue::Interval(bounds))
            }
            ParamKind::Choice(options) => {
                let wanted = raw
                    .as_str()
                    .ok_or_else(|| self.invalid("expected a string"))?;
                options
                    .iter()
                    .find(|option| **option == wanted)
                    .map(|option| ParamValue::Choice(option))
                    .ok_or_else(|| self.invalid(format!("must be one of {}", options.join(", "))))
            }
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> SimError {
        SimError::invalid(self.name, reason)
    }
}

/// Parameter values after defaults and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    values: Vec<(&'static str, ParamValue)>,
}

impl ResolvedParams {
    /// Missing or null parameters take their default; unknown ones are ignored.
    pub fn resolve(schema: &[ParamSpec], raw: &Map<String, Value>) -> Result<Self, SimError> {
        for key in raw.keys() {
            if !schema.iter().any(|spec| spec.name == key) {
                debug!(parameter = %key, "ignoring unknown template parameter");
            }
        }

        let values = schema
            .iter()
            .map(|spec| {
                let value = match raw.get(spec.name) {
                    None | Some(Value::Null) => spec.default,
                    Some(value) => spec.parse(value)?,
                };
                Ok((spec.name, value))
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(Self { values })
    }

    fn get(&self, name: &str) -> Result<ParamValue, SimError> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| SimError::invalid(name, "parameter is not declared"))
    }

    pub fn number(&self, name: &str) -> Result<f64, SimError> {
        match self.get(name)? {
            ParamValue::Number(v) => Ok(v),
            ParamValue::Integer(v) => Ok(v as f64),
            _ => Err(SimError::invalid(name, "not a number")),
        }
    }

    pub fn count(&self, name: &str) -> Result<usize, SimError> {
        match self.get(name)? {
            ParamValue::Integer(v) if v >= 0 => Ok(v as usize),
            _ => Err(SimError::invalid(name, "not a count")),
        }
    }

    pub fn interval(&self, name: &str) -> Result<[f64; 2], SimError> {
        match self.get(name)? {
            ParamValue::Interval(v) => Ok(v),
            _ => Err(SimError::invalid(name, "not an interval")),
        }
    }

    pub fn choice(&self, name: &str) -> Result<&'static str, SimError> {
        match self.get(name)? {
            ParamValue::Choice(v) => Ok(v),
            _ => Err(SimError::invalid(name, "not a choice")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &[ParamSpec] = &[
        ParamSpec::positive("radius", 1.0, "radius"),
        ParamSpec::non_negative("stiffness", 100.0, "stiffness"),
        ParamSpec::count("resolution", 20, 1, 64, "resolution"),
        ParamSpec::interval("u_range", [-1.0, 1.0], "u"),
        ParamSpec::choice("surface", &["torus", "plane"], "torus", "surface"),
    ];

    fn resolve(raw: serde_json::Value) -> Result<ResolvedParams, SimError> {
        let map = raw.as_object().cloned().unwrap_or_default();
        ResolvedParams::resolve(SCHEMA, &map)
    }

    #[test]
    fn when_parameters_are_missing_then_defaults_apply() {
        let params = resolve(json!({})).unwrap();
        assert_eq!(params.number("radius").unwrap(), 1.0);
        assert_eq!(params.count("resolution").unwrap(), 20);
        assert_eq!(params.interval("u_range").unwrap(), [-1.0, 1.0]);
        assert_eq!(params.choice("surface").unwrap(), "torus");
    }

    #[test]
    fn when_unknown_parameters_are_given_then_they_are_ignored() {
        let params = resolve(json!({ "colour": "red", "radius": 2.5 })).unwrap();
        assert_eq!(params.number("radius").unwrap(), 2.5);
    }

    #[test]
    fn when_radius_is_zero_then_invalid_parameter() {
        let err = resolve(json!({ "radius": 0.0 })).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { ref name, .. } if name == "radius"));
    }

    #[test]
    fn when_stiffness_is_negative_then_invalid_parameter() {
        let err = resolve(json!({ "stiffness": -3 })).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn when_integer_is_written_as_whole_float_then_it_is_accepted() {
        let params = resolve(json!({ "resolution": 8.0 })).unwrap();
        assert_eq!(params.count("resolution").unwrap(), 8);
        assert!(resolve(json!({ "resolution": 8.5 })).is_err());
        assert!(resolve(json!({ "resolution": 65 })).is_err());
    }

    #[test]
    fn when_interval_or_choice_is_malformed_then_invalid_parameter() {
        assert!(resolve(json!({ "u_range": [2.0, 1.0] })).is_err());
        assert!(resolve(json!({ "u_range": [0.0] })).is_err());
        assert!(resolve(json!({ "surface": "klein" })).is_err());
    }
}
