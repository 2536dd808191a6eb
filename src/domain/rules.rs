// Color threshold rules and first-match evaluation
use serde::{Deserialize, Serialize};

/// Color used when no rule matches or no value is available
pub const FALLBACK_COLOR: &str = "#888888";

/// Canonical rule shape: matches `min <= value < max`.
///
/// Unbounded ends travel as `null` (or are omitted) on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    #[serde(
        default = "bound::unbounded_below",
        serialize_with = "bound::serialize",
        deserialize_with = "bound::lower"
    )]
    pub min: f64,
    #[serde(
        default = "bound::unbounded_above",
        serialize_with = "bound::serialize",
        deserialize_with = "bound::upper"
    )]
    pub max: f64,
    pub color: String,
}

mod bound {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn unbounded_below() -> f64 {
        f64::NEG_INFINITY
    }

    pub fn unbounded_above() -> f64 {
        f64::INFINITY
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .is_finite()
            .then_some(*value)
            .serialize(serializer)
    }

    pub fn lower<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(unbounded_below))
    }

    pub fn upper<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(unbounded_above))
    }
}

impl ColorRule {
    pub fn new(min: f64, max: f64, color: impl Into<String>) -> Self {
        Self {
            min,
            max,
            color: color.into(),
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

/// Legacy single-threshold rule shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRule {
    pub operator: Operator,
    pub value: f64,
    pub color: String,
}

impl ComparisonRule {
    /// Express the comparison as a half-open bucket
    pub fn into_bucket(self) -> ColorRule {
        let v = self.value;
        let (min, max) = match self.operator {
            Operator::Lt => (f64::NEG_INFINITY, v),
            Operator::Le => (f64::NEG_INFINITY, next_up(v)),
            Operator::Gt => (next_up(v), f64::INFINITY),
            Operator::Ge => (v, f64::INFINITY),
            Operator::Eq => (v, next_up(v)),
        };
        ColorRule::new(min, max, self.color)
    }
}

/// Either rule shape as accepted from clients.
///
/// Comparison is tried first: bucket bounds are optional, so a bucket
/// would also accept a comparison body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleInput {
    Comparison(ComparisonRule),
    Bucket(ColorRule),
}

impl From<RuleInput> for ColorRule {
    fn from(input: RuleInput) -> Self {
        match input {
            RuleInput::Bucket(rule) => rule,
            RuleInput::Comparison(rule) => rule.into_bucket(),
        }
    }
}

/// Smallest f64 strictly greater than `x`
fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// First matching rule's color, or the fallback.
///
/// Order is the caller's responsibility; no sorting or overlap checks.
pub fn evaluate(rules: &[ColorRule], value: Option<f64>) -> String {
    value
        .and_then(|v| rules.iter().find(|rule| rule.matches(v)))
        .map(|rule| rule.color.clone())
        .unwrap_or_else(|| FALLBACK_COLOR.to_string())
}

/// Nine 5-degree buckets spanning [0, 45)
pub fn default_rules() -> Vec<ColorRule> {
    (0..9)
        .map(|i| {
            let min = (i * 5) as f64;
            ColorRule::new(min, min + 5.0, hsl_to_hex(i as f64 * 40.0, 70.0, 50.0))
        })
        .collect()
}

pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let s = s / 100.0;
    let l = l / 100.0;
    let a = s * l.min(1.0 - l);
    let channel = |n: f64| {
        let k = (n + h / 30.0) % 12.0;
        let c = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        (255.0 * c).round() as u8
    };
    format!("#{:02x}{:02x}{:02x}", channel(0.0), channel(8.0), channel(4.0))
}
