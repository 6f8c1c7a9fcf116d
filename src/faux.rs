//! Built-in faux value generators
//!
//! One generator per standard type and format, each matching every attribute
//! name. Numeric and string generators honor the attribute's constraints.

use chrono::{Duration, Utc};
use fake::faker::internet::en::{DomainSuffix, SafeEmail};
use fake::faker::lorem::en::{Word, Words};
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::attribute::{Constraints, TypeInfo};
use crate::generator::GeneratorRegistry;
use crate::types::TypeTag;

/// Pattern matching any attribute name
const ANY_NAME: &str = ".*";

/// Width of generated numeric ranges when a bound is missing
const DEFAULT_SPAN: f64 = 1000.0;

/// How far back generated timestamps reach, in seconds
const DATE_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

pub(crate) fn register_builtins(registry: &mut GeneratorRegistry) {
    let builtins: [(TypeTag, fn(&TypeInfo) -> Option<Value>); 14] = [
        (TypeTag::String, string),
        (TypeTag::Integer, integer),
        (TypeTag::Float, float),
        (TypeTag::Boolean, boolean),
        (TypeTag::Enum, enumerated),
        (TypeTag::Uuid, uuid),
        (TypeTag::DateTime, date_time),
        (TypeTag::Date, date),
        (TypeTag::Uri, uri),
        (TypeTag::Hostname, hostname),
        (TypeTag::Email, email),
        (TypeTag::Ipv4, ipv4),
        (TypeTag::Ipv6, ipv6),
        (TypeTag::Null, null),
    ];

    for (tag, algorithm) in builtins {
        if let Err(e) = registry.register(tag, ANY_NAME, algorithm) {
            tracing::error!("failed to register built-in generator: {}", e);
        }
    }
}

// =============================================================================
// Strings
// =============================================================================

/// Lorem words, padded with more words up to `minLength` and cut at `maxLength`
pub fn string(info: &TypeInfo) -> Option<Value> {
    let Constraints { min_length, max_length, .. } = info.constraints;

    let words: Vec<String> = Words(2..6).fake();
    let mut text = words.join(" ");

    if let Some(min) = min_length {
        while text.chars().count() < min {
            let word: String = Word().fake();
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&word);
        }
    }
    if let Some(max) = max_length {
        if text.chars().count() > max {
            text = text.chars().take(max).collect();
        }
    }

    Some(Value::String(text))
}

// =============================================================================
// Numbers
// =============================================================================

/// Integers within `[minimum, maximum]`, honoring exclusivity and `multipleOf`
pub fn integer(info: &TypeInfo) -> Option<Value> {
    let c = &info.constraints;
    let (low, high) = integer_bounds(c);
    let mut rng = rand::thread_rng();

    let value = match c.multiple_of.and_then(integral_step) {
        Some(step) => {
            let first = (low as f64 / step as f64).ceil() as i64;
            let last = (high as f64 / step as f64).floor() as i64;
            let k = if first <= last {
                rng.gen_range(first..=last)
            } else {
                first
            };
            k.saturating_mul(step)
        }
        None => rng.gen_range(low..=high),
    };

    Some(Value::from(value))
}

/// Smallest positive integer that is a multiple of `step` (1.5 gives 3)
fn integral_step(step: f64) -> Option<i64> {
    if !step.is_finite() || step <= 0.0 {
        return None;
    }
    let scale = 10i64.pow(step_decimals(step));
    let numerator = (step * scale as f64).round() as i64;
    if numerator == 0 {
        return None;
    }
    Some(numerator / gcd(numerator, scale))
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs().max(1)
}

/// Inclusive integer bounds implied by the constraints, saturating at the
/// `i64` limits
pub fn integer_bounds(c: &Constraints) -> (i64, i64) {
    let span = DEFAULT_SPAN as i64;

    let low = match c.minimum {
        Some(min) => {
            let low = min.ceil() as i64;
            if c.exclusive_minimum && low as f64 <= min {
                low.saturating_add(1)
            } else {
                low
            }
        }
        None => match c.maximum {
            Some(max) if max < 0.0 => (max.floor() as i64).saturating_sub(span),
            _ => 0,
        },
    };

    let high = match c.maximum {
        Some(max) => {
            let high = max.floor() as i64;
            if c.exclusive_maximum && high as f64 >= max {
                high.saturating_sub(1)
            } else {
                high
            }
        }
        None => low.saturating_add(span - 1),
    };

    if high < low {
        return (low, low);
    }
    (low, high)
}

/// Floats within the constraint bounds, honoring exclusivity and `multipleOf`
pub fn float(info: &TypeInfo) -> Option<Value> {
    let c = &info.constraints;
    let low = c.minimum.unwrap_or(match c.maximum {
        Some(max) if max < 0.0 => max - DEFAULT_SPAN,
        _ => 0.0,
    });
    let high = c.maximum.unwrap_or(low + DEFAULT_SPAN).max(low);

    let value = match c.multiple_of {
        Some(step) => {
            let mut first = (low / step).ceil() as i64;
            if c.exclusive_minimum && first as f64 * step <= low {
                first += 1;
            }
            let mut last = (high / step).floor() as i64;
            if c.exclusive_maximum && last as f64 * step >= high {
                last -= 1;
            }
            let k = if first <= last {
                rand::thread_rng().gen_range(first..=last)
            } else {
                first
            };
            round_to_step(k as f64 * step, step)
        }
        None => sample_between(low, high, c.exclusive_minimum, c.exclusive_maximum),
    };

    Some(Value::from(value))
}

fn sample_between(low: f64, high: f64, exclusive_low: bool, exclusive_high: bool) -> f64 {
    if high <= low {
        return low;
    }
    let mut rng = rand::thread_rng();
    let spread_overflows = !(high - low).is_finite();
    for _ in 0..16 {
        let v = if spread_overflows {
            // sample on the halved range, which always fits
            (low / 2.0 + rng.gen::<f64>() * (high / 2.0 - low / 2.0)) * 2.0
        } else {
            rng.gen_range(low..=high)
        };
        if (!exclusive_low || v > low) && (!exclusive_high || v < high) {
            return v;
        }
    }
    low / 2.0 + high / 2.0
}

/// Round away floating point noise left by multiplying with `step`
fn round_to_step(value: f64, step: f64) -> f64 {
    let scale = 10f64.powi(step_decimals(step) as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Decimal places written in `step`, capped at 10
fn step_decimals(step: f64) -> u32 {
    step.to_string()
        .split_once('.')
        .map(|(_, fraction)| fraction.len().min(10) as u32)
        .unwrap_or(0)
}

// =============================================================================
// Other types
// =============================================================================

pub fn boolean(_info: &TypeInfo) -> Option<Value> {
    Some(Value::Bool(rand::thread_rng().gen_bool(0.5)))
}

/// Uniform pick from the declared enumeration
pub fn enumerated(info: &TypeInfo) -> Option<Value> {
    info.enumeration
        .as_ref()
        .and_then(|values| values.choose(&mut rand::thread_rng()).cloned())
}

pub fn uuid(_info: &TypeInfo) -> Option<Value> {
    Some(Value::String(uuid::Uuid::new_v4().to_string()))
}

pub fn date_time(_info: &TypeInfo) -> Option<Value> {
    let offset = rand::thread_rng().gen_range(0..DATE_WINDOW_SECS);
    let at = Utc::now() - Duration::seconds(offset);
    Some(Value::String(at.to_rfc3339()))
}

pub fn date(_info: &TypeInfo) -> Option<Value> {
    let offset = rand::thread_rng().gen_range(0..DATE_WINDOW_SECS);
    let at = Utc::now() - Duration::seconds(offset);
    Some(Value::String(at.date_naive().format("%Y-%m-%d").to_string()))
}

fn host() -> String {
    let word: String = Word().fake();
    let suffix: String = DomainSuffix().fake();
    format!("{}.{}", word.to_lowercase(), suffix)
}

pub fn uri(_info: &TypeInfo) -> Option<Value> {
    let path: String = Word().fake();
    Some(Value::String(format!("http://{}/{}", host(), path.to_lowercase())))
}

pub fn hostname(_info: &TypeInfo) -> Option<Value> {
    Some(Value::String(host()))
}

pub fn email(_info: &TypeInfo) -> Option<Value> {
    Some(Value::String(SafeEmail().fake()))
}

pub fn ipv4(_info: &TypeInfo) -> Option<Value> {
    let octets: [u8; 4] = rand::thread_rng().gen();
    Some(Value::String(Ipv4Addr::from(octets).to_string()))
}

pub fn ipv6(_info: &TypeInfo) -> Option<Value> {
    let segments: [u16; 8] = rand::thread_rng().gen();
    Some(Value::String(Ipv6Addr::from(segments).to_string()))
}

pub fn null(_info: &TypeInfo) -> Option<Value> {
    None
}
