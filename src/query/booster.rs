//! Booster variants: scoring-function contributors for relevance shaping.
//!
//! Boosters adjust ranking without filtering. They compile into the function
//! list of a function-score envelope; the combination mode is declared by
//! the query builder.

use serde_json::{Map, Value, json};

use crate::query::clause::keyed;

/// The reference value a decay function is centered on.
///
/// Dynamic origins are resolved at query build time, so a booster can track
/// a moving site-wide maximum without re-registering the adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    /// A fixed reference value.
    Fixed(f64),
    /// A value computed when the query is built.
    Dynamic(fn() -> f64),
}

impl Origin {
    /// Resolve the origin to a concrete value.
    pub fn resolve(&self) -> f64 {
        match self {
            Origin::Fixed(value) => *value,
            Origin::Dynamic(supplier) => supplier(),
        }
    }
}

/// A declarative score-function contributor.
#[derive(Debug, Clone, PartialEq)]
pub enum Booster {
    /// Multiply the score of documents whose boolean field is set.
    BoolBoost {
        /// The indexed boolean field.
        field: String,
        /// Multiplier applied to matching documents.
        factor: f64,
    },
    /// Gaussian decay of the score by distance from a reference value.
    GaussDecay {
        /// The indexed numeric field.
        field: String,
        /// Reference value the decay is centered on.
        origin: Origin,
        /// Distance at which the score has decayed to `decay`; defaults to
        /// the resolved origin when absent.
        scale: Option<f64>,
        /// Score multiplier at `scale` distance from the origin.
        decay: Option<f64>,
    },
}

impl Booster {
    /// Create a boolean boost.
    pub fn bool_boost<S: Into<String>>(field: S, factor: f64) -> Self {
        Booster::BoolBoost {
            field: field.into(),
            factor,
        }
    }

    /// Create a gaussian decay booster.
    pub fn gauss_decay<S: Into<String>>(field: S, origin: Origin, decay: f64) -> Self {
        Booster::GaussDecay {
            field: field.into(),
            origin,
            scale: None,
            decay: Some(decay),
        }
    }

    /// Compile this booster into an engine score-function spec.
    pub fn to_score_function(&self) -> Value {
        match self {
            Booster::BoolBoost { field, factor } => json!({
                "filter": {"term": keyed(field, json!(true))},
                "boost_factor": factor,
            }),
            Booster::GaussDecay {
                field,
                origin,
                scale,
                decay,
            } => {
                let origin = origin.resolve();
                let mut spec = Map::new();
                spec.insert("origin".to_string(), json!(origin));
                spec.insert("scale".to_string(), json!(scale.unwrap_or(origin)));
                if let Some(decay) = decay {
                    spec.insert("decay".to_string(), json!(decay));
                }
                json!({"gauss": keyed(field, Value::Object(spec))})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_boost() {
        let booster = Booster::bool_boost("public_service", 1.5);
        assert_eq!(
            booster.to_score_function(),
            json!({
                "filter": {"term": {"public_service": true}},
                "boost_factor": 1.5,
            })
        );
    }

    #[test]
    fn test_gauss_decay_fixed_origin() {
        let booster = Booster::gauss_decay("metrics.followers", Origin::Fixed(100.0), 0.8);
        assert_eq!(
            booster.to_score_function(),
            json!({
                "gauss": {
                    "metrics.followers": {"origin": 100.0, "scale": 100.0, "decay": 0.8}
                }
            })
        );
    }

    #[test]
    fn test_gauss_decay_dynamic_origin() {
        fn max_reuses() -> f64 {
            42.0
        }

        let booster = Booster::gauss_decay("metrics.reuses", Origin::Dynamic(max_reuses), 0.9);
        assert_eq!(
            booster.to_score_function(),
            json!({
                "gauss": {
                    "metrics.reuses": {"origin": 42.0, "scale": 42.0, "decay": 0.9}
                }
            })
        );
    }

    #[test]
    fn test_gauss_decay_explicit_scale() {
        let booster = Booster::GaussDecay {
            field: "metrics.datasets".to_string(),
            origin: Origin::Fixed(50.0),
            scale: Some(10.0),
            decay: None,
        };
        assert_eq!(
            booster.to_score_function(),
            json!({"gauss": {"metrics.datasets": {"origin": 50.0, "scale": 10.0}}})
        );
    }
}
