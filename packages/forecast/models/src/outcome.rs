//! Three-way result type shared by the tile classifier and the scenario
//! reducer.
//!
//! Every public operation in the workspace returns an [`Outcome`] instead
//! of surfacing errors to the presentation layer. Callers that only care
//! about something renderable use [`Outcome::into_value_or_default`];
//! callers that need to tell "confirmed no data" apart from "computation
//! failed" match on the variants.

/// Result of a best-effort computation over a batch of forecast data.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The computation succeeded and produced data.
    Data(T),
    /// The input batch was empty, missing, or not a recognizable batch.
    Empty,
    /// The computation failed part-way; `value` is the documented
    /// fallback for this operation.
    Degraded {
        /// Fallback value to render instead.
        value: T,
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl<T> Outcome<T> {
    /// Builds a degraded outcome from any displayable error.
    pub fn degraded(value: T, reason: impl std::fmt::Display) -> Self {
        Self::Degraded {
            value,
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for [`Outcome::Data`].
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Returns `true` for [`Outcome::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` for [`Outcome::Degraded`].
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The failure description of a degraded outcome.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Degraded { reason, .. } => Some(reason),
            Self::Data(_) | Self::Empty => None,
        }
    }

    /// Borrows the carried value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Data(value) | Self::Degraded { value, .. } => Some(value),
            Self::Empty => None,
        }
    }

    /// Maps the carried value, preserving the variant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Data(value) => Outcome::Data(f(value)),
            Self::Empty => Outcome::Empty,
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}

impl<T: Default> Outcome<T> {
    /// Unwraps to the carried value, using `T::default()` for
    /// [`Outcome::Empty`].
    pub fn into_value_or_default(self) -> T {
        match self {
            Self::Data(value) | Self::Degraded { value, .. } => value,
            Self::Empty => T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_falls_back_to_default() {
        let outcome: Outcome<Vec<u32>> = Outcome::Empty;
        assert!(outcome.is_empty());
        assert!(outcome.value().is_none());
        assert!(outcome.into_value_or_default().is_empty());
    }

    #[test]
    fn degraded_keeps_value_and_reason() {
        let outcome = Outcome::degraded(vec![1, 2], "attribute absent");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.reason(), Some("attribute absent"));
        assert_eq!(outcome.map(|v| v.len()).into_value_or_default(), 2);
    }
}
