use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::bucket::{BucketScheme, BucketVector};
use crate::{AggregationError, Symbol, ValidationError};

/// Denominator used when averaging a scheme across instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisorPolicy {
    /// Divide by every instrument considered, including excluded vectors.
    /// Exclusions dilute the average instead of renormalizing it.
    #[default]
    TotalConsidered,
    /// Divide only by the vectors that were summed.
    IncludedOnly,
}

impl DivisorPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalConsidered => "total",
            Self::IncludedOnly => "included",
        }
    }
}

impl Display for DivisorPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DivisorPolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "total" | "total_considered" => Ok(Self::TotalConsidered),
            "included" | "included_only" => Ok(Self::IncludedOnly),
            other => Err(ValidationError::InvalidDivisorPolicy {
                value: other.to_owned(),
            }),
        }
    }
}

/// Outcome of the finiteness check for one instrument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Included,
    ExcludedNonFinite,
}

impl Inclusion {
    /// Shared predicate for every scheme: any NaN or infinite slot excludes
    /// the whole vector.
    pub fn of(vector: &BucketVector) -> Self {
        if vector.is_finite() {
            Self::Included
        } else {
            Self::ExcludedNonFinite
        }
    }
}

/// Record of an instrument vector left out of a scheme average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub symbol: Symbol,
    pub scheme: BucketScheme,
}

/// Streaming slot-wise reduction for one scheme.
#[derive(Debug, Clone)]
pub struct CrossSectionalAggregator {
    sum: BucketVector,
    considered: usize,
    included: usize,
    exclusions: Vec<Exclusion>,
}

impl CrossSectionalAggregator {
    pub fn new(scheme: BucketScheme) -> Self {
        Self {
            sum: BucketVector::zeros(scheme),
            considered: 0,
            included: 0,
            exclusions: Vec::new(),
        }
    }

    pub fn scheme(&self) -> BucketScheme {
        self.sum.scheme()
    }

    pub fn considered(&self) -> usize {
        self.considered
    }

    pub fn included(&self) -> usize {
        self.included
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Folds one instrument vector. Non-finite vectors are counted as
    /// considered but contribute nothing to the sum.
    pub fn include(
        &mut self,
        symbol: &Symbol,
        vector: &BucketVector,
    ) -> Result<Inclusion, AggregationError> {
        if vector.scheme() != self.scheme() {
            return Err(AggregationError::SchemeMismatch {
                expected: self.scheme(),
                found: vector.scheme(),
            });
        }

        self.considered += 1;
        let inclusion = Inclusion::of(vector);
        match inclusion {
            Inclusion::Included => {
                self.sum.try_add(vector)?;
                self.included += 1;
            }
            Inclusion::ExcludedNonFinite => {
                warn!(
                    symbol = %symbol,
                    scheme = %self.scheme(),
                    "excluding non-finite bucket vector from cross-sectional average"
                );
                self.exclusions.push(Exclusion {
                    symbol: symbol.clone(),
                    scheme: self.scheme(),
                });
            }
        }
        Ok(inclusion)
    }

    /// Divides the accumulated sum according to `policy`.
    pub fn finish(self, policy: DivisorPolicy) -> Result<BucketVector, AggregationError> {
        let divisor = match policy {
            DivisorPolicy::TotalConsidered => self.considered,
            DivisorPolicy::IncludedOnly => self.included,
        };
        if self.considered == 0 {
            return Err(AggregationError::EmptyUniverse);
        }
        if divisor == 0 {
            return Err(AggregationError::EmptyScheme {
                scheme: self.scheme(),
            });
        }
        Ok(self.sum.divide(divisor as f64))
    }
}

/// Averages a complete collection of per-instrument vectors for one scheme.
pub fn average<'a, I>(
    scheme: BucketScheme,
    vectors: I,
    policy: DivisorPolicy,
) -> Result<BucketVector, AggregationError>
where
    I: IntoIterator<Item = (&'a Symbol, &'a BucketVector)>,
{
    let mut aggregator = CrossSectionalAggregator::new(scheme);
    for (symbol, vector) in vectors {
        aggregator.include(symbol, vector)?;
    }
    aggregator.finish(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    fn month_vector(first: f64) -> BucketVector {
        let mut slots = vec![0.0; 12];
        slots[0] = first;
        BucketVector::from_slots(BucketScheme::Month, slots).expect("month length")
    }

    #[test]
    fn averages_by_instrument_count() {
        let a = BucketVector::from_slots(BucketScheme::Day, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .expect("day length");
        let b = BucketVector::from_slots(BucketScheme::Day, vec![3.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .expect("day length");
        let (sa, sb) = (symbol("AAA"), symbol("BBB"));

        let avg = average(
            BucketScheme::Day,
            [(&sa, &a), (&sb, &b)],
            DivisorPolicy::TotalConsidered,
        )
        .expect("non-empty universe");
        assert_eq!(avg.slots(), &[2.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn non_finite_vector_dilutes_by_default() {
        let symbols = [symbol("AAA"), symbol("BBB"), symbol("CCC")];
        let vectors = [month_vector(12.0), month_vector(6.0), month_vector(f64::NAN)];

        let mut aggregator = CrossSectionalAggregator::new(BucketScheme::Month);
        for (symbol, vector) in symbols.iter().zip(&vectors) {
            aggregator.include(symbol, vector).expect("same scheme");
        }
        assert_eq!(aggregator.considered(), 3);
        assert_eq!(aggregator.included(), 2);
        assert_eq!(aggregator.exclusions()[0].symbol.as_str(), "CCC");

        let avg = aggregator
            .finish(DivisorPolicy::TotalConsidered)
            .expect("non-empty universe");
        assert_eq!(avg.slots()[0], 6.0);
        assert!(avg.is_finite());
    }

    #[test]
    fn infinite_vector_is_excluded_like_nan() {
        let (sa, sb) = (symbol("AAA"), symbol("BBB"));
        let (a, b) = (month_vector(4.0), month_vector(f64::INFINITY));

        let avg = average(
            BucketScheme::Month,
            [(&sa, &a), (&sb, &b)],
            DivisorPolicy::IncludedOnly,
        )
        .expect("one vector included");
        assert_eq!(avg.slots()[0], 4.0);
    }

    #[test]
    fn empty_collection_is_an_error() {
        let err = average(
            BucketScheme::Week,
            std::iter::empty::<(&Symbol, &BucketVector)>(),
            DivisorPolicy::TotalConsidered,
        )
        .expect_err("empty universe must fail");
        assert_eq!(err, AggregationError::EmptyUniverse);
    }

    #[test]
    fn all_excluded_with_renormalization_is_an_error() {
        let sa = symbol("AAA");
        let a = month_vector(f64::NAN);
        let err = average(BucketScheme::Month, [(&sa, &a)], DivisorPolicy::IncludedOnly)
            .expect_err("nothing included");
        assert_eq!(
            err,
            AggregationError::EmptyScheme {
                scheme: BucketScheme::Month
            }
        );
    }

    #[test]
    fn parses_divisor_policy() {
        assert_eq!(
            DivisorPolicy::from_str("Included").expect("must parse"),
            DivisorPolicy::IncludedOnly
        );
        assert!(DivisorPolicy::from_str("median").is_err());
    }
}
