//! Currency resolution for a single country.

use crate::rates::RateTable;

/// Outcome of resolving a country's declared currencies.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedCurrency {
    /// The country declares no currency at all.
    NoCurrency,
    /// The first declared entry carries no usable code.
    Uncoded,
    /// A currency was selected but the rate table has no usable rate for it.
    Unpriced { code: String },
    /// A currency was selected and priced.
    Priced { code: String, rate: f64 },
}

impl ResolvedCurrency {
    /// Selected currency code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ResolvedCurrency::NoCurrency | ResolvedCurrency::Uncoded => None,
            ResolvedCurrency::Unpriced { code } | ResolvedCurrency::Priced { code, .. } => {
                Some(code)
            }
        }
    }

    /// Resolved exchange rate, if any.
    pub fn rate(&self) -> Option<f64> {
        match self {
            ResolvedCurrency::Priced { rate, .. } => Some(*rate),
            _ => None,
        }
    }
}

/// Picks one currency per country and attaches its rate.
///
/// Only the first declared entry in source order counts. There is no
/// fallback to the other entries when the first one has no code or no rate.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyResolver<'a> {
    table: &'a RateTable,
}

impl<'a> CurrencyResolver<'a> {
    /// Create a resolver over a fetched rate table.
    pub fn new(table: &'a RateTable) -> Self {
        Self { table }
    }

    /// Resolve the declared currency codes of one country.
    ///
    /// An entry without a code is passed as an empty string.
    pub fn resolve<I, S>(&self, declared: I) -> ResolvedCurrency
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(first) = declared.into_iter().next() else {
            return ResolvedCurrency::NoCurrency;
        };

        let code = first.as_ref().trim();
        if code.is_empty() {
            return ResolvedCurrency::Uncoded;
        }

        let code = code.to_string();
        match self.table.rate_for(&code) {
            Some(rate) => ResolvedCurrency::Priced { code, rate },
            None => ResolvedCurrency::Unpriced { code },
        }
    }
}
