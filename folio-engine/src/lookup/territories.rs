//! Sales territories and their price multipliers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One market with its own currency and list price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    /// Intake-sheet market code ("US", "UK", "USBR1", ...)
    pub code: String,
    /// ISO currency code
    pub currency: String,
    /// Multiplier applied to the home-market price
    pub multiplier: Decimal,
    /// Copy the home-market price string verbatim
    #[serde(default)]
    pub mirrors_base: bool,
    /// Wholesale discount percentage
    #[serde(default = "default_discount")]
    pub discount: String,
}

fn default_discount() -> String {
    "40".to_string()
}

fn territory(code: &str, currency: &str, multiplier: Decimal, mirrors_base: bool) -> Territory {
    Territory {
        code: code.to_string(),
        currency: currency.to_string(),
        multiplier,
        mirrors_base,
        discount: default_discount(),
    }
}

pub(crate) fn builtin_territories() -> Vec<Territory> {
    vec![
        territory("US", "USD", Decimal::ONE, true),
        territory("UK", "GBP", Decimal::new(79, 2), false),
        territory("EU", "EUR", Decimal::new(92, 2), false),
        territory("AU", "AUD", Decimal::new(152, 2), false),
        territory("CA", "CAD", Decimal::new(136, 2), false),
        territory("GC", "USD", Decimal::ONE, false),
        territory("USBR1", "USD", Decimal::new(60, 2), false),
        territory("USDE1", "USD", Decimal::ONE, false),
        territory("USRU1", "USD", Decimal::new(60, 2), false),
        territory("USPL1", "USD", Decimal::new(80, 2), false),
        territory("USKR1", "USD", Decimal::ONE, false),
        territory("USCN1", "USD", Decimal::new(70, 2), false),
        territory("USIN1", "USD", Decimal::new(50, 2), false),
        territory("USJP2", "USD", Decimal::ONE, false),
        territory("UAEUSD", "USD", Decimal::ONE, false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_parity_territory() {
        let parity: Vec<_> = builtin_territories()
            .into_iter()
            .filter(|t| t.mirrors_base)
            .collect();
        assert_eq!(parity.len(), 1);
        assert_eq!(parity[0].code, "US");
    }

    #[test]
    fn test_multipliers_positive() {
        for t in builtin_territories() {
            assert!(t.multiplier > Decimal::ZERO, "{} multiplier", t.code);
        }
    }
}
