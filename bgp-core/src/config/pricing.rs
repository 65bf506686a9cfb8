//! Token plans and local currency conversion.

use bgp_sdk::objects::{Country, Currency, TokenPlan};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    /// Kenyan shillings per Ugandan shilling.
    pub kes_per_ugx: Decimal,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub plans: Vec<TokenPlan>,
    pub currency: CurrencyConfig,
}

impl PricingConfig {
    pub fn plan(&self, plan_id: &str) -> Option<&TokenPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Price in the payer's currency, as minor units.
    ///
    /// Returns `None` if the converted amount does not fit an `i64`.
    pub fn local_amount(&self, amount_ugx: i64, country: Country) -> Option<(Currency, i64)> {
        let currency = country.currency();
        let major = match currency {
            Currency::Ugx => Decimal::from(amount_ugx),
            Currency::Kes => Decimal::from(amount_ugx) * self.currency.kes_per_ugx,
        };
        let scale = Decimal::from(10i64.pow(currency.minor_digits()));
        let minor = (major * scale).round().to_i64()?;
        Some((currency, minor))
    }
}
