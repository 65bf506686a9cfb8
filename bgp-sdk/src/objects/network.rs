//! Countries, currencies and mobile-money networks.

use serde::{Deserialize, Serialize};

/// Countries where collections can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "UG")]
    Uganda,
    #[serde(rename = "KE")]
    Kenya,
}

impl Country {
    /// International dialling code, without the leading `+`.
    pub fn dialling_code(self) -> &'static str {
        match self {
            Country::Uganda => "256",
            Country::Kenya => "254",
        }
    }

    pub fn currency(self) -> Currency {
        match self {
            Country::Uganda => Currency::Ugx,
            Country::Kenya => Currency::Kes,
        }
    }

    /// ISO 3166-1 alpha-2 code.
    pub fn code(self) -> &'static str {
        match self {
            Country::Uganda => "UG",
            Country::Kenya => "KE",
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ugx,
    Kes,
}

impl Currency {
    /// Number of decimal places used for minor units.
    ///
    /// UGX has no subunit in circulation; KES has cents.
    pub fn minor_digits(self) -> u32 {
        match self {
            Currency::Ugx => 0,
            Currency::Kes => 2,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Ugx => "UGX",
            Currency::Kes => "KES",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Mobile-money networks reachable through the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentNetwork {
    #[serde(rename = "MTN", alias = "mtn")]
    Mtn,
    #[serde(rename = "Airtel", alias = "airtel")]
    Airtel,
    #[serde(rename = "M-PESA", alias = "mpesa", alias = "safaricom")]
    Mpesa,
}

impl PaymentNetwork {
    pub fn label(self) -> &'static str {
        match self {
            PaymentNetwork::Mtn => "MTN",
            PaymentNetwork::Airtel => "Airtel",
            PaymentNetwork::Mpesa => "M-PESA",
        }
    }
}

impl std::fmt::Display for PaymentNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
