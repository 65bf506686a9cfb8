//! Phone number normalization and mobile-money network classification.
//!
//! Numbers are accepted in international (`+256771234567`, `256771234567`)
//! or national (`0771234567`, assumed Ugandan) form. Classification looks at
//! the two digits following the country code.

use crate::objects::network::{Country, PaymentNetwork};

/// A normalized subscriber number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber {
    country: Country,
    /// The nine-digit national significant number.
    subscriber: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("unsupported country code in {0}")]
    UnsupportedCountry(String),
    #[error("expected 9 subscriber digits, got {0}")]
    InvalidLength(usize),
}

const SUBSCRIBER_DIGITS: usize = 9;

const UGANDA_PREFIXES: &[(&str, PaymentNetwork)] = &[
    ("76", PaymentNetwork::Mtn),
    ("77", PaymentNetwork::Mtn),
    ("78", PaymentNetwork::Mtn),
    ("79", PaymentNetwork::Mtn),
    ("31", PaymentNetwork::Mtn),
    ("39", PaymentNetwork::Mtn),
    ("70", PaymentNetwork::Airtel),
    ("74", PaymentNetwork::Airtel),
    ("75", PaymentNetwork::Airtel),
    ("20", PaymentNetwork::Airtel),
];

const KENYA_PREFIXES: &[(&str, PaymentNetwork)] = &[
    ("70", PaymentNetwork::Mpesa),
    ("71", PaymentNetwork::Mpesa),
    ("72", PaymentNetwork::Mpesa),
    ("74", PaymentNetwork::Mpesa),
    ("79", PaymentNetwork::Mpesa),
    ("11", PaymentNetwork::Mpesa),
    ("73", PaymentNetwork::Airtel),
    ("75", PaymentNetwork::Airtel),
    ("78", PaymentNetwork::Airtel),
    ("10", PaymentNetwork::Airtel),
];

impl PhoneNumber {
    /// Parse and normalize a raw phone number.
    ///
    /// Spaces, dashes, dots and parentheses are ignored.
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let trimmed = raw.trim();
        let (has_plus, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }
        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (country, subscriber) = if let Some(s) =
            digits.strip_prefix(Country::Uganda.dialling_code())
        {
            (Country::Uganda, s)
        } else if let Some(s) = digits.strip_prefix(Country::Kenya.dialling_code()) {
            (Country::Kenya, s)
        } else if !has_plus && digits.starts_with('0') {
            (Country::Uganda, &digits[1..])
        } else {
            return Err(PhoneError::UnsupportedCountry(trimmed.to_string()));
        };

        if subscriber.len() != SUBSCRIBER_DIGITS {
            return Err(PhoneError::InvalidLength(subscriber.len()));
        }

        Ok(Self {
            country,
            subscriber: subscriber.to_string(),
        })
    }

    pub fn country(&self) -> Country {
        self.country
    }

    /// `+{country}{subscriber}`.
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country.dialling_code(), self.subscriber)
    }

    /// The network owning this number's prefix, if known.
    pub fn network(&self) -> Option<PaymentNetwork> {
        let table = match self.country {
            Country::Uganda => UGANDA_PREFIXES,
            Country::Kenya => KENYA_PREFIXES,
        };
        let prefix = &self.subscriber[..2];
        table
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, network)| *network)
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}{}", self.country.dialling_code(), self.subscriber)
    }
}

/// Dashboard label for a raw phone number: `"MTN"`, `"Airtel"`, `"M-PESA"`
/// or `"Unknown"`.
pub fn categorize(raw: &str) -> &'static str {
    PhoneNumber::parse(raw)
        .ok()
        .and_then(|p| p.network())
        .map(PaymentNetwork::label)
        .unwrap_or("Unknown")
}
