use crate::error::BoostError;
use std::fmt;
use std::str::FromStr;

/// A boost package: how long the listing is promoted and what it costs.
///
/// The catalog is fixed at compile time. Prices are whole Rupiah, the
/// smallest unit the checkout accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaymentPackage {
    #[default]
    Week,
    Fortnight,
    Month,
}

impl PaymentPackage {
    pub const ALL: [Self; 3] = [Self::Week, Self::Fortnight, Self::Month];

    pub fn duration_days(self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Fortnight => 14,
            Self::Month => 30,
        }
    }

    /// Price in minor currency units (IDR has none below the Rupiah).
    pub fn price(self) -> u64 {
        match self {
            Self::Week => 100_000,
            Self::Fortnight => 180_000,
            Self::Month => 350_000,
        }
    }

    /// Value sent to the backend in the `package` field.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Week => "7",
            Self::Fortnight => "14",
            Self::Month => "30",
        }
    }
}

impl FromStr for PaymentPackage {
    type Err = BoostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|package| package.as_wire() == code)
            .ok_or_else(|| BoostError::UnknownPackage(code.to_string()))
    }
}

impl fmt::Display for PaymentPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.duration_days())
    }
}

/// Formats an amount the way Indonesian locales print Rupiah: `Rp 180.000`.
pub fn format_idr(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("Rp {grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_prices() {
        assert_eq!(PaymentPackage::Week.price(), 100_000);
        assert_eq!(PaymentPackage::Fortnight.price(), 180_000);
        assert_eq!(PaymentPackage::Month.price(), 350_000);
        assert_eq!(PaymentPackage::default(), PaymentPackage::Week);
    }

    #[test]
    fn test_parse_wire_codes() {
        assert_eq!("7".parse::<PaymentPackage>().unwrap(), PaymentPackage::Week);
        assert_eq!(" 14 ".parse::<PaymentPackage>().unwrap(), PaymentPackage::Fortnight);
        assert_eq!("30".parse::<PaymentPackage>().unwrap(), PaymentPackage::Month);
        assert!(matches!(
            "90".parse::<PaymentPackage>(),
            Err(BoostError::UnknownPackage(code)) if code == "90"
        ));
    }

    #[test]
    fn test_format_idr() {
        assert_eq!(format_idr(0), "Rp 0");
        assert_eq!(format_idr(999), "Rp 999");
        assert_eq!(format_idr(100_000), "Rp 100.000");
        assert_eq!(format_idr(1_350_000), "Rp 1.350.000");
    }

    #[test]
    fn test_display() {
        assert_eq!(PaymentPackage::Month.to_string(), "30 days");
    }
}
