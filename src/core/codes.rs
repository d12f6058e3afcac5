//! Fixed code lists used by the mapper and the code-list rules:
//! ISO 3166-1 countries, ISO 4217 currencies, UN/ECE Rec 20 units and
//! UNTDID 5305 tax categories.

use serde::{Deserialize, Serialize};

/// UNTDID 5305 — VAT category codes accepted by EN 16931.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategory {
    /// S — Standard rate.
    StandardRate,
    /// Z — Zero rated goods.
    ZeroRated,
    /// E — Exempt from tax.
    Exempt,
    /// AE — Reverse charge.
    ReverseCharge,
    /// K — Intra-community supply.
    IntraCommunitySupply,
    /// G — Export outside the EU.
    Export,
    /// O — Not subject to VAT.
    NotSubjectToVat,
    /// L — Canary Islands IGIC.
    CanaryIslands,
    /// M — Ceuta and Melilla IPSI.
    CeutaMelilla,
    /// B — Transferred VAT (Italy split payment).
    Transferred,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 10] = [
        Self::StandardRate,
        Self::ZeroRated,
        Self::Exempt,
        Self::ReverseCharge,
        Self::IntraCommunitySupply,
        Self::Export,
        Self::NotSubjectToVat,
        Self::CanaryIslands,
        Self::CeutaMelilla,
        Self::Transferred,
    ];

    /// UNTDID 5305 code letter.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StandardRate => "S",
            Self::ZeroRated => "Z",
            Self::Exempt => "E",
            Self::ReverseCharge => "AE",
            Self::IntraCommunitySupply => "K",
            Self::Export => "G",
            Self::NotSubjectToVat => "O",
            Self::CanaryIslands => "L",
            Self::CeutaMelilla => "M",
            Self::Transferred => "B",
        }
    }

    /// Parse from a UNTDID 5305 code (case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }

    /// Categories that must carry a 0% rate.
    pub fn requires_zero_rate(&self) -> bool {
        matches!(
            self,
            Self::ZeroRated
                | Self::Exempt
                | Self::ReverseCharge
                | Self::IntraCommunitySupply
                | Self::Export
                | Self::NotSubjectToVat
        )
    }
}

/// Check whether `code` is a known ISO 3166-1 alpha-2 country code.
pub fn is_known_country_code(code: &str) -> bool {
    COUNTRY_CODES.binary_search(&code).is_ok()
}

/// Check whether `code` is an EU member state (ISO 3166-1 alpha-2).
pub fn is_eu_country(code: &str) -> bool {
    EU_MEMBER_STATES.binary_search(&code).is_ok()
}

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

/// Check whether `code` is a known UN/ECE Rec 20 unit code.
pub fn is_known_unit_code(code: &str) -> bool {
    UNIT_CODES.binary_search(&code).is_ok()
}

/// ISO 3166-1 alpha-2 (249 entries), sorted for binary search.
static COUNTRY_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

static EU_MEMBER_STATES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE", "IT",
    "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];

static CURRENCY_CODES: &[&str] = &[
    "AED", "AMD", "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EGP", "EUR", "GBP",
    "GEL", "HKD", "HRK", "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KES", "KRW", "KZT", "MXN",
    "MYR", "NGN", "NOK", "NZD", "PHP", "PLN", "RON", "RSD", "RUB", "SAR", "SEK", "SGD", "THB",
    "TRY", "TWD", "UAH", "USD", "VND", "ZAR",
];

/// Rec 20 subset common in European invoicing.
static UNIT_CODES: &[&str] = &[
    "2N", "4K", "ANN", "BAR", "BLL", "BX", "C62", "CCM", "CLT", "CMK", "CMT", "CS", "CT", "DAY",
    "DMQ", "DMT", "DZN", "EA", "FOT", "GLL", "GM", "GRM", "GRO", "GWH", "H87", "HAR", "HLT", "HUR",
    "INH", "JOU", "KGM", "KGS", "KHZ", "KMH", "KMT", "KTM", "KVA", "KVT", "KWH", "KWT", "LBR", "LE",
    "LM", "LPA", "LS", "LTR", "MAW", "MBR", "MGM", "MHZ", "MIN", "MLT", "MMK", "MMT", "MON", "MQH",
    "MTK", "MTQ", "MTR", "MTS", "MWH", "NAR", "NPR", "P1", "PA", "PK", "PR", "QTI", "RO", "SA",
    "SEC", "SET", "SMI", "ST", "STN", "TNE", "WEE", "XBD", "XBG", "XBX", "XCT", "XPA", "XPK",
    "XPX", "XRO", "XSA", "XST", "YRD",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_are_sorted() {
        for list in [COUNTRY_CODES, EU_MEMBER_STATES, CURRENCY_CODES, UNIT_CODES] {
            assert!(list.windows(2).all(|w| w[0] < w[1]), "unsorted list near {list:?}");
        }
    }

    #[test]
    fn country_lookups() {
        assert!(is_known_country_code("DE"));
        assert!(is_known_country_code("US"));
        assert!(!is_known_country_code("XX"));
        assert!(!is_known_country_code("de"));
        assert!(is_eu_country("PL"));
        assert!(!is_eu_country("CH"));
        assert!(!is_eu_country("GB"));
    }

    #[test]
    fn currency_and_unit_lookups() {
        assert!(is_known_currency_code("EUR"));
        assert!(is_known_currency_code("RON"));
        assert!(!is_known_currency_code("XYZ"));
        assert!(is_known_unit_code("C62"));
        assert!(is_known_unit_code("H87"));
        assert!(!is_known_unit_code("PIECE"));
    }

    #[test]
    fn tax_category_codes() {
        assert_eq!(TaxCategory::from_code("ae"), Some(TaxCategory::ReverseCharge));
        assert_eq!(TaxCategory::from_code("S"), Some(TaxCategory::StandardRate));
        assert_eq!(TaxCategory::from_code("X"), None);
        assert!(TaxCategory::Exempt.requires_zero_rate());
        assert!(!TaxCategory::StandardRate.requires_zero_rate());
    }
}
