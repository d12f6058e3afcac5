//! Electronic Address Scheme (EAS) code list for Peppol endpoint ids.

use serde::Serialize;

/// An EAS code accepted as `schemeID` on a Peppol `EndpointID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EasScheme {
    /// Scheme code (e.g. "0088", "9930", "EM").
    pub code: &'static str,
    pub description: &'static str,
}

impl EasScheme {
    /// Email address, used by most non-Peppol routing.
    pub const EMAIL: Self = Self::new("EM", "Electronic mail");
    /// GS1 GLN, international.
    pub const GLN: Self = Self::new("0088", "GS1 GLN");
    /// German Leitweg-ID (public sector routing).
    pub const LEITWEG_ID: Self = Self::new("0204", "Leitweg-ID");
    pub const BE_EN: Self = Self::new("0208", "Belgian enterprise number");
    pub const DK_DIGST: Self = Self::new("0184", "DIGSTORG");
    pub const NL_OIN: Self = Self::new("0190", "Dutch OIN");
    pub const NL_KVK: Self = Self::new("0106", "Dutch KvK");
    pub const IT_CF: Self = Self::new("0210", "Italian Codice Fiscale");
    pub const IT_IVA: Self = Self::new("0211", "Italian Partita IVA");
    pub const FI_OVT: Self = Self::new("0037", "Finnish OVT");
    pub const SE_ORG: Self = Self::new("0007", "Swedish Org number");
    pub const NO_ORG: Self = Self::new("0192", "Norwegian Org number");
    pub const FR_SIRENE: Self = Self::new("0009", "French SIRET");
    pub const FR_SIREN: Self = Self::new("0002", "French SIREN");
    pub const DE_VAT: Self = Self::new("9930", "German VAT number");
    pub const AT_VAT: Self = Self::new("9914", "Austrian VAT number");
    pub const BE_VAT: Self = Self::new("9925", "Belgian VAT number");
    pub const FR_VAT: Self = Self::new("9957", "French VAT number");
    pub const IT_VAT: Self = Self::new("9906", "Italian VAT number");
    pub const NL_VAT: Self = Self::new("9944", "Dutch VAT number");
    pub const PL_VAT: Self = Self::new("9945", "Polish VAT number");
    pub const RO_VAT: Self = Self::new("9947", "Romanian VAT number");
    pub const ES_VAT: Self = Self::new("9920", "Spanish VAT number");

    const fn new(code: &'static str, description: &'static str) -> Self {
        Self { code, description }
    }
}

/// Every scheme in the list, sorted by code.
pub const EAS_SCHEMES: &[EasScheme] = &[
    EasScheme::FR_SIREN,
    EasScheme::SE_ORG,
    EasScheme::FR_SIRENE,
    EasScheme::FI_OVT,
    EasScheme::GLN,
    EasScheme::NL_KVK,
    EasScheme::DK_DIGST,
    EasScheme::NL_OIN,
    EasScheme::NO_ORG,
    EasScheme::LEITWEG_ID,
    EasScheme::BE_EN,
    EasScheme::IT_CF,
    EasScheme::IT_IVA,
    EasScheme::IT_VAT,
    EasScheme::AT_VAT,
    EasScheme::ES_VAT,
    EasScheme::BE_VAT,
    EasScheme::DE_VAT,
    EasScheme::NL_VAT,
    EasScheme::PL_VAT,
    EasScheme::RO_VAT,
    EasScheme::FR_VAT,
    EasScheme::EMAIL,
];

/// Whether `code` is in the EAS list. Surrounding whitespace is ignored.
pub fn is_known_eas_code(code: &str) -> bool {
    let code = code.trim();
    EAS_SCHEMES.iter().any(|s| s.code.eq_ignore_ascii_case(code))
}

/// Default endpoint scheme for a country.
///
/// Germany maps to the Leitweg-ID scheme used by public buyers; use
/// [`EasScheme::DE_VAT`] for B2B.
pub fn eas_scheme_for_country(country_code: &str) -> Option<EasScheme> {
    match country_code.trim().to_ascii_uppercase().as_str() {
        "DE" => Some(EasScheme::LEITWEG_ID),
        "AT" => Some(EasScheme::AT_VAT),
        "BE" => Some(EasScheme::BE_EN),
        "DK" => Some(EasScheme::DK_DIGST),
        "ES" => Some(EasScheme::ES_VAT),
        "FI" => Some(EasScheme::FI_OVT),
        "FR" => Some(EasScheme::FR_SIRENE),
        "IT" => Some(EasScheme::IT_IVA),
        "NL" => Some(EasScheme::NL_KVK),
        "NO" => Some(EasScheme::NO_ORG),
        "PL" => Some(EasScheme::PL_VAT),
        "RO" => Some(EasScheme::RO_VAT),
        "SE" => Some(EasScheme::SE_ORG),
        _ => None,
    }
}
