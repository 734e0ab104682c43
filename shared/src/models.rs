use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════
// INVOICE TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Invoice creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Invoice number assigned by the issuer, e.g. `FV/01/2026`.
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    /// Identifier of the created invoice
    pub id: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// TAXPAYER TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Taxpayer status (KSeF `TStatusInfoPodatnika`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxpayerStatus {
    /// Taxpayer in liquidation
    Liquidation,
    /// Taxpayer under restructuring proceedings
    Restructuring,
    /// Bankruptcy proceedings against the taxpayer
    Bankruptcy,
    /// Taxpayer in receivership
    Inheritance,
}

impl std::fmt::Display for TaxpayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxpayerStatus::Liquidation => write!(f, "LIQUIDATION"),
            TaxpayerStatus::Restructuring => write!(f, "RESTRUCTURING"),
            TaxpayerStatus::Bankruptcy => write!(f, "BANKRUPTCY"),
            TaxpayerStatus::Inheritance => write!(f, "INHERITANCE"),
        }
    }
}

/// Contact details (KSeF `TDaneKontaktowe`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    /// e.g. `kontakt@przykladowy.pl`
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Taxpayer identification data (KSeF `TPodmiot1`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxpayerIdentification {
    /// NIP number, e.g. `123-456-32-18`
    pub nip_number: String,
    /// Name of the taxpayer, e.g. `Firma XYZ Sp. z o.o.`
    pub name: String,
}

/// Postal address (KSeF `TAdres`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// e.g. `ul. Przykładowa 10`
    pub address_line1: String,
    /// e.g. `05-500 Warszawa`
    pub address_line2: Option<String>,
    /// Global Location Number (GLN), if applicable
    pub global_location_number: Option<String>,
    pub contact_infos: Option<Vec<ContactInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaxpayerRequest {
    /// EORI (Economic Operators Registration and Identification) number used
    /// for customs identification in the European Union.
    pub eori_number: Option<String>,
    pub identification_data: TaxpayerIdentification,
    pub address: Address,
    pub correspondence_address: Option<Address>,
    pub status: Option<TaxpayerStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaxpayerResponse {
    /// Internal identifier of the taxpayer (UUID v7, time-ordered)
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaxpayerResponse {
    pub id: Uuid,
}
