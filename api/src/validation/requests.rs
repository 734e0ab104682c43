//! Token declarations and validation for API request types
//!
//! Rule presets follow the KSeF schema annotations of each field.

use shared::models::{
    Address, ContactInfo, CreateInvoiceRequest, CreateTaxpayerRequest, TaxpayerIdentification,
};

use super::extractors::{FieldError, Validatable, ValidationBuilder};
use super::normalizer::{TokenField, TokenSchema};
use super::token::TokenRule;
use super::validators::{validate_item_count, validate_required};
use crate::token_graph;

// ─────────────────────────────────────────────────────────────────────────────
// Constants for validation rules
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum number of contact entries per address
const MAX_CONTACT_INFOS: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Invoice
// ─────────────────────────────────────────────────────────────────────────────

token_graph! {
    CreateInvoiceRequest {}
}

impl Validatable for CreateInvoiceRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut builder = ValidationBuilder::with_token_checks(self);
        builder.check("number", || validate_required(&self.number));
        builder.build()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Taxpayer
// ─────────────────────────────────────────────────────────────────────────────

token_graph! {
    ContactInfo {}
}

token_graph! {
    TaxpayerIdentification {
        name ("name"): token(TokenRule::TZNAKOWY512),
    }
}

token_graph! {
    Address {
        address_line1 ("addressLine1"): token(TokenRule::TZNAKOWY512),
        address_line2 ("addressLine2"): token(TokenRule::TZNAKOWY512),
        global_location_number ("globalLocationNumber"): token(TokenRule::TZNAKOWY512),
        contact_infos ("contactInfos"): nested,
    }
}

token_graph! {
    CreateTaxpayerRequest {
        eori_number ("eoriNumber"): token(TokenRule::TZNAKOWY),
        identification_data ("identificationData"): nested,
        address ("address"): nested,
        correspondence_address ("correspondenceAddress"): nested,
    }
}

impl Validatable for CreateTaxpayerRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut builder = ValidationBuilder::with_token_checks(self);

        builder.check("identificationData.nipNumber", || {
            validate_required(&self.identification_data.nip_number)
        });

        check_contact_infos(&mut builder, "address", &self.address);
        if let Some(ref correspondence) = self.correspondence_address {
            check_contact_infos(&mut builder, "correspondenceAddress", correspondence);
        }

        builder.build()
    }
}

fn check_contact_infos(builder: &mut ValidationBuilder, prefix: &str, address: &Address) {
    let field = format!("{prefix}.contactInfos");
    builder.check(&field, || {
        validate_item_count(address.contact_infos.as_deref(), 0, MAX_CONTACT_INFOS)
    });
}

/// Field tables of every request type accepted by the API
pub fn registered_schemas() -> Vec<(&'static str, &'static [TokenField])> {
    vec![
        ("CreateInvoiceRequest", CreateInvoiceRequest::token_fields()),
        ("CreateTaxpayerRequest", CreateTaxpayerRequest::token_fields()),
        ("TaxpayerIdentification", TaxpayerIdentification::token_fields()),
        ("Address", Address::token_fields()),
        ("ContactInfo", ContactInfo::token_fields()),
    ]
}
