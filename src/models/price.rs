use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three G-DRG-keyed catalogs share one row layout and are consulted in
/// a fixed order during price resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrgCatalog {
    Procedure,
    Surgery,
    UnmappedDrg,
}

impl DrgCatalog {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Procedure => "procedure_prices",
            Self::Surgery => "surgery_prices",
            Self::UnmappedDrg => "unmapped_drg_prices",
        }
    }

    /// Resolution order for G-DRG lookups.
    pub fn lookup_order() -> [DrgCatalog; 3] {
        [Self::Procedure, Self::Surgery, Self::UnmappedDrg]
    }

    /// Resolution order when pricing a recorded surgical procedure: the
    /// surgery catalog wins over the general procedure catalog.
    pub fn surgery_first_order() -> [DrgCatalog; 3] {
        [Self::Surgery, Self::Procedure, Self::UnmappedDrg]
    }
}

/// Row of a G-DRG catalog: cash rate, NHIA approved tariff and the insured
/// patient's share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrgPrice {
    pub id: Uuid,
    pub gdrg_code: String,
    pub service_name: String,
    pub base_rate: f64,
    pub nhia_app: Option<f64>,
    pub co_payment: Option<f64>,
    pub is_active: bool,
}

/// Row of the medication catalog. `insurance_covered == false` forces cash
/// pricing even for insured patients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPrice {
    pub id: Uuid,
    pub medication_code: String,
    pub product_name: String,
    pub base_rate: f64,
    pub co_payment: Option<f64>,
    pub claim_amount: Option<f64>,
    pub insurance_covered: bool,
    pub is_active: bool,
}
