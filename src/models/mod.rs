pub mod enums;

mod actor;
mod billing;
mod claim;
mod encounter;
mod investigation;
mod patient;
mod prescription;
mod price;
mod ward;

pub use actor::Actor;
pub use billing::{Bill, BillItem, Receipt, ReceiptItem};
pub use claim::{Claim, ClaimDiagnosis, ClaimInvestigation, ClaimPrescription, ClaimProcedure};
pub use encounter::{Diagnosis, Encounter};
pub use investigation::{Investigation, InvestigationResult};
pub use patient::Patient;
pub use prescription::{Prescription, PrescriptionState, StateStamp};
pub use price::{DrgCatalog, DrgPrice, ProductPrice};
pub use ward::{AdmissionRecommendation, Bed, InpatientDiagnosis, InpatientReview, WardAdmission};
