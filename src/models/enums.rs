use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(EncounterStatus {
    Open => "open",
    VitalsTaken => "vitals_taken",
    InConsultation => "in_consultation",
    Finalized => "finalized",
    Cancelled => "cancelled",
});

str_enum!(ConsultationOutcome {
    Referred => "referred",
    Discharged => "discharged",
    RecommendedForAdmission => "recommended_for_admission",
});

str_enum!(InvestigationStatus {
    Requested => "requested",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(InvestigationType {
    Lab => "lab",
    Scan => "scan",
    Xray => "xray",
});

str_enum!(BillItemCategory {
    Drg => "drg",
    Product => "product",
    Surgery => "surgery",
    Lab => "lab",
    Scan => "scan",
    Xray => "xray",
    Service => "service",
});

str_enum!(ClaimStatus {
    Draft => "draft",
    Finalized => "finalized",
    Reopened => "reopened",
});

str_enum!(ServiceType {
    Opd => "OPD",
    Ipd => "IPD",
});

str_enum!(RecommendationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

str_enum!(AdmissionStatus {
    Confirmed => "confirmed",
    PartiallyDischarged => "partially_discharged",
    Discharged => "discharged",
});

str_enum!(DischargeOutcome {
    Recovered => "recovered",
    Referred => "referred",
    Died => "died",
    Absconded => "absconded",
});

str_enum!(CareSetting {
    Outpatient => "outpatient",
    Inpatient => "inpatient",
});

str_enum!(StaffRole {
    Doctor => "doctor",
    Nurse => "nurse",
    Pharmacist => "pharmacist",
    Lab => "lab",
    LabHead => "lab_head",
    Scan => "scan",
    Xray => "xray",
    Claims => "claims",
    Cashier => "cashier",
    Records => "records",
    Admin => "admin",
});

impl InvestigationType {
    /// Ledger category for a charge raised by this investigation type.
    pub fn category(&self) -> BillItemCategory {
        match self {
            Self::Lab => BillItemCategory::Lab,
            Self::Scan => BillItemCategory::Scan,
            Self::Xray => BillItemCategory::Xray,
        }
    }

    /// The staff role allowed to confirm or service this investigation type.
    pub fn servicing_role(&self) -> StaffRole {
        match self {
            Self::Lab => StaffRole::Lab,
            Self::Scan => StaffRole::Scan,
            Self::Xray => StaffRole::Xray,
        }
    }
}

impl CareSetting {
    /// Table holding prescriptions for this setting.
    pub fn prescription_table(&self) -> &'static str {
        match self {
            Self::Outpatient => "prescriptions",
            Self::Inpatient => "inpatient_prescriptions",
        }
    }

    /// Table holding investigations for this setting.
    pub fn investigation_table(&self) -> &'static str {
        match self {
            Self::Outpatient => "investigations",
            Self::Inpatient => "inpatient_investigations",
        }
    }

    /// Table holding investigation results for this setting.
    pub fn result_table(&self) -> &'static str {
        match self {
            Self::Outpatient => "investigation_results",
            Self::Inpatient => "inpatient_investigation_results",
        }
    }

    /// Foreign key column naming the clinical owner row. Outpatient records
    /// hang off an encounter, inpatient records off a ward-round review.
    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::Outpatient => "encounter_id",
            Self::Inpatient => "review_id",
        }
    }
}

impl BillItemCategory {
    /// Display group used by the bill detail view.
    pub fn service_group(&self) -> &'static str {
        match self {
            Self::Product => "Pharmacy",
            Self::Drg => "Diagnose",
            Self::Surgery => "Surgery",
            Self::Lab | Self::Scan | Self::Xray => "Lab/Scan/X-ray",
            Self::Service => "Services",
        }
    }
}
