use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

lazy_static! {
    static ref PAN_REGEX: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();
    static ref GSTIN_REGEX: Regex = Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][0-9A-Z]{3}$").unwrap();
    static ref ASSESSMENT_YEAR_REGEX: Regex = Regex::new(r"^([0-9]{4})-([0-9]{2})$").unwrap();
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar")]
#[sqlx(rename_all = "snake_case")]
pub enum ServiceType {
    Gst,
    Itr,
    Trademark,
    TaxPlanning,
    BusinessAdvisory,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::Gst,
        ServiceType::Itr,
        ServiceType::Trademark,
        ServiceType::TaxPlanning,
        ServiceType::BusinessAdvisory,
    ];

    /// Human readable name used in emails and bill descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Gst => "GST",
            ServiceType::Itr => "ITR",
            ServiceType::Trademark => "Trademark",
            ServiceType::TaxPlanning => "Tax Planning",
            ServiceType::BusinessAdvisory => "Business Advisory",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[sqlx(type_name = "varchar")]
#[sqlx(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[serde(rename = "Pending", alias = "pending")]
    Pending,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Approved", alias = "approved")]
    Approved,
    #[serde(rename = "Rejected", alias = "rejected")]
    Rejected,
    #[serde(rename = "Completed", alias = "completed")]
    Completed,
    #[serde(rename = "Cancelled", alias = "cancelled")]
    Cancelled,
}

impl ServiceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServiceStatus::Rejected | ServiceStatus::Completed | ServiceStatus::Cancelled
        )
    }

    /// Re-applying the current status is always allowed so remarks can be edited.
    pub fn can_transition_to(&self, next: ServiceStatus) -> bool {
        use ServiceStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (InProgress, Approved)
                | (InProgress, Rejected)
                | (InProgress, Completed)
                | (Approved, InProgress)
                | (Approved, Completed)
        )
    }

    /// Cancellation belongs to the requesting client only.
    pub fn is_admin_assignable(&self) -> bool {
        *self != ServiceStatus::Cancelled
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::Pending => "Pending",
            ServiceStatus::InProgress => "In Progress",
            ServiceStatus::Approved => "Approved",
            ServiceStatus::Rejected => "Rejected",
            ServiceStatus::Completed => "Completed",
            ServiceStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Clone, FromRow)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: ServiceType,
    pub status: ServiceStatus,
    pub details: Json<serde_json::Value>,
    /// Amount in paise.
    pub quoted_amount: i64,
    pub remarks: Option<String>,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GstFilingType {
    Registration,
    Monthly,
    Quarterly,
    Annual,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GstDetails {
    #[validate(length(min = 2, max = 150))]
    pub business_name: String,
    pub pan: String,
    pub gstin: Option<String>,
    #[validate(length(min = 2, max = 60))]
    pub business_type: String,
    #[validate(length(min = 2, max = 60))]
    pub state: String,
    pub filing_type: GstFilingType,
    #[validate(range(min = 0))]
    pub annual_turnover: Option<i64>,
    #[validate(length(min = 10, max = 15))]
    pub contact_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ItrDetails {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    pub pan: String,
    pub assessment_year: String,
    #[validate(length(min = 1, max = 10))]
    pub income_sources: Vec<String>,
    #[validate(length(max = 10))]
    pub itr_form: Option<String>,
    #[validate(length(min = 10, max = 15))]
    pub contact_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrademarkDetails {
    #[validate(length(min = 2, max = 100))]
    pub applicant_name: String,
    #[validate(length(min = 1, max = 100))]
    pub brand_name: String,
    #[validate(range(min = 1, max = 45))]
    pub class_number: u8,
    #[validate(length(min = 10, max = 2000))]
    pub description: String,
    #[validate(url)]
    pub logo_url: Option<String>,
    #[validate(length(min = 10, max = 15))]
    pub contact_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaxPlanningDetails {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    #[validate(range(min = 0))]
    pub annual_income: i64,
    #[validate(length(min = 2, max = 100))]
    pub occupation: String,
    #[validate(length(min = 10, max = 2000))]
    pub goals: String,
    #[validate(length(min = 10, max = 15))]
    pub contact_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BusinessAdvisoryDetails {
    #[validate(length(min = 2, max = 150))]
    pub company_name: String,
    #[validate(length(min = 2, max = 100))]
    pub industry: String,
    #[validate(length(min = 2, max = 50))]
    pub stage: String,
    #[validate(length(min = 10, max = 2000))]
    pub query: String,
    #[validate(length(min = 10, max = 15))]
    pub contact_phone: String,
}

#[derive(Error, Debug)]
pub enum DetailsError {
    #[error("Malformed request details: {0}")]
    Malformed(String),
    #[error("Invalid request details: {0}")]
    Invalid(String),
    #[error("Invalid {field}: {message}")]
    Format { field: &'static str, message: String },
}

impl From<serde_json::Error> for DetailsError {
    fn from(e: serde_json::Error) -> Self {
        DetailsError::Malformed(e.to_string())
    }
}

impl From<ValidationErrors> for DetailsError {
    fn from(e: ValidationErrors) -> Self {
        DetailsError::Invalid(e.to_string())
    }
}

/// Category specific form submitted with a service request.
#[derive(Debug, Clone)]
pub enum ServiceDetails {
    Gst(GstDetails),
    Itr(ItrDetails),
    Trademark(TrademarkDetails),
    TaxPlanning(TaxPlanningDetails),
    BusinessAdvisory(BusinessAdvisoryDetails),
}

impl ServiceDetails {
    pub fn parse(service_type: ServiceType, value: serde_json::Value) -> Result<Self, DetailsError> {
        let mut details = match service_type {
            ServiceType::Gst => ServiceDetails::Gst(serde_json::from_value(value)?),
            ServiceType::Itr => ServiceDetails::Itr(serde_json::from_value(value)?),
            ServiceType::Trademark => ServiceDetails::Trademark(serde_json::from_value(value)?),
            ServiceType::TaxPlanning => ServiceDetails::TaxPlanning(serde_json::from_value(value)?),
            ServiceType::BusinessAdvisory => {
                ServiceDetails::BusinessAdvisory(serde_json::from_value(value)?)
            }
        };

        details.normalize();
        details.check()?;
        Ok(details)
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceDetails::Gst(_) => ServiceType::Gst,
            ServiceDetails::Itr(_) => ServiceType::Itr,
            ServiceDetails::Trademark(_) => ServiceType::Trademark,
            ServiceDetails::TaxPlanning(_) => ServiceType::TaxPlanning,
            ServiceDetails::BusinessAdvisory(_) => ServiceType::BusinessAdvisory,
        }
    }

    pub fn into_json(self) -> serde_json::Value {
        let value = match self {
            ServiceDetails::Gst(d) => serde_json::to_value(d),
            ServiceDetails::Itr(d) => serde_json::to_value(d),
            ServiceDetails::Trademark(d) => serde_json::to_value(d),
            ServiceDetails::TaxPlanning(d) => serde_json::to_value(d),
            ServiceDetails::BusinessAdvisory(d) => serde_json::to_value(d),
        };
        // Plain structs of strings and numbers always serialize
        value.unwrap_or(serde_json::Value::Null)
    }

    fn normalize(&mut self) {
        match self {
            ServiceDetails::Gst(d) => {
                d.pan = d.pan.trim().to_uppercase();
                d.gstin = d
                    .gstin
                    .take()
                    .map(|g| g.trim().to_uppercase())
                    .filter(|g| !g.is_empty());
            }
            ServiceDetails::Itr(d) => {
                d.pan = d.pan.trim().to_uppercase();
                d.assessment_year = d.assessment_year.trim().to_string();
            }
            _ => {}
        }
    }

    fn check(&self) -> Result<(), DetailsError> {
        match self {
            ServiceDetails::Gst(d) => {
                d.validate()?;
                check_pan(&d.pan)?;
                if let Some(gstin) = &d.gstin {
                    check_gstin(gstin, &d.pan)?;
                }
            }
            ServiceDetails::Itr(d) => {
                d.validate()?;
                check_pan(&d.pan)?;
                check_assessment_year(&d.assessment_year)?;
            }
            ServiceDetails::Trademark(d) => d.validate()?,
            ServiceDetails::TaxPlanning(d) => d.validate()?,
            ServiceDetails::BusinessAdvisory(d) => d.validate()?,
        }
        Ok(())
    }
}

fn check_pan(pan: &str) -> Result<(), DetailsError> {
    if PAN_REGEX.is_match(pan) {
        Ok(())
    } else {
        Err(DetailsError::Format {
            field: "pan",
            message: "expected five letters, four digits and a letter".to_string(),
        })
    }
}

fn check_gstin(gstin: &str, pan: &str) -> Result<(), DetailsError> {
    if !GSTIN_REGEX.is_match(gstin) {
        return Err(DetailsError::Format {
            field: "gstin",
            message: "expected 15 character GSTIN".to_string(),
        });
    }
    // Characters 3..12 of a GSTIN are the holder's PAN
    if &gstin[2..12] != pan {
        return Err(DetailsError::Format {
            field: "gstin",
            message: "GSTIN does not belong to the given PAN".to_string(),
        });
    }
    Ok(())
}

fn check_assessment_year(year: &str) -> Result<(), DetailsError> {
    let invalid = || DetailsError::Format {
        field: "assessment_year",
        message: "expected a range such as 2024-25".to_string(),
    };

    let caps = ASSESSMENT_YEAR_REGEX.captures(year).ok_or_else(invalid)?;
    let start: u32 = caps[1].parse().map_err(|_| invalid())?;
    let end: u32 = caps[2].parse().map_err(|_| invalid())?;

    if (start + 1) % 100 == end {
        Ok(())
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gst_json() -> serde_json::Value {
        json!({
            "business_name": "Sharma Traders",
            "pan": "abcde1234f",
            "gstin": "27ABCDE1234F1Z5",
            "business_type": "Proprietorship",
            "state": "Maharashtra",
            "filing_type": "monthly",
            "annual_turnover": 2500000,
            "contact_phone": "9876543210"
        })
    }

    #[test]
    fn test_status_transitions() {
        use ServiceStatus::*;

        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Approved.can_transition_to(InProgress));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_same_status_is_allowed_even_when_terminal() {
        assert!(ServiceStatus::Completed.can_transition_to(ServiceStatus::Completed));
        assert!(ServiceStatus::Pending.can_transition_to(ServiceStatus::Pending));
    }

    #[test]
    fn test_status_serde_names() {
        let status: ServiceStatus = serde_json::from_value(json!("In Progress")).unwrap();
        assert_eq!(status, ServiceStatus::InProgress);
        let status: ServiceStatus = serde_json::from_value(json!("in_progress")).unwrap();
        assert_eq!(status, ServiceStatus::InProgress);
        assert_eq!(serde_json::to_value(ServiceStatus::Completed).unwrap(), json!("Completed"));
    }

    #[test]
    fn test_service_type_path_names() {
        let ty: ServiceType = serde_json::from_value(json!("tax-planning")).unwrap();
        assert_eq!(ty, ServiceType::TaxPlanning);
        assert_eq!(
            serde_json::to_value(ServiceType::BusinessAdvisory).unwrap(),
            json!("business-advisory")
        );
        assert!(serde_json::from_value::<ServiceType>(json!("payroll")).is_err());
    }

    #[test]
    fn test_parse_gst_normalizes_case() {
        let details = ServiceDetails::parse(ServiceType::Gst, gst_json()).unwrap();
        assert_eq!(details.service_type(), ServiceType::Gst);
        let value = details.into_json();
        assert_eq!(value["pan"], "ABCDE1234F");
        assert_eq!(value["gstin"], "27ABCDE1234F1Z5");
    }

    #[test]
    fn test_parse_gst_accepts_any_alphanumeric_suffix() {
        let mut body = gst_json();
        body["gstin"] = json!("27abcde1234f0a5");
        let value = ServiceDetails::parse(ServiceType::Gst, body).unwrap().into_json();
        assert_eq!(value["gstin"], "27ABCDE1234F0A5");

        let mut body = gst_json();
        body["gstin"] = json!("27ABCDE1234F0A");
        let err = ServiceDetails::parse(ServiceType::Gst, body).unwrap_err();
        assert!(matches!(err, DetailsError::Format { field: "gstin", .. }));
    }

    #[test]
    fn test_parse_gst_rejects_foreign_gstin() {
        let mut body = gst_json();
        body["gstin"] = json!("27ZZZZZ9999Z1Z5");
        let err = ServiceDetails::parse(ServiceType::Gst, body).unwrap_err();
        assert!(matches!(err, DetailsError::Format { field: "gstin", .. }));
    }

    #[test]
    fn test_parse_gst_empty_gstin_is_dropped() {
        let mut body = gst_json();
        body["gstin"] = json!("  ");
        let details = ServiceDetails::parse(ServiceType::Gst, body).unwrap();
        assert!(details.into_json()["gstin"].is_null());
    }

    #[test]
    fn test_parse_itr_assessment_year() {
        let body = json!({
            "full_name": "Asha Rao",
            "pan": "PQRSX6789K",
            "assessment_year": "2024-25",
            "income_sources": ["salary", "interest"],
            "contact_phone": "9123456780"
        });
        assert!(ServiceDetails::parse(ServiceType::Itr, body.clone()).is_ok());

        let mut wrong = body.clone();
        wrong["assessment_year"] = json!("2024-26");
        assert!(ServiceDetails::parse(ServiceType::Itr, wrong).is_err());

        let mut century = body;
        century["assessment_year"] = json!("2099-00");
        assert!(ServiceDetails::parse(ServiceType::Itr, century).is_ok());
    }

    #[test]
    fn test_parse_trademark_class_range() {
        let body = json!({
            "applicant_name": "Nimbus Labs",
            "brand_name": "Nimbus",
            "class_number": 46,
            "description": "Cloud software and consulting services",
            "contact_phone": "9123456780"
        });
        let err = ServiceDetails::parse(ServiceType::Trademark, body).unwrap_err();
        assert!(matches!(err, DetailsError::Invalid(_)));
    }

    #[test]
    fn test_parse_wrong_shape_is_malformed() {
        let err = ServiceDetails::parse(ServiceType::TaxPlanning, json!({"full_name": 3})).unwrap_err();
        assert!(matches!(err, DetailsError::Malformed(_)));
    }
}
