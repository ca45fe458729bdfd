use serde::{Deserialize, Serialize};

/// Role whose accounts may not upload attachments.
pub const RESTRICTED_ROLE: &str = "restricted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Decision {
    /// Wire value `"1"`.
    Approved,
    /// Wire value `"0"`.
    Rejected,
    /// Anything else the service reports.
    Pending(String),
}

impl Decision {
    /// Approved and Rejected are terminal: the conversation is over.
    pub fn is_final(&self) -> bool {
        matches!(self, Decision::Approved | Decision::Rejected)
    }
}

impl From<String> for Decision {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "1" => Decision::Approved,
            "0" => Decision::Rejected,
            _ => Decision::Pending(raw),
        }
    }
}

impl From<Decision> for String {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Approved => "1".into(),
            Decision::Rejected => "0".into(),
            Decision::Pending(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub decision: Option<Decision>,
}

impl AccountStatus {
    pub fn is_concluded(&self) -> bool {
        self.decision.as_ref().is_some_and(Decision::is_final)
    }

    pub fn is_restricted(&self) -> bool {
        self.role.as_deref() == Some(RESTRICTED_ROLE)
    }
}
