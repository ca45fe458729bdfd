use crate::client::ChatService;
use crate::core::credentials::CredentialStore;
use crate::core::status::AccountStatus;

/// What the account status allows for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    pub input_enabled: bool,
    pub uploads_enabled: bool,
}

impl GateOutcome {
    pub const OPEN: GateOutcome = GateOutcome {
        input_enabled: true,
        uploads_enabled: true,
    };

    pub fn from_status(status: &AccountStatus) -> Self {
        Self {
            input_enabled: !status.is_concluded(),
            uploads_enabled: !status.is_restricted(),
        }
    }
}

/// Ask the service for the account status once. Any failure, including a
/// missing credential, leaves everything enabled.
pub async fn check_status(
    service: &dyn ChatService,
    credentials: &dyn CredentialStore,
) -> GateOutcome {
    let Some(token) = credentials.get() else {
        tracing::debug!("no stored credential; skipping account status check");
        return GateOutcome::OPEN;
    };

    match service.account_status(&token).await {
        Ok(status) => {
            let outcome = GateOutcome::from_status(&status);
            tracing::debug!(?status, ?outcome, "account status");
            outcome
        }
        Err(e) => {
            tracing::warn!("account status check failed: {e}");
            GateOutcome::OPEN
        }
    }
}
