use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    NewWaitlistEntry, RepositoryError, ServiceResult, Validate, WaitlistOutcome, WaitlistRequest,
};
use crate::observability::Metrics;
use crate::repositories::WaitlistRepository;

/// Service for waitlist signups
pub struct WaitlistService {
    repository: Arc<dyn WaitlistRepository>,
    metrics: Arc<Metrics>,
}

impl WaitlistService {
    pub fn new(repository: Arc<dyn WaitlistRepository>, metrics: Arc<Metrics>) -> Self {
        Self {
            repository,
            metrics,
        }
    }

    /// Add an email to the waitlist. Signing up twice is not an error.
    #[instrument(skip(self, request))]
    pub async fn join(&self, request: WaitlistRequest) -> ServiceResult<WaitlistOutcome> {
        request.validate()?;
        let entry = NewWaitlistEntry::from(request);

        let outcome = match self.repository.insert(entry).await {
            Ok(()) => WaitlistOutcome::Joined,
            Err(RepositoryError::UniqueViolation { .. }) => WaitlistOutcome::AlreadyJoined,
            Err(e) => {
                self.metrics.record_waitlist_signup("error");
                crate::error_with_trace!(error = %e, "Waitlist signup failed");
                return Err(e.into());
            }
        };

        self.metrics.record_waitlist_signup(outcome.as_label());
        crate::info_with_trace!(outcome = outcome.as_label(), "Waitlist signup recorded");

        Ok(outcome)
    }
}
