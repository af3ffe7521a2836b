//! Reference space acquisition.

use arplace_core::{ArError, ReferenceSpace, ReferenceSpaceType, Result, XrSession};

/// Obtains the session's reference space once and hands out the same value afterwards.
#[derive(Debug, Clone)]
pub struct ReferenceSpaceProvider {
    kind: ReferenceSpaceType,
    space: Option<ReferenceSpace>,
}

impl ReferenceSpaceProvider {
    /// Creates a provider for the given space type.
    pub fn new(kind: ReferenceSpaceType) -> Self {
        Self { kind, space: None }
    }

    /// Returns the space type this provider requests.
    pub fn kind(&self) -> ReferenceSpaceType {
        self.kind
    }

    /// Returns the space if it has been acquired.
    pub fn get(&self) -> Option<&ReferenceSpace> {
        self.space.as_ref()
    }

    /// Requests the reference space from `session`, or returns the one already held.
    ///
    /// A failure is fatal to the session; tearing it down is the caller's job.
    pub async fn acquire<S: XrSession>(&mut self, session: &S) -> Result<ReferenceSpace> {
        if let Some(space) = &self.space {
            return Ok(space.clone());
        }
        let space = session
            .request_reference_space(self.kind)
            .await
            .map_err(|e| {
                log::warn!(
                    "Reference space '{}' unavailable for session {:?}: {e}",
                    self.kind.as_str(),
                    session.id()
                );
                match e {
                    ArError::ReferenceSpaceFailed(_) => e,
                    other => ArError::ReferenceSpaceFailed(other.to_string()),
                }
            })?;
        log::debug!("Acquired '{}' reference space {:?}", self.kind.as_str(), space.handle());
        self.space = Some(space.clone());
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimSystem;
    use arplace_core::{SessionMode, XrSystem};
    use pollster::FutureExt;

    #[test]
    fn test_acquire_once() {
        let system = SimSystem::new();
        let session = system
            .request_session(SessionMode::ImmersiveAr)
            .block_on()
            .expect("session");
        let mut provider = ReferenceSpaceProvider::new(ReferenceSpaceType::Local);

        let first = provider.acquire(&session).block_on().expect("space");
        let second = provider.acquire(&session).block_on().expect("space");

        assert_eq!(first, second);
        assert_eq!(first.kind(), ReferenceSpaceType::Local);
        assert_eq!(session.reference_space_requests(), 1);
    }

    #[test]
    fn test_failure_is_reported() {
        let system = SimSystem::new().failing_reference_space("tracking not ready");
        let session = system
            .request_session(SessionMode::ImmersiveAr)
            .block_on()
            .expect("session");
        let mut provider = ReferenceSpaceProvider::new(ReferenceSpaceType::Local);

        let result = provider.acquire(&session).block_on();
        assert!(matches!(result, Err(ArError::ReferenceSpaceFailed(_))));
        assert!(provider.get().is_none());
    }
}
