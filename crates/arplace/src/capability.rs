//! Capability probing.
//!
//! Runs before any resource is allocated. Nothing here returns an error: every
//! failure is folded into a [`Support`] verdict and logged.

use std::fmt;

use arplace_core::{SessionMode, XrSystem};

/// Outcome of probing the host for immersive-AR support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support {
    /// The host can run the requested session with hit-testing.
    Supported,
    /// The host exposes no tracking interface at all.
    NoXrInterface,
    /// Sessions on this host cannot hit-test.
    NoHitTest,
    /// The host answered that the mode is not supported.
    ModeUnsupported(SessionMode),
    /// The support query rejected.
    QueryFailed(String),
}

impl Support {
    /// Returns true if a session may be requested.
    pub fn is_supported(&self) -> bool {
        matches!(self, Support::Supported)
    }
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Support::Supported => write!(f, "supported"),
            Support::NoXrInterface => write!(f, "no XR interface available"),
            Support::NoHitTest => write!(f, "hit testing not available"),
            Support::ModeUnsupported(mode) => write!(f, "session mode '{}' unsupported", mode.as_str()),
            Support::QueryFailed(reason) => write!(f, "support query failed: {reason}"),
        }
    }
}

/// Probes the host and reports why a session cannot be started, if it cannot.
pub async fn probe<X: XrSystem>(system: Option<&X>, mode: SessionMode) -> Support {
    let Some(system) = system else {
        log::info!("Device not supported: {}", Support::NoXrInterface);
        return Support::NoXrInterface;
    };
    if !system.supports_hit_test() {
        log::info!("Device not supported: {}", Support::NoHitTest);
        return Support::NoHitTest;
    }

    let support = match system.is_session_supported(mode).await {
        Ok(true) => Support::Supported,
        Ok(false) => Support::ModeUnsupported(mode),
        Err(e) => Support::QueryFailed(e.to_string()),
    };
    if !support.is_supported() {
        log::info!("Device not supported: {support}");
    }
    support
}

/// Returns whether an immersive session of `mode` can be started on this host.
pub async fn check_support<X: XrSystem>(system: Option<&X>, mode: SessionMode) -> bool {
    probe(system, mode).await.is_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimSystem;
    use pollster::FutureExt;

    #[test]
    fn test_supported() {
        let system = SimSystem::new();
        assert!(check_support(Some(&system), SessionMode::ImmersiveAr).block_on());
        assert_eq!(system.support_queries(), 1);
    }

    #[test]
    fn test_absent_interface() {
        let support = probe::<SimSystem>(None, SessionMode::ImmersiveAr).block_on();
        assert_eq!(support, Support::NoXrInterface);
    }

    #[test]
    fn test_missing_hit_test_skips_query() {
        let system = SimSystem::new().without_hit_test();
        let support = probe(Some(&system), SessionMode::ImmersiveAr).block_on();
        assert_eq!(support, Support::NoHitTest);
        assert_eq!(system.support_queries(), 0);
    }

    #[test]
    fn test_rejected_query_is_unsupported() {
        let system = SimSystem::new().rejecting_support("permission policy");
        let support = probe(Some(&system), SessionMode::ImmersiveAr).block_on();
        assert!(matches!(support, Support::QueryFailed(ref r) if r.contains("permission policy")));
        assert!(!support.is_supported());
    }

    #[test]
    fn test_false_answer_is_unsupported() {
        let system = SimSystem::new().unsupported();
        let support = probe(Some(&system), SessionMode::ImmersiveAr).block_on();
        assert_eq!(support, Support::ModeUnsupported(SessionMode::ImmersiveAr));
    }
}
