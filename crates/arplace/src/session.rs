//! Session start-up: request, bind to the renderer, mount the output surface.

use arplace_core::{
    ArError, ArOptions, OutputSurface, Renderer, Result, SurfaceContainer, XrSession, XrSystem,
};

/// A started session and the output surface mounted for it.
#[derive(Debug)]
pub struct StartedSession<S> {
    /// The tracking session.
    pub session: S,
    /// Surface appended to the container; detach it if start-up is abandoned.
    pub surface: OutputSurface,
}

/// Requests an immersive session and wires it to `renderer`.
///
/// The output surface is created up front but only mounted into `container`
/// once the session exists and its base layer is bound, so a failed start
/// leaves the container untouched. Failures are logged and not retried.
pub async fn start_session<X, R, C>(
    system: &X,
    renderer: &mut R,
    container: &mut C,
    options: &ArOptions,
) -> Result<StartedSession<X::Session>>
where
    X: XrSystem,
    R: Renderer,
    C: SurfaceContainer,
{
    let surface = renderer.create_output_surface();

    let session = match system.request_session(options.session_mode).await {
        Ok(session) => session,
        Err(e) => {
            log::warn!(
                "Session request for '{}' rejected: {e}",
                options.session_mode.as_str()
            );
            return Err(match e {
                ArError::SessionRequestFailed(_) => e,
                other => ArError::SessionRequestFailed(other.to_string()),
            });
        }
    };

    if let Err(e) = session.set_base_layer(renderer.context()) {
        log::warn!("Failed to create base layer for session {:?}: {e}", session.id());
        session.end();
        return Err(ArError::SessionRequestFailed(format!(
            "base layer creation failed: {e}"
        )));
    }

    container.append(surface.clone());

    renderer.configure(&options.renderer, options.reference_space_type);
    renderer.bind_session(session.id());

    log::info!(
        "Started '{}' session {:?}",
        options.session_mode.as_str(),
        session.id()
    );
    Ok(StartedSession { session, surface })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingRenderer, RenderCall, SimContainer, SimSystem};
    use arplace_core::ReferenceSpaceType;
    use pollster::FutureExt;

    #[test]
    fn test_start_mounts_and_configures() {
        let system = SimSystem::new();
        let mut renderer = RecordingRenderer::new();
        let mut container = SimContainer::new();
        let options = ArOptions::default();

        let started = start_session(&system, &mut renderer, &mut container, &options)
            .block_on()
            .expect("session should start");
        let session = started.session;

        assert_eq!(container.mounted(), [started.surface]);
        assert_eq!(
            renderer.calls(),
            [
                RenderCall::Configure {
                    config: options.renderer,
                    reference_space: ReferenceSpaceType::Local,
                },
                RenderCall::BindSession(session.id()),
            ]
        );
        assert_eq!(session.base_layer(), Some(renderer.context()));
    }

    #[test]
    fn test_configure_forwards_reference_space_type() {
        let system = SimSystem::new();
        let mut renderer = RecordingRenderer::new();
        let mut container = SimContainer::new();
        let options = ArOptions::default().with_reference_space_type(ReferenceSpaceType::LocalFloor);

        start_session(&system, &mut renderer, &mut container, &options)
            .block_on()
            .expect("session should start");

        assert_eq!(renderer.reference_space_type(), Some(ReferenceSpaceType::LocalFloor));
        assert_eq!(renderer.config(), Some(options.renderer));
    }

    #[test]
    fn test_rejected_request_mounts_nothing() {
        let system = SimSystem::new().rejecting_sessions("device busy");
        let mut renderer = RecordingRenderer::new();
        let mut container = SimContainer::new();

        let result =
            start_session(&system, &mut renderer, &mut container, &ArOptions::default()).block_on();

        assert!(matches!(result, Err(ArError::SessionRequestFailed(ref r)) if r.contains("device busy")));
        assert!(container.mounted().is_empty());
        assert_eq!(renderer.config(), None);
    }

    #[test]
    fn test_base_layer_failure_ends_session() {
        let system = SimSystem::new().failing_base_layer("context lost");
        let mut renderer = RecordingRenderer::new();
        let mut container = SimContainer::new();

        let result =
            start_session(&system, &mut renderer, &mut container, &ArOptions::default()).block_on();

        assert!(matches!(result, Err(ArError::SessionRequestFailed(_))));
        assert!(container.mounted().is_empty());
        let session = system.last_session().expect("session was created");
        assert!(!session.is_active());
    }
}
