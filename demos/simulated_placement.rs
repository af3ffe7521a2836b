//! Simulated placement demo.
//!
//! Drives the full session loop against the scripted host: a few frames of
//! tracking, a short tracking dropout, a screen tap, and two hit tests that
//! resolve out of order.
//!
//! Run with: `RUST_LOG=debug cargo run --example simulated_placement`

use arplace::sim::{RecordingRenderer, SimContainer, SimFrame, SimSystem};
use arplace::*;

fn main() -> Result<()> {
    init_logging();

    let system = SimSystem::new();
    let mut container = SimContainer::new();
    let options = ArOptions::default().with_model(ModelDescriptor {
        material: Material::Flat(Vec3::new(0.9, 0.4, 0.1)),
        ..ModelDescriptor::default()
    });
    let experience = launch_blocking(
        Some(&system),
        RecordingRenderer::new(),
        &mut container,
        options,
    )?;
    let session = system
        .last_session()
        .ok_or(ArError::SessionEnded)?;

    // Viewer walks forward while tracking; one frame drops out.
    let mut time = 0.0;
    for step in 0..6u8 {
        let position = Vec3::new(0.0, 1.6, -0.1 * f32::from(step));
        let frame = if step == 3 {
            SimFrame::tracking_lost()
        } else {
            SimFrame::mono(position)
        };
        session.run_frame(time, &frame);
        time += 16.7;
    }

    // The user taps the screen for two frames.
    let tap = SpaceHandle(1);
    session.set_input_sources(vec![InputSource::screen(tap)]);
    let tap_pose = Pose {
        transform: Mat4::IDENTITY,
    };
    for _ in 0..2 {
        let frame = SimFrame::mono(Vec3::new(0.0, 1.6, -0.5)).with_input_pose(tap, tap_pose);
        session.run_frame(time, &frame);
        time += 16.7;
    }

    // The host answers the second request first.
    session.resolve_hit_test(
        1,
        Ok(vec![HitTestResult {
            hit_matrix: Mat4::from_translation(Vec3::new(0.4, 0.0, -1.8)),
        }]),
    );
    session.resolve_hit_test(
        0,
        Ok(vec![HitTestResult {
            hit_matrix: Mat4::from_translation(Vec3::new(0.2, 0.0, -1.5)),
        }]),
    );
    session.set_input_sources(Vec::new());
    session.run_frame(time, &SimFrame::mono(Vec3::new(0.0, 1.6, -0.5)));

    if let Some(object) = experience.placed_object() {
        println!(
            "object {:?} at {} yaw {:.1} deg, material {:?}",
            object.id,
            object.transform.translation,
            object.transform.yaw().to_degrees(),
            object.model.material
        );
    }
    println!("{:#?}", experience.stats());

    session.end();
    experience.handle_session_end();
    println!("loop state after end: {:?}", experience.state());
    Ok(())
}
