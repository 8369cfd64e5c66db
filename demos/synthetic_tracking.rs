use beantrack::position::Canvas;
use beantrack::stats::displacement::displacements;
use beantrack::test_stuff::{moving_discs, ScriptedSource};
use beantrack::tracking::assignment::AssignmentKind;
use beantrack::tracking::options::TrackerOptions;
use beantrack::tracking::tracker::track_source;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    // three bright discs on a 320x240 frame, one of them resting
    let frames = moving_discs(
        320,
        240,
        &[((40, 40), (3, 1)), ((280, 60), (-2, 2)), ((160, 200), (0, 0))],
        40,
    );
    let mut source = ScriptedSource::new(frames, 10.0);
    let opts = TrackerOptions::default()
        .expected_objects(3)
        .assignment(AssignmentKind::Optimal)
        .max_step(10.0);

    let mut merged = 0;
    let data = track_source(
        &mut source,
        opts,
        Some(Canvas::new(32.0, 24.0, "cm", 10.0)),
        |_, report| {
            merged += report.detected.len() - report.merged.len();
            Ok(())
        },
    )?;

    println!(
        "{} objects over {} frames, {} centroids merged",
        data.objects.len(),
        data.frame_count(),
        merged
    );
    for (i, o) in data.objects.iter().enumerate() {
        let steps = displacements(&o.x, &o.y);
        let mean = steps.iter().sum::<f64>() / steps.len().max(1) as f64;
        println!(
            "object {}: starts at ({:.2}, {:.2}) {}, mean step {:.3} {}",
            i, o.x[0], o.y[0], data.canvas.units, mean, data.canvas.units
        );
    }
    Ok(())
}
