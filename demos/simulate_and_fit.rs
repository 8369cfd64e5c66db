use beantrack::pipeline::MAX_FIT_DELAY;
use beantrack::position::TrackedObject;
use beantrack::simulation::{
    simulate, BeanModel, DEFAULT_CANVAS, DELAY_LOC, DELAY_SCALE, DELAY_SHAPE, DISP_LOC,
    DISP_SCALE, MAX_DELAY, MAX_DISP,
};
use beantrack::stats::delay::{delay_seconds, jumps, min_delay_frames, DEFAULT_MIN_DELAY};
use beantrack::stats::distributions::{Exponential, InverseGamma};
use beantrack::stats::msd::pooled_msd;

const BEANS: usize = 20;
const DURATION: f64 = 2.0 * 3600.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let model = BeanModel::paper()?;
    let data = simulate(BEANS, DURATION, &DEFAULT_CANVAS, &model, 42)?;
    data.validate()?;

    let fps = data.canvas.fps;
    let min_frames = min_delay_frames(DEFAULT_MIN_DELAY, fps);
    let mut delays = vec![0.0];
    let mut displacements = Vec::new();
    for o in &data.objects {
        // every recorded move is a jump, so any positive threshold works
        for j in jumps(&o.x, &o.y, 1e-6, min_frames) {
            let d = delay_seconds(j.delay_frames, fps);
            if (DEFAULT_MIN_DELAY..=MAX_FIT_DELAY).contains(&d) {
                delays.push(d);
            }
            displacements.push(j.displacement);
        }
    }

    let delay_fit = InverseGamma::fit(&delays)?;
    let displacement_fit = Exponential::fit(&displacements)?;
    println!(
        "delays:        a={:.4} loc={:.4} scale={:.4} (model a={} loc={} scale={})",
        delay_fit.shape, delay_fit.loc, delay_fit.scale, DELAY_SHAPE, DELAY_LOC, DELAY_SCALE
    );
    println!(
        "displacements: loc={:.4} scale={:.4} (model loc={} scale={})",
        displacement_fit.loc, displacement_fit.scale, DISP_LOC, DISP_SCALE
    );

    let objects = data.objects.iter().collect::<Vec<&TrackedObject>>();
    let curve = pooled_msd(&objects).to_seconds(fps);
    let (short, _) = curve.limit(600.0);
    let fit = short.log_fit()?;
    println!("MSD slope over the first 10 minutes: {:.3}", fit.slope);

    // the refitted model feeds a second run
    let refitted = BeanModel::paper()?
        .delay(delay_fit, MAX_DELAY)
        .displacement(displacement_fit, MAX_DISP);
    let again = simulate(BEANS, DURATION, &DEFAULT_CANVAS, &refitted, 43)?;
    let objects = again.objects.iter().collect::<Vec<&TrackedObject>>();
    let fit = pooled_msd(&objects).to_seconds(fps).limit(600.0).0.log_fit()?;
    println!("MSD slope of the refitted model: {:.3}", fit.slope);
    Ok(())
}
