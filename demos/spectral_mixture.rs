//! Fit a spectral mixture GP to a noisy sine wave and extrapolate it.
//!
//! Prints `x  mean  lower  upper` rows for the predictive band over
//! `[0, 5]`; set `RUST_LOG=info` to see the training loss.
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use spectral_gp::prelude::*;

const N_MIXTURES: usize = 4;

pub fn main() {
    env_logger::builder().init();
    let mut rng = Xoshiro256Plus::seed_from_u64(0xABCD);

    let smoke_test = std::env::var("CI").is_ok();
    let train_params = TrainParams::default()
        .with_max_iters(if smoke_test { 2 } else { 100 })
        .with_learning_rate(0.1);

    let (x, y) = SineWave::default().generate(&mut rng);

    let kernel = SpectralMixtureKernel::initialize_from_data(
        N_MIXTURES, &x, &y, &mut rng,
    )
    .expect("Data is valid so this should succeed");
    let params = GaussianProcessParams::default();
    let gp = GaussianProcess::train(kernel, x, y, params)
        .expect("Data is valid so this should succeed");

    let (gp, report) = gp
        .fit(&train_params)
        .expect("Training should not diverge at this learning rate");
    eprintln!(
        "trained {} iterations, loss {:?} -> {:?}",
        report.iterations,
        report.initial_loss(),
        report.final_loss()
    );
    let theta = gp.parameters();
    for (name, value) in gp.parameter_names().iter().zip(theta.iter()) {
        eprintln!("{name} = {value:.4}");
    }

    let xs = linspace(0.0, 5.0, 51);
    let prediction = gp
        .predict(&xs)
        .expect("Model is in eval mode after training");
    let (lower, upper) = prediction.confidence_region();

    println!("x\tmean\tlower\tupper");
    for i in 0..xs.nrows() {
        println!(
            "{:.2}\t{:.6}\t{:.6}\t{:.6}",
            xs[i],
            prediction.mean()[i],
            lower[i],
            upper[i]
        );
    }
}
