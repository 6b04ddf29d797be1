use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use spectral_gp::prelude::*;

fn sine_data(seed: u64) -> (DMatrix<f64>, DVector<f64>, Xoshiro256Plus) {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let (x, y) = SineWave::default().generate(&mut rng);
    (x, y, rng)
}

#[test]
fn training_lowers_the_loss() {
    let (x, y, mut rng) = sine_data(0x1234);
    let kernel =
        SpectralMixtureKernel::initialize_from_data(4, &x, &y, &mut rng)
            .unwrap();
    let params = GaussianProcessParams::default();
    let gp = GaussianProcess::train(kernel, x, y, params).unwrap();
    assert!(gp.ln_m().is_finite());

    let train_params = TrainParams::default()
        .with_max_iters(100)
        .with_learning_rate(0.1);
    let (gp, report) = gp.fit(&train_params).unwrap();

    assert_eq!(report.iterations, 100);
    assert!(report.losses.iter().all(|l| l.is_finite()));
    assert!(report.final_loss().unwrap() < report.initial_loss().unwrap());
    assert_eq!(gp.mode(), Mode::Eval);
    assert!(gp.ln_m().is_finite());
}

#[test]
fn lbfgs_raises_the_marginal_likelihood() {
    let (x, y, mut rng) = sine_data(0x1234);
    let kernel =
        SpectralMixtureKernel::initialize_from_data(4, &x, &y, &mut rng)
            .unwrap();
    let gp =
        GaussianProcess::train(kernel, x, y, GaussianProcessParams::default())
            .unwrap();
    let ln_m_start = gp.ln_m();

    let gp = gp.optimize(100).unwrap();

    assert_eq!(gp.mode(), Mode::Eval);
    assert!(gp.ln_m().is_finite());
    assert!(gp.ln_m() > ln_m_start);
    assert!(gp.predict(&linspace(0.0, 5.0, 11)).is_ok());
}

#[test]
fn trained_band_contains_mean() {
    let (x, y, _) = sine_data(0xABCD);
    let kernel =
        SpectralMixtureKernel::initialize_from_periodogram(4, &x, &y).unwrap();
    let params = GaussianProcessParams::default();
    let gp = GaussianProcess::train(kernel, x, y, params).unwrap();
    let (gp, _) = gp.fit(&TrainParams::default().with_max_iters(20)).unwrap();

    let prediction = gp.predict(&linspace(0.0, 5.0, 51)).unwrap();
    let (lower, upper) = prediction.confidence_region();
    let mean = prediction.mean();

    assert_eq!(mean.len(), 51);
    assert!(prediction.variance().iter().all(|v| *v >= 0.0));
    for i in 0..51 {
        assert!(
            lower[i] <= mean[i] && mean[i] <= upper[i],
            "band broken at {i}"
        );
    }
}

#[test]
fn variance_grows_past_the_training_range() {
    let x = linspace(0.0, 1.0, 15);
    let y = SineWave::default().evaluate(&x);
    let kernel =
        SpectralMixtureKernel::one_dimensional(&[1.0], &[0.1], &[0.5])
            .unwrap();
    let params = GaussianProcessParams::default()
        .with_mean(MeanFunction::Zero)
        .with_noise_model(NoiseModel::uniform(1E-2).unwrap());
    let mut gp = GaussianProcess::train(kernel, x, y, params).unwrap();
    gp.set_mode(Mode::Eval);

    let xs = DMatrix::from_column_slice(5, 1, &[1.0, 1.25, 1.5, 2.0, 3.0]);
    let variance = gp.predict(&xs).unwrap().variance();

    for w in variance.as_slice().windows(2) {
        assert!(w[1] >= w[0] - 1E-12, "variance shrank: {variance}");
    }
    assert!(variance[4] > variance[1]);
    assert!((variance[4] - 1.0).abs() < 1E-6);
}

#[test]
fn mean_interpolates_as_noise_vanishes() {
    let x = linspace(0.0, 1.0, 5);
    let y = SineWave::default().evaluate(&x);
    let kernel =
        SpectralMixtureKernel::one_dimensional(&[1.0], &[1.0], &[1.0])
            .unwrap();
    let params = GaussianProcessParams::default()
        .with_mean(MeanFunction::Zero)
        .with_noise_model(NoiseModel::uniform_with_floor(1E-6, 0.0).unwrap());
    let mut gp =
        GaussianProcess::train(kernel, x.clone(), y.clone(), params).unwrap();
    gp.set_mode(Mode::Eval);

    let prediction = gp.predict(&x).unwrap();
    for i in 0..5 {
        assert!((prediction.mean()[i] - y[i]).abs() < 1E-3);
        assert!(prediction.variance()[i] < 1E-5);
    }
}

#[test]
fn kernel_evaluation_is_pure() {
    let (x, y, mut rng) = sine_data(7);
    let kernel =
        SpectralMixtureKernel::initialize_from_data(4, &x, &y, &mut rng)
            .unwrap();
    let k1 = kernel.covariance(&x, &x);
    let k2 = kernel.covariance(&x, &x);
    assert_eq!(k1, k2);

    let (k3, _) = kernel.covariance_with_gradient(&x).unwrap();
    assert!(k1.relative_eq(&k3, 1E-12, 1E-12));
}

#[test]
fn exploding_learning_rate_is_reported() {
    let (x, y, _) = sine_data(0x1234);
    let kernel =
        SpectralMixtureKernel::initialize_from_periodogram(4, &x, &y).unwrap();
    let params = GaussianProcessParams::default();
    let gp = GaussianProcess::train(kernel, x, y, params).unwrap();
    let initial = gp.parameters();

    // The first step throws the constant mean out to about 1e300, so the
    // second evaluation cannot be finite.
    let train_params = TrainParams::default()
        .with_max_iters(10)
        .with_learning_rate(1E300);
    match gp.fit(&train_params) {
        Err(TrainError::Divergence { iteration, last_good }) => {
            assert_eq!(iteration, 2);
            assert_eq!(last_good, initial);
        }
        Err(err) => panic!("expected divergence, got {err}"),
        Ok(_) => panic!("expected divergence"),
    }
}

#[test]
fn predict_requires_eval_mode() {
    let (x, y, _) = sine_data(1);
    let kernel =
        SpectralMixtureKernel::initialize_from_periodogram(2, &x, &y).unwrap();
    let params = GaussianProcessParams::default();
    let mut gp = GaussianProcess::train(kernel, x, y, params).unwrap();
    let xs = linspace(0.0, 1.0, 3);

    assert!(matches!(
        gp.predict(&xs),
        Err(GaussianProcessError::WrongMode { .. })
    ));
    gp.set_mode(Mode::Eval);
    assert!(gp.predict(&xs).is_ok());
}
