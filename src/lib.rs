//! Gaussian process regression with spectral mixture kernels.
//!
//! A spectral mixture kernel models the spectral density of a stationary
//! process as a mixture of Gaussians, which lets a Gaussian process pick up
//! periodic and quasi-periodic structure and extrapolate it. This crate
//! provides the kernel (with analytic gradients), exact Cholesky-based
//! inference, and a type-II maximum likelihood training loop.
//!
//! # Example
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use spectral_gp::data::{linspace, SineWave};
//! use spectral_gp::process::gaussian::kernel::SpectralMixtureKernel;
//! use spectral_gp::process::gaussian::{
//!     GaussianProcess, GaussianProcessParams,
//! };
//! use spectral_gp::process::training::TrainParams;
//! use spectral_gp::process::RandomProcess;
//!
//! let mut rng = SmallRng::seed_from_u64(0xABCD);
//! let (x, y) = SineWave::default().generate(&mut rng);
//!
//! let kernel =
//!     SpectralMixtureKernel::initialize_from_data(4, &x, &y, &mut rng)
//!         .expect("inputs are valid");
//! let params = GaussianProcessParams::default();
//! let gp = GaussianProcess::train(kernel, x, y, params)
//!     .expect("inputs are valid");
//!
//! let (gp, report) = gp
//!     .fit(&TrainParams::default())
//!     .expect("training succeeds");
//! println!("final loss: {:?}", report.final_loss());
//!
//! let prediction = gp
//!     .predict(&linspace(0.0, 5.0, 51))
//!     .expect("model is in eval mode");
//! let (lower, upper) = prediction.confidence_region();
//! ```
#![warn(missing_docs)]

pub mod consts;
pub mod data;
pub mod optim;
pub mod prelude;
pub mod process;
