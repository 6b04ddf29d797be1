//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::data::{linspace, SineWave};
#[doc(no_inline)]
pub use crate::optim::{Adam, AdamParams};
#[doc(no_inline)]
pub use crate::process::gaussian::kernel::{Kernel, SpectralMixtureKernel};
#[doc(no_inline)]
pub use crate::process::gaussian::{
    GaussianProcess, GaussianProcessError, GaussianProcessParams,
    GaussianProcessPrediction, JitterParams, MeanFunction, NoiseModel,
};
#[doc(no_inline)]
pub use crate::process::training::{TrainError, TrainParams, TrainReport};
#[doc(no_inline)]
pub use crate::process::{Mode, RandomProcess, RandomProcessMle};
