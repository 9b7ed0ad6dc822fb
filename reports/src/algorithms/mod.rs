//! Statistical core: matrix construction, mixture likelihoods, and mixture
//! member predictions.

pub mod likelihood;
pub mod matrices;
pub mod mixtures;


pub use likelihood::{log_likelihood_member, prob_members};
pub use matrices::{build_model_matrices, ModelMatrices};
pub use mixtures::{compute_mixtures, compute_support, MixtureRow};
