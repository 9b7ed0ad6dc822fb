//! Likelihood of observed selections under a family of model mixtures.
//!
//! A mixture member blends a reference model `G_B` and a hypothesis model
//! `G_H` with weight `epsilon`:
//!
//! ```text
//! O       = epsilon * G_H + (1 - epsilon) * G_B
//! G_eps   = O / rowsum(O)
//! log L   = sum_d ln( G_eps[d] . C[d] )
//! ```
//!
//! where `C` is the one-hot selection matrix. [`prob_members`] turns the
//! per-member log likelihoods into a posterior over the family.

use ndarray::{ArrayView2, Axis};

use crate::core::domain::Epsilons;
use crate::error::{ReportError, ReportResult};

/// Tolerance on `sum(prior) == 1`.
const PRIOR_SUM_TOLERANCE: f64 = 1e-8;

/// Log likelihood of the observed selections under the mixture member
/// with weight `epsilon`.
///
/// # Arguments
///
/// * `epsilon` - mixture weight; `0.0` is the pure reference model
/// * `reference` - `N_D x N_C` reference probabilities
/// * `hypothesis` - `N_D x N_C` hypothesis probabilities
/// * `selections` - `N_D x N_C` one-hot matrix of observed choices
///
/// # Errors
///
/// * [`ReportError::Validation`] if `epsilon` is outside `[0, 1]` or the
///   matrix shapes differ.
/// * [`ReportError::Numerical`] if a decision's blended odds sum to zero or
///   the probability of an observed choice is not strictly positive.
pub fn log_likelihood_member(
    epsilon: f64,
    reference: ArrayView2<f64>,
    hypothesis: ArrayView2<f64>,
    selections: ArrayView2<f64>,
) -> ReportResult<f64> {
    if !(0.0..=1.0).contains(&epsilon) {
        return Err(ReportError::validation(format!(
            "epsilon must be in [0, 1], got {}",
            epsilon
        )));
    }
    if reference.dim() != hypothesis.dim() || reference.dim() != selections.dim() {
        return Err(ReportError::validation(format!(
            "matrix shapes must match: reference {:?}, hypothesis {:?}, selections {:?}",
            reference.dim(),
            hypothesis.dim(),
            selections.dim()
        )));
    }

    let odds = &hypothesis * epsilon + &reference * (1.0 - epsilon);
    let row_sums = odds.sum_axis(Axis(1));
    let selected_odds = (&odds * &selections).sum_axis(Axis(1));

    let mut log_likelihood = 0.0;
    for (row, (&row_sum, &selected)) in row_sums.iter().zip(selected_odds.iter()).enumerate() {
        if !(row_sum > 0.0) {
            return Err(ReportError::numerical(format!(
                "blended odds of decision row {} sum to {} at epsilon {}",
                row, row_sum, epsilon
            )));
        }
        let probability = selected / row_sum;
        if !(probability > 0.0) || !probability.is_finite() {
            return Err(ReportError::numerical(format!(
                "observed choice of decision row {} has probability {} at epsilon {}",
                row, probability, epsilon
            )));
        }
        log_likelihood += probability.ln();
    }

    Ok(log_likelihood)
}

fn validate_prior(prior: &[f64], members: usize) -> ReportResult<()> {
    if prior.len() != members {
        return Err(ReportError::validation(format!(
            "prior length {} must match epsilon count {}",
            prior.len(),
            members
        )));
    }
    if let Some(bad) = prior.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(ReportError::validation(format!(
            "prior probabilities must be finite and non-negative, got {}",
            bad
        )));
    }
    let total: f64 = prior.iter().sum();
    if (total - 1.0).abs() > PRIOR_SUM_TOLERANCE {
        return Err(ReportError::validation(format!(
            "prior probabilities must sum to 1, got {}",
            total
        )));
    }
    Ok(())
}

/// Posterior probability of each mixture member given the observed
/// selections.
///
/// For each `epsilon_i` computes `L_i = ln(prior_i) + log L(epsilon_i)`,
/// subtracts `max(L)` before exponentiating, and normalizes. The result
/// sums to one and is ordered like `epsilons`.
///
/// `prior` defaults to uniform when `None`.
///
/// # Errors
///
/// * [`ReportError::Validation`] for a prior of the wrong length, with
///   negative entries, or not summing to one; and for any error raised by
///   [`log_likelihood_member`].
/// * [`ReportError::Numerical`] when every member has zero prior mass or a
///   likelihood evaluation fails numerically.
pub fn prob_members(
    reference: ArrayView2<f64>,
    hypothesis: ArrayView2<f64>,
    selections: ArrayView2<f64>,
    epsilons: &Epsilons,
    prior: Option<&[f64]>,
) -> ReportResult<Vec<f64>> {
    let members = epsilons.len();
    let uniform;
    let prior = match prior {
        Some(p) => {
            validate_prior(p, members)?;
            p
        }
        None => {
            uniform = vec![1.0 / members as f64; members];
            uniform.as_slice()
        }
    };

    let log_posteriors = epsilons
        .iter()
        .zip(prior)
        .map(|(epsilon, p)| {
            let ll = log_likelihood_member(epsilon, reference, hypothesis, selections)?;
            Ok(p.ln() + ll)
        })
        .collect::<ReportResult<Vec<f64>>>()?;

    let max = log_posteriors.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Err(ReportError::numerical(
            "no mixture member has positive posterior mass",
        ));
    }

    let ratios: Vec<f64> = log_posteriors.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = ratios.iter().sum();

    Ok(ratios.into_iter().map(|r| r / total).collect())
}
