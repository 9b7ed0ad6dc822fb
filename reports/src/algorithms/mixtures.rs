//! Mixture member predictions.
//!
//! Where [`crate::algorithms::likelihood`] scores whole mixture members,
//! this module materializes them: every `(decision, choice)` pair gets its
//! blended probability under every requested epsilon.

use std::collections::HashMap;

use crate::algorithms::likelihood::prob_members;
use crate::algorithms::matrices::build_model_matrices;
use crate::core::domain::{Epsilons, Prediction, Selection};
use crate::error::{ReportError, ReportResult};

/// Probability of one choice under one mixture member.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureRow<C> {
    pub decision: String,
    pub choice: String,
    pub epsilon: f64,
    /// Position of `epsilon` in the sequence the row was generated from.
    pub member: usize,
    pub probability: f64,
    /// Context carried over from the hypothesis row.
    pub context: C,
}

/// Blends hypothesis and reference predictions at every epsilon.
///
/// Rows are inner-joined on `(decision, choice)`; pairs present in only one
/// table are dropped. For each `(decision, epsilon)` group the blended odds
/// `epsilon * h + (1 - epsilon) * r` are normalized by the group sum, so
/// every member is a proper distribution over the decision's choices.
///
/// Output is ordered by hypothesis row, then by member.
///
/// # Errors
///
/// * [`ReportError::Validation`] if the reference table repeats a pair.
/// * [`ReportError::Numerical`] if a group's odds sum to zero or less.
pub fn compute_mixtures<C: Clone, D>(
    hypothesis: &[Prediction<C>],
    reference: &[Prediction<D>],
    epsilons: &Epsilons,
) -> ReportResult<Vec<MixtureRow<C>>> {
    let mut reference_probs: HashMap<(&str, &str), f64> = HashMap::with_capacity(reference.len());
    for row in reference {
        if reference_probs.insert(row.key(), row.probability).is_some() {
            return Err(ReportError::validation(format!(
                "reference predictions contain duplicate pair ({}, {})",
                row.decision, row.choice
            )));
        }
    }

    let joined: Vec<(&Prediction<C>, f64)> = hypothesis
        .iter()
        .filter_map(|h| reference_probs.get(&h.key()).map(|r| (h, *r)))
        .collect();

    let blend = |epsilon: f64, h: f64, r: f64| epsilon * h + (1.0 - epsilon) * r;

    let mut group_sums: HashMap<(&str, usize), f64> = HashMap::new();
    for (h, r) in &joined {
        for (member, epsilon) in epsilons.iter().enumerate() {
            *group_sums.entry((h.decision.as_str(), member)).or_insert(0.0) +=
                blend(epsilon, h.probability, *r);
        }
    }

    if let Some(((decision, member), sum)) = group_sums.iter().find(|(_, sum)| !(**sum > 0.0)) {
        return Err(ReportError::numerical(format!(
            "mixture odds of decision {} at epsilon {} sum to {}",
            decision,
            epsilons.as_slice()[*member],
            sum
        )));
    }

    let mut rows = Vec::with_capacity(joined.len() * epsilons.len());
    for (h, r) in &joined {
        for (member, epsilon) in epsilons.iter().enumerate() {
            let total = group_sums[&(h.decision.as_str(), member)];
            rows.push(MixtureRow {
                decision: h.decision.clone(),
                choice: h.choice.clone(),
                epsilon,
                member,
                probability: blend(epsilon, h.probability, *r) / total,
                context: h.context.clone(),
            });
        }
    }

    Ok(rows)
}

/// Posterior support over `epsilons` given an actuals dataset.
///
/// Composes [`build_model_matrices`] and [`prob_members`].
pub fn compute_support<C, D>(
    hypothesis: &[Prediction<C>],
    reference: &[Prediction<D>],
    selections: &[Selection],
    epsilons: &Epsilons,
    prior: Option<&[f64]>,
) -> ReportResult<Vec<f64>> {
    let matrices = build_model_matrices(hypothesis, reference, selections)?;
    prob_members(
        matrices.reference.view(),
        matrices.hypothesis.view(),
        matrices.selections.view(),
        epsilons,
        prior,
    )
}
