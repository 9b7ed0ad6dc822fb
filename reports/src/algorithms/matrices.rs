//! Dense matrix construction from long-form prediction tables.
//!
//! Predictions arrive as `(decision, choice, probability)` rows. The
//! likelihood engine wants them as `decisions x max_choices` matrices that
//! share one column layout, plus a one-hot matrix of the observed
//! selections. Each decision's choices are laid out in sorted order and
//! short rows are zero padded in every matrix, so padding never carries
//! probability mass or a selection.

use ndarray::Array2;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::domain::{Prediction, Selection};
use crate::error::{ReportError, ReportResult};

/// Matrices consumed by [`crate::algorithms::likelihood`].
#[derive(Debug, Clone)]
pub struct ModelMatrices {
    /// Row order: decision keys, sorted.
    pub decisions: Vec<String>,
    /// Column layout per decision: its choice keys, sorted.
    pub choices: Vec<Vec<String>>,
    /// Hypothesis model probabilities (`G_H`).
    pub hypothesis: Array2<f64>,
    /// Reference model probabilities (`G_B`).
    pub reference: Array2<f64>,
    /// One-hot observed selections (`C`).
    pub selections: Array2<f64>,
}

fn key_set<'a, C>(rows: &'a [Prediction<C>], label: &str) -> ReportResult<HashSet<(&'a str, &'a str)>> {
    let mut keys = HashSet::with_capacity(rows.len());
    for row in rows {
        if !keys.insert(row.key()) {
            return Err(ReportError::validation(format!(
                "{} contains duplicate (decision, choice) pair ({}, {})",
                label, row.decision, row.choice
            )));
        }
    }
    Ok(keys)
}

/// Checks that two prediction tables cover the identical set of
/// `(decision, choice)` pairs, each exactly once.
///
/// # Errors
///
/// [`ReportError::Validation`] naming one offending pair when the
/// universes differ or a table repeats a pair.
pub fn validate_same_universe<C, D>(
    hypothesis: &[Prediction<C>],
    reference: &[Prediction<D>],
    label: &str,
) -> ReportResult<()> {
    let hyp_keys = key_set(hypothesis, label)?;
    let ref_keys = key_set(reference, label)?;

    if let Some((d, c)) = hyp_keys.difference(&ref_keys).next() {
        return Err(ReportError::validation(format!(
            "{}: pair ({}, {}) is predicted by the hypothesis model but not the reference model",
            label, d, c
        )));
    }
    if let Some((d, c)) = ref_keys.difference(&hyp_keys).next() {
        return Err(ReportError::validation(format!(
            "{}: pair ({}, {}) is predicted by the reference model but not the hypothesis model",
            label, d, c
        )));
    }
    Ok(())
}

/// Checks that every decision in `predictions` has exactly one selection
/// and that every selection names a predicted pair.
pub fn validate_selections<C>(predictions: &[Prediction<C>], selections: &[Selection]) -> ReportResult<()> {
    let pairs: HashSet<(&str, &str)> = predictions.iter().map(|p| p.key()).collect();
    let mut counts: HashMap<&str, usize> = predictions
        .iter()
        .map(|p| (p.decision.as_str(), 0_usize))
        .collect();

    for sel in selections {
        if !pairs.contains(&(sel.decision.as_str(), sel.choice.as_str())) {
            return Err(ReportError::validation(format!(
                "selection ({}, {}) does not match any predicted (decision, choice) pair",
                sel.decision, sel.choice
            )));
        }
        if let Some(count) = counts.get_mut(sel.decision.as_str()) {
            *count += 1;
        }
    }

    let mut offending: Vec<(&str, usize)> = counts.into_iter().filter(|(_, n)| *n != 1).collect();
    if !offending.is_empty() {
        offending.sort();
        let detail: Vec<String> = offending
            .iter()
            .take(5)
            .map(|(d, n)| format!("{} ({} selections)", d, n))
            .collect();
        return Err(ReportError::validation(format!(
            "each decision must have exactly one selection; {} decisions do not: {}",
            offending.len(),
            detail.join(", ")
        )));
    }
    Ok(())
}

/// Converts hypothesis, reference, and selection tables into dense
/// matrices with a shared per-decision column layout.
///
/// # Errors
///
/// [`ReportError::Validation`] if the hypothesis and reference universes
/// differ, or if any decision lacks a selection or has more than one.
pub fn build_model_matrices<C, D>(
    hypothesis: &[Prediction<C>],
    reference: &[Prediction<D>],
    selections: &[Selection],
) -> ReportResult<ModelMatrices> {
    validate_same_universe(hypothesis, reference, "model predictions")?;
    validate_selections(hypothesis, selections)?;

    let mut layout: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for row in hypothesis {
        layout.entry(row.decision.as_str()).or_default().push(row.choice.as_str());
    }
    for choices in layout.values_mut() {
        choices.sort_unstable();
    }

    let n_decisions = layout.len();
    let n_columns = layout.values().map(Vec::len).max().unwrap_or(0);

    let mut cell_of: HashMap<(&str, &str), (usize, usize)> = HashMap::with_capacity(hypothesis.len());
    for (row_idx, (decision, choices)) in layout.iter().enumerate() {
        for (col_idx, choice) in choices.iter().enumerate() {
            cell_of.insert((*decision, *choice), (row_idx, col_idx));
        }
    }

    let mut hyp_matrix = Array2::<f64>::zeros((n_decisions, n_columns));
    let mut ref_matrix = Array2::<f64>::zeros((n_decisions, n_columns));
    let mut sel_matrix = Array2::<f64>::zeros((n_decisions, n_columns));

    for row in hypothesis {
        let idx = cell_of[&row.key()];
        hyp_matrix[idx] = row.probability;
    }
    for row in reference {
        let idx = cell_of[&row.key()];
        ref_matrix[idx] = row.probability;
    }
    for sel in selections {
        let idx = cell_of[&(sel.decision.as_str(), sel.choice.as_str())];
        sel_matrix[idx] = 1.0;
    }

    Ok(ModelMatrices {
        decisions: layout.keys().map(|d| d.to_string()).collect(),
        choices: layout
            .values()
            .map(|cs| cs.iter().map(|c| c.to_string()).collect())
            .collect(),
        hypothesis: hyp_matrix,
        reference: ref_matrix,
        selections: sel_matrix,
    })
}
