use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fishflow_reports::algorithms::{compute_mixtures, compute_support, prob_members};
use fishflow_reports::core::domain::{Epsilons, Prediction, Selection};
use ndarray::Array2;

const CHOICES: usize = 8;

fn matrices(decisions: usize) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
    let reference = Array2::from_elem((decisions, CHOICES), 1.0 / CHOICES as f64);
    let hypothesis = Array2::from_shape_fn((decisions, CHOICES), |(i, j)| {
        let weight = ((i + j) % CHOICES + 1) as f64;
        weight / 36.0
    });
    let selections = Array2::from_shape_fn((decisions, CHOICES), |(i, j)| {
        if j == (i * 3) % CHOICES {
            1.0
        } else {
            0.0
        }
    });
    (reference, hypothesis, selections)
}

fn predictions(decisions: usize) -> (Vec<Prediction>, Vec<Prediction>, Vec<Selection>) {
    let mut hypothesis = Vec::with_capacity(decisions * CHOICES);
    let mut reference = Vec::with_capacity(decisions * CHOICES);
    let mut selections = Vec::with_capacity(decisions);
    for i in 0..decisions {
        let decision = format!("d{}", i);
        for j in 0..CHOICES {
            let choice = format!("c{}", j);
            let weight = ((i + j) % CHOICES + 1) as f64 / 36.0;
            hypothesis.push(Prediction::new(&decision, &choice, weight));
            reference.push(Prediction::new(&decision, &choice, 1.0 / CHOICES as f64));
        }
        selections.push(Selection::new(&decision, format!("c{}", (i * 3) % CHOICES)));
    }
    (hypothesis, reference, selections)
}

fn bench_prob_members(c: &mut Criterion) {
    let mut group = c.benchmark_group("prob_members");
    let epsilons = Epsilons::evenly_spaced(11).unwrap();

    for decisions in [100, 1_000, 10_000] {
        let (reference, hypothesis, selections) = matrices(decisions);
        group.bench_with_input(BenchmarkId::new("decisions", decisions), &decisions, |b, _| {
            b.iter(|| {
                prob_members(
                    black_box(reference.view()),
                    black_box(hypothesis.view()),
                    black_box(selections.view()),
                    &epsilons,
                    None,
                )
            });
        });
    }

    group.finish();
}

fn bench_compute_support(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_support");
    let epsilons = Epsilons::evenly_spaced(11).unwrap();
    let (hypothesis, reference, selections) = predictions(1_000);

    group.bench_function("1000_decisions", |b| {
        b.iter(|| compute_support(black_box(&hypothesis), black_box(&reference), &selections, &epsilons, None));
    });

    group.finish();
}

fn bench_compute_mixtures(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_mixtures");
    let epsilons = Epsilons::evenly_spaced(11).unwrap();
    let (hypothesis, reference, _) = predictions(500);

    group.bench_function("500_decisions_11_members", |b| {
        b.iter(|| compute_mixtures(black_box(&hypothesis), black_box(&reference), &epsilons));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_prob_members,
    bench_compute_support,
    bench_compute_mixtures
);
criterion_main!(benches);
