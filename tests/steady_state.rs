use oslo::sim::run_to_steady_state;
use oslo::{Lattice, DEFAULT_THRESHOLD_PROBABILITY};

fn mean_steady_pile_height(length: usize, seed: u64, cycles: usize) -> f64 {
    let mut lattice = Lattice::with_seed(length, DEFAULT_THRESHOLD_PROBABILITY, seed).unwrap();
    run_to_steady_state(&mut lattice);

    let mut total = 0u64;
    for _ in 0..cycles {
        lattice.cycle();
        total += lattice.pile_height();
    }
    total as f64 / cycles as f64
}

#[test]
fn mean_pile_height_length_16() {
    let mean = mean_steady_pile_height(16, 2024, 100_000);
    assert!((mean - 26.5).abs() / 26.5 < 0.02, "mean height {mean}");
}

#[test]
fn mean_pile_height_length_32() {
    let mean = mean_steady_pile_height(32, 2024, 100_000);
    assert!((mean - 53.9).abs() / 53.9 < 0.02, "mean height {mean}");
}

#[test]
fn cross_over_time_scales_with_length_squared() {
    // <t_c> ~ 0.85 L², averaged over a few seeds to tame the spread.
    let length = 64;
    let mean: f64 = (0..8u64)
        .map(|seed| {
            let mut lattice =
                Lattice::with_seed(length, DEFAULT_THRESHOLD_PROBABILITY, seed).unwrap();
            run_to_steady_state(&mut lattice) as f64
        })
        .sum::<f64>()
        / 8.0;
    let ratio = mean / (length * length) as f64;
    assert!(ratio > 0.7 && ratio < 1.0, "t_c / L^2 = {ratio}");
}
