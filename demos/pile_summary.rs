//! Single-Pile Summary Example
//!
//! Grows one Oslo pile to steady state and reports its basic observables

use oslo::sim::{run_to_steady_state, SimConfig};
use oslo::{Lattice, OsloError, Threshold, TransitionCounts};

fn main() -> Result<(), OsloError> {
    println!("Running Oslo pile summary...\n");

    let config = SimConfig {
        length: 32,
        cycles: 100_000,
        seed: 7,
        ..Default::default()
    };

    let mut lattice = Lattice::with_seed(config.length, config.p, config.seed)?;
    let cross_over = run_to_steady_state(&mut lattice);

    let mut height_total = 0u64;
    let mut largest_avalanche = 0u64;
    let mut relaxations = 0u64;
    let mut transitions = TransitionCounts::new();

    for step in 0..config.cycles {
        if step % 2 == 0 {
            let size = lattice.cycle_with_relax_count()?;
            relaxations += size;
            largest_avalanche = largest_avalanche.max(size);
        } else {
            transitions += lattice.cycle_with_transition_counts();
        }
        height_total += lattice.pile_height();
    }

    println!("PILE SUMMARY");
    println!("============");
    println!("  Length:              {}", config.length);
    println!("  Threshold p:         {}", config.p);
    println!("  Cross-over time:     {}", cross_over);
    println!("  Mean pile height:    {:.3}", height_total as f64 / config.cycles as f64);
    println!("  Mean avalanche size: {:.3}", relaxations as f64 / (config.cycles / 2) as f64);
    println!("  Largest avalanche:   {}", largest_avalanche);

    println!("\nThreshold transitions:");
    for from in Threshold::ALL {
        for to in Threshold::ALL {
            println!(
                "  {} -> {}: {:>8} ({:.4})",
                from,
                to,
                transitions.get(from, to),
                transitions.transition_probability(from, to)
            );
        }
    }

    println!("\nFinal heights: {:?}", lattice.all_heights());
    println!("Done!");

    Ok(())
}
