//! Circuit statistics utility - reports constraint counts and proof timing
//!
//! Usage:
//!   cargo run --release --bin circuit-stats           # Just constraint counts
//!   cargo run --release --bin circuit-stats -- --time # Include proof timing (needs keys)

use std::path::Path;
use std::time::Instant;

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};

use zeroledger_circuits::{DepositCircuit, NoteOpening, SpendCircuit, AMOUNT_BITS};
use zeroledger_prover::{prove, setup::CircuitKeys, Circuit};

fn count_constraints<C: ConstraintSynthesizer<Fr>>(circuit: C) -> usize {
    let cs = ConstraintSystem::<Fr>::new_ref();
    // Empty circuits use dummy values; the count is still exact
    circuit.generate_constraints(cs.clone()).unwrap();
    cs.num_constraints()
}

fn constraints_for(circuit: Circuit) -> usize {
    match circuit {
        Circuit::Deposit => count_constraints(DepositCircuit::empty()),
        spend => {
            let (inputs, outputs) = spend.arity();
            count_constraints(SpendCircuit::empty(inputs, outputs))
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let include_timing = args.iter().any(|a| a == "--time");

    println!("ZEROLEDGER CIRCUIT STATS\n");
    println!("Amount range: {} bits\n", AMOUNT_BITS);

    println!("Circuit        Public inputs    Constraints");
    println!("────────────────────────────────────────────");

    let mut total = 0;
    for circuit in Circuit::ALL {
        let count = constraints_for(circuit);
        total += count;
        println!(
            "{:14} {:>13}    {:>11}",
            circuit.name(),
            circuit.public_input_count(),
            count
        );
    }
    println!("\nTotal constraints (all circuits): {}", total);

    if include_timing {
        let keys_path = Path::new("keys");
        if keys_path.exists() {
            run_timing_benchmarks(keys_path);
        } else {
            println!("Keys not found. Generate keys first with:");
            println!("  cargo run --release --bin export-vks");
        }
    } else {
        println!("\n(Run with --time to include proof generation timing)");
    }
}

fn run_timing_benchmarks(keys_path: &Path) {
    const RUNS: u32 = 3;

    println!("\nLoading keys from {:?}...", keys_path);
    let start = Instant::now();
    let keys = match CircuitKeys::load_from_directory(keys_path) {
        Ok(k) => k,
        Err(e) => {
            println!("Failed to load keys: {}", e);
            return;
        }
    };
    println!("Keys loaded in {:?}\n", start.elapsed());

    println!("Circuit          Avg proving time");
    println!("─────────────────────────────────");

    for (circuit, pair) in keys.iter() {
        let start = Instant::now();
        for run in 0..RUNS {
            let result = match circuit {
                Circuit::Deposit => {
                    let notes = [
                        NoteOpening::new(10, Fr::from(run as u64 + 1)),
                        NoteOpening::new(20, Fr::from(2u64)),
                        NoteOpening::new(30, Fr::from(3u64)),
                    ];
                    prove::prove_deposit(&pair.proving_key, notes)
                }
                spend => {
                    let (n, m) = spend.arity();
                    let inputs = vec![NoteOpening::new(m as u128, Fr::from(run as u64 + 1)); n];
                    let outputs = vec![NoteOpening::new(n as u128, Fr::from(7u64)); m];
                    prove::prove_spend(&pair.proving_key, &inputs, &outputs, 0)
                }
            };
            if let Err(e) = result {
                println!("{:14}   failed: {}", circuit.name(), e);
                break;
            }
        }
        println!("{:14}   {:>8?}", circuit.name(), start.elapsed() / RUNS);
    }
}
