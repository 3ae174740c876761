//! Export verifying keys.
//!
//! Loads keys from `keys/` (running setup first if the directory is missing)
//! and writes every verifying key as hex to `keys/verifying_keys.json`.

use std::path::Path;

use zeroledger_prover::setup::{setup_all_circuits, CircuitKeys};

fn main() {
    let keys_dir = Path::new("keys");

    println!("Loading or generating circuit keys...");

    let keys = if keys_dir.exists() {
        println!("Loading existing keys from {:?}", keys_dir);
        CircuitKeys::load_from_directory(keys_dir).expect("Failed to load keys")
    } else {
        println!("Running trusted setup for all circuits (this may take a while)...");
        let keys = setup_all_circuits().expect("Failed to setup circuits");
        keys.save_to_directory(keys_dir).expect("Failed to save keys");
        println!("Keys saved to {:?}", keys_dir);
        keys
    };

    println!("\n=== Verifying Keys ===\n");

    let mut exported = serde_json::Map::new();
    for (circuit, pair) in keys.iter() {
        let vk = pair.serialize_vk().expect("Failed to serialize verifying key");
        let encoded = format!("0x{}", hex::encode(&vk));
        println!("{} VK ({} bytes):", circuit, vk.len());
        println!("{}\n", encoded);
        exported.insert(format!("{}_vk", circuit), serde_json::Value::String(encoded));
    }

    let json_path = keys_dir.join("verifying_keys.json");
    std::fs::write(
        &json_path,
        serde_json::to_string_pretty(&exported).expect("Failed to encode JSON"),
    )
    .expect("Failed to write JSON");
    println!("JSON exported to {:?} ({} circuits)", json_path, keys.len());
}
