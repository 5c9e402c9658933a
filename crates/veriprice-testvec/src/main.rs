//! Test vector generator for the Veriprice wire format and hashes.
//!
//! Writes `tests/fixtures/test_vectors.json`. Any other implementation of
//! the attestation producer or verifier must reproduce these bytes.
//!
//! Usage:
//!   veriprice-testvec              # Generate test_vectors.json
//!   veriprice-testvec --verify     # Verify test vectors match expected values

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use veriprice_crypto::blake3::{self, contexts};
use veriprice_crypto::ed25519::SigningKey;
use veriprice_feeder::normalize::parse_price;
use veriprice_feeder::producer::{attest, DigestSigner, Ed25519Signer, ProofSigner};
use veriprice_types::{PriceQuote, ProducerId};
use veriprice_verifier::hash::price_data_hash;
use veriprice_wire::{encode_envelope, encode_payload, signing_bytes};

const VECTORS_PATH: &str = "tests/fixtures/test_vectors.json";

const PRODUCER: &str = "p1";
const PRICE: u128 = 200_000_000_000;
const OBSERVED_AT: u64 = 1_700_000_000;
const ATTESTED_AT: u64 = 1_700_000_030;
const SOURCE: &str = "coinbase";
const ED25519_SEED: [u8; 32] = [0x42; 32];

#[derive(Serialize, Deserialize)]
struct TestVectors {
    version: String,
    generated_by: String,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

fn vector(description: &str, inputs: &[(&str, String)], outputs: &[(&str, String)]) -> TestVector {
    let to_map = |pairs: &[(&str, String)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>()
    };
    TestVector {
        description: description.to_string(),
        inputs: to_map(inputs),
        outputs: to_map(outputs),
    }
}

fn common_inputs() -> Vec<(&'static str, String)> {
    vec![
        ("producer_id", PRODUCER.to_string()),
        ("price", PRICE.to_string()),
        ("observed_at", OBSERVED_AT.to_string()),
        ("attested_at", ATTESTED_AT.to_string()),
        ("source", SOURCE.to_string()),
    ]
}

fn generate_hash_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();
    let producer_id = ProducerId::new(PRODUCER)?;

    let data_hash = price_data_hash(PRICE, OBSERVED_AT, &producer_id);
    vectors.insert(
        "blake3_price_data_hash".to_string(),
        vector(
            "BLAKE3::derive_key(\"Veriprice v1 price-data-hash\", LE32-fields(word(price), word(observed_at), producer_id))",
            &common_inputs()[..3],
            &[("data_hash", hex::encode(data_hash))],
        ),
    );

    let binding_key = blake3::derive_key(contexts::ATTESTATION_BINDING, b"");
    vectors.insert(
        "blake3_attestation_binding_key".to_string(),
        vector(
            "BLAKE3::derive_key(\"Veriprice v1 attestation-binding\", \"\")",
            &[("context", contexts::ATTESTATION_BINDING.to_string())],
            &[("key", hex::encode(binding_key))],
        ),
    );

    Ok(vectors)
}

fn generate_wire_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();
    let producer_id = ProducerId::new(PRODUCER)?;
    let quote = PriceQuote::new(PRICE, OBSERVED_AT, SOURCE)?;

    let payload = encode_payload(&quote)?;
    vectors.insert(
        "wire_payload".to_string(),
        vector(
            "word(price) || word(observed_at) || LE32(len) source",
            &common_inputs()[1..],
            &[("payload", hex::encode(&payload))],
        ),
    );

    let message = signing_bytes(&producer_id, ATTESTED_AT, &payload);
    vectors.insert(
        "wire_signing_bytes".to_string(),
        vector(
            "LE32-fields(producer_id, word(attested_at), payload)",
            &common_inputs(),
            &[("signing_bytes", hex::encode(&message))],
        ),
    );

    let envelope = attest(&quote, &producer_id, ATTESTED_AT, &DigestSigner)?;
    let encoded = encode_envelope(&envelope)?;
    vectors.insert(
        "wire_envelope_digest_binding".to_string(),
        vector(
            "Version-1 envelope with a digest-binding proof",
            &common_inputs(),
            &[
                ("proof", hex::encode(&envelope.proof)),
                ("envelope", hex::encode(&encoded)),
            ],
        ),
    );

    let tx_material = [encoded.as_slice(), &0u64.to_le_bytes()].concat();
    vectors.insert(
        "blake3_transaction_id".to_string(),
        vector(
            "BLAKE3::derive_key(\"Veriprice v1 transaction-id\", envelope || LE64(nonce = 0))",
            &[("envelope", hex::encode(&encoded))],
            &[("tx_id", hex::encode(blake3::derive_key(contexts::TRANSACTION_ID, &tx_material)))],
        ),
    );

    Ok(vectors)
}

fn generate_ed25519_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();
    let producer_id = ProducerId::new(PRODUCER)?;
    let quote = PriceQuote::new(PRICE, OBSERVED_AT, SOURCE)?;
    let signer = Ed25519Signer::new(SigningKey::from_bytes(&ED25519_SEED));

    let envelope = attest(&quote, &producer_id, ATTESTED_AT, &signer)?;
    let mut inputs = common_inputs();
    inputs.push(("seed", hex::encode(ED25519_SEED)));
    vectors.insert(
        "ed25519_envelope_signature".to_string(),
        vector(
            &format!("Ed25519 ({}) over the envelope signing bytes", signer.scheme()),
            &inputs,
            &[
                ("verifying_key", hex::encode(signer.verifying_key().to_bytes())),
                ("signature", hex::encode(&envelope.proof)),
                ("envelope", hex::encode(encode_envelope(&envelope)?)),
            ],
        ),
    );

    Ok(vectors)
}

fn generate_normalization_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();
    for (name, raw) in [
        ("normalize_whole", "2000"),
        ("normalize_max_precision", "2099.99999999"),
        ("normalize_midpoint_rounds_up", "1.000000005"),
        ("normalize_below_midpoint", "1.0000000049"),
    ] {
        vectors.insert(
            name.to_string(),
            vector(
                "Decimal quote scaled by 10^8, midpoint away from zero",
                &[("raw", raw.to_string())],
                &[("price", parse_price(raw)?.to_string())],
            ),
        );
    }
    Ok(vectors)
}

fn generate_all_vectors() -> anyhow::Result<TestVectors> {
    let mut all_vectors = BTreeMap::new();

    all_vectors.extend(generate_hash_vectors()?);
    all_vectors.extend(generate_wire_vectors()?);
    all_vectors.extend(generate_ed25519_vectors()?);
    all_vectors.extend(generate_normalization_vectors()?);

    Ok(TestVectors {
        version: "1.0".to_string(),
        generated_by: "veriprice-testvec".to_string(),
        vectors: all_vectors,
    })
}

fn verify_vectors(vectors: &TestVectors) -> anyhow::Result<bool> {
    let regenerated = generate_all_vectors()?;
    let mut all_pass = true;

    for (name, expected) in &vectors.vectors {
        match regenerated.vectors.get(name) {
            Some(actual) if actual.outputs == expected.outputs => eprintln!("PASS: {name}"),
            Some(actual) => {
                eprintln!("FAIL: {name}");
                eprintln!("  expected: {:?}", expected.outputs);
                eprintln!("  actual:   {:?}", actual.outputs);
                all_pass = false;
            }
            None => {
                eprintln!("MISSING: {name}");
                all_pass = false;
            }
        }
    }

    Ok(all_pass)
}

fn write_vectors(vectors: &TestVectors) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(vectors)?;
    if let Some(parent) = std::path::Path::new(VECTORS_PATH).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(VECTORS_PATH, json).with_context(|| format!("writing {VECTORS_PATH}"))?;
    eprintln!("Generated {} test vectors to {VECTORS_PATH}", vectors.vectors.len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let verify = std::env::args().any(|a| a == "--verify");

    let vectors = if verify && std::path::Path::new(VECTORS_PATH).exists() {
        let content = std::fs::read_to_string(VECTORS_PATH)?;
        serde_json::from_str(&content).with_context(|| format!("parsing {VECTORS_PATH}"))?
    } else {
        if verify {
            eprintln!("No existing test vectors found at {VECTORS_PATH}. Generating...");
        }
        let vectors = generate_all_vectors()?;
        write_vectors(&vectors)?;
        vectors
    };

    if !verify_vectors(&vectors)? {
        bail!("test vector verification failed");
    }
    eprintln!("All test vectors verified successfully.");
    Ok(())
}
