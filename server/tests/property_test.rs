//! Property-based tests using proptest.
//!
//! Content addressing must be deterministic, insensitive to key order and
//! sensitive to every field.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use proof_vault::proof::{
    canonical_bytes, recover_signer, AttestationSigner, ContentHash, ProofArtifact, ProofKind,
};

const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

// ============================================================================
// Custom Strategies
// ============================================================================

fn arb_kind() -> impl Strategy<Value = ProofKind> {
    prop::sample::select(ProofKind::ALL.to_vec())
}

/// Arbitrary JSON objects, a couple of levels deep
fn arb_raw_proof() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::from),
        (-9_007_199_254_740_991i64..9_007_199_254_740_991).prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::from),
    ];
    let tree = leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    });
    prop::collection::btree_map("[a-z_]{1,8}", tree, 1..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

fn arb_artifact() -> impl Strategy<Value = ProofArtifact> {
    (
        arb_kind(),
        any::<bool>(),
        arb_raw_proof(),
        1u64..4_000_000_000_000,
        "[a-z0-9-]{1,12}",
    )
        .prop_map(|(kind, verified, raw_proof, timestamp, issuer)| ProofArtifact {
            kind,
            verified,
            raw_proof,
            timestamp,
            issuer,
            attestation: None,
        })
}

/// Rebuild an object with its keys inserted in reverse order
fn reversed(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map.iter().rev() {
                out.insert(k.clone(), reversed(v));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn hashing_is_deterministic(artifact in arb_artifact()) {
        let a = ContentHash::of(&artifact).unwrap();
        let b = ContentHash::of(&artifact.clone()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn key_order_does_not_change_the_hash(artifact in arb_artifact()) {
        let shuffled = ProofArtifact {
            raw_proof: reversed(&artifact.raw_proof),
            ..artifact.clone()
        };
        prop_assert_eq!(
            canonical_bytes(&artifact).unwrap(),
            canonical_bytes(&shuffled).unwrap()
        );
    }

    #[test]
    fn any_single_field_change_changes_the_hash(
        artifact in arb_artifact(),
        field in 0usize..5,
    ) {
        let mut mutated = artifact.clone();
        match field {
            0 => mutated.verified = !mutated.verified,
            1 => mutated.timestamp += 1,
            2 => mutated.issuer.push('x'),
            3 => {
                mutated.raw_proof
                    .as_object_mut()
                    .unwrap()
                    .insert("extra_key".to_string(), json!(true));
            }
            _ => {
                let idx = ProofKind::ALL.iter().position(|k| *k == mutated.kind).unwrap();
                mutated.kind = ProofKind::ALL[(idx + 1) % ProofKind::ALL.len()];
            }
        }
        prop_assert_ne!(
            ContentHash::of(&artifact).unwrap(),
            ContentHash::of(&mutated).unwrap()
        );
    }

    #[test]
    fn hash_text_round_trips(bytes in any::<[u8; 32]>()) {
        let hash = ContentHash(bytes);
        prop_assert_eq!(hash.to_string().parse::<ContentHash>().unwrap(), hash);
        prop_assert_eq!(hash.to_hex().parse::<ContentHash>().unwrap(), hash);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn signature_recovers_the_signer(artifact in arb_artifact()) {
        let signer = AttestationSigner::from_hex(TEST_KEY).unwrap();
        let envelope = signer.seal(artifact).unwrap();

        let recovered = recover_signer(&envelope.proof_hash, &envelope.signature).unwrap();
        prop_assert_eq!(proof_vault::proof::checksum(&recovered), signer.address());
        prop_assert!(envelope.check(&envelope.proof_hash).is_ok());
    }
}
