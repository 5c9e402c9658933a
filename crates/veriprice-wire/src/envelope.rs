//! Envelope encoding and proof signing bytes.

use veriprice_crypto::blake3::encode_multi_field;
use veriprice_types::{AttestationEnvelope, ProducerId, UnixSeconds, MAX_PRODUCER_ID_LEN};

use crate::codec::{put_bytes, put_word, word, Reader};
use crate::{Result, WireError, MAX_ENVELOPE_LEN, MAX_PROOF_LEN, WIRE_VERSION};

/// Bytes a proof is computed over.
///
/// `LE32-prefixed(producer_id, word(attested_at), payload)`. The payload is
/// taken verbatim so any change to it invalidates the proof.
pub fn signing_bytes(producer_id: &ProducerId, attested_at: UnixSeconds, payload: &[u8]) -> Vec<u8> {
    encode_multi_field(&[
        producer_id.as_str().as_bytes(),
        &word(u128::from(attested_at)),
        payload,
    ])
}

/// Encode an envelope for submission.
pub fn encode_envelope(envelope: &AttestationEnvelope) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.push(WIRE_VERSION);
    put_bytes(
        &mut out,
        "producer_id",
        envelope.producer_id.as_str().as_bytes(),
        MAX_PRODUCER_ID_LEN,
    )?;
    put_word(&mut out, u128::from(envelope.attested_at));
    put_bytes(&mut out, "payload", &envelope.payload, MAX_ENVELOPE_LEN)?;
    put_bytes(&mut out, "proof", &envelope.proof, MAX_PROOF_LEN)?;
    if out.len() > MAX_ENVELOPE_LEN {
        return Err(WireError::EnvelopeTooLarge(out.len()));
    }
    Ok(out)
}

/// Decode an envelope.
///
/// The payload is returned still encoded; decode it with
/// [`decode_payload`](crate::decode_payload) to compare against call
/// parameters.
pub fn decode_envelope(bytes: &[u8]) -> Result<AttestationEnvelope> {
    if bytes.len() > MAX_ENVELOPE_LEN {
        return Err(WireError::EnvelopeTooLarge(bytes.len()));
    }
    let mut reader = Reader::new(bytes);
    let version = reader.read_u8("version")?;
    if version != WIRE_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let producer = reader.read_str("producer_id", MAX_PRODUCER_ID_LEN)?;
    let producer_id =
        ProducerId::new(producer).map_err(|e| WireError::InvalidProducerId(e.to_string()))?;
    let attested_at = reader.read_word_u64("attested_at")?;
    let payload = reader.read_bytes("payload", MAX_ENVELOPE_LEN)?.to_vec();
    let proof = reader.read_bytes("proof", MAX_PROOF_LEN)?.to_vec();
    reader.finish()?;
    Ok(AttestationEnvelope {
        producer_id,
        attested_at,
        payload,
        proof,
    })
}
