use crate::witness::{BatchWitness, WitnessError};

impl BatchWitness {
    /// bincode, then standard base64
    pub fn encode(&self) -> Result<String, WitnessError> {
        let bytes = bincode::serialize(self).map_err(|e| WitnessError::Encode(e.to_string()))?;
        Ok(base64::encode(bytes))
    }

    /// Inverse of [BatchWitness::encode]. Field elements must be canonical and every account proof must hold one sibling per tree level.
    pub fn decode(encoded: &str) -> Result<Self, WitnessError> {
        let bytes = base64::decode(encoded.trim()).map_err(|e| WitnessError::Decode(e.to_string()))?;
        let witness: BatchWitness =
            bincode::deserialize(&bytes).map_err(|e| WitnessError::Decode(e.to_string()))?;
        if witness.operations.is_empty() {
            return Err(WitnessError::Shape("witness holds no operation".into()));
        }
        Ok(witness)
    }
}
