use crate::blockchain::core::chain::Block;
use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;

/// Check every link of `chain`: indices count up from 1, each block's
/// `previous_hash` is the hash of its predecessor, and each proof satisfies
/// the proof-of-work predicate against the predecessor's proof.
pub fn validate_chain(chain: &[Block]) -> Result<()> {
    let first = chain
        .first()
        .ok_or_else(|| ChainError::InvalidChain("chain is empty".to_string()))?;
    if first.index != 1 {
        return Err(ChainError::InvalidChain(format!(
            "first block has index {}, expected 1",
            first.index
        )));
    }

    for pair in chain.windows(2) {
        let (previous, block) = (&pair[0], &pair[1]);

        if block.index != previous.index + 1 {
            return Err(ChainError::InvalidBlock(format!(
                "Invalid block index. Expected {}, but got {}.",
                previous.index + 1,
                block.index
            )));
        }

        let expected_hash = previous.hash()?;
        if block.previous_hash != expected_hash {
            return Err(ChainError::InvalidBlock(format!(
                "Block {} does not link to its predecessor. Expected previous hash {}, but got {}.",
                block.index, expected_hash, block.previous_hash
            )));
        }

        if !ProofOfWork::valid_proof(previous.proof, block.proof) {
            return Err(ChainError::InvalidBlock(format!(
                "Block {} has an invalid proof of work ({} after {}).",
                block.index, block.proof, previous.proof
            )));
        }
    }

    Ok(())
}

pub fn is_valid_chain(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}
