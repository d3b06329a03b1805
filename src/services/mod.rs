pub mod prompt;
pub mod proof_extractor;
pub mod time_validator;

pub use proof_extractor::{
    ExtractionOutcome, ExtractionRequest, LlmProofExtractor, ProofExtractor, Provider,
};
