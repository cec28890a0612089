use crate::error::ExtractError;

pub mod audit;
pub mod checklist;
pub mod compliance;

/// Turns the full text of one source document into normalized records.
pub trait Extractor {
    type Output;

    /// `origin` names the document in logs and errors (usually its path).
    fn extract(&self, origin: &str, text: &str) -> Result<Self::Output, ExtractError>;
}
