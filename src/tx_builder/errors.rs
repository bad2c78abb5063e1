//! Error types for the instruction builder

use thiserror::Error;

/// Errors raised while turning a validated transfer into instructions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionBuilderError {
    /// Amount cannot be represented in the asset's base units
    ///
    /// This includes:
    /// - Zero, negative or non-finite amounts
    /// - Amounts smaller than one base unit
    /// - Amounts overflowing u64 base units
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program that rejected the instruction parameters
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Invalid instruction order or structure
    ///
    /// A holding-account creation must precede the transfer that credits it,
    /// and a plan carries exactly one transfer.
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),
}

impl TransactionBuilderError {
    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid instruction order error
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransactionBuilderError::InstructionBuild {
            program: "spl_token".to_string(),
            reason: "invalid accounts".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Instruction build error (program=spl_token): invalid accounts"
        );
    }

    #[test]
    fn test_invalid_order_display() {
        let err = TransactionBuilderError::invalid_order("transfer precedes account creation");
        assert_eq!(
            err.to_string(),
            "Invalid instruction order: transfer precedes account creation"
        );
    }
}
