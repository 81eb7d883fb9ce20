use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EpsmodResult<T> = Result<T, EpsmodError>;
pub type IngestResult<T> = EpsmodResult<T>;
pub type FitResult<T> = EpsmodResult<T>;

/// Failure taxonomy of the batch run. Every fatal category aborts the
/// whole run; there is no partial-result recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpsmodErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    PreconditionViolation,
    NumericalIntegrityError,
    InsufficientDataError,
    ComputationError,
    InternalError,
}

impl EpsmodErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::PreconditionViolation => 4,
            Self::NumericalIntegrityError => 5,
            Self::InsufficientDataError => 6,
            Self::ComputationError => 7,
            Self::InternalError => 8,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::PreconditionViolation => "PreconditionViolation",
            Self::NumericalIntegrityError => "NumericalIntegrityError",
            Self::InsufficientDataError => "InsufficientDataError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpsmodError {
    category: EpsmodErrorCategory,
    code: &'static str,
    message: String,
}

impl EpsmodError {
    pub fn new(
        category: EpsmodErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::InputValidationError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::IoSystemError, code, message)
    }

    pub fn precondition(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::PreconditionViolation, code, message)
    }

    pub fn numerical_integrity(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::NumericalIntegrityError, code, message)
    }

    pub fn insufficient_data(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::InsufficientDataError, code, message)
    }

    pub fn computation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::ComputationError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpsmodErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> EpsmodErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.code, self.message)
    }
}

impl Display for EpsmodError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.label(),
            self.code,
            self.message
        )
    }
}

impl Error for EpsmodError {}

#[cfg(test)]
mod tests {
    use super::{EpsmodError, EpsmodErrorCategory};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (EpsmodErrorCategory::Success, 0, "Success"),
            (EpsmodErrorCategory::InputValidationError, 2, "InputValidationError"),
            (EpsmodErrorCategory::IoSystemError, 3, "IoSystemError"),
            (EpsmodErrorCategory::PreconditionViolation, 4, "PreconditionViolation"),
            (EpsmodErrorCategory::NumericalIntegrityError, 5, "NumericalIntegrityError"),
            (EpsmodErrorCategory::InsufficientDataError, 6, "InsufficientDataError"),
            (EpsmodErrorCategory::ComputationError, 7, "ComputationError"),
            (EpsmodErrorCategory::InternalError, 8, "InternalError"),
        ];

        for (category, exit_code, label) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.label(), label);
            assert_eq!(category.is_fatal(), exit_code != 0);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_line() {
        let error = EpsmodError::precondition(
            "PRE.LATTICE_VECTOR_MISSING",
            "requested lattice vector (0, 0, -1) is not stored by the source",
        );

        assert_eq!(error.exit_code(), 4);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [PRE.LATTICE_VECTOR_MISSING] requested lattice vector (0, 0, -1) is not stored by the source"
        );
        assert_eq!(
            error.to_string(),
            "PreconditionViolation [PRE.LATTICE_VECTOR_MISSING] requested lattice vector (0, 0, -1) is not stored by the source"
        );
    }
}
