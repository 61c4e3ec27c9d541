use super::save::SaveError;
use crate::file_processor::FileProcessorError;
use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::printer::PrintError;
use crate::replace::ReplaceError;
use crate::scene::SceneError;
use crate::transform::TransformError;

/// Pipeline processing errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Lexical analysis failed: {0}")]
    LexicalAnalysis(#[from] LexerError),

    #[error("Scene build failed: {0}")]
    Scene(#[from] SceneError),

    #[error("Replacement failed: {0}")]
    Replace(#[from] ReplaceError),

    #[error("Transform failed: {0}")]
    Transform(TransformError),

    #[error("Printing failed: {0}")]
    Print(#[from] PrintError),

    #[error("Save failed: {0}")]
    Save(#[from] SaveError),

    #[error("Cancelled")]
    Cancelled,
}

impl From<TransformError> for PipelineError {
    fn from(error: TransformError) -> Self {
        match error {
            TransformError::Cancelled => PipelineError::Cancelled,
            TransformError::Replace(inner) => PipelineError::Replace(inner),
            other => PipelineError::Transform(other),
        }
    }
}

impl PipelineError {
    pub fn error_code(&self) -> Code {
        match self {
            PipelineError::FileProcessing(e) => e.error_code(),
            PipelineError::LexicalAnalysis(e) => e.error_code(),
            PipelineError::Scene(e) => e.error_code(),
            PipelineError::Replace(e) => e.error_code(),
            PipelineError::Transform(e) => e.error_code(),
            PipelineError::Print(e) => e.error_code(),
            PipelineError::Save(e) => e.error_code(),
            PipelineError::Cancelled => codes::pipeline::CANCELLED,
        }
    }

    /// Cancellation is reported, not counted as a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
