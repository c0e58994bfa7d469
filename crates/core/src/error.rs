use pdf_engine::PdfEngineError;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no document is open")]
    NoDocument,
    #[error("another operation is still processing")]
    Busy,
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
}

pub type EditorResult<T> = Result<T, EditorError>;
