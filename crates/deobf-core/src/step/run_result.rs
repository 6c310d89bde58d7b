use serde_json::Value;

/// Error opaco devuelto por un stage. El executor lo conserva tipado en el
/// `ExecutionReport` y lo serializa como texto en el evento `StageFailed`.
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Resultado abstracto de ejecutar un stage.
pub enum StageRunResult {
    Success { metadata: Option<Value> },
    /// Sólo para stages `Source`: el hash de contenido del artifact existente.
    Existing { content_hash: String },
    Failure { error: StageError },
}

impl StageRunResult {
    pub fn failure(error: impl Into<StageError>) -> Self {
        StageRunResult::Failure { error: error.into() }
    }
}

impl<E> From<Result<Option<Value>, E>> for StageRunResult
    where E: Into<StageError>
{
    fn from(res: Result<Option<Value>, E>) -> Self {
        match res {
            Ok(metadata) => StageRunResult::Success { metadata },
            Err(e) => StageRunResult::failure(e),
        }
    }
}
