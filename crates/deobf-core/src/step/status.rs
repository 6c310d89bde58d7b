/// Estado de un stage dentro de un run.
///
/// Transiciones válidas:
/// - `Pending` -> `Running` -> `FinishedOk` | `Failed`
/// - `Pending` -> `CacheHit`
/// - `Pending` -> `NotRunnable` (algún input falló o quedó bloqueado)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running,
    FinishedOk,
    CacheHit,
    Failed,
    NotRunnable,
}

impl StageStatus {
    /// La salida del stage está disponible para sus dependientes.
    pub fn is_available(self) -> bool {
        matches!(self, StageStatus::FinishedOk | StageStatus::CacheHit)
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, StageStatus::Failed | StageStatus::NotRunnable)
    }
}
