use sqlx::SqlitePool;

/// Executes entity commands against the shared pool.
///
/// Entity modules implement `kanau::processor::Processor<Command>` for this
/// type; commands that must share a transaction expose `*_tx` helpers instead.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: SqlitePool,
}
