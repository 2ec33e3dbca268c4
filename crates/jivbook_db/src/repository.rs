//! Repository construction
//!
//! Repositories are built from a connection handle through a factory so the
//! service layer never has to know which backend sits behind them.

/// A factory that builds repository `R` from connection handle `C`
pub trait RepositoryFactory<R, C> {
    fn create_repository(&self, client: C) -> R;
}
