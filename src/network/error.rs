use thiserror::Error;

/// Errors raised while a concrete [`super::Network`] loader is assembling
/// its data, as opposed to the per-way skip decisions `TripLineSet::build`
/// makes silently (spec.md §7 classifies those separately).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Error(String),
    #[error("could not parse geometry as WKT: {0}")]
    Wkt(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
}
