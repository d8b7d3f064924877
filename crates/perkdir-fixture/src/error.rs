use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture configuration error: {0}")]
    Configuration(String),
    #[error("test identity registration failed: {0}")]
    Registration(String),
    #[error("fixture seeding failed: {0}")]
    Seeding(String),
    #[error("teardown failed: {0}")]
    TeardownFailure(String),
}

pub type FixtureResult<T> = Result<T, FixtureError>;
