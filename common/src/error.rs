use thiserror::Error;

/// Everything that can go wrong while looking a password up in the corpus.
///
/// Both variants end up as [`Exposure::Unknown`](crate::range::Exposure::Unknown):
/// the user is only ever told that the check could not be done.
#[derive(Error, Debug)]
pub enum Error {
    /* the range request itself: transport error, timeout, non-2xx status */
    #[error("NetworkFailure({0:#})")]
    NetworkFailure(eyre::Report),

    /* a record matched our suffix but its count couldn't be read */
    #[error("ParseFailure({0})")]
    ParseFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;
