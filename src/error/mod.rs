mod metadata;
mod upstairs;

pub use metadata::MetadataError;
pub use upstairs::UpstairsError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
