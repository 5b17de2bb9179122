pub mod provider;
pub mod s3;

pub use provider::S3Provider;
pub use s3::S3Listing;
