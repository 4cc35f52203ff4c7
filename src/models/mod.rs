pub mod artifact;
pub mod job;
pub mod request;
pub mod video;
