pub mod client;
pub mod probe;

pub use client::{HttpClient, HttpClientBuilder};
pub use probe::{ProbeCall, Sample, MAX_SAMPLE_BODY_LEN};
