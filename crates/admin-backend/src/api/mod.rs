mod client;
pub mod http;
mod request;
mod response;
pub mod upload;

pub use client::ApiClient;
pub(crate) use client::parse_tokens;
pub use http::{HttpClient, HttpResponse, ReqwestClient, TransportError};
pub use request::ApiRequest;
pub use response::{ApiError, ApiResponse};
pub use upload::{ProgressCallback, UploadForm};

pub use reqwest::Method;
