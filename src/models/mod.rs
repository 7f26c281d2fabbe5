mod api;

pub use api::{ClientInfoResponse, ConsentRequest, EchoRequest, EchoResponse, HealthResponse};
