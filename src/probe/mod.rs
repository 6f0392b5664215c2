pub mod dispatcher;
pub mod request;
pub mod throttle;
pub mod transport;

pub use dispatcher::{Dispatch, Dispatcher};
pub use request::{ProbeRequest, RequestBuilder};
pub use throttle::Pacer;
pub use transport::{RawResponse, ReqwestTransport, Transport};
