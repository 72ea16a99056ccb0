mod http;

pub mod plan;
pub mod runner;

pub use http::{Error, HttpClient, HttpResponse, HttpTransportErrorKind, Result};
pub use plan::{Plan, PlanOverrides};
