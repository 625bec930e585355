mod executor;
mod mod_request;

pub use executor::{JobExecutor, StatusMap};
pub use mod_request::{ModRequest, ModSource};
