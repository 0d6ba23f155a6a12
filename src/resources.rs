mod command;
mod failure;
mod http_get;
mod sleep;

pub use command::CommandResource;
pub use failure::FailureResource;
pub use http_get::HttpGetResource;
pub use sleep::SleepResource;

use crate::provider::Resource;

pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(FailureResource),
        Box::new(SleepResource),
        Box::new(CommandResource),
        Box::new(HttpGetResource),
    ]
}
