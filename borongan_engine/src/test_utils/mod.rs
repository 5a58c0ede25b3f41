pub mod fake_gateway;
pub mod prepare_env;

pub use fake_gateway::{FakeGateway, FakeMode};
pub use prepare_env::{prepare_test_env, TestDatabase};
