pub mod local;

pub use local::GrouperLocalClient;
