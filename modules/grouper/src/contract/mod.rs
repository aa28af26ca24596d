pub mod client;
pub mod error;
pub mod model;

pub use client::GrouperApi;
pub use error::GrouperError;
pub use model::{
    EntityKind, Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch,
};
