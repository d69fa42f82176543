pub mod apply;
pub mod auth;
pub mod destroy;
pub mod plan;
pub mod show;
pub mod vpcs;
