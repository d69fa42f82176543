//! Vendor error codes the provider reacts to

/// Private IP still held by a recently released instance
pub const VPC_IP_IS_USED: &str = "VpcIpIsUsed";

/// Transient backend failure, common right after a state change
pub const INTERNAL_ERROR: &str = "InternalError";

/// Object still referenced by a dependent that is being torn down
pub const RESOURCE_IN_USE: &str = "ResourceInUse";

/// Prefix of every signature/credential rejection
pub const AUTH_FAILURE_PREFIX: &str = "AuthFailure";
