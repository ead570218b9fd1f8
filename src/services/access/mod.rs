pub mod resolver;

pub use resolver::{
    AccessTier, FixedProbe, PathDomains, PermissionProbe, PermissionSnapshot,
    PlatformGeneration, PrivilegedState,
};
