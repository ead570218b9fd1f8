pub mod services;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use services::access::AccessTier;
pub use services::activation::ActivationEngine;
pub use services::archive::ArchiveGateway;
pub use services::backup::BackupEngine;
pub use services::decrypt::DecryptionService;
pub use services::gateway::FileGateway;
pub use services::identify::ModIdentificationEngine;
pub use services::transfer::SourceTransferService;
pub use types::game_spec::GameDirectorySpec;
pub use types::layout::StorageLayout;
pub use types::mod_unit::{BackupRecord, ModUnit};
