pub mod errors;
pub mod events;
pub mod game_spec;
pub mod layout;
pub mod mod_unit;
