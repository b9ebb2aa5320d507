pub mod agent;
pub mod role;
pub mod side;
pub mod species;
pub mod village;

pub use agent::Agent;
pub use role::Role;
pub use side::Side;
pub use species::Species;
pub use village::Village;
