//! Game-facing inputs: the caller's public view, the event vocabulary, and the
//! engine's ledger of statements it has already folded in.

pub mod event;
pub mod ledger;
pub mod view;

pub use event::{GameEvent, RoleDelta};
pub use ledger::{Ledger, Report, ReportMatch};
pub use view::GameView;
