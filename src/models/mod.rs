pub mod focus_session;
pub mod snapshot;
pub mod work_state;

pub use focus_session::FocusSession;
pub use snapshot::{DailyTotals, Snapshot};
pub use work_state::{Totals, WorkState};
