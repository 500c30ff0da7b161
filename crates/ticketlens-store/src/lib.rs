//! On-disk layout and JSON persistence for ticket investigations

mod io;
mod paths;

pub use io::{atomic_write, read_json, write_json};
pub use paths::{clean_ticket_id, Paths, TicketPaths, STATE_DIR};
