//! Message multiplexing
//!
//! - Inbound command interpretation (trigger / broadcast / directed)
//! - Outbound record shape for received messages
//! - The multiplexer tying both to the session

pub mod command;
pub mod multiplexer;
pub mod record;

pub use command::{MessageCommand, Recipient};
pub use multiplexer::{Dispatch, MessageMultiplexer};
pub use record::MessageRecord;
