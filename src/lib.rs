// Meeting-Session - conferencing session endpoint
//
// Joins one multi-party audio/text session on behalf of a host:
// - Publishes a fixed local audio source
// - Mixes every remote participant's audio into one shared output
// - Relays broadcast and private text messages in both directions
// - Tears everything down in a fixed order on reconnect or destroy

pub mod audio;
pub mod client;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod messages;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{MeetingArgs, MeetingConfig, MeetingProps, PropsUpdate, ServerOptions};
pub use coordinator::{LifecycleCoordinator, MeetingHandle, TeardownReason};
pub use error::{MeetingError, Result};
pub use host::{ChannelOutputs, HostEvent, HostOutput, HostOutputs, HostPayload};
pub use messages::{MessageCommand, MessageRecord};

/// Install the `env_logger` backend (reads RUST_LOG, defaults to `info`)
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
