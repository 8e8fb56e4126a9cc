//! Owner warning text.

/// Text sent to the account owner when a refresh arrives from an
/// unrecognized origin.
pub fn warning_message(origin_addr: &str, user_agent: &str) -> String {
    let user_agent = if user_agent.is_empty() { "unknown" } else { user_agent };
    format!(
        "WARNING: your session was refreshed from an unrecognized address.\n\
         ip: [{origin_addr}]\n\
         user-agent: [{user_agent}]\n\
         If this was you, ignore this message.\n"
    )
}
