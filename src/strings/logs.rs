use crate::application::parsing::ParseError;

pub fn config_loaded(path: &str) -> String {
    format!("Loaded configuration from {path}")
}

pub fn missing_field(field: &str) -> String {
    format!("Required field '{field}' missing in config")
}

pub const LOGGING_IN: &str = "logging in to event fabric";

pub const LOGIN_SUCCESS: &str = "logged in";

pub fn login_fail(err: &str) -> String {
    format!("login to event fabric failed: {err}")
}

pub const BOT_START: &str = "starting bot";

pub const SHUTDOWN: &str = "Shutting down...";

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}

pub fn connecting(server: &str, port: u16, channel: &str, nickname: &str, listen: &str) -> String {
    format!("connecting {channel} {nickname} {server} {port} listen to {listen}")
}

pub fn connect_fail(server: &str, port: u16, err: &str) -> String {
    format!("Failed to connect to {server}:{port}: {err}")
}

pub fn session_ended(reason: &str) -> String {
    format!("IRC session ended: {reason}")
}

pub fn reconnecting(delay_secs: u64) -> String {
    format!("Reconnecting in {delay_secs}s...")
}

pub fn welcome(channel: &str) -> String {
    format!("welcome {channel}")
}

pub fn nick_in_use(nick: &str) -> String {
    format!("nick in use {nick}")
}

pub fn ignore_message(msg: &str, from: &str) -> String {
    format!("ignore message {msg} from {from}")
}

pub fn malformed_line(line: &str, err: &str) -> String {
    format!("Skipping malformed IRC line {line:?}: {err}")
}

pub fn server_error(msg: &str) -> String {
    format!("Server closed the link: {msg}")
}

pub fn parse_error(error: &ParseError) -> String {
    match error.cause() {
        Some(cause) => format!("{} {:?} ({})", error.reason(), error.raw(), cause),
        None => format!("{} {:?}", error.reason(), error.raw()),
    }
}

pub fn send_event_fail(err: &str) -> String {
    format!("Error sending event: {err}")
}

pub fn event_sent(kind: &str, user: &str) -> String {
    format!("Forwarded {kind} by {user}")
}
