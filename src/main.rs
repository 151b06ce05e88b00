//! Binary entrypoint for the chat relay server.
//! Run with: cargo run --bin chat-relay

use std::process::ExitCode;

use chat_relay::start_chat_relay;

fn main() -> ExitCode {
    start_chat_relay::run()
}
