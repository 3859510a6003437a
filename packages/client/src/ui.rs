//! UI utilities for the client.

use std::io::Write;

/// The prompt shown before user input
pub fn prompt(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{}> ", name),
        None => "> ".to_string(),
    }
}

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt(name: Option<&str>) {
    print!("{}", prompt(name));
    std::io::stdout().flush().ok();
}
