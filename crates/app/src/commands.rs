use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  /login <country-code> <phone>   request a one-time password
  /otp <code>                     verify the one-time password
  /rooms                          list chatrooms
  /new <title>                    create a chatroom
  /search <text>                  filter chatrooms by title
  /delete <id>, /yes, /no         delete a chatroom after confirming
  /open <id>                      open a chatroom
  <text>                          send a message in the open chatroom
  /image <path>, /unimage         attach or drop an image for the next message
  /older                          load earlier messages
  /back                           return to the chatroom list
  /logout                         sign out
  /quit                           exit";

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { country: String, phone: String },
    Otp(String),
    Rooms,
    New(String),
    Search(String),
    Delete(String),
    Yes,
    No,
    Open(String),
    Send(String),
    Image(PathBuf),
    Unimage,
    Older,
    Back,
    Logout,
    Help,
    Quit,
    Unknown(String),
}

/// Parses a line; anything not starting with `/` is message text. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Some(Command::Send(line.to_string()));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "login" => {
            let mut parts = argument.split_whitespace();
            Command::Login {
                country: parts.next().unwrap_or_default().to_string(),
                phone: parts.next().unwrap_or_default().to_string(),
            }
        }
        "otp" => Command::Otp(argument.to_string()),
        "rooms" => Command::Rooms,
        "new" => Command::New(argument.to_string()),
        // Search keeps inner whitespace as typed.
        "search" => Command::Search(rest.get(name.len() + 1..).unwrap_or_default().to_string()),
        "delete" => Command::Delete(argument.to_string()),
        "yes" => Command::Yes,
        "no" => Command::No,
        "open" => Command::Open(argument.to_string()),
        "send" => Command::Send(argument.to_string()),
        "image" => Command::Image(PathBuf::from(argument)),
        "unimage" => Command::Unimage,
        "older" => Command::Older,
        "back" => Command::Back,
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(name.to_string()),
    };
    Some(command)
}
