//! Constructors for the commands the client sends.

use super::types::Command;

/// The registration handshake: `NICK` followed by `USER`.
pub fn registration(nick: &str, user: &str, realname: &str) -> [Command; 2] {
    [
        Command::Nick(nick.to_owned()),
        Command::User {
            user: user.to_owned(),
            realname: realname.to_owned(),
        },
    ]
}

/// Join a channel.
pub fn join(channel: &str) -> Command {
    Command::Join(channel.to_owned(), None)
}

/// Leave a channel.
pub fn part(channel: &str, message: Option<&str>) -> Command {
    Command::Part(channel.to_owned(), message.map(str::to_owned))
}

/// Send text to a channel or user.
pub fn privmsg(target: &str, text: &str) -> Command {
    Command::Privmsg(target.to_owned(), text.to_owned())
}

/// Send a notice to a channel or user.
pub fn notice(target: &str, text: &str) -> Command {
    Command::Notice(target.to_owned(), text.to_owned())
}

/// Answer a keepalive `PING`, echoing its token verbatim.
pub fn pong(token: &str) -> Command {
    Command::Pong(token.to_owned())
}

/// Disconnect from the server.
pub fn quit(message: Option<&str>) -> Command {
    Command::Quit(message.map(str::to_owned))
}
