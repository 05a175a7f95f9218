use std::fmt;

use super::types::{Command, Trailing};
use super::util::{write_cmd, write_cmd_freeform};

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (args, trailing) = self.parts();
        match trailing {
            Trailing::Always => write_cmd_freeform(f, self.verb(), &args),
            Trailing::IfNeeded => write_cmd(f, self.verb(), &args),
        }
    }
}
