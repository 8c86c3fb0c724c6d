use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Eject,
    TogglePlay,
    VolumeDelta(i32),
    Seek(f64),
    ToggleShuffle,
    ToggleRepeat,
    ToggleMute,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("invalid argument for `{command}`: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (name, argument) = match input.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (input, None),
        };

        let command = match (name.to_ascii_lowercase().as_str(), argument) {
            ("play", None) => Command::Play,
            ("pause", None) => Command::Pause,
            ("stop", None) => Command::Stop,
            ("next", None) => Command::Next,
            ("prev" | "previous", None) => Command::Previous,
            ("eject", None) => Command::Eject,
            ("toggle", None) => Command::TogglePlay,
            ("shuffle", None) => Command::ToggleShuffle,
            ("repeat", None) => Command::ToggleRepeat,
            ("mute", None) => Command::ToggleMute,
            ("volume", Some(value)) => value
                .trim_start_matches('+')
                .parse()
                .map(Command::VolumeDelta)
                .map_err(|_| ParseCommandError::InvalidArgument {
                    command: "volume",
                    value: value.to_string(),
                })?,
            ("seek", Some(value)) => match value.parse::<f64>() {
                Ok(seconds) if seconds.is_finite() => Command::Seek(seconds),
                _ => {
                    return Err(ParseCommandError::InvalidArgument {
                        command: "seek",
                        value: value.to_string(),
                    })
                }
            },
            _ => return Err(ParseCommandError::Unknown(input.to_string())),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Play => f.write_str("play"),
            Command::Pause => f.write_str("pause"),
            Command::Stop => f.write_str("stop"),
            Command::Next => f.write_str("next"),
            Command::Previous => f.write_str("prev"),
            Command::Eject => f.write_str("eject"),
            Command::TogglePlay => f.write_str("toggle"),
            Command::VolumeDelta(delta) => write!(f, "volume:{delta:+}"),
            Command::Seek(seconds) => write!(f, "seek:{seconds}"),
            Command::ToggleShuffle => f.write_str("shuffle"),
            Command::ToggleRepeat => f.write_str("repeat"),
            Command::ToggleMute => f.write_str("mute"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands() {
        assert_eq!("play".parse(), Ok(Command::Play));
        assert_eq!(" Previous ".parse(), Ok(Command::Previous));
        assert_eq!("prev".parse(), Ok(Command::Previous));
        assert_eq!("TOGGLE".parse(), Ok(Command::TogglePlay));
        assert_eq!("mute".parse(), Ok(Command::ToggleMute));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!("volume:+5".parse(), Ok(Command::VolumeDelta(5)));
        assert_eq!("volume:-10".parse(), Ok(Command::VolumeDelta(-10)));
        assert_eq!("seek:42.5".parse(), Ok(Command::Seek(42.5)));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            "rewind".parse::<Command>(),
            Err(ParseCommandError::Unknown("rewind".to_string()))
        );
        assert!(matches!(
            "volume:loud".parse::<Command>(),
            Err(ParseCommandError::InvalidArgument { command: "volume", .. })
        ));
        assert!("seek:inf".parse::<Command>().is_err());
        assert!("play:now".parse::<Command>().is_err());
        assert!("volume".parse::<Command>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for command in [Command::Stop, Command::VolumeDelta(5), Command::VolumeDelta(-5), Command::Seek(3.25)] {
            assert_eq!(command.to_string().parse(), Ok(command));
        }
    }
}
