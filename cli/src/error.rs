use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Harrier(harrier::Error),
    Io(std::io::Error),
    InvalidArgument(&'static str),
}

impl From<harrier::Error> for CliError {
    fn from(e: harrier::Error) -> Self {
        Self::Harrier(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::Harrier(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::InvalidArgument(name) => write!(f, "invalid value for '--{}'", name),
        }
    }
}
