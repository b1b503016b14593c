use derive_more::From;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    // -- Sources and resolver
    Transport {
        provider: String,
        reason: reqwest::Error,
    },
    HttpStatus {
        provider: String,
        status: u16,
    },
    Decode {
        provider: String,
        reason: String,
    },
    Resolver(String),

    // -- Validation
    InvalidDomain(String),
    UnknownDnsProvider(String),
    CliUsage(String),

    // -- Externals
    #[from]
    Reqwest(reqwest::Error),

    #[from]
    Json(serde_json::Error),

    #[from]
    File(std::io::Error),

    #[from]
    Fmt(std::fmt::Error),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Self::Transport { provider, reason } => {
                write!(fmt, "Can't send request to {provider}: {reason}")
            }
            Self::HttpStatus { provider, status } => {
                write!(fmt, "{provider} returned non-ok status code {status}")
            }
            Self::Decode { provider, reason } => {
                write!(fmt, "Can't decode {provider} response: {reason}")
            }
            Self::Resolver(msg) => write!(fmt, "Resolving error: {msg}"),
            Self::InvalidDomain(domain) => write!(fmt, "{domain} is not a valid domain"),
            Self::UnknownDnsProvider(name) => write!(fmt, "Unknown DNS provider \"{name}\""),
            Self::CliUsage(msg) => write!(fmt, "{msg}"),
            _ => write!(fmt, "{self:?}"),
        }
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
