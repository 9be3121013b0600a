use std::fmt;

/// Coarse classification of an AWS CLI failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing, expired or insufficient credentials
    Auth,
    /// Function, bucket, key or distribution does not exist
    NotFound,
    /// Endpoint unreachable or connection dropped
    Network,
    Other,
}

const AUTH_MARKERS: &[&str] = &[
    "AccessDenied",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "SignatureDoesNotMatch",
    "AuthFailure",
    "Unable to locate credentials",
    "is not authorized to perform",
    "(403)",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFoundException",
    "NoSuchBucket",
    "NoSuchDistribution",
    "NoSuchInvalidation",
    "NoSuchKey",
    "(404)",
    "Function not found",
];

const NETWORK_MARKERS: &[&str] = &[
    "Could not connect to the endpoint URL",
    "Connect timeout on endpoint URL",
    "Read timeout on endpoint URL",
    "Connection was closed before we received a valid response",
    "Temporary failure in name resolution",
    "Name or service not known",
];

impl FailureKind {
    /// Classify AWS CLI stderr by well-known error codes and messages.
    pub fn classify(stderr: &str) -> Self {
        let matches = |markers: &[&str]| markers.iter().any(|m| stderr.contains(m));
        if matches(AUTH_MARKERS) {
            Self::Auth
        } else if matches(NOT_FOUND_MARKERS) {
            Self::NotFound
        } else if matches(NETWORK_MARKERS) {
            Self::Network
        } else {
            Self::Other
        }
    }

    /// Kind of the first [`AwsError`] in an error's source chain.
    pub fn of(err: &(dyn std::error::Error + 'static)) -> Self {
        std::iter::successors(Some(err), |e| e.source())
            .find_map(|e| e.downcast_ref::<AwsError>())
            .map_or(Self::Other, AwsError::kind)
    }

    /// What the operator should look at next.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::Auth => Some("check credentials: aws sts get-caller-identity (or set AWS_PROFILE)"),
            Self::NotFound => Some("check names in conveyor.toml, or run terraform apply in infra/"),
            Self::Network => Some("check network access to the AWS endpoints"),
            Self::Other => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auth => "auth",
            Self::NotFound => "not found",
            Self::Network => "network",
            Self::Other => "error",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error("aws CLI not found — install: https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html")]
    NotFound { source: std::io::Error },

    #[error("aws command failed [{kind}]: {args:?}\n{stderr}")]
    CommandFailed {
        args: Vec<String>,
        stderr: String,
        kind: FailureKind,
    },

    #[error("aws output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("unexpected aws output for {args:?}")]
    InvalidJson {
        args: Vec<String>,
        source: serde_json::Error,
    },
}

impl AwsError {
    /// A failed command, classified from its stderr.
    pub fn failed(args: &[String], stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self::CommandFailed {
            args: args.to_vec(),
            kind: FailureKind::classify(&stderr),
            stderr,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::CommandFailed { kind, .. } => *kind,
            _ => FailureKind::Other,
        }
    }
}
