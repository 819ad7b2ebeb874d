use reqwest::StatusCode;
use std::fmt;

/// Non-2xx answer from a CSE endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamStatusError {
    pub endpoint: &'static str,
    pub status: StatusCode,
}

impl fmt::Display for UpstreamStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSE {}: {}", self.endpoint, self.status.as_u16())
    }
}

impl std::error::Error for UpstreamStatusError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_endpoint_and_numeric_status() {
        let err = UpstreamStatusError {
            endpoint: "companyInfoSummery",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(err.to_string(), "CSE companyInfoSummery: 500");
    }
}
