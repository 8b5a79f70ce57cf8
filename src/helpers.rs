use crate::consts::LOCAL_ENGINE_URL;

/// Where the simulation engine listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    Localhost,
    Custom(String),
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Localhost => LOCAL_ENGINE_URL.to_string(),
            BaseUrl::Custom(url) => url.trim_end_matches('/').to_string(),
        }
    }
}

impl From<&str> for BaseUrl {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | "localhost" | "local" => BaseUrl::Localhost,
            url => BaseUrl::Custom(url.to_string()),
        }
    }
}

/// Format a statistic for display: fixed four decimals.
pub fn format_stat(value: f64) -> String {
    format!("{value:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(BaseUrl::Localhost.get_url(), LOCAL_ENGINE_URL);
        assert_eq!(
            BaseUrl::from("http://engine:8080/").get_url(),
            "http://engine:8080"
        );
        assert_eq!(BaseUrl::from("localhost"), BaseUrl::Localhost);
    }

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(2.0), "2.0000");
        assert_eq!(format_stat(-12.5), "-12.5000");
        assert_eq!(format_stat(1.23456), "1.2346");
    }
}
