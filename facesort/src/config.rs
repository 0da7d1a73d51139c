use std::str::FromStr;

use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    // The deployment template sets the bucket variables in lowercase, hence
    // the explicit names.
    #[envconfig(from = "database_bucket")]
    pub database_bucket: NonEmptyString,

    #[envconfig(from = "reference_bucket")]
    pub reference_bucket: NonEmptyString,

    /// Lowest similarity (percent) the comparison service is asked to report.
    #[envconfig(from = "SIMILARITY_THRESHOLD", default = "90")]
    pub similarity_threshold: f32,

    /// Matches strictly above this get copied into a per-person folder.
    #[envconfig(from = "RELOCATION_THRESHOLD", default = "95")]
    pub relocation_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_non_empty_strings_only() {
        assert_eq!(
            "portraits".parse::<NonEmptyString>().map(|s| s.0),
            Ok("portraits".to_owned())
        );
        assert_eq!("".parse::<NonEmptyString>().map(|s| s.0), Err(StringIsEmptyError));
    }

    // One test drives the whole matrix so the process environment is never
    // mutated from two tests at once.
    #[test]
    fn bucket_variables_are_required_and_must_be_non_empty() {
        std::env::remove_var("database_bucket");
        std::env::remove_var("reference_bucket");
        assert!(matches!(
            Config::init_from_env(),
            Err(envconfig::Error::EnvVarMissing { .. })
        ));

        std::env::set_var("database_bucket", "candidates");
        assert!(matches!(
            Config::init_from_env(),
            Err(envconfig::Error::EnvVarMissing { .. })
        ));

        std::env::set_var("reference_bucket", "");
        assert!(matches!(
            Config::init_from_env(),
            Err(envconfig::Error::ParseError { .. })
        ));

        std::env::set_var("reference_bucket", "portraits");
        let config = Config::init_from_env().expect("both buckets are set");
        assert_eq!(config.database_bucket.as_str(), "candidates");
        assert_eq!(config.reference_bucket.as_str(), "portraits");
        assert_eq!(config.similarity_threshold, 90.0);
        assert_eq!(config.relocation_threshold, 95.0);

        std::env::remove_var("database_bucket");
        std::env::remove_var("reference_bucket");
    }
}
