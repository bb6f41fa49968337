//! Task references typed on the command line

use uuid::Uuid;

/// A task named by its full UUID or by a unique prefix of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrPrefix {
    Full(Uuid),
    Prefix(String),
}

impl IdOrPrefix {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        Uuid::parse_str(input)
            .map(IdOrPrefix::Full)
            .unwrap_or_else(|_| IdOrPrefix::Prefix(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_uuid_is_not_a_prefix() {
        let raw = "7a6f1c52-8f1e-4d8a-9a49-0d6c2f0b5e11";
        assert_eq!(IdOrPrefix::parse(raw), IdOrPrefix::Full(raw.parse().unwrap()));
    }

    #[test]
    fn test_short_input_is_a_prefix() {
        assert_eq!(IdOrPrefix::parse(" 7a6f "), IdOrPrefix::Prefix("7a6f".to_string()));
    }
}
