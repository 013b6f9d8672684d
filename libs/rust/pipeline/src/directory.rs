use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A chain account identifier, always held in lowercase so that joins
/// against the directory never miss on casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex characters, got {0}")]
    BadLength(usize),
    #[error("address contains non-hex character `{0}`")]
    BadCharacter(char),
}

impl Address {
    /// Strict parser for user- or config-supplied addresses.
    pub fn parse(raw: &str) -> Result<Self, AddressParseError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or(AddressParseError::MissingPrefix)?;
        if hex.len() != 40 {
            return Err(AddressParseError::BadLength(hex.len()));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AddressParseError::BadCharacter(bad));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Lenient constructor for provider-supplied fields: lowercases and
    /// trims, nothing more. Upstream records occasionally carry empty or
    /// odd address fields and the normalizer must not reject them.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::normalized(&raw)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletCategory {
    DaoTreasury,
    WorkingGroup,
    Endowment,
    Revenue,
    Contract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntry {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ens_name: Option<String>,
    pub label: String,
    pub category: WalletCategory,
    pub manager: String,
}

/// DAO-controlled wallets tracked by the terminal. Loaded once at process
/// start; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct WalletDirectory {
    entries: Vec<WalletEntry>,
}

const ENS_DAO_WALLETS: &[(&str, Option<&str>, &str, WalletCategory, &str)] = &[
    (
        "0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7",
        Some("wallet.ensdao.eth"),
        "DAO Treasury Timelock",
        WalletCategory::DaoTreasury,
        "DAO Governance",
    ),
    (
        "0x4F2083f5fBede34C2714aFfb3105539775f7FE64",
        None,
        "Endowment Fund",
        WalletCategory::Endowment,
        "Karpatkey",
    ),
    (
        "0x2686A8919Df194aA7673244549E68D42C1685d03",
        Some("ecosystem.ensdao.eth"),
        "Ecosystem Working Group",
        WalletCategory::WorkingGroup,
        "Ecosystem Stewards",
    ),
    (
        "0xcD42b4c4D102cc22864e3A1341Bb0529c17fD87d",
        Some("publicgoods.ensdao.eth"),
        "Public Goods Working Group",
        WalletCategory::WorkingGroup,
        "Public Goods Stewards",
    ),
    (
        "0x91c32893216dE3eA0a55ABb9851f581d4503d39b",
        Some("metagov.ensdao.eth"),
        "Meta-Governance Working Group",
        WalletCategory::WorkingGroup,
        "Meta-Governance Stewards",
    ),
    (
        "0x283Af0B28c62C092C9727F1Ee09c02CA627EB7F5",
        None,
        "ETH Registrar Controller",
        WalletCategory::Revenue,
        "Root",
    ),
    (
        "0xC18360217D8F7Ab5e7c516566761Ea12Ce7F9D72",
        Some("token.ensdao.eth"),
        "ENS Token",
        WalletCategory::Contract,
        "Protocol",
    ),
];

impl WalletDirectory {
    pub fn new(entries: Vec<WalletEntry>) -> Self {
        Self { entries }
    }

    /// The default ENS DAO registry.
    pub fn ens_dao() -> Self {
        let entries = ENS_DAO_WALLETS
            .iter()
            .map(|(address, ens_name, label, category, manager)| WalletEntry {
                address: Address::normalized(address),
                ens_name: ens_name.map(str::to_string),
                label: (*label).to_string(),
                category: *category,
                manager: (*manager).to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, address: &Address) -> Option<&WalletEntry> {
        self.entries.iter().find(|entry| &entry.address == address)
    }

    pub fn by_category(&self, category: WalletCategory) -> Vec<&WalletEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .collect()
    }

    pub fn by_manager(&self, manager: &str) -> Vec<&WalletEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.manager.eq_ignore_ascii_case(manager))
            .collect()
    }

    /// The wallet whose datasets anchor the dashboard: the first treasury
    /// entry in the registry.
    pub fn primary_treasury(&self) -> Option<&WalletEntry> {
        self.entries
            .iter()
            .find(|entry| entry.category == WalletCategory::DaoTreasury)
    }

    pub fn entries(&self) -> &[WalletEntry] {
        &self.entries
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter().map(|entry| &entry.address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod directory_tests {
    use super::*;

    #[test]
    fn addresses_are_stored_lowercase() {
        let directory = WalletDirectory::ens_dao();
        for entry in directory.entries() {
            assert_eq!(
                entry.address.as_str(),
                entry.address.as_str().to_lowercase(),
                "{} is not lowercase",
                entry.label
            );
            assert!(entry.address.as_str().starts_with("0x"));
            assert_eq!(entry.address.as_str().len(), 42);
        }
    }

    #[test]
    fn lookup_accepts_mixed_case_input() {
        let directory = WalletDirectory::ens_dao();
        let mixed = Address::parse("0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7").unwrap();
        let entry = directory.lookup(&mixed).expect("timelock should be known");
        assert_eq!(entry.label, "DAO Treasury Timelock");
    }

    #[test]
    fn parse_rejects_malformed_addresses() {
        assert_eq!(
            Address::parse("fe89cc7abb2c4183683ab71653c4cdc9b02d44b7"),
            Err(AddressParseError::MissingPrefix)
        );
        assert_eq!(Address::parse("0x1234"), Err(AddressParseError::BadLength(4)));
        assert!(matches!(
            Address::parse("0xzz89cc7abb2c4183683ab71653c4cdc9b02d44b7"),
            Err(AddressParseError::BadCharacter('z'))
        ));
    }

    #[test]
    fn primary_treasury_is_the_timelock() {
        let directory = WalletDirectory::ens_dao();
        let primary = directory.primary_treasury().unwrap();
        assert_eq!(
            primary.address.as_str(),
            "0xfe89cc7abb2c4183683ab71653c4cdc9b02d44b7"
        );
    }

    #[test]
    fn category_and_manager_lookups() {
        let directory = WalletDirectory::ens_dao();
        assert_eq!(directory.by_category(WalletCategory::WorkingGroup).len(), 3);
        assert_eq!(directory.by_manager("karpatkey").len(), 1);
    }
}
