//! Bech32m address encoding for segwit witness programs.

use bech32::{u5, ToBase32, Variant};

use crate::errors::CommitmentError;

/// The network an address is issued for; selects the human-readable
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Mainnet, `bc`.
    Bitcoin,
    /// Testnet, `tb`.
    Testnet,
    /// Signet, `tb`.
    Signet,
    /// Regtest, `bcrt`.
    Regtest,
}

impl Network {
    /// The human-readable address prefix.
    pub fn hrp(self) -> &'static str {
        match self {
            Network::Bitcoin => "bc",
            Network::Testnet | Network::Signet => "tb",
            Network::Regtest => "bcrt",
        }
    }
}

/// Encodes a witness program as an address. Version 0 uses the original
/// bech32 checksum, later versions the bech32m one.
pub fn program_to_witness(
    network: Network,
    version: u8,
    program: &[u8],
) -> Result<String, CommitmentError> {
    if version > 16 {
        return Err(CommitmentError::WitnessProgram("version exceeds 16"));
    }
    if program.len() < 2 || program.len() > 40 {
        return Err(CommitmentError::WitnessProgram(
            "program must be 2 to 40 bytes",
        ));
    }
    let variant = if version == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    };
    let mut data = vec![u5::try_from_u8(version)?];
    data.extend(program.to_base32());
    Ok(bech32::encode(network.hrp(), data, variant)?)
}

/// The address for a taproot output key (witness version 1).
pub fn p2tr_address(network: Network, output_x: &[u8; 32]) -> Result<String, CommitmentError> {
    program_to_witness(network, 1, output_x)
}
