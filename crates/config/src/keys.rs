use std::fmt;

use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use clap::Parser;

use crate::ConfigError;

/// Key material for the submitter roles.
///
/// Either one private key per enabled role, or a mnemonic with one HD derivation path per
/// enabled role. The two roles must never share a key.
#[derive(Clone, Default, Parser)]
pub struct KeyOpts {
    /// The private key of the sequencer batch submitter
    #[clap(long = "keys.sequencer-private-key", env = "BSS_SEQUENCER_PRIVATE_KEY", hide_env_values = true)]
    pub sequencer_private_key: Option<PrivateKeySigner>,
    /// The private key of the state root proposer
    #[clap(long = "keys.proposer-private-key", env = "BSS_PROPOSER_PRIVATE_KEY", hide_env_values = true)]
    pub proposer_private_key: Option<PrivateKeySigner>,
    /// A BIP-39 mnemonic to derive both role keys from
    #[clap(long = "keys.mnemonic", env = "BSS_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,
    /// HD derivation path of the sequencer key, e.g. `m/44'/60'/0'/0/1`
    #[clap(long = "keys.sequencer-hd-path", env = "BSS_SEQUENCER_HD_PATH")]
    pub sequencer_hd_path: Option<String>,
    /// HD derivation path of the proposer key, e.g. `m/44'/60'/0'/0/2`
    #[clap(long = "keys.proposer-hd-path", env = "BSS_PROPOSER_HD_PATH")]
    pub proposer_hd_path: Option<String>,
}

impl fmt::Debug for KeyOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyOpts")
            .field("sequencer", &self.sequencer_private_key.as_ref().map(|k| k.address()))
            .field("proposer", &self.proposer_private_key.as_ref().map(|k| k.address()))
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("sequencer_hd_path", &self.sequencer_hd_path)
            .field("proposer_hd_path", &self.proposer_hd_path)
            .finish()
    }
}

/// The signers of the enabled roles.
#[derive(Debug, Clone, Default)]
pub struct RoleSigners {
    /// The sequencer batch submitter key, if the role is enabled.
    pub sequencer: Option<PrivateKeySigner>,
    /// The state root proposer key, if the role is enabled.
    pub proposer: Option<PrivateKeySigner>,
}

impl KeyOpts {
    /// Resolves the signers of the enabled roles, enforcing the key material rules.
    pub fn signers(&self, sequencer: bool, proposer: bool) -> Result<RoleSigners, ConfigError> {
        let signers = match &self.mnemonic {
            Some(mnemonic) => {
                if self.sequencer_private_key.is_some() || self.proposer_private_key.is_some() {
                    return Err(ConfigError::MnemonicAndPrivateKey);
                }

                if sequencer &&
                    proposer &&
                    self.sequencer_hd_path.is_some() &&
                    self.sequencer_hd_path == self.proposer_hd_path
                {
                    return Err(ConfigError::SameHdPath);
                }

                RoleSigners {
                    sequencer: sequencer
                        .then(|| derive(mnemonic, self.sequencer_hd_path.as_deref(), "sequencer"))
                        .transpose()?,
                    proposer: proposer
                        .then(|| derive(mnemonic, self.proposer_hd_path.as_deref(), "proposer"))
                        .transpose()?,
                }
            }
            None => RoleSigners {
                sequencer: sequencer
                    .then(|| {
                        self.sequencer_private_key
                            .clone()
                            .ok_or(ConfigError::MissingPrivateKey("sequencer"))
                    })
                    .transpose()?,
                proposer: proposer
                    .then(|| {
                        self.proposer_private_key
                            .clone()
                            .ok_or(ConfigError::MissingPrivateKey("proposer"))
                    })
                    .transpose()?,
            },
        };

        if let (Some(seq), Some(prop)) = (&signers.sequencer, &signers.proposer) {
            if seq.address() == prop.address() {
                return Err(ConfigError::SameKey);
            }
        }

        Ok(signers)
    }
}

fn derive(
    mnemonic: &str,
    path: Option<&str>,
    role: &'static str,
) -> Result<PrivateKeySigner, ConfigError> {
    let path = path.ok_or(ConfigError::MissingHdPath(role))?;
    let signer =
        MnemonicBuilder::<English>::default().phrase(mnemonic).derivation_path(path)?.build()?;
    Ok(signer)
}
