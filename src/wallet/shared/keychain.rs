use crate::error::WalletError;
use bitcoin::bip32::{ChildNumber, Xpriv};
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::{Address, Network, PrivateKey, PublicKey};
use std::collections::HashMap;
use zeroize::Zeroizing;

/// Receive chain index in the BIP84 path (`m/84'/coin'/0'/0/i`).
pub const RECEIVE_CHAIN: u32 = 0;
/// Change chain index (`m/84'/coin'/0'/1/i`); disjoint from receive.
pub const CHANGE_CHAIN: u32 = 1;

/// Private keys needed to sign a specific set of addresses.
///
/// Ephemeral: computed on demand per send, never persisted, and the WIF
/// material is zeroized when the table drops.
#[derive(Debug)]
pub struct KeyTable {
    keys: HashMap<String, Zeroizing<String>>,
}

impl KeyTable {
    pub fn get(&self, address: &str) -> Option<&str> {
        self.keys.get(address).map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Deterministic BIP84 keychain for one wallet.
///
/// Pure derivation: no method here mutates wallet state. Cursors over the
/// two chains live in the wallet's persisted state.
#[derive(Debug)]
pub struct Keychain {
    master: Xpriv,
    network: Network,
    secp: Secp256k1<All>,
}

impl Keychain {
    pub fn from_mnemonic(mnemonic: &str, network: Network) -> Result<Self, WalletError> {
        let mnemonic = bip39::Mnemonic::parse(mnemonic)
            .map_err(|e| WalletError::Keychain(format!("Invalid mnemonic: {}", e)))?;
        let seed = mnemonic.to_seed("");
        let master = Xpriv::new_master(network, &seed)
            .map_err(|e| WalletError::Keychain(e.to_string()))?;
        Ok(Self {
            master,
            network,
            secp: Secp256k1::new(),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn receive_address(&self, index: u32) -> Result<Address, WalletError> {
        self.address_at(RECEIVE_CHAIN, index)
    }

    pub fn change_address(&self, index: u32) -> Result<Address, WalletError> {
        self.address_at(CHANGE_CHAIN, index)
    }

    /// Returns exactly the subset of private keys needed to sign the
    /// requested addresses, scanning the issued portion of both chains.
    /// Fails if any address is not derivable from this keychain.
    pub fn key_table(
        &self,
        addresses: &[String],
        receive_count: u32,
        change_count: u32,
    ) -> Result<KeyTable, WalletError> {
        let mut derived: HashMap<String, Zeroizing<String>> = HashMap::new();
        for index in 0..receive_count {
            let addr = self.address_at(RECEIVE_CHAIN, index)?;
            let key = self.private_key_at(RECEIVE_CHAIN, index)?;
            derived.insert(addr.to_string(), Zeroizing::new(key.to_wif()));
        }
        for index in 0..change_count {
            let addr = self.address_at(CHANGE_CHAIN, index)?;
            let key = self.private_key_at(CHANGE_CHAIN, index)?;
            derived.insert(addr.to_string(), Zeroizing::new(key.to_wif()));
        }

        let mut keys = HashMap::with_capacity(addresses.len());
        for address in addresses {
            match derived.remove(address) {
                Some(key) => {
                    keys.insert(address.clone(), key);
                }
                None => {
                    return Err(WalletError::KeyDerivationFailed(format!(
                        "Address {} is not derivable from this wallet's keychain",
                        address
                    )));
                }
            }
        }
        Ok(KeyTable { keys })
    }

    fn address_at(&self, chain: u32, index: u32) -> Result<Address, WalletError> {
        let key = self.private_key_at(chain, index)?;
        let pubkey = PublicKey::from_private_key(&self.secp, &key);
        let compressed = CompressedPublicKey::try_from(pubkey)
            .map_err(|e| WalletError::Keychain(e.to_string()))?;
        Ok(Address::p2wpkh(&compressed, self.network))
    }

    fn private_key_at(&self, chain: u32, index: u32) -> Result<PrivateKey, WalletError> {
        let coin = match self.network {
            Network::Bitcoin => 0,
            _ => 1,
        };
        let path = [
            ChildNumber::from_hardened_idx(84),
            ChildNumber::from_hardened_idx(coin),
            ChildNumber::from_hardened_idx(0),
            ChildNumber::from_normal_idx(chain),
            ChildNumber::from_normal_idx(index),
        ];
        let mut resolved = Vec::with_capacity(path.len());
        for child in path {
            resolved.push(child.map_err(|e| WalletError::Keychain(e.to_string()))?);
        }
        let derived = self
            .master
            .derive_priv(&self.secp, &resolved)
            .map_err(|e| WalletError::Keychain(e.to_string()))?;
        Ok(PrivateKey::new(derived.private_key, self.network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn keychain() -> Keychain {
        Keychain::from_mnemonic(MNEMONIC, Network::Signet).expect("valid mnemonic")
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = keychain().receive_address(0).unwrap();
        let b = keychain().receive_address(0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn receive_and_change_chains_are_disjoint() {
        let kc = keychain();
        let receive = kc.receive_address(0).unwrap();
        let change = kc.change_address(0).unwrap();
        assert_ne!(receive, change);
    }

    #[test]
    fn key_table_returns_exact_subset() {
        let kc = keychain();
        let wanted = vec![
            kc.receive_address(1).unwrap().to_string(),
            kc.change_address(0).unwrap().to_string(),
        ];
        let table = kc.key_table(&wanted, 5, 5).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.get(&wanted[0]).is_some());
        assert!(table.get(&wanted[1]).is_some());
    }

    #[test]
    fn key_table_rejects_foreign_address() {
        let kc = keychain();
        let foreign = vec!["tb1qforeignaddressxxxxxxxxxxxxxxxxxxxxxxxxx".to_string()];
        let err = kc.key_table(&foreign, 5, 5).unwrap_err();
        assert!(matches!(err, WalletError::KeyDerivationFailed(_)));
    }

    #[test]
    fn invalid_mnemonic_is_rejected() {
        let err = Keychain::from_mnemonic("not a mnemonic", Network::Signet).unwrap_err();
        assert!(matches!(err, WalletError::Keychain(_)));
    }
}
