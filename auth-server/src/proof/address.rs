// auth-server/src/proof/address.rs
use common::models::proof::ProofError;
use std::fmt;
use std::str::FromStr;

/// Raw-form TON account address: workchain id plus 32-byte account hash.
///
/// Wallet connectors report accounts in the raw `workchain:hex` form,
/// e.g. `0:3d5a...`; the friendly base64 form is not accepted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TonAddress {
    pub workchain: i32,
    pub hash: [u8; 32],
}

impl FromStr for TonAddress {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, hash_hex) = s
            .split_once(':')
            .ok_or_else(|| ProofError::Malformed("address missing workchain separator".into()))?;

        let workchain = wc
            .parse::<i32>()
            .map_err(|_| ProofError::Malformed("address workchain is not an integer".into()))?;

        let bytes = hex::decode(hash_hex)
            .map_err(|_| ProofError::Malformed("address hash is not hex".into()))?;

        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ProofError::Malformed("address hash must be 32 bytes".into()))?;

        Ok(Self { workchain, hash })
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_address() {
        let s = format!("0:{}", "ab".repeat(32));
        let address: TonAddress = s.parse().unwrap();
        assert_eq!(address.workchain, 0);
        assert_eq!(address.hash, [0xab; 32]);
        assert_eq!(address.to_string(), s);
    }

    #[test]
    fn test_parse_masterchain_address() {
        let s = format!("-1:{}", "00".repeat(32));
        let address: TonAddress = s.parse().unwrap();
        assert_eq!(address.workchain, -1);
    }

    #[test]
    fn test_reject_malformed_addresses() {
        assert!("no-separator".parse::<TonAddress>().is_err());
        assert!("0:zz".parse::<TonAddress>().is_err());
        assert!(format!("0:{}", "ab".repeat(16)).parse::<TonAddress>().is_err());
        assert!(format!("x:{}", "ab".repeat(32)).parse::<TonAddress>().is_err());
    }
}
