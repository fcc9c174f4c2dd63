//! Off-chain half of the fee sweep: find every token account of the mint that
//! holds withheld transfer fees and plan withdrawal batches over them.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;
use serde::Serialize;
use solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use spl_token_2022::extension::transfer_fee::TransferFeeAmount;
use spl_token_2022::extension::{BaseStateWithExtensions, StateWithExtensions};
use spl_token_2022::state::Account as TokenAccount2022;

/// Upper bound of `getMultipleAccounts`.
pub const MAX_PAGE_SIZE: usize = 100;

/// Token accounts are enumerated one shard at a time, keyed by the first byte
/// of the account owner.
pub const SHARD_COUNT: u16 = 256;

const OWNER_OFFSET: usize = 32;

/// Where the scanner reads accounts from.
pub trait AccountSource {
    /// Addresses of the token accounts of `mint` whose owner starts with the
    /// byte `shard`, in any order.
    fn account_keys(&self, mint: &Pubkey, shard: u8) -> Result<Vec<Pubkey>>;

    /// Raw data for `keys`, position for position. Missing accounts are `None`.
    fn account_data(&self, keys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>>;
}

pub struct RpcAccountSource<'a> {
    client: &'a RpcClient,
    commitment: CommitmentConfig,
}

impl<'a> RpcAccountSource<'a> {
    pub fn new(client: &'a RpcClient, commitment: CommitmentConfig) -> Self {
        Self { client, commitment }
    }
}

impl AccountSource for RpcAccountSource<'_> {
    fn account_keys(&self, mint: &Pubkey, shard: u8) -> Result<Vec<Pubkey>> {
        // The mint sits at offset 0 of every token account and the owner at
        // 32; an empty slice keeps the response to addresses only.
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(0, mint.as_ref())),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(OWNER_OFFSET, &[shard])),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                data_slice: Some(UiDataSliceConfig {
                    offset: 0,
                    length: 0,
                }),
                min_context_slot: None,
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .client
            .get_program_accounts_with_config(&spl_token_2022::id(), config)
            .with_context(|| format!("Failed to enumerate token accounts in shard {}", shard))?;
        Ok(accounts.into_iter().map(|(key, _)| key).collect())
    }

    fn account_data(&self, keys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>> {
        let accounts = self
            .client
            .get_multiple_accounts_with_commitment(keys, self.commitment)
            .context("Failed to fetch token accounts")?
            .value;
        Ok(accounts
            .into_iter()
            .map(|account| account.map(|account| account.data))
            .collect())
    }
}

/// Resume point of a scan: owner shard, then position inside the shard's
/// sorted account list. Written as `SHARD:OFFSET`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanCursor {
    pub shard: u16,
    pub offset: usize,
}

impl ScanCursor {
    pub fn is_done(&self) -> bool {
        self.shard >= SHARD_COUNT
    }
}

impl fmt::Display for ScanCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.shard, self.offset)
    }
}

impl FromStr for ScanCursor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (shard, offset) = value.split_once(':').unwrap_or((value, "0"));
        let shard: u16 = shard
            .trim()
            .parse()
            .with_context(|| format!("Invalid shard in {}", value))?;
        if shard >= SHARD_COUNT {
            return Err(anyhow!("Shard must be below {}", SHARD_COUNT));
        }
        let offset = offset
            .trim()
            .parse()
            .with_context(|| format!("Invalid offset in {}", value))?;
        Ok(Self { shard, offset })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WithheldAccount {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub owner: Pubkey,
    pub withheld: u64,
}

fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&key.to_string())
}

/// Owner and withheld amount of a token account of `mint`, or `None` when the
/// bytes are not such an account or carry no transfer fee extension.
pub fn decode_withheld(data: &[u8], mint: &Pubkey) -> Option<(Pubkey, u64)> {
    let state = StateWithExtensions::<TokenAccount2022>::unpack(data).ok()?;
    if state.base.mint != *mint {
        return None;
    }
    let fee_amount = state.get_extension::<TransferFeeAmount>().ok()?;
    Some((state.base.owner, u64::from(fee_amount.withheld_amount)))
}

/// Paginated, resumable walk over the mint's token accounts. Neither the
/// enumeration nor the data fetch assumes the whole set fits in one response.
pub struct FeeScanner<'a, S: AccountSource> {
    source: &'a S,
    mint: Pubkey,
    page_size: usize,
    cursor: ScanCursor,
    shard_keys: Option<Vec<Pubkey>>,
    scanned: usize,
    skipped: usize,
}

impl<'a, S: AccountSource> FeeScanner<'a, S> {
    pub fn new(source: &'a S, mint: Pubkey, page_size: usize) -> Result<Self> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(anyhow!("Page size must be between 1 and {}", MAX_PAGE_SIZE));
        }
        Ok(Self {
            source,
            mint,
            page_size,
            cursor: ScanCursor::default(),
            shard_keys: None,
            scanned: 0,
            skipped: 0,
        })
    }

    pub fn start_at(mut self, cursor: ScanCursor) -> Self {
        self.cursor = cursor;
        self.shard_keys = None;
        self
    }

    /// Next position to fetch; pass it to `start_at` to resume.
    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn load_shard(&mut self) -> Result<&[Pubkey]> {
        if self.shard_keys.is_none() {
            let shard = self.cursor.shard as u8;
            let mut keys = self.source.account_keys(&self.mint, shard)?;
            keys.sort();
            keys.dedup();
            log::debug!("Shard {} holds {} token accounts", shard, keys.len());
            self.shard_keys = Some(keys);
        }
        Ok(self.shard_keys.as_deref().unwrap_or_default())
    }

    /// Fetches the next page. The cursor only moves once the page is decoded.
    pub fn next_page(&mut self) -> Result<Option<Vec<WithheldAccount>>> {
        let page: Vec<Pubkey> = loop {
            if self.cursor.is_done() {
                return Ok(None);
            }
            let offset = self.cursor.offset;
            let page_size = self.page_size;
            let keys = self.load_shard()?;
            if offset < keys.len() {
                let end = (offset + page_size).min(keys.len());
                break keys[offset..end].to_vec();
            }
            self.cursor = ScanCursor {
                shard: self.cursor.shard + 1,
                offset: 0,
            };
            self.shard_keys = None;
        };

        let data = self.source.account_data(&page)?;
        if data.len() != page.len() {
            return Err(anyhow!(
                "Expected {} accounts, got {}",
                page.len(),
                data.len()
            ));
        }

        let mut found = Vec::new();
        for (address, data) in page.iter().zip(data) {
            let decoded = data.as_deref().and_then(|bytes| decode_withheld(bytes, &self.mint));
            match decoded {
                Some((owner, withheld)) if withheld > 0 => found.push(WithheldAccount {
                    address: *address,
                    owner,
                    withheld,
                }),
                Some(_) => {}
                None => {
                    log::debug!("Skipping {}: not a fee-bearing account of the mint", address);
                    self.skipped += 1;
                }
            }
        }
        log::debug!("Scanned {} accounts at {}, {} with fees", page.len(), self.cursor, found.len());
        self.cursor.offset += page.len();
        self.scanned += page.len();
        Ok(Some(found))
    }

    pub fn scan(&mut self) -> Result<Vec<WithheldAccount>> {
        let mut found = Vec::new();
        loop {
            let cursor = self.cursor;
            let page = self.next_page().with_context(|| {
                format!("Scan stopped at {}; resume with --start-at {}", cursor, cursor)
            })?;
            match page {
                Some(page) => found.extend(page),
                None => break,
            }
        }
        log::info!(
            "Scanned {} token accounts for mint {}, {} with fees",
            self.scanned,
            self.mint,
            found.len()
        );
        Ok(found)
    }
}

/// Splits eligible accounts into withdrawal batches of at most `batch_size`.
pub fn plan_batches(accounts: &[WithheldAccount], batch_size: usize) -> Vec<Vec<WithheldAccount>> {
    accounts
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

pub fn total_withheld(accounts: &[WithheldAccount]) -> Result<u64> {
    accounts.iter().try_fold(0u64, |total, account| {
        total
            .checked_add(account.withheld)
            .ok_or_else(|| anyhow!("Withheld total overflow"))
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SweptBatch {
    pub sources: usize,
    pub amount: u64,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    NothingToWithdraw { scanned: usize, skipped: usize },
    Planned { total: u64, batches: Vec<SweptBatch> },
    Swept { total: u64, batches: Vec<SweptBatch> },
}

/// Fee Token-2022 withholds on a transfer of `amount`: the basis-point share
/// rounded up, capped at `maximum_fee`.
pub fn expected_transfer_fee(amount: u64, basis_points: u16, maximum_fee: u64) -> u64 {
    if amount == 0 || basis_points == 0 {
        return 0;
    }
    let numerator = u128::from(amount) * u128::from(basis_points);
    let fee = (numerator + 9_999) / 10_000;
    u64::try_from(fee).map_or(maximum_fee, |fee| fee.min(maximum_fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token_2022::extension::{BaseStateWithExtensionsMut, ExtensionType, StateWithExtensionsMut};
    use spl_token_2022::state::AccountState;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn token_account_bytes(mint: &Pubkey, owner: &Pubkey, withheld: Option<u64>) -> Vec<u8> {
        let extensions: Vec<ExtensionType> = withheld
            .map(|_| vec![ExtensionType::TransferFeeAmount])
            .unwrap_or_default();
        let len = ExtensionType::try_calculate_account_len::<TokenAccount2022>(&extensions).unwrap();
        let mut data = vec![0u8; len];
        let mut state = StateWithExtensionsMut::<TokenAccount2022>::unpack_uninitialized(&mut data).unwrap();
        state.base = TokenAccount2022 {
            mint: *mint,
            owner: *owner,
            amount: 5_000,
            state: AccountState::Initialized,
            ..Default::default()
        };
        state.pack_base();
        state.init_account_type().unwrap();
        if let Some(withheld) = withheld {
            let extension = state.init_extension::<TransferFeeAmount>(true).unwrap();
            extension.withheld_amount = withheld.into();
        }
        data
    }

    #[derive(Default)]
    struct MemorySource {
        accounts: HashMap<Pubkey, (Pubkey, Vec<u8>)>,
        fail_on_call: Option<usize>,
        fail_on_shard: Option<u8>,
        calls: RefCell<usize>,
        shard_calls: RefCell<Vec<u8>>,
    }

    impl MemorySource {
        fn insert(&mut self, data: Vec<u8>) -> Pubkey {
            self.insert_owned(Pubkey::new_unique(), data)
        }

        fn insert_owned(&mut self, owner: Pubkey, data: Vec<u8>) -> Pubkey {
            let key = Pubkey::new_unique();
            self.accounts.insert(key, (owner, data));
            key
        }
    }

    impl AccountSource for MemorySource {
        fn account_keys(&self, _mint: &Pubkey, shard: u8) -> Result<Vec<Pubkey>> {
            self.shard_calls.borrow_mut().push(shard);
            if self.fail_on_shard == Some(shard) {
                return Err(anyhow!("getProgramAccounts timed out"));
            }
            Ok(self
                .accounts
                .iter()
                .filter(|(_, (owner, _))| owner.to_bytes()[0] == shard)
                .map(|(key, _)| *key)
                .collect())
        }

        fn account_data(&self, keys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>> {
            let call = *self.calls.borrow();
            *self.calls.borrow_mut() += 1;
            if self.fail_on_call == Some(call) {
                return Err(anyhow!("rpc unavailable"));
            }
            Ok(keys
                .iter()
                .map(|key| self.accounts.get(key).map(|(_, data)| data.clone()))
                .collect())
        }
    }

    #[test]
    fn fee_on_ten_tokens_at_twenty_basis_points() {
        assert_eq!(expected_transfer_fee(10_000_000_000, 20, 1_000_000_000), 20_000_000);
        assert_eq!(10_000_000_000 - expected_transfer_fee(10_000_000_000, 20, 1_000_000_000), 9_980_000_000);
    }

    #[test]
    fn fee_rounds_up_and_caps() {
        assert_eq!(expected_transfer_fee(1, 20, 1_000), 1);
        assert_eq!(expected_transfer_fee(0, 20, 1_000), 0);
        assert_eq!(expected_transfer_fee(1_000, 0, 1_000), 0);
        assert_eq!(expected_transfer_fee(u64::MAX, 10_000, 42), 42);
    }

    #[test]
    fn decodes_withheld_or_skips() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let with_fee = token_account_bytes(&mint, &owner, Some(20_000_000));
        assert_eq!(decode_withheld(&with_fee, &mint), Some((owner, 20_000_000)));

        let other_mint = token_account_bytes(&Pubkey::new_unique(), &owner, Some(3));
        assert_eq!(decode_withheld(&other_mint, &mint), None);

        let no_extension = token_account_bytes(&mint, &owner, None);
        assert_eq!(decode_withheld(&no_extension, &mint), None);

        assert_eq!(decode_withheld(&[1u8; 17], &mint), None);
    }

    #[test]
    fn scan_keeps_only_positive_balances() {
        let mint = Pubkey::new_unique();
        let mut source = MemorySource::default();
        let a = source.insert(token_account_bytes(&mint, &Pubkey::new_unique(), Some(7)));
        source.insert(token_account_bytes(&mint, &Pubkey::new_unique(), Some(0)));
        source.insert(vec![9u8; 40]);
        let b = source.insert(token_account_bytes(&mint, &Pubkey::new_unique(), Some(11)));

        let mut scanner = FeeScanner::new(&source, mint, 2).unwrap();
        let found = scanner.scan().unwrap();

        let mut addresses: Vec<Pubkey> = found.iter().map(|account| account.address).collect();
        addresses.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(addresses, expected);
        assert_eq!(total_withheld(&found).unwrap(), 18);
        assert_eq!(scanner.skipped(), 1);
        assert_eq!(scanner.scanned(), 4);
        assert!(scanner.cursor().is_done());
    }

    #[test]
    fn failed_page_can_be_resumed() {
        let mint = Pubkey::new_unique();
        let mut source = MemorySource {
            fail_on_call: Some(1),
            ..MemorySource::default()
        };
        let owner = Pubkey::new_from_array([7; 32]);
        for withheld in 1..=5u64 {
            source.insert_owned(owner, token_account_bytes(&mint, &owner, Some(withheld)));
        }

        let mut scanner = FeeScanner::new(&source, mint, 2).unwrap();
        let first = scanner.next_page().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert!(scanner.next_page().is_err());
        assert_eq!(scanner.cursor(), ScanCursor { shard: 7, offset: 2 });

        let mut resumed = FeeScanner::new(&source, mint, 2).unwrap().start_at(scanner.cursor());
        let rest = resumed.scan().unwrap();
        assert_eq!(rest.len(), 3);
        assert_eq!(total_withheld(&first).unwrap() + total_withheld(&rest).unwrap(), 15);
    }

    #[test]
    fn enumeration_is_paged_by_owner_shard() {
        let mint = Pubkey::new_unique();
        let mut source = MemorySource::default();
        for first_byte in [0u8, 3, 3, 200, 255] {
            let mut owner = Pubkey::new_unique().to_bytes();
            owner[0] = first_byte;
            let owner = Pubkey::new_from_array(owner);
            source.insert_owned(owner, token_account_bytes(&mint, &owner, Some(1)));
        }

        let mut scanner = FeeScanner::new(&source, mint, MAX_PAGE_SIZE).unwrap();
        let found = scanner.scan().unwrap();
        assert_eq!(found.len(), 5);

        let shard_calls = source.shard_calls.borrow();
        assert_eq!(shard_calls.len(), SHARD_COUNT as usize);
        assert_eq!(shard_calls.first(), Some(&0));
        assert_eq!(shard_calls.last(), Some(&255));
        // one data fetch per non-empty shard
        assert_eq!(*source.calls.borrow(), 4);
    }

    #[test]
    fn failed_enumeration_resumes_at_its_shard() {
        let mint = Pubkey::new_unique();
        let mut source = MemorySource {
            fail_on_shard: Some(9),
            ..MemorySource::default()
        };
        let low = Pubkey::new_from_array([2; 32]);
        let high = Pubkey::new_from_array([9; 32]);
        source.insert_owned(low, token_account_bytes(&mint, &low, Some(4)));
        source.insert_owned(high, token_account_bytes(&mint, &high, Some(6)));

        let mut scanner = FeeScanner::new(&source, mint, 10).unwrap();
        let error = scanner.scan().unwrap_err();
        assert!(format!("{:#}", error).contains("--start-at 9:0"));
        let cursor = scanner.cursor();
        assert_eq!(cursor, ScanCursor { shard: 9, offset: 0 });

        source.fail_on_shard = None;
        let rest = FeeScanner::new(&source, mint, 10)
            .unwrap()
            .start_at(cursor)
            .scan()
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].owner, high);
    }

    #[test]
    fn cursor_parses_shard_and_offset() {
        assert_eq!("12:40".parse::<ScanCursor>().unwrap(), ScanCursor { shard: 12, offset: 40 });
        assert_eq!("5".parse::<ScanCursor>().unwrap(), ScanCursor { shard: 5, offset: 0 });
        assert!("256".parse::<ScanCursor>().is_err());
        assert!("a:1".parse::<ScanCursor>().is_err());
        assert_eq!(ScanCursor { shard: 3, offset: 8 }.to_string(), "3:8");
    }

    #[test]
    fn empty_mint_has_nothing_to_scan() {
        let source = MemorySource::default();
        let mut scanner = FeeScanner::new(&source, Pubkey::new_unique(), 100).unwrap();
        assert!(scanner.scan().unwrap().is_empty());
        assert_eq!(scanner.scanned(), 0);
    }

    #[test]
    fn rejects_oversized_pages() {
        let source = MemorySource::default();
        assert!(FeeScanner::new(&source, Pubkey::new_unique(), MAX_PAGE_SIZE + 1).is_err());
        assert!(FeeScanner::new(&source, Pubkey::new_unique(), 0).is_err());
    }

    #[test]
    fn batches_preserve_order_and_size() {
        let accounts: Vec<WithheldAccount> = (1..=5u64)
            .map(|withheld| WithheldAccount {
                address: Pubkey::new_unique(),
                owner: Pubkey::new_unique(),
                withheld,
            })
            .collect();
        let batches = plan_batches(&accounts, 2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], vec![accounts[4]]);
        assert_eq!(batches.concat(), accounts);
        assert!(plan_batches(&[], 2).is_empty());
    }
}
