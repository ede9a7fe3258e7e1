//! Protocol and wallet constants

/// Minimum seed length accepted for a master key
pub const MIN_SEED_BYTES: usize = 16;

/// Maximum seed length accepted for a master key
pub const MAX_SEED_BYTES: usize = 64;

/// Seed length drawn by `generate_seed` by default
pub const RECOMMENDED_SEED_LEN: usize = 32;

/// First hardened child index
pub const HARDENED_KEY_START: u32 = 0x8000_0000;

/// BIP44 purpose field
pub const BIP44_PURPOSE: u32 = 44;

/// Key used for the master node HMAC
pub const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Serialized extended key length before the checksum
pub const SERIALIZED_KEY_LEN: usize = 4 + 1 + 4 + 4 + 32 + 33;

/// External (payment) address branch
pub const EXTERNAL_BRANCH: u32 = 0;

/// Internal (change) address branch
pub const INTERNAL_BRANCH: u32 = 1;

/// Stand-in address recorded when a child key is invalid
pub const CRAZY_ADDRESS: &str = "CRAZYADDRESS";

/// Name of the account created with a new manager
pub const DEFAULT_ACCOUNT_NAME: &str = "default";

/// Ticker of the only supported asset
pub const DCR_COIN_ID: &str = "dcr";

/// Atoms per coin
pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// Number of already-used external addresses watched behind the cursor
pub const ADDRESS_WATCH_BEHIND: usize = 10;

/// Default gap limit for address discovery
pub const DEFAULT_GAP_LIMIT: usize = 20;

/// Symmetric key length for crypto keys and passphrase keys
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Salt length for the passphrase KDF
pub const KDF_SALT_LEN: usize = 32;

/// Nonce length of the symmetric cipher
pub const CIPHER_NONCE_LEN: usize = 24;

/// Maximum script length
pub const MAX_SCRIPT_SIZE: usize = 16384;

/// Maximum number of non-push operations per script
pub const MAX_OPS_PER_SCRIPT: usize = 255;

/// Maximum number of public keys in a multisig script
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Maximum size of a pushed element
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 2048;

/// Script version understood by the classifier
pub const DEFAULT_SCRIPT_VERSION: u16 = 0;

/// Sequence number for final inputs
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Transaction version written by default
pub const TX_VERSION: u16 = 1;

/// Output tree for regular transactions
pub const TX_TREE_REGULAR: u8 = 0;
