/// Application constants

pub const API_VERSION: &str = "v1";

// Fixed-point scale: 1 UI unit = 10^9 raw units.
pub const RAW_DECIMALS: u32 = 9;
pub const RAW_PER_UI: u64 = 1_000_000_000;

// Challenge / session lifetimes
pub const CHALLENGE_TTL_SECS: i64 = 5 * 60;
pub const SESSION_TTL_DAYS: i64 = 30;
pub const SESSION_EXTEND_THRESHOLD_DAYS: i64 = 7;
pub const SESSION_TOUCH_INTERVAL_SECS: i64 = 60;

// Withdrawal authorization
pub const WITHDRAW_TICKET_TTL_SECS: u64 = 120;
pub const AUTHORIZATION_MESSAGE_LEN: usize = 56;

// First line of the login challenge; the wallet signs this exact block.
pub const LOGIN_MESSAGE_HEADER: &str = "StreamWeave Login";

// Well-known Solana program ids used for vault account derivation.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

// Escrow program defaults (overridable via env)
pub const DEFAULT_ESCROW_PROGRAM_ID: &str = "6AyQbmH2bSeip2vZWR82NpJ637SQRtrAU4bt2j2yVPwN";
pub const DEFAULT_WEAVE_MINT: &str = "S3Eqjw8eFu2w11KDKQ7SWuynmvBpjHH4cNeMgXFRvsQ";

// PDA seeds expected by the escrow program
pub const PLAYER_STATE_SEED: &[u8] = b"player_state";
pub const TREASURY_SEED: &[u8] = b"treasury";

// Public history/leaderboard query caps
pub const HISTORY_LIMIT: u32 = 10;
pub const LEADERBOARD_LIMIT: u32 = 25;
