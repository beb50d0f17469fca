//! Fixed-point monetary units. All balances travel as integers at 10^-9
//! scale; floats appear only at the JSON request boundary and are converted
//! before any arithmetic.

use crate::constants::{RAW_DECIMALS, RAW_PER_UI};
use crate::error::{AppError, Result};

/// Converts a client-supplied UI wager into raw units. Rejects non-finite and
/// non-positive values, floors fractional input, and checks for overflow.
pub fn wager_ui_to_raw(wager_ui: f64) -> Result<u64> {
    if !wager_ui.is_finite() {
        return Err(AppError::Validation("Missing or invalid wagerUi".into()));
    }
    let wager_ui_int = wager_ui.floor();
    if wager_ui_int <= 0.0 {
        return Err(AppError::Validation("wagerUi must be > 0".into()));
    }
    if wager_ui_int > u64::MAX as f64 {
        return Err(AppError::Validation("wagerUi out of range".into()));
    }
    (wager_ui_int as u64)
        .checked_mul(RAW_PER_UI)
        .ok_or_else(|| AppError::Validation("wagerUi out of range".into()))
}

/// Whole UI units, fraction discarded.
pub fn raw_to_ui_whole(raw: u64) -> u64 {
    raw / RAW_PER_UI
}

/// Decimal UI string with up to 6 fractional digits, trailing zeros trimmed.
pub fn raw_to_ui_string(raw: u64) -> String {
    let whole = raw / RAW_PER_UI;
    let frac = raw % RAW_PER_UI;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0width$}", frac, width = RAW_DECIMALS as usize);
    let trimmed = frac_str[..6].trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Ledger bigint columns come back as JSON strings or numbers depending on
/// magnitude; accept both when deserializing raw amounts.
pub mod raw_u64 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Text(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn wager_conversion_scales_and_floors() {
        assert_eq!(wager_ui_to_raw(1000.0).unwrap(), 1_000_000_000_000);
        assert_eq!(wager_ui_to_raw(2.9).unwrap(), 2_000_000_000);
    }

    #[test]
    fn wager_conversion_rejects_bad_input() {
        assert!(wager_ui_to_raw(0.0).is_err());
        assert!(wager_ui_to_raw(-5.0).is_err());
        assert!(wager_ui_to_raw(f64::NAN).is_err());
        assert!(wager_ui_to_raw(f64::INFINITY).is_err());
        assert!(wager_ui_to_raw(1e30).is_err());
    }

    #[test]
    fn ui_string_trims_fraction() {
        assert_eq!(raw_to_ui_string(5_000_000_000_000), "5000");
        assert_eq!(raw_to_ui_string(1_500_000_000), "1.5");
        assert_eq!(raw_to_ui_string(1_234_567_891), "1.234567");
        assert_eq!(raw_to_ui_string(0), "0");
        // fraction below the 6-digit display cut renders as whole
        assert_eq!(raw_to_ui_string(2_000_000_000 + 100), "2");
    }

    #[test]
    fn ui_whole_truncates() {
        assert_eq!(raw_to_ui_whole(1_999_999_999), 1);
    }

    #[test]
    fn raw_u64_accepts_string_and_number() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(with = "raw_u64")]
            amount: u64,
        }

        let from_str: Row = serde_json::from_str(r#"{"amount":"5000000000"}"#).unwrap();
        assert_eq!(from_str.amount, 5_000_000_000);

        let from_num: Row = serde_json::from_str(r#"{"amount":42}"#).unwrap();
        assert_eq!(from_num.amount, 42);

        assert!(serde_json::from_str::<Row>(r#"{"amount":"-3"}"#).is_err());
    }
}
