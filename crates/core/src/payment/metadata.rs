//! Charge breakdown carried through the provider's untyped metadata.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::ticket::MinorUnits;

const TICKET_ID: &str = "ticketId";
const JOB_ID: &str = "jobId";
const TICKET_CODE: &str = "ticketCode";
const BASE_RATE: &str = "baseRate";
const TIP_AMOUNT: &str = "tipAmount";

/// What we attach to an intent so the webhook can rebuild the charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeMetadata {
    pub ticket_id: String,
    pub job_id: String,
    pub ticket_code: String,
    pub base_rate: MinorUnits,
    pub tip_amount: MinorUnits,
}

impl ChargeMetadata {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (TICKET_ID.to_string(), self.ticket_id.clone()),
            (JOB_ID.to_string(), self.job_id.clone()),
            (TICKET_CODE.to_string(), self.ticket_code.clone()),
            (BASE_RATE.to_string(), self.base_rate.to_string()),
            (TIP_AMOUNT.to_string(), self.tip_amount.to_string()),
        ])
    }
}

/// Metadata read back from a provider event. Every field may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMetadata {
    pub ticket_id: Option<String>,
    pub job_id: Option<String>,
    pub ticket_code: Option<String>,
    /// Zero when missing or not a non-negative integer.
    pub base_rate: MinorUnits,
    /// Zero when missing or not a non-negative integer.
    pub tip_amount: MinorUnits,
}

impl ParsedMetadata {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let text = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            ticket_id: text(TICKET_ID),
            job_id: text(JOB_ID),
            ticket_code: text(TICKET_CODE),
            base_rate: lenient_amount(map, BASE_RATE),
            tip_amount: lenient_amount(map, TIP_AMOUNT),
        }
    }
}

fn lenient_amount(map: &HashMap<String, String>, key: &str) -> MinorUnits {
    let Some(raw) = map.get(key) else {
        return 0;
    };

    match raw.trim().parse::<MinorUnits>() {
        Ok(value) if value >= 0 => value,
        _ => {
            warn!(field = key, value = %raw, "Unusable amount in payment metadata, using 0");
            0
        }
    }
}
