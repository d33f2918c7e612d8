//! NVFIX codec
//!
//! A textual FIX-like encoding: `tag=value` pairs separated by SOH (U+0001).
//! Tags are matched case-insensitively through a per-type field setter;
//! unknown tags are logged at WARN and skipped. A segment without `=` is
//! malformed and fails the whole parse - the codec never partially applies.

use super::CodecError;
use crate::core_types::{Price, Qty};
use crate::models::{AmendRequest, ExecutionReport, RecallOrder};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// SOH delimiter (U+0001).
pub const SOH: char = '\u{1}';

/// FIX-style UTC timestamp, millisecond precision on the way out.
const TIME_PARSE_FORMAT: &str = "%Y%m%d-%H:%M:%S%.f";
const TIME_EMIT_FORMAT: &str = "%Y%m%d-%H:%M:%S%.3f";

// ============================================================
// FIELD-SETTER TRAIT
// ============================================================

/// Types that can be rebuilt from, and rendered to, NVFIX pairs.
///
/// `apply_field` receives the lower-cased tag and returns `Ok(false)` for an
/// unknown tag (skipped with a WARN by the parser) or `Err` for a value that
/// does not parse.
pub trait NvfixFields: Default {
    fn apply_field(&mut self, tag: &str, value: &str) -> Result<bool, String>;
    fn to_nvfix(&self) -> String;
}

/// Parse an NVFIX message into `T` through its field-setter table.
pub fn from_nvfix<T: NvfixFields>(raw: &str) -> Result<T, CodecError> {
    let mut out = T::default();
    for (tag, value) in pairs(raw)? {
        let applied = out
            .apply_field(&tag.to_ascii_lowercase(), value)
            .map_err(|reason| CodecError::parse(raw, reason))?;
        if !applied {
            warn!(tag, "unknown nvfix tag, skipping");
        }
    }
    Ok(out)
}

/// Split a raw message into `(tag, value)` pairs, left to right.
pub fn pairs(raw: &str) -> Result<Vec<(&str, &str)>, CodecError> {
    let mut out = Vec::new();
    for segment in raw.split(SOH).filter(|s| !s.is_empty()) {
        let (tag, value) = segment
            .split_once('=')
            .ok_or_else(|| CodecError::parse(raw, format!("segment without '=': {segment}")))?;
        out.push((tag, value));
    }
    Ok(out)
}

/// Whether the message carries the given tag (case-insensitive). Used to
/// discriminate order vs execution-report messages on the outbound stream.
pub fn has_tag(raw: &str, tag: &str) -> bool {
    raw.split(SOH)
        .filter_map(|s| s.split_once('='))
        .any(|(t, _)| t.eq_ignore_ascii_case(tag))
}

// ============================================================
// VALUE PARSERS
// ============================================================

fn parse_qty(value: &str) -> Result<Qty, String> {
    value
        .parse::<Qty>()
        .map_err(|e| format!("bad quantity '{value}': {e}"))
}

fn parse_price(value: &str) -> Result<Price, String> {
    value
        .parse::<Price>()
        .map_err(|e| format!("bad price '{value}': {e}"))
}

fn parse_char(value: &str) -> Result<char, String> {
    value
        .chars()
        .next()
        .ok_or_else(|| "empty single-char field".to_string())
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(value, TIME_PARSE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("bad timestamp '{value}': {e}"))
}

fn emit_time(ts: &DateTime<Utc>) -> String {
    ts.format(TIME_EMIT_FORMAT).to_string()
}

// ============================================================
// EXECUTION REPORT
// ============================================================

impl NvfixFields for ExecutionReport {
    fn apply_field(&mut self, tag: &str, value: &str) -> Result<bool, String> {
        match tag {
            "execid" => self.exec_id = value.to_string(),
            "exectype" => self.exec_type = parse_char(value)?,
            "clordid" => self.cl_ord_id = value.to_string(),
            "origclordid" => self.orig_cl_ord_id = value.to_string(),
            "orderid" => self.order_id = value.to_string(),
            "lastqty" => self.last_qty = parse_qty(value)?,
            "cumqty" => self.cum_qty = parse_qty(value)?,
            "leavesqty" => self.leaves_qty = parse_qty(value)?,
            "lastpx" => self.last_price = parse_price(value)?,
            "avgpx" => self.avg_price = parse_price(value)?,
            "ordstatus" => self.order_state = value.to_string(),
            "transacttime" => self.transact_time = Some(parse_time(value)?),
            "sendingtime" => self.sending_time = Some(parse_time(value)?),
            "symbol" => self.symbol = value.to_string(),
            "account" => self.account = value.to_string(),
            "currency" => self.currency = value.to_string(),
            "side" => self.side = value.to_string(),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn to_nvfix(&self) -> String {
        let mut out = String::new();
        let mut push = |tag: &str, value: &str| {
            out.push_str(tag);
            out.push('=');
            out.push_str(value);
            out.push(SOH);
        };
        push("ExecID", &self.exec_id);
        push("ExecType", &self.exec_type.to_string());
        push("ClOrdID", &self.cl_ord_id);
        push("OrigClOrdID", &self.orig_cl_ord_id);
        push("OrderID", &self.order_id);
        push("LastQty", &self.last_qty.to_string());
        push("CumQty", &self.cum_qty.to_string());
        push("LeavesQty", &self.leaves_qty.to_string());
        push("LastPx", &self.last_price.to_string());
        push("AvgPx", &self.avg_price.to_string());
        push("OrdStatus", &self.order_state);
        if let Some(ts) = &self.transact_time {
            push("TransactTime", &emit_time(ts));
        }
        if let Some(ts) = &self.sending_time {
            push("SendingTime", &emit_time(ts));
        }
        push("Symbol", &self.symbol);
        push("Account", &self.account);
        push("Currency", &self.currency);
        push("Side", &self.side);
        out
    }
}

// ============================================================
// RECALL ORDER
// ============================================================

impl NvfixFields for RecallOrder {
    fn apply_field(&mut self, tag: &str, value: &str) -> Result<bool, String> {
        match tag {
            "orderid" => self.order_id = value.to_string(),
            // Unrecognised state values are a domain concern, not a wire
            // error; they decode verbatim and reach the comparator.
            "currentstate" => self.current_state = crate::models::OrderState::from_wire(value),
            "ordqty" => self.ord_qty = parse_qty(value)?,
            "symbol" => self.symbol = value.to_string(),
            "account" => self.account = value.to_string(),
            "currency" => self.currency = value.to_string(),
            "side" => self.side = value.to_string(),
            "amendqty" => self.amend_mut().order_qty = parse_qty(value)?,
            "amendprice" => self.amend_mut().price = parse_price(value)?,
            "amendclordid" => self.amend_mut().cl_ord_id = value.to_string(),
            "amendorigclordid" => self.amend_mut().orig_cl_ord_id = value.to_string(),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn to_nvfix(&self) -> String {
        let mut out = String::new();
        let mut push = |tag: &str, value: &str| {
            out.push_str(tag);
            out.push('=');
            out.push_str(value);
            out.push(SOH);
        };
        push("OrderID", &self.order_id);
        push("CurrentState", self.current_state.as_str());
        push("OrdQty", &self.ord_qty.to_string());
        push("Symbol", &self.symbol);
        push("Account", &self.account);
        push("Currency", &self.currency);
        push("Side", &self.side);
        if let Some(amend) = &self.amend_request {
            push("AmendQty", &amend.order_qty.to_string());
            push("AmendPrice", &amend.price.to_string());
            push("AmendClOrdID", &amend.cl_ord_id);
            push("AmendOrigClOrdID", &amend.orig_cl_ord_id);
        }
        out
    }
}

impl RecallOrder {
    fn amend_mut(&mut self) -> &mut AmendRequest {
        self.amend_request.get_or_insert_with(AmendRequest::default)
    }
}

// ============================================================
// TESTS
// ============================================================
