//! Request bodies for the domain pass-throughs.
//!
//! Only outbound shapes are modeled here; replies stay as raw JSON values.

// crates.io
use serde::Serializer;
// self
use crate::_prelude::*;

const DEFAULT_BAR_WINDOW: Duration = Duration::days(5);
const DEFAULT_BAR_LIMIT: u32 = 100;
const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Aggregation unit of a bar series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BarUnit {
	/// Seconds.
	Second = 1,
	/// Minutes.
	Minute = 2,
	/// Hours.
	Hour = 3,
	/// Days.
	Day = 4,
	/// Weeks.
	Week = 5,
	/// Months.
	Month = 6,
}
impl Serialize for BarUnit {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u8(*self as u8)
	}
}

/// Parameters of a historical bar request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarQuery {
	/// Contract identifier.
	pub contract_id: String,
	/// Aggregation unit.
	pub unit: BarUnit,
	/// Number of units per bar.
	pub unit_number: u32,
	/// Maximum number of bars returned.
	pub limit: u32,
	/// Query the live feed instead of the simulated one.
	pub live: bool,
	/// Include the bar that is still forming.
	pub include_partial_bar: bool,
	/// Window start.
	#[serde(with = "time::serde::rfc3339")]
	pub start_time: OffsetDateTime,
	/// Window end.
	#[serde(with = "time::serde::rfc3339")]
	pub end_time: OffsetDateTime,
}
impl BarQuery {
	/// Covers the last five days up to now with 100 completed bars at most.
	pub fn new(contract_id: impl Into<String>, unit: BarUnit, unit_number: u32) -> Self {
		let end_time = OffsetDateTime::now_utc();

		Self {
			contract_id: contract_id.into(),
			unit,
			unit_number,
			limit: DEFAULT_BAR_LIMIT,
			live: false,
			include_partial_bar: false,
			start_time: end_time - DEFAULT_BAR_WINDOW,
			end_time,
		}
	}

	/// Overrides the time window.
	pub fn with_window(mut self, start_time: OffsetDateTime, end_time: OffsetDateTime) -> Self {
		self.start_time = start_time;
		self.end_time = end_time;

		self
	}

	/// Overrides the bar limit.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = limit;

		self
	}

	/// Selects the live feed.
	pub fn with_live(mut self, live: bool) -> Self {
		self.live = live;

		self
	}

	/// Includes the bar that is still forming.
	pub fn with_partial_bar(mut self, include: bool) -> Self {
		self.include_partial_bar = include;

		self
	}
}

/// Parameters of an order or position history request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
	/// Account identifier.
	pub account_id: i64,
	/// Window start; open-ended when absent.
	#[serde(with = "time::serde::rfc3339::option")]
	pub from: Option<OffsetDateTime>,
	/// Window end; open-ended when absent.
	#[serde(with = "time::serde::rfc3339::option")]
	pub to: Option<OffsetDateTime>,
	/// Maximum number of records returned.
	pub limit: u32,
}
impl HistoryQuery {
	/// Unbounded window with the default limit.
	pub fn new(account_id: i64) -> Self {
		Self { account_id, from: None, to: None, limit: DEFAULT_HISTORY_LIMIT }
	}

	/// Bounds the window.
	pub fn with_window(mut self, from: OffsetDateTime, to: OffsetDateTime) -> Self {
		self.from = Some(from);
		self.to = Some(to);

		self
	}

	/// Overrides the limit.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = limit;

		self
	}
}

/// Order submission; numeric codes are passed to the gateway unchanged.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
	/// Account identifier.
	pub account_id: i64,
	/// Contract identifier.
	pub contract_id: String,
	/// Gateway order type code.
	#[serde(rename = "type")]
	pub order_type: i32,
	/// Gateway side code (`0` buy, `1` sell).
	pub side: i32,
	/// Number of contracts.
	pub size: u32,
	/// Limit price.
	pub limit_price: Option<f64>,
	/// Stop price.
	pub stop_price: Option<f64>,
	/// Trailing distance.
	pub trail_price: Option<f64>,
	/// Caller-supplied tag.
	pub custom_tag: Option<String>,
	/// Parent order for brackets.
	pub linked_order_id: Option<i64>,
}
impl OrderRequest {
	/// Creates an order with no prices, tag, or link.
	pub fn new(
		account_id: i64,
		contract_id: impl Into<String>,
		order_type: i32,
		side: i32,
		size: u32,
	) -> Self {
		Self {
			account_id,
			contract_id: contract_id.into(),
			order_type,
			side,
			size,
			limit_price: None,
			stop_price: None,
			trail_price: None,
			custom_tag: None,
			linked_order_id: None,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn bar_query_defaults_to_a_five_day_window() {
		let query = BarQuery::new("CON.F.US.EP.M25", BarUnit::Minute, 5);

		assert_eq!(query.end_time - query.start_time, Duration::days(5));
		assert_eq!(query.limit, 100);
		assert!(!query.live);
	}

	#[test]
	fn bar_query_serializes_gateway_field_names() {
		let query = BarQuery::new("CON.F.US.EP.M25", BarUnit::Hour, 1)
			.with_window(datetime!(2025-03-01 00:00 UTC), datetime!(2025-03-02 00:00 UTC));
		let value = serde_json::to_value(&query).expect("Query should serialize.");

		assert_eq!(value["contractId"], "CON.F.US.EP.M25");
		assert_eq!(value["unit"], 3);
		assert_eq!(value["unitNumber"], 1);
		assert_eq!(value["includePartialBar"], false);
		assert_eq!(value["startTime"], "2025-03-01T00:00:00Z");
	}

	#[test]
	fn order_request_keeps_absent_prices_as_null() {
		let value = serde_json::to_value(OrderRequest::new(7, "CON.F.US.EP.M25", 2, 0, 1))
			.expect("Order should serialize.");

		assert_eq!(value["type"], 2);
		assert!(value["limitPrice"].is_null());
		assert!(value["linkedOrderId"].is_null());

		let value = serde_json::to_value(HistoryQuery::new(7)).expect("Query should serialize.");

		assert!(value["from"].is_null());
		assert_eq!(value["limit"], 100);
	}
}
