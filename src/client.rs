//! Gateway client facade.
//!
//! [`Client`] wires the session core from a [`ClientConfig`] and exposes the domain endpoints
//! as thin pass-throughs over [`RequestExecutor::execute`]. Replies are returned as raw JSON
//! values.

pub mod request;

pub use request::*;

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::ReqwestAuthApi,
	config::ClientConfig,
	envelope,
	executor::RequestExecutor,
	http::{ApiHttpClient, HttpReply},
	rate_limit::RateLimiter,
	retry::RetryPolicy,
	store::{FileStore, SessionStore},
	token::{TokenManager, TokenSettings},
};

/// Authenticated ProjectX gateway client.
#[derive(Debug)]
pub struct Client {
	config: ClientConfig,
	http: ApiHttpClient,
	executor: RequestExecutor,
}
impl Client {
	/// Builds a client that persists its session to `config.session_path`.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let store = FileStore::open(&config.session_path)?;

		Self::with_store(config, Arc::new(store))
	}

	/// Builds a client over a caller-provided session store.
	pub fn with_store(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
		config.validate()?;

		let http = ApiHttpClient::new(config.base_url.clone(), config.request_timeout)?;
		let api = Arc::new(ReqwestAuthApi::new(http.clone(), config.endpoints.clone()));
		let tokens = TokenManager::new(
			config.credentials.clone(),
			api,
			store,
			TokenSettings::from_config(&config),
		);
		let executor =
			RequestExecutor::new(tokens, RateLimiter::new(config.min_interval), config.retry);

		Ok(Self { config, http, executor })
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Shared transport.
	pub fn http(&self) -> &ApiHttpClient {
		&self.http
	}

	/// Authenticated-call primitive backing every endpoint.
	pub fn executor(&self) -> &RequestExecutor {
		&self.executor
	}

	/// Accounts that are currently active.
	pub async fn active_accounts(&self) -> Result<Vec<Value>> {
		const OPERATION: &str = "active_accounts";

		let body = json!({ "onlyActiveAccounts": true });

		self.post(OPERATION, "/api/Account/search", &body, |reply| {
			envelope::decode_list(OPERATION, reply, "accounts")
		})
		.await
	}

	/// Balance and margin snapshot of one account.
	pub async fn account_details(&self, account_id: i64) -> Result<Value> {
		const OPERATION: &str = "account_details";

		let path = format!("/api/Account/details/{account_id}");
		let body = json!({ "accountId": account_id });

		self.post(OPERATION, &path, &body, |reply| {
			envelope::decode_field(OPERATION, reply, "account")
		})
		.await
	}

	/// Contracts matching `search_text`.
	pub async fn search_contracts(&self, search_text: &str, live: bool) -> Result<Vec<Value>> {
		const OPERATION: &str = "search_contracts";

		let body = json!({ "searchText": search_text, "live": live });

		self.post(OPERATION, "/api/Contract/search", &body, |reply| {
			envelope::decode_list(OPERATION, reply, "contracts")
		})
		.await
	}

	/// Full contract record by identifier.
	pub async fn contract_by_id(&self, contract_id: &str) -> Result<Value> {
		const OPERATION: &str = "contract_by_id";

		let body = json!({ "contractId": contract_id });

		self.post(OPERATION, "/api/Contract/details", &body, |reply| {
			envelope::decode_field(OPERATION, reply, "contract")
		})
		.await
	}

	/// Contract lookup by symbol name; the gateway takes the name in its `contractId` field.
	pub async fn contract_by_name(&self, symbol: &str) -> Result<Value> {
		const OPERATION: &str = "contract_by_name";

		let body = json!({ "contractId": symbol });

		self.post(OPERATION, "/api/Contract/searchById", &body, |reply| {
			envelope::decode_field(OPERATION, reply, "contract")
		})
		.await
	}

	/// Historical bars for a query.
	pub async fn retrieve_bars(&self, query: &BarQuery) -> Result<Vec<Value>> {
		const OPERATION: &str = "retrieve_bars";

		let body = serde_json::to_value(query).map_err(|e| Error::transport(OPERATION, e))?;

		self.post(OPERATION, "/api/History/retrieveBars", &body, |reply| {
			envelope::decode_list(OPERATION, reply, "bars")
		})
		.await
	}

	/// Most recent completed live bar, if any.
	pub async fn latest_bar(
		&self,
		contract_id: &str,
		unit: BarUnit,
		unit_number: u32,
	) -> Result<Option<Value>> {
		let query = BarQuery::new(contract_id, unit, unit_number)
			.with_limit(1)
			.with_live(true)
			.with_partial_bar(false);

		Ok(self.retrieve_bars(&query).await?.into_iter().next())
	}

	/// Current quote of a contract, returned as the gateway sends it.
	pub async fn quote(&self, contract_id: &str) -> Result<Value> {
		const OPERATION: &str = "quote";

		let path = format!("/api/Quote/{contract_id}");

		self.get(OPERATION, &path, |reply| envelope::decode_raw(OPERATION, reply)).await
	}

	/// Working orders of an account; empty when the gateway reports none.
	pub async fn open_orders(&self, account_id: i64) -> Result<Vec<Value>> {
		const OPERATION: &str = "open_orders";

		let path = format!("/api/Order/{account_id}/open");

		self.get(OPERATION, &path, |reply| {
			if reply.status == 404 {
				return Ok(Vec::new());
			}

			envelope::decode_raw(OPERATION, reply)
		})
		.await
	}

	/// Single order by identifier.
	pub async fn order_details(&self, order_id: i64) -> Result<Value> {
		const OPERATION: &str = "order_details";

		let body = json!({ "orderId": order_id });

		self.post(OPERATION, "/api/Order/details", &body, |reply| {
			envelope::decode_field(OPERATION, reply, "order")
		})
		.await
	}

	/// Open positions of an account; empty when the gateway reports none.
	pub async fn positions(&self, account_id: i64) -> Result<Vec<Value>> {
		const OPERATION: &str = "positions";

		let body = json!({ "accountId": account_id });

		self.post(OPERATION, "/api/Position/search", &body, |reply| {
			envelope::decode_list(OPERATION, reply, "positions")
		})
		.await
	}

	/// Closed positions of an account.
	pub async fn position_history(&self, query: &HistoryQuery) -> Result<Vec<Value>> {
		const OPERATION: &str = "position_history";

		let body = serde_json::to_value(query).map_err(|e| Error::transport(OPERATION, e))?;

		self.post(OPERATION, "/api/Position/history", &body, |reply| {
			envelope::decode_list(OPERATION, reply, "positions")
		})
		.await
	}

	/// Single position by identifier.
	pub async fn position_details(&self, position_id: i64) -> Result<Value> {
		const OPERATION: &str = "position_details";

		let body = json!({ "positionId": position_id });

		self.post(OPERATION, "/api/Position/details", &body, |reply| {
			envelope::decode_field(OPERATION, reply, "position")
		})
		.await
	}

	/// Past orders of an account.
	pub async fn order_history(&self, query: &HistoryQuery) -> Result<Vec<Value>> {
		const OPERATION: &str = "order_history";

		let body = serde_json::to_value(query).map_err(|e| Error::transport(OPERATION, e))?;

		self.post(OPERATION, "/api/Order/history", &body, |reply| {
			envelope::decode_list(OPERATION, reply, "orders")
		})
		.await
	}

	/// Submits an order and returns its identifier.
	///
	/// Submission is attempted once: a timed-out request may still have reached the exchange.
	pub async fn place_order(&self, order: &OrderRequest) -> Result<i64> {
		const OPERATION: &str = "place_order";

		let body = serde_json::to_value(order).map_err(|e| Error::transport(OPERATION, e))?;

		let policy = RetryPolicy::no_retry();

		self.post_with_policy(OPERATION, "/api/Order/place", &body, policy, |reply| {
			envelope::decode_field(OPERATION, reply, "orderId")
		})
		.await
	}

	/// Cancels a working order.
	pub async fn cancel_order(&self, order_id: i64) -> Result<()> {
		const OPERATION: &str = "cancel_order";

		let body = json!({ "orderId": order_id });

		self.post(OPERATION, "/api/Order/cancel", &body, |reply| {
			envelope::decode_ack(OPERATION, reply)
		})
		.await
	}

	/// Moves the protective stop-loss and take-profit of a position; `None` clears a level.
	pub async fn update_position_stop(
		&self,
		position_id: i64,
		stop_loss: Option<f64>,
		take_profit: Option<f64>,
	) -> Result<()> {
		const OPERATION: &str = "update_position_stop";

		let body = json!({
			"positionId": position_id,
			"stopLoss": stop_loss,
			"takeProfit": take_profit,
		});

		self.post(OPERATION, "/api/Position/updateStop", &body, |reply| {
			envelope::decode_ack(OPERATION, reply)
		})
		.await
	}

	/// Flattens an open position.
	pub async fn close_position(&self, position_id: i64) -> Result<()> {
		const OPERATION: &str = "close_position";

		let body = json!({ "positionId": position_id });

		self.post(OPERATION, "/api/Position/close", &body, |reply| {
			envelope::decode_ack(OPERATION, reply)
		})
		.await
	}

	/// Terminates the gateway session and clears the persisted record.
	pub async fn logout(&self) -> Result<bool> {
		self.executor.logout().await
	}

	async fn post<T, D>(&self, operation: &str, path: &str, body: &Value, decode: D) -> Result<T>
	where
		D: Fn(&HttpReply) -> Result<T>,
	{
		self.post_with_policy(operation, path, body, self.executor.policy(), decode).await
	}

	async fn get<T, D>(&self, operation: &str, path: &str, decode: D) -> Result<T>
	where
		D: Fn(&HttpReply) -> Result<T>,
	{
		let http = &self.http;
		let decode = &decode;

		self.executor
			.execute(operation, move |token| async move {
				let reply = http.get(operation, path, Some(&token)).await?;

				decode(&reply)
			})
			.await
	}

	async fn post_with_policy<T, D>(
		&self,
		operation: &str,
		path: &str,
		body: &Value,
		policy: RetryPolicy,
		decode: D,
	) -> Result<T>
	where
		D: Fn(&HttpReply) -> Result<T>,
	{
		let http = &self.http;
		let decode = &decode;

		self.executor
			.execute_with_policy(operation, policy, move |token| async move {
				let reply = http.post_json(operation, path, Some(&token), body).await?;

				decode(&reply)
			})
			.await
	}
}
