// WHMCS API client.
//
// Every call is `POST {url}/includes/api.php` with form fields. WHMCS returns
// numbers as strings or as numbers depending on the field and version, and
// an empty list comes back as "" instead of `{"invoice": []}`. The `lenient`
// helpers below absorb both.

use crate::core::billing::{BillingApi, BillingError, Client, Invoice, InvoiceStatus, Ticket};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const PAGE_SIZE: usize = 25;

#[derive(Debug, Clone)]
pub struct WhmcsConfig {
    pub url: String,
    pub identifier: String,
    pub secret: String,
    pub access_key: Option<String>,
}

pub struct WhmcsClient {
    client: reqwest::Client,
    endpoint: String,
    config: WhmcsConfig,
}

impl WhmcsClient {
    pub fn new(config: WhmcsConfig) -> Result<Self, BillingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| BillingError::Http(e.to_string()))?;

        let endpoint = format!("{}/includes/api.php", config.url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    async fn call(&self, action: &str, params: &[(&str, String)]) -> Result<Value, BillingError> {
        let mut form: Vec<(&str, String)> = vec![
            ("action", action.to_string()),
            ("identifier", self.config.identifier.clone()),
            ("secret", self.config.secret.clone()),
            ("responsetype", "json".to_string()),
        ];
        if let Some(key) = &self.config.access_key {
            form.push(("accesskey", key.clone()));
        }
        form.extend(params.iter().cloned());

        tracing::debug!(action, "WHMCS request");
        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| BillingError::Http(e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            BillingError::Parse(format!("{} (HTTP {})", e, status))
        })?;

        check_result(body)
    }
}

/// `result: "success"` or an `Api` error carrying WHMCS's message.
fn check_result(body: Value) -> Result<Value, BillingError> {
    match body.get("result").and_then(Value::as_str) {
        Some("success") => Ok(body),
        _ => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(BillingError::Api(message))
        }
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn u64_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        })
    }

    pub fn f64_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        })
    }

    pub fn string_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn usize_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
        u64_from_any(d).map(|n| n as usize)
    }
}

/// Pull the list at `body[outer][inner]`, treating "" or a missing key as empty.
fn nested_list<T: for<'de> Deserialize<'de>>(
    body: &Value,
    outer: &str,
    inner: &str,
) -> Result<Vec<T>, BillingError> {
    match body.get(outer).and_then(|o| o.get(inner)) {
        Some(list @ Value::Array(_)) => serde_json::from_value(list.clone())
            .map_err(|e| BillingError::Parse(format!("{}.{}: {}", outer, inner, e))),
        // Some versions send a single object instead of a one-element list.
        Some(item @ Value::Object(_)) => serde_json::from_value(item.clone())
            .map(|one| vec![one])
            .map_err(|e| BillingError::Parse(format!("{}.{}: {}", outer, inner, e))),
        _ => Ok(Vec::new()),
    }
}

fn total_results(body: &Value) -> usize {
    match body.get("totalresults") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default() as usize,
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        _ => 0,
    }
}

#[derive(Debug, Deserialize)]
struct ApiClient {
    #[serde(default, deserialize_with = "lenient::u64_from_any")]
    id: u64,
    #[serde(default, deserialize_with = "lenient::u64_from_any")]
    userid: u64,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    firstname: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    lastname: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    email: String,
    #[serde(default, rename = "companyname", deserialize_with = "lenient::string_from_any")]
    company: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    status: String,
    #[serde(default, deserialize_with = "lenient::f64_from_any")]
    credit: f64,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    currency_code: String,
    #[serde(default, rename = "datecreated", deserialize_with = "lenient::string_from_any")]
    created: String,
}

impl From<ApiClient> for Client {
    fn from(api: ApiClient) -> Self {
        let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);
        Client {
            id: if api.id != 0 { api.id } else { api.userid },
            first_name: api.firstname,
            last_name: api.lastname,
            email: api.email,
            company: non_empty(api.company),
            status: api.status,
            credit: api.credit,
            currency_code: non_empty(api.currency_code),
            created: non_empty(api.created),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiInvoice {
    #[serde(deserialize_with = "lenient::u64_from_any")]
    id: u64,
    #[serde(default, rename = "invoicenum", deserialize_with = "lenient::string_from_any")]
    number: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    date: String,
    #[serde(default, rename = "duedate", deserialize_with = "lenient::string_from_any")]
    due_date: String,
    #[serde(default, deserialize_with = "lenient::f64_from_any")]
    total: f64,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    status: String,
}

impl From<ApiInvoice> for Invoice {
    fn from(api: ApiInvoice) -> Self {
        Invoice {
            number: if api.number.is_empty() {
                api.id.to_string()
            } else {
                api.number
            },
            id: api.id,
            date: api.date,
            due_date: api.due_date,
            total: api.total,
            status: api.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiTicket {
    #[serde(deserialize_with = "lenient::u64_from_any")]
    id: u64,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    tid: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    subject: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    status: String,
    #[serde(default, deserialize_with = "lenient::string_from_any")]
    priority: String,
    #[serde(default, rename = "deptname", deserialize_with = "lenient::string_from_any")]
    department: String,
    #[serde(default, rename = "lastreply", deserialize_with = "lenient::string_from_any")]
    last_reply: String,
}

impl From<ApiTicket> for Ticket {
    fn from(api: ApiTicket) -> Self {
        Ticket {
            id: api.id,
            tid: api.tid,
            subject: api.subject,
            status: api.status,
            priority: api.priority,
            department: api.department,
            last_reply: api.last_reply,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientDetailsResponse {
    client: Option<ApiClient>,
}

fn parse_client_details(body: Value) -> Result<Client, BillingError> {
    // Newer versions nest under "client", older ones put fields at the top level.
    let details: ClientDetailsResponse = serde_json::from_value(body.clone())
        .map_err(|e| BillingError::Parse(e.to_string()))?;
    let api = match details.client {
        Some(client) => client,
        None => serde_json::from_value(body).map_err(|e| BillingError::Parse(e.to_string()))?,
    };
    Ok(api.into())
}

fn invoice_params(
    client_id: u64,
    status: Option<InvoiceStatus>,
    offset: usize,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("userid", client_id.to_string()),
        ("limitstart", offset.to_string()),
        ("limitnum", PAGE_SIZE.to_string()),
        ("orderby", "date".to_string()),
        ("order", "desc".to_string()),
    ];
    if let Some(status) = status {
        params.push(("status", status.as_api().to_string()));
    }
    params
}

#[async_trait]
impl BillingApi for WhmcsClient {
    async fn find_client(&self, email: &str) -> Result<Option<Client>, BillingError> {
        let body = self
            .call("GetClients", &[("search", email.to_string()), ("limitnum", "5".into())])
            .await?;
        let clients: Vec<ApiClient> = nested_list(&body, "clients", "client")?;
        Ok(clients
            .into_iter()
            .map(Client::from)
            .find(|c| c.email.eq_ignore_ascii_case(email)))
    }

    async fn client_details(&self, client_id: u64) -> Result<Client, BillingError> {
        let body = self
            .call("GetClientsDetails", &[("clientid", client_id.to_string()), ("stats", "false".into())])
            .await?;
        parse_client_details(body)
    }

    async fn invoices(
        &self,
        client_id: u64,
        status: Option<InvoiceStatus>,
        offset: usize,
    ) -> Result<(Vec<Invoice>, usize), BillingError> {
        let params = invoice_params(client_id, status, offset);
        let body = self.call("GetInvoices", &params).await?;
        let invoices: Vec<ApiInvoice> = nested_list(&body, "invoices", "invoice")?;
        Ok((invoices.into_iter().map(Invoice::from).collect(), total_results(&body)))
    }

    async fn tickets(
        &self,
        client_id: Option<u64>,
        status: Option<&str>,
    ) -> Result<(Vec<Ticket>, usize), BillingError> {
        let mut params = vec![("limitnum", PAGE_SIZE.to_string())];
        if let Some(id) = client_id {
            params.push(("clientid", id.to_string()));
        }
        if let Some(status) = status {
            params.push(("status", status.to_string()));
        }

        let body = self.call("GetTickets", &params).await?;
        let tickets: Vec<ApiTicket> = nested_list(&body, "tickets", "ticket")?;
        Ok((tickets.into_iter().map(Ticket::from).collect(), total_results(&body)))
    }
}
