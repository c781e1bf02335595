// Thin layer over the WHMCS API: resolves a client from whatever the admin
// typed, caps list sizes for display and totals what is owed.

use super::billing_models::{Client, Invoice, InvoiceStatus, InvoiceSummary, Ticket, TicketSummary};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

const MAX_LISTED: usize = 10;
/// Upper bound on pages walked when totalling unpaid invoices.
const MAX_UNPAID_PAGES: usize = 40;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Billing is not configured on this bot")]
    Disabled,

    #[error("No client matches `{0}`")]
    ClientNotFound(String),

    #[error("WHMCS returned an error: {0}")]
    Api(String),

    #[error("Could not reach WHMCS: {0}")]
    Http(String),

    #[error("Unexpected WHMCS response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn find_client(&self, email: &str) -> Result<Option<Client>, BillingError>;
    async fn client_details(&self, client_id: u64) -> Result<Client, BillingError>;
    /// Returns the page of invoices starting at `offset`, newest first, and
    /// the total number WHMCS reports.
    async fn invoices(
        &self,
        client_id: u64,
        status: Option<InvoiceStatus>,
        offset: usize,
    ) -> Result<(Vec<Invoice>, usize), BillingError>;
    async fn tickets(
        &self,
        client_id: Option<u64>,
        status: Option<&str>,
    ) -> Result<(Vec<Ticket>, usize), BillingError>;
}

/// `None` api means WHMCS isn't configured; every call reports `Disabled`.
pub struct BillingService {
    api: Option<Arc<dyn BillingApi>>,
}

impl BillingService {
    pub fn new(api: Option<Arc<dyn BillingApi>>) -> Self {
        Self { api }
    }

    pub fn is_enabled(&self) -> bool {
        self.api.is_some()
    }

    fn api(&self) -> Result<&Arc<dyn BillingApi>, BillingError> {
        self.api.as_ref().ok_or(BillingError::Disabled)
    }

    /// Accepts a numeric client ID or an email address.
    pub async fn lookup_client(&self, query: &str) -> Result<Client, BillingError> {
        let api = self.api()?;
        let query = query.trim();

        if let Ok(id) = query.parse::<u64>() {
            return api.client_details(id).await;
        }

        if !query.contains('@') {
            return Err(BillingError::ClientNotFound(query.to_string()));
        }

        let found = api
            .find_client(query)
            .await?
            .ok_or_else(|| BillingError::ClientNotFound(query.to_string()))?;
        // Search results are sparse; fetch the full record.
        api.client_details(found.id).await
    }

    pub async fn invoices(
        &self,
        client_id: u64,
        status: Option<InvoiceStatus>,
    ) -> Result<InvoiceSummary, BillingError> {
        let api = self.api()?;
        let (mut invoices, total_results) = api.invoices(client_id, status, 0).await?;

        let outstanding = match status {
            Some(InvoiceStatus::Unpaid) if invoices.len() >= total_results => {
                outstanding_balance(&invoices)
            }
            _ => unpaid_total(&**api, client_id).await?,
        };

        invoices.truncate(MAX_LISTED);
        Ok(InvoiceSummary {
            client_id,
            invoices,
            total_results,
            outstanding,
        })
    }

    pub async fn tickets(
        &self,
        client_id: Option<u64>,
        status: Option<&str>,
    ) -> Result<TicketSummary, BillingError> {
        let api = self.api()?;
        let status = status.map(str::trim).filter(|s| !s.is_empty());
        let (mut tickets, total_results) = api.tickets(client_id, status).await?;
        tickets.truncate(MAX_LISTED);
        Ok(TicketSummary {
            tickets,
            total_results,
        })
    }
}

/// Walks every page of Unpaid invoices for the client.
async fn unpaid_total(api: &dyn BillingApi, client_id: u64) -> Result<f64, BillingError> {
    let mut total = 0.0;
    let mut seen = 0;
    for _ in 0..MAX_UNPAID_PAGES {
        let (page, total_results) = api
            .invoices(client_id, Some(InvoiceStatus::Unpaid), seen)
            .await?;
        if page.is_empty() {
            return Ok(total);
        }
        seen += page.len();
        total += outstanding_balance(&page);
        if seen >= total_results {
            return Ok(total);
        }
    }
    tracing::warn!(client_id, seen, "Stopped totalling unpaid invoices at the page limit");
    Ok(total)
}

pub fn outstanding_balance(invoices: &[Invoice]) -> f64 {
    invoices
        .iter()
        .filter(|invoice| invoice.is_unpaid())
        .map(|invoice| invoice.total)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const FAKE_PAGE: usize = 25;

    struct FakeWhmcs {
        clients: Vec<Client>,
        invoices: Vec<Invoice>,
        tickets: Vec<Ticket>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BillingApi for FakeWhmcs {
        async fn find_client(&self, email: &str) -> Result<Option<Client>, BillingError> {
            self.calls.lock().unwrap().push(format!("find:{}", email));
            Ok(self
                .clients
                .iter()
                .find(|c| c.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn client_details(&self, client_id: u64) -> Result<Client, BillingError> {
            self.calls.lock().unwrap().push(format!("details:{}", client_id));
            self.clients
                .iter()
                .find(|c| c.id == client_id)
                .cloned()
                .ok_or_else(|| BillingError::Api("Client Not Found".into()))
        }

        async fn invoices(
            &self,
            _client_id: u64,
            status: Option<InvoiceStatus>,
            offset: usize,
        ) -> Result<(Vec<Invoice>, usize), BillingError> {
            self.calls.lock().unwrap().push(format!("invoices:{}", offset));
            let list: Vec<Invoice> = self
                .invoices
                .iter()
                .filter(|i| status.map_or(true, |s| i.status == s.as_api()))
                .cloned()
                .collect();
            let total = list.len();
            let page = list.into_iter().skip(offset).take(FAKE_PAGE).collect();
            Ok((page, total))
        }

        async fn tickets(
            &self,
            _client_id: Option<u64>,
            status: Option<&str>,
        ) -> Result<(Vec<Ticket>, usize), BillingError> {
            let list: Vec<Ticket> = self
                .tickets
                .iter()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .cloned()
                .collect();
            let total = list.len();
            Ok((list, total))
        }
    }

    fn client(id: u64, email: &str) -> Client {
        Client {
            id,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            company: None,
            status: "Active".into(),
            credit: 0.0,
            currency_code: Some("USD".into()),
            created: None,
        }
    }

    fn invoice(id: u64, total: f64, status: &str) -> Invoice {
        Invoice {
            id,
            number: id.to_string(),
            date: "2024-01-01".into(),
            due_date: "2024-01-15".into(),
            total,
            status: status.into(),
        }
    }

    fn fake() -> FakeWhmcs {
        let mut invoices = vec![
            invoice(1, 10.0, "Unpaid"),
            invoice(2, 5.5, "Unpaid"),
            invoice(3, 100.0, "Paid"),
        ];
        for id in 10..25 {
            invoices.push(invoice(id, 1.0, "Paid"));
        }
        FakeWhmcs {
            clients: vec![client(7, "ada@example.com")],
            invoices,
            tickets: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn disabled_without_api() {
        let service = BillingService::new(None);
        assert!(!service.is_enabled());
        assert!(matches!(
            service.lookup_client("7").await,
            Err(BillingError::Disabled)
        ));
    }

    #[tokio::test]
    async fn lookup_by_id_or_email() {
        let fake = Arc::new(fake());
        let service = BillingService::new(Some(fake.clone()));

        assert_eq!(service.lookup_client("7").await.unwrap().id, 7);
        assert_eq!(service.lookup_client(" ADA@example.com ").await.unwrap().id, 7);
        assert!(matches!(
            service.lookup_client("nobody@example.com").await,
            Err(BillingError::ClientNotFound(_))
        ));
        assert!(matches!(
            service.lookup_client("not an email").await,
            Err(BillingError::ClientNotFound(_))
        ));

        let calls = fake.calls.lock().unwrap().clone();
        assert_eq!(calls[0], "details:7");
        assert_eq!(calls[1], "find:ADA@example.com");
        assert_eq!(calls[2], "details:7");
    }

    #[tokio::test]
    async fn invoice_summary_caps_list_and_sums_unpaid() {
        let service = BillingService::new(Some(Arc::new(fake())));

        let summary = service.invoices(7, None).await.unwrap();
        assert_eq!(summary.invoices.len(), 10);
        assert_eq!(summary.total_results, 18);
        assert!((summary.outstanding - 15.5).abs() < f64::EPSILON);

        let paid = service.invoices(7, Some(InvoiceStatus::Paid)).await.unwrap();
        assert!(paid.invoices.iter().all(|i| i.status == "Paid"));
        assert!((paid.outstanding - 15.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn outstanding_counts_every_unpaid_page() {
        let fake = Arc::new(FakeWhmcs {
            clients: Vec::new(),
            invoices: (1..=30).map(|id| invoice(id, 2.0, "Unpaid")).collect(),
            tickets: Vec::new(),
            calls: Mutex::new(Vec::new()),
        });
        let service = BillingService::new(Some(fake.clone()));

        let unpaid = service.invoices(7, Some(InvoiceStatus::Unpaid)).await.unwrap();
        assert_eq!(unpaid.total_results, 30);
        assert_eq!(unpaid.invoices.len(), 10);
        assert!((unpaid.outstanding - 60.0).abs() < f64::EPSILON);

        let all = service.invoices(7, None).await.unwrap();
        assert!((all.outstanding - 60.0).abs() < f64::EPSILON);

        let calls = fake.calls.lock().unwrap().clone();
        assert!(calls.contains(&"invoices:25".to_string()));
    }

    #[test]
    fn outstanding_ignores_other_statuses() {
        let invoices = vec![
            invoice(1, 3.0, "unpaid"),
            invoice(2, 4.0, "Cancelled"),
            invoice(3, 2.0, "Unpaid"),
        ];
        assert_eq!(outstanding_balance(&invoices), 5.0);
        assert_eq!(outstanding_balance(&[]), 0.0);
    }
}
