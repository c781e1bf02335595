use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: Option<String>,
    pub status: String,
    pub credit: f64,
    pub currency_code: Option<String>,
    pub created: Option<String>,
}

impl Client {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: u64,
    pub number: String,
    pub date: String,
    pub due_date: String,
    pub total: f64,
    pub status: String,
}

impl Invoice {
    pub fn is_unpaid(&self) -> bool {
        self.status.eq_ignore_ascii_case("Unpaid")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: u64,
    /// Public ticket mask, e.g. `ABC-123456`.
    pub tid: String,
    pub subject: String,
    pub status: String,
    pub priority: String,
    pub department: String,
    pub last_reply: String,
}

/// Filter values WHMCS accepts for `GetInvoices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Cancelled,
    Refunded,
    Overdue,
    Collections,
}

impl InvoiceStatus {
    pub fn as_api(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Unpaid => "Unpaid",
            InvoiceStatus::Cancelled => "Cancelled",
            InvoiceStatus::Refunded => "Refunded",
            InvoiceStatus::Overdue => "Overdue",
            InvoiceStatus::Collections => "Collections",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api())
    }
}

#[derive(Debug, Clone)]
pub struct InvoiceSummary {
    pub client_id: u64,
    /// Capped to a page the reply can show.
    pub invoices: Vec<Invoice>,
    pub total_results: usize,
    /// Sum of the client's Unpaid invoice totals.
    pub outstanding: f64,
}

#[derive(Debug, Clone)]
pub struct TicketSummary {
    pub tickets: Vec<Ticket>,
    pub total_results: usize,
}
