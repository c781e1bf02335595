pub mod billing_models;
pub mod billing_service;

pub use billing_models::{Client, Invoice, InvoiceStatus, InvoiceSummary, Ticket, TicketSummary};
pub use billing_service::{outstanding_balance, BillingApi, BillingError, BillingService};
