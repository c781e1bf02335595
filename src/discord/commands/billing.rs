// WHMCS lookups for staff. Every reply is ephemeral: it contains customer data.

use crate::core::billing::{BillingError, Client, Invoice, InvoiceStatus, Ticket};
use crate::discord::{colors, Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum InvoiceStatusChoice {
    Paid,
    Unpaid,
    Cancelled,
    Refunded,
    Overdue,
    Collections,
}

impl From<InvoiceStatusChoice> for InvoiceStatus {
    fn from(choice: InvoiceStatusChoice) -> Self {
        match choice {
            InvoiceStatusChoice::Paid => InvoiceStatus::Paid,
            InvoiceStatusChoice::Unpaid => InvoiceStatus::Unpaid,
            InvoiceStatusChoice::Cancelled => InvoiceStatus::Cancelled,
            InvoiceStatusChoice::Refunded => InvoiceStatus::Refunded,
            InvoiceStatusChoice::Overdue => InvoiceStatus::Overdue,
            InvoiceStatusChoice::Collections => InvoiceStatus::Collections,
        }
    }
}

/// Look up billing clients, invoices and tickets.
///
/// Slash only: prefix invocations can't be ephemeral and would post client
/// details in the channel.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("client", "invoices", "tickets")
)]
pub async fn whmcs(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Find a client by email or ID.
#[poise::command(
    slash_command,
    guild_only,
    ephemeral,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn client(
    ctx: Context<'_>,
    #[description = "Email address or client ID"] query: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    match ctx.data().billing.lookup_client(&query).await {
        Ok(client) => {
            ctx.send(
                poise::CreateReply::default()
                    .embed(client_embed(&client))
                    .ephemeral(true),
            )
            .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// List a client's invoices.
#[poise::command(
    slash_command,
    guild_only,
    ephemeral,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn invoices(
    ctx: Context<'_>,
    #[description = "Client ID"] client_id: u64,
    #[description = "Only invoices with this status"] status: Option<InvoiceStatusChoice>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let summary = match ctx
        .data()
        .billing
        .invoices(client_id, status.map(Into::into))
        .await
    {
        Ok(s) => s,
        Err(e) => return reply_error(ctx, e).await,
    };

    let description = if summary.invoices.is_empty() {
        "No invoices found.".to_string()
    } else {
        summary
            .invoices
            .iter()
            .map(invoice_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("🧾 Invoices for client #{}", summary.client_id))
        .description(description)
        .field("Outstanding", format!("{:.2}", summary.outstanding), true)
        .field("Total invoices", summary.total_results.to_string(), true)
        .color(if summary.outstanding > 0.0 {
            colors::WARNING
        } else {
            colors::SUCCESS
        });

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// List support tickets, optionally for one client.
#[poise::command(
    slash_command,
    guild_only,
    ephemeral,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn tickets(
    ctx: Context<'_>,
    #[description = "Client ID"] client_id: Option<u64>,
    #[description = "Status, e.g. Open or Answered"] status: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let summary = match ctx
        .data()
        .billing
        .tickets(client_id, status.as_deref())
        .await
    {
        Ok(s) => s,
        Err(e) => return reply_error(ctx, e).await,
    };

    let description = if summary.tickets.is_empty() {
        "No tickets found.".to_string()
    } else {
        summary
            .tickets
            .iter()
            .map(ticket_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    let title = match client_id {
        Some(id) => format!("🎫 Tickets for client #{}", id),
        None => "🎫 Tickets".to_string(),
    };
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Showing {} of {}",
            summary.tickets.len(),
            summary.total_results
        )))
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

fn client_embed(client: &Client) -> serenity::CreateEmbed {
    let currency = client.currency_code.as_deref().unwrap_or("");
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("👤 {}", client.display_name()))
        .field("Client ID", client.id.to_string(), true)
        .field("Status", &client.status, true)
        .field("Email", &client.email, false)
        .field("Credit", format!("{:.2} {}", client.credit, currency).trim().to_string(), true)
        .color(colors::INFO);

    if let Some(company) = &client.company {
        embed = embed.field("Company", company, true);
    }
    if let Some(created) = &client.created {
        embed = embed.field("Client since", created, true);
    }
    embed
}

fn invoice_line(invoice: &Invoice) -> String {
    let marker = if invoice.is_unpaid() { "🔴" } else { "⚪" };
    let number = if invoice.number.is_empty() {
        invoice.id.to_string()
    } else {
        invoice.number.clone()
    };
    format!(
        "{} `#{}` {:.2} ({}), due {}",
        marker, number, invoice.total, invoice.status, invoice.due_date
    )
}

fn ticket_line(ticket: &Ticket) -> String {
    format!(
        "`{}` **{}** [{} / {}] {}, last reply {}",
        ticket.tid, ticket.subject, ticket.status, ticket.priority, ticket.department, ticket.last_reply
    )
}

async fn reply_error(ctx: Context<'_>, err: BillingError) -> Result<(), Error> {
    if let BillingError::Http(_) | BillingError::Parse(_) = &err {
        tracing::warn!("WHMCS request failed: {}", err);
    }
    ctx.send(
        poise::CreateReply::default()
            .content(format!("❌ {}", err))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
