//! Terminal output for command results.
//!
//! Every renderer takes the service envelope plus a `json` switch. With
//! `--json` the envelope is printed verbatim as pretty JSON, errors included,
//! so scripts get one stable shape. In text mode a failed envelope becomes a
//! process error instead.

use anyhow::{Result, bail};
use maildeck_core::{
    Conversation, Cursor, ListResponse, MailAccount, Message, MutationResponse, SearchHit,
    StatsResponse, ThreadGroup,
};
use serde::Serialize;

fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn error_text(error: Option<&String>) -> String {
    error.cloned().unwrap_or_else(|| "request failed".to_string())
}

fn ensure<T>(response: &ListResponse<T>) -> Result<()> {
    if response.success {
        Ok(())
    } else {
        bail!(error_text(response.error.as_ref()))
    }
}

fn continuation(next_cursor: Option<Cursor>, has_more: bool) {
    if !has_more {
        return;
    }
    if let Some(cursor) = next_cursor {
        println!();
        println!("more available: resume with --cursor {cursor}");
    }
}

/// Render a page of conversations, one line per counterpart.
pub fn conversations(response: &ListResponse<Conversation>, json: bool) -> Result<()> {
    if json {
        return emit_json(response);
    }
    ensure(response)?;
    if response.data.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }
    for conversation in &response.data {
        let unread = if conversation.unread_count > 0 { '*' } else { ' ' };
        let clip = if conversation.has_attachment { '+' } else { ' ' };
        println!(
            "{unread}{clip} {:<32} {:>3}/{:<3} {}  {}",
            conversation.counterpart,
            conversation.unread_count,
            conversation.message_count,
            conversation.last_message_at.format("%Y-%m-%d %H:%M"),
            conversation.subject,
        );
    }
    continuation(response.next_cursor, response.has_more);
    Ok(())
}

/// Render a page of messages, newest first.
pub fn messages(response: &ListResponse<Message>, json: bool) -> Result<()> {
    if json {
        return emit_json(response);
    }
    ensure(response)?;
    if response.data.is_empty() {
        println!("No messages found.");
        return Ok(());
    }
    for message in &response.data {
        let read = if message.is_read { ' ' } else { '*' };
        let flag = if message.is_flagged { '!' } else { ' ' };
        println!(
            "{:>6} {read}{flag} {:<7} {}  {:<28} {}",
            message.id.to_string(),
            message.folder.as_str(),
            message.sent_at.format("%Y-%m-%d %H:%M"),
            message.from_address,
            message.subject,
        );
    }
    continuation(response.next_cursor, response.has_more);
    Ok(())
}

/// Render a thread as sender-grouped blocks with full bodies.
pub fn thread(response: &ListResponse<ThreadGroup>, json: bool) -> Result<()> {
    if json {
        return emit_json(response);
    }
    ensure(response)?;
    if response.data.is_empty() {
        println!("No messages found.");
        return Ok(());
    }
    for group in &response.data {
        println!("-- {} --", group.sender);
        for message in &group.messages {
            println!(
                "[{}] {}  {}",
                message.id,
                message.sent_at.format("%Y-%m-%d %H:%M"),
                message.subject,
            );
            let body = htmd::convert(&message.body_html)
                .unwrap_or_else(|_| message.body_text.clone());
            for line in body.lines() {
                println!("    {line}");
            }
            println!();
        }
    }
    continuation(response.next_cursor, response.has_more);
    Ok(())
}

/// Render search hits, one line per matching conversation.
pub fn search(response: &ListResponse<SearchHit>, json: bool) -> Result<()> {
    if json {
        return emit_json(response);
    }
    ensure(response)?;
    if response.data.is_empty() {
        println!("No matches found.");
        return Ok(());
    }
    for hit in &response.data {
        println!(
            "{}  {:<32} {:>3} hits  {:<7} {}",
            hit.matched_at.format("%Y-%m-%d %H:%M"),
            hit.counterpart,
            hit.match_count,
            hit.folder.as_str(),
            hit.subject,
        );
        if !hit.snippet.is_empty() {
            println!("      {}", hit.snippet);
        }
    }
    continuation(response.next_cursor, response.has_more);
    Ok(())
}

/// Render mailbox counters.
pub fn stats(response: &StatsResponse, json: bool) -> Result<()> {
    if json {
        return emit_json(response);
    }
    let Some(stats) = &response.stats else {
        bail!(error_text(response.error.as_ref()));
    };
    println!("Mailbox:");
    println!("  total:            {}", stats.total);
    println!("  unread:           {}", stats.unread);
    println!("  spam:             {}", stats.spam);
    println!("  with attachments: {}", stats.with_attachments);
    Ok(())
}

/// Render a mutation outcome, listing ids the batch could not reach.
pub fn mutation(response: &MutationResponse, json: bool) -> Result<()> {
    if json {
        return emit_json(response);
    }
    if !response.success {
        bail!(error_text(response.error.as_ref()));
    }
    println!("updated {}", response.updated);
    if !response.failed_ids.is_empty() {
        let ids: Vec<String> = response.failed_ids.iter().map(ToString::to_string).collect();
        println!("failed: {}", ids.join(", "));
    }
    Ok(())
}

/// Render the registered accounts.
pub fn accounts(accounts: &[MailAccount], json: bool) -> Result<()> {
    if json {
        return emit_json(&accounts);
    }
    if accounts.is_empty() {
        println!("No accounts registered.");
        return Ok(());
    }
    for account in accounts {
        let id = account.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!("{id:>4}  {:<32} {}", account.email, account.display_name);
    }
    Ok(())
}
